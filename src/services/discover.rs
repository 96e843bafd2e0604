//! Browse lists shown before the user has picked any seeds.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::catalog::{CatalogStore, RowSet};
use crate::models::recommendation::BucketViews;
use crate::models::{Domain, Identifier, ItemView};

const MOVIE_LIST_SIZE: usize = 22;
const RECENT_RELEASE_YEARS: i32 = 2;
const ACCLAIMED_QUALITY: f64 = 8.0;

const ICONIC_GAME_IDS: [i64; 8] = [570, 730, 271590, 1091500, 292030, 1245620, 620, 413150];
const EXPLORE_GAME_QUALITY: f64 = 0.92;
const EXPLORE_GAME_EXCLUDED_TAGS: [&str; 4] = ["Ação", "Aventura", "RPG", "Estratégia"];
const EXPLORE_GAME_COUNT: usize = 29;
const EXPLORE_GAME_SEED: u64 = 42;

const MUSIC_LIST_SIZE: usize = 36;
const EXPLORE_MUSIC_POPULARITY: f64 = 50.0;

/// Two named browse lists for `domain`.
///
/// `current_year` anchors the recent-releases window; `rng` drives the
/// unseeded music sample.
pub fn discover<R: Rng>(
    domain: Domain,
    store: &CatalogStore,
    current_year: i32,
    rng: &mut R,
) -> BucketViews {
    let lists: Vec<(&str, Vec<usize>)> = match domain {
        Domain::Movies => {
            let recent = store.filter(|item| {
                item.release_year
                    .is_some_and(|year| year >= current_year - RECENT_RELEASE_YEARS)
            });
            let acclaimed = store.filter(|item| item.quality > ACCLAIMED_QUALITY);
            vec![
                ("popular_releases", most_popular(store, recent, MOVIE_LIST_SIZE)),
                ("critically_acclaimed", most_popular(store, acclaimed, MOVIE_LIST_SIZE)),
            ]
        }
        Domain::Games => {
            let iconic_ids: Vec<Identifier> = ICONIC_GAME_IDS.iter().map(|&id| id.into()).collect();
            let mut iconic = store.resolve(&iconic_ids);
            iconic.sort_unstable();

            let explore = store.filter(|item| {
                item.quality > EXPLORE_GAME_QUALITY
                    && !EXPLORE_GAME_EXCLUDED_TAGS.iter().any(|tag| item.has_tag(tag))
            });
            let mut fixed = StdRng::seed_from_u64(EXPLORE_GAME_SEED);
            vec![
                ("iconic_games", iconic),
                ("explore_games", sample(explore, EXPLORE_GAME_COUNT, &mut fixed)),
            ]
        }
        Domain::Music => {
            let popular = store.filter(|item| item.popularity > EXPLORE_MUSIC_POPULARITY);
            vec![
                ("iconic", most_popular(store, store.all_rows(), MUSIC_LIST_SIZE)),
                ("explore", sample(popular, MUSIC_LIST_SIZE, rng)),
            ]
        }
    };

    BucketViews(
        lists
            .into_iter()
            .map(|(name, rows)| {
                let views = rows.into_iter().map(|row| ItemView::plain(store.row(row))).collect();
                (name.to_string(), views)
            })
            .collect(),
    )
}

/// Top `limit` rows by popularity, ties in catalog order
fn most_popular(store: &CatalogStore, rows: RowSet, limit: usize) -> Vec<usize> {
    let mut rows: Vec<usize> = rows.iter().collect();
    rows.sort_by(|&a, &b| store.row(b).popularity.total_cmp(&store.row(a).popularity));
    rows.truncate(limit);
    rows
}

/// Up to `count` rows drawn without replacement; all rows when there are fewer
fn sample<R: Rng>(rows: RowSet, count: usize, rng: &mut R) -> Vec<usize> {
    if rows.len() <= count {
        return rows.iter().collect();
    }
    rows.as_slice()
        .choose_multiple(rng, count)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::{item, store};

    fn names(lists: &BucketViews) -> Vec<&str> {
        lists.names().collect()
    }

    #[test]
    fn test_movie_lists() {
        let mut items = Vec::new();
        for i in 0..30 {
            let mut movie = item(i, &format!("Movie {}", i), &["Drama"], "");
            movie.release_year = Some(if i % 2 == 0 { 2025 } else { 1990 });
            movie.quality = if i % 3 == 0 { 8.5 } else { 6.0 };
            movie.popularity = i as f64;
            items.push(movie);
        }
        let store = store(items, vec![vec![1.0]; 30]);
        let lists = discover(Domain::Movies, &store, 2026, &mut StdRng::seed_from_u64(0));

        assert_eq!(names(&lists), vec!["popular_releases", "critically_acclaimed"]);
        let recent = lists.get("popular_releases").unwrap();
        assert_eq!(recent.len(), 15);
        assert_eq!(recent[0].item.id, Identifier::Int(28));
        let acclaimed = lists.get("critically_acclaimed").unwrap();
        assert_eq!(acclaimed.len(), 10);
        assert!(acclaimed.iter().all(|v| v.item.quality > 8.0));
    }

    #[test]
    fn test_game_lists_are_reproducible() {
        let mut items = vec![item(570, "Dota 2", &["Estratégia"], "Valve")];
        for i in 0..40 {
            let mut game = item(1000 + i, &format!("Indie {}", i), &["Indie"], "");
            game.quality = 0.95;
            items.push(game);
        }
        let mut rpg = item(2000, "Great RPG", &["RPG"], "");
        rpg.quality = 0.99;
        items.push(rpg);
        let store = store(items, vec![vec![1.0]; 42]);

        let a = discover(Domain::Games, &store, 2026, &mut StdRng::seed_from_u64(1));
        let b = discover(Domain::Games, &store, 2026, &mut StdRng::seed_from_u64(2));

        let iconic = a.get("iconic_games").unwrap();
        assert_eq!(iconic.len(), 1);
        assert_eq!(iconic[0].item.id, Identifier::Int(570));

        let explore = a.get("explore_games").unwrap();
        assert_eq!(explore.len(), 29);
        assert!(explore.iter().all(|v| !v.item.has_tag("RPG")));

        let ids = |lists: &BucketViews| -> Vec<Identifier> {
            lists
                .get("explore_games")
                .unwrap()
                .iter()
                .map(|v| v.item.id.clone())
                .collect()
        };
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn test_music_lists() {
        let items = (0..10)
            .map(|i| {
                let mut track = item(i, &format!("Track {}", i), &["pop"], "");
                track.popularity = (i * 10) as f64;
                track
            })
            .collect();
        let store = store(items, vec![vec![1.0]; 10]);
        let lists = discover(Domain::Music, &store, 2026, &mut StdRng::seed_from_u64(4));

        assert_eq!(names(&lists), vec!["iconic", "explore"]);
        assert_eq!(lists.get("iconic").unwrap()[0].item.id, Identifier::Int(9));
        let explore = lists.get("explore").unwrap();
        assert_eq!(explore.len(), 4);
        assert!(explore.iter().all(|v| v.item.popularity > 50.0));
    }
}

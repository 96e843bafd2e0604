use crate::catalog::CatalogStore;
use crate::models::{CatalogItem, Domain, ItemView};

/// Score a title gets when it contains the whole query
const CONTAINS_SCORE: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchMode {
    /// Case-insensitive substring over title and authors
    Substring { rank_by_popularity: bool },
    /// Jaro-Winkler title similarity on 0-100; matches below `cutoff` are dropped
    Fuzzy { cutoff: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    pub mode: SearchMode,
    pub limit: usize,
}

impl SearchSettings {
    pub fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::Movies => Self {
                mode: SearchMode::Substring {
                    rank_by_popularity: true,
                },
                limit: 20,
            },
            Domain::Music => Self {
                mode: SearchMode::Substring {
                    rank_by_popularity: false,
                },
                limit: 50,
            },
            Domain::Games => Self {
                mode: SearchMode::Fuzzy { cutoff: 60.0 },
                limit: 30,
            },
        }
    }
}

/// Searches the catalog; a blank query matches nothing
pub fn search(store: &CatalogStore, settings: &SearchSettings, query: &str) -> Vec<ItemView> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let rows: Vec<usize> = match settings.mode {
        SearchMode::Substring { rank_by_popularity } => {
            let mut rows: Vec<usize> = store
                .filter(|item| item.search_text.contains(&query))
                .iter()
                .collect();
            if rank_by_popularity {
                rows.sort_by(|&a, &b| store.row(b).popularity.total_cmp(&store.row(a).popularity));
            }
            rows
        }
        SearchMode::Fuzzy { cutoff } => {
            let mut scored: Vec<(usize, f64)> = store
                .items()
                .iter()
                .enumerate()
                .map(|(row, item)| (row, title_score(&query, item)))
                .filter(|(_, score)| *score >= cutoff)
                .collect();
            scored.sort_by(|a, b| b.1.total_cmp(&a.1));
            scored.into_iter().map(|(row, _)| row).collect()
        }
    };

    tracing::debug!(query = %query, matches = rows.len(), "Catalog search");

    rows.into_iter()
        .take(settings.limit)
        .map(|row| ItemView::plain(store.row(row)))
        .collect()
}

fn title_score(query: &str, item: &CatalogItem) -> f64 {
    let title = item.title.to_lowercase();
    let similarity = strsim::jaro_winkler(query, &title) * 100.0;
    if title.contains(query) {
        similarity.max(CONTAINS_SCORE)
    } else {
        similarity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::{item, store};

    fn sample_store() -> CatalogStore {
        let mut items = vec![
            item(1, "The Witcher 3", &["RPG"], "CD Projekt"),
            item(2, "Witch It", &["Casual"], "Barrel Roll"),
            item(3, "Portal 2", &["Puzzle"], "Valve"),
            item(4, "Dota 2", &["Estratégia"], "Valve"),
        ];
        for (i, it) in items.iter_mut().enumerate() {
            it.popularity = (i + 1) as f64;
            it.search_text = format!("{} {}", it.title, it.authors.join(" ")).to_lowercase();
        }
        store(items, vec![vec![1.0]; 4])
    }

    fn titles(views: &[ItemView]) -> Vec<&str> {
        views.iter().map(|v| v.item.title.as_str()).collect()
    }

    #[test]
    fn test_blank_query_returns_nothing() {
        let store = sample_store();
        for domain in Domain::ALL {
            assert!(search(&store, &SearchSettings::for_domain(domain), "   ").is_empty());
        }
    }

    #[test]
    fn test_substring_by_popularity() {
        let store = sample_store();
        let found = search(&store, &SearchSettings::for_domain(Domain::Movies), "VALVE");
        assert_eq!(titles(&found), vec!["Dota 2", "Portal 2"]);
    }

    #[test]
    fn test_substring_in_catalog_order() {
        let store = sample_store();
        let found = search(&store, &SearchSettings::for_domain(Domain::Music), "valve");
        assert_eq!(titles(&found), vec!["Portal 2", "Dota 2"]);
    }

    #[test]
    fn test_fuzzy_ranks_closest_title_first() {
        let store = sample_store();
        let found = search(&store, &SearchSettings::for_domain(Domain::Games), "witcher");
        assert_eq!(found[0].item.title, "The Witcher 3");
        assert!(!titles(&found).contains(&"Dota 2"));
    }

    #[test]
    fn test_limit_applies() {
        let store = sample_store();
        let settings = SearchSettings {
            mode: SearchMode::Substring {
                rank_by_popularity: false,
            },
            limit: 1,
        };
        assert_eq!(search(&store, &settings, "2").len(), 1);
    }
}

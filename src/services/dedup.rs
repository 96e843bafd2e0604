use crate::catalog::CatalogStore;
use crate::models::Candidate;

/// Default similarity (0-100) at which two titles count as the same work
pub const DEFAULT_TITLE_THRESHOLD: f64 = 90.0;

/// How many ranked candidates are inspected per requested slot
const LOOKAHEAD_FACTOR: usize = 3;

/// Drops near-duplicate titles ("Spider-Man" / "Spider Man") from a ranked list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deduplicator {
    pub threshold: f64,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_TITLE_THRESHOLD,
        }
    }
}

impl Deduplicator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Keeps up to `count` candidates whose titles are all below the threshold
    /// of each other, walking at most `3 * count` ranked candidates.
    ///
    /// A shorter result is valid when too many near-duplicates exist.
    pub fn dedupe<'a, I>(&self, ranked: I, store: &CatalogStore, count: usize) -> Vec<Candidate>
    where
        I: IntoIterator<Item = &'a Candidate>,
    {
        let mut kept: Vec<Candidate> = Vec::with_capacity(count);
        let mut kept_titles: Vec<String> = Vec::with_capacity(count);

        for candidate in ranked.into_iter().take(count * LOOKAHEAD_FACTOR) {
            if kept.len() >= count {
                break;
            }

            let title = token_sort_key(&store.row(candidate.row).title);
            let redundant = kept_titles
                .iter()
                .any(|existing| title_similarity(&title, existing) >= self.threshold);

            if redundant {
                tracing::trace!(title = %store.row(candidate.row).title, "Dropping near-duplicate title");
                continue;
            }

            kept_titles.push(title);
            kept.push(candidate.clone());
        }

        kept
    }
}

/// Lower-cases, replaces punctuation with spaces and sorts the tokens
pub fn token_sort_key(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Token-sort ratio of two titles on a 0-100 scale
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    title_similarity(&token_sort_key(a), &token_sort_key(b))
}

fn title_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

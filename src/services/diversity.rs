use std::collections::HashMap;

use crate::catalog::CatalogStore;
use crate::models::Candidate;

use super::scoring::{sort_by_hybrid, sort_by_penalized};

/// Default per-occurrence decay for repeated authors
pub const DEFAULT_AUTHOR_DECAY: f64 = 0.85;

/// How rows without an author take part in the penalty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingAuthor {
    /// Never penalized
    Exempt,
    /// Counted together as one anonymous author
    Grouped,
}

/// Decaying penalty on repeated authorship (artist, developer, studio)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiversityPenalizer {
    pub decay: f64,
    pub missing_author: MissingAuthor,
}

impl Default for DiversityPenalizer {
    fn default() -> Self {
        Self::new(DEFAULT_AUTHOR_DECAY)
    }
}

impl DiversityPenalizer {
    pub fn new(decay: f64) -> Self {
        Self {
            decay,
            missing_author: MissingAuthor::Exempt,
        }
    }

    pub fn with_missing_author(mut self, missing_author: MissingAuthor) -> Self {
        self.missing_author = missing_author;
        self
    }

    /// Multiplier for the `occurrence`-th (0-based) item by the same author
    pub fn multiplier(&self, occurrence: u32) -> f64 {
        self.decay.powi(occurrence as i32)
    }

    /// Penalizes repeated authors and re-ranks by the penalized score.
    ///
    /// Occurrences are counted in descending hybrid-score order (stable on
    /// ties), so the best-scored item of each author keeps its full score.
    /// Items without an author follow [`MissingAuthor`].
    pub fn penalize(&self, mut candidates: Vec<Candidate>, store: &CatalogStore) -> Vec<Candidate> {
        sort_by_hybrid(&mut candidates);

        let mut author_counts: HashMap<&str, u32> = HashMap::new();
        for candidate in candidates.iter_mut() {
            // Real authors are never empty, so "" is free for the anonymous group
            let author = match (store.row(candidate.row).primary_author(), self.missing_author) {
                (Some(author), _) => Some(author),
                (None, MissingAuthor::Grouped) => Some(""),
                (None, MissingAuthor::Exempt) => None,
            };
            let multiplier = match author {
                Some(author) => {
                    let count = author_counts.entry(author).or_insert(0);
                    let multiplier = self.multiplier(*count);
                    *count += 1;
                    multiplier
                }
                None => 1.0,
            };
            candidate.penalized_score = candidate.hybrid_score * multiplier;
        }

        sort_by_penalized(&mut candidates);
        candidates
    }
}

//! Seed set → profile vector, or per-seed neighbour lists.

use std::collections::HashMap;

use ndarray::{Array1, Axis};

use crate::catalog::CatalogStore;
use crate::error::ScoringError;
use crate::models::{Candidate, Identifier};

use super::similarity::cosine;

/// Neighbours kept per seed in the per-seed variant
pub const DEFAULT_NEIGHBOURS_PER_SEED: usize = 20;

/// Mean feature vector of the seed items that exist in the catalog
pub fn build_profile(
    seed_ids: &[Identifier],
    store: &CatalogStore,
) -> Result<Array1<f32>, ScoringError> {
    let rows = store.resolve(seed_ids);
    profile_from_rows(&rows, store)
}

/// Mean feature vector of already-resolved rows
pub fn profile_from_rows(rows: &[usize], store: &CatalogStore) -> Result<Array1<f32>, ScoringError> {
    if rows.is_empty() {
        return Err(ScoringError::EmptySeed);
    }
    store
        .features()
        .select(Axis(0), rows)
        .mean_axis(Axis(0))
        .ok_or(ScoringError::EmptySeed)
}

/// Top-`k` non-seed neighbours of each seed row, merged into one candidate list.
///
/// A row reached from several seeds keeps its highest similarity. The result
/// is ordered by similarity descending, ties by row index.
pub fn seed_neighbours(
    seed_rows: &[usize],
    store: &CatalogStore,
    k: usize,
) -> Result<Vec<Candidate>, ScoringError> {
    if seed_rows.is_empty() {
        return Err(ScoringError::EmptySeed);
    }

    let mut best: HashMap<usize, f64> = HashMap::new();
    for &seed in seed_rows {
        let scores = cosine(store.feature_row(seed), store.features())?;

        let mut neighbours: Vec<(usize, f64)> = scores
            .iter()
            .enumerate()
            .filter(|(row, _)| !seed_rows.contains(row))
            .map(|(row, &score)| (row, score as f64))
            .collect();
        neighbours.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        neighbours.truncate(k);

        for (row, score) in neighbours {
            best.entry(row)
                .and_modify(|current| *current = current.max(score))
                .or_insert(score);
        }
    }

    let mut merged: Vec<Candidate> = best
        .into_iter()
        .map(|(row, similarity)| Candidate::new(row, similarity))
        .collect();
    merged.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then(a.row.cmp(&b.row))
    });

    tracing::debug!(
        seeds = seed_rows.len(),
        candidates = merged.len(),
        "Per-seed neighbours merged"
    );

    Ok(merged)
}

//! Cosine similarity between query vectors and the catalog feature matrix.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::ScoringError;

/// Cosine similarity of `query` against every row of `matrix`.
///
/// Zero-norm queries or rows score 0 instead of NaN.
pub fn cosine(
    query: ArrayView1<'_, f32>,
    matrix: ArrayView2<'_, f32>,
) -> Result<Array1<f32>, ScoringError> {
    if query.len() != matrix.ncols() {
        return Err(ScoringError::Dimension {
            expected: matrix.ncols(),
            found: query.len(),
        });
    }

    let query_norm = query.dot(&query).sqrt();
    if query_norm == 0.0 {
        return Ok(Array1::zeros(matrix.nrows()));
    }

    let dots = matrix.dot(&query);
    let scores = dots
        .iter()
        .zip(matrix.axis_iter(Axis(0)))
        .map(|(&dot, row)| {
            let row_norm = row.dot(&row).sqrt();
            if row_norm == 0.0 {
                0.0
            } else {
                (dot / (query_norm * row_norm)).clamp(-1.0, 1.0)
            }
        })
        .collect();

    Ok(scores)
}

/// Cosine similarity of several query rows against `matrix`; one output row per query
pub fn cosine_many(
    queries: ArrayView2<'_, f32>,
    matrix: ArrayView2<'_, f32>,
) -> Result<Array2<f32>, ScoringError> {
    let mut out = Array2::zeros((queries.nrows(), matrix.nrows()));
    for (query, mut target) in queries.axis_iter(Axis(0)).zip(out.axis_iter_mut(Axis(0))) {
        target.assign(&cosine(query, matrix)?);
    }
    Ok(out)
}

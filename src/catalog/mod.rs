//! In-memory catalog snapshot: the item table plus its row-aligned feature matrix.
//!
//! Loaded once per domain at startup and shared read-only between requests.
//! Row `i` of the feature matrix always describes `items[i]`; every filter
//! returns a [`RowSet`] of row indices instead of a re-ordered copy so that
//! alignment can never drift.

use std::collections::HashMap;
use std::path::Path;

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::CatalogError;
use crate::models::{CatalogItem, Identifier};

pub mod artifacts;

pub use artifacts::{ArtifactLayout, MatrixSource, QualitySource};

/// Ordered set of catalog row indices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet(Vec<usize>);

impl RowSet {
    pub fn new(rows: Vec<usize>) -> Self {
        Self(rows)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, row: usize) -> bool {
        self.0.contains(&row)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Keeps the rows for which `keep` holds, preserving order
    pub fn retain(mut self, mut keep: impl FnMut(usize) -> bool) -> Self {
        self.0.retain(|&row| keep(row));
        self
    }
}

impl FromIterator<usize> for RowSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Immutable, row-aligned catalog of one content domain
#[derive(Debug)]
pub struct CatalogStore {
    items: Vec<CatalogItem>,
    features: Array2<f32>,
    index: HashMap<Identifier, usize>,
    tags: Vec<String>,
    sorted_popularity: Vec<f64>,
}

impl CatalogStore {
    /// Loads and validates a domain's artifacts from `dir`
    pub fn load(dir: &Path, layout: &ArtifactLayout) -> Result<Self, CatalogError> {
        let (items, features, tags) = artifacts::load_artifacts(dir, layout)?;
        let store = Self::from_parts(items, features, tags)?;

        tracing::info!(
            dir = %dir.display(),
            items = store.len(),
            feature_width = store.feature_width(),
            tags = store.tags.len(),
            "Catalog loaded"
        );

        Ok(store)
    }

    /// Assembles a store from already-parsed parts, enforcing row alignment
    pub fn from_parts(
        items: Vec<CatalogItem>,
        features: Array2<f32>,
        tags: Vec<String>,
    ) -> Result<Self, CatalogError> {
        if items.is_empty() {
            return Err(CatalogError::Empty);
        }
        if features.nrows() != items.len() {
            return Err(CatalogError::RowMismatch {
                artifact: "features".to_string(),
                expected: items.len(),
                found: features.nrows(),
            });
        }

        let mut index = HashMap::with_capacity(items.len());
        for (row, item) in items.iter().enumerate() {
            if index.insert(item.id.clone(), row).is_some() {
                return Err(CatalogError::DuplicateId(item.id.to_string()));
            }
        }

        let mut sorted_popularity: Vec<f64> = items
            .iter()
            .map(|item| item.popularity)
            .filter(|p| p.is_finite())
            .collect();
        sorted_popularity.sort_by(|a, b| a.total_cmp(b));

        Ok(Self {
            items,
            features,
            index,
            tags,
            sorted_popularity,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maps identifiers to rows in order of first appearance.
    ///
    /// Unknown identifiers are dropped so a request can partially match;
    /// repeated identifiers resolve once.
    pub fn resolve(&self, ids: &[Identifier]) -> Vec<usize> {
        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(&row) = self.index.get(&id.clone().normalized()) {
                if !rows.contains(&row) {
                    rows.push(row);
                }
            }
        }
        rows
    }

    pub fn position(&self, id: &Identifier) -> Option<usize> {
        self.index.get(&id.clone().normalized()).copied()
    }

    /// Item at `row`; panics when `row` is outside the table
    pub fn row(&self, row: usize) -> &CatalogItem {
        &self.items[row]
    }

    pub fn get(&self, row: usize) -> Option<&CatalogItem> {
        self.items.get(row)
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn all_rows(&self) -> RowSet {
        RowSet((0..self.items.len()).collect())
    }

    /// Rows whose item satisfies `predicate`, in table order
    pub fn filter(&self, predicate: impl Fn(&CatalogItem) -> bool) -> RowSet {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| predicate(item))
            .map(|(row, _)| row)
            .collect()
    }

    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    pub fn feature_row(&self, row: usize) -> ArrayView1<'_, f32> {
        self.features.row(row)
    }

    pub fn feature_width(&self) -> usize {
        self.features.ncols()
    }

    /// Tag vocabulary served to clients
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Popularity quantile with linear interpolation between order statistics
    pub fn popularity_quantile(&self, q: f64) -> f64 {
        let values = &self.sorted_popularity;
        if values.is_empty() {
            return 0.0;
        }
        let q = q.clamp(0.0, 1.0);
        let position = q * (values.len() - 1) as f64;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let fraction = position - lower as f64;
        values[lower] + (values[upper] - values[lower]) * fraction
    }
}

use std::collections::HashSet;

use crate::catalog::CatalogStore;
use crate::models::{Candidate, CatalogItem, Identifier, RecommendationBucket};

use super::dedup::Deduplicator;
use super::scoring::{sort_by_hybrid, HybridScorer};

/// Item predicate a bucket draws with
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Any,
    HasTag(String),
    QualityAbove(f64),
    QualityBelow(f64),
    PopularityAbove(f64),
    PopularityBelow(f64),
    /// Release year strictly before the given year; undated items never match
    ReleasedBefore(i32),
    All(Vec<Criterion>),
}

impl Criterion {
    pub fn matches(&self, item: &CatalogItem) -> bool {
        match self {
            Criterion::Any => true,
            Criterion::HasTag(tag) => item.has_tag(tag),
            Criterion::QualityAbove(v) => item.quality > *v,
            Criterion::QualityBelow(v) => item.quality < *v,
            Criterion::PopularityAbove(v) => item.popularity > *v,
            Criterion::PopularityBelow(v) => item.popularity < *v,
            Criterion::ReleasedBefore(year) => item.release_year.is_some_and(|y| y < *year),
            Criterion::All(all) => all.iter().all(|c| c.matches(item)),
        }
    }
}

/// Order a bucket draws its matches in
#[derive(Debug, Clone, PartialEq)]
pub enum BucketOrdering {
    /// Pipeline ranking (penalized score)
    Ranked,
    /// Matches re-scored with their own formula before drawing
    Rescored(HybridScorer),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketSpec {
    pub name: String,
    pub criterion: Criterion,
    pub target: usize,
    pub ordering: BucketOrdering,
}

impl BucketSpec {
    pub fn new(name: impl Into<String>, criterion: Criterion, target: usize) -> Self {
        Self {
            name: name.into(),
            criterion,
            target,
            ordering: BucketOrdering::Ranked,
        }
    }

    pub fn rescored(mut self, scorer: HybridScorer) -> Self {
        self.ordering = BucketOrdering::Rescored(scorer);
        self
    }
}

/// Partitions `ranked` into buckets without replacement.
///
/// Buckets are filled in declared order. Each takes the best remaining
/// candidates matching its criterion (de-duplicated by title when `dedup` is
/// given), up to its target, and those items are excluded from every later
/// bucket. Short or empty buckets are normal outcomes.
pub fn allocate(
    ranked: &[Candidate],
    specs: &[BucketSpec],
    exclude_ids: &[Identifier],
    store: &CatalogStore,
    dedup: Option<&Deduplicator>,
) -> Vec<RecommendationBucket> {
    let mut excluded: HashSet<usize> = store.resolve(exclude_ids).into_iter().collect();
    let mut buckets = Vec::with_capacity(specs.len());

    for spec in specs {
        let mut pool: Vec<Candidate> = ranked
            .iter()
            .filter(|c| !excluded.contains(&c.row))
            .filter(|c| spec.criterion.matches(store.row(c.row)))
            .cloned()
            .collect();

        if let BucketOrdering::Rescored(scorer) = &spec.ordering {
            pool = scorer.score(pool, store, None);
            sort_by_hybrid(&mut pool);
        }

        let drawn: Vec<Candidate> = match dedup {
            Some(dedup) => dedup.dedupe(&pool, store, spec.target),
            None => pool.into_iter().take(spec.target).collect(),
        };

        excluded.extend(drawn.iter().map(|c| c.row));

        tracing::debug!(
            bucket = %spec.name,
            target = spec.target,
            drawn = drawn.len(),
            "Bucket allocated"
        );

        buckets.push(RecommendationBucket {
            name: spec.name.clone(),
            candidates: drawn,
        });
    }

    buckets
}

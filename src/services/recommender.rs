//! Per-domain recommendation pipeline.
//!
//! A [`Recommender`] owns one domain's catalog snapshot and its tuning
//! ([`DomainProfile`]). It is built once at startup and shared read-only;
//! everything mutable lives inside a single `recommend` call.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;

use crate::catalog::{ArtifactLayout, CatalogStore, MatrixSource, QualitySource};
use crate::error::{CatalogError, ScoringError};
use crate::models::recommendation::{BucketViews, MIN_SEED_ITEMS};
use crate::models::{
    Candidate, Domain, ItemView, ProfileSummary, RecommendationRequest, RecommendationResponse,
};

use super::allocation::{allocate, BucketSpec, Criterion};
use super::dedup::Deduplicator;
use super::display::DisplayNormalizer;
use super::diversity::{DiversityPenalizer, MissingAuthor};
use super::profile::{profile_from_rows, seed_neighbours, DEFAULT_NEIGHBOURS_PER_SEED};
use super::scoring::{HybridFormula, HybridScorer, SimilarityTransform};
use super::similarity::cosine;

const MAIN_BUCKET_SIZE: usize = 12;
const SIDE_BUCKET_SIZE: usize = 6;

/// How the candidate pool is derived from the seed rows
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CandidateSource {
    /// Every non-seed row, scored against the mean seed vector
    MeanProfile,
    /// Union of each seed's nearest non-seed rows
    SeedNeighbours { per_seed: usize },
}

/// Tuning constants and bucket layout of one domain
#[derive(Debug, Clone, PartialEq)]
pub struct DomainProfile {
    pub domain: Domain,
    pub candidates: CandidateSource,
    pub scorer: HybridScorer,
    pub penalizer: DiversityPenalizer,
    /// Title de-duplication inside each bucket draw
    pub dedup: Option<Deduplicator>,
    /// Candidates kept after penalisation; `None` keeps all
    pub pool_limit: Option<usize>,
    pub display: DisplayNormalizer,
}

impl DomainProfile {
    pub fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::Movies => Self::movies(),
            Domain::Music => Self::music(),
            Domain::Games => Self::games(),
        }
    }

    /// Ratings on 0-10; similarity capped at 0.35 before blending 70/30 with the rating
    pub fn movies() -> Self {
        Self {
            domain: Domain::Movies,
            candidates: CandidateSource::MeanProfile,
            scorer: HybridScorer::new(
                HybridFormula::Blend {
                    transform: SimilarityTransform::CappedLinear { ceiling: 0.35 },
                    similarity_weight: 0.7,
                    quality_weight: 0.3,
                },
                10.0,
            ),
            penalizer: DiversityPenalizer::default(),
            dedup: Some(Deduplicator::default()),
            pool_limit: None,
            display: DisplayNormalizer::with_floor(70.0),
        }
    }

    /// Pure similarity, sharpened with a fourth power, over per-seed neighbours
    pub fn music() -> Self {
        Self {
            domain: Domain::Music,
            candidates: CandidateSource::SeedNeighbours {
                per_seed: DEFAULT_NEIGHBOURS_PER_SEED,
            },
            scorer: HybridScorer::new(
                HybridFormula::Blend {
                    transform: SimilarityTransform::Power { exponent: 4 },
                    similarity_weight: 1.0,
                    quality_weight: 0.0,
                },
                100.0,
            ),
            penalizer: DiversityPenalizer::default(),
            dedup: None,
            pool_limit: Some(100),
            display: DisplayNormalizer::with_floor(70.0),
        }
    }

    /// Squared similarity scaled by a floored quality prior; explore tag boosted by 20%.
    /// Games without a developer are penalized as one group.
    pub fn games() -> Self {
        Self {
            domain: Domain::Games,
            candidates: CandidateSource::MeanProfile,
            scorer: HybridScorer::new(
                HybridFormula::QualityScaled {
                    exponent: 2,
                    quality_floor: 0.5,
                },
                100.0,
            )
            .with_explore_boost(1.2),
            penalizer: DiversityPenalizer::default().with_missing_author(MissingAuthor::Grouped),
            dedup: None,
            pool_limit: None,
            display: DisplayNormalizer::with_floor(85.0),
        }
    }

    /// Artifact files of this domain
    pub fn layout(&self, image_base_url: Option<String>) -> ArtifactLayout {
        let single = || vec![MatrixSource::new("features.json", 1.0)];
        let (matrices, quality) = match self.domain {
            Domain::Movies => (single(), QualitySource::Field),
            Domain::Music => (single(), QualitySource::PopularityPercent),
            Domain::Games => (
                vec![
                    MatrixSource::new("genres.json", 4.0),
                    MatrixSource::new("categories.json", 3.0),
                    MatrixSource::new("description.json", 1.0),
                    MatrixSource::new("developers.json", 1.0),
                ],
                QualitySource::Field,
            ),
        };

        ArtifactLayout {
            items_file: "items.json".to_string(),
            tags_file: "tags.json".to_string(),
            matrices,
            quality,
            image_base_url: match self.domain {
                Domain::Movies => image_base_url,
                _ => None,
            },
        }
    }

    /// Buckets for one request, in allocation order
    pub fn bucket_specs(
        &self,
        store: &CatalogStore,
        explore_tag: Option<&str>,
        dominant_tag: Option<&str>,
    ) -> Vec<BucketSpec> {
        let mut specs = vec![BucketSpec::new("main", Criterion::Any, MAIN_BUCKET_SIZE)];

        match self.domain {
            Domain::Movies => {
                if let Some(tag) = explore_tag {
                    specs.push(
                        BucketSpec::new(
                            "genre_favorites",
                            Criterion::HasTag(tag.to_string()),
                            SIDE_BUCKET_SIZE,
                        )
                        .rescored(HybridScorer::new(
                            HybridFormula::QualityPopularity {
                                quality_weight: 0.8,
                                popularity_weight: 0.2,
                            },
                            10.0,
                        )),
                    );
                }
                specs.push(BucketSpec::new(
                    "blockbusters",
                    Criterion::PopularityAbove(store.popularity_quantile(0.95)),
                    SIDE_BUCKET_SIZE,
                ));
                specs.push(BucketSpec::new(
                    "cult_classics",
                    Criterion::All(vec![
                        Criterion::ReleasedBefore(2005),
                        Criterion::QualityAbove(7.0),
                    ]),
                    SIDE_BUCKET_SIZE,
                ));
                specs.push(BucketSpec::new(
                    "hidden_gems",
                    Criterion::All(vec![
                        Criterion::QualityAbove(7.5),
                        Criterion::PopularityAbove(store.popularity_quantile(0.30)),
                        Criterion::PopularityBelow(store.popularity_quantile(0.70)),
                    ]),
                    SIDE_BUCKET_SIZE,
                ));
            }
            Domain::Games => {
                specs.push(BucketSpec::new(
                    "hidden_gems",
                    Criterion::QualityBelow(0.88),
                    SIDE_BUCKET_SIZE,
                ));
                if let Some(tag) = explore_tag {
                    specs.push(BucketSpec::new(
                        "genre_favorites",
                        Criterion::HasTag(tag.to_string()),
                        SIDE_BUCKET_SIZE,
                    ));
                }
            }
            Domain::Music => {
                if let Some(tag) = explore_tag {
                    specs.push(BucketSpec::new(
                        format!("exploring_{}", tag),
                        Criterion::HasTag(tag.to_string()),
                        SIDE_BUCKET_SIZE,
                    ));
                }
                if let Some(dominant) = dominant_tag {
                    let same_as_explore =
                        explore_tag.is_some_and(|tag| tag.eq_ignore_ascii_case(dominant));
                    if !same_as_explore {
                        specs.push(BucketSpec::new(
                            format!("based_on_{}", dominant),
                            Criterion::HasTag(dominant.to_string()),
                            SIDE_BUCKET_SIZE,
                        ));
                    }
                }
                specs.push(BucketSpec::new(
                    "hidden_gems",
                    Criterion::PopularityBelow(50.0),
                    SIDE_BUCKET_SIZE,
                ));
            }
        }

        specs
    }
}

/// One domain's catalog plus the pipeline that ranks it
#[derive(Debug)]
pub struct Recommender {
    profile: DomainProfile,
    store: CatalogStore,
}

impl Recommender {
    pub fn new(profile: DomainProfile, store: CatalogStore) -> Self {
        Self { profile, store }
    }

    /// Loads `domain`'s artifacts from `dir`
    pub fn load(
        domain: Domain,
        dir: &Path,
        image_base_url: Option<String>,
    ) -> Result<Self, CatalogError> {
        let profile = DomainProfile::for_domain(domain);
        let store = CatalogStore::load(dir, &profile.layout(image_base_url))?;
        Ok(Self::new(profile, store))
    }

    pub fn domain(&self) -> Domain {
        self.profile.domain
    }

    pub fn profile(&self) -> &DomainProfile {
        &self.profile
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// Runs the full pipeline for one seed set.
    ///
    /// Seeds never appear in any bucket, and no item appears in two buckets.
    pub fn recommend<R: Rng>(
        &self,
        request: &RecommendationRequest,
        rng: &mut R,
    ) -> Result<RecommendationResponse, ScoringError> {
        self.recommend_until(request, rng, &AtomicBool::new(false))
    }

    /// Like [`Recommender::recommend`], but gives up with
    /// [`ScoringError::Cancelled`] once `cancelled` is set. The flag is
    /// checked between pipeline stages.
    pub fn recommend_until<R: Rng>(
        &self,
        request: &RecommendationRequest,
        rng: &mut R,
        cancelled: &AtomicBool,
    ) -> Result<RecommendationResponse, ScoringError> {
        let checkpoint = || {
            if cancelled.load(Ordering::Relaxed) {
                Err(ScoringError::Cancelled)
            } else {
                Ok(())
            }
        };

        if request.item_ids.len() < MIN_SEED_ITEMS {
            return Err(ScoringError::InsufficientSeeds {
                required: MIN_SEED_ITEMS,
                given: request.item_ids.len(),
            });
        }

        let seed_rows = self.store.resolve(&request.item_ids);
        if seed_rows.is_empty() {
            return Err(ScoringError::EmptySeed);
        }

        let explore_tag = request.explore_tag();
        checkpoint()?;
        let candidates = self.candidates(&seed_rows)?;
        checkpoint()?;
        let scored = self.profile.scorer.score(candidates, &self.store, explore_tag);
        let mut ranked = self.profile.penalizer.penalize(scored, &self.store);
        if let Some(limit) = self.profile.pool_limit {
            ranked.truncate(limit);
        }
        checkpoint()?;

        let summary = self.summarize(&seed_rows);
        let specs = self
            .profile
            .bucket_specs(&self.store, explore_tag, summary.dominant_tag.as_deref());
        let buckets = allocate(
            &ranked,
            &specs,
            &request.item_ids,
            &self.store,
            self.profile.dedup.as_ref(),
        );

        let mut views = Vec::with_capacity(buckets.len());
        for mut bucket in buckets {
            self.profile.display.normalize(&mut bucket.candidates, rng);
            let items = bucket
                .candidates
                .iter()
                .map(|c| ItemView::scored(self.store.row(c.row), c))
                .collect();
            views.push((bucket.name, items));
        }
        let recommendations = BucketViews(views);

        tracing::info!(
            domain = %self.profile.domain,
            seeds = seed_rows.len(),
            pool = ranked.len(),
            returned = recommendations.total_items(),
            explore_tag = ?explore_tag,
            "Recommendations generated"
        );

        Ok(RecommendationResponse {
            recommendations,
            profile: summary,
            selected_tag: explore_tag.map(str::to_string),
        })
    }

    fn candidates(&self, seed_rows: &[usize]) -> Result<Vec<Candidate>, ScoringError> {
        match self.profile.candidates {
            CandidateSource::MeanProfile => {
                let profile = profile_from_rows(seed_rows, &self.store)?;
                let scores = cosine(profile.view(), self.store.features())?;
                Ok(self
                    .store
                    .all_rows()
                    .retain(|row| !seed_rows.contains(&row))
                    .iter()
                    .map(|row| Candidate::new(row, scores[row] as f64))
                    .collect())
            }
            CandidateSource::SeedNeighbours { per_seed } => {
                seed_neighbours(seed_rows, &self.store, per_seed)
            }
        }
    }

    /// Seed items, their most frequent tag (ties by first appearance) and all their tags
    fn summarize(&self, seed_rows: &[usize]) -> ProfileSummary {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for &row in seed_rows {
            for tag in &self.store.row(row).tags {
                match counts.iter_mut().find(|(seen, _)| *seen == tag.as_str()) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((tag.as_str(), 1)),
                }
            }
        }

        let mut dominant: Option<(&str, usize)> = None;
        for &(tag, count) in &counts {
            if dominant.map_or(true, |(_, best)| count > best) {
                dominant = Some((tag, count));
            }
        }

        let mut tags: Vec<String> = counts.iter().map(|(tag, _)| tag.to_string()).collect();
        tags.sort();

        ProfileSummary {
            items: seed_rows
                .iter()
                .map(|&row| ItemView::plain(self.store.row(row)))
                .collect(),
            dominant_tag: dominant.map(|(tag, _)| tag.to_string()),
            tags,
        }
    }
}

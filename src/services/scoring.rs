use crate::catalog::CatalogStore;
use crate::models::Candidate;

/// Maps raw cosine similarity onto a 0-100 scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimilarityTransform {
    /// `min(sim / ceiling * 95, 99)`
    CappedLinear { ceiling: f64 },
    /// `sim^exponent * 100`; stretches the top of a narrow similarity range
    Power { exponent: i32 },
}

impl SimilarityTransform {
    pub fn apply(&self, similarity: f64) -> f64 {
        // Negative similarity means unrelated, not "inversely related".
        let similarity = similarity.max(0.0);
        match *self {
            SimilarityTransform::CappedLinear { ceiling } => {
                if ceiling <= 0.0 {
                    return 0.0;
                }
                (similarity / ceiling * 95.0).min(99.0)
            }
            SimilarityTransform::Power { exponent } => similarity.powi(exponent) * 100.0,
        }
    }
}

/// How similarity and the quality prior are combined into one score
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HybridFormula {
    /// `f(sim) * similarity_weight + g(quality) * quality_weight`
    Blend {
        transform: SimilarityTransform,
        similarity_weight: f64,
        quality_weight: f64,
    },
    /// `sim^exponent * (quality * (1 - floor) + floor) * 100`
    QualityScaled { exponent: i32, quality_floor: f64 },
    /// `g(quality) * quality_weight + popularity_share * popularity_weight`,
    /// popularity relative to the most popular candidate in the pool
    QualityPopularity {
        quality_weight: f64,
        popularity_weight: f64,
    },
}

/// Blends content similarity with a quality prior
#[derive(Debug, Clone, PartialEq)]
pub struct HybridScorer {
    pub formula: HybridFormula,
    /// Multiplier taking the domain's quality value to 0-100 (10 for 0-10 ratings, 100 for fractions)
    pub quality_scale: f64,
    /// Multiplier for candidates carrying the requested explore tag
    pub explore_boost: Option<f64>,
}

impl HybridScorer {
    pub fn new(formula: HybridFormula, quality_scale: f64) -> Self {
        Self {
            formula,
            quality_scale,
            explore_boost: None,
        }
    }

    pub fn with_explore_boost(mut self, boost: f64) -> Self {
        self.explore_boost = Some(boost);
        self
    }

    /// Sets `hybrid_score` (and resets `penalized_score` to it) on every candidate
    pub fn score(
        &self,
        mut candidates: Vec<Candidate>,
        store: &CatalogStore,
        explore_tag: Option<&str>,
    ) -> Vec<Candidate> {
        let max_popularity = candidates
            .iter()
            .map(|c| store.row(c.row).popularity)
            .fold(0.0_f64, f64::max);

        for candidate in candidates.iter_mut() {
            let item = store.row(candidate.row);
            let quality = item.quality * self.quality_scale;

            let mut score = match self.formula {
                HybridFormula::Blend {
                    transform,
                    similarity_weight,
                    quality_weight,
                } => transform.apply(candidate.similarity) * similarity_weight + quality * quality_weight,
                HybridFormula::QualityScaled {
                    exponent,
                    quality_floor,
                } => {
                    let prior = item.quality * (1.0 - quality_floor) + quality_floor;
                    candidate.similarity.max(0.0).powi(exponent) * prior * 100.0
                }
                HybridFormula::QualityPopularity {
                    quality_weight,
                    popularity_weight,
                } => {
                    let popularity = if max_popularity > 0.0 {
                        item.popularity / max_popularity * 100.0
                    } else {
                        0.0
                    };
                    quality * quality_weight + popularity * popularity_weight
                }
            };

            if let (Some(boost), Some(tag)) = (self.explore_boost, explore_tag) {
                if item.has_tag(tag) {
                    score *= boost;
                }
            }

            candidate.hybrid_score = score;
            candidate.penalized_score = score;
        }

        candidates
    }
}

/// Stable descending sort by hybrid score
pub fn sort_by_hybrid(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.hybrid_score.total_cmp(&a.hybrid_score));
}

/// Stable descending sort by penalized score
pub fn sort_by_penalized(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.penalized_score.total_cmp(&a.penalized_score));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::{item, store};

    fn sample_store() -> CatalogStore {
        let mut rpg = item(1, "Witcher", &["RPG"], "CD Projekt");
        rpg.quality = 0.8;
        rpg.popularity = 50.0;
        let mut shooter = item(2, "Doom", &["Ação"], "id Software");
        shooter.quality = 0.8;
        shooter.popularity = 100.0;
        store(vec![rpg, shooter], vec![vec![1.0], vec![1.0]])
    }

    fn candidates(similarity: f64) -> Vec<Candidate> {
        vec![Candidate::new(0, similarity), Candidate::new(1, similarity)]
    }

    #[test]
    fn test_capped_linear_transform() {
        let t = SimilarityTransform::CappedLinear { ceiling: 0.35 };
        assert!((t.apply(0.35) - 95.0).abs() < 1e-9);
        assert_eq!(t.apply(0.9), 99.0);
        assert_eq!(t.apply(-0.2), 0.0);
    }

    #[test]
    fn test_power_transform_separates_top() {
        let t = SimilarityTransform::Power { exponent: 4 };
        assert!((t.apply(0.9) - 65.61).abs() < 1e-9);
        assert!((t.apply(0.5) - 6.25).abs() < 1e-9);
    }

    #[test]
    fn test_blend_canonical_weights() {
        let mut movie = item(1, "Movie", &[], "");
        movie.quality = 8.0;
        let store = store(vec![movie], vec![vec![1.0]]);
        let scorer = HybridScorer::new(
            HybridFormula::Blend {
                transform: SimilarityTransform::CappedLinear { ceiling: 0.35 },
                similarity_weight: 0.7,
                quality_weight: 0.3,
            },
            10.0,
        );
        let scored = scorer.score(vec![Candidate::new(0, 0.35)], &store, None);
        // 95 * 0.7 + 80 * 0.3
        assert!((scored[0].hybrid_score - 90.5).abs() < 1e-9);
        assert_eq!(scored[0].penalized_score, scored[0].hybrid_score);
    }

    #[test]
    fn test_quality_scaled_formula() {
        let store = sample_store();
        let scorer = HybridScorer::new(
            HybridFormula::QualityScaled {
                exponent: 2,
                quality_floor: 0.5,
            },
            100.0,
        );
        let scored = scorer.score(candidates(0.5), &store, None);
        // 0.25 * (0.8 * 0.5 + 0.5) * 100
        assert!((scored[0].hybrid_score - 22.5).abs() < 1e-9);
    }

    #[test]
    fn test_explore_boost_only_for_tagged_items() {
        let store = sample_store();
        let scorer = HybridScorer::new(
            HybridFormula::QualityScaled {
                exponent: 2,
                quality_floor: 0.5,
            },
            100.0,
        )
        .with_explore_boost(1.2);
        let scored = scorer.score(candidates(0.5), &store, Some("rpg"));
        assert!((scored[0].hybrid_score - 27.0).abs() < 1e-9);
        assert!((scored[1].hybrid_score - 22.5).abs() < 1e-9);
    }

    #[test]
    fn test_quality_popularity_relative_to_pool() {
        let store = sample_store();
        let scorer = HybridScorer::new(
            HybridFormula::QualityPopularity {
                quality_weight: 0.8,
                popularity_weight: 0.2,
            },
            100.0,
        );
        let scored = scorer.score(candidates(0.0), &store, None);
        // 80 * 0.8 + 50 * 0.2 and 80 * 0.8 + 100 * 0.2
        assert!((scored[0].hybrid_score - 74.0).abs() < 1e-9);
        assert!((scored[1].hybrid_score - 84.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_candidates_score_to_empty() {
        let store = sample_store();
        let scorer = HybridScorer::new(
            HybridFormula::QualityScaled {
                exponent: 2,
                quality_floor: 0.5,
            },
            100.0,
        );
        assert!(scorer.score(vec![], &store, Some("RPG")).is_empty());
    }

    #[test]
    fn test_sort_by_hybrid_is_stable() {
        let mut list = vec![
            Candidate::new(0, 0.0),
            Candidate::new(1, 0.0),
            Candidate::new(2, 0.0),
        ];
        list[0].hybrid_score = 1.0;
        list[1].hybrid_score = 2.0;
        list[2].hybrid_score = 1.0;
        sort_by_hybrid(&mut list);
        let rows: Vec<usize> = list.iter().map(|c| c.row).collect();
        assert_eq!(rows, vec![1, 0, 2]);
    }
}

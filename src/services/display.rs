//! Presentation-layer percentages for ranked candidates.
//!
//! The top three ranks get fixed, slightly randomised bands so the best
//! matches always read as strong matches; the remainder is min-max
//! normalised and curved into `[floor, 94]`. The random source is injected so
//! tests (and deployments that want stable output) can seed it.

use rand::Rng;

use crate::models::Candidate;

/// Bands for ranks 0, 1 and 2
const TOP_BANDS: [(f64, f64); 3] = [(98.0, 99.0), (96.0, 97.0), (95.0, 96.0)];
const REST_CEILING: f64 = 94.0;
const REST_EXPONENT: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayNormalizer {
    pub floor: f64,
    pub ceiling: f64,
    /// Used for ranks >= 3 when they all share one underlying score
    pub degenerate: f64,
}

impl DisplayNormalizer {
    /// Normalizer with the degenerate value at the middle of `[floor, 94]`.
    ///
    /// For floor 70 this is 82. For games a `floor + 12` value would be 97,
    /// above the ceiling and inside the top bands, so the midpoint is used there too.
    pub fn with_floor(floor: f64) -> Self {
        Self {
            floor,
            ceiling: REST_CEILING,
            degenerate: (floor + REST_CEILING) / 2.0,
        }
    }

    /// Assigns `display_score` to every candidate, by position in `ranked`
    pub fn normalize<R: Rng>(&self, ranked: &mut [Candidate], rng: &mut R) {
        for (candidate, &(low, high)) in ranked.iter_mut().zip(TOP_BANDS.iter()) {
            candidate.display_score = Some(rng.gen_range(low..=high));
        }

        let rest = match ranked.get_mut(TOP_BANDS.len()..) {
            Some(rest) if !rest.is_empty() => rest,
            _ => return,
        };

        let (min, max) = rest.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.penalized_score), hi.max(c.penalized_score))
        });

        if max > min {
            for candidate in rest.iter_mut() {
                let normalized = (candidate.penalized_score - min) / (max - min);
                candidate.display_score =
                    Some(self.floor + normalized.powf(REST_EXPONENT) * (self.ceiling - self.floor));
            }
        } else {
            for candidate in rest.iter_mut() {
                candidate.display_score = Some(self.degenerate);
            }
        }
    }
}

//! Token affinity scoring
//!
//! Turns the raw counts of a token (or of its degenerated variants) into a
//! smoothed probability that the token belongs to the improbable class.

use super::types::{ContextAggregate, TokenCount, TokenLookup};

/// Laplace-smoothed affinity of a token towards the improbable class.
///
/// The result is strictly inside (0, 1): 0.5 for a token seen equally in
/// both classes (with balanced aggregates), closer to 1 the more the token
/// leans to the improbable class.
pub fn affinity(count: TokenCount, aggregate: &ContextAggregate) -> f64 {
    let total = aggregate.total() as f64;

    // Only an all-zero aggregate can produce a zero denominator.
    let neg_denominator = (aggregate.negative_count as f64 + total).max(1.0);
    let pos_denominator = (aggregate.positive_count as f64 + total).max(1.0);

    let neg_probability = (count.neg as f64 + 1.0) / neg_denominator;
    let pos_probability = (count.pos as f64 + 1.0) / pos_denominator;

    neg_probability / (neg_probability + pos_probability)
}

/// Distance of a score from the neutral midpoint
pub fn importance(score: f64) -> f64 {
    (0.5 - score).abs()
}

/// Score of one token
#[derive(Debug, Clone, PartialEq)]
pub struct TokenScore {
    pub score: f64,
    /// Variant that supplied the score, when the token itself is unknown
    pub variant: Option<String>,
}

/// Affinity scorer with fallback to degenerated variants
#[derive(Debug, Clone)]
pub struct AffinityScorer {
    rob_x: f64,
}

impl AffinityScorer {
    /// Create a scorer; `rob_x` is the score of a token nothing is known about
    pub fn new(rob_x: f64) -> Self {
        Self { rob_x }
    }

    /// Score a looked-up token.
    ///
    /// Among degenerated variants the most opinionated one wins (largest
    /// deviation from 0.5, first in variant order on ties).
    pub fn score(&self, lookup: &TokenLookup, aggregate: &ContextAggregate) -> TokenScore {
        match lookup {
            TokenLookup::Direct(count) => TokenScore {
                score: affinity(*count, aggregate),
                variant: None,
            },
            TokenLookup::Degenerated(variants) => {
                let mut best: Option<(&str, f64)> = None;
                for (variant, count) in variants {
                    let score = affinity(*count, aggregate);
                    match best {
                        Some((_, best_score)) if importance(score) <= importance(best_score) => {}
                        _ => best = Some((variant.as_str(), score)),
                    }
                }

                match best {
                    Some((variant, score)) => TokenScore {
                        score,
                        variant: Some(variant.to_string()),
                    },
                    None => self.unknown(),
                }
            }
            TokenLookup::Unknown => self.unknown(),
        }
    }

    fn unknown(&self) -> TokenScore {
        TokenScore {
            score: self.rob_x,
            variant: None,
        }
    }
}

//! Relevance selection and score combination
//!
//! Picks the most informative tokens of a document and merges their
//! affinities with Robinson's geometric-mean method.

use std::cmp::Ordering;

use super::types::{Classification, RelevantToken};

/// Probability reported when no token carries information
pub const NEUTRAL: f64 = 0.5;

/// Relevance selector and combiner
#[derive(Debug, Clone)]
pub struct Combiner {
    min_dev: f64,
    use_relevant: usize,
}

impl Combiner {
    /// Create a combiner keeping up to `use_relevant` tokens above `min_dev`
    pub fn new(min_dev: f64, use_relevant: usize) -> Self {
        Self {
            min_dev,
            use_relevant,
        }
    }

    /// Keep at most `use_relevant` distinct tokens, most important first,
    /// dropping those whose importance does not exceed `min_dev`.
    pub fn select(&self, mut candidates: Vec<RelevantToken>) -> Vec<RelevantToken> {
        candidates.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.token.cmp(&b.token))
        });

        candidates
            .into_iter()
            .take(self.use_relevant)
            .filter(|candidate| candidate.importance > self.min_dev)
            .collect()
    }

    /// Select the relevant tokens and combine them into one probability.
    /// A token occurring `k` times contributes its score `k` times.
    pub fn classify(&self, candidates: Vec<RelevantToken>) -> Classification {
        let relevant = self.select(candidates);

        let scores: Vec<f64> = relevant
            .iter()
            .flat_map(|token| std::iter::repeat(token.score).take(token.occurrences as usize))
            .collect();

        Classification {
            probability: combine(&scores),
            relevant,
        }
    }
}

/// Robinson's combination of token scores.
///
/// Returns [`NEUTRAL`] for an empty slice. Geometric means are computed in
/// log space so long documents do not underflow.
pub fn combine(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return NEUTRAL;
    }

    let n = scores.len() as f64;
    let mean_ln_complement = scores.iter().map(|s| (1.0 - s).ln()).sum::<f64>() / n;
    let mean_ln_score = scores.iter().map(|s| s.ln()).sum::<f64>() / n;

    // 1 - geometric mean, via exp_m1 to keep precision near 1
    let h = -mean_ln_complement.exp_m1();
    let s = -mean_ln_score.exp_m1();

    let indicator = (h - s) / (h + s);
    ((1.0 + indicator) / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::scorer::importance;

    fn token(name: &str, score: f64, occurrences: u32) -> RelevantToken {
        RelevantToken {
            token: name.to_string(),
            score,
            importance: importance(score),
            occurrences,
            variant: None,
        }
    }

    #[test]
    fn test_combine_empty_is_neutral() {
        assert_eq!(combine(&[]), 0.5);
    }

    #[test]
    fn test_combine_single_score() {
        assert!((combine(&[0.8]) - 0.8).abs() < 1e-12);
        assert!((combine(&[1.0 / 3.0]) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_combine_symmetric_scores_cancel() {
        assert!((combine(&[0.2, 0.8]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_combine_orientation() {
        assert!(combine(&[0.9, 0.8, 0.7]) > 0.5);
        assert!(combine(&[0.1, 0.2, 0.3]) < 0.5);
    }

    #[test]
    fn test_combine_long_document_stable() {
        let scores = vec![0.99; 5000];
        let probability = combine(&scores);

        assert!(probability.is_finite());
        assert!((probability - 0.99).abs() < 1e-9);
    }

    #[test]
    fn test_select_orders_and_caps() {
        let combiner = Combiner::new(0.01, 2);
        let selected = combiner.select(vec![
            token("weak", 0.55, 1),
            token("strong", 0.95, 1),
            token("medium", 0.2, 1),
        ]);

        let names: Vec<&str> = selected.iter().map(|t| t.token.as_str()).collect();
        assert_eq!(names, vec!["strong", "medium"]);
    }

    #[test]
    fn test_select_drops_below_min_dev() {
        let combiner = Combiner::new(0.1, 15);
        let selected = combiner.select(vec![token("neutral", 0.52, 1), token("signal", 0.9, 1)]);

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].token, "signal");
    }

    #[test]
    fn test_select_ties_broken_by_token() {
        let combiner = Combiner::new(0.01, 1);
        let selected = combiner.select(vec![token("beta", 0.9, 1), token("alpha", 0.9, 1)]);

        assert_eq!(selected[0].token, "alpha");
    }

    #[test]
    fn test_classify_nothing_relevant_is_neutral() {
        let combiner = Combiner::new(0.01, 15);
        let classification = combiner.classify(vec![token("a", 0.5, 3), token("b", 0.505, 1)]);

        assert_eq!(classification.probability, 0.5);
        assert!(classification.relevant.is_empty());
    }

    #[test]
    fn test_classify_repeat_weighting() {
        let combiner = Combiner::new(0.01, 15);

        let once = combiner.classify(vec![token("good", 0.2, 1), token("bad", 0.9, 1)]);
        let repeated = combiner.classify(vec![token("good", 0.2, 1), token("bad", 0.9, 4)]);

        assert!(repeated.probability > once.probability);
        assert_eq!(repeated.relevant.len(), 2);
    }
}

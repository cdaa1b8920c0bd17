//! Token degeneration
//!
//! Builds morphological variants of a token (case variants, trailing
//! punctuation stripped) so an unknown token can still be matched against
//! the learned vocabulary.

use std::collections::HashMap;

use crate::config::DegeneratorConfig;

/// Variant generator with a per-instance memo cache
#[derive(Debug, Default)]
pub struct Degenerator {
    config: DegeneratorConfig,
    degenerates: HashMap<String, Vec<String>>,
}

impl Degenerator {
    /// Create a new degenerator
    pub fn new(config: DegeneratorConfig) -> Self {
        Self {
            config,
            degenerates: HashMap::new(),
        }
    }

    /// Get current config
    pub fn config(&self) -> &DegeneratorConfig {
        &self.config
    }

    /// Degenerate a list of words
    pub fn degenerate<'a, I>(&mut self, words: I) -> HashMap<String, Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        words
            .into_iter()
            .map(|word| (word.to_string(), self.degenerate_word(word)))
            .collect()
    }

    /// Variants of `word`, excluding `word` itself. Results are cached for
    /// the lifetime of the degenerator.
    pub fn degenerate_word(&mut self, word: &str) -> Vec<String> {
        if let Some(cached) = self.degenerates.get(word) {
            return cached.clone();
        }

        // `multibyte` is reserved: Rust's case mapping is already Unicode-aware.
        let mut candidates: Vec<String> = [word.to_lowercase(), word.to_uppercase(), title_case(word)]
            .into_iter()
            .filter(|variant| variant != word)
            .collect();
        candidates.push(word.to_string());

        let mut variants = candidates.clone();
        for candidate in &candidates {
            let stem = candidate.trim_end_matches(|c| c == '!' || c == '?');
            let run = candidate.len() - stem.len();
            if run > 0 {
                if run >= 2 {
                    variants.push(format!("{}{}", stem, &candidate[candidate.len() - 1..]));
                }
                variants.push(stem.to_string());
            }

            let mut stripped = candidate.as_str();
            while let Some(shorter) = stripped.strip_suffix('.') {
                variants.push(shorter.to_string());
                stripped = shorter;
            }
        }

        let mut unique: Vec<String> = Vec::with_capacity(variants.len());
        for variant in variants {
            if variant != word && !unique.contains(&variant) {
                unique.push(variant);
            }
        }

        self.degenerates.insert(word.to_string(), unique.clone());
        unique
    }

    /// Number of words in the memo cache
    pub fn cached(&self) -> usize {
        self.degenerates.len()
    }
}

/// First character uppercase, the rest lowercase
fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            let mut title: String = first.to_uppercase().collect();
            title.push_str(&chars.as_str().to_lowercase());
            title
        }
        None => String::new(),
    }
}

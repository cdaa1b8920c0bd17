//! Classifier engine
//!
//! Ties the lexer, degenerator, token store, scorer and combiner together:
//! text in, probability out; and learn/unlearn of whole documents.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::combiner::Combiner;
use super::learner::Learner;
use super::scorer::{importance, AffinityScorer};
use super::types::*;
use crate::config::B8Config;
use crate::degenerator::Degenerator;
use crate::error::{B8Error, Result};
use crate::lexer::{Lexer, TokenCounts};
use crate::storage::{SqliteStorage, TokenStore};

/// The classifier.
///
/// Learn, unlearn and classify calls against the same context read and
/// write shared counters without locking; the caller must serialize them.
pub struct B8 {
    config: B8Config,
    lexer: Lexer,
    degenerator: Mutex<Degenerator>,
    scorer: AffinityScorer,
    combiner: Combiner,
    storage: Arc<dyn TokenStore>,
}

impl B8 {
    /// Create a classifier on top of a token store
    pub async fn new(config: B8Config, storage: Arc<dyn TokenStore>) -> Result<Self> {
        config.validate()?;

        let lexer = Lexer::new(config.lexer.clone())?;
        storage.create_context(DEFAULT_CONTEXT).await?;

        Ok(Self {
            lexer,
            degenerator: Mutex::new(Degenerator::new(config.degenerator.clone())),
            scorer: AffinityScorer::new(config.rob_x),
            combiner: Combiner::new(config.min_dev, config.use_relevant),
            storage,
            config,
        })
    }

    /// Create a classifier backed by the SQLite database named in the config
    pub async fn open(config: B8Config) -> Result<Self> {
        let storage = SqliteStorage::connect(&config.storage.database_url).await?;
        Self::new(config, Arc::new(storage)).await
    }

    /// Get current config
    pub fn config(&self) -> &B8Config {
        &self.config
    }

    /// Get the token store
    pub fn storage(&self) -> &Arc<dyn TokenStore> {
        &self.storage
    }

    /// Tokenize text with the configured lexer
    pub fn tokenize(&self, text: &str) -> TokenCounts {
        self.lexer.tokenize(text)
    }

    /// Probability that `text` belongs to the improbable class
    pub async fn classify(&self, text: &str, context: &str) -> Result<f64> {
        Ok(self.classify_detailed(text, context).await?.probability)
    }

    /// Classify and report which tokens decided the result
    pub async fn classify_detailed(&self, text: &str, context: &str) -> Result<Classification> {
        let tokens = self.lexer.tokenize(text);
        self.classify_tokens_detailed(&tokens, context).await
    }

    /// Classify an already tokenized document
    pub async fn classify_tokens(&self, tokens: &TokenCounts, context: &str) -> Result<f64> {
        Ok(self.classify_tokens_detailed(tokens, context).await?.probability)
    }

    /// Classify an already tokenized document and report the deciding tokens
    pub async fn classify_tokens_detailed(
        &self,
        tokens: &TokenCounts,
        context: &str,
    ) -> Result<Classification> {
        check_context(context)?;
        let aggregate = self.storage.get_aggregate(context).await?;

        let names: Vec<String> = tokens.keys().cloned().collect();
        let lookups = self.lookup(&names, context).await?;

        let candidates: Vec<RelevantToken> = names
            .into_iter()
            .map(|token| {
                let lookup = lookups.get(&token).unwrap_or(&TokenLookup::Unknown);
                let scored = self.scorer.score(lookup, &aggregate);
                let occurrences = tokens.get(&token).copied().unwrap_or(0);

                RelevantToken {
                    importance: importance(scored.score),
                    score: scored.score,
                    occurrences,
                    variant: scored.variant,
                    token,
                }
            })
            .collect();

        let classification = self.combiner.classify(candidates);
        debug!(
            "Classified {} tokens in context {}: {} relevant, probability {:.6}",
            tokens.len(),
            context,
            classification.relevant.len(),
            classification.probability
        );

        Ok(classification)
    }

    /// Look tokens up directly, falling back to their degenerated variants
    pub async fn lookup(
        &self,
        tokens: &[String],
        context: &str,
    ) -> Result<HashMap<String, TokenLookup>> {
        let direct = self.storage.get_token_counts(tokens, context).await?;

        let degenerates: HashMap<&str, Vec<String>> = {
            let mut degenerator = self.degenerator.lock().await;
            tokens
                .iter()
                .filter(|token| !direct.contains_key(token.as_str()))
                .map(|token| (token.as_str(), degenerator.degenerate_word(token)))
                .collect()
        };

        let mut variants: Vec<String> = degenerates.values().flatten().cloned().collect();
        variants.sort();
        variants.dedup();

        let found = if variants.is_empty() {
            HashMap::new()
        } else {
            self.storage.get_token_counts(&variants, context).await?
        };

        let lookups = tokens
            .iter()
            .map(|token| {
                let lookup = match direct.get(token) {
                    Some(count) => TokenLookup::Direct(*count),
                    None => {
                        let matches: Vec<(String, TokenCount)> = degenerates
                            .get(token.as_str())
                            .map(|variants| {
                                variants
                                    .iter()
                                    .filter_map(|v| found.get(v).map(|count| (v.clone(), *count)))
                                    .collect()
                            })
                            .unwrap_or_default();

                        if matches.is_empty() {
                            TokenLookup::Unknown
                        } else {
                            TokenLookup::Degenerated(matches)
                        }
                    }
                };
                (token.clone(), lookup)
            })
            .collect();

        Ok(lookups)
    }

    /// Learn a document as `category`
    pub async fn learn(&self, text: &str, category: Category, context: &str) -> Result<LearnReport> {
        self.process_text(text, category, Action::Learn, context).await
    }

    /// Take back a previously learned document
    pub async fn unlearn(
        &self,
        text: &str,
        category: Category,
        context: &str,
    ) -> Result<LearnReport> {
        self.process_text(text, category, Action::Unlearn, context).await
    }

    /// Learn an already tokenized document
    pub async fn learn_tokens(
        &self,
        tokens: &TokenCounts,
        category: Category,
        context: &str,
    ) -> Result<LearnReport> {
        self.process_tokens(tokens, category, Action::Learn, context).await
    }

    /// Unlearn an already tokenized document
    pub async fn unlearn_tokens(
        &self,
        tokens: &TokenCounts,
        category: Category,
        context: &str,
    ) -> Result<LearnReport> {
        self.process_tokens(tokens, category, Action::Unlearn, context).await
    }

    async fn process_text(
        &self,
        text: &str,
        category: Category,
        action: Action,
        context: &str,
    ) -> Result<LearnReport> {
        if text.trim().is_empty() {
            return Err(B8Error::TextMissing);
        }

        let tokens = self.lexer.tokenize(text);
        self.process_tokens(&tokens, category, action, context).await
    }

    async fn process_tokens(
        &self,
        tokens: &TokenCounts,
        category: Category,
        action: Action,
        context: &str,
    ) -> Result<LearnReport> {
        check_context(context)?;
        // A document without tokens must not move the class priors
        if tokens.is_empty() {
            return Err(B8Error::TextMissing);
        }

        Learner::new(self.storage.as_ref())
            .apply(tokens, category, action, context)
            .await
    }

    /// Aggregate and token total of a context
    pub async fn stats(&self, context: &str) -> Result<ContextStats> {
        check_context(context)?;

        Ok(ContextStats {
            context: context.to_string(),
            aggregate: self.storage.get_aggregate(context).await?,
            tokens: self.storage.token_total(context).await?,
        })
    }

    /// Names of all contexts
    pub async fn contexts(&self) -> Result<Vec<String>> {
        self.storage.list_contexts().await
    }
}

fn check_context(context: &str) -> Result<()> {
    if context.trim().is_empty() {
        return Err(B8Error::InvalidContext(context.to_string()));
    }
    Ok(())
}

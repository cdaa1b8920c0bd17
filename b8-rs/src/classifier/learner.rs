//! Learning and unlearning
//!
//! Token writes are applied one by one. A failed write is reported and the
//! batch continues, so a failure leaves the earlier writes of the same call
//! in place; only the aggregate update decides whether the call succeeds.

use tracing::{info, warn};

use super::types::{Action, Category, LearnReport, TokenCount};
use crate::error::{B8Error, Result};
use crate::lexer::TokenCounts;
use crate::storage::TokenStore;

enum Change {
    Created,
    Updated,
    Deleted,
    Skipped,
}

/// Applies learn/unlearn mutations to a token store
pub struct Learner<'a> {
    storage: &'a dyn TokenStore,
}

impl<'a> Learner<'a> {
    pub fn new(storage: &'a dyn TokenStore) -> Self {
        Self { storage }
    }

    /// Learn or unlearn one document's tokens under `category`.
    ///
    /// Learning creates the context on first use; unlearning from a context
    /// that does not exist fails with `ContextNotFound`.
    pub async fn apply(
        &self,
        tokens: &TokenCounts,
        category: Category,
        action: Action,
        context: &str,
    ) -> Result<LearnReport> {
        if !self.storage.context_exists(context).await? {
            match action {
                Action::Learn => {
                    info!("Creating context {}", context);
                    self.storage.create_context(context).await?;
                }
                Action::Unlearn => return Err(B8Error::ContextNotFound(context.to_string())),
            }
        }

        let mut names: Vec<String> = tokens.keys().cloned().collect();
        names.sort();

        let existing = self.storage.get_token_counts(&names, context).await?;
        let mut report = LearnReport::new(context, category, action);

        for token in &names {
            let occurrences = u64::from(tokens.get(token).copied().unwrap_or(0));

            let outcome = match existing.get(token) {
                _ if occurrences == 0 => Ok(Change::Skipped),
                Some(count) => {
                    let next = count.apply(category, action, occurrences);
                    if next.is_empty() {
                        self.storage
                            .delete_token(token, context)
                            .await
                            .map(|()| Change::Deleted)
                    } else {
                        self.storage
                            .set_token_counts(token, next, context)
                            .await
                            .map(|()| Change::Updated)
                    }
                }
                None if action == Action::Learn => {
                    let count = TokenCount::default().apply(category, action, occurrences);
                    self.storage
                        .set_token_counts(token, count, context)
                        .await
                        .map(|()| Change::Created)
                }
                None => Ok(Change::Skipped),
            };

            match outcome {
                Ok(Change::Created) => report.created += 1,
                Ok(Change::Updated) => report.updated += 1,
                Ok(Change::Deleted) => report.deleted += 1,
                Ok(Change::Skipped) => report.skipped += 1,
                Err(e) => {
                    warn!("Failed to update token {:?} in context {}: {}", token, context, e);
                    report.failed.push(token.clone());
                }
            }
        }

        let mut aggregate = self.storage.get_aggregate(context).await?;
        aggregate.apply(category, action);
        self.storage.set_aggregate(context, &aggregate).await?;

        info!(
            "{:?} {} tokens as {} in context {} (created {}, updated {}, deleted {}, skipped {}, failed {})",
            action,
            names.len(),
            category,
            context,
            report.created,
            report.updated,
            report.deleted,
            report.skipped,
            report.failed.len()
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::types::DEFAULT_CONTEXT;
    use crate::storage::MemoryStorage;

    fn tokens(words: &[(&str, u32)]) -> TokenCounts {
        words.iter().map(|(w, c)| (w.to_string(), *c)).collect()
    }

    async fn count(storage: &MemoryStorage, token: &str) -> Option<TokenCount> {
        storage
            .get_token_counts(&[token.to_string()], DEFAULT_CONTEXT)
            .await
            .unwrap()
            .get(token)
            .copied()
    }

    #[tokio::test]
    async fn test_learn_creates_records() {
        let storage = MemoryStorage::new();
        let learner = Learner::new(&storage);

        let report = learner
            .apply(
                &tokens(&[("cheap", 2), ("pills", 1)]),
                Category::Improbable,
                Action::Learn,
                DEFAULT_CONTEXT,
            )
            .await
            .unwrap();

        assert_eq!(report.created, 2);
        assert!(report.is_complete());
        assert_eq!(count(&storage, "cheap").await, Some(TokenCount::new(0, 2)));

        let aggregate = storage.get_aggregate(DEFAULT_CONTEXT).await.unwrap();
        assert_eq!(aggregate.negative_count, 1);
        assert_eq!(aggregate.positive_count, 0);
        assert_eq!(aggregate.texts_learned, 1);
    }

    #[tokio::test]
    async fn test_learn_updates_existing() {
        let storage = MemoryStorage::new();
        let learner = Learner::new(&storage);
        let doc = tokens(&[("meeting", 1)]);

        learner
            .apply(&doc, Category::Probable, Action::Learn, DEFAULT_CONTEXT)
            .await
            .unwrap();
        let report = learner
            .apply(&doc, Category::Improbable, Action::Learn, DEFAULT_CONTEXT)
            .await
            .unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(count(&storage, "meeting").await, Some(TokenCount::new(1, 1)));
    }

    #[tokio::test]
    async fn test_unlearn_deletes_empty_records() {
        let storage = MemoryStorage::new();
        let learner = Learner::new(&storage);
        let doc = tokens(&[("hello", 1)]);

        learner
            .apply(&doc, Category::Probable, Action::Learn, DEFAULT_CONTEXT)
            .await
            .unwrap();
        let report = learner
            .apply(&doc, Category::Probable, Action::Unlearn, DEFAULT_CONTEXT)
            .await
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(count(&storage, "hello").await, None);
        assert_eq!(storage.token_total(DEFAULT_CONTEXT).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unlearn_unknown_token_skipped() {
        let storage = MemoryStorage::new();
        let learner = Learner::new(&storage);

        let report = learner
            .apply(
                &tokens(&[("never", 1)]),
                Category::Improbable,
                Action::Unlearn,
                DEFAULT_CONTEXT,
            )
            .await
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(storage.token_total(DEFAULT_CONTEXT).await.unwrap(), 0);

        let aggregate = storage.get_aggregate(DEFAULT_CONTEXT).await.unwrap();
        assert_eq!(aggregate.negative_count, 0);
        assert_eq!(aggregate.texts_unlearned, 1);
    }

    #[tokio::test]
    async fn test_unlearn_clamps_at_zero() {
        let storage = MemoryStorage::new();
        let learner = Learner::new(&storage);

        learner
            .apply(
                &tokens(&[("mixed", 1)]),
                Category::Probable,
                Action::Learn,
                DEFAULT_CONTEXT,
            )
            .await
            .unwrap();
        learner
            .apply(
                &tokens(&[("mixed", 1)]),
                Category::Improbable,
                Action::Learn,
                DEFAULT_CONTEXT,
            )
            .await
            .unwrap();

        learner
            .apply(
                &tokens(&[("mixed", 5)]),
                Category::Improbable,
                Action::Unlearn,
                DEFAULT_CONTEXT,
            )
            .await
            .unwrap();

        assert_eq!(count(&storage, "mixed").await, Some(TokenCount::new(1, 0)));
    }

    #[tokio::test]
    async fn test_learn_creates_context() {
        let storage = MemoryStorage::new();
        let learner = Learner::new(&storage);

        learner
            .apply(&tokens(&[("hello", 1)]), Category::Probable, Action::Learn, "fresh")
            .await
            .unwrap();

        assert!(storage.context_exists("fresh").await.unwrap());
        assert_eq!(storage.get_aggregate("fresh").await.unwrap().positive_count, 1);
    }

    #[tokio::test]
    async fn test_unlearn_missing_context() {
        let storage = MemoryStorage::new();
        let learner = Learner::new(&storage);

        let err = learner
            .apply(&tokens(&[("hello", 1)]), Category::Probable, Action::Unlearn, "absent")
            .await
            .unwrap_err();

        assert!(matches!(err, B8Error::ContextNotFound(_)));
        assert!(!storage.context_exists("absent").await.unwrap());
    }
}

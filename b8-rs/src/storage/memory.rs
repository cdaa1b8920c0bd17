use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::TokenStore;
use crate::classifier::types::{ContextAggregate, TokenCount, DEFAULT_CONTEXT};
use crate::error::{B8Error, Result};

#[derive(Debug, Clone, Default)]
struct ContextData {
    aggregate: ContextAggregate,
    tokens: HashMap<String, TokenCount>,
}

/// In-memory token store
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    contexts: Arc<RwLock<HashMap<String, ContextData>>>,
}

impl MemoryStorage {
    /// Create a new store holding only the default context
    pub fn new() -> Self {
        let mut contexts = HashMap::new();
        contexts.insert(DEFAULT_CONTEXT.to_string(), ContextData::default());

        MemoryStorage {
            contexts: Arc::new(RwLock::new(contexts)),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for MemoryStorage {
    async fn get_token_counts(
        &self,
        tokens: &[String],
        context: &str,
    ) -> Result<HashMap<String, TokenCount>> {
        let contexts = self.contexts.read().await;
        let data = contexts
            .get(context)
            .ok_or_else(|| B8Error::ContextNotFound(context.to_string()))?;

        Ok(tokens
            .iter()
            .filter_map(|token| data.tokens.get(token).map(|count| (token.clone(), *count)))
            .collect())
    }

    async fn set_token_counts(&self, token: &str, count: TokenCount, context: &str) -> Result<()> {
        let mut contexts = self.contexts.write().await;
        let data = contexts
            .get_mut(context)
            .ok_or_else(|| B8Error::ContextNotFound(context.to_string()))?;

        data.tokens.insert(token.to_string(), count);
        Ok(())
    }

    async fn delete_token(&self, token: &str, context: &str) -> Result<()> {
        let mut contexts = self.contexts.write().await;
        let data = contexts
            .get_mut(context)
            .ok_or_else(|| B8Error::ContextNotFound(context.to_string()))?;

        data.tokens.remove(token);
        Ok(())
    }

    async fn get_aggregate(&self, context: &str) -> Result<ContextAggregate> {
        let contexts = self.contexts.read().await;
        contexts
            .get(context)
            .map(|data| data.aggregate.clone())
            .ok_or_else(|| B8Error::ContextNotFound(context.to_string()))
    }

    async fn set_aggregate(&self, context: &str, aggregate: &ContextAggregate) -> Result<()> {
        let mut contexts = self.contexts.write().await;
        let data = contexts
            .get_mut(context)
            .ok_or_else(|| B8Error::ContextNotFound(context.to_string()))?;

        data.aggregate = aggregate.clone();
        Ok(())
    }

    async fn context_exists(&self, context: &str) -> Result<bool> {
        let contexts = self.contexts.read().await;
        Ok(contexts.contains_key(context))
    }

    async fn create_context(&self, context: &str) -> Result<()> {
        let mut contexts = self.contexts.write().await;
        contexts.entry(context.to_string()).or_default();
        Ok(())
    }

    async fn list_contexts(&self) -> Result<Vec<String>> {
        let contexts = self.contexts.read().await;
        let mut names: Vec<String> = contexts.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn token_total(&self, context: &str) -> Result<u64> {
        let contexts = self.contexts.read().await;
        contexts
            .get(context)
            .map(|data| data.tokens.len() as u64)
            .ok_or_else(|| B8Error::ContextNotFound(context.to_string()))
    }
}

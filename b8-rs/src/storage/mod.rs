//! Token storage module
//!
//! Provides token store backends:
//! - [`memory`]: in-process store, nothing persisted
//! - [`sqlite`]: SQLite store via sqlx
//!
//! A store holds, per context, one `(pos, neg)` count pair per token plus
//! the context aggregate. Stores do not serialize mutations: callers must
//! not run two learn/unlearn operations against the same context at once.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::classifier::types::{ContextAggregate, TokenCount};
use crate::error::Result;

/// Token store adapter
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Fetch counts for the given tokens. Unknown tokens are absent from
    /// the result.
    async fn get_token_counts(
        &self,
        tokens: &[String],
        context: &str,
    ) -> Result<HashMap<String, TokenCount>>;

    /// Create or overwrite a token record
    async fn set_token_counts(&self, token: &str, count: TokenCount, context: &str) -> Result<()>;

    /// Remove a token record
    async fn delete_token(&self, token: &str, context: &str) -> Result<()>;

    /// Get the context aggregate (`ContextNotFound` if the context is missing)
    async fn get_aggregate(&self, context: &str) -> Result<ContextAggregate>;

    /// Overwrite the context aggregate
    async fn set_aggregate(&self, context: &str, aggregate: &ContextAggregate) -> Result<()>;

    async fn context_exists(&self, context: &str) -> Result<bool>;

    /// Create a context with zeroed aggregate (no-op if it exists)
    async fn create_context(&self, context: &str) -> Result<()>;

    /// Names of all contexts, sorted
    async fn list_contexts(&self) -> Result<Vec<String>>;

    /// Number of token records in a context
    async fn token_total(&self, context: &str) -> Result<u64>;
}

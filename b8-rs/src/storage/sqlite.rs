//! SQLite token store
//!
//! Tokens of every context share one table keyed by `(context, token)`;
//! context names are always bound as parameters.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};

use super::TokenStore;
use crate::classifier::types::{ContextAggregate, TokenCount, DEFAULT_CONTEXT};
use crate::error::{B8Error, Result};

/// Schema version written to `b8_meta`
pub const SCHEMA_VERSION: i64 = 3;

/// Stay well below SQLite's bound-parameter limit
const MAX_TOKENS_PER_QUERY: usize = 500;

/// SQLite-backed token store
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Wrap an existing pool. Call [`SqliteStorage::init_db`] before use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (or create) a database and initialize the schema
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new();
        if database_url.contains(":memory:") || database_url.contains("mode=memory") {
            // Every connection to an in-memory database gets its own database.
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        let storage = Self::new(pool);
        storage.init_db().await?;

        info!("Token store opened at {}", database_url);
        Ok(storage)
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize database tables
    pub async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS b8_meta (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS b8_contexts (
                name TEXT PRIMARY KEY,
                positive_count INTEGER NOT NULL DEFAULT 0,
                negative_count INTEGER NOT NULL DEFAULT 0,
                texts_learned INTEGER NOT NULL DEFAULT 0,
                texts_unlearned INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS b8_tokens (
                context TEXT NOT NULL REFERENCES b8_contexts(name) ON DELETE CASCADE,
                token TEXT NOT NULL,
                pos INTEGER NOT NULL DEFAULT 0,
                neg INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (context, token)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        match self.schema_version().await? {
            Some(found) if found != SCHEMA_VERSION => {
                return Err(B8Error::SchemaVersion {
                    found,
                    expected: SCHEMA_VERSION,
                });
            }
            Some(_) => {}
            None => {
                sqlx::query("INSERT INTO b8_meta (key, value) VALUES ('version', ?)")
                    .bind(SCHEMA_VERSION)
                    .execute(&self.pool)
                    .await?;
            }
        }

        self.create_context(DEFAULT_CONTEXT).await?;

        Ok(())
    }

    /// Schema version recorded in the database, if any
    pub async fn schema_version(&self) -> Result<Option<i64>> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT value FROM b8_meta WHERE key = 'version'")
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(version,)| version))
    }
}

fn to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_db(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[async_trait]
impl TokenStore for SqliteStorage {
    async fn get_token_counts(
        &self,
        tokens: &[String],
        context: &str,
    ) -> Result<HashMap<String, TokenCount>> {
        let mut counts = HashMap::new();

        for chunk in tokens.chunks(MAX_TOKENS_PER_QUERY) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT token, pos, neg FROM b8_tokens WHERE context = ? AND token IN ({})",
                placeholders
            );

            let mut query = sqlx::query_as::<_, (String, i64, i64)>(&sql).bind(context);
            for token in chunk {
                query = query.bind(token.as_str());
            }

            for (token, pos, neg) in query.fetch_all(&self.pool).await? {
                counts.insert(token, TokenCount::new(from_db(pos), from_db(neg)));
            }
        }

        debug!(
            "Fetched {} of {} tokens from context {}",
            counts.len(),
            tokens.len(),
            context
        );
        Ok(counts)
    }

    async fn set_token_counts(&self, token: &str, count: TokenCount, context: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO b8_tokens (context, token, pos, neg)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(context)
        .bind(token)
        .bind(to_db(count.pos))
        .bind(to_db(count.neg))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_token(&self, token: &str, context: &str) -> Result<()> {
        sqlx::query("DELETE FROM b8_tokens WHERE context = ? AND token = ?")
            .bind(context)
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_aggregate(&self, context: &str) -> Result<ContextAggregate> {
        let row = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            "SELECT positive_count, negative_count, texts_learned, texts_unlearned FROM b8_contexts WHERE name = ?",
        )
        .bind(context)
        .fetch_optional(&self.pool)
        .await?;

        let (positive_count, negative_count, texts_learned, texts_unlearned) =
            row.ok_or_else(|| B8Error::ContextNotFound(context.to_string()))?;

        Ok(ContextAggregate {
            positive_count: from_db(positive_count),
            negative_count: from_db(negative_count),
            texts_learned: from_db(texts_learned),
            texts_unlearned: from_db(texts_unlearned),
        })
    }

    async fn set_aggregate(&self, context: &str, aggregate: &ContextAggregate) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE b8_contexts
            SET positive_count = ?, negative_count = ?, texts_learned = ?, texts_unlearned = ?, updated_at = ?
            WHERE name = ?
            "#,
        )
        .bind(to_db(aggregate.positive_count))
        .bind(to_db(aggregate.negative_count))
        .bind(to_db(aggregate.texts_learned))
        .bind(to_db(aggregate.texts_unlearned))
        .bind(Utc::now().to_rfc3339())
        .bind(context)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(B8Error::ContextNotFound(context.to_string()));
        }

        Ok(())
    }

    async fn context_exists(&self, context: &str) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM b8_contexts WHERE name = ?")
            .bind(context)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    async fn create_context(&self, context: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO b8_contexts (name, created_at, updated_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(context)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_contexts(&self) -> Result<Vec<String>> {
        let rows = sqlx::query_as::<_, (String,)>("SELECT name FROM b8_contexts ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn token_total(&self, context: &str) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM b8_tokens WHERE context = ?")
            .bind(context)
            .fetch_one(&self.pool)
            .await?;

        Ok(from_db(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_storage() -> SqliteStorage {
        SqliteStorage::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_init_creates_default_context() {
        let storage = setup_storage().await;

        assert!(storage.context_exists(DEFAULT_CONTEXT).await.unwrap());
        assert_eq!(storage.schema_version().await.unwrap(), Some(SCHEMA_VERSION));
        assert_eq!(
            storage.get_aggregate(DEFAULT_CONTEXT).await.unwrap(),
            ContextAggregate::default()
        );
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let storage = setup_storage().await;
        storage.init_db().await.unwrap();

        assert_eq!(storage.list_contexts().await.unwrap(), vec![DEFAULT_CONTEXT]);
    }

    #[tokio::test]
    async fn test_schema_version_mismatch() {
        let storage = setup_storage().await;
        sqlx::query("UPDATE b8_meta SET value = 2 WHERE key = 'version'")
            .execute(storage.pool())
            .await
            .unwrap();

        let err = storage.init_db().await.unwrap_err();
        assert!(matches!(err, B8Error::SchemaVersion { found: 2, expected: 3 }));
    }

    #[tokio::test]
    async fn test_token_roundtrip() {
        let storage = setup_storage().await;

        storage
            .set_token_counts("hello", TokenCount::new(1, 0), DEFAULT_CONTEXT)
            .await
            .unwrap();
        storage
            .set_token_counts("hello", TokenCount::new(4, 2), DEFAULT_CONTEXT)
            .await
            .unwrap();

        let counts = storage
            .get_token_counts(&["hello".to_string(), "absent".to_string()], DEFAULT_CONTEXT)
            .await
            .unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts["hello"], TokenCount::new(4, 2));

        storage.delete_token("hello", DEFAULT_CONTEXT).await.unwrap();
        assert_eq!(storage.token_total(DEFAULT_CONTEXT).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_many_tokens_chunked() {
        let storage = setup_storage().await;
        let tokens: Vec<String> = (0..1200).map(|i| format!("token{}", i)).collect();

        for token in tokens.iter().step_by(3) {
            storage
                .set_token_counts(token, TokenCount::new(1, 1), DEFAULT_CONTEXT)
                .await
                .unwrap();
        }

        let counts = storage.get_token_counts(&tokens, DEFAULT_CONTEXT).await.unwrap();
        assert_eq!(counts.len(), 400);
    }

    #[tokio::test]
    async fn test_context_names_are_data() {
        let storage = setup_storage().await;
        let context = "weird'; DROP TABLE b8_tokens; --";

        storage.create_context(context).await.unwrap();
        storage
            .set_token_counts("hello", TokenCount::new(1, 0), context)
            .await
            .unwrap();

        assert!(storage.context_exists(context).await.unwrap());
        assert_eq!(storage.token_total(context).await.unwrap(), 1);
        assert_eq!(storage.token_total(DEFAULT_CONTEXT).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_aggregate_roundtrip() {
        let storage = setup_storage().await;
        let aggregate = ContextAggregate {
            positive_count: 7,
            negative_count: 3,
            texts_learned: 11,
            texts_unlearned: 1,
        };

        storage.set_aggregate(DEFAULT_CONTEXT, &aggregate).await.unwrap();
        assert_eq!(storage.get_aggregate(DEFAULT_CONTEXT).await.unwrap(), aggregate);

        assert!(matches!(
            storage.set_aggregate("missing", &aggregate).await,
            Err(B8Error::ContextNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_token_in_missing_context_rejected() {
        let storage = setup_storage().await;

        let result = storage
            .set_token_counts("hello", TokenCount::new(1, 0), "missing")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("b8.db").display());

        {
            let storage = SqliteStorage::connect(&url).await.unwrap();
            storage
                .set_token_counts("kept", TokenCount::new(2, 0), DEFAULT_CONTEXT)
                .await
                .unwrap();
            storage.pool().close().await;
        }

        let storage = SqliteStorage::connect(&url).await.unwrap();
        let counts = storage
            .get_token_counts(&["kept".to_string()], DEFAULT_CONTEXT)
            .await
            .unwrap();
        assert_eq!(counts["kept"], TokenCount::new(2, 0));
    }
}

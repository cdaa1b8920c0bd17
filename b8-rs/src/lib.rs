//! b8-rs: adaptive statistical text classifier
//!
//! Learns from documents labeled "probable" or "improbable" and scores new
//! text with the probability that it belongs to the improbable class.
//!
//! # Features
//!
//! - **Degeneration**: unknown tokens fall back to case and punctuation variants
//! - **Scoring**: Laplace-smoothed per-token affinities
//! - **Combination**: Robinson's geometric-mean method over the most relevant tokens
//! - **Contexts**: independent namespaces of learned statistics
//! - **Storage**: in-memory or SQLite token stores
//!
//! # Example
//!
//! ```no_run
//! use b8_rs::classifier::{Category, B8, DEFAULT_CONTEXT};
//! use b8_rs::config::B8Config;
//! use b8_rs::storage::MemoryStorage;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let b8 = B8::new(B8Config::default(), Arc::new(MemoryStorage::new())).await?;
//!
//!     b8.learn("Lunch meeting tomorrow", Category::Probable, DEFAULT_CONTEXT).await?;
//!     b8.learn("Cheap pills online", Category::Improbable, DEFAULT_CONTEXT).await?;
//!
//!     let probability = b8.classify("cheap meeting", DEFAULT_CONTEXT).await?;
//!     println!("{:.3}", probability);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`lexer`]: Text tokenization
//! - [`degenerator`]: Token variants
//! - [`classifier`]: Scoring, combination and learning
//! - [`storage`]: Token store backends

pub mod classifier;
pub mod config;
pub mod degenerator;
pub mod error;
pub mod lexer;
pub mod storage;

// Re-export commonly used types
pub use classifier::{Category, B8};
pub use config::B8Config;
pub use error::{B8Error, Result};

//! Classification module
//!
//! Token affinity scoring, relevance selection with Robinson's combination,
//! and learning of token statistics.

pub mod combiner;
pub mod engine;
pub mod learner;
pub mod scorer;
pub mod types;

pub use combiner::{combine, Combiner};
pub use engine::B8;
pub use learner::Learner;
pub use scorer::{affinity, AffinityScorer};
pub use types::*;

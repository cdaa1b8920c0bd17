//! Classifier types and data structures

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::B8Error;

/// Context that always exists
pub const DEFAULT_CONTEXT: &str = "default";

/// The two classes of the affinity axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Positive class (historically "ham")
    Probable,
    /// Negative class (historically "spam")
    Improbable,
}

impl Category {
    /// Get category name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Probable => "probable",
            Self::Improbable => "improbable",
        }
    }
}

impl FromStr for Category {
    type Err = B8Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "probable" | "positive" | "ham" => Ok(Self::Probable),
            "improbable" | "negative" | "spam" => Ok(Self::Improbable),
            _ => Err(B8Error::InvalidCategory(s.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Learning direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Learn,
    Unlearn,
}

impl Action {
    fn apply(self, value: u64, amount: u64) -> u64 {
        match self {
            Self::Learn => value.saturating_add(amount),
            Self::Unlearn => value.saturating_sub(amount),
        }
    }
}

/// Per-token learning weight, by class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCount {
    /// Weight attributed to the positive class
    pub pos: u64,
    /// Weight attributed to the negative class
    pub neg: u64,
}

impl TokenCount {
    pub fn new(pos: u64, neg: u64) -> Self {
        Self { pos, neg }
    }

    /// A record with both sides at zero is treated as absent
    pub fn is_empty(&self) -> bool {
        self.pos == 0 && self.neg == 0
    }

    /// Add or remove `amount` on the side matching `category`, clamped at zero
    pub fn apply(self, category: Category, action: Action, amount: u64) -> Self {
        match category {
            Category::Probable => Self {
                pos: action.apply(self.pos, amount),
                ..self
            },
            Category::Improbable => Self {
                neg: action.apply(self.neg, amount),
                ..self
            },
        }
    }
}

/// Per-context totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextAggregate {
    /// Documents absorbed into the positive class
    pub positive_count: u64,
    /// Documents absorbed into the negative class
    pub negative_count: u64,
    /// Number of learn calls (monotonic)
    pub texts_learned: u64,
    /// Number of unlearn calls (monotonic)
    pub texts_unlearned: u64,
}

impl ContextAggregate {
    pub fn total(&self) -> u64 {
        self.positive_count.saturating_add(self.negative_count)
    }

    /// Record one learned or unlearned document
    pub fn apply(&mut self, category: Category, action: Action) {
        match category {
            Category::Probable => self.positive_count = action.apply(self.positive_count, 1),
            Category::Improbable => self.negative_count = action.apply(self.negative_count, 1),
        }

        match action {
            Action::Learn => self.texts_learned = self.texts_learned.saturating_add(1),
            Action::Unlearn => self.texts_unlearned = self.texts_unlearned.saturating_add(1),
        }
    }
}

/// What the store knows about a queried token
#[derive(Debug, Clone, PartialEq)]
pub enum TokenLookup {
    /// The token itself has a record
    Direct(TokenCount),
    /// Records found under degenerated variants, in variant order
    Degenerated(Vec<(String, TokenCount)>),
    /// Neither the token nor any variant is known
    Unknown,
}

/// Outcome of a learn/unlearn batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnReport {
    pub context: String,
    pub category: Category,
    pub action: Action,
    /// Records created
    pub created: usize,
    /// Records updated in place
    pub updated: usize,
    /// Records removed because both counts reached zero
    pub deleted: usize,
    /// Tokens skipped (unlearn of a token never learned)
    pub skipped: usize,
    /// Tokens whose store write failed
    pub failed: Vec<String>,
}

impl LearnReport {
    pub fn new(context: &str, category: Category, action: Action) -> Self {
        Self {
            context: context.to_string(),
            category,
            action,
            created: 0,
            updated: 0,
            deleted: 0,
            skipped: 0,
            failed: Vec::new(),
        }
    }

    /// True when every token write succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A token that took part in a classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevantToken {
    pub token: String,
    /// Token affinity in (0, 1)
    pub score: f64,
    /// |0.5 - score|
    pub importance: f64,
    /// Occurrences in the document
    pub occurrences: u32,
    /// Variant whose record produced the score, if the token itself is unknown
    pub variant: Option<String>,
}

/// Detailed classification result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// Probability in [0, 1]; above 0.5 leans to the improbable class
    pub probability: f64,
    /// Tokens combined into the probability, most important first
    pub relevant: Vec<RelevantToken>,
}

/// Context statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextStats {
    pub context: String,
    pub aggregate: ContextAggregate,
    /// Number of stored token records
    pub tokens: u64,
}

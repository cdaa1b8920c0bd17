//! Text tokenizer
//!
//! Turns raw text into a multiset of word tokens. URIs, markup and BBCode
//! are pulled out before the text is split into words.

use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::config::LexerConfig;
use crate::error::{B8Error, Result};

/// Token -> number of occurrences in one document
pub type TokenCounts = HashMap<String, u32>;

const URI_PATTERN: &str = r"(?i)(https?|ftp)://[^\s/$.?#]\S*";
const URI_PART_PATTERN: &str = r"[A-Za-z0-9_.\-]+";
const MARKUP_PATTERN: &str = r"<[^>]*>";
const BBCODE_PATTERN: &str = r"\[[^\]]*\]";
const SEPARATOR_PATTERN: &str = r"[^\p{L}\p{M}\p{N}.!?\-_'$€]+";

/// Tokenizer with precompiled patterns
#[derive(Debug, Clone)]
pub struct Lexer {
    config: LexerConfig,
    stopwords: HashSet<String>,
    uri: Regex,
    uri_part: Regex,
    markup: Regex,
    bbcode: Regex,
    separator: Regex,
}

impl Lexer {
    /// Create a new lexer
    pub fn new(config: LexerConfig) -> Result<Self> {
        let stopwords = config.stopwords.iter().map(|w| w.to_lowercase()).collect();

        Ok(Self {
            config,
            stopwords,
            uri: compile(URI_PATTERN)?,
            uri_part: compile(URI_PART_PATTERN)?,
            markup: compile(MARKUP_PATTERN)?,
            bbcode: compile(BBCODE_PATTERN)?,
            separator: compile(SEPARATOR_PATTERN)?,
        })
    }

    /// Split text into tokens and count them. Empty or whitespace-only text
    /// yields an empty map.
    pub fn tokenize(&self, text: &str) -> TokenCounts {
        let mut tokens = TokenCounts::new();

        if text.trim().is_empty() {
            return tokens;
        }

        let mut text = text.to_string();

        if self.config.get_uris {
            for uri in self.uri.find_iter(&text) {
                for part in self.uri_part.find_iter(uri.as_str()) {
                    self.add_token(&mut tokens, part.as_str());
                }
            }
            text = self.uri.replace_all(&text, " ").into_owned();
        }

        if self.config.get_html {
            for tag in self.markup.find_iter(&text) {
                self.add_token(&mut tokens, tag.as_str());
            }
        }
        text = self.markup.replace_all(&text, " ").into_owned();

        if self.config.get_bbcode {
            for tag in self.bbcode.find_iter(&text) {
                self.add_token(&mut tokens, tag.as_str());
            }
            text = self.bbcode.replace_all(&text, " ").into_owned();
        }

        for word in self.separator.split(&text) {
            self.add_token(&mut tokens, word);
        }

        tokens
    }

    /// Check whether a word may be used as a token
    pub fn is_valid(&self, word: &str) -> bool {
        let length = word.chars().count();
        if length < self.config.min_size || length > self.config.max_size {
            return false;
        }

        if !self.config.allow_numbers && is_number(word) {
            return false;
        }

        !self.stopwords.contains(&word.to_lowercase())
    }

    fn add_token(&self, tokens: &mut TokenCounts, word: &str) {
        if self.is_valid(word) {
            *tokens.entry(word.to_string()).or_insert(0) += 1;
        }
    }
}

/// Digits, optionally with decimal points, ranges or a currency sign ("1.5", "10-20", "$100")
fn is_number(word: &str) -> bool {
    word.chars().any(char::is_numeric)
        && word
            .chars()
            .all(|c| c.is_numeric() || matches!(c, '.' | '-' | '$' | '€'))
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| B8Error::Config(format!("Invalid lexer pattern: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexer() -> Lexer {
        Lexer::new(LexerConfig::default()).unwrap()
    }

    #[test]
    fn test_tokenize_words() {
        let tokens = lexer().tokenize("your input here");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens["your"], 1);
        assert_eq!(tokens["input"], 1);
        assert_eq!(tokens["here"], 1);
    }

    #[test]
    fn test_tokenize_counts_repeats() {
        let tokens = lexer().tokenize("spam spam eggs spam");
        assert_eq!(tokens["spam"], 3);
        assert_eq!(tokens["eggs"], 1);
    }

    #[test]
    fn test_tokenize_keeps_trailing_marks() {
        let tokens = lexer().tokenize("Hello, world!");
        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains_key("Hello"));
        assert!(tokens.contains_key("world!"));
    }

    #[test]
    fn test_tokenize_empty_text() {
        assert!(lexer().tokenize("").is_empty());
        assert!(lexer().tokenize("  \n\t ").is_empty());
    }

    #[test]
    fn test_short_long_and_numeric_words_dropped() {
        let tokens = lexer().tokenize("an ox 12345 abcdefghijklmnopqrstuvwxyzabcdefgh valid");
        assert_eq!(tokens.len(), 1);
        assert!(tokens.contains_key("valid"));

        let config = LexerConfig {
            allow_numbers: true,
            ..LexerConfig::default()
        };
        let tokens = Lexer::new(config).unwrap().tokenize("12345");
        assert_eq!(tokens["12345"], 1);
    }

    #[test]
    fn test_formatted_numbers_dropped() {
        let tokens = lexer().tokenize("costs $100 or 1.5 units, pages 10-20 and 25€ total");
        assert!(!tokens.contains_key("$100"));
        assert!(!tokens.contains_key("1.5"));
        assert!(!tokens.contains_key("10-20"));
        assert!(!tokens.contains_key("25€"));
        assert!(tokens.contains_key("costs"));
        assert!(tokens.contains_key("units"));

        let tokens = lexer().tokenize("v1.5 mp3-player ...");
        assert!(tokens.contains_key("v1.5"));
        assert!(tokens.contains_key("mp3-player"));
        assert!(tokens.contains_key("..."));
    }

    #[test]
    fn test_stopwords_case_insensitive() {
        let config = LexerConfig {
            stopwords: vec!["The".to_string()],
            ..LexerConfig::default()
        };
        let tokens = Lexer::new(config).unwrap().tokenize("the THE cat");
        assert_eq!(tokens.len(), 1);
        assert!(tokens.contains_key("cat"));
    }

    #[test]
    fn test_uris_split_into_parts() {
        let tokens = lexer().tokenize("visit https://shop.example.com/cheap-pills now");
        assert!(tokens.contains_key("https"));
        assert!(tokens.contains_key("shop.example.com"));
        assert!(tokens.contains_key("cheap-pills"));
        assert!(tokens.contains_key("visit"));
        assert!(!tokens.keys().any(|t| t.contains("://")));
    }

    #[test]
    fn test_markup_tokens_and_stripping() {
        let tokens = lexer().tokenize("<b>bold</b> text");
        assert!(tokens.contains_key("<b>"));
        assert!(tokens.contains_key("</b>"));
        assert!(tokens.contains_key("bold"));

        let config = LexerConfig {
            get_html: false,
            ..LexerConfig::default()
        };
        let tokens = Lexer::new(config).unwrap().tokenize("<b>bold</b> text");
        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains_key("bold"));
        assert!(tokens.contains_key("text"));
    }

    #[test]
    fn test_bbcode_tokens() {
        let config = LexerConfig {
            get_bbcode: true,
            ..LexerConfig::default()
        };
        let tokens = Lexer::new(config).unwrap().tokenize("[url]click[/url]");
        assert!(tokens.contains_key("[url]"));
        assert!(tokens.contains_key("[/url]"));
        assert!(tokens.contains_key("click"));
    }
}

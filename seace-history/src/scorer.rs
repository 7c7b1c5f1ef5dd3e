//! Description similarity.
//!
//! Descriptions are reduced to sets of significant tokens and compared with
//! the Jaccard coefficient. A token is significant when it survives accent
//! folding, is longer than three characters, is not purely numeric and is
//! not a stop word.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use seace_core::{fold_accents, is_combining_mark};

/// Words that carry no signal in procurement descriptions.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "de", "del", "la", "el", "los", "las", "en", "para", "por", "con", "y", "a", "un", "una",
    "unos", "unas", "al", "se", "su", "sus", "que", "servicio", "servicios", "contratacion",
    "adquisicion", "suministro", "region", "regional", "empresa", "saa", "sa",
];

pub const DEFAULT_MIN_TOKEN_LEN: usize = 4;
pub const DEFAULT_KEYWORD_LIMIT: usize = 5;

/// Tuning knobs for the scorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorerConfig {
    /// Lower-case, accent-free stop words.
    pub stop_words: HashSet<String>,
    /// Shortest token that counts as significant, in characters.
    pub min_token_len: usize,
    /// Maximum number of matched keywords reported.
    pub keyword_limit: usize,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
            keyword_limit: DEFAULT_KEYWORD_LIMIT,
        }
    }
}

/// Result of comparing two descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Similarity {
    /// Jaccard coefficient in `[0, 1]`.
    pub score: f64,
    /// Shared significant tokens, sorted, at most `keyword_limit` of them.
    pub keywords: Vec<String>,
}

impl Similarity {
    pub fn none() -> Self {
        Self {
            score: 0.0,
            keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimilarityScorer {
    config: ScorerConfig,
}

impl SimilarityScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Distinct significant tokens of `text`.
    pub fn tokenize(&self, text: &str) -> BTreeSet<String> {
        let folded: String = text
            .chars()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
            .map(fold_accents)
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();

        folded
            .split_whitespace()
            .filter(|token| token.chars().count() >= self.config.min_token_len)
            .filter(|token| !token.chars().all(|c| c.is_numeric()))
            .filter(|token| !self.config.stop_words.contains(*token))
            .map(str::to_string)
            .collect()
    }

    /// Compare two descriptions.
    pub fn score(&self, a: &str, b: &str) -> Similarity {
        self.score_tokens(&self.tokenize(a), &self.tokenize(b))
    }

    /// Compare two pre-tokenized descriptions.
    pub fn score_tokens(&self, a: &BTreeSet<String>, b: &BTreeSet<String>) -> Similarity {
        if a.is_empty() || b.is_empty() {
            return Similarity::none();
        }

        let shared: Vec<&String> = a.intersection(b).collect();
        let union = a.len() + b.len() - shared.len();
        let score = shared.len() as f64 / union as f64;

        let keywords = shared
            .into_iter()
            .take(self.config.keyword_limit)
            .cloned()
            .collect();

        Similarity { score, keywords }
    }
}

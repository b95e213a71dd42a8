//! Relation extraction: proposing (subject, relation, object) triples from text.
//!
//! [`PatternExtractor`] is a conservative, offline default. It looks for one
//! known relation verb per sentence and splits the sentence around it.

use std::future::Future;
use std::pin::Pin;

use regex::Regex;
use serde::{Deserialize, Serialize};

use trellis_core::error::Result;

/// A candidate relationship proposed by an extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }
}

/// Service that proposes triples from free text. Order of results is not
/// significant.
pub trait RelationExtractor: Send + Sync {
    fn extract(&self, text: &str) -> impl Future<Output = Result<Vec<Triple>>> + Send;
}

/// Object-safe version of [`RelationExtractor`]; see
/// [`DynEmbeddingService`](crate::embedding::DynEmbeddingService).
pub trait DynRelationExtractor: Send + Sync {
    fn extract_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Triple>>> + Send + 'a>>;
}

impl<T: RelationExtractor> DynRelationExtractor for T {
    fn extract_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Triple>>> + Send + 'a>> {
        Box::pin(self.extract(text))
    }
}

/// Relation verbs recognised by [`PatternExtractor`]. Multi-word phrases come
/// first so they win over their single-word prefixes.
const RELATION_VERBS: &[&str] = &[
    "evolves into",
    "evolves to",
    "belongs to",
    "is", "are", "was", "were",
    "has", "have",
    "belongs", "belong",
    "created", "creates",
    "discovered", "discovers",
    "contains", "contain",
    "includes", "include",
    "uses", "used",
    "makes", "made",
    "forms", "formed",
    "evolves", "evolve",
    "wins", "won",
    "leads", "led",
    "developed", "develops",
    "produced", "produces",
    "invented", "invents",
    "studied", "studies",
];

const ARTICLES: &[&str] = &["the", "a", "an"];

/// Pattern-based extractor: `<subject> <relation verb> <object>` per sentence.
///
/// Only the first relation verb in a sentence is used. The relation label is
/// the lowercased verb phrase with spaces replaced by underscores.
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    sentence_split: Regex,
    clause: Regex,
}

impl PatternExtractor {
    /// Create a new extractor with pre-compiled patterns.
    pub fn new() -> Self {
        let verbs = RELATION_VERBS
            .iter()
            .map(|v| v.replace(' ', r"\s+"))
            .collect::<Vec<_>>()
            .join("|");
        Self {
            sentence_split: Regex::new(r"[.!?;\n]+").expect("Invalid sentence regex"),
            clause: Regex::new(&format!(
                r"(?i)^(?P<subject>.+?)\s+(?P<relation>{})\s+(?P<object>.+)$",
                verbs
            ))
            .expect("Invalid relation regex"),
        }
    }

    /// Synchronous extraction used by the trait impl.
    pub fn extract_sync(&self, text: &str) -> Vec<Triple> {
        self.sentence_split
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|sentence| {
                let caps = self.clause.captures(sentence)?;
                let subject = clean_phrase(&caps["subject"]);
                let object = clean_phrase(&caps["object"]);
                if subject.is_empty() || object.is_empty() {
                    return None;
                }
                let relation = caps["relation"]
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join("_")
                    .to_lowercase();
                Some(Triple {
                    subject,
                    relation,
                    object,
                })
            })
            .collect()
    }
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationExtractor for PatternExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<Triple>> {
        Ok(self.extract_sync(text))
    }
}

/// Trim punctuation and drop a leading article, keeping original casing.
fn clean_phrase(phrase: &str) -> String {
    let trimmed = phrase.trim().trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    let start = match words.first() {
        Some(first) if words.len() > 1 && ARTICLES.contains(&first.to_lowercase().as_str()) => 1,
        _ => 0,
    };
    words[start..].join(" ")
}

/// Canonical form used to match extracted names against node names.
///
/// Lowercases, collapses whitespace, trims surrounding punctuation and, when
/// `strip_articles` is set, drops one leading "the", "a" or "an".
pub fn normalize_name(name: &str, strip_articles: bool) -> String {
    let lowered = name.to_lowercase();
    let trimmed = lowered.trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
    let mut words: Vec<&str> = trimmed.split_whitespace().collect();
    if strip_articles && words.len() > 1 && ARTICLES.contains(&words[0]) {
        words.remove(0);
    }
    words.join(" ")
}

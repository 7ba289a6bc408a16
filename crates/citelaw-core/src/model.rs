//! The shared data model: stable identifiers, the citation value type, and
//! the plain records the external interfaces pass across the trait seams
//! in [`crate::ports`].

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An opaque, stable statute identifier: era-digit + two-digit year + `AC`
/// + zero-padded sequence number, e.g. `129AC0000000089` for
/// 明治二十九年法律第八十九号.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LawId(String);

impl LawId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Encodes a law-number (era, year, sequence) into its stable id:
    /// `{era-digit}{year:02}AC{seq:010}`.
    pub fn from_law_number(era_digit: u8, year: u32, seq: u64) -> Self {
        Self(format!("{era_digit}{year:02}AC{seq:010}"))
    }
}

impl fmt::Display for LawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The Japanese imperial era used in formal law-number strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Era {
    Meiji,
    Taisho,
    Showa,
    Heisei,
    Reiwa,
}

impl Era {
    /// The single-digit era code used in [`LawId::from_law_number`].
    pub fn digit(self) -> u8 {
        match self {
            Era::Meiji => 1,
            Era::Taisho => 2,
            Era::Showa => 3,
            Era::Heisei => 4,
            Era::Reiwa => 5,
        }
    }

    pub fn from_kanji(s: &str) -> Option<Self> {
        match s {
            "明治" => Some(Era::Meiji),
            "大正" => Some(Era::Taisho),
            "昭和" => Some(Era::Showa),
            "平成" => Some(Era::Heisei),
            "令和" => Some(Era::Reiwa),
            _ => None,
        }
    }
}

/// The kind of a statute, carried on graph nodes and dictionary metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LawKind {
    Act,
    CabinetOrder,
    MinisterialOrdinance,
    Rule,
    Other,
}

/// Per-id metadata stored by the law dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LawMetadata {
    pub canonical_title: String,
    pub kind: LawKind,
    pub effective_date: Option<NaiveDate>,
}

/// An article within a statute, identified by the statute's id and a
/// canonical Japanese-numeral article label, possibly with a branch
/// suffix (`十二の三`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArticleKey {
    pub law_id: LawId,
    pub article_label: String,
}

impl ArticleKey {
    pub fn new(law_id: LawId, article_label: impl Into<String>) -> Self {
        Self {
            law_id,
            article_label: article_label.into(),
        }
    }
}

impl fmt::Display for ArticleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.law_id, self.article_label)
    }
}

/// One article's text and structural position, as exposed by
/// [`crate::ports::ArticleSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub label: String,
    pub text: String,
    pub sort_order: u32,
    pub is_deleted: bool,
}

/// A full statute, as exposed by [`crate::ports::ArticleSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatuteRecord {
    pub title: String,
    pub law_number: String,
    pub kind: LawKind,
    pub articles: Vec<ArticleRecord>,
}

/// The kind of a detected citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CitationKind {
    External,
    Internal,
    Relative,
    Structural,
    Application,
    Contextual,
    Defined,
}

/// How a citation's target was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionMethod {
    Pattern,
    Dictionary,
    LawNumber,
    Context,
    Definition,
    Relative,
    External,
}

/// One detected citation: immutable once emitted by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub kind: CitationKind,
    pub source_text: String,
    pub byte_offset: usize,
    pub target_law_id: Option<LawId>,
    pub target_law_name: Option<String>,
    pub target_article_number: Option<String>,
    pub target_paragraph: Option<u32>,
    pub confidence: f64,
    pub resolution_method: ResolutionMethod,
}

impl Citation {
    /// The deduplication key: within one article, each (offset,
    /// source_text) pair appears at most once.
    pub fn dedup_key(&self) -> (usize, &str) {
        (self.byte_offset, self.source_text.as_str())
    }

    /// Checks this citation's positional and resolution invariants against
    /// the article it was detected in.
    pub fn check_invariants(&self, article_len: usize, current_law_id: &LawId) -> bool {
        if self.byte_offset + self.source_text.len() > article_len {
            return false;
        }
        if self.kind == CitationKind::External
            && self.target_law_id.is_none()
            && self.target_law_name.is_none()
        {
            return false;
        }
        if self.kind == CitationKind::Relative {
            match &self.target_law_id {
                Some(id) => {
                    if id != current_law_id {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

/// A citation-graph edge, as inserted via
/// [`crate::ports::GraphStore::insert_edges`]. Text is truncated to 100
/// characters before storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationEdge {
    pub source_law_id: LawId,
    pub target_law_id: LawId,
    pub kind: CitationKind,
    pub source_article: String,
    pub target_article: Option<String>,
    pub text: String,
    pub confidence: f64,
    pub is_external: bool,
}

const EDGE_TEXT_MAX: usize = 100;

impl CitationEdge {
    /// Builds an edge, truncating `text` to the 100-character cap on char
    /// boundaries (never splitting a multi-byte kanji character).
    pub fn new(
        source_law_id: LawId,
        target_law_id: LawId,
        kind: CitationKind,
        source_article: impl Into<String>,
        target_article: Option<String>,
        text: &str,
        confidence: f64,
        is_external: bool,
    ) -> Self {
        let truncated: String = text.chars().take(EDGE_TEXT_MAX).collect();
        Self {
            source_law_id,
            target_law_id,
            kind,
            source_article: source_article.into(),
            target_article,
            text: truncated,
            confidence,
            is_external,
        }
    }
}

/// One row of a bounded reverse traversal, as returned by
/// [`crate::ports::GraphStore::reverse_traverse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactedNode {
    pub node_id: LawId,
    pub node_kind: LawKind,
    pub depth: u8,
    pub path_count: u32,
    pub min_distance: u8,
    /// The strongest contributing edge's confidence at this node's
    /// shortest distance, decayed by `0.9^depth`.
    pub confidence: f64,
}

/// The three impact-score buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactBucket {
    High,
    Medium,
    Low,
}

impl ImpactBucket {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            ImpactBucket::High
        } else if score >= 0.4 {
            ImpactBucket::Medium
        } else {
            ImpactBucket::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn law_id_encodes_law_number() {
        let id = LawId::from_law_number(Era::Meiji.digit(), 29, 89);
        assert_eq!(id.as_str(), "129AC0000000089");
    }

    #[test]
    fn edge_text_truncates_on_char_boundary() {
        let text: String = std::iter::repeat('法').take(150).collect();
        let edge = CitationEdge::new(
            LawId::new("a"),
            LawId::new("b"),
            CitationKind::External,
            "第1条",
            None,
            &text,
            0.9,
            true,
        );
        assert_eq!(edge.text.chars().count(), 100);
    }

    #[test]
    fn bucket_partitions_score_range() {
        assert_eq!(ImpactBucket::from_score(0.7), ImpactBucket::High);
        assert_eq!(ImpactBucket::from_score(0.69), ImpactBucket::Medium);
        assert_eq!(ImpactBucket::from_score(0.4), ImpactBucket::Medium);
        assert_eq!(ImpactBucket::from_score(0.39), ImpactBucket::Low);
    }
}

//! citelaw-core: shared types, traits and the numeral codec for the
//! citation-resolution engine.
//!
//! This crate has no knowledge of detection, graph storage, or
//! orchestration — it only defines the vocabulary the other crates share:
//! the stable identifiers ([`LawId`], [`ArticleKey`]), the citation value
//! type ([`Citation`]), the error taxonomy ([`CiteError`]), and the two
//! trait seams ([`ports::ArticleSource`], [`ports::GraphStore`]) through
//! which the engine talks to the outside world.

pub mod error;
pub mod model;
pub mod numeral;
pub mod ports;

pub use error::CiteError;
pub use model::{
    ArticleKey, ArticleRecord, Citation, CitationEdge, CitationKind, Era, ImpactBucket,
    ImpactedNode, LawId, LawKind, LawMetadata, ResolutionMethod, StatuteRecord,
};

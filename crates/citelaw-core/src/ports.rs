//! The two trait seams through which the engine consumes external
//! collaborators: the statute-text source and the graph store. Both are
//! out of scope to implement for real — this crate only defines the
//! interface; `citelaw-graph` ships an in-memory `GraphStore`.

use crate::error::CiteError;
use crate::model::{ArticleKey, CitationEdge, ImpactedNode, LawId, LawKind, StatuteRecord};

/// The markup-to-text extraction layer's output surface.
pub trait ArticleSource {
    fn list_current_statutes(&self) -> Result<Vec<LawId>, CiteError>;
    fn get_statute(&self, id: &LawId) -> Result<StatuteRecord, CiteError>;
}

/// The citation graph store's write and traversal surface. The engine is
/// agnostic to whether an implementation is embedded or remote.
pub trait GraphStore {
    /// Idempotent upsert of a statute node.
    fn upsert_law_node(
        &mut self,
        law_id: &LawId,
        title: &str,
        kind: LawKind,
        article_count: usize,
    ) -> Result<(), CiteError>;

    /// Removes all citation edges, leaving nodes intact.
    fn clear_edges(&mut self) -> Result<(), CiteError>;

    /// Inserts a batch of edges within one transaction. Returns the
    /// number of edges actually inserted; on transaction failure the
    /// whole batch is dropped and this returns a [`CiteError::Transient`].
    fn insert_edges(&mut self, batch: &[CitationEdge]) -> Result<usize, CiteError>;

    /// Bounded breadth-first traversal over reverse edges.
    fn reverse_traverse(
        &self,
        origin: &ArticleKey,
        depth: u8,
        min_confidence: f64,
    ) -> Result<Vec<ImpactedNode>, CiteError>;
}

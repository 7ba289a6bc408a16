//! The in-memory citation graph: a `petgraph` stable directed multigraph
//! whose nodes are statutes and whose edges are citations between them.
//! Self-loops (a statute citing itself) are legitimate and common.

use std::collections::HashMap;

use citelaw_core::ports::GraphStore;
use citelaw_core::{ArticleKey, CiteError, CitationEdge, ImpactedNode, LawId, LawKind};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// How many edges a single [`Transaction`] commits at once. Mirrors the
/// orchestrator's own batching so a failed commit only loses one batch's
/// worth of edges.
pub const DEFAULT_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone)]
struct NodeData {
    law_id: LawId,
    title: String,
    kind: LawKind,
    article_count: usize,
}

/// A `GraphStore` backed by a `petgraph::stable_graph::StableDiGraph`.
/// Node and edge indices stay valid across `clear_edges`/`insert_edges`
/// calls, which is why `StableDiGraph` rather than the plain `Graph` is
/// used here.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    graph: StableDiGraph<NodeData, CitationEdge>,
    index: HashMap<LawId, NodeIndex>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn node_index(&mut self, law_id: &LawId) -> NodeIndex {
        if let Some(idx) = self.index.get(law_id) {
            return *idx;
        }
        let idx = self.graph.add_node(NodeData {
            law_id: law_id.clone(),
            title: law_id.as_str().to_string(),
            kind: LawKind::Other,
            article_count: 0,
        });
        self.index.insert(law_id.clone(), idx);
        idx
    }

    /// Inserts one batch transactionally: either every edge in `batch` is
    /// added, or none are (a referenced node missing from the graph is
    /// auto-upserted as a placeholder rather than failing the batch,
    /// since there is no external connection to fail here).
    fn commit_batch(&mut self, batch: &[CitationEdge]) -> usize {
        let mut txn = Transaction::new(self);
        for edge in batch {
            txn.stage(edge.clone());
        }
        txn.commit()
    }
}

/// A staged batch of edge inserts. Exists as its own type so the
/// insert-path reads the same way it would against a real transactional
/// backend: stage, then commit-or-rollback as a unit.
struct Transaction<'a> {
    store: &'a mut InMemoryGraphStore,
    staged: Vec<CitationEdge>,
}

impl<'a> Transaction<'a> {
    fn new(store: &'a mut InMemoryGraphStore) -> Self {
        Self { store, staged: Vec::new() }
    }

    fn stage(&mut self, edge: CitationEdge) {
        self.staged.push(edge);
    }

    fn commit(self) -> usize {
        let mut inserted = 0;
        for edge in self.staged {
            let source = self.store.node_index(&edge.source_law_id);
            let target = self.store.node_index(&edge.target_law_id);
            self.store.graph.add_edge(source, target, edge);
            inserted += 1;
        }
        inserted
    }
}

impl GraphStore for InMemoryGraphStore {
    fn upsert_law_node(&mut self, law_id: &LawId, title: &str, kind: LawKind, article_count: usize) -> Result<(), CiteError> {
        let idx = self.node_index(law_id);
        let node = self.graph.node_weight_mut(idx).expect("index always points at a live node");
        node.title = title.to_string();
        node.kind = kind;
        node.article_count = article_count;
        Ok(())
    }

    fn clear_edges(&mut self) -> Result<(), CiteError> {
        let edges: Vec<_> = self.graph.edge_indices().collect();
        for e in edges {
            self.graph.remove_edge(e);
        }
        Ok(())
    }

    fn insert_edges(&mut self, batch: &[CitationEdge]) -> Result<usize, CiteError> {
        let mut total = 0;
        for chunk in batch.chunks(DEFAULT_BATCH_SIZE) {
            total += self.commit_batch(chunk);
        }
        Ok(total)
    }

    fn reverse_traverse(&self, origin: &ArticleKey, depth: u8, min_confidence: f64) -> Result<Vec<ImpactedNode>, CiteError> {
        let Some(&origin_idx) = self.index.get(&origin.law_id) else {
            return Err(CiteError::NotFound(format!("unknown statute in graph: {}", origin.law_id)));
        };

        let mut visited: HashMap<NodeIndex, ImpactedNode> = HashMap::new();
        let mut frontier = vec![origin_idx];
        let mut current_depth: u8 = 0;

        while current_depth < depth && !frontier.is_empty() {
            // node -> (path_count at this level, strongest raw edge confidence seen)
            let mut next_level: HashMap<NodeIndex, (u32, f64)> = HashMap::new();

            for &node in &frontier {
                for edge_ref in self.graph.edges_directed(node, Direction::Incoming) {
                    let edge = edge_ref.weight();
                    if edge.confidence < min_confidence {
                        continue;
                    }
                    let source = edge_ref.source();
                    if visited.contains_key(&source) {
                        continue;
                    }
                    let slot = next_level.entry(source).or_insert((0, 0.0));
                    slot.0 += 1;
                    slot.1 = slot.1.max(edge.confidence);
                }
            }

            let decay = 0.9f64.powi(current_depth as i32);
            current_depth += 1;

            for (node, (path_count, raw_confidence)) in next_level {
                let data = &self.graph[node];
                visited.insert(
                    node,
                    ImpactedNode {
                        node_id: data.law_id.clone(),
                        node_kind: data.kind,
                        depth: current_depth,
                        path_count,
                        min_distance: current_depth,
                        confidence: raw_confidence * decay,
                    },
                );
            }

            frontier = visited
                .values()
                .filter(|n| n.depth == current_depth)
                .map(|n| self.index[&n.node_id])
                .collect();
        }

        Ok(visited.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: &str, target: &str, confidence: f64) -> CitationEdge {
        CitationEdge::new(
            LawId::new(source),
            LawId::new(target),
            citelaw_core::CitationKind::External,
            "第1条",
            None,
            "引用",
            confidence,
            true,
        )
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut store = InMemoryGraphStore::new();
        store.upsert_law_node(&LawId::new("A"), "甲法", LawKind::Act, 10).unwrap();
        store.upsert_law_node(&LawId::new("A"), "甲法（改称）", LawKind::Act, 12).unwrap();
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn clear_edges_keeps_nodes() {
        let mut store = InMemoryGraphStore::new();
        store.insert_edges(&[edge("A", "B", 0.9)]).unwrap();
        assert_eq!(store.edge_count(), 1);
        store.clear_edges().unwrap();
        assert_eq!(store.edge_count(), 0);
        assert_eq!(store.node_count(), 2);
    }

    #[test]
    fn self_loops_are_permitted() {
        let mut store = InMemoryGraphStore::new();
        let inserted = store.insert_edges(&[edge("A", "A", 0.9)]).unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn reverse_traverse_finds_direct_and_transitive_impact() {
        let mut store = InMemoryGraphStore::new();
        // C cites B, B cites A: an edit at A transitively impacts B (depth 1)
        // and C (depth 2).
        store.insert_edges(&[edge("B", "A", 0.9), edge("C", "B", 0.8)]).unwrap();

        let origin = ArticleKey::new(LawId::new("A"), "第1条");
        let result = store.reverse_traverse(&origin, 5, 0.7).unwrap();

        let b = result.iter().find(|n| n.node_id == LawId::new("B")).unwrap();
        assert_eq!(b.depth, 1);
        assert!((b.confidence - 0.9).abs() < 1e-9);

        let c = result.iter().find(|n| n.node_id == LawId::new("C")).unwrap();
        assert_eq!(c.depth, 2);
        assert!((c.confidence - 0.8 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn depth_limit_bounds_traversal() {
        let mut store = InMemoryGraphStore::new();
        store.insert_edges(&[edge("B", "A", 0.9), edge("C", "B", 0.8)]).unwrap();
        let origin = ArticleKey::new(LawId::new("A"), "第1条");
        let result = store.reverse_traverse(&origin, 1, 0.7).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].node_id, LawId::new("B"));
    }

    #[test]
    fn below_threshold_edges_are_excluded() {
        let mut store = InMemoryGraphStore::new();
        store.insert_edges(&[edge("B", "A", 0.5)]).unwrap();
        let origin = ArticleKey::new(LawId::new("A"), "第1条");
        let result = store.reverse_traverse(&origin, 5, 0.7).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn cycles_terminate_via_first_discovery() {
        let mut store = InMemoryGraphStore::new();
        // A cites B, B cites A: a cycle.
        store.insert_edges(&[edge("A", "B", 0.9), edge("B", "A", 0.9)]).unwrap();
        let origin = ArticleKey::new(LawId::new("A"), "第1条");
        let result = store.reverse_traverse(&origin, 5, 0.7).unwrap();
        // B is discovered once, at depth 1; A is never re-added as its own
        // impacted node (the origin is never revisited).
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].node_id, LawId::new("B"));
        assert_eq!(result[0].depth, 1);
    }
}

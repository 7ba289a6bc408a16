//! Amendment-impact analysis: turns a bounded reverse traversal into
//! ranked, scored impact results.

use citelaw_core::ports::GraphStore;
use citelaw_core::{ArticleKey, CiteError, ImpactBucket, ImpactedNode};

/// One statute's computed impact, ready to print or serialize.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactResult {
    pub node: ImpactedNode,
    pub score: f64,
    pub bucket: ImpactBucket,
}

/// `score = min(1, 0.7 * (1 / (impact_level * 0.5)) + 0.3 * min(path_count / 10, 1))`
/// where `impact_level` is the node's shortest distance from the origin.
fn score(impact_level: u8, path_count: u32) -> f64 {
    let distance_term = 0.7 * (1.0 / (impact_level as f64 * 0.5));
    let breadth_term = 0.3 * (path_count as f64 / 10.0).min(1.0);
    (distance_term + breadth_term).min(1.0)
}

/// Runs amendment-impact analysis from `origin` out to `depth` levels
/// (1..=5), keeping only edges at or above `min_confidence`.
///
/// `include_indirect = false` reports only statutes with a direct citation
/// to `origin`'s article (depth 1), matching "direct dependents only";
/// `true` expands transitively out to `depth`.
pub fn analyze(
    store: &dyn GraphStore,
    origin: &ArticleKey,
    depth: u8,
    min_confidence: f64,
    include_indirect: bool,
) -> Result<Vec<ImpactResult>, CiteError> {
    if !(1..=5).contains(&depth) {
        return Err(CiteError::InvalidInput(format!("depth must be 1..=5, got {depth}")));
    }
    if !(0.0..=1.0).contains(&min_confidence) {
        return Err(CiteError::InvalidInput(format!(
            "min_confidence must be within [0, 1], got {min_confidence}"
        )));
    }

    let effective_depth = if include_indirect { depth } else { 1 };
    let nodes = store.reverse_traverse(origin, effective_depth, min_confidence)?;

    let mut results: Vec<ImpactResult> = nodes
        .into_iter()
        .map(|node| {
            let s = score(node.min_distance, node.path_count);
            ImpactResult {
                bucket: ImpactBucket::from_score(s),
                score: s,
                node,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.node.node_id.as_str().cmp(b.node.node_id.as_str()))
    });

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryGraphStore;
    use citelaw_core::{CitationEdge, CitationKind, LawId};

    fn edge(source: &str, target: &str, confidence: f64) -> CitationEdge {
        CitationEdge::new(
            LawId::new(source),
            LawId::new(target),
            CitationKind::External,
            "第1条",
            None,
            "引用",
            confidence,
            true,
        )
    }

    #[test]
    fn scenario_matches_worked_example() {
        // B cites A (conf 0.9), C cites B (conf 0.9); origin = A, depth = 2,
        // min-confidence = 0.7.
        let mut store = InMemoryGraphStore::new();
        store.insert_edges(&[edge("B", "A", 0.9), edge("C", "B", 0.9)]).unwrap();

        let origin = ArticleKey::new(LawId::new("A"), "第1条");
        let results = analyze(&store, &origin, 2, 0.7, true).unwrap();

        let b = results.iter().find(|r| r.node.node_id == LawId::new("B")).unwrap();
        assert_eq!(b.node.min_distance, 1);
        assert!((b.node.confidence - 0.9).abs() < 1e-9);

        let c = results.iter().find(|r| r.node.node_id == LawId::new("C")).unwrap();
        assert_eq!(c.node.min_distance, 2);
        assert!((c.node.confidence - 0.9 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn include_indirect_false_stops_at_depth_one() {
        let mut store = InMemoryGraphStore::new();
        store.insert_edges(&[edge("B", "A", 0.9), edge("C", "B", 0.9)]).unwrap();
        let origin = ArticleKey::new(LawId::new("A"), "第1条");
        let results = analyze(&store, &origin, 5, 0.7, false).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].node.node_id, LawId::new("B"));
    }

    #[test]
    fn rejects_out_of_range_depth() {
        let store = InMemoryGraphStore::new();
        let origin = ArticleKey::new(LawId::new("A"), "第1条");
        let err = analyze(&store, &origin, 6, 0.7, true).unwrap_err();
        assert!(matches!(err, CiteError::InvalidInput(_)));
    }

    #[test]
    fn score_and_bucket_are_consistent() {
        // impact_level 1 saturates the [0,1] cap outright.
        assert_eq!(score(1, 0), 1.0);
        assert_eq!(ImpactBucket::from_score(score(1, 0)), ImpactBucket::High);
        // impact_level 2 lands exactly on the high/medium boundary.
        assert!((score(2, 0) - 0.7).abs() < 1e-9);
        let deep = score(5, 0);
        assert!(deep < 0.4);
        assert_eq!(ImpactBucket::from_score(deep), ImpactBucket::Low);
    }

    #[test]
    fn higher_path_count_raises_score_at_same_depth() {
        let low = score(2, 0);
        let high = score(2, 10);
        assert!(high > low);
    }
}

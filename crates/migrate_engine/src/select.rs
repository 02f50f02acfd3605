use engine_logging::engine_debug;

use crate::dom::{DomTree, NodeId, SelectorError};

/// Pick the candidate container holding the most text.
///
/// Candidates are scored by the character count of their trimmed text. The
/// first element seen with the top score wins (selector order, then document
/// order). When nothing scores above zero the document body is returned, so the
/// result is always a usable node.
pub fn select_main(tree: &DomTree, candidates: &[String]) -> Result<NodeId, SelectorError> {
    let mut best: Option<(NodeId, usize)> = None;
    for selector in candidates {
        for node in tree.select(selector)? {
            let len = text_len(tree, node);
            if len > best.map_or(0, |(_, best_len)| best_len) {
                best = Some((node, len));
            }
        }
    }

    Ok(match best {
        Some((node, len)) => {
            engine_debug!("Main content node={} text_len={}", node, len);
            node
        }
        None => tree.body(),
    })
}

pub fn text_len(tree: &DomTree, node: NodeId) -> usize {
    tree.text(node).trim().chars().count()
}

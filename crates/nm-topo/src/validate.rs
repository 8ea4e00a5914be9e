use nm_core::{Error, Morphology, Node, NodeId};
use tracing::warn;

use crate::sort::topological_order;

/// `(node, missing parent)` for every parent reference that does not resolve.
pub fn dangling_references(m: &Morphology) -> Vec<(NodeId, NodeId)> {
    m.iter()
        .filter_map(|n| match n.parent {
            Some(p) if !m.contains(p) => Some((n.id, p)),
            _ => None,
        })
        .collect()
}

/// Promotes every node with a dangling parent to a root. Returns how many
/// nodes were detached.
pub fn detach_dangling(m: &mut Morphology) -> Result<usize, Error> {
    let dangling = dangling_references(m);
    if dangling.is_empty() {
        return Ok(0);
    }

    for &(node, parent) in &dangling {
        warn!(node, parent, "detaching node with missing parent");
    }

    let nodes: Vec<Node> = m
        .iter()
        .map(|n| match n.parent {
            Some(p) if !m.contains(p) => Node { parent: None, ..*n },
            _ => *n,
        })
        .collect();
    m.set_nodes(nodes)?;
    Ok(dangling.len())
}

/// Checks that every parent resolves and no parent chain loops.
pub fn validate(m: &Morphology) -> Result<(), Error> {
    topological_order(m).map(|_| ())
}

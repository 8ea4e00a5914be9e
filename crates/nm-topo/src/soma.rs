//! Soma segment detection, removal and normalization.
//!
//! The soma segment is the connected group of soma-typed nodes that contains
//! a root or a direct child of a root. Soma-typed nodes deeper in the tree are
//! not part of it.

use std::collections::HashSet;

use nm_core::{Error, Morphology, Node, NodeId, NodeKind, Point3};
use tracing::{debug, warn};

use crate::validate::validate;

/// Ids of the soma segment, in mapping order. Empty when there is none.
pub fn soma_segment(m: &Morphology) -> Vec<NodeId> {
    let children = m.children();
    let is_root_id = |id: NodeId| m.get(id).is_some_and(Node::is_root);

    let mut member: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<NodeId> = m
        .iter()
        .filter(|n| n.kind.is_soma())
        .filter(|n| n.parent.is_none_or(is_root_id))
        .map(|n| n.id)
        .collect();

    while let Some(id) = stack.pop() {
        if !member.insert(id) {
            continue;
        }
        if let Some(kids) = children.get(&id) {
            for &c in kids {
                if m.get(c).is_some_and(|n| n.kind.is_soma()) {
                    stack.push(c);
                }
            }
        }
    }

    m.iter()
        .filter(|n| member.contains(&n.id))
        .map(|n| n.id)
        .collect()
}

pub fn has_soma_segment(m: &Morphology) -> bool {
    !soma_segment(m).is_empty()
}

/// Complement of [`has_soma_segment`].
pub fn is_soma_missing(m: &Morphology) -> bool {
    !has_soma_segment(m)
}

/// Removes the soma segment. Each surviving node whose parent was removed is
/// re-attached to its nearest surviving ancestor, or becomes a root.
///
/// Fails with [`Error::NotFound`] when there is no soma segment.
pub fn remove_soma_segment(m: &Morphology) -> Result<Morphology, Error> {
    validate(m)?;
    let segment: HashSet<NodeId> = soma_segment(m).into_iter().collect();
    if segment.is_empty() {
        return Err(Error::NotFound("soma segment".into()));
    }

    let nodes = m
        .iter()
        .filter(|n| !segment.contains(&n.id))
        .map(|n| Node {
            parent: surviving_ancestor(m, n.parent, &segment),
            ..*n
        })
        .collect();

    let out = Morphology::from_nodes(nodes)?;
    debug!(removed = segment.len(), remaining = out.len(), "removed soma segment");
    Ok(out)
}

/// Replaces the soma segment by a single soma node at the segment's mean
/// position and radius. The merged node keeps the id and mapping slot of the
/// first segment node; every child of the segment is attached to it.
pub fn collapse_soma_segment(m: &Morphology) -> Result<Morphology, Error> {
    validate(m)?;
    let ids = soma_segment(m);
    let Some(&keep) = ids.first() else {
        return Err(Error::NotFound("soma segment".into()));
    };
    let segment: HashSet<NodeId> = ids.iter().copied().collect();

    let count = ids.len() as f64;
    let (mut sx, mut sy, mut sz, mut sr) = (0.0, 0.0, 0.0, 0.0);
    for n in ids.iter().filter_map(|&id| m.get(id)) {
        sx += n.p.x;
        sy += n.p.y;
        sz += n.p.z;
        sr += n.radius;
    }

    let first = m
        .get(keep)
        .ok_or_else(|| Error::NotFound(format!("node {keep}")))?;
    let merged = Node {
        id: keep,
        kind: NodeKind::Soma,
        p: Point3::new(sx / count, sy / count, sz / count),
        radius: sr / count,
        parent: surviving_ancestor(m, first.parent, &segment),
    };

    let mut nodes = Vec::with_capacity(m.len() - ids.len() + 1);
    for n in m.iter() {
        if n.id == keep {
            nodes.push(merged);
        } else if !segment.contains(&n.id) {
            let parent = match n.parent {
                Some(p) if segment.contains(&p) => Some(keep),
                other => other,
            };
            nodes.push(Node { parent, ..*n });
        }
    }

    debug!(merged = ids.len(), "collapsed soma segment");
    Morphology::from_nodes(nodes)
}

/// Labels the first root as soma when the soma is missing; otherwise
/// returns an unchanged copy.
pub fn set_soma(m: &Morphology) -> Result<Morphology, Error> {
    if !is_soma_missing(m) {
        return Ok(m.clone());
    }

    let Some(root) = m.roots().next().map(|n| n.id) else {
        warn!("soma missing and no root to label");
        return Ok(m.clone());
    };

    let nodes: Vec<Node> = m
        .iter()
        .map(|n| {
            if n.id == root {
                Node {
                    kind: NodeKind::Soma,
                    ..*n
                }
            } else {
                *n
            }
        })
        .collect();
    debug!(root, "labelled root as soma");
    Morphology::from_nodes(nodes)
}

fn surviving_ancestor(
    m: &Morphology,
    mut parent: Option<NodeId>,
    removed: &HashSet<NodeId>,
) -> Option<NodeId> {
    while let Some(p) = parent {
        if !removed.contains(&p) {
            return Some(p);
        }
        parent = m.get(p).and_then(|n| n.parent);
    }
    None
}

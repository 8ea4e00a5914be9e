use std::collections::{HashMap, VecDeque};

use nm_core::{Error, Morphology, NodeId};
use nm_topo::validate;
use tracing::debug;

use crate::trunk::{Attachment, Trunk, TrunkId, TrunkParentMap};

/// Splits `m` into trunks. Every node lands in exactly one trunk; a trunk
/// starts at a root or at a child of a branch point and runs while the
/// current node has exactly one child, so it ends on a leaf or a branch
/// point. Trunks are numbered in emission order and every trunk comes after
/// the trunk it hangs from.
///
/// With `extended`, each trunk also carries its [`Attachment`] inline.
pub fn build_trunks(m: &Morphology, extended: bool) -> Result<Vec<Trunk>, Error> {
    validate(m)?;
    let children = m.children();

    let mut trunks: Vec<Trunk> = Vec::new();
    let mut pending: VecDeque<(NodeId, Option<Attachment>)> =
        m.roots().map(|n| (n.id, None)).collect();

    while let Some((start, attachment)) = pending.pop_front() {
        let id = trunks.len();
        let mut nodes = Vec::new();
        let mut cur = start;
        loop {
            let Some(n) = m.get(cur) else {
                return Err(Error::NotFound(format!("node {cur}")));
            };
            nodes.push(*n);
            match children.get(&cur).map(Vec::as_slice) {
                Some([only]) => cur = *only,
                Some(kids) => {
                    let link = Attachment {
                        parent_trunk: id,
                        node: cur,
                    };
                    pending.extend(kids.iter().map(|&k| (k, Some(link))));
                    break;
                }
                None => break,
            }
        }

        let mut trunk = Trunk::new(id, nodes);
        if extended {
            trunk.attachment = attachment;
        }
        trunks.push(trunk);
    }

    debug!(nodes = m.len(), trunks = trunks.len(), "built trunks");
    Ok(trunks)
}

/// Resolves each trunk's first node parent to the trunk that owns it.
///
/// The parent id is taken from `m` when the node is still there, otherwise
/// from the trunk's own copy. Fails with [`Error::NotFound`] when a parent is
/// owned by no trunk.
pub fn trunk_parent_map(m: &Morphology, trunks: &[Trunk]) -> Result<TrunkParentMap, Error> {
    let owner: HashMap<NodeId, TrunkId> = trunks
        .iter()
        .flat_map(|t| t.nodes.iter().map(move |n| (n.id, t.id)))
        .collect();

    let mut map = TrunkParentMap::new();
    for t in trunks {
        let Some(first) = t.first() else {
            continue;
        };
        let parent = m.get(first.id).map_or(first.parent, |n| n.parent);
        let Some(parent) = parent else {
            continue;
        };
        let parent_trunk = *owner.get(&parent).ok_or_else(|| {
            Error::NotFound(format!("trunk owning node {parent} (parent of trunk {})", t.id))
        })?;
        map.insert(
            t.id,
            Attachment {
                parent_trunk,
                node: parent,
            },
        );
    }
    Ok(map)
}

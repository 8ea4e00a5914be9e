use std::collections::HashMap;

use nm_core::{Error, Morphology, Node, NodeId};
use nm_topo::{is_topologically_sorted, sorted};
use tracing::debug;

use crate::trunk::{Trunk, TrunkId, TrunkParentMap};

/// Concatenates trunks back into one morphology.
///
/// Without a map every node keeps its id and its own `parent`, which is
/// exact for an unmodified decomposition and for resampled trunks whose end
/// nodes kept their ids.
///
/// With a map, nodes are renumbered from 1 in trunk order, each trunk is
/// chained internally and its first node is linked to the attachment node of
/// its parent trunk. When that node no longer exists the nearest node of the
/// parent trunk is used instead.
pub fn assemble_trunks(
    trunks: &[Trunk],
    parents: Option<&TrunkParentMap>,
) -> Result<Morphology, Error> {
    let m = match parents {
        None => {
            let nodes = trunks.iter().flat_map(|t| t.nodes.iter().copied()).collect();
            Morphology::from_nodes(nodes)?
        }
        Some(map) => relink(trunks, map)?,
    };
    debug!(trunks = trunks.len(), nodes = m.len(), "assembled trunks");
    Ok(m)
}

fn relink(trunks: &[Trunk], map: &TrunkParentMap) -> Result<Morphology, Error> {
    // New id of every (trunk, position), assigned in trunk order.
    let mut base: HashMap<TrunkId, (usize, &Trunk)> = HashMap::with_capacity(trunks.len());
    let mut next: NodeId = 1;
    for t in trunks {
        base.insert(t.id, (next, t));
        next += t.len();
    }

    let mut nodes = Vec::with_capacity(next - 1);
    for t in trunks {
        let Some(first) = t.first() else {
            continue;
        };
        let start = base.get(&t.id).map_or(1, |&(b, _)| b);

        let head_parent = match map.get(&t.id) {
            None => None,
            Some(link) => {
                let &(parent_base, parent) = base.get(&link.parent_trunk).ok_or_else(|| {
                    Error::NotFound(format!("parent trunk {} of trunk {}", link.parent_trunk, t.id))
                })?;
                let slot = parent
                    .nodes
                    .iter()
                    .position(|n| n.id == link.node)
                    .or_else(|| nearest(parent, first))
                    .ok_or_else(|| Error::NotFound(format!("parent trunk {} is empty", parent.id)))?;
                Some(parent_base + slot)
            }
        };

        for (i, n) in t.nodes.iter().enumerate() {
            let parent = if i == 0 { head_parent } else { Some(start + i - 1) };
            nodes.push(Node {
                id: start + i,
                parent,
                ..*n
            });
        }
    }

    let m = Morphology::from_nodes(nodes)?;
    if is_topologically_sorted(&m) {
        Ok(m)
    } else {
        sorted(&m)
    }
}

fn nearest(trunk: &Trunk, to: &Node) -> Option<usize> {
    trunk
        .nodes
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.p.distance(to.p).total_cmp(&b.p.distance(to.p)))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use nm_core::{Error, Morphology, Node, NodeKind, Point3};
    use nm_topo::{dangling_references, is_topologically_sorted};
    use proptest::prelude::*;

    use crate::{
        Attachment, Trunk, TrunkParentMap, assemble_trunks, build_trunks, trunk_parent_map,
    };

    fn node(id: usize, x: f64, y: f64, parent: Option<usize>) -> Node {
        Node::new(id, NodeKind::Axon, Point3::new(x, y, 0.0), 1.0, parent)
    }

    fn tree() -> Morphology {
        Morphology::from_nodes(vec![
            node(1, 0.0, 0.0, None),
            node(2, 1.0, 0.0, Some(1)),
            node(3, 2.0, 0.0, Some(2)),
            node(4, 3.0, 1.0, Some(3)),
            node(5, 3.0, -1.0, Some(3)),
            node(6, 4.0, -2.0, Some(5)),
        ])
        .expect("valid")
    }

    fn parent_table(m: &Morphology) -> HashMap<usize, Option<usize>> {
        m.iter().map(|n| (n.id, n.parent)).collect()
    }

    #[test]
    fn unmodified_decomposition_round_trips() {
        let m = tree();
        let trunks = build_trunks(&m, false).expect("valid tree");
        let back = assemble_trunks(&trunks, None).expect("assemble");

        assert_eq!(back.len(), m.len());
        assert_eq!(parent_table(&back), parent_table(&m));
        for n in m.iter() {
            assert_eq!(back.get(n.id), Some(n));
        }
    }

    #[test]
    fn map_relinks_trunks_that_lost_their_parent_ids() {
        let m = tree();
        let mut trunks = build_trunks(&m, false).expect("valid tree");
        let map = trunk_parent_map(&m, &trunks).expect("resolvable");

        // Drop every parent link, as a resampler that forgets them would.
        for t in &mut trunks {
            for n in &mut t.nodes {
                n.parent = None;
            }
        }
        let back = assemble_trunks(&trunks, Some(&map)).expect("assemble");

        assert_eq!(back.len(), m.len());
        assert_eq!(back.roots().count(), 1);
        assert!(dangling_references(&back).is_empty());
        assert!(is_topologically_sorted(&back));
        // Renumbered from 1; trunk [4] hangs off the branch point (3).
        let leaf = back
            .iter()
            .find(|n| n.p == Point3::new(3.0, 1.0, 0.0))
            .expect("leaf 4");
        let branch = back.get(leaf.parent.expect("attached")).expect("branch point");
        assert_eq!(branch.p, Point3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn missing_attachment_node_falls_back_to_nearest() {
        let parent = Trunk::new(
            0,
            vec![node(1, 0.0, 0.0, None), node(2, 10.0, 0.0, Some(1))],
        );
        let child = Trunk::new(1, vec![node(3, 9.0, 1.0, Some(99))]);
        let mut map = TrunkParentMap::new();
        map.insert(
            1,
            Attachment {
                parent_trunk: 0,
                node: 99,
            },
        );

        let m = assemble_trunks(&[parent, child], Some(&map)).expect("assemble");
        let tip = m.iter().find(|n| n.p.x == 9.0).expect("child node");
        assert_eq!(tip.parent, Some(2));
    }

    #[test]
    fn unknown_parent_trunk_is_not_found() {
        let child = Trunk::new(1, vec![node(3, 9.0, 1.0, None)]);
        let mut map = TrunkParentMap::new();
        map.insert(
            1,
            Attachment {
                parent_trunk: 5,
                node: 1,
            },
        );
        assert!(matches!(
            assemble_trunks(&[child], Some(&map)),
            Err(Error::NotFound(_))
        ));
    }

    fn arb_tree() -> impl Strategy<Value = Morphology> {
        prop::collection::vec(0usize..1000, 1..80).prop_map(|picks| {
            let nodes = picks
                .iter()
                .enumerate()
                .map(|(i, &pick)| {
                    let parent = (i > 0).then(|| pick % i + 1);
                    node(i + 1, i as f64, (pick % 13) as f64, parent)
                })
                .collect();
            Morphology::from_nodes(nodes).expect("unique ids")
        })
    }

    proptest! {
        #[test]
        fn decomposition_partitions_and_reassembles(m in arb_tree()) {
            let trunks = build_trunks(&m, true).expect("valid tree");
            let total: usize = trunks.iter().map(Trunk::len).sum();
            prop_assert_eq!(total, m.len());

            let back = assemble_trunks(&trunks, None).expect("assemble");
            prop_assert_eq!(parent_table(&back), parent_table(&m));

            let map = trunk_parent_map(&m, &trunks).expect("resolvable");
            let relinked = assemble_trunks(&trunks, Some(&map)).expect("relink");
            prop_assert_eq!(relinked.len(), m.len());
            prop_assert_eq!(relinked.num_edges(), m.num_edges());
        }
    }
}

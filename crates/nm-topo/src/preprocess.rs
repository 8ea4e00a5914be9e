use std::collections::{HashMap, HashSet};

use nm_core::{Error, Morphology, Node, NodeId, Point3, distance_to_segment};
use tracing::debug;

use crate::sort::topological_order;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessConfig {
    /// A node this close to its parent is a duplicate point.
    pub merge_distance: f64,
    /// Maximum distance of a dropped point from the straight segment that
    /// replaces it.
    pub colinear_tolerance: f64,
    /// Maximum difference between a dropped point's radius and the radius
    /// interpolated along that segment.
    pub radius_tolerance: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            merge_distance: 1e-6,
            colinear_tolerance: 1e-3,
            radius_tolerance: 1e-3,
        }
    }
}

/// Drops structurally redundant nodes: points coincident with their parent
/// and interior points lying on the straight segment between their
/// neighbours whose radius matches the linear taper along it. Roots, leaves
/// and branch points are always kept, so a straight unbranched chain of
/// uniform taper shrinks to its two ends.
///
/// Surviving nodes keep their ids and mapping order; children of a dropped
/// node are linked to its nearest surviving ancestor.
pub fn preprocess(m: &Morphology, cfg: &PreprocessConfig) -> Result<Morphology, Error> {
    let order = topological_order(m)?;
    let children = m.children();
    let nodes = m.nodes();

    let mut removed: HashSet<NodeId> = HashSet::new();
    // For a dropped node: the surviving anchor it hangs from and every point
    // dropped since that anchor, itself included.
    let mut anchor_of: HashMap<NodeId, NodeId> = HashMap::new();
    let mut run_of: HashMap<NodeId, Vec<(Point3, f64)>> = HashMap::new();

    for &i in &order {
        let n = &nodes[i];
        let Some(parent) = n.parent else {
            continue;
        };
        let [child] = children.get(&n.id).map(Vec::as_slice).unwrap_or(&[]) else {
            continue;
        };

        let anchor_id = anchor_of.get(&parent).copied().unwrap_or(parent);
        let (Some(anchor), Some(child)) = (m.get(anchor_id), m.get(*child)) else {
            continue;
        };

        let mut run = run_of.get(&parent).cloned().unwrap_or_default();
        run.push((n.p, n.radius));

        let coincident = n.p.distance(anchor.p) <= cfg.merge_distance;
        let colinear = n.kind == anchor.kind
            && n.kind == child.kind
            && run.iter().all(|&(q, r)| {
                let (off, t) = distance_to_segment(q, anchor.p, child.p);
                let taper = anchor.radius + (child.radius - anchor.radius) * t;
                off <= cfg.colinear_tolerance && (r - taper).abs() <= cfg.radius_tolerance
            });

        if coincident || colinear {
            removed.insert(n.id);
            anchor_of.insert(n.id, anchor_id);
            run_of.insert(n.id, run);
        }
    }

    let out: Vec<Node> = nodes
        .iter()
        .filter(|n| !removed.contains(&n.id))
        .map(|n| Node {
            parent: n
                .parent
                .map(|p| anchor_of.get(&p).copied().unwrap_or(p)),
            ..*n
        })
        .collect();

    debug!(before = m.len(), after = out.len(), "preprocess");
    Morphology::from_nodes(out)
}

#[cfg(test)]
mod tests {
    use nm_core::{Morphology, Node, NodeKind, Point3};
    use proptest::prelude::*;

    use crate::{PreprocessConfig, is_topologically_sorted, preprocess, validate};

    fn node(id: usize, x: f64, y: f64, parent: Option<usize>) -> Node {
        Node::new(id, NodeKind::BasalDendrite, Point3::new(x, y, 0.0), 1.0, parent)
    }

    fn radii(m: &Morphology) -> Vec<f64> {
        m.iter().map(|n| n.radius).collect()
    }

    fn straight_chain(radii: &[f64]) -> Morphology {
        let nodes = radii
            .iter()
            .enumerate()
            .map(|(i, &r)| Node {
                radius: r,
                ..node(i + 1, i as f64, 0.0, (i > 0).then_some(i))
            })
            .collect();
        Morphology::from_nodes(nodes).expect("valid")
    }

    #[test]
    fn straight_chain_keeps_only_ends() {
        let m = Morphology::from_nodes(vec![
            node(1, 0.0, 0.0, None),
            node(2, 1.0, 0.0, Some(1)),
            node(3, 2.0, 0.0, Some(2)),
            node(4, 3.0, 0.0, Some(3)),
        ])
        .expect("valid");

        let out = preprocess(&m, &PreprocessConfig::default()).expect("valid tree");
        assert_eq!(out.len(), 2);
        assert_eq!(out.get(4).expect("leaf").parent, Some(1));
        validate(&out).expect("no dangling links");
    }

    #[test]
    fn keeps_bends_branch_points_and_leaves() {
        // 1 -> 2 -> 3 (bend) -> 4 (branch) -> {5, 6}
        let m = Morphology::from_nodes(vec![
            node(1, 0.0, 0.0, None),
            node(2, 1.0, 0.0, Some(1)),
            node(3, 2.0, 0.0, Some(2)),
            node(4, 2.0, 1.0, Some(3)),
            node(5, 2.0, 2.0, Some(4)),
            node(6, 3.0, 1.0, Some(4)),
        ])
        .expect("valid");

        let out = preprocess(&m, &PreprocessConfig::default()).expect("valid tree");
        let ids: Vec<usize> = out.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 3, 4, 5, 6]);
        assert_eq!(out.get(3).expect("bend").parent, Some(1));
        assert!(is_topologically_sorted(&out));
    }

    #[test]
    fn drops_duplicate_points() {
        let m = Morphology::from_nodes(vec![
            node(1, 0.0, 0.0, None),
            node(2, 0.0, 0.0, Some(1)),
            node(3, 0.0, 5.0, Some(2)),
            node(4, 4.0, 5.0, Some(3)),
        ])
        .expect("valid");

        let out = preprocess(&m, &PreprocessConfig::default()).expect("valid tree");
        let ids: Vec<usize> = out.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
        assert_eq!(out.get(3).expect("node 3").parent, Some(1));
    }

    #[test]
    fn gentle_curve_is_not_flattened_past_tolerance() {
        // Each point alone is close to its neighbours' chord, but together
        // they bow away from the chord 1 -> 5.
        let m = Morphology::from_nodes(vec![
            node(1, 0.0, 0.0, None),
            node(2, 1.0, 0.0008, Some(1)),
            node(3, 2.0, 0.0016, Some(2)),
            node(4, 3.0, 0.0008, Some(3)),
            node(5, 4.0, 0.0, Some(4)),
        ])
        .expect("valid");

        let out = preprocess(&m, &PreprocessConfig::default()).expect("valid tree");
        assert!(out.len() > 2);
        assert!(out.contains(1) && out.contains(5));
    }

    #[test]
    fn empty_input_stays_empty() {
        let out = preprocess(&Morphology::new(), &PreprocessConfig::default()).expect("empty");
        assert!(out.is_empty());
    }

    #[test]
    fn radius_profile_survives_on_a_straight_run() {
        let m = straight_chain(&[1.0, 4.0, 0.5, 3.0, 1.0]);
        let out = preprocess(&m, &PreprocessConfig::default()).expect("valid tree");
        assert_eq!(radii(&out), vec![1.0, 4.0, 0.5, 3.0, 1.0]);
    }

    #[test]
    fn uniform_taper_is_still_dropped() {
        let m = straight_chain(&[2.0, 1.75, 1.5, 1.25, 1.0]);
        let out = preprocess(&m, &PreprocessConfig::default()).expect("valid tree");
        assert_eq!(radii(&out), vec![2.0, 1.0]);

        // A single bump keeps only the nodes the taper cannot explain.
        let m = straight_chain(&[1.0, 1.0, 2.0, 1.0, 1.0]);
        let out = preprocess(&m, &PreprocessConfig::default()).expect("valid tree");
        assert!(out.contains(3));
        assert!(out.contains(1) && out.contains(5));
    }

    fn arb_forest() -> impl Strategy<Value = Vec<Node>> {
        prop::collection::vec(0usize..1000, 1..60).prop_flat_map(|picks| {
            let nodes: Vec<Node> = picks
                .iter()
                .enumerate()
                .map(|(i, &pick)| {
                    let parent = if i == 0 || pick % 7 == 0 {
                        None
                    } else {
                        Some(pick % i + 1)
                    };
                    // Few distinct positions on one line, so runs collapse.
                    node(i + 1, (pick % 4) as f64, 0.0, parent)
                })
                .collect();
            Just(nodes).prop_shuffle()
        })
    }

    proptest! {
        #[test]
        fn never_drops_roots_leaves_or_branch_points(nodes in arb_forest()) {
            let m = Morphology::from_nodes(nodes).expect("unique ids");
            let children = m.children();
            let out = preprocess(&m, &PreprocessConfig::default()).expect("forest is acyclic");

            for n in m.iter() {
                let kids = children.get(&n.id).map_or(0, Vec::len);
                if n.is_root() || kids != 1 {
                    prop_assert!(out.contains(n.id), "node {} dropped", n.id);
                }
            }
            prop_assert!(out.len() <= m.len());
            prop_assert_eq!(out.roots().count(), m.roots().count());
            validate(&out).expect("no dangling links");
        }
    }
}

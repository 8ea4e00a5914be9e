use nm_core::{Error, Morphology, Node};
use nm_topo::validate;
use tracing::debug;

/// Cuts every parent-child edge into `parts` equal pieces by inserting
/// `parts - 1` nodes. Inserted nodes interpolate position and radius, take
/// the child's kind, get fresh ids above the current maximum and sit right
/// before the child in mapping order.
pub fn subdivide_edges(m: &Morphology, parts: usize) -> Result<Morphology, Error> {
    if parts == 0 {
        return Err(Error::InvalidArgument(
            "edges must be cut into at least one part".into(),
        ));
    }
    validate(m)?;

    let mut next = m.next_id();
    let mut nodes = Vec::with_capacity(m.len() + m.num_edges() * (parts - 1));
    for n in m.iter() {
        let Some(parent) = n.parent.and_then(|p| m.get(p)) else {
            nodes.push(*n);
            continue;
        };

        let mut prev = parent.id;
        for k in 1..parts {
            let t = k as f64 / parts as f64;
            nodes.push(Node::new(
                next,
                n.kind,
                parent.p.lerp(n.p, t),
                parent.radius + (n.radius - parent.radius) * t,
                Some(prev),
            ));
            prev = next;
            next += 1;
        }
        nodes.push(Node {
            parent: Some(prev),
            ..*n
        });
    }

    debug!(parts, before = m.len(), after = nodes.len(), "subdivided edges");
    Morphology::from_nodes(nodes)
}

/// Inserts the midpoint of every edge.
pub fn split_edges(m: &Morphology) -> Result<Morphology, Error> {
    subdivide_edges(m, 2)
}

/// `n` successive midpoint splits; entry `k` is the split of entry `k - 1`.
pub fn split_edges_n(m: &Morphology, n: usize) -> Result<Vec<Morphology>, Error> {
    if n == 0 {
        return Err(Error::InvalidArgument("split level count must be positive".into()));
    }

    let mut levels: Vec<Morphology> = Vec::with_capacity(n);
    for _ in 0..n {
        let src = levels.last().unwrap_or(m);
        let next = split_edges(src)?;
        levels.push(next);
    }
    Ok(levels)
}

#[cfg(test)]
mod tests {
    use nm_core::{Error, Morphology, Node, NodeKind, Point3};
    use nm_topo::{dangling_references, is_topologically_sorted};

    use crate::{split_edges, split_edges_n, subdivide_edges};

    fn chain() -> Morphology {
        Morphology::from_nodes(vec![
            Node::new(1, NodeKind::Soma, Point3::new(0.0, 0.0, 0.0), 4.0, None),
            Node::new(2, NodeKind::Axon, Point3::new(2.0, 0.0, 0.0), 2.0, Some(1)),
            Node::new(3, NodeKind::Axon, Point3::new(2.0, 4.0, 0.0), 1.0, Some(2)),
        ])
        .expect("valid")
    }

    #[test]
    fn midpoint_split_adds_one_node_per_edge() {
        let m = chain();
        let out = split_edges(&m).expect("valid tree");

        assert_eq!(out.len(), m.len() + m.num_edges());
        assert!(is_topologically_sorted(&out));
        assert!(dangling_references(&out).is_empty());

        let mid = out.get(4).expect("first inserted node");
        assert_eq!(mid.p, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(mid.radius, 3.0);
        assert_eq!(mid.kind, NodeKind::Axon);
        assert_eq!(mid.parent, Some(1));
        assert_eq!(out.get(2).expect("old child").parent, Some(4));
    }

    #[test]
    fn subdivide_into_parts() {
        let out = subdivide_edges(&chain(), 4).expect("valid tree");
        assert_eq!(out.len(), 3 + 2 * 3);
        let ids: Vec<usize> = out.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 4, 5, 6, 2, 7, 8, 9, 3]);
        assert_eq!(out.get(5).expect("node 5").p, Point3::new(1.0, 0.0, 0.0));

        assert_eq!(subdivide_edges(&chain(), 1).expect("identity"), chain());
        assert!(matches!(
            subdivide_edges(&chain(), 0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn successive_levels_double_the_edges() {
        let levels = split_edges_n(&chain(), 3).expect("valid tree");
        let counts: Vec<usize> = levels.iter().map(Morphology::len).collect();
        assert_eq!(counts, vec![5, 9, 17]);
        assert!(split_edges_n(&chain(), 0).is_err());
    }

    #[test]
    fn single_node_is_unchanged() {
        let m = Morphology::from_nodes(vec![Node::new(
            1,
            NodeKind::Soma,
            Point3::default(),
            1.0,
            None,
        )])
        .expect("valid");
        assert_eq!(split_edges(&m).expect("valid"), m);
    }
}

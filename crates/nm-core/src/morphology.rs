use std::collections::HashMap;

use crate::Error;
use crate::node::{Node, NodeId};

/// A forest of sample points stored as a flat arena keyed by node id.
///
/// Node order is meaningful: it is the on-disk order and the order used by
/// sortedness checks. Parents are plain id lookups; no node owns another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Morphology {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
}

impl Morphology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self, Error> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, n) in nodes.iter().enumerate() {
            if index.insert(n.id, i).is_some() {
                return Err(Error::DuplicateId(n.id));
            }
        }
        Ok(Self { nodes, index })
    }

    /// Appends a node at the end of the mapping.
    pub fn push(&mut self, node: Node) -> Result<(), Error> {
        if self.index.contains_key(&node.id) {
            return Err(Error::DuplicateId(node.id));
        }
        self.index.insert(node.id, self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Replaces the whole node mapping.
    pub fn set_nodes(&mut self, nodes: Vec<Node>) -> Result<(), Error> {
        *self = Self::from_nodes(nodes)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of parent-child links whose parent is present.
    pub fn num_edges(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.parent.is_some_and(|p| self.index.contains_key(&p)))
            .count()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Position of `id` in mapping order.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.parent.is_none())
    }

    pub fn max_id(&self) -> Option<NodeId> {
        self.nodes.iter().map(|n| n.id).max()
    }

    /// Smallest id strictly greater than every id in use (1 when empty).
    pub fn next_id(&self) -> NodeId {
        self.max_id().map_or(1, |m| m + 1)
    }

    /// Child lists keyed by parent id, each list in mapping order. Links to
    /// missing parents are skipped.
    pub fn children(&self) -> HashMap<NodeId, Vec<NodeId>> {
        let mut out: HashMap<NodeId, Vec<NodeId>> = HashMap::with_capacity(self.nodes.len());
        for n in &self.nodes {
            if let Some(p) = n.parent
                && self.index.contains_key(&p)
            {
                out.entry(p).or_default().push(n.id);
            }
        }
        out
    }

    /// `(parent, child)` pairs for every resolvable link, in child order.
    pub fn segments(&self) -> impl Iterator<Item = (&Node, &Node)> {
        self.nodes
            .iter()
            .filter_map(|n| n.parent.and_then(|p| self.get(p)).map(|parent| (parent, n)))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, Morphology, Node, NodeKind, Point3};

    fn n(id: usize, parent: Option<usize>) -> Node {
        Node::new(
            id,
            NodeKind::BasalDendrite,
            Point3::new(id as f64, 0.0, 0.0),
            1.0,
            parent,
        )
    }

    #[test]
    fn counts_nodes_and_edges() {
        let m = Morphology::from_nodes(vec![n(1, None), n(2, Some(1)), n(3, Some(2))])
            .expect("valid morphology");
        assert_eq!(m.len(), 3);
        assert_eq!(m.num_edges(), 2);
        assert_eq!(m.roots().count(), 1);
        assert_eq!(m.max_id(), Some(3));
        assert_eq!(m.next_id(), 4);
        assert_eq!(Morphology::new().next_id(), 1);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Morphology::from_nodes(vec![n(1, None), n(1, None)]).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(1)));

        let mut m = Morphology::new();
        m.push(n(4, None)).expect("first insert");
        assert!(matches!(m.push(n(4, None)), Err(Error::DuplicateId(4))));
    }

    #[test]
    fn children_follow_mapping_order() {
        let m = Morphology::from_nodes(vec![n(1, None), n(5, Some(1)), n(3, Some(1)), n(9, Some(7))])
            .expect("valid morphology");
        let children = m.children();
        assert_eq!(children[&1], vec![5, 3]);
        assert!(!children.contains_key(&7));
        assert_eq!(m.num_edges(), 2);
        assert_eq!(m.position(3), Some(2));
    }

    #[test]
    fn segments_skip_roots_and_dangling_links() {
        let m = Morphology::from_nodes(vec![n(1, None), n(2, Some(1)), n(3, Some(8))])
            .expect("valid morphology");
        let segs: Vec<(usize, usize)> = m.segments().map(|(p, c)| (p.id, c.id)).collect();
        assert_eq!(segs, vec![(1, 2)]);
    }
}

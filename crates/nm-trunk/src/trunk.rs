use std::collections::BTreeMap;

use nm_core::{Node, NodeId, Point3, arc_lengths};

pub type TrunkId = usize;

/// Where a trunk's first node hangs off the rest of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub parent_trunk: TrunkId,
    /// Id of the branch point in the parent trunk.
    pub node: NodeId,
}

/// Trunk id -> attachment. Root trunks have no entry.
pub type TrunkParentMap = BTreeMap<TrunkId, Attachment>;

/// A maximal unbranched chain of nodes, first node nearest the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Trunk {
    pub id: TrunkId,
    pub nodes: Vec<Node>,
    /// Filled only by extended decompositions.
    pub attachment: Option<Attachment>,
}

impl Trunk {
    pub fn new(id: TrunkId, nodes: Vec<Node>) -> Self {
        Self {
            id,
            nodes,
            attachment: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn last(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn is_root(&self) -> bool {
        self.first().is_some_and(Node::is_root)
    }

    pub fn points(&self) -> Vec<Point3> {
        self.nodes.iter().map(|n| n.p).collect()
    }

    /// Polyline length through the member nodes.
    pub fn length(&self) -> f64 {
        arc_lengths(&self.points()).last().copied().unwrap_or(0.0)
    }

    pub fn max_id(&self) -> Option<NodeId> {
        self.nodes.iter().map(|n| n.id).max()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }
}

/// Gathers the inline attachments of an extended decomposition.
pub fn collect_attachments(trunks: &[Trunk]) -> TrunkParentMap {
    trunks
        .iter()
        .filter_map(|t| t.attachment.map(|a| (t.id, a)))
        .collect()
}

use crate::geom::Point3;

pub type NodeId = usize;

/// Structure identifier carried by every sample point.
///
/// The numeric codes are the SWC type field. Codes without a dedicated
/// variant are kept verbatim in [`NodeKind::Custom`] so they round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum NodeKind {
    #[default]
    Undefined,
    Soma,
    Axon,
    BasalDendrite,
    ApicalDendrite,
    Fork,
    End,
    Custom(u32),
}

impl NodeKind {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Undefined,
            1 => Self::Soma,
            2 => Self::Axon,
            3 => Self::BasalDendrite,
            4 => Self::ApicalDendrite,
            5 => Self::Fork,
            6 => Self::End,
            other => Self::Custom(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::Undefined => 0,
            Self::Soma => 1,
            Self::Axon => 2,
            Self::BasalDendrite => 3,
            Self::ApicalDendrite => 4,
            Self::Fork => 5,
            Self::End => 6,
            Self::Custom(code) => code,
        }
    }

    pub fn is_soma(self) -> bool {
        self == Self::Soma
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub p: Point3,
    pub radius: f64,
    /// `None` marks a root.
    pub parent: Option<NodeId>,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind, p: Point3, radius: f64, parent: Option<NodeId>) -> Self {
        Self {
            id,
            kind,
            p,
            radius,
            parent,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::NodeKind;

    #[test]
    fn kind_codes_round_trip() {
        for code in 0..12 {
            assert_eq!(NodeKind::from_code(code).code(), code);
        }
        assert_eq!(NodeKind::from_code(1), NodeKind::Soma);
        assert_eq!(NodeKind::from_code(9), NodeKind::Custom(9));
        assert!(NodeKind::Soma.is_soma());
        assert!(!NodeKind::Axon.is_soma());
    }
}

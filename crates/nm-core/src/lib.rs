//! Foundational data model for neuron morphologies.
//!
//! ## Nodes and Ids
//! A morphology is a forest of sample points. Each [`Node`] carries an id, a
//! structure kind, a 3D position, a radius and an optional parent id. A
//! `None` parent marks a root; on disk this is the SWC sentinel `-1`.
//!
//! ## Arena Layout
//! [`Morphology`] stores nodes in a flat vector plus an id index. Parent
//! links are id lookups, so there is no ownership between nodes and the tree
//! is reconstructed on demand. Vector order is the mapping order: it is what
//! writers emit and what sortedness checks inspect.
//!
//! ## Errors
//! All crates in the workspace report failures through the single [`Error`]
//! type defined here.

mod error;
mod geom;
mod morphology;
mod node;

pub use error::{Error, Location};
pub use geom::{Point3, Vec3, arc_lengths, distance_to_segment};
pub use morphology::Morphology;
pub use node::{Node, NodeId, NodeKind};

//! Trunk decomposition of a morphology.
//!
//! A trunk is a maximal run of single-child nodes. [`build_trunks`] splits a
//! validated tree into trunks, [`trunk_parent_map`] records where each trunk
//! hangs off its parent trunk, and [`assemble_trunks`] puts them back
//! together, optionally after the trunks were resampled.

mod assemble;
mod build;
mod trunk;

pub use assemble::assemble_trunks;
pub use build::{build_trunks, trunk_parent_map};
pub use trunk::{Attachment, Trunk, TrunkId, TrunkParentMap, collect_attachments};

//! Umbrella crate for the `neuron-morph` workspace.
//!
//! Re-exports the node model, the codecs and every engine so callers only
//! need one dependency.

pub use nm_core::*;
pub use nm_io::*;
pub use nm_resample::*;
pub use nm_topo::*;
pub use nm_trunk::*;

//! Structural checks and repairs on a [`nm_core::Morphology`].
//!
//! - Sortedness: every parent precedes its children in mapping order.
//!   [`topological_sort`] produces a depth-first order that keeps sibling
//!   order stable, and is idempotent.
//! - Validation: dangling parent references and parent-chain cycles are hard
//!   errors; [`detach_dangling`] is the explicit repair.
//! - Soma: detection, removal, collapsing and labelling of the soma segment
//!   near the root.
//! - Cleanup: [`preprocess`] drops duplicate and colinear interior points.

mod preprocess;
mod soma;
mod sort;
mod validate;

pub use preprocess::{PreprocessConfig, preprocess};
pub use soma::{
    collapse_soma_segment, has_soma_segment, is_soma_missing, remove_soma_segment, set_soma,
    soma_segment,
};
pub use sort::{is_topologically_sorted, sorted, topological_order, topological_sort};
pub use validate::{dangling_references, detach_dangling, validate};

//! Readers and writers for morphology files.
//!
//! - SWC: whitespace separated text, one node per line.
//! - UGX: XML grid with undirected edges, a diameter attachment and subsets
//!   named after node kinds.
//!
//! [`read_morphology`], [`write_morphology`] and [`convert`] pick the codec
//! from the file extension.

mod format;
mod swc;
mod ugx;

pub use format::{
    Codec, Format, SwcCodec, UgxCodec, convert, read_morphology, swc_to_ugx, ugx_to_swc,
    write_morphology,
};
pub use swc::{COMMENT_MARKER, parse_swc, read_swc, write_swc, write_swc_to};
pub use ugx::{kind_from_subset_name, parse_ugx, read_ugx, render_ugx, subset_name, write_ugx};

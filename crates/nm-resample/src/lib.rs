//! Geometric refinement of morphologies.
//!
//! - Subdivision: [`split_edges`] inserts edge midpoints, [`subdivide_edges`]
//!   cuts edges into equal parts and [`split_edges_n`] chains midpoint splits.
//! - Resampling: trunks are re-sampled at a fixed arc-length step with
//!   linear or natural cubic spline interpolation. The first and last node of
//!   every trunk are kept as they are.
//! - Refinement: [`generate_refinements`] produces a series of resampled trees
//!   with the step halved at each level.

mod refine;
mod resample;
mod spline;
mod split;

pub use refine::{Method, generate_refinements};
pub use resample::{
    resample_trunk_cubic, resample_trunk_linear, resample_trunks_cubic, resample_trunks_linear,
};
pub use spline::CubicSpline;
pub use split::{split_edges, split_edges_n, subdivide_edges};

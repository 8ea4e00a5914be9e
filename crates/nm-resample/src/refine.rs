use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use nm_core::{Error, Morphology};
use nm_trunk::{Trunk, assemble_trunks, build_trunks, trunk_parent_map};
use tracing::debug;

use crate::resample::{check_delta, resample_trunks_cubic, resample_trunks_linear};

/// Interpolation used between resampled points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Linear,
    Cubic,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Cubic => "cubic",
        }
    }

    pub fn resample(self, trunks: &[Trunk], delta: f64) -> Result<Vec<Trunk>, Error> {
        match self {
            Self::Linear => resample_trunks_linear(trunks, delta),
            Self::Cubic => resample_trunks_cubic(trunks, delta),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "cubic" => Ok(Self::Cubic),
            _ => Err(Error::InvalidArgument(format!(
                "unknown resampling method `{s}` (expected `linear` or `cubic`)"
            ))),
        }
    }
}

/// Builds `levels` refinements of `m`. Level `i` resamples every trunk at
/// `delta / 2^i` and reassembles the tree, renumbering nodes from 1.
///
/// A trunk that would lose nodes by resampling is kept as it was, so no
/// level has fewer nodes than `m`.
pub fn generate_refinements(
    m: &Morphology,
    delta: f64,
    levels: usize,
    method: Method,
) -> Result<BTreeMap<usize, Morphology>, Error> {
    check_delta(delta)?;
    if levels == 0 {
        return Err(Error::InvalidArgument(
            "refinement level count must be positive".into(),
        ));
    }

    let trunks = build_trunks(m, false)?;
    let parents = trunk_parent_map(m, &trunks)?;

    let mut out = BTreeMap::new();
    let mut step = delta;
    for level in 0..levels {
        let resampled = method.resample(&trunks, step)?;
        let chosen: Vec<Trunk> = trunks
            .iter()
            .zip(resampled)
            .map(|(orig, new)| if new.len() < orig.len() { orig.clone() } else { new })
            .collect();

        let refined = assemble_trunks(&chosen, Some(&parents))?;
        debug!(level, step, %method, nodes = refined.len(), "refinement level");
        out.insert(level, refined);
        step /= 2.0;
    }
    Ok(out)
}

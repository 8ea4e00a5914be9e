use std::collections::HashMap;

use nm_core::{Error, Node, NodeId, NodeKind, Point3, arc_lengths};
use nm_trunk::Trunk;
use tracing::debug;

use crate::spline::CubicSpline;

/// Cubic fits need at least this many distinct knots.
const MIN_CUBIC_KNOTS: usize = 4;

/// A last sample closer than this fraction of `delta` to the end merges
/// into the end node.
const END_SNAP: f64 = 1e-9;

pub(crate) fn check_delta(delta: f64) -> Result<(), Error> {
    if delta.is_finite() && delta > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "resampling step must be positive, got {delta}"
        )))
    }
}

/// Arc-length positions of the interior samples: `delta, 2 * delta, ...`
/// strictly below `length` and not within [`END_SNAP`] of it.
fn interior_stations(length: f64, delta: f64) -> Vec<f64> {
    let end = length - END_SNAP * delta;
    (1..)
        .map(|k| k as f64 * delta)
        .take_while(|&s| s < end)
        .collect()
}

/// Most frequent kind in the trunk, ties to the smallest code.
fn dominant_kind(nodes: &[Node]) -> NodeKind {
    let mut counts: HashMap<NodeKind, usize> = HashMap::new();
    for n in nodes {
        *counts.entry(n.kind).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then(kb.code().cmp(&ka.code())))
        .map_or(NodeKind::Undefined, |(k, _)| k)
}

/// Position and radius of every knot the trunk is parametrized over: the
/// branch point it hangs from, when given, then its own nodes.
fn knots_of(trunk: &Trunk, branch_point: Option<&Node>) -> Vec<(Point3, f64)> {
    branch_point
        .into_iter()
        .chain(&trunk.nodes)
        .map(|n| (n.p, n.radius))
        .collect()
}

/// Rebuilds a trunk from sample points, ending at the original last node
/// (id kept). A free trunk also keeps its first node. An attached trunk
/// starts at its first sample instead, linked to the branch point, since
/// its first node is interior to the path from that branch point.
fn rebuild(
    trunk: &Trunk,
    attached: bool,
    samples: Vec<(Point3, f64)>,
    next_id: &mut NodeId,
) -> Trunk {
    let (Some(first), Some(last)) = (trunk.first(), trunk.last()) else {
        return trunk.clone();
    };
    let kind = dominant_kind(&trunk.nodes);

    let mut nodes = Vec::with_capacity(samples.len() + 2);
    let mut prev = if attached {
        first.parent
    } else {
        nodes.push(*first);
        Some(first.id)
    };
    for (p, radius) in samples {
        nodes.push(Node::new(*next_id, kind, p, radius, prev));
        prev = Some(*next_id);
        *next_id += 1;
    }
    nodes.push(Node {
        parent: prev,
        ..*last
    });

    Trunk {
        id: trunk.id,
        nodes,
        attachment: trunk.attachment,
    }
}

/// Resamples one trunk at arc-length step `delta` with piecewise-linear
/// interpolation of position and radius. Interior nodes get ids from
/// `next_id` onwards.
///
/// With `branch_point` set, arc length is measured from that node (the
/// parent of the trunk's first node), so the edge into the trunk is
/// resampled too. The branch point itself is never emitted.
pub fn resample_trunk_linear(
    trunk: &Trunk,
    branch_point: Option<&Node>,
    delta: f64,
    next_id: &mut NodeId,
) -> Result<Trunk, Error> {
    check_delta(delta)?;
    let knots = knots_of(trunk, branch_point);
    if knots.len() < 2 {
        return Ok(trunk.clone());
    }

    let points: Vec<Point3> = knots.iter().map(|&(p, _)| p).collect();
    let s = arc_lengths(&points);
    let length = s.last().copied().unwrap_or(0.0);

    let samples = interior_stations(length, delta)
        .into_iter()
        .map(|at| {
            let hi = s.partition_point(|&k| k <= at).clamp(1, s.len() - 1);
            let lo = hi - 1;
            let h = s[hi] - s[lo];
            let t = if h > 0.0 { (at - s[lo]) / h } else { 0.0 };
            let ((pa, ra), (pb, rb)) = (knots[lo], knots[hi]);
            (pa.lerp(pb, t), ra + (rb - ra) * t)
        })
        .collect();

    Ok(rebuild(trunk, branch_point.is_some(), samples, next_id))
}

/// Like [`resample_trunk_linear`] but along natural cubic splines of x, y, z
/// and radius over arc length. Radii are clamped to the range seen along
/// the knots. Fewer than four distinct knots fall back to linear.
pub fn resample_trunk_cubic(
    trunk: &Trunk,
    branch_point: Option<&Node>,
    delta: f64,
    next_id: &mut NodeId,
) -> Result<Trunk, Error> {
    check_delta(delta)?;
    let knots = knots_of(trunk, branch_point);
    let points: Vec<Point3> = knots.iter().map(|&(p, _)| p).collect();
    let arc = arc_lengths(&points);

    // Zero-length steps would give repeated knots.
    let mut t = Vec::with_capacity(arc.len());
    let mut kept: Vec<(Point3, f64)> = Vec::with_capacity(arc.len());
    for (&k, &knot) in arc.iter().zip(&knots) {
        if t.last().is_none_or(|&prev| k > prev) {
            t.push(k);
            kept.push(knot);
        }
    }
    if kept.len() < MIN_CUBIC_KNOTS {
        return resample_trunk_linear(trunk, branch_point, delta, next_id);
    }

    let fit = |f: fn(&(Point3, f64)) -> f64| {
        let y: Vec<f64> = kept.iter().map(f).collect();
        CubicSpline::natural(&t, &y)
    };
    let sx = fit(|(p, _)| p.x)?;
    let sy = fit(|(p, _)| p.y)?;
    let sz = fit(|(p, _)| p.z)?;
    let sr = fit(|&(_, r)| r)?;

    let (r_min, r_max) = knots
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, r)| {
            (lo.min(r), hi.max(r))
        });

    let length = t.last().copied().unwrap_or(0.0);
    let samples = interior_stations(length, delta)
        .into_iter()
        .map(|s| {
            let p = Point3::new(sx.eval(s), sy.eval(s), sz.eval(s));
            (p, sr.eval(s).clamp(r_min, r_max))
        })
        .collect();

    Ok(rebuild(trunk, branch_point.is_some(), samples, next_id))
}

fn first_free_id(trunks: &[Trunk]) -> NodeId {
    trunks
        .iter()
        .filter_map(Trunk::max_id)
        .max()
        .map_or(1, |m| m + 1)
}

type ResampleOne = fn(&Trunk, Option<&Node>, f64, &mut NodeId) -> Result<Trunk, Error>;

fn resample_all(trunks: &[Trunk], delta: f64, one: ResampleOne) -> Result<Vec<Trunk>, Error> {
    check_delta(delta)?;
    let by_id: HashMap<NodeId, &Node> = trunks
        .iter()
        .flat_map(|t| &t.nodes)
        .map(|n| (n.id, n))
        .collect();

    let mut next_id = first_free_id(trunks);
    let out = trunks
        .iter()
        .map(|t| {
            let branch_point = t
                .first()
                .and_then(|n| n.parent)
                .and_then(|p| by_id.get(&p).copied());
            one(t, branch_point, delta, &mut next_id)
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        trunks = trunks.len(),
        before = trunks.iter().map(Trunk::len).sum::<usize>(),
        after = out.iter().map(Trunk::len).sum::<usize>(),
        delta,
        "resampled trunks"
    );
    Ok(out)
}

/// Linear resampling of every trunk. A trunk whose first node hangs off a
/// node of another trunk in the set is measured from that branch point.
/// Fresh interior ids start above the largest id in the whole set, so
/// trunks never collide.
pub fn resample_trunks_linear(trunks: &[Trunk], delta: f64) -> Result<Vec<Trunk>, Error> {
    resample_all(trunks, delta, resample_trunk_linear)
}

/// Cubic resampling of every trunk, with the branch point and id scheme of
/// [`resample_trunks_linear`].
pub fn resample_trunks_cubic(trunks: &[Trunk], delta: f64) -> Result<Vec<Trunk>, Error> {
    resample_all(trunks, delta, resample_trunk_cubic)
}

//! SWC text format: one node per line, `id type x y z radius parent`,
//! `#` comments, `-1` as the root parent.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use nm_core::{Error, Location, Morphology, Node, NodeKind, Point3};
use nm_topo::{is_topologically_sorted, sorted};
use tracing::info;

pub const COMMENT_MARKER: char = '#';
const NUM_FIELDS: usize = 7;

pub fn read_swc(path: impl AsRef<Path>) -> Result<Morphology, Error> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let m = parse_swc(&text, path)?;
    info!(path = %path.display(), nodes = m.len(), "read swc");
    Ok(m)
}

/// Parses SWC text. `origin` is only used to locate errors.
pub fn parse_swc(text: &str, origin: &Path) -> Result<Morphology, Error> {
    let mut m = Morphology::new();
    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
            continue;
        }

        let at = || Location::line(origin, i + 1);
        let node = parse_line(trimmed).map_err(|msg| Error::parse(at(), msg))?;
        if m.contains(node.id) {
            return Err(Error::parse(at(), format!("duplicate node id {}", node.id)));
        }
        m.push(node)?;
    }
    Ok(m)
}

fn parse_line(line: &str) -> Result<Node, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != NUM_FIELDS {
        return Err(format!(
            "expected {NUM_FIELDS} fields, got {}",
            fields.len()
        ));
    }

    let id = fields[0]
        .parse::<usize>()
        .map_err(|_| format!("invalid node id `{}`", fields[0]))?;
    let code = fields[1]
        .parse::<u32>()
        .map_err(|_| format!("invalid type `{}`", fields[1]))?;
    let x = parse_f64(fields[2], "x")?;
    let y = parse_f64(fields[3], "y")?;
    let z = parse_f64(fields[4], "z")?;
    let radius = parse_f64(fields[5], "radius")?;
    if radius < 0.0 {
        return Err(format!("negative radius {radius}"));
    }
    let parent = match fields[6].parse::<i64>() {
        Ok(-1) => None,
        Ok(p) if p >= 0 => Some(p as usize),
        _ => return Err(format!("invalid parent id `{}`", fields[6])),
    };

    Ok(Node::new(
        id,
        NodeKind::from_code(code),
        Point3::new(x, y, z),
        radius,
        parent,
    ))
}

fn parse_f64(field: &str, what: &str) -> Result<f64, String> {
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("invalid {what} `{field}`")),
    }
}

/// Writes `m` as SWC. Nodes are emitted in mapping order when that order is
/// already parent-before-child, otherwise in topologically sorted order.
pub fn write_swc(m: &Morphology, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut out = BufWriter::new(file);
    write_swc_to(m, &mut out).map_err(|e| match e {
        Error::Io { source, .. } => Error::io(path, source),
        other => other,
    })?;
    out.flush().map_err(|e| Error::io(path, e))?;
    info!(path = %path.display(), nodes = m.len(), "wrote swc");
    Ok(())
}

pub fn write_swc_to<W: Write>(m: &Morphology, out: &mut W) -> Result<(), Error> {
    let reordered;
    let m = if is_topologically_sorted(m) {
        m
    } else {
        reordered = sorted(m)?;
        &reordered
    };

    let io = |e| Error::io("<swc stream>", e);
    writeln!(out, "{COMMENT_MARKER} id type x y z radius parent").map_err(io)?;
    for n in m.iter() {
        let parent = n.parent.map_or(-1, |p| p as i64);
        writeln!(
            out,
            "{} {} {} {} {} {} {}",
            n.id,
            n.kind.code(),
            n.p.x,
            n.p.y,
            n.p.z,
            n.radius,
            parent
        )
        .map_err(io)?;
    }
    Ok(())
}

//! UGX grid format: an XML document holding vertex coordinates, undirected
//! edges, a per-vertex diameter attachment and named subsets.
//!
//! ```xml
//! <grid name="defGrid">
//!   <vertices coords="3">x0 y0 z0 x1 y1 z1 ...</vertices>
//!   <edges>0 1 1 2 ...</edges>
//!   <vertex_attachment name="diameter" type="double" passOn="0" global="1">...</vertex_attachment>
//!   <vertex_attachment name="root" type="bool" passOn="0" global="1">1 0 0 ...</vertex_attachment>
//!   <subset_handler name="defSH">
//!     <subset name="soma" color="..." state="0"><vertices>0</vertices><edges>...</edges></subset>
//!   </subset_handler>
//!   <projection_handler name="defPH" subset_handler="0">
//!     <default type="default">0 0</default>
//!   </projection_handler>
//! </grid>
//! ```
//!
//! Edges carry no direction. The reader re-orients them away from a root
//! chosen per connected component: a vertex flagged in the `root`
//! attachment, else a soma vertex, else the first vertex of degree at most
//! one. Vertex `i` becomes node id `i + 1`.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs;
use std::path::Path;

use nm_core::{Error, Location, Morphology, Node, NodeKind, Point3};
use nm_topo::validate;
use quick_xml::{Reader, Writer};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::info;

const GRID_NAME: &str = "defGrid";
const ATTACHMENT_DIAMETER: &str = "diameter";
const ATTACHMENT_RADIUS: &str = "radius";
const ATTACHMENT_ROOT: &str = "root";
const DEFAULT_RADIUS: f64 = 1.0;

/// Subset name used for a node kind.
pub fn subset_name(kind: NodeKind) -> String {
    match kind {
        NodeKind::Undefined => "undefined".into(),
        NodeKind::Soma => "soma".into(),
        NodeKind::Axon => "axon".into(),
        NodeKind::BasalDendrite => "dend".into(),
        NodeKind::ApicalDendrite => "apic".into(),
        NodeKind::Fork => "fork".into(),
        NodeKind::End => "end".into(),
        NodeKind::Custom(code) => format!("custom_{code}"),
    }
}

/// Inverse of [`subset_name`]. Unknown names map to custom code 7.
pub fn kind_from_subset_name(name: &str) -> NodeKind {
    match name {
        "undefined" => NodeKind::Undefined,
        "soma" => NodeKind::Soma,
        "axon" => NodeKind::Axon,
        "dend" => NodeKind::BasalDendrite,
        "apic" => NodeKind::ApicalDendrite,
        "fork" => NodeKind::Fork,
        "end" => NodeKind::End,
        other => other
            .strip_prefix("custom_")
            .and_then(|c| c.parse::<u32>().ok())
            .map_or(NodeKind::from_code(7), NodeKind::from_code),
    }
}

pub fn read_ugx(path: impl AsRef<Path>) -> Result<Morphology, Error> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let m = parse_ugx(&text, path)?;
    info!(path = %path.display(), nodes = m.len(), "read ugx");
    Ok(m)
}

pub fn write_ugx(m: &Morphology, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    let text = render_ugx(m)?;
    fs::write(path, text).map_err(|e| Error::io(path, e))?;
    info!(path = %path.display(), nodes = m.len(), "wrote ugx");
    Ok(())
}

// ---------------------------------------------------------------------------
// reading

#[derive(Debug)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
}

impl Element {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw grid sections, collected before any interpretation.
#[derive(Debug, Default)]
struct RawGrid {
    seen: bool,
    coords_dim: usize,
    coords: String,
    edges: String,
    attachments: Vec<(String, String)>,
    subsets: Vec<(String, String)>,
}

/// Parses UGX text. `origin` is only used to locate errors.
pub fn parse_ugx(text: &str, origin: &Path) -> Result<Morphology, Error> {
    let raw = scan(text, origin)?;
    build(raw, origin)
}

fn scan(text: &str, origin: &Path) -> Result<RawGrid, Error> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut raw = RawGrid {
        coords_dim: 3,
        ..RawGrid::default()
    };

    let at = |pos: usize| {
        let pos = pos.min(text.len());
        let line = text.as_bytes()[..pos].iter().filter(|&&b| b == b'\n').count() + 1;
        Location::line(origin, line)
    };

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                return Err(Error::parse(
                    at(reader.error_position() as usize),
                    format!("malformed xml: {e}"),
                ));
            }
        };
        let pos = reader.buffer_position() as usize;
        match event {
            Event::Start(e) => stack.push(open(&e).map_err(|msg| Error::parse(at(pos), msg))?),
            Event::Empty(e) => {
                let el = open(&e).map_err(|msg| Error::parse(at(pos), msg))?;
                close(el, &stack, &mut raw);
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let s = t
                        .unescape()
                        .map_err(|e| Error::parse(at(pos), format!("bad text: {e}")))?;
                    top.text.push_str(&s);
                }
            }
            Event::End(_) => {
                let Some(el) = stack.pop() else {
                    return Err(Error::parse(at(pos), "unbalanced closing tag"));
                };
                close(el, &stack, &mut raw);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(el) = stack.last() {
        return Err(Error::parse(
            Location::file(origin),
            format!("unclosed element <{}>", el.name),
        ));
    }
    if !raw.seen {
        return Err(Error::parse(Location::file(origin), "missing <grid> element"));
    }
    Ok(raw)
}

fn open(e: &BytesStart<'_>) -> Result<Element, String> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| format!("bad attribute on <{name}>: {err}"))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| format!("bad attribute value on <{name}>: {err}"))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        text: String::new(),
    })
}

fn close(el: Element, stack: &[Element], raw: &mut RawGrid) {
    let parent = stack.last();
    let parent_name = parent.map(|p| p.name.as_str());
    match (el.name.as_str(), parent_name) {
        ("grid", _) => raw.seen = true,
        ("vertices", Some("grid")) => {
            if let Some(dim) = el.attr("coords").and_then(|c| c.trim().parse().ok()) {
                raw.coords_dim = dim;
            }
            raw.coords = el.text;
        }
        ("edges", Some("grid")) => raw.edges = el.text,
        ("vertex_attachment", Some("grid")) => {
            let name = el.attr("name").unwrap_or_default().to_owned();
            raw.attachments.push((name, el.text));
        }
        ("vertices", Some("subset")) => {
            let name = parent
                .and_then(|p| p.attr("name"))
                .unwrap_or_default()
                .to_owned();
            raw.subsets.push((name, el.text));
        }
        _ => {}
    }
}

fn numbers<T: std::str::FromStr>(text: &str, what: &str, origin: &Path) -> Result<Vec<T>, Error> {
    text.split_whitespace()
        .map(|tok| {
            tok.parse::<T>().map_err(|_| {
                Error::parse(Location::file(origin), format!("invalid {what} value `{tok}`"))
            })
        })
        .collect()
}

fn build(raw: RawGrid, origin: &Path) -> Result<Morphology, Error> {
    let fail = |msg: String| Error::parse(Location::file(origin), msg);

    let dim = raw.coords_dim;
    if !(1..=3).contains(&dim) {
        return Err(fail(format!("unsupported coordinate dimension {dim}")));
    }
    let coords: Vec<f64> = numbers(&raw.coords, "coordinate", origin)?;
    if coords.len() % dim != 0 {
        return Err(fail(format!(
            "{} coordinates do not split into {dim}-d vertices",
            coords.len()
        )));
    }
    let n = coords.len() / dim;
    let points: Vec<Point3> = coords
        .chunks(dim)
        .map(|c| {
            Point3::new(
                c[0],
                c.get(1).copied().unwrap_or(0.0),
                c.get(2).copied().unwrap_or(0.0),
            )
        })
        .collect();

    let mut radii = vec![DEFAULT_RADIUS; n];
    let mut marked = vec![false; n];
    for (name, text) in &raw.attachments {
        match name.as_str() {
            ATTACHMENT_DIAMETER | ATTACHMENT_RADIUS => {
                let values: Vec<f64> = numbers(text, name, origin)?;
                if values.len() != n {
                    return Err(fail(format!(
                        "{name} attachment has {} values for {n} vertices",
                        values.len()
                    )));
                }
                let scale = if name == ATTACHMENT_DIAMETER { 0.5 } else { 1.0 };
                for (r, v) in radii.iter_mut().zip(values) {
                    *r = v * scale;
                }
            }
            ATTACHMENT_ROOT => {
                let values: Vec<u8> = numbers(text, name, origin)?;
                if values.len() != n {
                    return Err(fail(format!(
                        "root attachment has {} values for {n} vertices",
                        values.len()
                    )));
                }
                for (flag, v) in marked.iter_mut().zip(values) {
                    *flag = v != 0;
                }
            }
            _ => {}
        }
    }

    let mut kinds = vec![NodeKind::Undefined; n];
    for (name, text) in &raw.subsets {
        let kind = kind_from_subset_name(name);
        for v in numbers::<usize>(text, "subset vertex", origin)? {
            let slot = kinds
                .get_mut(v)
                .ok_or_else(|| fail(format!("subset `{name}` references undefined vertex {v}")))?;
            *slot = kind;
        }
    }

    let flat: Vec<usize> = numbers(&raw.edges, "edge", origin)?;
    if flat.len() % 2 != 0 {
        return Err(fail("edge list has an odd number of indices".into()));
    }
    let mut adjacency: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
    for (e, pair) in flat.chunks(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        if a >= n || b >= n {
            return Err(fail(format!("edge {e} references undefined vertex")));
        }
        adjacency[a].push((b, e));
        if a != b {
            adjacency[b].push((a, e));
        }
    }

    let parents = orient(&adjacency, &marked, &kinds).map_err(fail)?;

    let nodes = (0..n)
        .map(|i| Node::new(i + 1, kinds[i], points[i], radii[i], parents[i].map(|p| p + 1)))
        .collect();
    Morphology::from_nodes(nodes)
}

/// Directs every edge away from a per-component root. Fails on cycles,
/// repeated edges and self loops.
fn orient(
    adjacency: &[Vec<(usize, usize)>],
    marked: &[bool],
    kinds: &[NodeKind],
) -> Result<Vec<Option<usize>>, String> {
    let n = adjacency.len();
    let candidates = (0..n)
        .filter(|&v| marked[v])
        .chain((0..n).filter(|&v| kinds[v].is_soma()))
        .chain((0..n).filter(|&v| adjacency[v].len() <= 1));

    let mut visited = vec![false; n];
    let mut parent: Vec<Option<usize>> = vec![None; n];
    let mut via: Vec<Option<usize>> = vec![None; n];
    let mut queue = VecDeque::new();

    for root in candidates {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        queue.push_back(root);
        while let Some(v) = queue.pop_front() {
            for &(w, e) in &adjacency[v] {
                if via[v] == Some(e) {
                    continue;
                }
                if visited[w] {
                    return Err(format!("edges form a cycle through vertex {w}"));
                }
                visited[w] = true;
                parent[w] = Some(v);
                via[w] = Some(e);
                queue.push_back(w);
            }
        }
    }

    match visited.iter().position(|&seen| !seen) {
        Some(v) => Err(format!("edges form a cycle through vertex {v}")),
        None => Ok(parent),
    }
}

// ---------------------------------------------------------------------------
// writing

fn join<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn xml_error(e: impl std::fmt::Display) -> Error {
    Error::io(
        "<ugx buffer>",
        std::io::Error::other(e.to_string()),
    )
}

/// Renders `m` as a UGX document. Vertex `i` is the `i`-th node in mapping
/// order; roots are flagged in the `root` attachment so direction survives a
/// round trip.
pub fn render_ugx(m: &Morphology) -> Result<String, Error> {
    validate(m)?;

    let slot: HashMap<_, _> = m.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
    let mut edges: Vec<(usize, usize)> = Vec::with_capacity(m.num_edges());
    // kind -> (vertex indices, edge indices)
    let mut subsets: BTreeMap<NodeKind, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
    for (i, n) in m.iter().enumerate() {
        let entry = subsets.entry(n.kind).or_default();
        entry.0.push(i);
        if let Some(&p) = n.parent.and_then(|p| slot.get(&p)) {
            entry.1.push(edges.len());
            edges.push((p, i));
        }
    }

    let coords = join(m.iter().flat_map(|n| [n.p.x, n.p.y, n.p.z]));
    let edge_text = join(edges.iter().flat_map(|&(a, b)| [a, b]));
    let diameters = join(m.iter().map(|n| 2.0 * n.radius));
    let roots = join(m.iter().map(|n| u8::from(n.is_root())));

    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(xml_error)?;
    w.write_event(Event::Start(
        BytesStart::new("grid").with_attributes([("name", GRID_NAME)]),
    ))
    .map_err(xml_error)?;

    w.create_element("vertices")
        .with_attribute(("coords", "3"))
        .write_text_content(BytesText::new(&coords))
        .map_err(xml_error)?;
    w.create_element("edges")
        .write_text_content(BytesText::new(&edge_text))
        .map_err(xml_error)?;
    for (name, kind, text) in [
        (ATTACHMENT_DIAMETER, "double", &diameters),
        (ATTACHMENT_ROOT, "bool", &roots),
    ] {
        w.create_element("vertex_attachment")
            .with_attributes([
                ("name", name),
                ("type", kind),
                ("passOn", "0"),
                ("global", "1"),
            ])
            .write_text_content(BytesText::new(text))
            .map_err(xml_error)?;
    }

    w.write_event(Event::Start(
        BytesStart::new("subset_handler").with_attributes([("name", "defSH")]),
    ))
    .map_err(xml_error)?;
    for (i, (kind, (vertices, edge_ids))) in subsets.iter().enumerate() {
        let name = subset_name(*kind);
        let color = subset_color(i);
        w.write_event(Event::Start(BytesStart::new("subset").with_attributes([
            ("name", name.as_str()),
            ("color", color.as_str()),
            ("state", "0"),
        ])))
        .map_err(xml_error)?;
        w.create_element("vertices")
            .write_text_content(BytesText::new(&join(vertices.iter())))
            .map_err(xml_error)?;
        if !edge_ids.is_empty() {
            w.create_element("edges")
                .write_text_content(BytesText::new(&join(edge_ids.iter())))
                .map_err(xml_error)?;
        }
        w.write_event(Event::End(BytesEnd::new("subset")))
            .map_err(xml_error)?;
    }
    w.write_event(Event::End(BytesEnd::new("subset_handler")))
        .map_err(xml_error)?;

    w.write_event(Event::Start(BytesStart::new("projection_handler").with_attributes([
        ("name", "defPH"),
        ("subset_handler", "0"),
    ])))
    .map_err(xml_error)?;
    w.create_element("default")
        .with_attribute(("type", "default"))
        .write_text_content(BytesText::new("0 0"))
        .map_err(xml_error)?;
    w.write_event(Event::End(BytesEnd::new("projection_handler")))
        .map_err(xml_error)?;

    w.write_event(Event::End(BytesEnd::new("grid")))
        .map_err(xml_error)?;

    String::from_utf8(w.into_inner()).map_err(xml_error)
}

/// A fixed palette, cycled per subset.
fn subset_color(i: usize) -> String {
    const PALETTE: [[f32; 3]; 6] = [
        [1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.0, 1.0, 0.0],
        [1.0, 0.5, 0.0],
        [0.5, 0.0, 1.0],
        [0.0, 1.0, 1.0],
    ];
    let [r, g, b] = PALETTE[i % PALETTE.len()];
    format!("{r} {g} {b} 1")
}

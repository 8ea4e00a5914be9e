use std::collections::HashSet;

use nm_core::{Error, Morphology};
use tracing::debug;

/// True iff every node's parent, when it has one, appears earlier in
/// mapping order. A parent that is missing altogether counts as a violation.
pub fn is_topologically_sorted(m: &Morphology) -> bool {
    let mut seen = HashSet::with_capacity(m.len());
    for n in m.iter() {
        if let Some(p) = n.parent
            && !seen.contains(&p)
        {
            return false;
        }
        seen.insert(n.id);
    }
    true
}

/// Parent-before-child visiting order as positions into `m.nodes()`.
///
/// Depth-first preorder from each root in mapping order; siblings keep their
/// relative mapping order. Fails on the first dangling parent, or with
/// [`Error::Cycle`] naming the first node no root can reach.
pub fn topological_order(m: &Morphology) -> Result<Vec<usize>, Error> {
    let nodes = m.nodes();
    let mut kids = vec![Vec::new(); nodes.len()];
    let mut roots = Vec::new();

    for (i, n) in nodes.iter().enumerate() {
        match n.parent {
            None => roots.push(i),
            Some(p) => {
                let Some(pi) = m.position(p) else {
                    return Err(Error::DanglingReference {
                        node: n.id,
                        parent: p,
                    });
                };
                kids[pi].push(i);
            }
        }
    }

    let mut order = Vec::with_capacity(nodes.len());
    let mut visited = vec![false; nodes.len()];
    let mut stack = Vec::new();
    for &r in &roots {
        stack.push(r);
        while let Some(i) = stack.pop() {
            if visited[i] {
                return Err(Error::Cycle { node: nodes[i].id });
            }
            visited[i] = true;
            order.push(i);
            stack.extend(kids[i].iter().rev());
        }
    }

    if let Some(i) = visited.iter().position(|v| !v) {
        return Err(Error::Cycle { node: nodes[i].id });
    }

    Ok(order)
}

/// Reorders `m` in place into depth-first parent-before-child order.
pub fn topological_sort(m: &mut Morphology) -> Result<(), Error> {
    let sorted = sorted(m)?;
    *m = sorted;
    Ok(())
}

/// Sorted copy of `m`; see [`topological_sort`].
pub fn sorted(m: &Morphology) -> Result<Morphology, Error> {
    let order = topological_order(m)?;
    let nodes = m.nodes();
    let reordered = order.into_iter().map(|i| nodes[i]).collect();
    debug!(nodes = m.len(), "topological sort");
    Morphology::from_nodes(reordered)
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Execution ordering and neighbour queries over a snapshot of nodes and edges.
//!
//! The solver is generic over the node key so it can run on any id type; the
//! graph feeds it `(source, target)` node pairs derived from committed edges.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

/// Topological order via Kahn's algorithm.
///
/// Self-loops and edges touching nodes outside `nodes` are ignored. Ties are
/// broken by position in `nodes`. Returns `None` when a cycle prevents every
/// node from being drained.
pub fn compute_order<N>(nodes: &[N], edges: &[(N, N)]) -> Option<Vec<N>>
where
    N: Clone + Eq + Hash,
{
    let index: HashMap<&N, usize> = nodes.iter().enumerate().map(|(i, n)| (n, i)).collect();
    let mut in_degree = vec![0usize; nodes.len()];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

    for (from, to) in edges {
        if from == to {
            continue;
        }
        let (Some(&a), Some(&b)) = (index.get(from), index.get(to)) else {
            continue;
        };
        successors[a].push(b);
        in_degree[b] += 1;
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(current) = queue.pop_front() {
        order.push(nodes[current].clone());
        for &next in &successors[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    (order.len() == nodes.len()).then_some(order)
}

/// Whether no complete order exists
pub fn has_cycles<N>(nodes: &[N], edges: &[(N, N)]) -> bool
where
    N: Clone + Eq + Hash,
{
    compute_order(nodes, edges).is_none()
}

/// Nodes with an edge directly into `node`, in first-seen order
pub fn upstream_of<N>(node: &N, edges: &[(N, N)]) -> Vec<N>
where
    N: Clone + Eq + Hash,
{
    neighbours(edges.iter().filter(|(_, to)| to == node).map(|(from, _)| from))
}

/// Nodes with an edge directly out of `node`, in first-seen order
pub fn downstream_of<N>(node: &N, edges: &[(N, N)]) -> Vec<N>
where
    N: Clone + Eq + Hash,
{
    neighbours(edges.iter().filter(|(from, _)| from == node).map(|(_, to)| to))
}

fn neighbours<'a, N>(iter: impl Iterator<Item = &'a N>) -> Vec<N>
where
    N: Clone + Eq + Hash + 'a,
{
    let mut seen = HashSet::new();
    iter.filter(|n| seen.insert(*n)).cloned().collect()
}

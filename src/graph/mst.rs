use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::graph::{Edge, Graph, Weight};

/// Disjoint sets with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = x;
        while self.parent[current] != root {
            current = std::mem::replace(&mut self.parent[current], root);
        }
        root
    }

    /// Merge the sets holding `a` and `b`. Returns `false` if they were already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (a, b) = (self.find(a), self.find(b));
        if a == b {
            return false;
        }
        match self.rank[a].cmp(&self.rank[b]) {
            std::cmp::Ordering::Less => self.parent[a] = b,
            std::cmp::Ordering::Greater => self.parent[b] = a,
            std::cmp::Ordering::Equal => {
                self.parent[b] = a;
                self.rank[a] += 1;
            }
        }
        true
    }
}

/// Minimum spanning tree algorithms understood by the `algo` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    Prim,
    Kruskal,
    Boruvka,
    Tarjan,
    IntegerMst,
}

impl Algorithm {
    pub const ALL: [Algorithm; 5] = [
        Algorithm::Prim,
        Algorithm::Kruskal,
        Algorithm::Boruvka,
        Algorithm::Tarjan,
        Algorithm::IntegerMst,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Prim => "prim",
            Algorithm::Kruskal => "kruskal",
            Algorithm::Boruvka => "boruvka",
            Algorithm::Tarjan => "tarjan",
            Algorithm::IntegerMst => "integer_mst",
        }
    }

    /// Compute the minimum spanning tree of `graph`.
    ///
    /// The tree has the same vertex count as `graph`. A disconnected or empty
    /// graph has no spanning tree and yields an empty graph.
    pub fn solve(&self, graph: &Graph) -> Graph {
        if graph.is_empty() {
            return Graph::new(0);
        }
        let tree = match self {
            Algorithm::Prim => prim(graph),
            Algorithm::Kruskal => kruskal(graph),
            Algorithm::Boruvka => boruvka(graph),
            Algorithm::Tarjan => tarjan(graph),
            Algorithm::IntegerMst => integer_mst(graph),
        };
        tracing::trace!(
            algorithm = %self,
            vertices = graph.vertex_count(),
            tree_edges = tree.as_ref().map_or(0, Vec::len),
            "Solved MST"
        );
        tree.map_or_else(|| Graph::new(0), |edges| build_tree(graph.vertex_count(), edges))
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|algorithm| algorithm.name() == s)
            .ok_or_else(|| Error::UnknownAlgorithm(s.to_string()))
    }
}

fn build_tree(vertices: usize, edges: Vec<Edge>) -> Graph {
    let mut tree = Graph::new(vertices);
    for edge in edges {
        // Endpoints come from a valid graph and tree edges never repeat.
        let _ = tree.add_edge(edge.u, edge.v, edge.weight);
    }
    tree
}

/// Accept edges in the given order while they join two components. `None` if
/// the result does not span every vertex.
fn greedy(vertices: usize, ordered: impl IntoIterator<Item = Edge>) -> Option<Vec<Edge>> {
    let mut sets = UnionFind::new(vertices);
    let mut tree = Vec::with_capacity(vertices.saturating_sub(1));
    for edge in ordered {
        if tree.len() + 1 == vertices {
            break;
        }
        if sets.union(edge.u, edge.v) {
            tree.push(edge);
        }
    }
    (tree.len() + 1 == vertices).then_some(tree)
}

fn prim(graph: &Graph) -> Option<Vec<Edge>> {
    let n = graph.vertex_count();
    let mut in_tree = vec![false; n];
    let mut best: Vec<Option<(Weight, usize)>> = vec![None; n];
    let mut heap = BinaryHeap::new();
    heap.push(Reverse((0, 0)));

    let mut tree = Vec::with_capacity(n - 1);
    while let Some(Reverse((_, u))) = heap.pop() {
        if in_tree[u] {
            continue;
        }
        in_tree[u] = true;
        if let Some((weight, parent)) = best[u] {
            tree.push(Edge::new(parent.min(u), parent.max(u), weight));
        }

        for &(v, weight) in graph.neighbors(u) {
            if in_tree[v] || best[v].is_some_and(|(current, _)| current <= weight) {
                continue;
            }
            best[v] = Some((weight, u));
            heap.push(Reverse((weight, v)));
        }
    }

    (tree.len() + 1 == n).then_some(tree)
}

fn kruskal(graph: &Graph) -> Option<Vec<Edge>> {
    let mut edges = graph.edges();
    edges.sort_unstable_by_key(Edge::key);
    greedy(graph.vertex_count(), edges)
}

fn boruvka(graph: &Graph) -> Option<Vec<Edge>> {
    let n = graph.vertex_count();
    let edges = graph.edges();
    let mut sets = UnionFind::new(n);
    let mut components = n;
    let mut tree = Vec::with_capacity(n - 1);

    while components > 1 {
        let mut cheapest: Vec<Option<Edge>> = vec![None; n];
        for edge in &edges {
            let (a, b) = (sets.find(edge.u), sets.find(edge.v));
            if a == b {
                continue;
            }
            for root in [a, b] {
                if cheapest[root].map_or(true, |current| edge.key() < current.key()) {
                    cheapest[root] = Some(*edge);
                }
            }
        }

        let before = components;
        for edge in cheapest.into_iter().flatten() {
            if sets.union(edge.u, edge.v) {
                tree.push(edge);
                components -= 1;
            }
        }
        if components == before {
            return None;
        }
    }

    Some(tree)
}

/// Greedy extraction of the lightest remaining edge from a min-heap.
fn tarjan(graph: &Graph) -> Option<Vec<Edge>> {
    let mut heap = graph
        .edges()
        .into_iter()
        .map(|edge| Reverse(edge.key()))
        .collect::<BinaryHeap<_>>();
    greedy(
        graph.vertex_count(),
        std::iter::from_fn(|| heap.pop().map(|Reverse((weight, u, v))| Edge::new(u, v, weight))),
    )
}

/// Kruskal over a linear-time byte-wise radix sort of the integer weights.
fn integer_mst(graph: &Graph) -> Option<Vec<Edge>> {
    let mut edges = graph.edges();
    radix_sort_by_weight(&mut edges);
    greedy(graph.vertex_count(), edges)
}

/// Stable LSD radix sort on the weight, one byte per pass. Passes where every
/// key shares the same byte are skipped.
fn radix_sort_by_weight(edges: &mut Vec<Edge>) {
    // Flipping the sign bit maps i64 order onto u64 order.
    let key = |edge: &Edge| (edge.weight as u64) ^ (1 << 63);

    let mut src = std::mem::take(edges);
    let mut dst = src.clone();
    for pass in 0..8 {
        let shift = pass * 8;
        let mut counts = [0usize; 256];
        for edge in &src {
            counts[((key(edge) >> shift) & 0xFF) as usize] += 1;
        }
        if counts.iter().any(|&count| count == src.len()) {
            continue;
        }

        let mut total = 0;
        for count in counts.iter_mut() {
            let c = *count;
            *count = total;
            total += c;
        }
        for edge in &src {
            let byte = ((key(edge) >> shift) & 0xFF) as usize;
            dst[counts[byte]] = *edge;
            counts[byte] += 1;
        }
        std::mem::swap(&mut src, &mut dst);
    }
    *edges = src;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Graph {
        let mut graph = Graph::new(5);
        for (u, v, w) in [
            (0, 1, 2),
            (0, 3, 6),
            (1, 2, 3),
            (1, 3, 8),
            (1, 4, 5),
            (2, 4, 7),
            (3, 4, 9),
        ] {
            graph.add_edge(u, v, w).unwrap();
        }
        graph
    }

    #[test]
    fn test_union_find() {
        let mut sets = UnionFind::new(4);
        assert!(sets.union(0, 1));
        assert!(sets.union(2, 3));
        assert!(!sets.union(1, 0));
        assert_ne!(sets.find(0), sets.find(2));
        assert!(sets.union(1, 3));
        assert_eq!(sets.find(0), sets.find(2));
    }

    #[test]
    fn test_algorithms_agree_on_weight() {
        let graph = sample();
        for algorithm in Algorithm::ALL {
            let tree = algorithm.solve(&graph);
            assert_eq!(tree.vertex_count(), 5, "{algorithm}");
            assert_eq!(tree.edge_count(), 4, "{algorithm}");
            assert_eq!(tree.total_weight(), 16, "{algorithm}");
        }
    }

    #[test]
    fn test_negative_weights() {
        let mut graph = Graph::new(3);
        graph.add_edge(0, 1, -4).unwrap();
        graph.add_edge(1, 2, 300).unwrap();
        graph.add_edge(0, 2, -700).unwrap();
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.solve(&graph).total_weight(), -704, "{algorithm}");
        }
    }

    #[test]
    fn test_disconnected_graph_has_no_tree() {
        let mut graph = Graph::new(4);
        graph.add_edge(0, 1, 1).unwrap();
        graph.add_edge(2, 3, 1).unwrap();
        for algorithm in Algorithm::ALL {
            assert!(algorithm.solve(&graph).is_empty(), "{algorithm}");
        }
    }

    #[test]
    fn test_trivial_graphs() {
        for algorithm in Algorithm::ALL {
            assert!(algorithm.solve(&Graph::new(0)).is_empty());

            let single = algorithm.solve(&Graph::new(1));
            assert_eq!(single.vertex_count(), 1);
            assert_eq!(single.edge_count(), 0);
        }
    }

    #[test]
    fn test_radix_sort_orders_weights() {
        let mut edges = [9, -3, 1 << 40, 0, -(1 << 33), 7, 7]
            .into_iter()
            .enumerate()
            .map(|(i, w)| Edge::new(i, i + 1, w))
            .collect::<Vec<_>>();
        radix_sort_by_weight(&mut edges);
        let weights = edges.iter().map(|e| e.weight).collect::<Vec<_>>();
        assert_eq!(weights, vec![-(1 << 33), -3, 0, 7, 7, 9, 1 << 40]);
        // Stable for equal keys.
        assert_eq!((edges[3].u, edges[4].u), (5, 6));
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("integer_mst".parse::<Algorithm>().unwrap(), Algorithm::IntegerMst);
        assert_eq!(Algorithm::Boruvka.to_string(), "boruvka");
        assert!(matches!(
            "dijkstra".parse::<Algorithm>(),
            Err(Error::UnknownAlgorithm(name)) if name == "dijkstra"
        ));
    }
}

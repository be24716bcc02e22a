use std::fmt::{self, Display, Write};

use crate::graph::{Algorithm, Edge, Graph, Weight, WeightSum};

const INDENT: usize = 15;

/// Parts of the analysis report, in the order they are assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Graph and tree listings, algorithm and total weight.
    Overview,
    Distances,
    Paths,
    /// Extreme edges and the closing rule.
    Edges,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Overview,
        Section::Distances,
        Section::Paths,
        Section::Edges,
    ];
}

/// A weighted walk through the tree, rendered as `a --(w)--> b --(w)--> c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedPath {
    /// Each vertex paired with the weight of the edge leaving it.
    pub steps: Vec<(usize, Weight)>,
    pub end: usize,
}

impl WeightedPath {
    pub fn weight(&self) -> WeightSum {
        self.steps.iter().map(|&(_, w)| WeightSum::from(w)).sum()
    }
}

impl Display for WeightedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (vertex, weight) in &self.steps {
            write!(f, "{vertex} --({weight})--> ")?;
        }
        write!(f, "{}", self.end)
    }
}

struct Walk {
    parent: Vec<Option<usize>>,
    distance: Vec<WeightSum>,
    farthest: usize,
}

impl Walk {
    /// Vertices from `start` to `to`, following parent links back.
    fn path_to(&self, to: usize) -> Vec<usize> {
        let mut path = vec![to];
        let mut current = to;
        while let Some(parent) = self.parent[current] {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }
}

/// A graph together with its minimum spanning tree and the metrics reported
/// to clients.
#[derive(Debug, Clone)]
pub struct MstAnalysis {
    graph: Graph,
    tree: Graph,
    algorithm: Algorithm,
}

impl MstAnalysis {
    pub fn new(graph: Graph, algorithm: Algorithm) -> Self {
        let tree = algorithm.solve(&graph);
        Self {
            graph,
            tree,
            algorithm,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn tree(&self) -> &Graph {
        &self.tree
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn total_weight(&self) -> WeightSum {
        self.tree.total_weight()
    }

    /// Depth-first walk of the tree from `start`, accumulating `cost` per edge.
    /// Children are visited in adjacency order. `farthest` is the first vertex
    /// reaching the strictly greatest distance.
    fn walk(&self, start: usize, cost: impl Fn(Weight) -> WeightSum) -> Walk {
        let n = self.tree.vertex_count();
        let mut walk = Walk {
            parent: vec![None; n],
            distance: vec![0; n],
            farthest: start,
        };
        let mut visited = vec![false; n];
        let mut best = 0;
        let mut stack = vec![start];
        visited[start] = true;

        while let Some(u) = stack.pop() {
            if walk.distance[u] > best {
                best = walk.distance[u];
                walk.farthest = u;
            }
            for &(v, weight) in self.tree.neighbors(u).iter().rev() {
                if !visited[v] {
                    visited[v] = true;
                    walk.parent[v] = Some(u);
                    walk.distance[v] = walk.distance[u] + cost(weight);
                    stack.push(v);
                }
            }
        }
        walk
    }

    /// Mean tree distance over all unordered vertex pairs, 0 without pairs.
    pub fn average_distance(&self) -> f64 {
        let n = self.tree.vertex_count();
        let pairs = n * n.saturating_sub(1) / 2;
        if pairs == 0 {
            return 0.0;
        }

        let total: WeightSum = (0..n)
            .map(|i| {
                let walk = self.walk(i, WeightSum::from);
                walk.distance[i + 1..].iter().sum::<WeightSum>()
            })
            .sum();
        total as f64 / pairs as f64
    }

    /// Deepest root-to-leaf path from vertex 0, counted in edges.
    pub fn longest_path(&self) -> Vec<usize> {
        if self.tree.is_empty() {
            return Vec::new();
        }
        let walk = self.walk(0, |_| 1);
        walk.path_to(walk.farthest)
    }

    /// Path of greatest total weight, found with two farthest-vertex sweeps.
    pub fn heaviest_path(&self) -> Option<WeightedPath> {
        if self.tree.is_empty() {
            return None;
        }
        let start = self.walk(0, WeightSum::from).farthest;
        let walk = self.walk(start, WeightSum::from);
        let path = walk.path_to(walk.farthest);

        let steps = path
            .windows(2)
            .map(|pair| {
                let weight = self.tree.weight(pair[0], pair[1]).unwrap_or_default();
                (pair[0], weight)
            })
            .collect();
        Some(WeightedPath {
            steps,
            end: walk.farthest,
        })
    }

    pub fn heaviest_edge(&self) -> Option<Edge> {
        self.tree
            .edges()
            .into_iter()
            .reduce(|best, edge| if edge.weight > best.weight { edge } else { best })
    }

    pub fn lightest_edge(&self) -> Option<Edge> {
        self.tree.edges().into_iter().min_by_key(|edge| edge.weight)
    }

    pub fn render(&self, section: Section) -> String {
        let mut out = String::new();
        match section {
            Section::Overview => {
                out.push('\n');
                render_graph(&mut out, "---------------Graph Representation--------------------", &self.graph);
                render_graph(&mut out, "---------------MST Representation----------------------", &self.tree);
                line(&mut out, "------------------MST Analysis-------------------------");
                line(&mut out, format_args!("Algorithm: {}", self.algorithm));
                line(&mut out, format_args!("Total MST weight: {:.6}", self.total_weight() as f64));
            }
            Section::Distances => {
                line(&mut out, format_args!("Average distance: {:.6}", self.average_distance()));
            }
            Section::Paths => {
                let longest = self.longest_path();
                let longest = if longest.is_empty() {
                    "none".to_string()
                } else {
                    longest.iter().map(usize::to_string).collect::<Vec<_>>().join("->")
                };
                line(&mut out, format_args!("Longest path: {longest}"));
                match self.heaviest_path() {
                    Some(path) => line(&mut out, format_args!("Heaviest path: {path}")),
                    None => line(&mut out, "Heaviest path: Empty graph"),
                }
            }
            Section::Edges => {
                line(&mut out, format_args!("Heaviest edge: {}", EdgeLabel(self.heaviest_edge())));
                line(&mut out, format_args!("Lightest edge: {}", EdgeLabel(self.lightest_edge())));
                line(&mut out, "-------------------------------------------------------");
                out.push('\n');
            }
        }
        out
    }

    /// The full report, every section in order.
    pub fn report(&self) -> String {
        Section::ALL.into_iter().map(|s| self.render(s)).collect()
    }
}

struct EdgeLabel(Option<Edge>);

impl Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(edge) => write!(f, "Vertex {} <----({})----> Vertex {}", edge.u, edge.weight, edge.v),
            None => f.write_str("none"),
        }
    }
}

fn line(out: &mut String, text: impl Display) {
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{:INDENT$}{text}", "");
}

fn render_graph(out: &mut String, title: &str, graph: &Graph) {
    line(out, title);
    let vertices = (0..graph.vertex_count()).fold(String::new(), |mut acc, v| {
        let _ = write!(acc, "{v} ");
        acc
    });
    line(out, format_args!("Vertices in the graph: {vertices}"));
    line(out, "Connections between vertices (undirected edges):");
    for edge in graph.edges() {
        line(out, EdgeLabel(Some(edge)));
    }
}

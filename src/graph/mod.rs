//! Weighted undirected graphs and their minimum spanning trees.

pub mod analysis;
pub mod mst;

pub use analysis::{MstAnalysis, Section};
pub use mst::{Algorithm, UnionFind};

use crate::error::{Error, Result};

pub type Weight = i64;

/// Sums of edge weights. Wide enough that adding up client supplied `i64`
/// weights cannot overflow.
pub type WeightSum = i128;

/// An undirected edge, stored with `u < v` when produced by [`Graph::edges`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub u: usize,
    pub v: usize,
    pub weight: Weight,
}

impl Edge {
    pub fn new(u: usize, v: usize, weight: Weight) -> Self {
        Self { u, v, weight }
    }

    /// Ordering key: weight first, endpoints to break ties deterministically.
    pub(crate) fn key(&self) -> (Weight, usize, usize) {
        (self.weight, self.u, self.v)
    }
}

/// Adjacency-list graph. Each undirected edge appears in both endpoint lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    adjacency: Vec<Vec<(usize, Weight)>>,
}

impl Graph {
    pub fn new(vertices: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); vertices],
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    fn check_vertex(&self, vertex: usize) -> Result<()> {
        if vertex < self.vertex_count() {
            Ok(())
        } else {
            Err(Error::InvalidVertex {
                vertex,
                count: self.vertex_count(),
            })
        }
    }

    /// Insert an edge, replacing the weight if `u` and `v` are already joined.
    pub fn add_edge(&mut self, u: usize, v: usize, weight: Weight) -> Result<()> {
        self.check_vertex(u)?;
        self.check_vertex(v)?;
        if u == v {
            return Err(Error::InvalidArgument("self loops are not supported"));
        }

        self.detach(u, v);
        self.adjacency[u].push((v, weight));
        self.adjacency[v].push((u, weight));
        Ok(())
    }

    /// Remove the edge between `u` and `v`. Returns whether an edge existed.
    pub fn remove_edge(&mut self, u: usize, v: usize) -> Result<bool> {
        self.check_vertex(u)?;
        self.check_vertex(v)?;
        Ok(self.detach(u, v))
    }

    fn detach(&mut self, u: usize, v: usize) -> bool {
        let before = self.adjacency[u].len();
        self.adjacency[u].retain(|&(n, _)| n != v);
        self.adjacency[v].retain(|&(n, _)| n != u);
        self.adjacency[u].len() != before
    }

    pub fn neighbors(&self, vertex: usize) -> &[(usize, Weight)] {
        &self.adjacency[vertex]
    }

    pub fn weight(&self, u: usize, v: usize) -> Option<Weight> {
        self.adjacency
            .get(u)?
            .iter()
            .find(|&&(n, _)| n == v)
            .map(|&(_, w)| w)
    }

    /// Every edge once, with `u < v`, in vertex then insertion order.
    pub fn edges(&self) -> Vec<Edge> {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(u, neighbors)| {
                neighbors
                    .iter()
                    .filter(move |&&(v, _)| u < v)
                    .map(move |&(v, weight)| Edge::new(u, v, weight))
            })
            .collect()
    }

    pub fn total_weight(&self) -> WeightSum {
        self.edges().iter().map(|e| WeightSum::from(e.weight)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_replace_edge() {
        let mut graph = Graph::new(3);
        graph.add_edge(0, 1, 3).unwrap();
        graph.add_edge(1, 2, 5).unwrap();
        graph.add_edge(1, 0, 4).unwrap();

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.weight(0, 1), Some(4));
        assert_eq!(graph.weight(1, 0), Some(4));
        assert_eq!(graph.total_weight(), 9);
    }

    #[test]
    fn test_total_weight_of_extreme_weights() {
        let mut graph = Graph::new(3);
        graph.add_edge(0, 1, Weight::MAX).unwrap();
        graph.add_edge(1, 2, Weight::MAX).unwrap();
        assert_eq!(graph.total_weight(), 2 * WeightSum::from(Weight::MAX));

        graph.add_edge(0, 2, Weight::MIN).unwrap();
        assert_eq!(graph.total_weight(), WeightSum::from(Weight::MAX) - 1);
    }

    #[test]
    fn test_remove_edge() {
        let mut graph = Graph::new(3);
        graph.add_edge(0, 1, 3).unwrap();

        assert!(graph.remove_edge(1, 0).unwrap());
        assert!(!graph.remove_edge(1, 0).unwrap());
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.neighbors(0).is_empty());
    }

    #[test]
    fn test_invalid_vertices() {
        let mut graph = Graph::new(2);
        assert!(matches!(
            graph.add_edge(0, 2, 1),
            Err(Error::InvalidVertex { vertex: 2, count: 2 })
        ));
        assert!(matches!(
            graph.remove_edge(5, 0),
            Err(Error::InvalidVertex { vertex: 5, count: 2 })
        ));
        assert!(matches!(
            graph.add_edge(1, 1, 1),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_edges_listed_once() {
        let mut graph = Graph::new(4);
        graph.add_edge(2, 0, 7).unwrap();
        graph.add_edge(0, 1, 3).unwrap();
        graph.add_edge(3, 1, 1).unwrap();

        assert_eq!(
            graph.edges(),
            vec![Edge::new(0, 2, 7), Edge::new(0, 1, 3), Edge::new(1, 3, 1)]
        );
    }
}

//! Implements a directed graph.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::Error;

pub trait Vertex: Clone {
    /// The index of this vertex.
    fn index(&self) -> usize;
}

pub trait Edge: Clone {
    /// The index of the head vertex.
    fn head(&self) -> usize;
    /// The index of the tail vertex.
    fn tail(&self) -> usize;
}

/// A directed graph.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, Default)]
#[serde(bound(
    serialize = "V: Serialize, E: Serialize",
    deserialize = "V: Deserialize<'de>, E: Deserialize<'de>"
))]
pub struct Graph<V: Vertex, E: Edge> {
    vertices: BTreeMap<usize, V>,
    // Serialized as a plain sequence: tuple map keys have no
    // representation in formats like json.
    #[serde(with = "edge_map")]
    edges: BTreeMap<(usize, usize), E>,
    successors: BTreeMap<usize, BTreeSet<usize>>,
    predecessors: BTreeMap<usize, BTreeSet<usize>>,
}

mod edge_map {
    use super::Edge;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<E, S>(
        edges: &BTreeMap<(usize, usize), E>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        E: Edge + Serialize,
        S: Serializer,
    {
        serializer.collect_seq(edges.values())
    }

    pub fn deserialize<'de, E, D>(deserializer: D) -> Result<BTreeMap<(usize, usize), E>, D::Error>
    where
        E: Edge + Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let edges = Vec::<E>::deserialize(deserializer)?;
        Ok(edges
            .into_iter()
            .map(|edge| ((edge.head(), edge.tail()), edge))
            .collect())
    }
}

impl<V, E> Graph<V, E>
where
    V: Vertex,
    E: Edge,
{
    pub fn new() -> Graph<V, E> {
        Graph {
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
            successors: BTreeMap::new(),
            predecessors: BTreeMap::new(),
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Returns true if the vertex with the given index exists in this graph
    pub fn has_vertex(&self, index: usize) -> bool {
        self.vertices.contains_key(&index)
    }

    /// Returns true if the edge with the given head and tail index exists in
    /// this graph
    pub fn has_edge(&self, head: usize, tail: usize) -> bool {
        self.edges.contains_key(&(head, tail))
    }

    /// Inserts a vertex into the graph.
    /// # Errors
    /// Error if the vertex already exists by index.
    pub fn insert_vertex(&mut self, v: V) -> Result<(), Error> {
        if self.vertices.contains_key(&v.index()) {
            return Err("duplicate vertex index".into());
        }
        self.successors.insert(v.index(), BTreeSet::new());
        self.predecessors.insert(v.index(), BTreeSet::new());
        self.vertices.insert(v.index(), v);
        Ok(())
    }

    /// Inserts an edge into the graph.
    /// # Errors
    /// Error if the edge already exists by indices, or if either vertex it
    /// connects does not exist.
    pub fn insert_edge(&mut self, edge: E) -> Result<(), Error> {
        if self.edges.contains_key(&(edge.head(), edge.tail())) {
            return Err("duplicate edge".into());
        }
        if !self.vertices.contains_key(&edge.head()) || !self.vertices.contains_key(&edge.tail()) {
            return Err(Error::GraphEdgeInvalidVertex(edge.head(), edge.tail()));
        }

        self.successors
            .get_mut(&edge.head())
            .unwrap()
            .insert(edge.tail());
        self.predecessors
            .get_mut(&edge.tail())
            .unwrap()
            .insert(edge.head());
        self.edges.insert((edge.head(), edge.tail()), edge);

        Ok(())
    }

    /// Returns the indices of all immediate successors of a vertex from the
    /// graph.
    pub fn successor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        if !self.vertices.contains_key(&index) {
            return Err(Error::GraphVertexNotFound(index));
        }

        Ok(self.successors[&index].iter().cloned().collect())
    }

    /// Returns the indices of all immediate predecessors of a vertex from the
    /// graph.
    pub fn predecessor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        if !self.vertices.contains_key(&index) {
            return Err(Error::GraphVertexNotFound(index));
        }

        Ok(self.predecessors[&index].iter().cloned().collect())
    }

    /// Computes the set of vertices reachable from the given index.
    pub fn reachable_vertices(&self, index: usize) -> Result<FxHashSet<usize>, Error> {
        if !self.has_vertex(index) {
            return Err(Error::GraphVertexNotFound(index));
        }

        let mut reachable_vertices: FxHashSet<usize> = FxHashSet::default();
        let mut queue: Vec<usize> = vec![index];

        reachable_vertices.insert(index);

        while let Some(vertex) = queue.pop() {
            self.successors
                .get(&vertex)
                .unwrap()
                .iter()
                .for_each(|&succ| {
                    if reachable_vertices.insert(succ) {
                        queue.push(succ)
                    }
                });
        }

        Ok(reachable_vertices)
    }

    /// Compute the post order of all vertices reachable from the given root.
    pub fn compute_post_order(&self, root: usize) -> Result<Vec<usize>, Error> {
        if !self.has_vertex(root) {
            return Err(Error::GraphVertexNotFound(root));
        }

        let mut visited: FxHashSet<usize> = FxHashSet::default();
        let mut order: Vec<usize> = Vec::new();

        fn dfs_walk<V: Vertex, E: Edge>(
            graph: &Graph<V, E>,
            node: usize,
            visited: &mut FxHashSet<usize>,
            order: &mut Vec<usize>,
        ) {
            visited.insert(node);
            for successor in &graph.successors[&node] {
                if !visited.contains(successor) {
                    dfs_walk(graph, *successor, visited, order);
                }
            }
            order.push(node);
        }

        dfs_walk(self, root, &mut visited, &mut order);

        Ok(order)
    }

    /// Computes the back edges of this graph, with a depth-first search
    /// rooted at the given index. A back edge is an edge whose tail is an
    /// ancestor of its head on the search stack.
    pub fn compute_back_edges(&self, root: usize) -> Result<FxHashSet<(usize, usize)>, Error> {
        if !self.has_vertex(root) {
            return Err(Error::GraphVertexNotFound(root));
        }

        let mut back_edges: FxHashSet<(usize, usize)> = FxHashSet::default();
        let mut visited: FxHashSet<usize> = FxHashSet::default();
        let mut on_stack: FxHashSet<usize> = FxHashSet::default();

        fn dfs_walk<V: Vertex, E: Edge>(
            graph: &Graph<V, E>,
            node: usize,
            visited: &mut FxHashSet<usize>,
            on_stack: &mut FxHashSet<usize>,
            back_edges: &mut FxHashSet<(usize, usize)>,
        ) {
            visited.insert(node);
            on_stack.insert(node);
            for &successor in &graph.successors[&node] {
                if on_stack.contains(&successor) {
                    back_edges.insert((node, successor));
                } else if !visited.contains(&successor) {
                    dfs_walk(graph, successor, visited, on_stack, back_edges);
                }
            }
            on_stack.remove(&node);
        }

        dfs_walk(self, root, &mut visited, &mut on_stack, &mut back_edges);

        Ok(back_edges)
    }

    /// Computes the loop headers of this graph, rooted at the given index.
    /// A loop header is the target of a back edge.
    pub fn loop_headers(&self, root: usize) -> Result<FxHashSet<usize>, Error> {
        Ok(self
            .compute_back_edges(root)?
            .into_iter()
            .map(|(_, tail)| tail)
            .collect())
    }

    /// Returns all vertices in the graph.
    pub fn vertices(&self) -> Vec<&V> {
        self.vertices.values().collect()
    }

    /// Fetches a vertex from the graph by index.
    pub fn vertex(&self, index: usize) -> Result<&V, Error> {
        self.vertices
            .get(&index)
            .ok_or(Error::GraphVertexNotFound(index))
    }

    pub fn edge(&self, head: usize, tail: usize) -> Result<&E, Error> {
        self.edges
            .get(&(head, tail))
            .ok_or(Error::GraphEdgeNotFound(head, tail))
    }

    /// Get a reference to every `Edge` in the graph.
    pub fn edges(&self) -> Vec<&E> {
        self.edges.values().collect()
    }

    /// Return all edges out for a vertex
    pub fn edges_out(&self, index: usize) -> Result<Vec<&E>, Error> {
        self.successors
            .get(&index)
            .map(|succs| {
                succs
                    .iter()
                    .map(|succ| &self.edges[&(index, *succ)])
                    .collect()
            })
            .ok_or(Error::GraphVertexNotFound(index))
    }

    /// Return all edges in for a vertex
    pub fn edges_in(&self, index: usize) -> Result<Vec<&E>, Error> {
        self.predecessors
            .get(&index)
            .map(|preds| {
                preds
                    .iter()
                    .map(|pred| &self.edges[&(*pred, index)])
                    .collect()
            })
            .ok_or(Error::GraphVertexNotFound(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
    struct TestVertex(usize);

    impl Vertex for TestVertex {
        fn index(&self) -> usize {
            self.0
        }
    }

    #[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
    struct TestEdge(usize, usize);

    impl Edge for TestEdge {
        fn head(&self) -> usize {
            self.0
        }
        fn tail(&self) -> usize {
            self.1
        }
    }

    fn graph_with_loop() -> Graph<TestVertex, TestEdge> {
        // 0 -> 1 -> 2 -> 1 (back edge), 2 -> 3
        let mut graph = Graph::new();
        for i in 0..4 {
            graph.insert_vertex(TestVertex(i)).unwrap();
        }
        graph.insert_edge(TestEdge(0, 1)).unwrap();
        graph.insert_edge(TestEdge(1, 2)).unwrap();
        graph.insert_edge(TestEdge(2, 1)).unwrap();
        graph.insert_edge(TestEdge(2, 3)).unwrap();
        graph
    }

    #[test]
    fn back_edges() {
        let graph = graph_with_loop();
        let back_edges = graph.compute_back_edges(0).unwrap();
        assert_eq!(back_edges.len(), 1);
        assert!(back_edges.contains(&(2, 1)));

        let headers = graph.loop_headers(0).unwrap();
        assert_eq!(headers.len(), 1);
        assert!(headers.contains(&1));
    }

    #[test]
    fn post_order_ends_at_root() {
        let graph = graph_with_loop();
        let order = graph.compute_post_order(0).unwrap();
        assert_eq!(order.len(), 4);
        assert_eq!(*order.last().unwrap(), 0);
    }

    #[test]
    fn structural_queries() {
        let graph = graph_with_loop();
        assert_eq!(graph.num_vertices(), 4);
        assert!(graph.has_edge(2, 3));
        assert!(!graph.has_edge(3, 2));
        assert_eq!(graph.predecessor_indices(1).unwrap(), vec![0, 2]);
        assert_eq!(graph.edge(2, 3).unwrap(), &TestEdge(2, 3));

        let reachable = graph.reachable_vertices(2).unwrap();
        assert_eq!(reachable.len(), 3);
        assert!(!reachable.contains(&0));
    }

    #[test]
    fn duplicate_vertex_is_an_error() {
        let mut graph = graph_with_loop();
        assert!(graph.insert_vertex(TestVertex(0)).is_err());
        assert!(matches!(
            graph.insert_edge(TestEdge(0, 7)),
            Err(Error::GraphEdgeInvalidVertex(0, 7))
        ));
    }

    #[test]
    fn serialization_round_trips() {
        let graph = graph_with_loop();
        let serialized = serde_json::to_string(&graph).unwrap();
        let deserialized: Graph<TestVertex, TestEdge> = serde_json::from_str(&serialized).unwrap();
        assert_eq!(graph, deserialized);
    }
}

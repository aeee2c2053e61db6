use apispec_indexer::{AnnotatedElement, ElementId};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// Edge payload: the position of the `$ref` inside its source element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefEdge {
    pub order: usize,
}

/// Directed reference graph over element ids.
///
/// Node indices follow insertion order, which is element order.
#[derive(Debug, Default)]
pub struct RefGraph {
    pub graph: DiGraph<ElementId, RefEdge>,
    pub index: HashMap<ElementId, NodeIndex>,
}

impl RefGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the graph described by already annotated elements.
    ///
    /// Fails with the first reference that names an element outside the set.
    pub fn from_annotated(elements: &[AnnotatedElement]) -> Result<Self, String> {
        let mut graph = Self::new();
        for annotated in elements {
            graph.add_node(annotated.id().clone());
        }
        for annotated in elements {
            let from = graph.index[annotated.id()];
            for (order, target) in annotated.references.iter().enumerate() {
                let to = graph.find_node(target).ok_or_else(|| {
                    format!("{} references unknown element {target}", annotated.id())
                })?;
                graph.add_edge(from, to, RefEdge { order });
            }
        }
        Ok(graph)
    }

    pub fn add_node(&mut self, id: ElementId) -> NodeIndex {
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(id.clone());
        self.index.insert(id, idx);
        idx
    }

    /// Adds the edge unless an identical one exists
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: RefEdge) -> bool {
        if self.graph.find_edge(from, to).is_some() {
            return false;
        }
        self.graph.add_edge(from, to, edge);
        true
    }

    pub fn find_node(&self, id: &ElementId) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn id(&self, node: NodeIndex) -> &ElementId {
        &self.graph[node]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Outgoing targets in the order their `$ref`s were first seen
    pub fn references(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.weight().order, e.target()))
            .collect();
        edges.sort_by_key(|(order, _)| *order);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Incoming sources in element order
    pub fn referenced_by(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut sources: Vec<_> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .collect();
        sources.sort();
        sources
    }

    /// Nodes reachable from `start` within `max_depth` hops, nearest first.
    ///
    /// Excludes `start` itself, so self-references never show up.
    pub fn reachable_within(&self, start: NodeIndex, max_depth: usize) -> Vec<(NodeIndex, usize)> {
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([(start, 0usize)]);
        let mut result = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for next in self.references(current) {
                if visited.insert(next) {
                    result.push((next, depth + 1));
                    queue.push_back((next, depth + 1));
                }
            }
        }

        result.sort_by_key(|(node, depth)| (*depth, *node));
        result
    }
}

use crate::graph::{RefEdge, RefGraph};
use apispec_indexer::{AnnotatedElement, Element, ElementId, GraphBuilder, StageResult};
use serde_json::Value;

/// Resolves `$ref` strings between the elements of one file.
///
/// Only one file's elements are ever in view, so a relative-file ref turns
/// into an edge only when it points back at the same file. Refs into other
/// files end up in `unresolved_refs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefGraphBuilder;

impl RefGraphBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the graph and return it with the unresolved refs of each element
    pub fn build(&self, elements: &[Element]) -> (RefGraph, Vec<Vec<String>>) {
        let mut graph = RefGraph::new();

        // Phase 1: one node per element
        for element in elements {
            graph.add_node(element.id.clone());
        }

        // Phase 2: edges from `$ref`s
        let mut unresolved = Vec::with_capacity(elements.len());
        for element in elements {
            let from = graph.add_node(element.id.clone());
            let mut refs = Vec::new();
            collect_refs(&element.content, &mut refs);

            let mut missing: Vec<String> = Vec::new();
            for (order, reference) in refs.into_iter().enumerate() {
                match resolve(&graph, &element.source_file, &reference) {
                    Some(to) => {
                        graph.add_edge(from, to, RefEdge { order });
                    }
                    None => {
                        if !missing.contains(&reference) {
                            missing.push(reference);
                        }
                    }
                }
            }
            unresolved.push(missing);
        }

        log::debug!(
            "Built reference graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        (graph, unresolved)
    }
}

impl GraphBuilder for RefGraphBuilder {
    fn build_graph(&self, elements: Vec<Element>) -> StageResult<Vec<AnnotatedElement>> {
        let (graph, unresolved) = self.build(&elements);

        let annotated = elements
            .into_iter()
            .zip(unresolved)
            .map(|(element, unresolved_refs)| {
                let node = graph.index[&element.id];
                AnnotatedElement {
                    references: graph
                        .references(node)
                        .into_iter()
                        .map(|n| graph.id(n).clone())
                        .collect(),
                    referenced_by: graph
                        .referenced_by(node)
                        .into_iter()
                        .map(|n| graph.id(n).clone())
                        .collect(),
                    unresolved_refs,
                    element,
                }
            })
            .collect();

        Ok(annotated)
    }
}

/// Every `$ref` string inside `value`, depth first
pub fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match (key.as_str(), child) {
                    ("$ref", Value::String(target)) => out.push(target.clone()),
                    _ => collect_refs(child, out),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_refs(item, out);
            }
        }
        _ => {}
    }
}

/// Map a `$ref` to a known element.
///
/// Pointers into the middle of an element (`#/components/schemas/Pet/properties/id`)
/// resolve to the enclosing element.
fn resolve(graph: &RefGraph, source_file: &str, reference: &str) -> Option<petgraph::graph::NodeIndex> {
    let (file_part, pointer) = reference.split_once('#').unwrap_or((reference, ""));
    let target_file = if file_part.is_empty() {
        source_file.to_string()
    } else {
        join_relative(source_file, file_part)?
    };

    let mut pointer = pointer;
    loop {
        if let Some(node) = graph.find_node(&ElementId::new(&target_file, pointer)) {
            return Some(node);
        }
        let (parent, _) = pointer.rsplit_once('/')?;
        if parent.is_empty() {
            return None;
        }
        pointer = parent;
    }
}

/// Resolve `reference` against the directory of `source_file`.
///
/// Returns `None` when the path climbs above the scan root.
fn join_relative(source_file: &str, reference: &str) -> Option<String> {
    let mut parts: Vec<&str> = source_file.split('/').collect();
    parts.pop();
    for segment in reference.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

use crate::graph::RefGraph;
use apispec_indexer::{
    AnnotatedElement, Chunk, ChunkAssembler, ChunkMetadata, ElementId, ElementKind, StageError,
    StageResult,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Split chunk content above this many characters (0 = never split)
    pub max_chunk_chars: usize,

    /// How many reference hops to inline into operation chunks
    pub inline_depth: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 4000,
            inline_depth: 2,
        }
    }
}

/// Turns annotated elements into retrievable chunks.
///
/// Operations carry the elements they reference (up to `inline_depth` hops).
/// Anything not inlined into some operation gets a chunk of its own.
#[derive(Debug, Clone, Default)]
pub struct OpenApiAssembler {
    config: AssemblerConfig,
}

impl OpenApiAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    fn render_element(annotated: &AnnotatedElement, referenced: bool) -> StageResult<String> {
        let element = &annotated.element;
        let body = serde_yaml::to_string(&element.content)
            .map_err(|e| StageError::assemble(format!("{}: {e}", element.id)))?;
        let heading = if referenced { "# referenced" } else { "#" };
        Ok(format!(
            "{heading} {}: {}\n# source: {}\n{body}",
            element.kind, element.name, element.source_file
        ))
    }

    fn split(&self, content: String) -> Vec<String> {
        let max = self.config.max_chunk_chars;
        if max == 0 || content.chars().count() <= max {
            return vec![content];
        }

        let mut parts = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;
        for line in content.split_inclusive('\n') {
            let mut line_chars: Vec<char> = line.chars().collect();
            while !line_chars.is_empty() {
                if current_len == max {
                    parts.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let room = max - current_len;
                if line_chars.len() > room && current_len > 0 {
                    parts.push(std::mem::take(&mut current));
                    current_len = 0;
                    continue;
                }
                let take = line_chars.len().min(room);
                current.extend(line_chars.drain(..take));
                current_len += take;
            }
        }
        if !current.is_empty() {
            parts.push(current);
        }
        parts
    }

    fn emit(&self, base_id: &str, content: String, metadata: ChunkMetadata, out: &mut Vec<Chunk>) {
        let parts = self.split(content);
        let total = parts.len();
        if total == 1 {
            out.extend(parts.into_iter().map(|content| Chunk {
                id: base_id.to_string(),
                content,
                metadata: metadata.clone(),
            }));
            return;
        }
        for (i, content) in parts.into_iter().enumerate() {
            out.push(Chunk {
                id: format!("{base_id}#part-{}", i + 1),
                content,
                metadata: metadata.clone().part(i + 1, total),
            });
        }
    }
}

impl ChunkAssembler for OpenApiAssembler {
    fn assemble(&self, elements: Vec<AnnotatedElement>) -> StageResult<Vec<Chunk>> {
        let graph = RefGraph::from_annotated(&elements).map_err(StageError::assemble)?;

        // Elements already carried by some operation chunk
        let mut inlined: HashSet<ElementId> = HashSet::new();
        let mut operation_context = Vec::with_capacity(elements.len());
        for annotated in &elements {
            let context: Vec<usize> = if annotated.element.kind == ElementKind::Operation {
                let node = graph.index[annotated.id()];
                let reachable = graph.reachable_within(node, self.config.inline_depth);
                inlined.extend(reachable.iter().map(|(n, _)| graph.id(*n).clone()));
                reachable.into_iter().map(|(n, _)| n.index()).collect()
            } else {
                Vec::new()
            };
            operation_context.push(context);
        }

        let mut chunks = Vec::new();
        for (annotated, context) in elements.iter().zip(&operation_context) {
            let element = &annotated.element;
            let is_operation = element.kind == ElementKind::Operation;
            if !is_operation && inlined.contains(&element.id) {
                continue;
            }

            let mut metadata = ChunkMetadata::for_source(&element.source_file)
                .element_kind(element.kind)
                .name(&element.name)
                .add_element(element.id.clone());
            let mut content = Self::render_element(annotated, false)?;

            for &related in context {
                let related = &elements[related];
                content.push('\n');
                content.push_str(&Self::render_element(related, true)?);
                metadata = metadata.add_element(related.id().clone());
            }

            self.emit(element.id.as_str(), content, metadata, &mut chunks);
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apispec_indexer::Element;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn annotated(kind: ElementKind, name: &str, pointer: &str, refs: &[&str]) -> AnnotatedElement {
        AnnotatedElement {
            references: refs
                .iter()
                .map(|p| ElementId::new("api.yaml", p))
                .collect(),
            ..AnnotatedElement::bare(Element::new(
                kind,
                name,
                "api.yaml",
                pointer,
                json!({"description": name}),
            ))
        }
    }

    fn corpus() -> Vec<AnnotatedElement> {
        vec![
            annotated(ElementKind::Info, "Petstore", "/info", &[]),
            annotated(
                ElementKind::Operation,
                "listPets",
                "/paths/~1pets/get",
                &["/components/schemas/PetList"],
            ),
            annotated(
                ElementKind::Schema,
                "PetList",
                "/components/schemas/PetList",
                &["/components/schemas/Pet"],
            ),
            annotated(
                ElementKind::Schema,
                "Pet",
                "/components/schemas/Pet",
                &["/components/schemas/Tag"],
            ),
            annotated(ElementKind::Schema, "Tag", "/components/schemas/Tag", &[]),
            annotated(ElementKind::Schema, "Orphan", "/components/schemas/Orphan", &[]),
        ]
    }

    #[test]
    fn operations_inline_references_up_to_depth() {
        let chunks = OpenApiAssembler::default().assemble(corpus()).unwrap();
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "api.yaml#/info",
                "api.yaml#/paths/~1pets/get",
                "api.yaml#/components/schemas/Tag",
                "api.yaml#/components/schemas/Orphan",
            ]
        );

        let op = &chunks[1];
        assert_eq!(op.metadata.element_ids.len(), 3);
        assert_eq!(op.metadata.element_kind, Some(ElementKind::Operation));
        assert!(op.content.contains("# operation: listPets"));
        assert!(op.content.contains("# referenced schema: PetList"));
        assert!(op.content.contains("# referenced schema: Pet\n"));
        assert!(!op.content.contains("Tag"));
    }

    #[test]
    fn deeper_inlining_covers_more_schemas() {
        let assembler = OpenApiAssembler::new(AssemblerConfig {
            inline_depth: 5,
            ..AssemblerConfig::default()
        });
        let chunks = assembler.assemble(corpus()).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].metadata.element_ids.len(), 4);
    }

    #[test]
    fn long_content_is_split_into_parts() {
        let assembler = OpenApiAssembler::new(AssemblerConfig {
            max_chunk_chars: 40,
            inline_depth: 2,
        });
        let chunks = assembler.assemble(corpus()).unwrap();
        let op_parts: Vec<&Chunk> = chunks
            .iter()
            .filter(|c| c.metadata.element_kind == Some(ElementKind::Operation))
            .collect();

        assert!(op_parts.len() > 1);
        let total = op_parts.len();
        for (i, part) in op_parts.iter().enumerate() {
            assert_eq!(part.id, format!("api.yaml#/paths/~1pets/get#part-{}", i + 1));
            assert_eq!(part.metadata.part_index, Some(i + 1));
            assert_eq!(part.metadata.part_count, Some(total));
            assert!(part.content.chars().count() <= 40);
        }
    }

    #[test]
    fn split_keeps_all_content() {
        let assembler = OpenApiAssembler::new(AssemblerConfig {
            max_chunk_chars: 8,
            inline_depth: 0,
        });
        let text = "short\na much longer line here\nend\n".to_string();
        let parts = assembler.split(text.clone());
        assert_eq!(parts.concat(), text);
        assert!(parts.iter().all(|p| p.chars().count() <= 8));
    }

    #[test]
    fn dangling_reference_is_a_stage_error() {
        let elements = vec![annotated(
            ElementKind::Operation,
            "getThing",
            "/paths/~1thing/get",
            &["/components/schemas/Nowhere"],
        )];
        let err = OpenApiAssembler::default().assemble(elements).unwrap_err();
        assert_eq!(err.stage, apispec_indexer::Stage::Assemble);
        assert!(err.message.contains("Nowhere"));
    }
}

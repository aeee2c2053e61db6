use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an element: `<relative file>#<json pointer>`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(source_file: &str, pointer: &str) -> Self {
        Self(format!("{source_file}#{pointer}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File half of the id
    pub fn source_file(&self) -> &str {
        self.0.split_once('#').map_or(self.0.as_str(), |(file, _)| file)
    }

    /// Pointer half of the id (empty for a whole-document id)
    pub fn pointer(&self) -> &str {
        self.0.split_once('#').map_or("", |(_, pointer)| pointer)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Info,
    Operation,
    Schema,
    Parameter,
    Response,
    RequestBody,
    Header,
    SecurityScheme,
    Example,
}

impl ElementKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Operation => "operation",
            Self::Schema => "schema",
            Self::Parameter => "parameter",
            Self::Response => "response",
            Self::RequestBody => "request_body",
            Self::Header => "header",
            Self::SecurityScheme => "security_scheme",
            Self::Example => "example",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic unit extracted from one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,

    /// Display name (e.g. "GET /pets", "Pet")
    pub name: String,

    /// Relative path of the document this came from
    pub source_file: String,

    /// JSON pointer inside the source document
    pub pointer: String,

    /// Raw element body
    pub content: serde_json::Value,
}

impl Element {
    pub fn new(
        kind: ElementKind,
        name: impl Into<String>,
        source_file: impl Into<String>,
        pointer: impl Into<String>,
        content: serde_json::Value,
    ) -> Self {
        let source_file = source_file.into();
        let pointer = pointer.into();
        Self {
            id: ElementId::new(&source_file, &pointer),
            kind,
            name: name.into(),
            source_file,
            pointer,
            content,
        }
    }
}

/// Element plus resolved cross-reference edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedElement {
    pub element: Element,

    /// Outgoing edges, first-seen order
    #[serde(default)]
    pub references: Vec<ElementId>,

    /// Incoming edges
    #[serde(default)]
    pub referenced_by: Vec<ElementId>,

    /// `$ref` targets that did not resolve to a known element
    #[serde(default)]
    pub unresolved_refs: Vec<String>,
}

impl AnnotatedElement {
    /// Annotation with no edges
    pub fn bare(element: Element) -> Self {
        Self {
            element,
            references: Vec::new(),
            referenced_by: Vec::new(),
            unresolved_refs: Vec::new(),
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.element.id
    }
}

/// Retrievable unit ready for indexing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_file: String,

    /// Every element that contributed content, primary element first
    pub element_ids: Vec<ElementId>,

    pub element_kind: Option<ElementKind>,

    pub name: Option<String>,

    /// 1-based part number when the content was split
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_index: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_count: Option<usize>,
}

impl ChunkMetadata {
    pub fn for_source(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn add_element(mut self, id: ElementId) -> Self {
        self.element_ids.push(id);
        self
    }

    #[must_use]
    pub const fn element_kind(mut self, kind: ElementKind) -> Self {
        self.element_kind = Some(kind);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn part(mut self, index: usize, count: usize) -> Self {
        self.part_index = Some(index);
        self.part_count = Some(count);
        self
    }
}

//! # API Spec OpenAPI stages
//!
//! Reference implementations of the five pipeline stages for OpenAPI 3.x and
//! Swagger 2.0 documents, all working on `serde_json::Value`.
//!
//! ## Architecture
//!
//! ```text
//! spec file (.json / .yaml / .yml)
//!     │
//!     ├──> OpenApiParser      JSON or YAML → Value
//!     ├──> OpenApiValidator   version, info, paths checks
//!     ├──> OpenApiExtractor   info, operations, components
//!     ├──> RefGraphBuilder    `$ref` edges (petgraph)
//!     │      ├─ local refs, and relative-file refs naming the same file
//!     │      ├─ refs into other files stay unresolved
//!     │      └─ pointers into an element resolve to the element
//!     └──> OpenApiAssembler   operation chunks with inlined references,
//!                             standalone chunks for the rest, size splitting
//! ```

mod assembler;
mod builder;
mod error;
mod extractor;
mod graph;
mod parser;
mod validator;

pub use assembler::{AssemblerConfig, OpenApiAssembler};
pub use builder::{collect_refs, RefGraphBuilder};
pub use error::{OpenApiError, Result};
pub use extractor::{escape_pointer_token, unescape_pointer_token, OpenApiExtractor};
pub use graph::{RefEdge, RefGraph};
pub use parser::{OpenApiParser, ParserConfig};
pub use validator::{OpenApiValidator, ValidatorConfig};

use apispec_indexer::{ProcessorConfig, SpecProcessor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Settings for every stage of the OpenAPI pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub processor: ProcessorConfig,
    pub parser: ParserConfig,
    pub validator: ValidatorConfig,
    pub assembler: AssemblerConfig,
}

/// Processor wired with the OpenAPI stages
pub fn openapi_processor(config: PipelineConfig) -> apispec_indexer::Result<SpecProcessor<Value>> {
    SpecProcessor::builder()
        .config(config.processor)
        .parser(OpenApiParser::new(config.parser))
        .validator(OpenApiValidator::new(config.validator))
        .extractor(OpenApiExtractor::new())
        .graph_builder(RefGraphBuilder::new())
        .assembler(OpenApiAssembler::new(config.assembler))
        .build()
}

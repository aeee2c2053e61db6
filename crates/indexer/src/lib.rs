//! # API Spec Indexer
//!
//! Discovery and pipeline orchestration for a corpus of API specification
//! documents.
//!
//! ## Pipeline
//!
//! ```text
//! Specs root
//!     │
//!     ├──> File Scanner (hidden + extension rules, lazy)
//!     │      └─> Relative paths
//!     │
//!     └──> Processor (per file, failures isolated)
//!            ├─ Parser      → document
//!            ├─ Validator   → valid / invalid
//!            ├─ Extractor   → elements
//!            ├─ GraphBuilder→ elements + reference edges
//!            └─ Assembler   → chunks
//! ```
//!
//! The processor never parses a format itself; the five stages are supplied
//! by the caller through the traits in [`stages`].
//!
//! ## Example
//!
//! ```ignore
//! use apispec_indexer::{ProcessorConfig, SpecProcessor};
//!
//! let processor = SpecProcessor::builder()
//!     .config(ProcessorConfig::default())
//!     .parser(my_parser)
//!     .validator(my_validator)
//!     .extractor(my_extractor)
//!     .graph_builder(my_graph_builder)
//!     .assembler(my_assembler)
//!     .build()?;
//!
//! let chunks = processor.process("/path/to/specs");
//! println!("Produced {} chunks", chunks.len());
//! ```

mod error;
mod processor;
mod scanner;
pub mod stages;
mod stats;
mod types;

pub use error::{ConfigError, IndexerError, Result};
pub use processor::{
    CancellationToken, FileOutcome, FileReport, ProcessReport, ProcessorConfig, SpecProcessor,
    SpecProcessorBuilder, MAX_WORKERS,
};
pub use scanner::{scan_directory, DiscoveredFile, FileScanner, ScanConfig, ScanIter};
pub use stages::{
    ChunkAssembler, ElementExtractor, GraphBuilder, ParseOutcome, SpecParser, SpecValidator,
    Stage, StageError, StageResult, ValidationOutcome,
};
pub use stats::ProcessStats;
pub use types::{AnnotatedElement, Chunk, ChunkMetadata, Element, ElementId, ElementKind};

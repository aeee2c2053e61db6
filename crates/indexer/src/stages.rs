//! Contracts for the five transformation stages the processor drives.
//!
//! Parse and validation failures are ordinary outcomes. Extraction, graph
//! building and assembly report problems through [`StageError`]; the
//! processor isolates those per file. A panic inside a stage is a bug and is
//! not caught.

use crate::types::{AnnotatedElement, Chunk, Element};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parse,
    Validate,
    Extract,
    GraphBuild,
    Assemble,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Validate => "validate",
            Self::Extract => "extract",
            Self::GraphBuild => "graph_build",
            Self::Assemble => "assemble",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File-scoped failure reported by a stage
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{stage} failed: {message}")]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
}

impl StageError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    pub fn extract(message: impl Into<String>) -> Self {
        Self::new(Stage::Extract, message)
    }

    pub fn graph_build(message: impl Into<String>) -> Self {
        Self::new(Stage::GraphBuild, message)
    }

    pub fn assemble(message: impl Into<String>) -> Self {
        Self::new(Stage::Assemble, message)
    }
}

pub type StageResult<T> = std::result::Result<T, StageError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<D> {
    Success(D),
    Failure(String),
}

impl<D> ParseOutcome<D> {
    pub fn into_result(self) -> std::result::Result<D, String> {
        match self {
            Self::Success(doc) => Ok(doc),
            Self::Failure(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(Vec<String>),
}

impl ValidationOutcome {
    /// Build an `Invalid` outcome; the error list is never left empty.
    pub fn invalid(errors: Vec<String>) -> Self {
        if errors.is_empty() {
            Self::Invalid(vec!["document failed validation".to_string()])
        } else {
            Self::Invalid(errors)
        }
    }

    /// `Valid` when `errors` is empty, otherwise `Invalid(errors)`
    pub fn from_errors(errors: Vec<String>) -> Self {
        if errors.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(errors)
        }
    }

    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

pub trait SpecParser<D>: Send + Sync {
    fn parse(&self, absolute_path: &Path) -> ParseOutcome<D>;
}

pub trait SpecValidator<D>: Send + Sync {
    fn validate(&self, document: &D) -> ValidationOutcome;
}

pub trait ElementExtractor<D>: Send + Sync {
    fn extract(&self, document: &D, relative_path: &str) -> StageResult<Vec<Element>>;
}

/// Annotates elements with reference edges.
///
/// Must return every input element, in input order.
pub trait GraphBuilder: Send + Sync {
    fn build_graph(&self, elements: Vec<Element>) -> StageResult<Vec<AnnotatedElement>>;
}

pub trait ChunkAssembler: Send + Sync {
    fn assemble(&self, elements: Vec<AnnotatedElement>) -> StageResult<Vec<Chunk>>;
}

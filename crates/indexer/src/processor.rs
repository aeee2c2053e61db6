use crate::error::{IndexerError, Result};
use crate::scanner::{DiscoveredFile, FileScanner, ScanConfig};
use crate::stages::{
    ChunkAssembler, ElementExtractor, GraphBuilder, ParseOutcome, SpecParser, SpecValidator,
    Stage, StageError, StageResult, ValidationOutcome,
};
use crate::stats::ProcessStats;
use crate::types::{Chunk, ElementId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub const MAX_WORKERS: usize = 32;

/// Progress lines go to `info` only when the run asked for them.
macro_rules! progress {
    ($self:expr, $($arg:tt)+) => {
        if $self.config.log_progress {
            log::info!($($arg)+);
        } else {
            log::debug!($($arg)+);
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub scan: ScanConfig,

    /// Emit per-run and per-file progress at `info`
    pub log_progress: bool,

    /// Per-file workers; 1 keeps the lazy single-worker loop
    pub workers: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            log_progress: false,
            workers: 1,
        }
    }
}

impl ProcessorConfig {
    pub fn effective_workers(&self) -> usize {
        self.workers.clamp(1, MAX_WORKERS)
    }
}

/// Cooperative cancellation flag, checked between files.
///
/// The flag is sticky: once cancelled, it stays cancelled until [`reset`].
///
/// [`reset`]: CancellationToken::reset
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear the flag so the next run proceeds
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Terminal state of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Emitted { elements: usize, chunks: usize },
    SkippedParse { error: String },
    SkippedValidate { errors: Vec<String> },
    SkippedError { stage: Stage, error: String },
}

impl FileOutcome {
    pub const fn is_emitted(&self) -> bool {
        matches!(self, Self::Emitted { .. })
    }

    fn skip_reason(&self) -> Option<String> {
        match self {
            Self::Emitted { .. } => None,
            Self::SkippedParse { error } => Some(format!("parse failed: {error}")),
            Self::SkippedValidate { errors } => {
                Some(format!("validation failed: {}", errors.join("; ")))
            }
            Self::SkippedError { stage, error } => Some(format!("{stage} failed: {error}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    /// Relative path, `/`-separated
    pub path: String,
    pub outcome: FileOutcome,
}

/// Chunks of a run plus what happened to every file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessReport {
    pub root: PathBuf,
    pub chunks: Vec<Chunk>,
    pub files: Vec<FileReport>,
    pub stats: ProcessStats,
    pub cancelled: bool,
}

impl ProcessReport {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            chunks: Vec::new(),
            files: Vec::new(),
            stats: ProcessStats::new(),
            cancelled: false,
        }
    }

    fn record(&mut self, path: String, outcome: FileOutcome, chunks: Vec<Chunk>) {
        match &outcome {
            FileOutcome::Emitted { elements, chunks } => {
                self.stats.add_emitted(*elements, *chunks);
            }
            skipped => {
                if let Some(reason) = skipped.skip_reason() {
                    self.stats.add_skipped(format!("{path}: {reason}"));
                }
            }
        }
        self.chunks.extend(chunks);
        self.files.push(FileReport { path, outcome });
    }
}

/// Drives every discovered file through parse → validate → extract →
/// graph build → assemble, isolating failures per file.
pub struct SpecProcessor<D> {
    scanner: FileScanner,
    config: ProcessorConfig,
    parser: Arc<dyn SpecParser<D>>,
    validator: Arc<dyn SpecValidator<D>>,
    extractor: Arc<dyn ElementExtractor<D>>,
    graph_builder: Arc<dyn GraphBuilder>,
    assembler: Arc<dyn ChunkAssembler>,
    pool: Option<rayon::ThreadPool>,
    cancellation: CancellationToken,
}

impl<D> SpecProcessor<D> {
    pub fn builder() -> SpecProcessorBuilder<D> {
        SpecProcessorBuilder::default()
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Token shared by every run of this processor.
    ///
    /// A cancelled token also stops later runs before their first file, so
    /// call [`CancellationToken::reset`] before reusing the processor.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Chunks for every file under `root`, in discovery order.
    ///
    /// A missing or non-directory root yields an empty collection.
    pub fn process(&self, root: impl AsRef<Path>) -> Vec<Chunk> {
        self.process_with_report(root).chunks
    }

    pub fn process_with_report(&self, root: impl AsRef<Path>) -> ProcessReport {
        let start = Instant::now();
        let root = root.as_ref();
        let mut report = ProcessReport::new(root);

        progress!(self, "Processing API specifications from: {}", root.display());

        let files = match self.scanner.scan(root) {
            Ok(files) => files,
            Err(err) => {
                if err.is_bad_root() {
                    progress!(self, "Directory scan error: {err}");
                } else {
                    log::warn!("Directory scan error: {err}");
                }
                report.stats.time_ms = start.elapsed().as_millis() as u64;
                return report;
            }
        };

        match &self.pool {
            None => {
                for file in files {
                    if self.cancellation.is_cancelled() {
                        report.cancelled = true;
                        break;
                    }
                    report.stats.files_discovered += 1;
                    let (outcome, chunks) = self.process_file(&file);
                    report.record(file.relative_str(), outcome, chunks);
                }
                if !report.cancelled {
                    progress!(
                        self,
                        "Found {} API specification files",
                        report.stats.files_discovered
                    );
                }
            }
            Some(pool) => {
                let files: Vec<DiscoveredFile> = files.collect();
                report.stats.files_discovered = files.len();
                progress!(self, "Found {} API specification files", files.len());

                // Indexed collect keeps discovery order across workers.
                let results: Vec<Option<(FileOutcome, Vec<Chunk>)>> = pool.install(|| {
                    files
                        .par_iter()
                        .map(|file| {
                            if self.cancellation.is_cancelled() {
                                None
                            } else {
                                Some(self.process_file(file))
                            }
                        })
                        .collect()
                });

                for (file, result) in files.iter().zip(results) {
                    match result {
                        Some((outcome, chunks)) => {
                            report.record(file.relative_str(), outcome, chunks);
                        }
                        None => report.cancelled = true,
                    }
                }
            }
        }

        report.stats.time_ms = start.elapsed().as_millis() as u64;
        if report.cancelled {
            progress!(self, "Processing cancelled after {} files", report.files.len());
        }
        progress!(
            self,
            "Generated {} total chunks from {} files ({} emitted, {} skipped)",
            report.stats.chunks,
            report.stats.files_discovered,
            report.stats.files_emitted,
            report.stats.files_skipped
        );

        report
    }

    /// Run one file through every stage
    pub fn process_file(&self, file: &DiscoveredFile) -> (FileOutcome, Vec<Chunk>) {
        let relative = file.relative_str();
        progress!(self, "Processing: {relative}");

        let document = match self.parser.parse(&file.absolute) {
            ParseOutcome::Success(document) => document,
            ParseOutcome::Failure(error) => {
                progress!(self, "  Parse failed: {error}");
                return (FileOutcome::SkippedParse { error }, Vec::new());
            }
        };

        if let ValidationOutcome::Invalid(errors) = self.validator.validate(&document) {
            progress!(self, "  Validation failed: {errors:?}");
            return (FileOutcome::SkippedValidate { errors }, Vec::new());
        }

        match self.transform(&document, &relative) {
            Ok((elements, chunks)) => {
                progress!(self, "  Generated {} chunks", chunks.len());
                let outcome = FileOutcome::Emitted {
                    elements,
                    chunks: chunks.len(),
                };
                (outcome, chunks)
            }
            Err(err) => {
                progress!(self, "  Processing error: {err}");
                let outcome = FileOutcome::SkippedError {
                    stage: err.stage,
                    error: err.message,
                };
                (outcome, Vec::new())
            }
        }
    }

    fn transform(&self, document: &D, relative: &str) -> StageResult<(usize, Vec<Chunk>)> {
        let elements = self.extractor.extract(document, relative)?;
        let element_count = elements.len();
        progress!(self, "  Extracted {element_count} elements");

        let expected: Vec<ElementId> = elements.iter().map(|e| e.id.clone()).collect();
        let annotated = self.graph_builder.build_graph(elements)?;
        let same_sequence = annotated.len() == expected.len()
            && annotated.iter().zip(&expected).all(|(a, id)| a.id() == id);
        if !same_sequence {
            return Err(StageError::graph_build(format!(
                "graph builder changed the element sequence ({} in, {} out)",
                expected.len(),
                annotated.len()
            )));
        }

        let chunks = self.assembler.assemble(annotated)?;
        Ok((element_count, chunks))
    }
}

pub struct SpecProcessorBuilder<D> {
    config: ProcessorConfig,
    parser: Option<Arc<dyn SpecParser<D>>>,
    validator: Option<Arc<dyn SpecValidator<D>>>,
    extractor: Option<Arc<dyn ElementExtractor<D>>>,
    graph_builder: Option<Arc<dyn GraphBuilder>>,
    assembler: Option<Arc<dyn ChunkAssembler>>,
    cancellation: CancellationToken,
}

impl<D> Default for SpecProcessorBuilder<D> {
    fn default() -> Self {
        Self {
            config: ProcessorConfig::default(),
            parser: None,
            validator: None,
            extractor: None,
            graph_builder: None,
            assembler: None,
            cancellation: CancellationToken::new(),
        }
    }
}

impl<D> SpecProcessorBuilder<D> {
    #[must_use]
    pub fn config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn parser(mut self, parser: impl SpecParser<D> + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: impl SpecValidator<D> + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    #[must_use]
    pub fn extractor(mut self, extractor: impl ElementExtractor<D> + 'static) -> Self {
        self.extractor = Some(Arc::new(extractor));
        self
    }

    #[must_use]
    pub fn graph_builder(mut self, graph_builder: impl GraphBuilder + 'static) -> Self {
        self.graph_builder = Some(Arc::new(graph_builder));
        self
    }

    #[must_use]
    pub fn assembler(mut self, assembler: impl ChunkAssembler + 'static) -> Self {
        self.assembler = Some(Arc::new(assembler));
        self
    }

    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn build(self) -> Result<SpecProcessor<D>> {
        let parser = self.parser.ok_or(IndexerError::MissingStage("parser"))?;
        let validator = self.validator.ok_or(IndexerError::MissingStage("validator"))?;
        let extractor = self.extractor.ok_or(IndexerError::MissingStage("extractor"))?;
        let graph_builder = self
            .graph_builder
            .ok_or(IndexerError::MissingStage("graph_builder"))?;
        let assembler = self.assembler.ok_or(IndexerError::MissingStage("assembler"))?;

        let workers = self.config.effective_workers();
        let pool = if workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("apispec-worker-{i}"))
                .build()
                .map_err(|e| IndexerError::ThreadPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };

        Ok(SpecProcessor {
            scanner: FileScanner::new(self.config.scan.clone()),
            config: self.config,
            parser,
            validator,
            extractor,
            graph_builder,
            assembler,
            pool,
            cancellation: self.cancellation,
        })
    }
}

use apispec_indexer::{
    AnnotatedElement, CancellationToken, Chunk, ChunkAssembler, ChunkMetadata, Element,
    ElementExtractor, ElementKind, FileOutcome, FileScanner, GraphBuilder, IndexerError,
    ParseOutcome, ProcessorConfig, SpecParser, SpecProcessor, SpecValidator, Stage, StageError,
    StageResult, ValidationOutcome,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// Stub stages over plain text documents. One `el:<name>` line per element;
// `!parse` breaks parsing, `invalid` fails validation, `boom` fails extraction.

struct TextParser;

impl SpecParser<String> for TextParser {
    fn parse(&self, absolute_path: &Path) -> ParseOutcome<String> {
        match fs::read_to_string(absolute_path) {
            Ok(text) if text.starts_with("!parse") => ParseOutcome::Failure("bad syntax".into()),
            Ok(text) => ParseOutcome::Success(text),
            Err(e) => ParseOutcome::Failure(e.to_string()),
        }
    }
}

struct TextValidator;

impl SpecValidator<String> for TextValidator {
    fn validate(&self, document: &String) -> ValidationOutcome {
        if document.contains("invalid") {
            ValidationOutcome::invalid(vec!["missing info".into(), "missing paths".into()])
        } else {
            ValidationOutcome::Valid
        }
    }
}

struct LineExtractor;

impl ElementExtractor<String> for LineExtractor {
    fn extract(&self, document: &String, relative_path: &str) -> StageResult<Vec<Element>> {
        if document.contains("boom") {
            return Err(StageError::extract("unexpected node"));
        }
        Ok(document
            .lines()
            .filter_map(|line| line.strip_prefix("el:"))
            .map(|name| {
                Element::new(
                    ElementKind::Schema,
                    name,
                    relative_path,
                    format!("/{name}"),
                    serde_json::Value::Null,
                )
            })
            .collect())
    }
}

struct BareGraph;

impl GraphBuilder for BareGraph {
    fn build_graph(&self, elements: Vec<Element>) -> StageResult<Vec<AnnotatedElement>> {
        Ok(elements.into_iter().map(AnnotatedElement::bare).collect())
    }
}

/// Drops the last element, violating the annotation contract
struct LossyGraph;

impl GraphBuilder for LossyGraph {
    fn build_graph(&self, mut elements: Vec<Element>) -> StageResult<Vec<AnnotatedElement>> {
        elements.pop();
        Ok(elements.into_iter().map(AnnotatedElement::bare).collect())
    }
}

/// Cancels the run once the first file reaches graph building
struct CancellingGraph(CancellationToken);

impl GraphBuilder for CancellingGraph {
    fn build_graph(&self, elements: Vec<Element>) -> StageResult<Vec<AnnotatedElement>> {
        self.0.cancel();
        Ok(elements.into_iter().map(AnnotatedElement::bare).collect())
    }
}

/// One chunk per pair of elements
struct PairAssembler;

impl ChunkAssembler for PairAssembler {
    fn assemble(&self, elements: Vec<AnnotatedElement>) -> StageResult<Vec<Chunk>> {
        Ok(elements
            .chunks(2)
            .map(|pair| {
                let source = pair[0].element.source_file.clone();
                let names: Vec<&str> = pair.iter().map(|a| a.element.name.as_str()).collect();
                let metadata = pair.iter().fold(ChunkMetadata::for_source(&source), |m, a| {
                    m.add_element(a.id().clone())
                });
                Chunk {
                    id: format!("{source}:{}", names.join("+")),
                    content: names.join("\n"),
                    metadata,
                }
            })
            .collect())
    }
}

fn processor(config: ProcessorConfig) -> SpecProcessor<String> {
    SpecProcessor::builder()
        .config(config)
        .parser(TextParser)
        .validator(TextValidator)
        .extractor(LineExtractor)
        .graph_builder(BareGraph)
        .assembler(PairAssembler)
        .build()
        .expect("processor")
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn outcome_for<'a>(files: &'a [apispec_indexer::FileReport], path: &str) -> &'a FileOutcome {
    &files
        .iter()
        .find(|f| f.path == path)
        .unwrap_or_else(|| panic!("no report for {path}"))
        .outcome
}

fn sample_corpus() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "a.yaml", "el:Pet\nel:Owner\n");
    write(root, "b.json", "invalid\nel:Ignored\n");
    write(root, ".hidden/c.yaml", "el:Secret\n");
    write(root, "notes.txt", "el:Note\n");
    temp
}

#[test]
fn sample_corpus_yields_only_the_valid_file() {
    let temp = sample_corpus();
    let processor = processor(ProcessorConfig::default());

    let mut scanned: Vec<String> = FileScanner::default()
        .scan(temp.path())
        .unwrap()
        .map(|f| f.relative_str())
        .collect();
    scanned.sort();
    assert_eq!(scanned, vec!["a.yaml", "b.json"]);

    let chunks = processor.process(temp.path());
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].id, "a.yaml:Pet+Owner");
    assert_eq!(chunks[0].metadata.element_ids.len(), 2);
}

#[test]
fn report_distinguishes_skip_reasons() {
    let temp = sample_corpus();
    write(temp.path(), "empty.yaml", "nothing here\n");
    write(temp.path(), "broken.yml", "!parse\n");
    let report = processor(ProcessorConfig::default()).process_with_report(temp.path());

    assert_eq!(report.stats.files_discovered, 4);
    assert_eq!(report.stats.files_emitted, 2);
    assert_eq!(report.stats.files_skipped, 2);
    assert_eq!(report.stats.chunks, 1);
    assert_eq!(report.stats.elements, 2);
    assert!(!report.cancelled);

    assert_eq!(
        outcome_for(&report.files, "a.yaml"),
        &FileOutcome::Emitted {
            elements: 2,
            chunks: 1
        }
    );
    assert_eq!(
        outcome_for(&report.files, "empty.yaml"),
        &FileOutcome::Emitted {
            elements: 0,
            chunks: 0
        }
    );
    assert_eq!(
        outcome_for(&report.files, "b.json"),
        &FileOutcome::SkippedValidate {
            errors: vec!["missing info".into(), "missing paths".into()]
        }
    );
    assert_eq!(
        outcome_for(&report.files, "broken.yml"),
        &FileOutcome::SkippedParse {
            error: "bad syntax".into()
        }
    );
}

#[test]
fn missing_root_returns_empty_collection() {
    let temp = TempDir::new().unwrap();
    let processor = processor(ProcessorConfig {
        log_progress: true,
        ..ProcessorConfig::default()
    });

    assert!(processor.process(temp.path().join("absent")).is_empty());

    let report = processor.process_with_report(temp.path().join("absent"));
    assert_eq!(report.stats.files_discovered, 0);
    assert!(report.files.is_empty());
}

#[test]
fn file_root_returns_empty_collection() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.yaml", "el:Pet\n");
    let chunks = processor(ProcessorConfig::default()).process(temp.path().join("a.yaml"));
    assert!(chunks.is_empty());
}

#[test]
fn extractor_failure_is_isolated_to_its_file() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.yaml", "el:A1\nel:A2\n");
    write(temp.path(), "d.yaml", "el:D1\nboom\n");
    write(temp.path(), "nested/e.json", "el:E1\n");

    let report = processor(ProcessorConfig::default()).process_with_report(temp.path());

    let mut ids: Vec<&str> = report.chunks.iter().map(|c| c.id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["a.yaml:A1+A2", "nested/e.json:E1"]);
    assert_eq!(
        outcome_for(&report.files, "d.yaml"),
        &FileOutcome::SkippedError {
            stage: Stage::Extract,
            error: "unexpected node".into()
        }
    );
    assert_eq!(report.stats.errors.len(), 1);
    assert!(report.stats.errors[0].starts_with("d.yaml: extract failed"));
}

#[test]
fn chunks_follow_discovery_order() {
    let temp = TempDir::new().unwrap();
    for i in 0..6 {
        write(
            temp.path(),
            &format!("dir{}/spec{i}.yaml", i % 3),
            &format!("el:X{i}\nel:Y{i}\nel:Z{i}\n"),
        );
    }
    write(temp.path(), "dir1/bad.yaml", "invalid\n");

    let discovery: Vec<String> = FileScanner::default()
        .scan(temp.path())
        .unwrap()
        .map(|f| f.relative_str())
        .collect();
    let report = processor(ProcessorConfig::default()).process_with_report(temp.path());

    let report_order: Vec<&str> = report.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(report_order, discovery);

    let chunk_sources: Vec<&str> = report
        .chunks
        .iter()
        .map(|c| c.metadata.source_file.as_str())
        .collect();
    let expected: Vec<&str> = discovery
        .iter()
        .filter(|p| p.as_str() != "dir1/bad.yaml")
        .flat_map(|p| [p.as_str(), p.as_str()])
        .collect();
    assert_eq!(chunk_sources, expected);
    assert_eq!(report.chunks.len(), 12);
}

#[test]
fn processing_is_idempotent() {
    let temp = sample_corpus();
    write(temp.path(), "more/x.yml", "el:A\nel:B\nel:C\n");
    let processor = processor(ProcessorConfig::default());

    assert_eq!(processor.process(temp.path()), processor.process(temp.path()));
}

#[test]
fn parallel_workers_preserve_sequential_result() {
    let temp = TempDir::new().unwrap();
    for i in 0..20 {
        let body = if i % 5 == 0 {
            "invalid\n".to_string()
        } else {
            format!("el:A{i}\nel:B{i}\nel:C{i}\n")
        };
        write(temp.path(), &format!("group{}/s{i}.json", i % 4), &body);
    }

    let sequential = processor(ProcessorConfig::default()).process_with_report(temp.path());
    let parallel = processor(ProcessorConfig {
        workers: 4,
        ..ProcessorConfig::default()
    })
    .process_with_report(temp.path());

    assert_eq!(parallel.chunks, sequential.chunks);
    assert_eq!(parallel.files, sequential.files);
    assert_eq!(parallel.stats.chunks, 32);
    assert_eq!(sequential.stats.files_discovered, 20);
    assert_eq!(parallel.stats.files_discovered, sequential.stats.files_discovered);
}

#[test]
fn missing_stage_is_fatal_at_build_time() {
    let result = SpecProcessor::<String>::builder()
        .parser(TextParser)
        .validator(TextValidator)
        .extractor(LineExtractor)
        .assembler(PairAssembler)
        .build();

    assert!(matches!(
        result,
        Err(IndexerError::MissingStage("graph_builder"))
    ));
}

#[test]
fn graph_builder_must_not_drop_elements() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.yaml", "el:A\nel:B\n");
    let processor = SpecProcessor::builder()
        .parser(TextParser)
        .validator(TextValidator)
        .extractor(LineExtractor)
        .graph_builder(LossyGraph)
        .assembler(PairAssembler)
        .build()
        .unwrap();

    let report = processor.process_with_report(temp.path());
    assert!(report.chunks.is_empty());
    assert!(matches!(
        outcome_for(&report.files, "a.yaml"),
        FileOutcome::SkippedError {
            stage: Stage::GraphBuild,
            ..
        }
    ));
}

#[test]
fn cancelled_token_stops_before_first_file() {
    let temp = sample_corpus();
    let token = CancellationToken::new();
    token.cancel();
    let processor = SpecProcessor::builder()
        .parser(TextParser)
        .validator(TextValidator)
        .extractor(LineExtractor)
        .graph_builder(BareGraph)
        .assembler(PairAssembler)
        .cancellation(token)
        .build()
        .unwrap();

    let report = processor.process_with_report(temp.path());
    assert!(report.cancelled);
    assert!(report.files.is_empty());
    assert!(report.chunks.is_empty());
}

#[test]
fn cancellation_between_files_keeps_completed_output() {
    let temp = TempDir::new().unwrap();
    for i in 0..3 {
        write(temp.path(), &format!("s{i}.yaml"), "el:A\nel:B\n");
    }
    let token = CancellationToken::new();
    let processor = SpecProcessor::builder()
        .parser(TextParser)
        .validator(TextValidator)
        .extractor(LineExtractor)
        .graph_builder(CancellingGraph(token.clone()))
        .assembler(PairAssembler)
        .cancellation(token)
        .build()
        .unwrap();

    let report = processor.process_with_report(temp.path());
    assert!(report.cancelled);
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.chunks.len(), 1);
    assert!(report.files[0].outcome.is_emitted());
}

#[test]
fn cancelled_token_sticks_until_reset() {
    let temp = sample_corpus();
    let token = CancellationToken::new();
    let processor = SpecProcessor::builder()
        .parser(TextParser)
        .validator(TextValidator)
        .extractor(LineExtractor)
        .graph_builder(BareGraph)
        .assembler(PairAssembler)
        .cancellation(token.clone())
        .build()
        .unwrap();

    let baseline = processor.process(temp.path());
    assert!(!baseline.is_empty());

    token.cancel();
    assert!(processor.process(temp.path()).is_empty());
    assert!(processor.process_with_report(temp.path()).cancelled);

    processor.cancellation().reset();
    let report = processor.process_with_report(temp.path());
    assert!(!report.cancelled);
    assert_eq!(report.chunks, baseline);
}

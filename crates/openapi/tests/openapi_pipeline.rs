use apispec_indexer::{ElementKind, FileOutcome, ProcessorConfig, Stage};
use apispec_openapi::{openapi_processor, PipelineConfig};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PETSTORE: &str = r#"
openapi: 3.0.3
info:
  title: Petstore
  version: 1.0.0
paths:
  /pets:
    get:
      operationId: listPets
      responses:
        200:
          description: ok
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pets'
components:
  schemas:
    Pets:
      type: array
      items:
        $ref: '#/components/schemas/Pet'
    Pet:
      type: object
      properties:
        id:
          type: integer
    Error:
      type: object
"#;

const LEGACY: &str = r##"{
  "swagger": "2.0",
  "info": {"title": "Users", "version": "2"},
  "paths": {
    "/users": {
      "get": {"responses": {"200": {"schema": {"$ref": "#/definitions/User"}}}}
    }
  },
  "definitions": {"User": {"type": "object"}}
}"##;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn corpus() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "a.yaml", PETSTORE);
    write(root, "legacy/users.json", LEGACY);
    write(root, "b.json", r#"{"info": {"title": "x", "version": "1"}, "paths": {}}"#);
    write(root, "broken.yaml", "openapi: [unclosed\n");
    write(
        root,
        "bad_paths.yml",
        "openapi: 3.0.0\ninfo:\n  title: Bad\n  version: '1'\npaths:\n  /x: 5\n",
    );
    write(root, ".hidden/c.yaml", PETSTORE);
    write(root, "notes.txt", "not a spec");
    temp
}

fn outcome<'a>(report: &'a apispec_indexer::ProcessReport, path: &str) -> &'a FileOutcome {
    &report
        .files
        .iter()
        .find(|f| f.path == path)
        .unwrap_or_else(|| panic!("missing report for {path}"))
        .outcome
}

#[test]
fn indexes_valid_documents_and_isolates_the_rest() {
    let temp = corpus();
    let processor = openapi_processor(PipelineConfig::default()).unwrap();
    let report = processor.process_with_report(temp.path());

    assert_eq!(report.stats.files_discovered, 5);
    assert_eq!(report.stats.files_emitted, 2);
    assert_eq!(report.stats.files_skipped, 3);
    assert_eq!(report.chunks.len(), 5);

    assert_eq!(
        outcome(&report, "a.yaml"),
        &FileOutcome::Emitted {
            elements: 5,
            chunks: 3
        }
    );
    assert_eq!(
        outcome(&report, "legacy/users.json"),
        &FileOutcome::Emitted {
            elements: 3,
            chunks: 2
        }
    );
    assert!(matches!(
        outcome(&report, "b.json"),
        FileOutcome::SkippedValidate { errors } if errors.len() == 1
    ));
    assert!(matches!(
        outcome(&report, "broken.yaml"),
        FileOutcome::SkippedParse { .. }
    ));
    assert!(matches!(
        outcome(&report, "bad_paths.yml"),
        FileOutcome::SkippedError {
            stage: Stage::Extract,
            ..
        }
    ));
}

#[test]
fn operation_chunk_inlines_referenced_schemas() {
    let temp = corpus();
    let chunks = openapi_processor(PipelineConfig::default())
        .unwrap()
        .process(temp.path());

    let list_pets = chunks
        .iter()
        .find(|c| c.metadata.name.as_deref() == Some("listPets"))
        .expect("listPets chunk");
    assert_eq!(list_pets.id, "a.yaml#/paths/~1pets/get");
    assert_eq!(list_pets.metadata.element_kind, Some(ElementKind::Operation));
    let ids: Vec<&str> = list_pets
        .metadata
        .element_ids
        .iter()
        .map(|id| id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec![
            "a.yaml#/paths/~1pets/get",
            "a.yaml#/components/schemas/Pets",
            "a.yaml#/components/schemas/Pet",
        ]
    );
    assert!(list_pets.content.contains("# referenced schema: Pet\n"));

    let standalone: Vec<&str> = chunks
        .iter()
        .filter(|c| c.metadata.source_file == "a.yaml")
        .filter_map(|c| c.metadata.name.as_deref())
        .collect();
    assert_eq!(standalone, vec!["Petstore", "listPets", "Error"]);
}

#[test]
fn parallel_run_matches_sequential_run() {
    let temp = corpus();
    for i in 0..8 {
        write(temp.path(), &format!("more/p{i}.yaml"), PETSTORE);
    }

    let sequential = openapi_processor(PipelineConfig::default())
        .unwrap()
        .process(temp.path());
    let parallel = openapi_processor(PipelineConfig {
        processor: ProcessorConfig {
            workers: 3,
            ..ProcessorConfig::default()
        },
        ..PipelineConfig::default()
    })
    .unwrap()
    .process(temp.path());

    assert_eq!(sequential.len(), 5 + 8 * 3);
    assert_eq!(parallel, sequential);
}

#[test]
fn missing_root_yields_nothing() {
    let temp = TempDir::new().unwrap();
    let chunks = openapi_processor(PipelineConfig::default())
        .unwrap()
        .process(temp.path().join("missing"));
    assert!(chunks.is_empty());
}

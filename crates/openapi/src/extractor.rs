use apispec_indexer::{Element, ElementExtractor, ElementKind, StageError, StageResult};
use serde_json::{json, Map, Value};

const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const COMPONENT_SECTIONS: &[(&str, ElementKind)] = &[
    ("schemas", ElementKind::Schema),
    ("parameters", ElementKind::Parameter),
    ("responses", ElementKind::Response),
    ("requestBodies", ElementKind::RequestBody),
    ("headers", ElementKind::Header),
    ("securitySchemes", ElementKind::SecurityScheme),
    ("examples", ElementKind::Example),
];

const SWAGGER_SECTIONS: &[(&str, ElementKind)] = &[
    ("definitions", ElementKind::Schema),
    ("parameters", ElementKind::Parameter),
    ("responses", ElementKind::Response),
    ("securityDefinitions", ElementKind::SecurityScheme),
];

/// RFC 6901 reference token escaping
pub fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

pub fn unescape_pointer_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Pulls info, operations and reusable components out of a document.
///
/// Output order: info, operations in document order, then components.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenApiExtractor;

impl OpenApiExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_info(root: &Map<String, Value>, relative_path: &str) -> Element {
        let info = root.get("info").cloned().unwrap_or(Value::Null);
        let name = info
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(relative_path)
            .to_string();
        let mut content = json!({ "info": info });
        for key in ["servers", "host", "basePath", "tags"] {
            if let Some(value) = root.get(key) {
                content[key] = value.clone();
            }
        }
        Element::new(ElementKind::Info, name, relative_path, "/info", content)
    }

    fn extract_operations(
        paths: &Map<String, Value>,
        relative_path: &str,
        out: &mut Vec<Element>,
    ) -> StageResult<()> {
        for (path, item) in paths {
            let item = item.as_object().ok_or_else(|| {
                StageError::extract(format!("path item '{path}' is not a mapping"))
            })?;
            let path_parameters = item.get("parameters");
            let path_token = escape_pointer_token(path);

            for (method, operation) in item {
                if !HTTP_METHODS.contains(&method.as_str()) {
                    continue;
                }
                let name = operation
                    .get("operationId")
                    .and_then(Value::as_str)
                    .map_or_else(|| format!("{} {path}", method.to_uppercase()), str::to_string);

                let mut content = json!({
                    "method": method,
                    "path": path,
                    "operation": operation,
                });
                if let Some(params) = path_parameters {
                    content["pathParameters"] = params.clone();
                }

                out.push(Element::new(
                    ElementKind::Operation,
                    name,
                    relative_path,
                    format!("/paths/{path_token}/{method}"),
                    content,
                ));
            }
        }
        Ok(())
    }

    fn extract_section(
        section: Option<&Value>,
        base_pointer: &str,
        kind: ElementKind,
        relative_path: &str,
        out: &mut Vec<Element>,
    ) -> StageResult<()> {
        let Some(section) = section else {
            return Ok(());
        };
        let entries = section.as_object().ok_or_else(|| {
            StageError::extract(format!("'{base_pointer}' is not a mapping"))
        })?;
        for (name, body) in entries {
            out.push(Element::new(
                kind,
                name.clone(),
                relative_path,
                format!("{base_pointer}/{}", escape_pointer_token(name)),
                body.clone(),
            ));
        }
        Ok(())
    }
}

impl ElementExtractor<Value> for OpenApiExtractor {
    fn extract(&self, document: &Value, relative_path: &str) -> StageResult<Vec<Element>> {
        let root = document
            .as_object()
            .ok_or_else(|| StageError::extract("document root is not a mapping"))?;

        let mut elements = vec![Self::extract_info(root, relative_path)];

        match root.get("paths") {
            Some(Value::Object(paths)) => {
                Self::extract_operations(paths, relative_path, &mut elements)?;
            }
            Some(_) => return Err(StageError::extract("'paths' is not a mapping")),
            None => {}
        }

        if root.contains_key("swagger") {
            for (section, kind) in SWAGGER_SECTIONS {
                let pointer = format!("/{section}");
                Self::extract_section(root.get(*section), &pointer, *kind, relative_path, &mut elements)?;
            }
        } else if let Some(components) = root.get("components") {
            let components = components
                .as_object()
                .ok_or_else(|| StageError::extract("'components' is not a mapping"))?;
            for (section, kind) in COMPONENT_SECTIONS {
                let pointer = format!("/components/{section}");
                Self::extract_section(
                    components.get(*section),
                    &pointer,
                    *kind,
                    relative_path,
                    &mut elements,
                )?;
            }
        }

        log::debug!("Extracted {} elements from {relative_path}", elements.len());
        Ok(elements)
    }
}

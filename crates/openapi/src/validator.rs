use apispec_indexer::{SpecValidator, ValidationOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Reject documents that define no operations or components at all
    pub require_paths: bool,

    /// Accepted major versions (2 = Swagger 2.0, 3 = OpenAPI 3.x)
    pub allowed_major_versions: Vec<u32>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            require_paths: true,
            allowed_major_versions: vec![2, 3],
        }
    }
}

/// Structural checks for OpenAPI 3.x and Swagger 2.0 documents.
///
/// Collects every problem instead of stopping at the first one.
#[derive(Debug, Clone, Default)]
pub struct OpenApiValidator {
    config: ValidatorConfig,
}

impl OpenApiValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn check(&self, document: &Value) -> Vec<String> {
        let mut errors = Vec::new();
        let Some(root) = document.as_object() else {
            errors.push("document root is not a mapping".to_string());
            return errors;
        };

        let major = match (root.get("openapi"), root.get("swagger")) {
            (Some(Value::String(v)), _) => {
                // The allowed list decides which majors pass
                let major = v.split('.').next().and_then(|m| m.parse::<u32>().ok());
                if major.is_none() {
                    errors.push(format!("unsupported openapi version: {v}"));
                }
                major
            }
            (Some(_), _) => {
                errors.push("'openapi' must be a string".to_string());
                None
            }
            (None, Some(Value::String(v))) if v == "2.0" => Some(2),
            (None, Some(other)) => {
                errors.push(format!("unsupported swagger version: {other}"));
                None
            }
            (None, None) => {
                errors.push("missing 'openapi' or 'swagger' version field".to_string());
                None
            }
        };

        if let Some(major) = major {
            if !self.config.allowed_major_versions.contains(&major) {
                errors.push(format!("major version {major} is not allowed"));
            }
        }

        match root.get("info") {
            Some(Value::Object(info)) => {
                for field in ["title", "version"] {
                    if !info.get(field).is_some_and(Value::is_string) {
                        errors.push(format!("'info.{field}' must be a string"));
                    }
                }
            }
            Some(_) => errors.push("'info' must be a mapping".to_string()),
            None => errors.push("missing 'info' section".to_string()),
        }

        if let Some(paths) = root.get("paths") {
            if !paths.is_object() {
                errors.push("'paths' must be a mapping".to_string());
            }
        }

        if self.config.require_paths {
            let has_content = match major {
                Some(2) => root.contains_key("paths"),
                _ => ["paths", "components", "webhooks"]
                    .iter()
                    .any(|key| root.contains_key(*key)),
            };
            if !has_content {
                errors.push("document defines no paths".to_string());
            }
        }

        errors
    }
}

impl SpecValidator<Value> for OpenApiValidator {
    fn validate(&self, document: &Value) -> ValidationOutcome {
        ValidationOutcome::from_errors(self.check(document))
    }
}

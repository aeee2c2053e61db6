use crate::error::{OpenApiError, Result};
use apispec_indexer::{ParseOutcome, SpecParser};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::path::Path;

const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Larger files are reported as parse failures
    pub max_file_bytes: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
    Unknown,
}

impl Format {
    fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Unknown,
        }
    }
}

/// Reads JSON or YAML specification files into a `serde_json::Value`
#[derive(Debug, Clone, Default)]
pub struct OpenApiParser {
    config: ParserConfig,
}

impl OpenApiParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn parse_file(&self, path: &Path) -> Result<Value> {
        let size = std::fs::metadata(path)?.len();
        if size > self.config.max_file_bytes {
            return Err(OpenApiError::FileTooLarge {
                size,
                max: self.config.max_file_bytes,
            });
        }

        let text = std::fs::read_to_string(path)?;
        let document = match Format::from_path(path) {
            Format::Json => parse_json(&text)?,
            Format::Yaml => parse_yaml(&text)?,
            Format::Unknown => parse_json(&text).or_else(|_| parse_yaml(&text))?,
        };

        if !document.is_object() {
            return Err(OpenApiError::NotAMapping);
        }
        Ok(document)
    }
}

impl SpecParser<Value> for OpenApiParser {
    fn parse(&self, absolute_path: &Path) -> ParseOutcome<Value> {
        match self.parse_file(absolute_path) {
            Ok(document) => ParseOutcome::Success(document),
            Err(err) => ParseOutcome::Failure(err.to_string()),
        }
    }
}

fn parse_json(text: &str) -> Result<Value> {
    Ok(serde_json::from_str(text)?)
}

fn parse_yaml(text: &str) -> Result<Value> {
    let mut value: serde_yaml::Value = serde_yaml::from_str(text)?;
    value.apply_merge()?;
    yaml_to_json(value)
}

/// YAML allows non-string keys (`200:` under `responses`); JSON does not.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value> {
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => yaml_number(&n)?,
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_number(n: &serde_yaml::Number) -> Result<Value> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Ok(Value::from(u));
    }
    let f = n.as_f64().unwrap_or(f64::NAN);
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or(OpenApiError::NonFiniteNumber(f))
}

fn yaml_key(key: serde_yaml::Value) -> Result<String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok("null".to_string()),
        other => Err(OpenApiError::UnsupportedKey(format!("{other:?}"))),
    }
}

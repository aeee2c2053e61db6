use anyhow::{Context as AnyhowContext, Result};
use apispec_indexer::{ProcessorConfig, ScanConfig, MAX_WORKERS};
use apispec_openapi::{AssemblerConfig, ParserConfig, PipelineConfig, ValidatorConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

pub const WORKERS_ENV: &str = "APISPEC_WORKERS";

/// `[processor]` table of the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessorSection {
    pub log_progress: bool,
    pub workers: usize,
}

impl Default for ProcessorSection {
    fn default() -> Self {
        Self {
            log_progress: false,
            workers: 1,
        }
    }
}

/// Everything the CLI can be configured with.
///
/// Precedence: defaults < config file < environment < command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub scan: ScanConfig,
    pub processor: ProcessorSection,
    pub parser: ParserConfig,
    pub validator: ValidatorConfig,
    pub assembler: AssemblerConfig,
}

impl AppConfig {
    /// Defaults, overlaid with `path` (if any) and then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::from_toml_str(&text)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    fn apply_env(&mut self) {
        if let Ok(raw) = env::var(WORKERS_ENV) {
            match parse_workers(&raw) {
                Some(workers) => self.processor.workers = workers,
                None => log::warn!("Ignoring {WORKERS_ENV}={raw:?}: not a positive integer"),
            }
        }
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            processor: ProcessorConfig {
                scan: self.scan.clone(),
                log_progress: self.processor.log_progress,
                workers: self.processor.workers.clamp(1, MAX_WORKERS),
            },
            parser: self.parser.clone(),
            validator: self.validator.clone(),
            assembler: self.assembler.clone(),
        }
    }
}

fn parse_workers(raw: &str) -> Option<usize> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .map(|n| n.min(MAX_WORKERS))
}

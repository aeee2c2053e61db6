use crate::config::AppConfig;
use anyhow::{Context as AnyhowContext, Result};
use apispec_indexer::{FileScanner, SpecProcessor};
use apispec_openapi::openapi_processor;
use serde_json::Value;

/// Shared state for one CLI invocation, built once and passed by reference
pub struct AppContext {
    config: AppConfig,
    processor: SpecProcessor<Value>,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Result<Self> {
        let processor =
            openapi_processor(config.pipeline()).context("Failed to build the processor")?;
        log::debug!(
            "Processor ready: {} worker(s), extensions {:?}",
            processor.config().effective_workers(),
            config.scan.allowed_extensions().collect::<Vec<_>>()
        );
        Ok(Self { config, processor })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn processor(&self) -> &SpecProcessor<Value> {
        &self.processor
    }

    pub fn scanner(&self) -> FileScanner {
        FileScanner::new(self.config.scan.clone())
    }
}

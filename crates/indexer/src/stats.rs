use serde::{Deserialize, Serialize};

/// Statistics about one processing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStats {
    /// Files the scanner yielded
    pub files_discovered: usize,

    /// Files that completed the whole pipeline
    pub files_emitted: usize,

    /// Files skipped on parse, validation or stage failure
    pub files_skipped: usize,

    /// Elements extracted from emitted files
    pub elements: usize,

    /// Chunks produced
    pub chunks: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// One line per skipped file
    pub errors: Vec<String>,
}

impl ProcessStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_emitted(&mut self, elements: usize, chunks: usize) {
        self.files_emitted += 1;
        self.elements += elements;
        self.chunks += chunks;
    }

    pub fn add_skipped(&mut self, error: String) {
        self.files_skipped += 1;
        self.errors.push(error);
    }
}

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced at the boundary of a pipeline stage.
///
/// Subprocess failures are deliberately *not* represented here: a scan or
/// lookup invocation that exits non-zero is logged and counted, never
/// propagated. Only configuration and filesystem problems abort a stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("the value supplied to --threads must be a non-negative integer, got {0:?}")]
    InvalidThreads(String),

    #[error("failed to read port map {path}: {source}")]
    PortMapRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse port map {path}: {source}")]
    PortMapParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read scan results directory {path}: {source}")]
    ReadResultsDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteResult {
        path: PathBuf,
        source: std::io::Error,
    },
}

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("table has no columns")]
    NoColumns,

    #[error("failed to encode cell: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("csv content is an error report: {0}")]
    ErrorContent(String),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

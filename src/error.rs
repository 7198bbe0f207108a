//! Error type for the document store.
//!
//! Variants line up one-to-one with the propagating error kinds enumerated
//! in `spec.md` §7. Swallowed errors (build-runner failure during
//! association checks, transitive-import I/O, translator "unsupported")
//! never surface through this type — they are logged and absorbed at the
//! point they occur, per the same section.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse document: {0}")]
    Parse(String),

    #[error("URI has no directory to resolve against: {0}")]
    UriBadScheme(String),

    #[error("build-script runner failed: {0}")]
    RunFailed(String),

    #[error("failed to parse {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

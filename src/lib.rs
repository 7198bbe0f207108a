//! Document store for a build-aware language server.
//!
//! Owns every source document and build-file descriptor the server has
//! been asked about, keeps them consistent across opens, edits, and
//! closes, and resolves imports (textual, package-name, and C) across
//! that graph. Transport, parsing, scope analysis, and C translation are
//! all out of scope here — see [`frontend`] for the seams this crate
//! consumes them through.

mod build_file;
mod cimport_cache;
mod completions;
mod config;
mod discovery;
mod error;
mod frontend;
mod handle;
mod import_resolution;
mod offsets;
mod registry;
mod runner;
mod uri;

pub use build_file::{BuildFileConfig, BuildFileDescriptor, BuildFileSidecar, BuildOption, PackageRecord};
pub use cimport_cache::{CImportHash, CImportOutcome, CImportRecord};
pub use completions::CompletionKind;
pub use config::StoreConfig;
pub use error::Error;
pub use frontend::{
    CImportNodeIndex, CTranslator, DocumentScope, NullCTranslator, NullFrontend, SyntaxFrontend,
    SyntaxTree, TranslateOutcome,
};
pub use handle::Handle;
pub use offsets::{OffsetEncoding, Position, Range, TextEdit};
pub use registry::Store;
pub use uri::{path_to_uri, resolve_relative, std_uri_from_lib_path, uri_to_path};

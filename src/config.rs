//! Store-wide configuration.
//!
//! Mirrors the five configuration values `spec.md` §6 lists as consumed by
//! the store, plus the two baked-in cache-root strings passed to the
//! build-script runner. Loaded the way `loctree::config::LoctreeConfig`
//! loads `.loctree/config.toml`: an optional file, defaults on absence, a
//! logged warning (never a propagated error) on parse failure, since this
//! top-level file is a convenience for running the store standalone — a
//! real LSP client instead pushes these values in over
//! `workspace/didChangeConfiguration` via [`StoreConfig`]'s public fields.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration consumed by the store (`spec.md` §6, "Environment /
/// configuration values consumed").
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub zig_exe_path: Option<PathBuf>,
    pub zig_lib_path: Option<PathBuf>,
    pub build_runner_path: Option<PathBuf>,
    pub global_cache_path: Option<PathBuf>,
    pub builtin_path: Option<PathBuf>,
}

impl StoreConfig {
    /// Local cache root baked into every build-runner invocation.
    pub const LOCAL_CACHE_ROOT: &'static str = "zig-cache";
    /// Global cache root baked into every build-runner invocation.
    pub const GLOBAL_CACHE_ROOT: &'static str = "ZLS_DONT_CARE";

    /// Load `docstore.toml` from `root`, if present. Returns the default
    /// (fully unconfigured) config when the file is absent or malformed.
    pub fn load(root: &Path) -> Self {
        Self::load_from_path(&root.join("docstore.toml"))
    }

    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("failed to parse {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("failed to read {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Whether enough configuration is present to classify/associate build
    /// files at all (`spec.md` §4.3.1: "the global compiler-executable path
    /// is configured").
    pub fn has_compiler(&self) -> bool {
        self.zig_exe_path.is_some()
    }
}

//! Build-file descriptor (`spec.md` §3) and its `zls.build.json` sidecar
//! (`spec.md` §4.4.2).

use std::path::PathBuf;

use serde::Deserialize;
use url::Url;

/// One package a build script declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub uri: Url,
}

/// A single runner command-line option, as specified by a build file's
/// `zls.build.json` sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildOption {
    pub flag: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// The package/include-directory configuration discovered for a build
/// file, replaced atomically whenever the runner is re-invoked (`spec.md`
/// §4.4.3).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildFileConfig {
    pub packages: Vec<PackageRecord>,
    pub include_dirs: Vec<PathBuf>,
}

impl BuildFileConfig {
    /// First package whose name matches exactly (`spec.md` §4.6.1:
    /// "linear search; first exact match").
    pub fn package_uri(&self, name: &str) -> Option<&Url> {
        self.packages.iter().find(|p| p.name == name).map(|p| &p.uri)
    }
}

/// The `zls.build.json` sidecar format (`spec.md` §6).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildFileSidecar {
    pub relative_builtin_path: Option<String>,
    pub build_options: Vec<BuildOption>,
}

/// One discovered build script (`spec.md` §3, "Build-file descriptor").
#[derive(Debug)]
pub struct BuildFileDescriptor {
    pub uri: Url,
    pub config: BuildFileConfig,
    pub builtin_uri: Option<Url>,
    pub build_options: Vec<BuildOption>,

    /// Reference count: the document for which `is_build_file == Some(self)`
    /// contributes one, and every document whose `associated_build_file`
    /// points here contributes one more (`spec.md` §3 invariants).
    pub refs: u32,
}

impl BuildFileDescriptor {
    pub(crate) fn new(uri: Url) -> Self {
        Self {
            uri,
            config: BuildFileConfig::default(),
            builtin_uri: None,
            build_options: Vec::new(),
            refs: 0,
        }
    }
}

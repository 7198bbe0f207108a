//! Build-file discovery: the ancestor walk and descriptor creation
//! (`spec.md` §4.4), plus the classification step of the open pipeline
//! (`spec.md` §4.3.1 step 3) that ties them to a document being opened.

use std::path::{Component, Path, PathBuf};

use url::Url;

use crate::build_file::{BuildFileDescriptor, BuildFileSidecar};
use crate::error::Error;
use crate::registry::Store;
use crate::runner::run_build_runner;
use crate::uri::path_to_uri;

/// True if `path`'s file name is `build.zig`.
pub fn is_build_zig_path(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some("build.zig")
}

/// True if any component of `path` is literally `std`, i.e. the path lies
/// under a `/std/` subtree (`spec.md` §4.3.1).
pub fn is_under_std(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(s) if s == "std"))
}

/// Enumerate `<prefix>/build.zig` candidates from the filesystem root down
/// to `file_path`'s own directory, yielding only prefixes where the
/// candidate actually exists (`spec.md` §4.4.1). Windows prefixes (disk
/// designators) are skipped; the walk begins at the first path
/// immediately past them.
pub fn ancestor_walk(file_path: &Path) -> AncestorWalk {
    let dir = file_path.parent().unwrap_or(file_path);
    AncestorWalk {
        prefixes: ancestor_prefixes(dir).into_iter(),
    }
}

/// Enumerate the root-downward directory prefixes of `dir`, skipping the
/// disk designator itself on Windows so the first yielded prefix is the
/// disk root (`spec.md` §4.4.1: "the walk begins immediately past the disk
/// designator"). Pure path arithmetic, no filesystem access — kept
/// separate from [`ancestor_walk`] so the prefix boundary is testable
/// without real `build.zig` files on disk.
fn ancestor_prefixes(dir: &Path) -> Vec<PathBuf> {
    let mut prefixes = Vec::new();
    let mut current = PathBuf::new();
    let mut started = false;
    for component in dir.components() {
        match component {
            Component::Prefix(_) => {
                current.push(component.as_os_str());
            }
            Component::RootDir => {
                current.push(component.as_os_str());
                started = true;
                prefixes.push(current.clone());
            }
            Component::Normal(seg) => {
                current.push(seg);
                if started {
                    prefixes.push(current.clone());
                }
            }
            Component::CurDir | Component::ParentDir => {}
        }
    }
    prefixes
}

/// Restartable, finite iterator over ancestor `build.zig` candidates.
pub struct AncestorWalk {
    prefixes: std::vec::IntoIter<PathBuf>,
}

impl Iterator for AncestorWalk {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        for prefix in self.prefixes.by_ref() {
            let candidate = prefix.join("build.zig");
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}

/// Create a build-file descriptor for `build_file_path` (`spec.md`
/// §4.4.2). Propagates only sidecar parse errors; runner failures are
/// logged and leave the descriptor with an empty configuration.
pub fn create_descriptor(
    config: &crate::config::StoreConfig,
    build_file_path: &Path,
) -> Result<BuildFileDescriptor, Error> {
    let uri = path_to_uri(build_file_path)?;
    let mut descriptor = BuildFileDescriptor::new(uri);

    let script_dir = build_file_path.parent().unwrap_or(build_file_path);
    let sidecar_path = script_dir.join("zls.build.json");
    let sidecar = if sidecar_path.exists() {
        let content = std::fs::read_to_string(&sidecar_path)?;
        serde_json::from_str::<BuildFileSidecar>(&content).map_err(|source| {
            Error::ConfigParse {
                path: sidecar_path.clone(),
                source,
            }
        })?
    } else {
        BuildFileSidecar::default()
    };

    descriptor.build_options = sidecar.build_options;
    descriptor.builtin_uri = sidecar
        .relative_builtin_path
        .map(|rel| script_dir.join(rel))
        .and_then(|p| path_to_uri(&p).ok())
        .or_else(|| config.builtin_path.as_deref().and_then(|p| path_to_uri(p).ok()));

    match run_build_runner(config, build_file_path, &descriptor.build_options) {
        Ok(discovered) => descriptor.config = discovered,
        Err(e) => {
            tracing::warn!(build_file = %build_file_path.display(), error = %e, "build runner failed; descriptor left empty");
        }
    }

    Ok(descriptor)
}

impl Store {
    /// Ensure the build script at `build_file_path` has an open document,
    /// recursing into [`Store::new_document`]'s own classification branch
    /// if it is not already registered.
    pub(crate) fn ensure_build_script_open(&mut self, build_file_path: &Path) -> Result<(), Error> {
        let uri = path_to_uri(build_file_path)?;
        if self.documents.contains_key(&uri) {
            return Ok(());
        }
        let text = std::fs::read_to_string(build_file_path)?;
        self.new_document(uri, text)
    }

    /// The ancestor-walk + association-check pipeline that chooses the
    /// build file a newly opened document should associate with
    /// (`spec.md` §4.3.1 step 3, second branch).
    ///
    /// Only *finds* the candidate here; does not bump its `refs`. The
    /// chosen descriptor's ref is only real once the caller's `newDocument`
    /// has nothing left to fail on (`spec.md` §5: "partial-failure inside
    /// `newDocument` must leave the registry unchanged") — bumping it here
    /// would leak a ref if an import collected later in the same call
    /// fails to resolve.
    pub(crate) fn classify_associated_build_file(
        &mut self,
        doc_uri: &Url,
        doc_path: &Path,
    ) -> Result<Option<Url>, Error> {
        let mut nearest_associated = None;
        let mut closest_existing = None;

        for build_file_path in ancestor_walk(doc_path) {
            self.ensure_build_script_open(&build_file_path)?;
            let bf_uri = path_to_uri(&build_file_path)?;
            if !self.build_files.contains_key(&bf_uri) {
                continue;
            }
            closest_existing = Some(bf_uri.clone());
            if self.uri_associated_with_build(&bf_uri, doc_uri) {
                nearest_associated = Some(bf_uri.clone());
            }
        }

        Ok(nearest_associated.or(closest_existing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn ancestor_walk_finds_build_zig_in_root_and_nested_dirs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("build.zig"), "").unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        let file = src.join("a.zig");
        std::fs::write(&file, "").unwrap();

        let found: Vec<_> = ancestor_walk(&file).collect();
        assert_eq!(found, vec![dir.path().join("build.zig")]);
    }

    #[test]
    fn ancestor_walk_prefers_deepest_match_last() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("build.zig"), "").unwrap();
        let nested = dir.path().join("pkg");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("build.zig"), "").unwrap();
        let file = nested.join("src.zig");
        std::fs::write(&file, "").unwrap();

        let found: Vec<_> = ancestor_walk(&file).collect();
        assert_eq!(
            found,
            vec![dir.path().join("build.zig"), nested.join("build.zig")]
        );
    }

    #[test]
    fn ancestor_walk_empty_without_any_build_zig() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.zig");
        std::fs::write(&file, "").unwrap();
        assert_eq!(ancestor_walk(&file).count(), 0);
    }

    #[test]
    fn is_under_std_matches_std_component() {
        assert!(is_under_std(Path::new("/usr/lib/zig/std/std.zig")));
        assert!(!is_under_std(Path::new("/home/user/project/src/a.zig")));
    }

    #[test]
    fn is_build_zig_path_matches_filename_only() {
        assert!(is_build_zig_path(Path::new("/project/build.zig")));
        assert!(!is_build_zig_path(Path::new("/project/build.zig.bak")));
    }

    #[cfg(windows)]
    #[test]
    fn ancestor_prefixes_start_immediately_past_the_disk_designator() {
        let dir = Path::new(r"C:\proj\src");
        let prefixes = ancestor_prefixes(dir);
        assert_eq!(
            prefixes,
            vec![
                PathBuf::from(r"C:\"),
                PathBuf::from(r"C:\proj"),
                PathBuf::from(r"C:\proj\src"),
            ]
        );
        // The bare disk designator (no root separator) is never a prefix on
        // its own: the first candidate `build.zig` would look for is
        // `C:\build.zig`, not a malformed `C:build.zig`.
        assert!(!prefixes.contains(&PathBuf::from("C:")));
    }
}

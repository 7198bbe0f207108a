//! URI/path conversion helpers.
//!
//! The store treats `file://` URIs as the canonical key for every handle and
//! build-file descriptor. These helpers are the "URI/path utilities"
//! collaborator `spec.md` §1 lists as external-by-interface; this crate
//! ships a small concrete implementation built on the `url` crate rather
//! than reinventing RFC 3986 parsing by hand.

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::Error;

/// Convert a filesystem path into a `file://` URI.
pub fn path_to_uri(path: &Path) -> Result<Url, Error> {
    Url::from_file_path(path).map_err(|()| Error::UriBadScheme(path.display().to_string()))
}

/// Convert a `file://` URI back into a filesystem path.
pub fn uri_to_path(uri: &Url) -> Result<PathBuf, Error> {
    uri.to_file_path()
        .map_err(|()| Error::UriBadScheme(uri.to_string()))
}

/// Resolve a relative import string against the directory containing `base`.
///
/// Mirrors `Url::join`'s RFC 3986 relative-resolution semantics, which
/// already implement "resolved against the owning handle's URI, minus its
/// last path segment" (`spec.md` §4.6.1) — joining replaces the last path
/// segment of `base` with the rest of `rel`.
pub fn resolve_relative(base: &Url, rel: &str) -> Result<Url, Error> {
    if base.cannot_be_a_base() {
        return Err(Error::UriBadScheme(base.to_string()));
    }
    base.join(rel)
        .map_err(|_| Error::UriBadScheme(base.to_string()))
}

/// Derive the `std.zig` URI from a configured compiler library path,
/// falling back to the older `zig/std/std.zig` layout (`spec.md` §4.8).
pub fn std_uri_from_lib_path(lib_path: &Path) -> Option<Url> {
    let primary = lib_path.join("std").join("std.zig");
    if primary.exists() {
        return path_to_uri(&primary).ok();
    }
    let fallback = lib_path.join("zig").join("std").join("std.zig");
    if fallback.exists() {
        return path_to_uri(&fallback).ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn path_uri_roundtrip() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("main.zig");
        std::fs::write(&file, "").unwrap();

        let uri = path_to_uri(&file).unwrap();
        let back = uri_to_path(&uri).unwrap();
        assert_eq!(back, file);
    }

    #[test]
    fn resolve_relative_strips_last_segment() {
        let base = Url::parse("file:///root/src/main.zig").unwrap();
        let resolved = resolve_relative(&base, "./util.zig").unwrap();
        assert_eq!(resolved.path(), "/root/src/util.zig");
    }

    #[test]
    fn resolve_relative_handles_parent_dir() {
        let base = Url::parse("file:///root/src/sub/main.zig").unwrap();
        let resolved = resolve_relative(&base, "../util.zig").unwrap();
        assert_eq!(resolved.path(), "/root/src/util.zig");
    }

    #[test]
    fn std_uri_prefers_primary_layout() {
        let dir = TempDir::new().unwrap();
        let std_dir = dir.path().join("std");
        std::fs::create_dir_all(&std_dir).unwrap();
        std::fs::write(std_dir.join("std.zig"), "").unwrap();

        let uri = std_uri_from_lib_path(dir.path()).unwrap();
        assert!(uri.path().ends_with("/std/std.zig"));
    }

    #[test]
    fn std_uri_absent_when_neither_layout_exists() {
        let dir = TempDir::new().unwrap();
        assert!(std_uri_from_lib_path(dir.path()).is_none());
    }
}

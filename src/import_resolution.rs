//! Import resolution: mapping raw import strings and C-import nodes to
//! handles, opening on demand (`spec.md` §4.5, §4.6).

use std::collections::HashSet;

use url::Url;

use crate::error::Error;
use crate::frontend::CImportNodeIndex;
use crate::registry::Store;
use crate::uri::resolve_relative;

impl Store {
    /// `uriFromImportStr(handle, raw)` (`spec.md` §4.6.1, §6 "Store API").
    /// The one read-only Store API operation of the four import-resolution
    /// ops: unlike `resolveImport`/`resolveCImport` it never opens a
    /// document, bumps a reference count, or appends to `imports_used` —
    /// it only answers "what URI would this raw string resolve to".
    pub fn uri_from_import_str(&self, handle_uri: &Url, raw: &str) -> Result<Option<Url>, Error> {
        let associated_build_file = self
            .documents
            .get(handle_uri)
            .and_then(|h| h.associated_build_file.as_ref());
        self.uri_from_import_str_inner(handle_uri, associated_build_file, raw)
    }

    /// Internal form of `uriFromImportStr`, parametrized over the owning
    /// document's URI and associated build file rather than a registered
    /// `&Handle`, so it can run during `newDocument`/`refresh` before (or
    /// without) the handle being built existing in the registry.
    pub(crate) fn uri_from_import_str_inner(
        &self,
        doc_uri: &Url,
        associated_build_file: Option<&Url>,
        raw: &str,
    ) -> Result<Option<Url>, Error> {
        if raw == "std" {
            return Ok(self.std_uri.clone());
        }

        if raw == "builtin" {
            if let Some(bf) = associated_build_file.and_then(|u| self.build_files.get(u)) {
                if let Some(builtin) = &bf.builtin_uri {
                    return Ok(Some(builtin.clone()));
                }
            }
            return Ok(self
                .config
                .builtin_path
                .as_deref()
                .and_then(|p| crate::uri::path_to_uri(p).ok()));
        }

        if !raw.ends_with(".zig") {
            let Some(bf_uri) = associated_build_file else {
                return Ok(None);
            };
            let Some(bf) = self.build_files.get(bf_uri) else {
                return Ok(None);
            };
            return Ok(bf.config.package_uri(raw).cloned());
        }

        resolve_relative(doc_uri, raw).map(Some)
    }

    /// `resolveImport(handle, raw)` (`spec.md` §4.6.2).
    pub fn resolve_import(&mut self, handle_uri: &Url, raw: &str) -> Result<Option<Url>, Error> {
        let associated = self
            .documents
            .get(handle_uri)
            .and_then(|h| h.associated_build_file.clone());
        let Some(resolved) = self.uri_from_import_str_inner(handle_uri, associated.as_ref(), raw)?
        else {
            return Ok(None);
        };

        let already_used = self
            .documents
            .get(handle_uri)
            .map(|h| h.imports_used.contains(&resolved))
            .unwrap_or(false);
        if already_used {
            return Ok(self.documents.contains_key(&resolved).then_some(resolved));
        }

        let allowed = {
            let in_imports = self
                .documents
                .get(handle_uri)
                .map(|h| h.import_uris.contains(&resolved))
                .unwrap_or(false);
            let in_packages = associated
                .as_ref()
                .and_then(|bf| self.build_files.get(bf))
                .map(|bf| bf.config.packages.iter().any(|p| p.uri == resolved))
                .unwrap_or(false);
            in_imports || in_packages
        };
        if !allowed {
            return Ok(None);
        }

        self.open_or_create_for_import(&resolved);

        if let Some(h) = self.documents.get_mut(handle_uri) {
            h.imports_used.push(resolved.clone());
        }
        Ok(Some(resolved))
    }

    /// `resolveCImport(handle, node)` (`spec.md` §4.6.3).
    pub fn resolve_c_import(
        &mut self,
        handle_uri: &Url,
        node: CImportNodeIndex,
    ) -> Result<Option<Url>, Error> {
        let resolved = {
            let Some(handle) = self.documents.get(handle_uri) else {
                return Ok(None);
            };
            handle
                .c_imports
                .iter()
                .find(|r| r.node == node)
                .and_then(|r| r.success_uri().cloned())
        };
        let Some(resolved) = resolved else {
            return Ok(None);
        };

        let already_used = self
            .documents
            .get(handle_uri)
            .map(|h| h.imports_used.contains(&resolved))
            .unwrap_or(false);
        if already_used {
            return Ok(self.documents.contains_key(&resolved).then_some(resolved));
        }

        self.open_or_create_for_import(&resolved);

        if let Some(h) = self.documents.get_mut(handle_uri) {
            h.imports_used.push(resolved.clone());
        }
        Ok(Some(resolved))
    }

    /// Shared tail of steps 3/4 in `resolveImport`/`resolveCImport`: reuse
    /// the registered handle (bumping its count), or open it fresh from
    /// disk. Unlike `Store::open`, this never bumps a build-file
    /// descriptor's `refs` even when the reused handle happens to be a
    /// build script's own document: `spec.md` §3's invariant for `refs` is
    /// the sum of `is_build_file` and `associated_build_file` relationships
    /// only, and a generic import reference is neither — it is accounted
    /// for entirely by `imports_used`/`count`.
    fn open_or_create_for_import(&mut self, uri: &Url) {
        if self.documents.contains_key(uri) {
            if let Some(h) = self.documents.get_mut(uri) {
                h.count += 1;
            }
        } else {
            self.new_document_from_uri(uri);
        }
    }

    /// `uriAssociatedWithBuild(descriptor, uri)` (`spec.md` §4.5).
    pub fn uri_associated_with_build(&mut self, descriptor_uri: &Url, target: &Url) -> bool {
        let Some(packages) = self.build_files.get(descriptor_uri).map(|d| d.config.packages.clone())
        else {
            return false;
        };
        let mut visited = HashSet::new();
        for pkg in &packages {
            if self.import_reaches(&pkg.uri, target, &mut visited) {
                return true;
            }
        }
        false
    }

    fn import_reaches(&mut self, from: &Url, target: &Url, visited: &mut HashSet<Url>) -> bool {
        if from == target {
            return true;
        }
        if !visited.insert(from.clone()) {
            return false;
        }
        let Some(imports) = self.open_for_inspection(from) else {
            return false;
        };
        imports
            .iter()
            .any(|next| self.import_reaches(next, target, visited))
    }

    /// Ensure `uri` has a registered handle (opening it from disk on demand,
    /// with the standard lifecycle but no caller-side reference accounting)
    /// and return its resolvable import URIs.
    fn open_for_inspection(&mut self, uri: &Url) -> Option<Vec<Url>> {
        if !self.documents.contains_key(uri) {
            self.new_document_from_uri(uri)?;
        }
        self.documents.get(uri).map(|h| h.resolvable_uris())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::frontend::{NullCTranslator, NullFrontend};
    use crate::uri::path_to_uri;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store_with(dir: &TempDir) -> Store {
        let mut config = StoreConfig::default();
        let std_dir = dir.path().join("lib").join("std");
        std::fs::create_dir_all(&std_dir).unwrap();
        std::fs::write(std_dir.join("std.zig"), "").unwrap();
        config.zig_lib_path = Some(dir.path().join("lib"));
        Store::init(config, Arc::new(NullFrontend), Arc::new(NullCTranslator))
    }

    #[test]
    fn resolve_import_std_opens_and_links() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with(&dir);

        let main_path = dir.path().join("main.zig");
        std::fs::write(&main_path, r#"const std = @import("std");"#).unwrap();
        let main_uri = path_to_uri(&main_path).unwrap();
        store.open(main_uri.clone(), std::fs::read_to_string(&main_path).unwrap()).unwrap();

        let resolved = store.resolve_import(&main_uri, "std").unwrap().unwrap();
        assert!(resolved.path().ends_with("/std/std.zig"));
        assert_eq!(store.get_handle(&resolved).unwrap().count, 1);
        assert_eq!(
            store.get_handle(&main_uri).unwrap().imports_used,
            vec![resolved]
        );
    }

    #[test]
    fn resolve_import_is_idempotent_on_repeat_calls() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with(&dir);
        let main_path = dir.path().join("main.zig");
        std::fs::write(&main_path, r#"const std = @import("std");"#).unwrap();
        let main_uri = path_to_uri(&main_path).unwrap();
        store.open(main_uri.clone(), std::fs::read_to_string(&main_path).unwrap()).unwrap();

        let first = store.resolve_import(&main_uri, "std").unwrap().unwrap();
        let second = store.resolve_import(&main_uri, "std").unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(store.get_handle(&first).unwrap().count, 1);
        assert_eq!(store.get_handle(&main_uri).unwrap().imports_used.len(), 1);
    }

    #[test]
    fn resolve_import_unknown_package_is_absent() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with(&dir);
        let main_path = dir.path().join("main.zig");
        std::fs::write(&main_path, "const x = 1;").unwrap();
        let main_uri = path_to_uri(&main_path).unwrap();
        store.open(main_uri.clone(), "const x = 1;".to_string()).unwrap();

        assert_eq!(store.resolve_import(&main_uri, "nope").unwrap(), None);
    }

    #[test]
    fn uri_from_import_str_is_read_only() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with(&dir);
        let main_path = dir.path().join("main.zig");
        std::fs::write(&main_path, r#"const std = @import("std");"#).unwrap();
        let main_uri = path_to_uri(&main_path).unwrap();
        store.open(main_uri.clone(), std::fs::read_to_string(&main_path).unwrap()).unwrap();

        let resolved = store.uri_from_import_str(&main_uri, "std").unwrap().unwrap();
        assert!(resolved.path().ends_with("/std/std.zig"));
        // Unlike `resolve_import`, nothing was opened or reference-counted.
        assert!(store.get_handle(&resolved).is_none());
        assert!(store.get_handle(&main_uri).unwrap().imports_used.is_empty());
    }
}

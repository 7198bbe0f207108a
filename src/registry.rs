//! The handle registry, the build-file registry, and the `Store` type that
//! owns both and drives the open/refresh/close lifecycle pipeline
//! (`spec.md` §4.1–§4.3).
//!
//! Both registries are modeled as `Url`-keyed maps rather than the
//! pointer-graph `spec.md` describes: a document's `associated_build_file`
//! / `is_build_file` fields and a descriptor's implicit "its own document"
//! relationship are stored as `Url`s, resolved back through `self` on every
//! access. This sidesteps Rust's lack of a cycle-collecting `Rc` entirely —
//! the two-node build-file/document cycle `spec.md` §9 describes is real,
//! but nothing here ever holds a strong pointer into it; every reference is
//! a lookup key, so there is nothing for the borrow checker or a leak
//! checker to object to. `FxHashMap` (the `rustc-hash` hasher) is used in
//! place of the standard hasher for both maps, the way an `other_examples`
//! server registry (`trust-lsp`'s `ServerState`) favors it for
//! non-adversarial, URI-keyed lookups.

use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use url::Url;

use crate::completions::{tag_completion_items, CompletionKind};
use crate::config::StoreConfig;
use crate::error::Error;
use crate::frontend::{CTranslator, SyntaxFrontend};
use crate::handle::Handle;
use crate::offsets::{apply_changes, OffsetEncoding, TextEdit};
use crate::uri::{std_uri_from_lib_path, uri_to_path};
use crate::{cimport_cache, discovery};

/// The document store (`spec.md` §4.1–§4.3, §6 "Store API"). Owns every
/// live document and build-file descriptor; dropping it frees everything,
/// which is this crate's equivalent of the spec's explicit `deinit()` —
/// there is nothing else to release since no handle escapes the registries
/// as a strong pointer.
pub struct Store {
    pub(crate) config: StoreConfig,
    pub(crate) frontend: Arc<dyn SyntaxFrontend>,
    pub(crate) translator: Arc<dyn CTranslator>,
    pub(crate) documents: FxHashMap<Url, Handle>,
    pub(crate) build_files: FxHashMap<Url, crate::build_file::BuildFileDescriptor>,
    pub(crate) std_uri: Option<Url>,
}

impl Store {
    /// `init(config)` (`spec.md` §6). Resolving the std URI from
    /// `config.zig_lib_path` only probes the filesystem for existence (see
    /// [`std_uri_from_lib_path`]), so unlike the spec's signature this never
    /// needs to propagate an I/O error — absence is a normal, representable
    /// outcome (`std_uri: None`), not a failure.
    pub fn init(
        config: StoreConfig,
        frontend: Arc<dyn SyntaxFrontend>,
        translator: Arc<dyn CTranslator>,
    ) -> Self {
        let std_uri = config
            .zig_lib_path
            .as_deref()
            .and_then(std_uri_from_lib_path);
        Self {
            config,
            frontend,
            translator,
            documents: FxHashMap::default(),
            build_files: FxHashMap::default(),
            std_uri,
        }
    }

    /// `lookup`/`getHandle(uri)` (`spec.md` §4.1, §6). No side effects.
    pub fn get_handle(&self, uri: &Url) -> Option<&Handle> {
        self.documents.get(uri)
    }

    /// `open(uri, text)` (`spec.md` §4.1, §6). `text` is ignored on
    /// re-open, per scenario 2 in `spec.md` §8.
    pub fn open(&mut self, uri: Url, text: String) -> Result<&Handle, Error> {
        if self.documents.contains_key(&uri) {
            let is_build_file = {
                let handle = self.documents.get_mut(&uri).expect("just checked");
                handle.count += 1;
                handle.is_build_file
            };
            if is_build_file {
                if let Some(desc) = self.build_files.get_mut(&uri) {
                    desc.refs += 1;
                }
            }
            return Ok(self.documents.get(&uri).expect("just checked"));
        }
        self.new_document(uri.clone(), text)?;
        Ok(self.documents.get(&uri).expect("just inserted"))
    }

    /// `close(uri)` (`spec.md` §4.1, §6). Missing uri is silently ignored.
    pub fn close(&mut self, uri: &Url) {
        self.decrement_count(uri);
    }

    /// `applySave(handle)` (`spec.md` §6). Logs only; the store does not
    /// maintain any state that distinguishes a saved document from an
    /// unsaved one.
    pub fn apply_save(&mut self, uri: &Url) {
        tracing::debug!(%uri, "document saved");
    }

    /// `applyChanges(handle, changes, encoding)` (`spec.md` §6). Splices the
    /// edits into the current text, then runs the refresh pipeline on the
    /// result.
    pub fn apply_changes(
        &mut self,
        uri: &Url,
        changes: &[TextEdit],
        encoding: OffsetEncoding,
    ) -> Result<(), Error> {
        let Some(current) = self.documents.get(uri).map(|h| h.source().to_string()) else {
            return Ok(());
        };
        let new_text = apply_changes(&current, changes, encoding);
        self.refresh(uri, new_text)
    }

    pub fn error_completion_items(&self, uri: &Url) -> Vec<String> {
        self.tag_items(uri, CompletionKind::ErrorSet)
    }

    pub fn enum_completion_items(&self, uri: &Url) -> Vec<String> {
        self.tag_items(uri, CompletionKind::EnumSet)
    }

    fn tag_items(&self, uri: &Url, kind: CompletionKind) -> Vec<String> {
        let Some(base) = self.documents.get(uri) else {
            return Vec::new();
        };
        let imports: Vec<&Handle> = base
            .imports_used
            .iter()
            .filter_map(|u| self.documents.get(u))
            .collect();
        tag_completion_items(base, imports, kind)
    }

    pub(crate) fn include_dirs_for(&self, associated: Option<&Url>) -> Vec<PathBuf> {
        associated
            .and_then(|u| self.build_files.get(u))
            .map(|bf| bf.config.include_dirs.clone())
            .unwrap_or_default()
    }

    /// `newDocument(uri, text)` (`spec.md` §4.3.1).
    ///
    /// Every fallible step (descriptor creation, ancestor-walk association,
    /// import/C-import collection) runs against local state before anything
    /// is written into `self.build_files` or `self.documents`, so an error
    /// partway through never leaves an orphaned build-file descriptor with
    /// no document behind it (`spec.md` §5: "partial-failure inside
    /// `newDocument` must leave the registry unchanged").
    pub(crate) fn new_document(&mut self, uri: Url, text: String) -> Result<(), Error> {
        let tree = self.frontend.parse(&text)?;
        let scope = self.frontend.make_scope(&tree);
        let mut handle = Handle::new(uri.clone(), tree, scope);

        let path = uri_to_path(&uri).ok();
        let mut is_build_file = false;
        let mut new_descriptor = None;

        if let Some(path) = &path {
            let under_std = discovery::is_under_std(path);
            if discovery::is_build_zig_path(path) && !under_std && self.config.has_compiler() {
                new_descriptor = Some(discovery::create_descriptor(&self.config, path)?);
                is_build_file = true;
            } else if !under_std && self.config.has_compiler() {
                handle.associated_build_file = self.classify_associated_build_file(&uri, path)?;
            }
        }

        let raw_imports = self.frontend.collect_imports(&handle.tree);
        for raw in &raw_imports {
            if let Some(resolved) =
                self.uri_from_import_str_inner(&uri, handle.associated_build_file.as_ref(), raw)?
            {
                handle.import_uris.push(resolved);
            }
        }

        let c_nodes = self.frontend.collect_c_import_nodes(&handle.tree);
        let include_dirs = self.include_dirs_for(handle.associated_build_file.as_ref());
        let include_dir_refs: Vec<&std::path::Path> =
            include_dirs.iter().map(|p| p.as_path()).collect();
        handle.c_imports = cimport_cache::collect_fresh(
            &handle.tree,
            &c_nodes,
            self.translator.as_ref(),
            &include_dir_refs,
        );

        // Nothing past this point can fail: commit.
        if let Some(descriptor) = new_descriptor {
            self.build_files.insert(uri.clone(), descriptor);
            self.build_files
                .get_mut(&uri)
                .expect("just inserted")
                .refs += 1;
            tracing::info!(%uri, "registered build-file descriptor");
        }
        if let Some(bf_uri) = &handle.associated_build_file {
            if let Some(desc) = self.build_files.get_mut(bf_uri) {
                desc.refs += 1;
            }
        }
        handle.is_build_file = is_build_file;

        assert!(
            !self.documents.contains_key(&uri),
            "newDocument must not overwrite an existing handle"
        );
        self.documents.insert(uri, handle);
        Ok(())
    }

    /// `newDocumentFromUri(uri)` (`spec.md` §4.8). I/O or parse failure
    /// returns `None`, not an error — the caller treats it as absent.
    pub(crate) fn new_document_from_uri(&mut self, uri: &Url) -> Option<()> {
        let path = uri_to_path(uri).ok()?;
        let text = std::fs::read_to_string(&path).ok()?;
        self.new_document(uri.clone(), text).ok()
    }

    /// `refresh(handle)` (`spec.md` §4.3.2). Builds the new tree, scope,
    /// import set, and C-import records before touching the handle, so a
    /// parse failure leaves the old artifacts in place rather than the
    /// "new text, no tree" state `spec.md` §9 flags as a design wart in the
    /// original.
    pub(crate) fn refresh(&mut self, uri: &Url, new_text: String) -> Result<(), Error> {
        let Some((old_imports_used, associated_build_file)) = self
            .documents
            .get(uri)
            .map(|h| (h.imports_used.clone(), h.associated_build_file.clone()))
        else {
            return Ok(());
        };

        let tree = self.frontend.parse(&new_text)?;
        let scope = self.frontend.make_scope(&tree);

        let raw_imports = self.frontend.collect_imports(&tree);
        let mut import_uris = Vec::new();
        for raw in &raw_imports {
            if let Some(u) = self.uri_from_import_str_inner(uri, associated_build_file.as_ref(), raw)? {
                import_uris.push(u);
            }
        }

        let c_nodes = self.frontend.collect_c_import_nodes(&tree);
        let include_dirs = self.include_dirs_for(associated_build_file.as_ref());
        let include_dir_refs: Vec<&std::path::Path> =
            include_dirs.iter().map(|p| p.as_path()).collect();
        let previous_c_imports = self
            .documents
            .get(uri)
            .expect("checked above")
            .c_imports
            .clone();
        let c_imports = cimport_cache::refresh_with_reuse(
            &tree,
            &c_nodes,
            &previous_c_imports,
            self.translator.as_ref(),
            &include_dir_refs,
        );

        let new_resolvable: Vec<Url> = import_uris
            .iter()
            .cloned()
            .chain(c_imports.iter().filter_map(|r| r.success_uri().cloned()))
            .collect();

        let mut kept = Vec::new();
        let mut removed = Vec::new();
        for old in &old_imports_used {
            if new_resolvable.contains(old) {
                kept.push(old.clone());
            } else {
                removed.push(old.clone());
            }
        }

        if let Some(handle) = self.documents.get_mut(uri) {
            handle.tree = tree;
            handle.scope = scope;
            handle.import_uris = import_uris;
            handle.c_imports = c_imports;
            handle.imports_used = kept;
        }

        for removed_uri in removed {
            self.decrement_count(&removed_uri);
        }
        tracing::debug!(%uri, "document refreshed");
        Ok(())
    }

    /// `decrementCount(uri)` / `close(uri)` (`spec.md` §4.3.3).
    pub(crate) fn decrement_count(&mut self, uri: &Url) {
        let should_cascade = match self.documents.get_mut(uri) {
            None => return,
            Some(handle) => {
                if handle.count == 0 {
                    return;
                }
                handle.count -= 1;
                handle.count == 0
            }
        };
        if !should_cascade {
            return;
        }

        let (associated_build_file, is_build_file, imports_used, handle_uri) = {
            let handle = self.documents.get(uri).expect("present above");
            (
                handle.associated_build_file.clone(),
                handle.is_build_file,
                handle.imports_used.clone(),
                handle.uri.clone(),
            )
        };

        if let Some(bf_uri) = associated_build_file {
            self.decrement_build_file(&bf_uri);
        }
        if is_build_file {
            self.decrement_build_file(&handle_uri);
        }
        for imported in &imports_used {
            self.decrement_count(imported);
        }

        self.documents.remove(&handle_uri);
        tracing::debug!(uri = %handle_uri, "destroyed handle");
    }

    /// Build-file descriptor decrement (`spec.md` §4.3.4). Removes the
    /// descriptor from the registry *before* cascading into the document
    /// decrement, so that if the document's own `is_build_file` cascade
    /// tries to decrement this same descriptor again, it finds the
    /// registry entry already gone and no-ops — the single-step-per-side
    /// termination rule `spec.md` §4.3.4 describes.
    pub(crate) fn decrement_build_file(&mut self, uri: &Url) {
        let should_cascade = match self.build_files.get_mut(uri) {
            None => return,
            Some(desc) => {
                if desc.refs == 0 {
                    return;
                }
                desc.refs -= 1;
                desc.refs == 0
            }
        };
        if !should_cascade {
            return;
        }
        self.build_files.remove(uri);
        tracing::info!(%uri, "destroyed build-file descriptor");
        self.decrement_count(uri);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{NullCTranslator, NullFrontend};
    use crate::uri::path_to_uri;
    use tempfile::TempDir;

    fn plain_store() -> Store {
        Store::init(
            StoreConfig::default(),
            Arc::new(NullFrontend),
            Arc::new(NullCTranslator),
        )
    }

    #[test]
    fn single_open_close_leaves_registry_empty() {
        let mut store = plain_store();
        let uri = Url::parse("file:///a.zig").unwrap();
        store.open(uri.clone(), "const x = 1;\n".to_string()).unwrap();
        assert_eq!(store.get_handle(&uri).unwrap().count, 1);

        store.close(&uri);
        assert!(store.get_handle(&uri).is_none());
        assert!(store.documents.is_empty());
    }

    #[test]
    fn open_twice_close_once_keeps_handle_with_original_text() {
        let mut store = plain_store();
        let uri = Url::parse("file:///a.zig").unwrap();
        store.open(uri.clone(), "const x = 1;\n".to_string()).unwrap();
        store.open(uri.clone(), "const x = 2;\n".to_string()).unwrap();
        assert_eq!(store.get_handle(&uri).unwrap().count, 2);
        assert_eq!(store.get_handle(&uri).unwrap().source(), "const x = 1;\n");

        store.close(&uri);
        assert_eq!(store.get_handle(&uri).unwrap().count, 1);
    }

    #[test]
    fn build_file_walk_associates_and_double_counts_refs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("build.zig"), "").unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        let a_path = src.join("a.zig");
        std::fs::write(&a_path, "const x = 1;").unwrap();

        let json = serde_json::json!({
            "packages": [{"name": "mypkg", "path": "src/a.zig"}],
            "include_dirs": []
        })
        .to_string();
        let zig_script = dir.path().join("fake-zig.sh");
        std::fs::write(&zig_script, format!("#!/bin/sh\ncat <<'EOF'\n{json}\nEOF\n")).unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&zig_script).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&zig_script, perms).unwrap();
        }

        let config = StoreConfig {
            zig_exe_path: Some(zig_script),
            build_runner_path: Some(dir.path().join("build_runner.zig")),
            global_cache_path: Some(dir.path().join("cache")),
            ..Default::default()
        };
        let mut store = Store::init(config, Arc::new(NullFrontend), Arc::new(NullCTranslator));

        let a_uri = path_to_uri(&a_path).unwrap();
        store.open(a_uri.clone(), "const x = 1;".to_string()).unwrap();

        let build_uri = path_to_uri(&dir.path().join("build.zig")).unwrap();
        assert_eq!(
            store.get_handle(&a_uri).unwrap().associated_build_file,
            Some(build_uri.clone())
        );
        assert_eq!(store.build_files.get(&build_uri).unwrap().refs, 2);
    }

    #[test]
    fn import_disappears_destroys_the_imported_handle() {
        let dir = TempDir::new().unwrap();
        let a_path = dir.path().join("a.zig");
        let b_path = dir.path().join("b.zig");
        std::fs::write(&a_path, r#"const b = @import("./b.zig");"#).unwrap();
        std::fs::write(&b_path, "const y = 2;").unwrap();

        let mut store = plain_store();
        let a_uri = path_to_uri(&a_path).unwrap();
        store
            .open(a_uri.clone(), std::fs::read_to_string(&a_path).unwrap())
            .unwrap();
        let b_uri = store.resolve_import(&a_uri, "./b.zig").unwrap().unwrap();
        assert_eq!(store.get_handle(&b_uri).unwrap().count, 1);

        store.apply_changes(&a_uri, &[crate::offsets::TextEdit::Full {
            text: "const nothing = 1;".to_string(),
        }], OffsetEncoding::Utf8).unwrap();

        assert!(store.get_handle(&b_uri).is_none());
        assert!(store.get_handle(&a_uri).unwrap().imports_used.is_empty());
    }

    #[test]
    fn apply_changes_with_empty_list_is_idempotent() {
        let mut store = plain_store();
        let uri = Url::parse("file:///a.zig").unwrap();
        store.open(uri.clone(), "const x = 1;\n".to_string()).unwrap();
        store.apply_changes(&uri, &[], OffsetEncoding::Utf8).unwrap();
        assert_eq!(store.get_handle(&uri).unwrap().source(), "const x = 1;\n");
    }
}

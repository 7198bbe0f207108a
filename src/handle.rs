//! The document handle (`spec.md` §3).

use url::Url;

use crate::cimport_cache::CImportRecord;
use crate::frontend::{DocumentScope, SyntaxTree};

/// One live document. Retained for as long as `count` is nonzero; see
/// [`crate::Store`] for the lifecycle that maintains that invariant.
#[derive(Debug)]
pub struct Handle {
    pub uri: Url,
    pub tree: SyntaxTree,
    pub scope: DocumentScope,

    /// One resolved URI per textual import that resolved to something
    /// (`spec.md` §3, "Import URIs").
    pub import_uris: Vec<Url>,

    /// One record per C-import node whose source was translatable
    /// (`spec.md` §3, "C-imports").
    pub c_imports: Vec<CImportRecord>,

    /// The subset of `import_uris` ∪ successful C-import URIs this handle
    /// actually retains a reference count on (`spec.md` §3, "imports_used").
    pub imports_used: Vec<Url>,

    /// The build file that supplies package visibility and include
    /// directories for this document, if any.
    pub associated_build_file: Option<Url>,

    /// Whether this document *is* the script for a build-file descriptor of
    /// the same URI.
    pub is_build_file: bool,

    /// Number of external holders: client opens plus internal references
    /// from other handles' `imports_used`.
    pub count: u32,
}

impl Handle {
    pub(crate) fn new(uri: Url, tree: SyntaxTree, scope: DocumentScope) -> Self {
        Self {
            uri,
            tree,
            scope,
            import_uris: Vec::new(),
            c_imports: Vec::new(),
            imports_used: Vec::new(),
            associated_build_file: None,
            is_build_file: false,
            count: 1,
        }
    }

    /// The union of resolvable import URIs: textual imports plus successful
    /// C-import translations, in that order (`spec.md` §4.6.2 step 2).
    pub fn resolvable_uris(&self) -> Vec<Url> {
        let mut out = self.import_uris.clone();
        out.extend(self.c_imports.iter().filter_map(|r| r.success_uri().cloned()));
        out
    }

    pub fn source(&self) -> &str {
        self.tree.source()
    }
}

//! Pluggable syntax/translation seams.
//!
//! `spec.md` §1 lists the parser, the scope/symbol analyzer, and the C
//! translator as external collaborators the store only consumes through a
//! handful of functions. This module turns those functions into two small
//! object-safe traits so the rest of the crate never needs to know what a
//! "tree" or a "translator" really is, plus one concrete implementation of
//! each (`NullFrontend` / `NullCTranslator`) that recognizes just enough of
//! the textual `@import("...")` / `@cImport({ @cInclude("...") })`
//! convention to drive every code path in the store and its tests. Neither
//! implementation is a real parser — `spec.md`'s non-goal of parser
//! correctness is preserved.

use std::path::Path;

use url::Url;

use crate::error::Error;

/// A parsed document. Opaque to everything except the frontend that
/// produced it — the store only ever calls back into the frontend with it.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    /// Zero-terminated source text, exactly as the parser received it
    /// (`spec.md` §3: "the terminator matters because the parser accepts
    /// zero-terminated input").
    pub text: String,
}

impl SyntaxTree {
    /// The source text without the trailing NUL sentinel.
    pub fn source(&self) -> &str {
        self.text.strip_suffix('\0').unwrap_or(&self.text)
    }
}

/// The document scope / symbol summary (`spec.md` §3). Only the two named
/// accessors completion aggregation needs (`spec.md` §4.8, "Completion
/// union") are modeled — a name-keyed reflective lookup is explicitly
/// called out in `spec.md` §9 as something a clean re-architecture avoids.
#[derive(Debug, Clone, Default)]
pub struct DocumentScope {
    pub error_completions: Vec<String>,
    pub enum_completions: Vec<String>,
}

/// A C-import node location within a tree. Node indices are assigned by the
/// frontend and are not required to be stable across edits (`spec.md`
/// §4.7.2: "Node indices are not stable across edits, so matching on them
/// is wrong" — the cache key is the content hash, never the index).
pub type CImportNodeIndex = usize;

/// The parser + scope/symbol analyzer collaborator.
pub trait SyntaxFrontend: Send + Sync {
    /// `parse(text) -> tree`. Fails on malformed input.
    fn parse(&self, text: &str) -> Result<SyntaxTree, Error>;
    /// `makeDocumentScope(tree) -> scope`.
    fn make_scope(&self, tree: &SyntaxTree) -> DocumentScope;
    /// `collectImports(tree) -> list of raw import strings`.
    fn collect_imports(&self, tree: &SyntaxTree) -> Vec<String>;
    /// `collectCImportNodes(tree) -> list of node indices`.
    fn collect_c_import_nodes(&self, tree: &SyntaxTree) -> Vec<CImportNodeIndex>;
}

/// Outcome of a single translator invocation (`spec.md` §F: distinct from
/// "the translator returned nothing" — see [`CTranslator::translate`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslateOutcome {
    /// Translation succeeded; the URI names a synthetic translated document.
    Success(Url),
    /// Translation was attempted and failed.
    Failed,
}

/// The C translator collaborator.
pub trait CTranslator: Send + Sync {
    /// `convertCInclude(tree, node) -> C source text or "unsupported"`.
    /// `None` means unsupported.
    fn convert_c_include(&self, tree: &SyntaxTree, node: CImportNodeIndex) -> Option<String>;

    /// `translate(config, include_dirs, source) -> result`. `None` means
    /// absent (the translator declined outright, e.g. a malformed
    /// in-progress edit); `Some` carries a definite success-or-failure
    /// result that is cache-worthy (`spec.md` §F point 2).
    fn translate(&self, include_dirs: &[&Path], source: &str) -> Option<TranslateOutcome>;
}

/// A minimal frontend recognizing `@import("...")` and
/// `@cImport({ ... })` blocks textually. Good enough to exercise every
/// store code path; not a real parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFrontend;

impl SyntaxFrontend for NullFrontend {
    fn parse(&self, text: &str) -> Result<SyntaxTree, Error> {
        if text.contains('\0') {
            return Err(Error::Parse(
                "source text must not contain embedded NUL bytes".to_string(),
            ));
        }
        let mut buf = String::with_capacity(text.len() + 1);
        buf.push_str(text);
        buf.push('\0');
        Ok(SyntaxTree { text: buf })
    }

    fn make_scope(&self, tree: &SyntaxTree) -> DocumentScope {
        DocumentScope {
            error_completions: collect_braced_names(tree.source(), "error{"),
            enum_completions: collect_braced_names(tree.source(), "enum{")
                .into_iter()
                .chain(collect_braced_names(tree.source(), "enum {"))
                .collect(),
        }
    }

    fn collect_imports(&self, tree: &SyntaxTree) -> Vec<String> {
        collect_quoted_calls(tree.source(), "@import(")
    }

    fn collect_c_import_nodes(&self, tree: &SyntaxTree) -> Vec<CImportNodeIndex> {
        let source = tree.source();
        source
            .match_indices("@cImport(")
            .map(|(offset, _)| offset)
            .collect()
    }
}

/// A minimal translator that fabricates content-addressed synthetic document
/// URIs. Recognizes two in-band markers so tests can drive the failure and
/// absent paths deterministically: a source containing `FAIL_TRANSLATE`
/// translates to [`TranslateOutcome::Failed`]; one containing
/// `UNSUPPORTED_TRANSLATE` translates to `None` (absent).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCTranslator;

impl CTranslator for NullCTranslator {
    fn convert_c_include(&self, tree: &SyntaxTree, node: CImportNodeIndex) -> Option<String> {
        let source = tree.source();
        let rest = source.get(node..)?;
        let close = rest.find(')')?;
        let block = &rest[..close];
        let mut includes = String::new();
        for (_, quoted) in find_quoted(block, "@cInclude(") {
            includes.push_str("#include <");
            includes.push_str(&quoted);
            includes.push_str(">\n");
        }
        if includes.is_empty() { None } else { Some(includes) }
    }

    fn translate(&self, _include_dirs: &[&Path], source: &str) -> Option<TranslateOutcome> {
        if source.contains("UNSUPPORTED_TRANSLATE") {
            return None;
        }
        if source.contains("FAIL_TRANSLATE") {
            return Some(TranslateOutcome::Failed);
        }
        // A real translator shells out to the C compiler's AST-to-source
        // backend and writes the result to a cache file; this stands in for
        // that by writing a trivial placeholder module under the content
        // hash, so the resulting URI is a real, openable `file://` URI
        // rather than an address with no document behind it.
        let digest = crate::cimport_cache::hash_c_source(source);
        let dir = std::env::temp_dir().join("docstore-cimport-cache");
        if std::fs::create_dir_all(&dir).is_err() {
            return Some(TranslateOutcome::Failed);
        }
        let path = dir.join(format!("{}.zig", digest.to_hex()));
        if std::fs::write(&path, format!("// translated from C\n// {source}\n")).is_err() {
            return Some(TranslateOutcome::Failed);
        }
        match crate::uri::path_to_uri(&path) {
            Ok(uri) => Some(TranslateOutcome::Success(uri)),
            Err(_) => Some(TranslateOutcome::Failed),
        }
    }
}

fn find_quoted<'a>(text: &'a str, marker: &str) -> Vec<(usize, &'a str)> {
    let mut out = Vec::new();
    let mut rest = text;
    let mut base = 0;
    while let Some(pos) = rest.find(marker) {
        let after = &rest[pos + marker.len()..];
        if let Some(q1) = after.find('"') {
            let tail = &after[q1 + 1..];
            if let Some(q2) = tail.find('"') {
                out.push((base + pos, &tail[..q2]));
                rest = &tail[q2 + 1..];
                base = text.len() - rest.len();
                continue;
            }
        }
        break;
    }
    out
}

fn collect_quoted_calls(text: &str, marker: &str) -> Vec<String> {
    find_quoted(text, marker)
        .into_iter()
        .map(|(_, s)| s.to_string())
        .collect()
}

fn collect_braced_names(text: &str, marker: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(marker) {
        let after = &rest[pos + marker.len()..];
        let Some(close) = after.find('}') else {
            break;
        };
        let body = &after[..close];
        for ident in body.split(',') {
            let ident = ident.trim();
            if !ident.is_empty() {
                names.push(ident.to_string());
            }
        }
        rest = &after[close + 1..];
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_appends_nul_terminator() {
        let tree = NullFrontend.parse("const x = 1;").unwrap();
        assert!(tree.text.ends_with('\0'));
        assert_eq!(tree.source(), "const x = 1;");
    }

    #[test]
    fn parse_rejects_embedded_nul() {
        assert!(NullFrontend.parse("a\0b").is_err());
    }

    #[test]
    fn collect_imports_finds_quoted_strings() {
        let tree = NullFrontend.parse(r#"const std = @import("std"); const b = @import("builtin");"#).unwrap();
        let imports = NullFrontend.collect_imports(&tree);
        assert_eq!(imports, vec!["std".to_string(), "builtin".to_string()]);
    }

    #[test]
    fn collect_c_import_nodes_finds_byte_offsets() {
        let text = r#"const c = @cImport({ @cInclude("stdio.h"); });"#;
        let tree = NullFrontend.parse(text).unwrap();
        let nodes = NullFrontend.collect_c_import_nodes(&tree);
        assert_eq!(nodes, vec![text.find("@cImport(").unwrap()]);
    }

    #[test]
    fn convert_c_include_extracts_includes() {
        let text = r#"const c = @cImport({ @cInclude("stdio.h"); @cInclude("stdlib.h"); });"#;
        let tree = NullFrontend.parse(text).unwrap();
        let node = NullFrontend.collect_c_import_nodes(&tree)[0];
        let source = NullCTranslator.convert_c_include(&tree, node).unwrap();
        assert_eq!(source, "#include <stdio.h>\n#include <stdlib.h>\n");
    }

    #[test]
    fn convert_c_include_unsupported_without_includes() {
        let text = r#"const c = @cImport({});"#;
        let tree = NullFrontend.parse(text).unwrap();
        let node = NullFrontend.collect_c_import_nodes(&tree)[0];
        assert!(NullCTranslator.convert_c_include(&tree, node).is_none());
    }

    #[test]
    fn translate_markers_control_outcome() {
        assert!(matches!(
            NullCTranslator.translate(&[], "#include <stdio.h>\n"),
            Some(TranslateOutcome::Success(_))
        ));
        assert_eq!(
            NullCTranslator.translate(&[], "FAIL_TRANSLATE"),
            Some(TranslateOutcome::Failed)
        );
        assert_eq!(
            NullCTranslator.translate(&[], "UNSUPPORTED_TRANSLATE"),
            None
        );
    }
}

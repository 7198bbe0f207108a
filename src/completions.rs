//! Tag-symbol union for completion aggregation (`spec.md` §4.8).

use std::collections::HashSet;

use crate::handle::Handle;

/// Which named symbol set to union across a handle and its transitively
/// used imports. Two well-typed accessors, per `spec.md` §9's guidance to
/// avoid a name-keyed reflective lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    ErrorSet,
    EnumSet,
}

fn names<'a>(handle: &'a Handle, kind: CompletionKind) -> &'a [String] {
    match kind {
        CompletionKind::ErrorSet => &handle.scope.error_completions,
        CompletionKind::EnumSet => &handle.scope.enum_completions,
    }
}

/// Union `kind`'s named set on `base` with the same set on every handle in
/// `used_imports`, deduplicated by name with first-seen order preserved.
pub fn tag_completion_items<'a>(
    base: &Handle,
    used_imports: impl IntoIterator<Item = &'a Handle>,
    kind: CompletionKind,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in names(base, kind) {
        if seen.insert(name.clone()) {
            out.push(name.clone());
        }
    }
    for handle in used_imports {
        for name in names(handle, kind) {
            if seen.insert(name.clone()) {
                out.push(name.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{DocumentScope, SyntaxTree};
    use url::Url;

    fn handle_with(error_completions: &[&str], enum_completions: &[&str]) -> Handle {
        let uri = Url::parse("file:///tmp/x.zig").unwrap();
        let tree = SyntaxTree { text: "\0".to_string() };
        let scope = DocumentScope {
            error_completions: error_completions.iter().map(|s| s.to_string()).collect(),
            enum_completions: enum_completions.iter().map(|s| s.to_string()).collect(),
        };
        Handle::new(uri, tree, scope)
    }

    #[test]
    fn unions_and_deduplicates_preserving_order() {
        let base = handle_with(&["Foo", "Bar"], &[]);
        let import1 = handle_with(&["Bar", "Baz"], &[]);
        let items = tag_completion_items(&base, [&import1], CompletionKind::ErrorSet);
        assert_eq!(items, vec!["Foo".to_string(), "Bar".to_string(), "Baz".to_string()]);
    }
}

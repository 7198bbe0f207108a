//! The edit-offset calculator (`spec.md` §1 lists it as external-by-interface)
//! and `applyChanges` text-splicing semantics (`spec.md` §6).

/// Offset encoding a range's `character` fields are measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetEncoding {
    Utf8,
    Utf16,
    Utf32,
}

/// A zero-based line/character position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// A half-open `[start, end)` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// One text-document edit, as sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEdit {
    Range { range: Range, text: String },
    Full { text: String },
}

/// Convert a `Position` into a byte offset into `text` under `encoding`.
/// Clamps past end-of-line/end-of-text rather than panicking, since a
/// client-sent position that races a concurrent edit is not this module's
/// concern to reject.
fn position_to_byte_offset(text: &str, pos: Position, encoding: OffsetEncoding) -> usize {
    let mut line_start = 0usize;
    let mut lines_seen = 0u32;
    let mut iter = text.char_indices().peekable();

    while lines_seen < pos.line {
        match iter.next() {
            Some((idx, '\n')) => {
                lines_seen += 1;
                line_start = idx + 1;
            }
            Some(_) => {}
            None => return text.len(),
        }
    }

    let rest = &text[line_start..];
    let mut units = 0u32;
    for (byte_offset, ch) in rest.char_indices() {
        if ch == '\n' || units >= pos.character {
            return line_start + byte_offset;
        }
        units += match encoding {
            OffsetEncoding::Utf8 => ch.len_utf8() as u32,
            OffsetEncoding::Utf16 => ch.len_utf16() as u32,
            OffsetEncoding::Utf32 => 1,
        };
    }
    line_start + rest.len()
}

fn range_to_byte_span(text: &str, range: Range, encoding: OffsetEncoding) -> (usize, usize) {
    let start = position_to_byte_offset(text, range.start, encoding);
    let end = position_to_byte_offset(text, range.end, encoding);
    (start, end)
}

/// Apply `changes` to `base_text`, implementing `spec.md` §6's
/// `applyChanges` semantics: the last full-text replacement (if any) wins
/// as the starting point, and only the edits strictly after it apply.
pub fn apply_changes(base_text: &str, changes: &[TextEdit], encoding: OffsetEncoding) -> String {
    let last_full = changes
        .iter()
        .rposition(|c| matches!(c, TextEdit::Full { .. }));

    let (mut text, remaining): (String, &[TextEdit]) = match last_full {
        Some(idx) => {
            let TextEdit::Full { text } = &changes[idx] else {
                unreachable!()
            };
            (text.clone(), &changes[idx + 1..])
        }
        None => (base_text.to_string(), changes),
    };

    for change in remaining {
        match change {
            TextEdit::Full { text: new_text } => {
                text = new_text.clone();
            }
            TextEdit::Range { range, text: insert } => {
                let (start, end) = range_to_byte_span(&text, *range, encoding);
                text.replace_range(start..end, insert);
            }
        }
    }
    text
}

//! Rust syntax spans via tree-sitter.
//!
//! [`RustSyntax`] compiles tree-sitter-rust's bundled highlight query once
//! and maps each capture name onto a [`SyntaxKind`]. Every call to
//! [`derive`](SyntaxProvider::derive) parses from scratch with a fresh
//! `Parser`, so one provider can serve many worker threads at once.
//!
//! Captures that map to no kind (plain identifiers, labels) produce no
//! span. Nested captures are emitted in query order; a consumer that
//! paints spans in order gets "more specific wins".

use ropey::Rope;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Parser, Query, QueryCursor};

use crate::syntax::{SyntaxKind, SyntaxProvider, SyntaxSpan};

// ---------------------------------------------------------------------------
// RustSyntax
// ---------------------------------------------------------------------------

pub struct RustSyntax {
    language: Language,
    query: Query,
    /// Kind for each capture index.
    kinds: Vec<Option<SyntaxKind>>,
}

impl RustSyntax {
    /// Compile the grammar and query. Returns `None` if the bundled query
    /// does not compile against the linked grammar.
    #[must_use]
    pub fn new() -> Option<Self> {
        let language: Language = tree_sitter_rust::LANGUAGE.into();
        let query = Query::new(&language, tree_sitter_rust::HIGHLIGHTS_QUERY).ok()?;
        let kinds = query.capture_names().iter().map(|name| capture_kind(name)).collect();
        Some(Self {
            language,
            query,
            kinds,
        })
    }
}

impl SyntaxProvider for RustSyntax {
    fn name(&self) -> &str {
        "rust"
    }

    fn derive(&self, text: &str) -> Vec<SyntaxSpan> {
        let mut parser = Parser::new();
        if parser.set_language(&self.language).is_err() {
            return Vec::new();
        }
        let Some(tree) = parser.parse(text, None) else {
            return Vec::new();
        };

        let rope = Rope::from_str(text);
        let mut spans = Vec::new();
        let mut cursor = QueryCursor::new();
        let mut captures = cursor.captures(&self.query, tree.root_node(), text.as_bytes());
        while let Some((m, _)) = captures.next() {
            for capture in m.captures {
                let Some(&Some(kind)) = self.kinds.get(capture.index as usize) else {
                    continue;
                };
                let kind = match capture.node.kind() {
                    "integer_literal" | "float_literal" => SyntaxKind::Number,
                    _ => kind,
                };
                let start = rope.byte_to_char(capture.node.start_byte());
                let end = rope.byte_to_char(capture.node.end_byte());
                if start < end {
                    spans.push(SyntaxSpan::new(start, end, kind));
                }
            }
        }
        spans
    }
}

impl std::fmt::Debug for RustSyntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustSyntax")
            .field("captures", &self.kinds.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Capture mapping
// ---------------------------------------------------------------------------

#[allow(clippy::match_same_arms)]
fn capture_kind(name: &str) -> Option<SyntaxKind> {
    let kind = match name {
        "keyword" => SyntaxKind::Keyword,
        "string" | "escape" => SyntaxKind::String,
        "comment" | "comment.documentation" => SyntaxKind::Comment,
        "function" | "function.method" | "function.macro" => SyntaxKind::Function,
        "type" | "type.builtin" | "constructor" => SyntaxKind::Type,
        "constant" | "constant.builtin" => SyntaxKind::Constant,
        "operator" => SyntaxKind::Operator,
        "punctuation.bracket" | "punctuation.delimiter" => SyntaxKind::Punctuation,
        "variable.parameter" | "variable.builtin" | "property" => SyntaxKind::Variable,
        "attribute" => SyntaxKind::Attribute,
        "label" => SyntaxKind::Other,
        _ => return None,
    };
    Some(kind)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_at(spans: &[SyntaxSpan], offset: usize) -> Vec<SyntaxKind> {
        spans
            .iter()
            .filter(|s| s.start <= offset && offset < s.end)
            .map(|s| s.kind)
            .collect()
    }

    #[test]
    fn compiles_bundled_query() {
        let rs = RustSyntax::new().unwrap();
        assert_eq!(rs.name(), "rust");
    }

    #[test]
    fn keyword_and_function() {
        let rs = RustSyntax::new().unwrap();
        let spans = rs.derive("fn main() {}");
        assert!(kinds_at(&spans, 0).contains(&SyntaxKind::Keyword));
        assert!(kinds_at(&spans, 3).contains(&SyntaxKind::Function));
    }

    #[test]
    fn comment_and_string() {
        let rs = RustSyntax::new().unwrap();
        let src = "// hi\nlet s = \"x\";";
        let spans = rs.derive(src);
        assert!(kinds_at(&spans, 1).contains(&SyntaxKind::Comment));
        let quote = src.find('"').unwrap();
        assert!(kinds_at(&spans, quote).contains(&SyntaxKind::String));
    }

    #[test]
    fn offsets_are_chars_not_bytes() {
        let rs = RustSyntax::new().unwrap();
        // "é" is two bytes; the keyword after it starts at char 6.
        let src = "// é\n\nfn f() {}";
        let spans = rs.derive(src);
        let fn_at = src.chars().position(|c| c == 'f').unwrap();
        assert_eq!(fn_at, 6);
        assert!(kinds_at(&spans, fn_at).contains(&SyntaxKind::Keyword));
    }

    #[test]
    fn numeric_literals_are_numbers() {
        let rs = RustSyntax::new().unwrap();
        let src = "const N: u32 = 42;";
        let spans = rs.derive(src);
        let at = src.find("42").unwrap();
        assert!(kinds_at(&spans, at).contains(&SyntaxKind::Number));
    }

    #[test]
    fn empty_text_has_no_spans() {
        let rs = RustSyntax::new().unwrap();
        assert!(rs.derive("").is_empty());
    }

    #[test]
    fn unknown_capture_maps_to_none() {
        assert_eq!(capture_kind("variable"), None);
        assert_eq!(capture_kind("keyword"), Some(SyntaxKind::Keyword));
    }
}

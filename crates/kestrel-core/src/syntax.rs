//! Syntax spans and the per-buffer overlay that holds them.
//!
//! Span derivation is pluggable: anything implementing [`SyntaxProvider`]
//! can turn buffer text into [`SyntaxSpan`]s. The results land in the
//! buffer's [`SyntaxOverlay`], tagged with the content generation they were
//! computed against. A result computed for an older generation is stale and
//! is dropped on arrival.
//!
//! Between an edit and the arrival of fresh spans, the overlay keeps what it
//! can: spans entirely before the edit stay put, spans entirely after it
//! shift by the size change, and spans touching the edited range are
//! dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

// ---------------------------------------------------------------------------
// SyntaxKind / SyntaxSpan
// ---------------------------------------------------------------------------

/// Semantic category of a span. Colors are the display's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    Keyword,
    Type,
    Function,
    String,
    Comment,
    Number,
    Constant,
    Operator,
    Punctuation,
    Variable,
    Attribute,
    Other,
}

/// A styled `[start, end)` range of char offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyntaxSpan {
    pub start: usize,
    pub end: usize,
    pub kind: SyntaxKind,
}

impl SyntaxSpan {
    #[inline]
    #[must_use]
    pub const fn new(start: usize, end: usize, kind: SyntaxKind) -> Self {
        Self { start, end, kind }
    }
}

// ---------------------------------------------------------------------------
// SyntaxOverlay
// ---------------------------------------------------------------------------

/// Spans attached to one buffer.
#[derive(Debug, Clone, Default)]
pub struct SyntaxOverlay {
    spans: Vec<SyntaxSpan>,
    /// Generation the spans were derived from (before any local shifting).
    generation: u64,
}

impl SyntaxOverlay {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            spans: Vec::new(),
            generation: 0,
        }
    }

    /// All spans, sorted by start offset.
    #[inline]
    #[must_use]
    pub fn spans(&self) -> &[SyntaxSpan] {
        &self.spans
    }

    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Spans that overlap `[start, end)`.
    pub fn spans_in(&self, start: usize, end: usize) -> impl Iterator<Item = &SyntaxSpan> {
        self.spans
            .iter()
            .filter(move |s| s.start < end && start < s.end)
    }

    /// Adjust for an edit that replaced `[start, old_end)` with text now
    /// occupying `[start, new_end)`.
    pub fn invalidate(&mut self, start: usize, old_end: usize, new_end: usize) {
        self.spans.retain_mut(|span| {
            if span.end <= start {
                true
            } else if span.start >= old_end {
                // span.start >= old_end, so this cannot underflow.
                span.start = span.start + new_end - old_end;
                span.end = span.end + new_end - old_end;
                true
            } else {
                false
            }
        });
    }

    /// Replace the spans with a derived result if it was computed against
    /// `latest`, the buffer's current generation. Returns whether the
    /// result was applied.
    pub fn apply(&mut self, latest: u64, generation: u64, mut spans: Vec<SyntaxSpan>) -> bool {
        if generation != latest {
            debug!(generation, latest, "discarding stale syntax result");
            return false;
        }
        spans.sort_by_key(|s| (s.start, s.end));
        self.spans = spans;
        self.generation = generation;
        true
    }

    pub fn clear(&mut self) {
        self.spans.clear();
    }
}

// ---------------------------------------------------------------------------
// SyntaxProvider
// ---------------------------------------------------------------------------

/// Derives spans from a snapshot of buffer text. Implementations run on
/// worker threads, so they must not hold per-call mutable state.
pub trait SyntaxProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Spans for `text`, in char offsets.
    fn derive(&self, text: &str) -> Vec<SyntaxSpan>;
}

/// Provider that never styles anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainSyntax;

impl SyntaxProvider for PlainSyntax {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn derive(&self, _text: &str) -> Vec<SyntaxSpan> {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// SyntaxRegistry
// ---------------------------------------------------------------------------

/// Providers keyed by file extension (without the dot).
#[derive(Default)]
pub struct SyntaxRegistry {
    by_extension: HashMap<String, Arc<dyn SyntaxProvider>>,
}

impl SyntaxRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map every extension in `extensions` to `provider`. Later
    /// registrations win.
    pub fn register<I, S>(&mut self, extensions: I, provider: &Arc<dyn SyntaxProvider>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for ext in extensions {
            let ext = ext.as_ref().trim_start_matches('.').to_ascii_lowercase();
            self.by_extension.insert(ext, Arc::clone(provider));
        }
    }

    /// Provider for a file name or path, by its extension.
    #[must_use]
    pub fn for_name(&self, name: &str) -> Option<Arc<dyn SyntaxProvider>> {
        let (_, ext) = name.rsplit_once('.')?;
        self.by_extension.get(&ext.to_ascii_lowercase()).cloned()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }
}

impl fmt::Debug for SyntaxRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exts: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        exts.sort_unstable();
        f.debug_struct("SyntaxRegistry")
            .field("extensions", &exts)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> SyntaxSpan {
        SyntaxSpan::new(start, end, SyntaxKind::Keyword)
    }

    fn overlay(spans: Vec<SyntaxSpan>) -> SyntaxOverlay {
        let mut o = SyntaxOverlay::new();
        assert!(o.apply(1, 1, spans));
        o
    }

    // -- invalidate ---------------------------------------------------------

    #[test]
    fn invalidate_keeps_spans_before_edit() {
        let mut o = overlay(vec![span(0, 3), span(10, 12)]);
        o.invalidate(5, 5, 7);
        assert_eq!(o.spans(), &[span(0, 3), span(12, 14)]);
    }

    #[test]
    fn invalidate_shifts_left_on_delete() {
        let mut o = overlay(vec![span(10, 12)]);
        o.invalidate(2, 6, 2);
        assert_eq!(o.spans(), &[span(6, 8)]);
    }

    #[test]
    fn invalidate_drops_overlapping_spans() {
        let mut o = overlay(vec![span(0, 4), span(3, 8), span(8, 9)]);
        o.invalidate(4, 6, 6);
        assert_eq!(o.spans(), &[span(0, 4), span(8, 9)]);
    }

    #[test]
    fn insert_inside_span_drops_it() {
        let mut o = overlay(vec![span(2, 6)]);
        o.invalidate(4, 4, 5);
        assert!(o.spans().is_empty());
    }

    // -- apply --------------------------------------------------------------

    #[test]
    fn stale_result_is_discarded() {
        let mut o = overlay(vec![span(0, 1)]);
        assert!(!o.apply(3, 2, vec![span(5, 6)]));
        assert_eq!(o.spans(), &[span(0, 1)]);
        assert_eq!(o.generation(), 1);
    }

    #[test]
    fn apply_sorts_spans() {
        let mut o = SyntaxOverlay::new();
        o.apply(4, 4, vec![span(5, 6), span(0, 2)]);
        assert_eq!(o.spans(), &[span(0, 2), span(5, 6)]);
        assert_eq!(o.generation(), 4);
    }

    #[test]
    fn spans_in_filters_by_overlap() {
        let o = overlay(vec![span(0, 2), span(4, 6), span(8, 10)]);
        let hits: Vec<_> = o.spans_in(5, 9).copied().collect();
        assert_eq!(hits, vec![span(4, 6), span(8, 10)]);
    }

    // -- registry -----------------------------------------------------------

    #[test]
    fn registry_looks_up_by_extension() {
        let mut reg = SyntaxRegistry::new();
        let plain: Arc<dyn SyntaxProvider> = Arc::new(PlainSyntax);
        reg.register([".TXT", "md"], &plain);
        assert_eq!(reg.for_name("notes.txt").map(|p| p.name().to_string()), Some("plain".into()));
        assert!(reg.for_name("dir/readme.MD").is_some());
        assert!(reg.for_name("main.rs").is_none());
        assert!(reg.for_name("Makefile").is_none());
    }

    #[test]
    fn plain_syntax_yields_nothing() {
        assert!(PlainSyntax.derive("fn main() {}").is_empty());
    }
}

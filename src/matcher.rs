//! Reference matching: find citation spans in rendered text and split
//! composite matches into their atomic references.
//!
//! The grammar is declarative. A [`Grammar`] is a list of book names, the
//! shape of what follows a book (chapter, optional verses, optional unit
//! suffix) and the joiner between units. Compiling it yields a
//! [`ReferenceMatcher`] holding two regexes: one atomic unit, and the
//! composite `unit (joiner unit)*`. Swapping citation domains means swapping
//! the `Grammar`, nothing else.

use crate::books::BOOKS;
use crate::models::{CitationSpan, SubReference};
use regex::Regex;
use std::sync::LazyLock;

#[cfg(test)]
#[path = "matcher_test.rs"]
mod matcher_test;

/// Characters of slack granted past a sub-reference's end when deciding
/// which sub-reference the cursor is over.
pub const CURSOR_FORGIVENESS: usize = 2;

/// Chapter (or chapter range), then optional `:verses` / `장 verses`, then an
/// optional `장`/`절` unit suffix. Verse lists join with `,` without spaces so
/// that `, 1 John` is read as a new unit rather than verse 1.
const UNIT_TAIL: &str =
    r"\.?\s*\d+(?:\s*[-~–]\s*\d+)?(?:\s*[:장]\s*\d+(?:[-~–,]\d+)*)?(?:\s*[장절])?";

const JOINER: &str = r"\s*[,;]\s*";

// ============================================================================
// Grammar
// ============================================================================

#[derive(Debug, Clone)]
pub struct Grammar {
    pub books: Vec<String>,
    pub unit_tail: String,
    pub joiner: String,
}

impl Grammar {
    pub fn from_books<I, S>(books: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            books: books.into_iter().map(Into::into).collect(),
            unit_tail: UNIT_TAIL.to_string(),
            joiner: JOINER.to_string(),
        }
    }

    /// Korean full names and abbreviations (`요한복음 3:16`, `요 3장`).
    pub fn korean() -> Self {
        Self::from_books(BOOKS.iter().flat_map(|b| b.korean_names()))
    }

    /// English names and abbreviations (`John 3:16`, `1 Cor 13`).
    pub fn english() -> Self {
        Self::from_books(BOOKS.iter().flat_map(|b| b.english.iter().copied()))
    }

    /// Korean and English together.
    pub fn standard() -> Self {
        let mut grammar = Self::korean();
        grammar.books.extend(Self::english().books);
        grammar
    }

    /// Regex alternation over every book name, longest first.
    pub fn book_alternation(&self) -> String {
        let mut names: Vec<&str> = self.books.iter().map(String::as_str).collect();
        // Regex alternation is leftmost-first: "요한복음" must be tried before "요".
        names.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        names.dedup();
        names
            .iter()
            .map(|n| regex::escape(n).replace(' ', r"\s*"))
            .collect::<Vec<_>>()
            .join("|")
    }

    fn unit_pattern(&self) -> String {
        format!(r"\b(?:{}){}", self.book_alternation(), self.unit_tail)
    }

    pub fn compile(&self) -> Result<ReferenceMatcher, regex::Error> {
        let unit = self.unit_pattern();
        let composite = format!("{unit}(?:{joiner}{unit})*", joiner = self.joiner);
        Ok(ReferenceMatcher {
            unit: Regex::new(&unit)?,
            composite: Regex::new(&composite)?,
        })
    }
}

// ============================================================================
// Matcher
// ============================================================================

static STANDARD: LazyLock<ReferenceMatcher> = LazyLock::new(|| {
    Grammar::standard()
        .compile()
        .expect("built-in book grammar must compile")
});

#[derive(Debug, Clone)]
pub struct ReferenceMatcher {
    unit: Regex,
    composite: Regex,
}

impl Default for ReferenceMatcher {
    fn default() -> Self {
        STANDARD.clone()
    }
}

impl ReferenceMatcher {
    /// All composite citation spans in `text`, left to right. Each call
    /// scans from the start; nothing is carried between calls.
    pub fn find_matches<'a>(&'a self, text: &'a str) -> impl Iterator<Item = CitationSpan> + 'a {
        self.composite.find_iter(text).map(|m| CitationSpan {
            text: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
        })
    }

    /// The span containing byte `offset`, if any.
    pub fn match_at(&self, text: &str, offset: usize) -> Option<CitationSpan> {
        self.find_matches(text).find(|span| span.contains(offset))
    }

    /// Split a composite match into its atomic references.
    pub fn split_composite(&self, match_text: &str) -> Vec<SubReference> {
        self.unit
            .find_iter(match_text)
            .map(|m| SubReference {
                text: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
            })
            .collect()
    }
}

/// Index of the sub-reference the cursor is over.
///
/// `cursor` is a byte offset relative to the start of `match_text`. The first
/// sub-reference whose end (plus [`CURSOR_FORGIVENESS`] characters) reaches
/// the cursor wins; falls back to 0.
pub fn sub_reference_index(subs: &[SubReference], match_text: &str, cursor: usize) -> usize {
    let cursor_chars = char_offset(match_text, cursor);
    subs.iter()
        .position(|s| char_offset(match_text, s.end) + CURSOR_FORGIVENESS >= cursor_chars)
        .unwrap_or(0)
}

/// Number of characters before byte offset `byte`.
fn char_offset(text: &str, byte: usize) -> usize {
    text.char_indices().take_while(|(i, _)| *i < byte).count()
}

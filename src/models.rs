//! Data models for the verse preview.
//!
//! This module contains the core data structures shared between the matcher,
//! the lookup client and service, the popup and the highlight store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Matcher Output
// ============================================================================

/// A recognized citation inside one text node. Offsets are byte offsets into
/// the node's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl CitationSpan {
    /// Whether a byte offset into the node falls inside this span. The end
    /// offset is inclusive so that a caret resting right after the last
    /// character still counts.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset <= self.end
    }
}

/// One atomic citation out of a composite match. Offsets are byte offsets
/// relative to the composite's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubReference {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

// ============================================================================
// Popup Content
// ============================================================================

/// One resolved reading for one sub-reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub label: String,
    pub content: String,
    pub footer: String,
    /// Highlight-store key (normalized reference).
    pub storage_key: String,
}

// ============================================================================
// Highlights
// ============================================================================

/// `storage_key -> highlighted substrings`, in insertion order.
pub type HighlightMap = BTreeMap<String, Vec<String>>;

/// The persisted settings blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub highlights: HighlightMap,
}

/// Snapshot of one key's list taken before an effective mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoFrame {
    pub key: String,
    pub previous: Vec<String>,
}

// ============================================================================
// Lookup Wire Format
// ============================================================================

/// Prefix a result subtitle must carry to count as a verse entry.
pub const VALID_ENTRY_PREFIX: &str = "Enter:";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchItem {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pure_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mods: Option<SearchMods>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<SearchIcon>,
    #[serde(default = "default_valid")]
    pub valid: bool,
}

fn default_valid() -> bool {
    true
}

impl SearchItem {
    /// Informational row (prompt or "no result"), never a verse entry.
    pub fn info(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            valid: false,
            ..Default::default()
        }
    }

    pub fn is_verse_entry(&self) -> bool {
        self.subtitle.starts_with(VALID_ENTRY_PREFIX)
    }
}

/// Alternate copy payloads keyed by modifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMods {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<SearchMod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<SearchMod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMod {
    pub valid: bool,
    pub arg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIcon {
    pub path: String,
}

// ============================================================================
// Notices
// ============================================================================

/// Transient user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    HighlightSaved,
    AlreadyHighlighted,
    HighlightRemoved(usize),
    NothingToRemove,
    Undone,
    NothingToUndo,
    HighlightsCleared,
    ServiceRestarted,
    ServiceFailed(String),
    StorageFailed(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::HighlightSaved => write!(f, "Highlight saved"),
            Notice::AlreadyHighlighted => write!(f, "Already highlighted"),
            Notice::HighlightRemoved(n) => write!(f, "Removed {} highlight(s)", n),
            Notice::NothingToRemove => write!(f, "No highlight inside the selection"),
            Notice::Undone => write!(f, "Undone"),
            Notice::NothingToUndo => write!(f, "Nothing to undo"),
            Notice::HighlightsCleared => write!(f, "All highlights cleared"),
            Notice::ServiceRestarted => write!(f, "Bible server restarted"),
            Notice::ServiceFailed(msg) => write!(f, "Bible server error: {}", msg),
            Notice::StorageFailed(msg) => write!(f, "Could not save highlights: {}", msg),
        }
    }
}

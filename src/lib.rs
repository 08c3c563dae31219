//! Verse reference hover preview.
//!
//! Recognizes Bible references in rendered text, previews the verses in a
//! tabbed popup after a short hover, and keeps per-passage highlights with
//! undo. Also ships the verse lookup service the popup queries and a
//! supervisor for running it as a local process.

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub mod annotator;
pub mod bible;
pub mod books;
pub mod config;
pub mod document;
pub mod error;
pub mod handlers;
pub mod highlights;
pub mod hover;
pub mod logging;
pub mod lookup;
pub mod matcher;
pub mod models;
pub mod popup;
pub mod runtime;
pub mod session;
pub mod supervisor;

// ============================================================================
// Configuration
// ============================================================================

pub const SERVER_URL: &str = "http://127.0.0.1:8000";
pub const BIND_ADDR: &str = "127.0.0.1:8000";
pub const BIBLE_PATH: &str = "bible.json";
pub const DB_PATH: &str = ".verses_db";

// ============================================================================
// Application State
// ============================================================================

/// Shared state of the lookup service.
pub struct AppState {
    pub bible: bible::BibleIndex,
}

impl AppState {
    /// Load the verse table named by `config`. A missing or broken table is
    /// logged and served as empty, so every query answers "no result".
    pub fn new(config: &config::Config) -> Self {
        let bible = match bible::BibleIndex::load(&config.bible_path) {
            Ok(bible) => {
                info!("Loaded {} verses from {}", bible.len(), config.bible_path.display());
                bible
            }
            Err(e) => {
                warn!("Error loading verse table: {}", e);
                bible::BibleIndex::default()
            }
        };
        Self::with_bible(bible)
    }

    pub fn with_bible(bible: bible::BibleIndex) -> Self {
        Self { bible }
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// Settings store in the sled database at `path`.
pub fn open_settings_store(path: impl AsRef<Path>) -> error::Result<highlights::SledSettingsStore> {
    let db = sled::open(path)?;
    highlights::SledSettingsStore::open(&db)
}

/// A preview session talking HTTP to `config.server_url` and persisting
/// highlights under `config.db_path`.
pub fn open_preview<H: document::Host>(
    host: H,
    config: &config::Config,
) -> error::Result<session::PreviewSession<H, lookup::HttpLookupService, highlights::SledSettingsStore>> {
    let service = lookup::HttpLookupService::new(config.server_url.clone())?;
    let store = open_settings_store(&config.db_path)?;
    Ok(session::PreviewSession::new(
        host,
        matcher::ReferenceMatcher::default(),
        lookup::LookupClient::new(Arc::new(service)),
        highlights::HighlightStore::load(store),
        config.timings,
        config.keys.clone(),
    ))
}

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use models::{CitationSpan, HighlightMap, Notice, SearchItem, SearchResponse, Settings, SubReference, Tab};

pub use matcher::{sub_reference_index, Grammar, ReferenceMatcher, CURSOR_FORGIVENESS};

pub use hover::{HoverAction, HoverTarget, HoverTimings, HoverTracker, OpenRequest, PointerTarget};

pub use highlights::{HighlightStore, MemorySettingsStore, SettingsStore, SledSettingsStore, UNDO_CAPACITY};

pub use lookup::{HttpLookupService, LookupClient, LookupService};

pub use popup::PopupSession;

pub use session::{KeyBindings, KeyPress, PreviewSession};

pub use runtime::{PreviewEvent, PreviewHandle, PreviewRuntime};

pub use supervisor::{ServiceStatus, ServiceSupervisor};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::testing::MemoryDocument;

    #[test]
    fn test_app_state_survives_missing_table() {
        let config = Config {
            bible_path: "/nonexistent/bible.json".into(),
            ..Config::default()
        };
        let state = AppState::new(&config);
        assert!(state.bible.is_empty());
        assert_eq!(state.bible.search("사랑").items[0].title, "검색 결과 없음");
    }

    #[test]
    fn test_open_preview_uses_configured_database() {
        let dir = std::env::temp_dir().join(format!("verses-lib-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let config = Config {
            db_path: dir.clone(),
            ..Config::default()
        };

        let mut session = open_preview(MemoryDocument::new(&["John 3:16"]), &config).unwrap();
        assert!(session.highlights().highlights().is_empty());
        assert_eq!(session.annotate(), 1);
        assert!(dir.exists());
        drop(session);
        let _ = std::fs::remove_dir_all(&dir);
    }
}

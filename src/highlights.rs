//! Per-reference highlights with bounded undo, persisted as one settings
//! blob in sled.
//!
//! Every write stores the full blob under a single key and flushes, so a
//! crash never leaves a half-written map behind.

use crate::error::Result;
use crate::models::{HighlightMap, Settings, UndoFrame};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

const SETTINGS_TREE: &str = "settings";
const SETTINGS_KEY: &str = "data";

/// Maximum number of undo frames kept.
pub const UNDO_CAPACITY: usize = 30;

// ============================================================================
// Settings Persistence
// ============================================================================

/// Opaque load/save store for the settings blob.
pub trait SettingsStore {
    fn load(&self) -> Result<Option<Settings>>;
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Settings stored as one JSON value in a sled tree.
#[derive(Clone)]
pub struct SledSettingsStore {
    tree: sled::Tree,
}

impl SledSettingsStore {
    pub fn open(db: &sled::Db) -> Result<Self> {
        Ok(Self {
            tree: db.open_tree(SETTINGS_TREE)?,
        })
    }
}

impl SettingsStore for SledSettingsStore {
    fn load(&self) -> Result<Option<Settings>> {
        match self.tree.get(SETTINGS_KEY)? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_vec(settings)?;
        self.tree.insert(SETTINGS_KEY, json)?;
        self.tree.flush()?;
        Ok(())
    }
}

/// In-process store, used when no database is configured and by tests.
#[derive(Clone, Default)]
pub struct MemorySettingsStore {
    inner: Arc<Mutex<Option<Settings>>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last saved blob.
    pub fn snapshot(&self) -> Option<Settings> {
        self.inner.lock().map(|s| s.clone()).unwrap_or(None)
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Option<Settings>> {
        Ok(self.snapshot())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = Some(settings.clone());
        }
        Ok(())
    }
}

// ============================================================================
// Undo History
// ============================================================================

/// Bounded stack of undo frames; pushing past capacity drops the oldest.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    frames: VecDeque<UndoFrame>,
    capacity: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::with_capacity(UNDO_CAPACITY)
    }
}

impl UndoHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, frame: UndoFrame) {
        if self.capacity == 0 {
            return;
        }
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    pub fn pop(&mut self) -> Option<UndoFrame> {
        self.frames.pop_back()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Oldest frame still kept.
    pub fn oldest(&self) -> Option<&UndoFrame> {
        self.frames.front()
    }
}

// ============================================================================
// Highlight Store
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted,
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(usize),
    NoneMatched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    Restored { key: String },
    NothingToUndo,
}

pub struct HighlightStore<S> {
    store: S,
    highlights: HighlightMap,
    history: UndoHistory,
}

impl<S: SettingsStore> HighlightStore<S> {
    /// Load highlights from `store`. A missing or unreadable blob starts
    /// empty; the next effective mutation overwrites it.
    pub fn load(store: S) -> Self {
        let highlights = match store.load() {
            Ok(Some(settings)) => settings.highlights,
            Ok(None) => HighlightMap::new(),
            Err(e) => {
                warn!("Failed to load highlight settings, starting empty: {}", e);
                HighlightMap::new()
            }
        };
        Self {
            store,
            highlights,
            history: UndoHistory::default(),
        }
    }

    pub fn highlights(&self) -> &HighlightMap {
        &self.highlights
    }

    /// Highlights stored for `key`, oldest first.
    pub fn get(&self, key: &str) -> &[String] {
        self.highlights.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn undo_depth(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// Append `text` to `key`'s highlights unless it is already there.
    pub fn apply_highlight(&mut self, key: &str, text: &str) -> Result<ApplyOutcome> {
        let previous = self.get(key).to_vec();
        if previous.iter().any(|h| h == text) {
            debug!(key, text, "highlight already present");
            return Ok(ApplyOutcome::AlreadyPresent);
        }

        let mut next = previous.clone();
        next.push(text.to_string());
        self.commit(key, previous, next)?;
        Ok(ApplyOutcome::Inserted)
    }

    /// Remove every stored highlight of `key` that is contained in
    /// `selected`.
    pub fn remove_highlight(&mut self, key: &str, selected: &str) -> Result<RemoveOutcome> {
        let previous = self.get(key).to_vec();
        let next: Vec<String> = previous
            .iter()
            .filter(|h| !selected.contains(h.as_str()))
            .cloned()
            .collect();

        let removed = previous.len() - next.len();
        if removed == 0 {
            return Ok(RemoveOutcome::NoneMatched);
        }

        self.commit(key, previous, next)?;
        Ok(RemoveOutcome::Removed(removed))
    }

    /// Restore the list captured by the most recent frame.
    pub fn undo(&mut self) -> Result<UndoOutcome> {
        let Some(frame) = self.history.pop() else {
            return Ok(UndoOutcome::NothingToUndo);
        };

        let current = self.get(&frame.key).to_vec();
        self.set_list(&frame.key, frame.previous.clone());
        if let Err(e) = self.persist() {
            self.set_list(&frame.key, current);
            self.history.push(frame);
            return Err(e);
        }
        Ok(UndoOutcome::Restored { key: frame.key })
    }

    /// Drop every highlight and the whole undo history. Memory is only
    /// cleared once the empty settings are stored.
    pub fn clear_all(&mut self) -> Result<()> {
        self.store.save(&Settings::default())?;
        self.highlights.clear();
        self.history.clear();
        Ok(())
    }

    /// Record the frame, swap the list in and persist. On a storage error the
    /// in-memory state is rolled back so map and blob never diverge.
    fn commit(&mut self, key: &str, previous: Vec<String>, next: Vec<String>) -> Result<()> {
        let evicted = (self.history.len() == UNDO_CAPACITY)
            .then(|| self.history.oldest().cloned())
            .flatten();

        self.history.push(UndoFrame {
            key: key.to_string(),
            previous: previous.clone(),
        });
        self.set_list(key, next);

        if let Err(e) = self.persist() {
            self.set_list(key, previous);
            self.history.pop();
            if let Some(frame) = evicted {
                self.history.frames.push_front(frame);
            }
            return Err(e);
        }
        Ok(())
    }

    fn set_list(&mut self, key: &str, list: Vec<String>) {
        if list.is_empty() {
            self.highlights.remove(key);
        } else {
            self.highlights.insert(key.to_string(), list);
        }
    }

    fn persist(&self) -> Result<()> {
        self.store.save(&Settings {
            highlights: self.highlights.clone(),
        })
    }
}

//! Preview session: the single owner of hover state, the popup, the
//! highlight store and the lookup client.
//!
//! Everything is synchronous except resolving an open request, which the
//! caller drives (see `runtime`). That split keeps the event handling
//! testable with hand-made timestamps.

use crate::annotator::annotate;
use crate::document::{Host, Point};
use crate::highlights::{ApplyOutcome, HighlightStore, RemoveOutcome, SettingsStore, UndoOutcome};
use crate::hover::{HoverAction, HoverTarget, HoverTimings, HoverTracker, OpenRequest, PointerTarget};
use crate::lookup::{clamp_tab_index, LookupClient, LookupService};
use crate::matcher::{sub_reference_index, ReferenceMatcher};
use crate::models::{Notice, Tab};
use crate::popup::PopupSession;
use std::time::Instant;
use tracing::{debug, info, warn};

// ============================================================================
// Keyboard
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    /// Ctrl on Linux/Windows, Cmd on macOS.
    pub modifier: bool,
}

impl KeyPress {
    pub fn plain(key: &str) -> Self {
        Self {
            key: key.to_string(),
            modifier: false,
        }
    }

    pub fn with_modifier(key: &str) -> Self {
        Self {
            key: key.to_string(),
            modifier: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Save,
    Delete,
    Undo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    pub save: String,
    pub delete: String,
    /// Pressed together with the modifier.
    pub undo: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            save: "h".to_string(),
            delete: "d".to_string(),
            undo: "z".to_string(),
        }
    }
}

impl KeyBindings {
    pub fn command(&self, press: &KeyPress) -> Option<KeyCommand> {
        let key = press.key.to_lowercase();
        if press.modifier {
            return (key == self.undo).then_some(KeyCommand::Undo);
        }
        if key == self.save {
            Some(KeyCommand::Save)
        } else if key == self.delete {
            Some(KeyCommand::Delete)
        } else {
            None
        }
    }
}

// ============================================================================
// Session
// ============================================================================

pub struct PreviewSession<H, L: ?Sized, S> {
    host: H,
    matcher: ReferenceMatcher,
    lookup: LookupClient<L>,
    highlights: HighlightStore<S>,
    tracker: HoverTracker,
    popup: Option<PopupSession>,
    keys: KeyBindings,
}

impl<H, L, S> PreviewSession<H, L, S>
where
    H: Host,
    L: LookupService + ?Sized,
    S: SettingsStore,
{
    pub fn new(
        host: H,
        matcher: ReferenceMatcher,
        lookup: LookupClient<L>,
        highlights: HighlightStore<S>,
        timings: HoverTimings,
        keys: KeyBindings,
    ) -> Self {
        Self {
            host,
            matcher,
            lookup,
            highlights,
            tracker: HoverTracker::new(timings),
            popup: None,
            keys,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn popup(&self) -> Option<&PopupSession> {
        self.popup.as_ref()
    }

    pub fn tracker(&self) -> &HoverTracker {
        &self.tracker
    }

    pub fn highlights(&self) -> &HighlightStore<S> {
        &self.highlights
    }

    pub fn lookup(&self) -> &LookupClient<L> {
        &self.lookup
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.tracker.next_deadline()
    }

    /// Mark every reference in the rendered document.
    pub fn annotate(&mut self) -> usize {
        annotate(&mut self.host, &self.matcher)
    }

    // ---- hit testing ----

    /// What is under `point`: the popup, a reference (with the sub-reference
    /// the cursor is over), or nothing. Missing caret or geometry counts as
    /// nothing.
    pub fn hit_test(&self, point: Point) -> PointerTarget {
        if self.popup.as_ref().is_some_and(|p| p.contains(point)) {
            return PointerTarget::Popup;
        }
        self.reference_at(point)
            .map(PointerTarget::Reference)
            .unwrap_or(PointerTarget::Elsewhere)
    }

    fn reference_at(&self, point: Point) -> Option<HoverTarget> {
        let caret = self.host.caret_from_point(point)?;
        let text = self.host.node_text(caret.node)?;
        let span = self.matcher.match_at(&text, caret.offset)?;

        // A caret snaps to the nearest character even past the end of a
        // line, so confirm the pointer is really over the span's boxes.
        let rects = self.host.range_rects(caret.node, span.start, span.end);
        if !rects.iter().any(|r| r.contains(point)) {
            return None;
        }

        let subs = self.matcher.split_composite(&span.text);
        let tab_index = sub_reference_index(&subs, &span.text, caret.offset - span.start);
        let mut sub_references: Vec<String> = subs.into_iter().map(|s| s.text).collect();
        if sub_references.is_empty() {
            sub_references.push(span.text.clone());
        }

        Some(HoverTarget {
            reference: span.text,
            sub_references,
            tab_index,
            anchor: point,
        })
    }

    // ---- events ----

    /// Returns an open request when one is due; resolve it with
    /// [`Self::open`] or by hand and hand the tabs to [`Self::finish_open`].
    pub fn pointer_moved(&mut self, point: Point, now: Instant) -> Option<OpenRequest> {
        let target = self.hit_test(point);
        let action = self.tracker.pointer_moved(now, target);
        self.apply(action)
    }

    pub fn scrolled(&mut self, point: Point, now: Instant) -> Option<OpenRequest> {
        let inside = self.popup.as_ref().is_some_and(|p| p.contains(point));
        let action = self.tracker.scrolled(now, inside);
        self.apply(action)
    }

    pub fn clicked(&mut self, point: Point) -> Option<OpenRequest> {
        let inside = self.popup.as_ref().is_some_and(|p| p.contains(point));
        let action = self.tracker.clicked(inside);
        self.apply(action)
    }

    /// Fire due deferred actions.
    pub fn poll(&mut self, now: Instant) -> Option<OpenRequest> {
        let action = self.tracker.poll(now);
        self.apply(action)
    }

    fn apply(&mut self, action: Option<HoverAction>) -> Option<OpenRequest> {
        match action? {
            HoverAction::Open(request) => {
                debug!(reference = %request.target.reference, "open requested");
                return Some(request);
            }
            HoverAction::SwitchTab(index) => {
                let current = self.tracker.current_reference();
                if let Some(popup) = self.popup.as_mut() {
                    if current == Some(popup.reference()) {
                        popup.switch_tab(&mut self.host, index, self.highlights.highlights());
                    }
                }
            }
            HoverAction::Close => self.close_popup(),
        }
        None
    }

    // ---- opening ----

    /// Resolve and render in one go.
    pub async fn open(&mut self, request: OpenRequest) -> bool {
        let tabs = self.lookup.resolve(&request.target.sub_references).await;
        self.finish_open(request, tabs)
    }

    /// Render resolved tabs, unless the request went stale while it was
    /// being resolved. Zero tabs means no popup at all.
    pub fn finish_open(&mut self, request: OpenRequest, tabs: Vec<Tab>) -> bool {
        if !self.tracker.is_current(request.generation) {
            debug!(reference = %request.target.reference, "dropping stale resolution");
            return false;
        }
        if tabs.is_empty() {
            debug!(reference = %request.target.reference, "no verses resolved");
            self.tracker.dismiss();
            self.close_popup();
            return false;
        }

        let wanted = self.tracker.current_tab_index();
        let active = clamp_tab_index(wanted, tabs.len());
        if active != wanted {
            self.tracker.set_tab_index(active);
        }

        self.close_popup();
        let viewport = self.host.viewport();
        self.popup = Some(PopupSession::open(
            &mut self.host,
            request.target.reference,
            tabs,
            active,
            request.target.anchor,
            viewport,
            self.highlights.highlights(),
        ));
        true
    }

    pub fn close_popup(&mut self) {
        if let Some(popup) = self.popup.take() {
            popup.destroy(&mut self.host);
        }
    }

    // ---- highlight commands ----

    /// Handle a key press. Only acts while a popup is open and text inside
    /// it is selected.
    pub fn key_pressed(&mut self, press: &KeyPress) -> Option<Notice> {
        let command = self.keys.command(press)?;
        let storage_key = self.popup.as_ref()?.active()?.storage_key.clone();
        let selection = self.host.popup_selection()?;
        let selection = selection.trim();
        if selection.is_empty() {
            return None;
        }

        let notice = match command {
            KeyCommand::Save => match self.highlights.apply_highlight(&storage_key, selection) {
                Ok(ApplyOutcome::Inserted) => {
                    self.reload_popup();
                    Notice::HighlightSaved
                }
                Ok(ApplyOutcome::AlreadyPresent) => Notice::AlreadyHighlighted,
                Err(e) => storage_failed(e),
            },
            KeyCommand::Delete => match self.highlights.remove_highlight(&storage_key, selection) {
                Ok(RemoveOutcome::Removed(n)) => {
                    self.reload_popup();
                    Notice::HighlightRemoved(n)
                }
                Ok(RemoveOutcome::NoneMatched) => Notice::NothingToRemove,
                Err(e) => storage_failed(e),
            },
            KeyCommand::Undo => match self.highlights.undo() {
                Ok(UndoOutcome::Restored { .. }) => {
                    self.reload_popup();
                    Notice::Undone
                }
                Ok(UndoOutcome::NothingToUndo) => Notice::NothingToUndo,
                Err(e) => storage_failed(e),
            },
        };

        self.host.show_notice(&notice);
        Some(notice)
    }

    /// Host command: drop every highlight and the undo history.
    pub fn clear_all_highlights(&mut self) -> Notice {
        let notice = match self.highlights.clear_all() {
            Ok(()) => {
                info!("All highlights cleared");
                self.reload_popup();
                Notice::HighlightsCleared
            }
            Err(e) => storage_failed(e),
        };
        self.host.show_notice(&notice);
        notice
    }

    pub fn notify(&mut self, notice: &Notice) {
        self.host.show_notice(notice);
    }

    fn reload_popup(&mut self) {
        if let Some(popup) = self.popup.as_ref() {
            popup.reload_active_tab(&mut self.host, true, self.highlights.highlights());
        }
    }
}

fn storage_failed(e: crate::error::Error) -> Notice {
    warn!("Highlight storage failed: {}", e);
    Notice::StorageFailed(e.to_string())
}

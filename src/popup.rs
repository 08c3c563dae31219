//! The floating preview panel.
//!
//! A [`PopupSession`] is the one popup that may exist at a time. It owns its
//! tabs, knows which one is active, and renders it with the user's
//! highlights wrapped in `<mark>`. The session (not the host) decides where
//! the panel goes so that it never leaves the viewport.

use crate::document::{Point, PopupHost, PopupView, Rect, Viewport};
use crate::models::{HighlightMap, Tab};

pub const POPUP_WIDTH: f32 = 420.0;
pub const POPUP_HEIGHT: f32 = 320.0;
/// Minimum distance kept from every viewport edge.
pub const VIEWPORT_MARGIN: f32 = 20.0;
/// Vertical gap between the pointer and the panel.
pub const ANCHOR_GAP: f32 = 12.0;

// ============================================================================
// Positioning
// ============================================================================

/// Place a `width` x `height` panel near `anchor`: below the pointer when it
/// fits, above it otherwise, then clamped into the viewport with
/// [`VIEWPORT_MARGIN`] on every side.
pub fn position_popup(anchor: Point, width: f32, height: f32, viewport: Viewport) -> Rect {
    let mut top = anchor.y + ANCHOR_GAP;
    if top + height > viewport.height - VIEWPORT_MARGIN {
        top = anchor.y - ANCHOR_GAP - height;
    }
    let mut left = anchor.x;

    left = clamp_axis(left, width, viewport.width);
    top = clamp_axis(top, height, viewport.height);

    Rect::new(left, top, width, height)
}

/// Clamp one axis. If the panel is larger than the room available it is
/// pinned to the leading margin.
fn clamp_axis(start: f32, size: f32, extent: f32) -> f32 {
    let max = extent - size - VIEWPORT_MARGIN;
    start.min(max).max(VIEWPORT_MARGIN)
}

// ============================================================================
// Highlight Rendering
// ============================================================================

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Byte ranges of every occurrence of every highlight, merged so that
/// overlapping or touching highlights become one mark.
fn highlight_ranges(content: &str, highlights: &[String]) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = highlights
        .iter()
        .filter(|h| !h.is_empty())
        .flat_map(|h| {
            content
                .match_indices(h.as_str())
                .map(move |(start, m)| (start, start + m.len()))
        })
        .collect();
    ranges.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

fn escape_lines(s: &str) -> String {
    html_escape(s).replace('\n', "<br>")
}

/// Escape `content` and wrap highlighted substrings in
/// `<mark class="verse-highlight">`.
pub fn render_highlighted(content: &str, highlights: &[String]) -> String {
    let mut out = String::with_capacity(content.len() + 32);
    let mut cursor = 0;
    for (start, end) in highlight_ranges(content, highlights) {
        out.push_str(&escape_lines(&content[cursor..start]));
        out.push_str("<mark class=\"verse-highlight\">");
        out.push_str(&escape_lines(&content[start..end]));
        out.push_str("</mark>");
        cursor = end;
    }
    out.push_str(&escape_lines(&content[cursor..]));
    out
}

// ============================================================================
// Popup Session
// ============================================================================

#[derive(Debug, Clone)]
pub struct PopupSession {
    reference: String,
    tabs: Vec<Tab>,
    active_tab: usize,
    frame: Rect,
}

impl PopupSession {
    /// Lay out the panel and mount it on `host`. `tabs` must not be empty.
    pub fn open<H: PopupHost + ?Sized>(
        host: &mut H,
        reference: String,
        tabs: Vec<Tab>,
        active_tab: usize,
        anchor: Point,
        viewport: Viewport,
        highlights: &HighlightMap,
    ) -> Self {
        let active_tab = if active_tab < tabs.len() { active_tab } else { 0 };
        let frame = position_popup(anchor, POPUP_WIDTH, POPUP_HEIGHT, viewport);
        let session = Self {
            reference,
            tabs,
            active_tab,
            frame,
        };
        host.mount_popup(frame, &session.view(highlights));
        session
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn active_tab(&self) -> usize {
        self.active_tab
    }

    pub fn active(&self) -> Option<&Tab> {
        self.tabs.get(self.active_tab)
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn contains(&self, point: Point) -> bool {
        self.frame.contains(point)
    }

    pub fn view(&self, highlights: &HighlightMap) -> PopupView {
        let Some(tab) = self.active() else {
            return PopupView::default();
        };
        let marks = highlights
            .get(&tab.storage_key)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        PopupView {
            tab_labels: self.tabs.iter().map(|t| t.label.clone()).collect(),
            active_tab: self.active_tab,
            body_html: render_highlighted(&tab.content, marks),
            footer: tab.footer.clone(),
        }
    }

    /// Show another tab, scrolled to the top. Out-of-range indices and the
    /// already active tab are ignored.
    pub fn switch_tab<H: PopupHost + ?Sized>(
        &mut self,
        host: &mut H,
        index: usize,
        highlights: &HighlightMap,
    ) -> bool {
        if index >= self.tabs.len() || index == self.active_tab {
            return false;
        }
        self.active_tab = index;
        host.update_popup(&self.view(highlights), 0.0);
        true
    }

    /// Re-render the active tab in place, e.g. after its highlights changed.
    pub fn reload_active_tab<H: PopupHost + ?Sized>(
        &self,
        host: &mut H,
        preserve_scroll: bool,
        highlights: &HighlightMap,
    ) {
        let scroll_top = if preserve_scroll {
            host.popup_scroll_top()
        } else {
            0.0
        };
        host.update_popup(&self.view(highlights), scroll_top);
    }

    pub fn destroy<H: PopupHost + ?Sized>(self, host: &mut H) {
        host.unmount_popup();
    }
}

//! Host document interface.
//!
//! The preview never touches a real DOM. The host hands out text nodes, can
//! wrap a sub-range of one in a marker element, resolves a pointer position
//! to a caret, measures text ranges, and mounts the popup. Coordinates are
//! CSS pixels relative to the viewport.

use crate::error::Result;
use crate::models::Notice;

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Edges inclusive.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

// ============================================================================
// Document Side
// ============================================================================

pub type NodeId = usize;

/// A position inside a text node. `offset` is a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub node: NodeId,
    pub offset: usize,
}

/// Inspectable element wrapped around a recognized reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub class: &'static str,
    pub reference: String,
}

pub const MARKER_CLASS: &str = "bible-ref";

impl Marker {
    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            class: MARKER_CLASS,
            reference: reference.into(),
        }
    }
}

pub trait DocumentHost {
    /// Text nodes inside the rendered content region.
    fn text_nodes(&self) -> Vec<NodeId>;

    fn node_text(&self, node: NodeId) -> Option<String>;

    /// Whether the node already sits inside a marker.
    fn is_marked(&self, node: NodeId) -> bool;

    /// Wrap bytes `start..end` of `node` in `marker`. Offsets before `start`
    /// in the same node stay valid.
    fn wrap_range(&mut self, node: NodeId, start: usize, end: usize, marker: &Marker) -> Result<()>;

    fn caret_from_point(&self, point: Point) -> Option<Caret>;

    /// One rectangle per rendered line the range covers.
    fn range_rects(&self, node: NodeId, start: usize, end: usize) -> Vec<Rect>;

    fn viewport(&self) -> Viewport;
}

// ============================================================================
// Popup Side
// ============================================================================

/// Everything the host needs to paint the popup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PopupView {
    pub tab_labels: Vec<String>,
    pub active_tab: usize,
    /// Escaped HTML with `<mark>` around highlights.
    pub body_html: String,
    pub footer: String,
}

pub trait PopupHost {
    fn mount_popup(&mut self, frame: Rect, view: &PopupView);

    /// Replace the popup's content and scroll its body to `scroll_top`.
    fn update_popup(&mut self, view: &PopupView, scroll_top: f32);

    fn popup_scroll_top(&self) -> f32;

    fn unmount_popup(&mut self);

    /// Non-empty text selection inside the popup body.
    fn popup_selection(&self) -> Option<String>;

    fn show_notice(&mut self, notice: &Notice);
}

/// Everything a preview session needs from its host.
pub trait Host: DocumentHost + PopupHost {}

impl<T: DocumentHost + PopupHost> Host for T {}

// ============================================================================
// In-memory host for tests
// ============================================================================

//! Hover intent: turn raw pointer, scroll and click events into
//! open / switch-tab / close decisions.
//!
//! The tracker is a pure state machine over `Idle`, `Pending` and `Open`.
//! Time is passed in by the caller; the two debounced decisions are
//! single-slot [`DeferredAction`]s and scrolling is a [`ScrollLatch`].
//! Nothing here sleeps. The runtime asks [`HoverTracker::next_deadline`] and
//! calls [`HoverTracker::poll`] when it is reached.

use crate::document::Point;
use std::time::{Duration, Instant};

pub const OPEN_DELAY: Duration = Duration::from_millis(600);
pub const CLOSE_DELAY: Duration = Duration::from_millis(300);
pub const SCROLL_QUIET: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverTimings {
    pub open_delay: Duration,
    pub close_delay: Duration,
    pub scroll_quiet: Duration,
}

impl Default for HoverTimings {
    fn default() -> Self {
        Self {
            open_delay: OPEN_DELAY,
            close_delay: CLOSE_DELAY,
            scroll_quiet: SCROLL_QUIET,
        }
    }
}

// ============================================================================
// Deferred Actions
// ============================================================================

/// One-slot timer. Starting it again replaces the previous deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferredAction {
    deadline: Option<Instant>,
}

impl DeferredAction {
    pub fn start(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm and report true if the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(at) if now >= at => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Holds for `scroll_quiet` after the most recent scroll.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrollLatch {
    until: Option<Instant>,
}

impl ScrollLatch {
    pub fn latch(&mut self, now: Instant, quiet: Duration) {
        self.until = Some(now + quiet);
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }
}

// ============================================================================
// Events and Actions
// ============================================================================

/// The reference under the pointer, already segmented.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverTarget {
    /// Full composite match text; identifies the popup.
    pub reference: String,
    /// Atomic references, in order.
    pub sub_references: Vec<String>,
    /// Sub-reference the cursor is over.
    pub tab_index: usize,
    pub anchor: Point,
}

/// What the pointer is over after a move.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerTarget {
    Reference(HoverTarget),
    Popup,
    Elsewhere,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    pub target: HoverTarget,
    /// Bumped by anything that makes an in-flight open obsolete.
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoverAction {
    Open(OpenRequest),
    SwitchTab(usize),
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoverPhase {
    Idle,
    Pending(HoverTarget),
    Open {
        reference: String,
        tab_index: usize,
        /// A different reference the pointer is dwelling on while this popup
        /// is still up.
        next: Option<HoverTarget>,
    },
}

// ============================================================================
// Tracker
// ============================================================================

#[derive(Debug)]
pub struct HoverTracker {
    timings: HoverTimings,
    phase: HoverPhase,
    open_intent: DeferredAction,
    close_intent: DeferredAction,
    scroll: ScrollLatch,
    generation: u64,
}

impl Default for HoverTracker {
    fn default() -> Self {
        Self::new(HoverTimings::default())
    }
}

impl HoverTracker {
    pub fn new(timings: HoverTimings) -> Self {
        Self {
            timings,
            phase: HoverPhase::Idle,
            open_intent: DeferredAction::default(),
            close_intent: DeferredAction::default(),
            scroll: ScrollLatch::default(),
            generation: 0,
        }
    }

    pub fn phase(&self) -> &HoverPhase {
        &self.phase
    }

    pub fn is_scrolling(&self, now: Instant) -> bool {
        self.scroll.is_active(now)
    }

    /// Reference of the open popup.
    pub fn current_reference(&self) -> Option<&str> {
        match &self.phase {
            HoverPhase::Open { reference, .. } => Some(reference),
            _ => None,
        }
    }

    pub fn current_tab_index(&self) -> usize {
        match &self.phase {
            HoverPhase::Open { tab_index, .. } => *tab_index,
            HoverPhase::Pending(target) => target.tab_index,
            HoverPhase::Idle => 0,
        }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.open_intent.deadline(), self.close_intent.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn pointer_moved(&mut self, now: Instant, target: PointerTarget) -> Option<HoverAction> {
        match target {
            PointerTarget::Popup => {
                self.close_intent.cancel();
                if let HoverPhase::Open { next, .. } = &mut self.phase {
                    if next.take().is_some() {
                        self.open_intent.cancel();
                    }
                }
                None
            }
            PointerTarget::Reference(target) => {
                if self.scroll.is_active(now) {
                    return None;
                }
                self.close_intent.cancel();
                self.hover_reference(now, target)
            }
            PointerTarget::Elsewhere => {
                self.open_intent.cancel();
                if matches!(self.phase, HoverPhase::Pending(_)) {
                    self.phase = HoverPhase::Idle;
                } else if let HoverPhase::Open { next, .. } = &mut self.phase {
                    *next = None;
                    if !self.close_intent.is_armed() {
                        self.close_intent.start(now, self.timings.close_delay);
                    }
                }
                None
            }
        }
    }

    fn hover_reference(&mut self, now: Instant, target: HoverTarget) -> Option<HoverAction> {
        let open_delay = self.timings.open_delay;
        match &mut self.phase {
            HoverPhase::Idle => {}
            HoverPhase::Pending(pending) => {
                if pending.reference == target.reference {
                    pending.tab_index = target.tab_index;
                    pending.anchor = target.anchor;
                } else {
                    *pending = target;
                    self.open_intent.start(now, open_delay);
                }
                return None;
            }
            HoverPhase::Open {
                reference,
                tab_index,
                next,
            } => {
                if *reference == target.reference {
                    if next.take().is_some() {
                        self.open_intent.cancel();
                    }
                    if *tab_index != target.tab_index {
                        *tab_index = target.tab_index;
                        return Some(HoverAction::SwitchTab(target.tab_index));
                    }
                    return None;
                }

                let already_queued = next
                    .as_ref()
                    .is_some_and(|queued| queued.reference == target.reference);
                if already_queued {
                    if let Some(queued) = next.as_mut() {
                        queued.tab_index = target.tab_index;
                        queued.anchor = target.anchor;
                    }
                } else {
                    *next = Some(target);
                    self.open_intent.start(now, open_delay);
                }
                return None;
            }
        }

        self.phase = HoverPhase::Pending(target);
        self.open_intent.start(now, open_delay);
        None
    }

    /// Scroll or wheel event. Scrolling inside the popup is the popup's own
    /// business; anywhere else closes everything and latches.
    pub fn scrolled(&mut self, now: Instant, inside_popup: bool) -> Option<HoverAction> {
        if inside_popup {
            return None;
        }
        self.scroll.latch(now, self.timings.scroll_quiet);
        self.force_idle()
    }

    /// Pointer press. Outside the popup closes it immediately.
    pub fn clicked(&mut self, inside_popup: bool) -> Option<HoverAction> {
        if inside_popup {
            return None;
        }
        if matches!(self.phase, HoverPhase::Open { .. }) {
            self.force_idle()
        } else {
            None
        }
    }

    /// Fire whichever deferred actions are due.
    pub fn poll(&mut self, now: Instant) -> Option<HoverAction> {
        if self.close_intent.fire(now) {
            if matches!(self.phase, HoverPhase::Open { .. }) {
                self.phase = HoverPhase::Idle;
                self.generation += 1;
                return Some(HoverAction::Close);
            }
        }

        if self.open_intent.fire(now) {
            let target = match std::mem::replace(&mut self.phase, HoverPhase::Idle) {
                HoverPhase::Pending(target) => Some(target),
                HoverPhase::Open {
                    reference,
                    tab_index,
                    next,
                } => {
                    if next.is_none() {
                        self.phase = HoverPhase::Open {
                            reference,
                            tab_index,
                            next: None,
                        };
                    }
                    next
                }
                HoverPhase::Idle => None,
            };

            let target = target?;
            if self.scroll.is_active(now) {
                return None;
            }

            self.generation += 1;
            self.phase = HoverPhase::Open {
                reference: target.reference.clone(),
                tab_index: target.tab_index,
                next: None,
            };
            return Some(HoverAction::Open(OpenRequest {
                target,
                generation: self.generation,
            }));
        }

        None
    }

    /// Reset the active tab, e.g. when the resolved tab list is shorter
    /// than the index the cursor pointed at.
    pub fn set_tab_index(&mut self, index: usize) {
        if let HoverPhase::Open { tab_index, .. } = &mut self.phase {
            *tab_index = index;
        }
    }

    /// Give up on the open popup without a close timer (resolution produced
    /// nothing, or the host dismissed it).
    pub fn dismiss(&mut self) {
        self.force_idle();
    }

    fn force_idle(&mut self) -> Option<HoverAction> {
        self.open_intent.cancel();
        self.close_intent.cancel();
        self.generation += 1;
        match std::mem::replace(&mut self.phase, HoverPhase::Idle) {
            HoverPhase::Idle => None,
            _ => Some(HoverAction::Close),
        }
    }
}

//! One-shot pass that wraps every recognized reference in a marker element.

use crate::document::{DocumentHost, Marker};
use crate::matcher::ReferenceMatcher;
use tracing::{debug, warn};

/// Wrap each citation span found in the host's text nodes. Nodes already
/// inside a marker are skipped, so running the pass twice is harmless.
/// Returns the number of spans wrapped.
pub fn annotate<H: DocumentHost + ?Sized>(host: &mut H, matcher: &ReferenceMatcher) -> usize {
    let mut wrapped = 0;

    for node in host.text_nodes() {
        if host.is_marked(node) {
            continue;
        }
        let Some(text) = host.node_text(node) else {
            continue;
        };

        let spans: Vec<_> = matcher.find_matches(&text).collect();
        // Right to left: wrapping only invalidates offsets after the span.
        for span in spans.into_iter().rev() {
            match host.wrap_range(node, span.start, span.end, &Marker::reference(&span.text)) {
                Ok(()) => wrapped += 1,
                Err(e) => warn!("Could not mark reference {:?}: {}", span.text, e),
            }
        }
    }

    debug!(wrapped, "annotated references");
    wrapped
}

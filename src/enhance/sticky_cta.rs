use web_sys::Document;

use crate::config::STICKY_CTA_ID;
use crate::dom::{self, Listener};

const HIDDEN_CLASS: &str = "translate-y-full";

pub fn is_revealed(scroll_y: f64, threshold: f64) -> bool {
    scroll_y > threshold
}

/// Slides the sticky call-to-action in once the reader scrolls past
/// `threshold` pixels. Returns false when the page has no CTA.
pub fn init(document: &Document, threshold: f64) -> bool {
    let Some(cta) = dom::element_by_id(document, STICKY_CTA_ID) else {
        return false;
    };
    let Some(window) = web_sys::window() else {
        return false;
    };

    let scroll_window = window.clone();
    Listener::passive(&window, "scroll", move |_| {
        let scroll_y = scroll_window.scroll_y().unwrap_or(0.0);
        dom::set_class(&cta, HIDDEN_CLASS, !is_revealed(scroll_y, threshold));
    })
    .forget();

    log::debug!("Sticky CTA ready (threshold {}px)", threshold);
    true
}

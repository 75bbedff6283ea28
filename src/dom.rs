use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{AddEventListenerOptions, Document, Element, Event, EventTarget};

/// A DOM event listener that is removed from its target when dropped.
pub struct Listener {
    target: EventTarget,
    event_type: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    pub fn new<F>(target: &EventTarget, event_type: &'static str, callback: F) -> Self
    where
        F: FnMut(Event) + 'static,
    {
        let callback = Closure::wrap(Box::new(callback) as Box<dyn FnMut(Event)>);
        if let Err(e) = target.add_event_listener_with_callback(event_type, callback.as_ref().unchecked_ref()) {
            log::warn!("Failed to add {} listener: {:?}", event_type, e);
        }
        Self {
            target: target.clone(),
            event_type,
            callback,
        }
    }

    /// Registers a passive listener, used for scroll handlers that never call
    /// `prevent_default`.
    pub fn passive<F>(target: &EventTarget, event_type: &'static str, callback: F) -> Self
    where
        F: FnMut(Event) + 'static,
    {
        let callback = Closure::wrap(Box::new(callback) as Box<dyn FnMut(Event)>);
        let options = AddEventListenerOptions::new();
        options.set_passive(true);
        if let Err(e) = target.add_event_listener_with_callback_and_add_event_listener_options(
            event_type,
            callback.as_ref().unchecked_ref(),
            &options,
        ) {
            log::warn!("Failed to add passive {} listener: {:?}", event_type, e);
        }
        Self {
            target: target.clone(),
            event_type,
            callback,
        }
    }

    /// Keeps the listener attached for the rest of the page's lifetime.
    pub fn forget(self) {
        std::mem::forget(self);
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event_type, self.callback.as_ref().unchecked_ref());
    }
}

pub fn document() -> Option<Document> {
    web_sys::window().and_then(|window| window.document())
}

pub fn element_by_id(document: &Document, id: &str) -> Option<Element> {
    let element = document.get_element_by_id(id);
    if element.is_none() {
        log::debug!("#{} not found", id);
    }
    element
}

pub fn set_class(element: &Element, class: &str, present: bool) {
    let classes = element.class_list();
    let _ = if present { classes.add_1(class) } else { classes.remove_1(class) };
}

/// Locks or restores page scrolling by toggling `overflow` on `<body>`.
pub fn set_scroll_locked(document: &Document, locked: bool) {
    let Some(body) = document.body() else {
        return;
    };
    let value = if locked { "hidden" } else { "" };
    if let Err(e) = body.style().set_property("overflow", value) {
        log::warn!("Failed to set body overflow: {:?}", e);
    }
}

/// True when the event was dispatched on `element` itself rather than on one of
/// its descendants.
pub fn targets_self(event: &Event, element: &Element) -> bool {
    event
        .target()
        .and_then(|target| target.dyn_into::<Element>().ok())
        .map_or(false, |target| &target == element)
}

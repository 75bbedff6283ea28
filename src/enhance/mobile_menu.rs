use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, KeyboardEvent};

use crate::config::{CLOSE_ICON_ID, MENU_ICON_ID, MOBILE_MENU_BUTTON_ID, MOBILE_MENU_CLOSE_ID, MOBILE_MENU_ID};
use crate::dom::{self, Listener};

/// Attribute values the menu markup should carry in a given state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MenuPresentation {
    pub menu_hidden: bool,
    pub aria_hidden: &'static str,
    pub aria_expanded: &'static str,
    pub button_label: &'static str,
    pub menu_icon_hidden: bool,
    pub close_icon_hidden: bool,
    pub lock_scroll: bool,
}

impl MenuPresentation {
    pub fn for_state(open: bool) -> Self {
        if open {
            Self {
                menu_hidden: false,
                aria_hidden: "false",
                aria_expanded: "true",
                button_label: "メニューを閉じる",
                menu_icon_hidden: true,
                close_icon_hidden: false,
                lock_scroll: true,
            }
        } else {
            Self {
                menu_hidden: true,
                aria_hidden: "true",
                aria_expanded: "false",
                button_label: "メニューを開く",
                menu_icon_hidden: false,
                close_icon_hidden: true,
                lock_scroll: false,
            }
        }
    }
}

struct MobileMenu {
    document: Document,
    button: Element,
    menu: Element,
    menu_icon: Option<Element>,
    close_icon: Option<Element>,
    open: Cell<bool>,
}

impl MobileMenu {
    fn set_open(&self, open: bool) {
        let presentation = MenuPresentation::for_state(open);
        dom::set_class(&self.menu, "hidden", presentation.menu_hidden);
        let _ = self.menu.set_attribute("aria-hidden", presentation.aria_hidden);
        let _ = self.button.set_attribute("aria-expanded", presentation.aria_expanded);
        let _ = self.button.set_attribute("aria-label", presentation.button_label);
        if let Some(icon) = &self.menu_icon {
            dom::set_class(icon, "hidden", presentation.menu_icon_hidden);
        }
        if let Some(icon) = &self.close_icon {
            dom::set_class(icon, "hidden", presentation.close_icon_hidden);
        }
        dom::set_scroll_locked(&self.document, presentation.lock_scroll);
        self.open.set(open);
    }

    fn is_open(&self) -> bool {
        self.open.get()
    }
}

/// Wires the burger menu. Returns false when its markup is not on the page.
pub fn init(document: &Document) -> bool {
    let (Some(button), Some(close), Some(menu)) = (
        dom::element_by_id(document, MOBILE_MENU_BUTTON_ID),
        dom::element_by_id(document, MOBILE_MENU_CLOSE_ID),
        dom::element_by_id(document, MOBILE_MENU_ID),
    ) else {
        return false;
    };

    let state = Rc::new(MobileMenu {
        document: document.clone(),
        button: button.clone(),
        menu: menu.clone(),
        menu_icon: document.get_element_by_id(MENU_ICON_ID),
        close_icon: document.get_element_by_id(CLOSE_ICON_ID),
        open: Cell::new(!menu.class_list().contains("hidden")),
    });

    {
        let state = state.clone();
        Listener::new(&button, "click", move |_| state.set_open(!state.is_open())).forget();
    }
    {
        let state = state.clone();
        Listener::new(&close, "click", move |_| state.set_open(false)).forget();
    }
    {
        let state = state.clone();
        Listener::new(&menu, "click", move |event: Event| {
            if dom::targets_self(&event, &state.menu) {
                state.set_open(false);
            }
        })
        .forget();
    }
    {
        let state = state.clone();
        Listener::new(document, "keydown", move |event: Event| {
            let is_escape = event
                .dyn_ref::<KeyboardEvent>()
                .map_or(false, |event| event.key() == "Escape");
            if is_escape && state.is_open() {
                state.set_open(false);
            }
        })
        .forget();
    }

    if let Ok(links) = menu.query_selector_all("a") {
        for index in 0..links.length() {
            let Some(link) = links.get(index) else {
                continue;
            };
            let state = state.clone();
            Listener::new(&link, "click", move |_| state.set_open(false)).forget();
        }
    }

    log::debug!("Mobile menu ready");
    true
}

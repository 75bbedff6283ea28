use log::info;
use web_sys::Document;

mod config;
mod countdown;
mod dom;
mod components {
    pub mod countdown;
    pub mod interstitial;
}
mod enhance {
    pub mod mobile_menu;
    pub mod sticky_cta;
}
mod interstitial {
    pub mod controller;
    pub mod scheduler;
    pub mod viewer;
}

use components::{
    countdown::{CountdownDisplay, CountdownProps, CountdownTimer},
    interstitial::{Interstitial, InterstitialProps},
};
use config::Settings;
use dom::Listener;

const INTERSTITIAL_ROOT_ID: &str = "interstitial-root";

fn mount_countdown(document: &Document) {
    let Some(host) = dom::element_by_id(document, config::COUNTDOWN_HOST_ID) else {
        return; // Not a countdown page
    };
    let target = match countdown::target_from_attribute(host.get_attribute(config::COUNTDOWN_DATE_ATTRIBUTE)) {
        Ok(target) => target,
        Err(e) => {
            log::error!("Countdown disabled: {}", e);
            return;
        }
    };

    let Some(display) = CountdownDisplay::find(document) else {
        log::error!("Countdown display elements missing");
        return;
    };
    // The component renders nothing, so it gets a detached root and the
    // page's own markup stays as served.
    let root = match document.create_element("div") {
        Ok(root) => root,
        Err(e) => {
            log::error!("Failed to create countdown root: {:?}", e);
            return;
        }
    };

    info!("Counting down to {}", target);
    let props = CountdownProps { target, display };
    let mut app = Some(yew::Renderer::<CountdownTimer>::with_root_and_props(root, props).render());

    let Some(window) = web_sys::window() else {
        return;
    };
    Listener::new(&window, "beforeunload", move |_| {
        if let Some(app) = app.take() {
            app.destroy();
        }
    })
    .forget();
}

fn mount_interstitial(document: &Document, settings: Settings) {
    let Some(body) = document.body() else {
        return;
    };
    let host = match document.create_element("div") {
        Ok(host) => host,
        Err(e) => {
            log::error!("Failed to create interstitial root: {:?}", e);
            return;
        }
    };
    host.set_id(INTERSTITIAL_ROOT_ID);
    if let Err(e) = body.append_child(&host) {
        log::error!("Failed to attach interstitial root: {:?}", e);
        return;
    }

    yew::Renderer::<Interstitial>::with_root_and_props(host, InterstitialProps { settings }).render();
}

fn init() {
    let Some(document) = dom::document() else {
        return;
    };
    let settings = Settings::load(&document);

    // Every feature checks for its own markup; none depends on another.
    if !enhance::mobile_menu::init(&document) {
        log::debug!("Mobile menu markup missing; skipping");
    }
    mount_countdown(&document);
    if !enhance::sticky_cta::init(&document, settings.sticky_cta_threshold) {
        log::debug!("No sticky CTA on this page");
    }
    mount_interstitial(&document, settings);

    info!("Page enhancements ready");
}

fn main() {
    // Initialize console error panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging
    console_log::init_with_level(config::log_level()).expect("error initializing log");

    info!("Starting interactivity layer");
    let Some(document) = dom::document() else {
        return;
    };
    if document.ready_state() == "loading" {
        Listener::new(&document, "DOMContentLoaded", |_| init()).forget();
    } else {
        init();
    }
}

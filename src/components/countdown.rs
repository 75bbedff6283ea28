use chrono::{DateTime, Local};
use gloo_timers::callback::Interval;
use std::cell::RefCell;
use web_sys::{Document, Element};
use yew::prelude::*;

use crate::countdown::{self, CountdownClock, Remaining};

const TICK_MS: u32 = 1_000;

/// The page's existing `#days`, `#hours`, `#minutes` and `#seconds` elements.
#[derive(Clone, PartialEq)]
pub struct CountdownDisplay {
    fields: [Element; 4],
}

impl CountdownDisplay {
    /// None unless all four fields are present.
    pub fn find(document: &Document) -> Option<Self> {
        let fields = countdown::display_fields(|id| document.get_element_by_id(id))?;
        Some(Self { fields })
    }

    fn show(&self, remaining: &Remaining) {
        for (element, text) in self.fields.iter().zip(remaining.fields()) {
            element.set_text_content(Some(&text));
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct CountdownProps {
    pub target: DateTime<Local>,
    pub display: CountdownDisplay,
}

fn advance(clock: &RefCell<CountdownClock<Local>>, display: &CountdownDisplay, running: &UseStateHandle<bool>) {
    let mut clock = clock.borrow_mut();
    let Some(remaining) = clock.tick(&Local::now()) else {
        return;
    };
    display.show(&remaining);
    if !clock.is_running() {
        running.set(false);
    }
}

/// Renders nothing itself; it keeps the server-rendered fields up to date and
/// drops its interval once the target is reached.
#[function_component(CountdownTimer)]
pub fn countdown_timer(props: &CountdownProps) -> Html {
    let target = props.target;
    let clock = use_mut_ref(|| CountdownClock::new(target));
    let running = use_state(|| true);

    {
        let display = props.display.clone();
        let running = running.clone();
        let is_running = *running;
        use_effect_with_deps(
            move |is_running| {
                let interval = if *is_running {
                    advance(&clock, &display, &running);
                    Some(Interval::new(TICK_MS, move || advance(&clock, &display, &running)))
                } else {
                    log::info!("Countdown to {} finished", target);
                    None
                };

                move || drop(interval)
            },
            is_running,
        );
    }

    html! {}
}

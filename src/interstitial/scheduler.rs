use gloo_timers::callback::{Interval, Timeout};
use yew::Callback;

use super::viewer::SessionId;

/// Timer continuations driven into the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    CountdownTick,
    FrameGrace(SessionId),
    FrameTimeout(SessionId),
}

/// Source of real-time continuations. Dropping a handle cancels its timer.
pub trait Scheduler {
    type Handle;

    fn every(&mut self, millis: u32, event: TimerEvent) -> Self::Handle;
    fn after(&mut self, millis: u32, event: TimerEvent) -> Self::Handle;
}

/// Keeps a browser timer alive; dropping it clears the timer.
pub enum TimerHandle {
    Interval { _interval: Interval },
    Timeout { _timeout: Timeout },
}

/// Browser timers feeding their events back into a Yew component.
pub struct GlooScheduler {
    on_timer: Callback<TimerEvent>,
}

impl GlooScheduler {
    pub fn new(on_timer: Callback<TimerEvent>) -> Self {
        Self { on_timer }
    }
}

impl Scheduler for GlooScheduler {
    type Handle = TimerHandle;

    fn every(&mut self, millis: u32, event: TimerEvent) -> TimerHandle {
        let on_timer = self.on_timer.clone();
        TimerHandle::Interval {
            _interval: Interval::new(millis, move || on_timer.emit(event)),
        }
    }

    fn after(&mut self, millis: u32, event: TimerEvent) -> TimerHandle {
        let on_timer = self.on_timer.clone();
        TimerHandle::Timeout {
            _timeout: Timeout::new(millis, move || on_timer.emit(event)),
        }
    }
}

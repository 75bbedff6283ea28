use crate::config::Settings;

use super::scheduler::{Scheduler, TimerEvent};
use super::viewer::{FrameInspector, SessionId, ViewerSession};

pub const CONFIRM_LABEL: &str = "確認して移動";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timing {
    pub confirm_seconds: u32,
    pub tick_ms: u32,
    pub frame_grace_ms: u32,
    pub frame_timeout_ms: u32,
}

impl From<&Settings> for Timing {
    fn from(settings: &Settings) -> Self {
        Self {
            confirm_seconds: settings.confirm_seconds,
            tick_ms: settings.countdown_tick_ms,
            frame_grace_ms: settings.frame_grace_ms,
            frame_timeout_ms: settings.frame_timeout_ms,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

/// Seconds left before the confirm action unlocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmationCountdown {
    remaining: u32,
}

impl ConfirmationCountdown {
    pub fn new(seconds: u32) -> Self {
        Self { remaining: seconds }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_unlocked(&self) -> bool {
        self.remaining == 0
    }

    /// Returns true on the tick that unlocks confirmation.
    fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }

    pub fn label(&self) -> String {
        if self.is_unlocked() {
            CONFIRM_LABEL.to_string()
        } else {
            format!("{} ({}秒)", CONFIRM_LABEL, self.remaining)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingNavigation {
    pub url: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Dialog {
    pub pending: PendingNavigation,
    pub countdown: ConfirmationCountdown,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stage {
    Idle,
    Confirming(Dialog),
    Viewing(ViewerSession),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DismissReason {
    Cancel,
    CloseIcon,
    Backdrop,
    Escape,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewerExit {
    Back,
    Escape,
}

/// Owns the disclaimer dialog, its countdown timer and the embedded viewer.
///
/// Every path that leaves a stage goes through [`Controller::teardown`], which
/// drops all timer handles, so no continuation outlives the stage it was armed
/// for.
pub struct Controller<S: Scheduler> {
    scheduler: S,
    timing: Timing,
    stage: Stage,
    countdown_timer: Option<S::Handle>,
    frame_timeout: Option<S::Handle>,
    frame_grace: Option<S::Handle>,
    next_session: SessionId,
    focus_confirm: bool,
}

impl<S: Scheduler> Controller<S> {
    pub fn new(scheduler: S, timing: Timing) -> Self {
        Self {
            scheduler,
            timing,
            stage: Stage::Idle,
            countdown_timer: None,
            frame_timeout: None,
            frame_grace: None,
            next_session: 1,
            focus_confirm: false,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        match &self.stage {
            Stage::Confirming(dialog) => Some(dialog),
            _ => None,
        }
    }

    pub fn viewer(&self) -> Option<&ViewerSession> {
        match &self.stage {
            Stage::Viewing(session) => Some(session),
            _ => None,
        }
    }

    /// Whether an overlay is up, which is when page scrolling is locked and
    /// the Escape listener must be attached.
    pub fn is_open(&self) -> bool {
        !matches!(self.stage, Stage::Idle)
    }

    pub fn has_running_timers(&self) -> bool {
        self.countdown_timer.is_some() || self.frame_timeout.is_some() || self.frame_grace.is_some()
    }

    /// Returns true once after the confirm action unlocks.
    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_confirm)
    }

    /// An outbound link was activated. Ignored while any overlay is open.
    pub fn activate(&mut self, url: impl Into<String>) -> bool {
        if self.is_open() {
            log::debug!("Interstitial already open; ignoring activation");
            return false;
        }
        let url = url.into();
        log::info!("Confirming navigation to {}", url);

        self.teardown();
        let countdown = ConfirmationCountdown::new(self.timing.confirm_seconds);
        if !countdown.is_unlocked() {
            self.countdown_timer = Some(self.scheduler.every(self.timing.tick_ms, TimerEvent::CountdownTick));
        } else {
            self.focus_confirm = true;
        }
        self.stage = Stage::Confirming(Dialog {
            pending: PendingNavigation { url },
            countdown,
        });
        true
    }

    pub fn dismiss(&mut self, reason: DismissReason) -> bool {
        if self.dialog().is_none() {
            return false;
        }
        log::debug!("Interstitial dismissed ({:?})", reason);
        self.teardown();
        true
    }

    /// Confirms the pending navigation and opens the viewer on it. Does nothing
    /// while the countdown is still running.
    pub fn confirm(&mut self) -> bool {
        let url = match &self.stage {
            Stage::Confirming(dialog) if dialog.countdown.is_unlocked() => dialog.pending.url.clone(),
            _ => return false,
        };
        self.teardown();
        self.open_viewer(url);
        true
    }

    fn open_viewer(&mut self, url: String) {
        let id = self.next_session;
        self.next_session += 1;
        log::info!("Opening viewer {} on {}", id, url);

        self.frame_timeout = Some(self.scheduler.after(self.timing.frame_timeout_ms, TimerEvent::FrameTimeout(id)));
        self.stage = Stage::Viewing(ViewerSession::new(id, url));
    }

    /// The embedded frame fired its load event; probe it after the grace period.
    /// A later load replaces any grace check still pending.
    pub fn frame_loaded(&mut self) {
        let Stage::Viewing(session) = &mut self.stage else {
            return;
        };
        if session.is_blocked() {
            return;
        }
        session.record_load();
        let id = session.id();
        self.frame_grace = Some(self.scheduler.after(self.timing.frame_grace_ms, TimerEvent::FrameGrace(id)));
    }

    pub fn close_viewer(&mut self, exit: ViewerExit) -> bool {
        if self.viewer().is_none() {
            return false;
        }
        log::debug!("Viewer closed ({:?})", exit);
        self.teardown();
        true
    }

    /// Escape closes whichever overlay is open; with nothing open it is inert.
    pub fn escape(&mut self) -> bool {
        match self.stage {
            Stage::Idle => false,
            Stage::Confirming(_) => self.dismiss(DismissReason::Escape),
            Stage::Viewing(_) => self.close_viewer(ViewerExit::Escape),
        }
    }

    pub fn on_timer(&mut self, event: TimerEvent, frame: &dyn FrameInspector) {
        match event {
            TimerEvent::CountdownTick => self.countdown_tick(),
            TimerEvent::FrameGrace(id) => self.frame_grace_elapsed(id, frame),
            TimerEvent::FrameTimeout(id) => self.frame_timeout_elapsed(id, frame),
        }
    }

    fn countdown_tick(&mut self) {
        let Stage::Confirming(dialog) = &mut self.stage else {
            self.countdown_timer = None;
            return;
        };
        if dialog.countdown.tick() {
            self.countdown_timer = None;
            self.focus_confirm = true;
        }
    }

    fn current_session(&mut self, id: SessionId) -> Option<&mut ViewerSession> {
        match &mut self.stage {
            Stage::Viewing(session) if session.id() == id && !session.is_blocked() => Some(session),
            _ => None,
        }
    }

    fn frame_grace_elapsed(&mut self, id: SessionId, frame: &dyn FrameInspector) {
        let Some(session) = self.current_session(id) else {
            return;
        };
        let probe = frame.probe();
        if probe.is_blank() {
            log::warn!("Embedded content for {} appears blocked ({:?})", session.url(), probe);
            session.mark_blocked();
            self.cancel_frame_guards();
        } else {
            session.mark_loaded();
            self.frame_grace = None;
        }
    }

    fn frame_timeout_elapsed(&mut self, id: SessionId, frame: &dyn FrameInspector) {
        let Some(session) = self.current_session(id) else {
            return;
        };
        // Only a missing load signal counts here; a frame that did load is
        // judged by its grace check.
        if !session.load_seen() || !frame.has_source() {
            log::warn!("Embedded content for {} never loaded", session.url());
            session.mark_blocked();
            self.cancel_frame_guards();
        } else {
            self.frame_timeout = None;
        }
    }

    fn cancel_frame_guards(&mut self) {
        self.frame_timeout = None;
        self.frame_grace = None;
    }

    /// Cancels every timer and returns to idle.
    pub fn teardown(&mut self) {
        self.countdown_timer = None;
        self.cancel_frame_guards();
        self.focus_confirm = false;
        self.stage = Stage::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interstitial::scheduler::manual::ManualScheduler;
    use crate::interstitial::viewer::{FrameProbe, FrameStatus};
    use pretty_assertions::assert_eq;

    const URL: &str = "https://reader.example.jp/series/1";

    struct StubFrame {
        probe: FrameProbe,
        has_source: bool,
    }

    impl StubFrame {
        fn showing(href: &str) -> Self {
            Self {
                probe: FrameProbe::Document { href: href.to_string() },
                has_source: true,
            }
        }

        fn cross_origin() -> Self {
            Self {
                probe: FrameProbe::CrossOrigin,
                has_source: true,
            }
        }
    }

    impl FrameInspector for StubFrame {
        fn probe(&self) -> FrameProbe {
            self.probe.clone()
        }

        fn has_source(&self) -> bool {
            self.has_source
        }
    }

    fn setup() -> (Controller<ManualScheduler>, ManualScheduler) {
        let clock = ManualScheduler::default();
        (Controller::new(clock.clone(), Timing::default()), clock)
    }

    fn advance(controller: &mut Controller<ManualScheduler>, clock: &ManualScheduler, millis: u64, frame: &StubFrame) {
        let until = clock.now() + millis;
        while let Some(event) = clock.next_due(until) {
            controller.on_timer(event, frame);
        }
        clock.set_now(until);
    }

    fn remaining(controller: &Controller<ManualScheduler>) -> u32 {
        controller.dialog().expect("dialog open").countdown.remaining()
    }

    fn unlocked_dialog(frame: &StubFrame) -> (Controller<ManualScheduler>, ManualScheduler) {
        let (mut controller, clock) = setup();
        controller.activate(URL);
        advance(&mut controller, &clock, 3_000, frame);
        (controller, clock)
    }

    #[test]
    fn activation_opens_one_dialog_bound_to_url() {
        let (mut controller, clock) = setup();
        assert!(controller.activate(URL));

        let dialog = controller.dialog().unwrap();
        assert_eq!(dialog.pending.url, URL);
        assert_eq!(dialog.countdown.remaining(), 3);
        assert_eq!(clock.pending(), 1);
    }

    #[test]
    fn reactivation_while_open_is_ignored() {
        let (mut controller, clock) = setup();
        let frame = StubFrame::cross_origin();
        controller.activate(URL);
        advance(&mut controller, &clock, 1_000, &frame);

        assert!(!controller.activate("https://other.example.com/"));
        let dialog = controller.dialog().unwrap();
        assert_eq!(dialog.pending.url, URL);
        assert_eq!(dialog.countdown.remaining(), 2);
        assert_eq!(clock.pending(), 1);
    }

    #[test]
    fn confirm_unlocks_only_after_third_tick() {
        let (mut controller, clock) = setup();
        let frame = StubFrame::cross_origin();
        controller.activate(URL);

        for expected in [3, 2, 1] {
            assert_eq!(remaining(&controller), expected);
            assert_eq!(
                controller.dialog().unwrap().countdown.label(),
                format!("確認して移動 ({}秒)", expected)
            );
            assert!(!controller.confirm());
            assert!(controller.viewer().is_none());
            advance(&mut controller, &clock, 1_000, &frame);
        }

        assert_eq!(remaining(&controller), 0);
        assert_eq!(controller.dialog().unwrap().countdown.label(), "確認して移動");
        assert!(controller.take_focus_request());
        assert!(!controller.take_focus_request());
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn every_dismissal_cancels_countdown() {
        let frame = StubFrame::cross_origin();
        for reason in [
            DismissReason::Cancel,
            DismissReason::CloseIcon,
            DismissReason::Backdrop,
            DismissReason::Escape,
        ] {
            let (mut controller, clock) = setup();
            controller.activate(URL);
            advance(&mut controller, &clock, 1_000, &frame);

            assert!(controller.dismiss(reason));
            assert_eq!(controller.stage(), &Stage::Idle);
            assert!(!controller.has_running_timers());
            assert_eq!(clock.pending(), 0);

            advance(&mut controller, &clock, 10_000, &frame);
            assert_eq!(controller.stage(), &Stage::Idle);
            assert!(!controller.take_focus_request());
        }
    }

    #[test]
    fn escape_dismisses_dialog() {
        let (mut controller, _clock) = setup();
        controller.activate(URL);
        assert!(controller.escape());
        assert!(!controller.is_open());
    }

    #[test]
    fn reopening_after_dismissal_restarts_countdown() {
        let (mut controller, clock) = setup();
        let frame = StubFrame::cross_origin();
        controller.activate(URL);
        advance(&mut controller, &clock, 2_000, &frame);
        controller.dismiss(DismissReason::Cancel);

        controller.activate(URL);
        assert_eq!(remaining(&controller), 3);
        advance(&mut controller, &clock, 1_000, &frame);
        assert_eq!(remaining(&controller), 2);
    }

    #[test]
    fn confirm_opens_viewer_on_same_url() {
        let frame = StubFrame::cross_origin();
        let (mut controller, _clock) = unlocked_dialog(&frame);

        assert!(controller.confirm());
        assert!(controller.dialog().is_none());
        let session = controller.viewer().unwrap();
        assert_eq!(session.url(), URL);
        assert_eq!(session.status(), FrameStatus::Loading);
        assert_eq!(session.origin_label(), "reader.example.jp");
    }

    #[test]
    fn blank_frame_after_grace_shows_fallback() {
        let frame = StubFrame::showing("about:blank");
        let (mut controller, clock) = unlocked_dialog(&frame);
        controller.confirm();

        controller.frame_loaded();
        advance(&mut controller, &clock, 999, &frame);
        assert_eq!(controller.viewer().unwrap().status(), FrameStatus::Loading);

        advance(&mut controller, &clock, 1, &frame);
        assert_eq!(controller.viewer().unwrap().status(), FrameStatus::Blocked);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn missing_document_counts_as_blocked() {
        let frame = StubFrame {
            probe: FrameProbe::NoDocument,
            has_source: true,
        };
        let (mut controller, clock) = unlocked_dialog(&frame);
        controller.confirm();
        controller.frame_loaded();
        advance(&mut controller, &clock, 1_000, &frame);
        assert!(controller.viewer().unwrap().is_blocked());
    }

    #[test]
    fn cross_origin_frame_is_kept() {
        let frame = StubFrame::cross_origin();
        let (mut controller, clock) = unlocked_dialog(&frame);
        controller.confirm();

        controller.frame_loaded();
        advance(&mut controller, &clock, 10_000, &frame);
        assert_eq!(controller.viewer().unwrap().status(), FrameStatus::Loaded);
    }

    #[test]
    fn timeout_blocks_frame_that_never_loaded() {
        let frame = StubFrame::cross_origin();
        let (mut controller, clock) = unlocked_dialog(&frame);
        controller.confirm();

        advance(&mut controller, &clock, 4_999, &frame);
        assert_eq!(controller.viewer().unwrap().status(), FrameStatus::Loading);
        advance(&mut controller, &clock, 1, &frame);
        assert!(controller.viewer().unwrap().is_blocked());
    }

    #[test]
    fn timeout_leaves_loaded_frame_alone() {
        let frame = StubFrame::showing("https://reader.example.jp/series/1");
        let (mut controller, clock) = unlocked_dialog(&frame);
        controller.confirm();
        controller.frame_loaded();

        advance(&mut controller, &clock, 6_000, &frame);
        assert_eq!(controller.viewer().unwrap().status(), FrameStatus::Loaded);
    }

    #[test]
    fn late_cross_origin_load_survives_timeout() {
        let frame = StubFrame::cross_origin();
        let (mut controller, clock) = unlocked_dialog(&frame);
        controller.confirm();

        advance(&mut controller, &clock, 4_500, &frame);
        controller.frame_loaded();
        advance(&mut controller, &clock, 600, &frame);
        assert_eq!(controller.viewer().unwrap().status(), FrameStatus::Loading);

        advance(&mut controller, &clock, 1_000, &frame);
        assert_eq!(controller.viewer().unwrap().status(), FrameStatus::Loaded);
        assert!(!controller.has_running_timers());
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn timeout_blocks_loaded_frame_without_source() {
        let frame = StubFrame {
            probe: FrameProbe::CrossOrigin,
            has_source: false,
        };
        let (mut controller, clock) = unlocked_dialog(&frame);
        controller.confirm();
        controller.frame_loaded();

        advance(&mut controller, &clock, 5_000, &frame);
        assert!(controller.viewer().unwrap().is_blocked());
    }

    #[test]
    fn repeated_loads_keep_one_grace_check() {
        let frame = StubFrame::cross_origin();
        let (mut controller, clock) = unlocked_dialog(&frame);
        controller.confirm();

        for _ in 0..5 {
            controller.frame_loaded();
            advance(&mut controller, &clock, 100, &frame);
        }
        // One timeout guard plus the grace check from the latest load.
        assert_eq!(clock.pending(), 2);

        advance(&mut controller, &clock, 1_000, &frame);
        assert_eq!(controller.viewer().unwrap().status(), FrameStatus::Loaded);
        assert_eq!(clock.pending(), 1);
    }

    #[test]
    fn closing_viewer_cancels_guards_and_disarms_escape() {
        for exit in [ViewerExit::Back, ViewerExit::Escape] {
            let frame = StubFrame::showing("about:blank");
            let (mut controller, clock) = unlocked_dialog(&frame);
            controller.confirm();
            controller.frame_loaded();

            assert!(controller.close_viewer(exit));
            assert!(!controller.is_open());
            assert_eq!(clock.pending(), 0);

            assert!(!controller.escape());
            advance(&mut controller, &clock, 10_000, &frame);
            assert_eq!(controller.stage(), &Stage::Idle);
        }
    }

    #[test]
    fn stale_guard_does_not_touch_next_viewer() {
        let frame = StubFrame::showing("about:blank");
        let (mut controller, clock) = unlocked_dialog(&frame);
        controller.confirm();
        let first = controller.viewer().unwrap().id();
        controller.close_viewer(ViewerExit::Back);

        controller.activate(URL);
        advance(&mut controller, &clock, 3_000, &frame);
        controller.confirm();
        let second = controller.viewer().unwrap().id();
        assert_ne!(first, second);

        controller.on_timer(TimerEvent::FrameTimeout(first), &frame);
        controller.on_timer(TimerEvent::FrameGrace(first), &frame);
        assert_eq!(controller.viewer().unwrap().status(), FrameStatus::Loading);
    }

    #[test]
    fn activation_ignored_while_viewer_open() {
        let frame = StubFrame::cross_origin();
        let (mut controller, _clock) = unlocked_dialog(&frame);
        controller.confirm();

        assert!(!controller.activate("https://other.example.com/"));
        assert_eq!(controller.viewer().unwrap().url(), URL);
    }

    #[test]
    fn zero_second_countdown_starts_unlocked() {
        let clock = ManualScheduler::default();
        let timing = Timing {
            confirm_seconds: 0,
            ..Timing::default()
        };
        let mut controller = Controller::new(clock.clone(), timing);
        controller.activate(URL);

        assert_eq!(clock.pending(), 0);
        assert!(controller.confirm());
    }
}

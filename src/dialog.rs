use crate::{
    Key,
    config::Timings,
    dom::{Document, ElementRef, EventKind, ListenerId, Selector},
    models::AccessLevel,
    timers::{TimerId, TimerQueue, TimerTask},
};

// --- Markup Contract ---

pub const MODAL_ID: &str = "accessDeniedModal";
pub const CURRENT_LEVEL_ID: &str = "currentAccessLevel";
pub const REQUIRED_LEVEL_ID: &str = "requiredAccessLevel";
pub const CLOSE_CLASS: &str = "modal-close";
pub const ACKNOWLEDGE_ID: &str = "closeModalBtn";
pub const BYPASS_ID: &str = "tryHackBtn";

pub const BYPASS_IDLE_LABEL: &str = "ATTEMPT BYPASS";
pub const BYPASS_BUSY_LABEL: &str = "BREACHING...";
pub const BYPASS_FAILED_LABEL: &str = "FAILED...";
const BYPASS_FAILED_BACKGROUND: &str = "linear-gradient(to right, #333, #000)";

/// Where the cosmetic bypass sequence currently is. Each non-idle state owns
/// the timer that moves it on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassState {
    Idle,
    Busy(TimerId),
    Failed(TimerId),
}

/// AccessDialog
///
/// The "insufficient clearance" modal opened by a restricted-link click.
///
/// While open it owns exactly one Escape listener. Every way of closing it
/// detaches that listener and cancels a running bypass sequence, so nothing
/// fires into a dialog that has already gone away.
#[derive(Debug)]
pub struct AccessDialog {
    timings: Timings,
    escape_listener: Option<ListenerId>,
    bypass: BypassState,
}

impl AccessDialog {
    pub fn new(timings: Timings) -> Self {
        Self {
            timings,
            escape_listener: None,
            bypass: BypassState::Idle,
        }
    }

    pub fn is_open(&self) -> bool {
        self.escape_listener.is_some()
    }

    pub fn bypass_state(&self) -> BypassState {
        self.bypass
    }

    /// open
    ///
    /// Fills in both level labels and shows the modal. `current` is `None`
    /// when no session is known and renders as `LEVEL-0`. Returns false, with
    /// a warning, when the page lacks the dialog markup.
    pub fn open(
        &mut self,
        doc: &mut dyn Document,
        current: Option<AccessLevel>,
        required: AccessLevel,
    ) -> bool {
        let (Some(modal), Some(current_el), Some(required_el)) = (
            doc.query(Selector::Id(MODAL_ID)),
            doc.query(Selector::Id(CURRENT_LEVEL_ID)),
            doc.query(Selector::Id(REQUIRED_LEVEL_ID)),
        ) else {
            tracing::warn!("access dialog markup not found on this page");
            return false;
        };

        let current_label = current.map_or_else(|| "LEVEL-0".to_string(), AccessLevel::label);
        doc.set_text(current_el, &current_label);
        doc.set_text(required_el, &required.label());
        doc.set_visible(modal, true);

        if self.escape_listener.is_none() {
            let body = doc.body();
            self.escape_listener = Some(doc.add_listener(body, EventKind::KeyDown));
        }

        tracing::info!(current = %current_label, required = %required, "access dialog opened");
        true
    }

    pub fn close(&mut self, doc: &mut dyn Document, timers: &mut TimerQueue) {
        if let Some(modal) = doc.query(Selector::Id(MODAL_ID)) {
            doc.set_visible(modal, false);
        }
        if let Some(listener) = self.escape_listener.take() {
            doc.remove_listener(listener);
        }
        self.cancel_bypass(doc, timers);
    }

    /// on_click
    ///
    /// Handles clicks on the dialog's own controls and on its overlay.
    /// Returns true when the click belonged to the dialog.
    pub fn on_click(
        &mut self,
        doc: &mut dyn Document,
        timers: &mut TimerQueue,
        target: ElementRef,
    ) -> bool {
        if !self.is_open() {
            return false;
        }
        let Some(modal) = doc.query(Selector::Id(MODAL_ID)) else {
            return false;
        };

        // The modal element itself is the backdrop; its content sits inside it.
        if target == modal {
            self.close(doc, timers);
            return true;
        }

        if doc.closest(target, Selector::Id(BYPASS_ID)).is_some() {
            self.start_bypass(doc, timers);
            return true;
        }

        let close_control = doc.query_first_within(modal, Selector::Class(CLOSE_CLASS));
        let on_close = close_control.is_some()
            && doc.closest(target, Selector::Class(CLOSE_CLASS)) == close_control;
        let on_acknowledge = doc.closest(target, Selector::Id(ACKNOWLEDGE_ID)).is_some();

        if on_close || on_acknowledge {
            self.close(doc, timers);
            return true;
        }
        false
    }

    pub fn on_key(&mut self, doc: &mut dyn Document, timers: &mut TimerQueue, key: &Key) -> bool {
        if *key == Key::Escape && self.is_open() {
            self.close(doc, timers);
            return true;
        }
        false
    }

    /// Advances the bypass sequence. Timers that no longer match the current
    /// state are ignored.
    pub fn on_timer(
        &mut self,
        doc: &mut dyn Document,
        timers: &mut TimerQueue,
        id: TimerId,
        task: TimerTask,
    ) -> bool {
        match (task, self.bypass) {
            (TimerTask::BypassFailed, BypassState::Busy(pending)) if pending == id => {
                if let Some(button) = doc.query(Selector::Id(BYPASS_ID)) {
                    doc.set_text(button, BYPASS_FAILED_LABEL);
                    doc.set_style(button, "background", BYPASS_FAILED_BACKGROUND);
                }
                let reset = timers.schedule(self.timings.bypass_reset, TimerTask::BypassReset);
                self.bypass = BypassState::Failed(reset);
                true
            }
            (TimerTask::BypassReset, BypassState::Failed(pending)) if pending == id => {
                self.bypass = BypassState::Idle;
                reset_bypass_button(doc);
                self.close(doc, timers);
                true
            }
            _ => false,
        }
    }

    fn start_bypass(&mut self, doc: &mut dyn Document, timers: &mut TimerQueue) {
        if self.bypass != BypassState::Idle {
            // Control is disabled while a sequence runs.
            return;
        }
        let Some(button) = doc.query(Selector::Id(BYPASS_ID)) else {
            return;
        };
        doc.set_text(button, BYPASS_BUSY_LABEL);
        doc.set_disabled(button, true);

        let failed = timers.schedule(self.timings.bypass_busy, TimerTask::BypassFailed);
        self.bypass = BypassState::Busy(failed);
        tracing::debug!("bypass sequence started");
    }

    fn cancel_bypass(&mut self, doc: &mut dyn Document, timers: &mut TimerQueue) {
        match self.bypass {
            BypassState::Busy(pending) | BypassState::Failed(pending) => {
                timers.cancel(pending);
                reset_bypass_button(doc);
                self.bypass = BypassState::Idle;
                tracing::debug!("bypass sequence cancelled");
            }
            BypassState::Idle => {}
        }
    }
}

fn reset_bypass_button(doc: &mut dyn Document) {
    if let Some(button) = doc.query(Selector::Id(BYPASS_ID)) {
        doc.set_text(button, BYPASS_IDLE_LABEL);
        doc.set_disabled(button, false);
        doc.set_style(button, "background", "");
    }
}

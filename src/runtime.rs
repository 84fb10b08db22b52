//! Host event loop.
//!
//! One task owns the portal and the document. Events are handled in arrival
//! order and timers fire once their deadline has passed in real time; nothing
//! else touches either value while the loop runs.

use tokio::{
    sync::mpsc,
    time::{Instant, sleep_until},
};

use crate::{Dispatch, Portal, UiEvent, dom::Document};

/// run
///
/// Drives `portal` against `doc` until the sending half of `events` is
/// dropped. Timer deadlines are measured from the moment the loop starts.
/// Before an event is handled the clock catches up, so anything due fires
/// first and tasks scheduled by the event start from the right instant.
pub async fn run<D: Document>(
    portal: &mut Portal,
    doc: &mut D,
    mut events: mpsc::UnboundedReceiver<UiEvent>,
) {
    let started = Instant::now();
    tracing::debug!("event loop started");

    loop {
        let deadline = portal.next_timer_deadline().map(|after| started + after);

        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                portal.advance_clock(doc, started.elapsed());
                let kind = format!("{event:?}");
                match portal.dispatch(doc, event) {
                    Dispatch::Ignored => tracing::trace!(event = %kind, "event ignored"),
                    outcome => tracing::debug!(event = %kind, ?outcome, "event handled"),
                }
            }
            _ = sleep_until(deadline.unwrap_or(started)), if deadline.is_some() => {
                portal.advance_clock(doc, started.elapsed());
            }
        }
    }

    tracing::debug!(pending = portal.timers().len(), "event loop stopped");
}

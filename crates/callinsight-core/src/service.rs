//! The inbound notification handler.
//!
//! [`CallInsightService`] is the single entry point for telephony
//! notifications. It owns the call session, the overlay controller, the
//! foreground indicator and the post-call hand-off, and processes one
//! notification at a time in arrival order.
//!
//! The handler never fails: collaborator errors are logged and swallowed so
//! that one bad cycle cannot stop later notifications from being handled.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::handoff::{FollowUpScreen, HandoffError, PostCallHandoff};
use crate::history::HistoryLookup;
use crate::lifecycle::{CallSession, LifecycleEvent};
use crate::notification::{PhoneStateChange, RawNotification};
use crate::overlay::{OverlayCapability, OverlayController, OverlaySurface};
use crate::state::CallState;

/// Errors from the foreground "running" indicator.
#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("running indicator could not be started: {0}")]
    Start(String),
    #[error("running indicator could not be stopped: {0}")]
    Stop(String),
}

/// The persistent "running" notification that must accompany the overlay.
pub trait ForegroundIndicator {
    fn start(&mut self) -> Result<(), IndicatorError>;
    fn stop(&mut self) -> Result<(), IndicatorError>;
}

#[derive(Debug, Error)]
enum CycleError {
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
    #[error(transparent)]
    Handoff(#[from] HandoffError),
}

/// What one accepted notification amounted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handled {
    pub state: CallState,
    pub event: LifecycleEvent,
}

/// Wires classification, lifecycle tracking, the overlay and the hand-off.
pub struct CallInsightService<S, C, H, F, I>
where
    S: OverlaySurface,
    C: OverlayCapability,
    H: HistoryLookup,
    F: FollowUpScreen,
    I: ForegroundIndicator,
{
    session: CallSession,
    overlay: OverlayController<S, C, H>,
    handoff: PostCallHandoff<F>,
    indicator: I,
    indicator_running: bool,
    call_id: Option<Uuid>,
}

impl<S, C, H, F, I> CallInsightService<S, C, H, F, I>
where
    S: OverlaySurface,
    C: OverlayCapability,
    H: HistoryLookup,
    F: FollowUpScreen,
    I: ForegroundIndicator,
{
    pub fn new(overlay: OverlayController<S, C, H>, screen: F, indicator: I) -> Self {
        Self {
            session: CallSession::default(),
            overlay,
            handoff: PostCallHandoff::new(screen),
            indicator,
            indicator_running: false,
            call_id: None,
        }
    }

    pub const fn session(&self) -> &CallSession {
        &self.session
    }

    pub const fn overlay(&self) -> &OverlayController<S, C, H> {
        &self.overlay
    }

    pub const fn handoff(&self) -> &PostCallHandoff<F> {
        &self.handoff
    }

    pub const fn indicator(&self) -> &I {
        &self.indicator
    }

    /// Handles one raw notification.
    ///
    /// Returns `None` when the notification's action is not a phone-state
    /// change and was ignored.
    pub fn handle(&mut self, raw: &RawNotification) -> Option<Handled> {
        tracing::debug!(
            action = %raw.action,
            state = %raw.state,
            number = ?raw.number,
            "notification received"
        );

        let Some(change) = PhoneStateChange::from_raw(raw) else {
            tracing::debug!(action = %raw.action, "ignoring unrelated action");
            return None;
        };

        let event = self.session.observe(change.state, change.number);
        if let Err(e) = self.dispatch(change.state, &event) {
            tracing::warn!(
                call_id = ?self.call_id,
                state = %change.state,
                error = %e,
                "notification cycle failed"
            );
        }

        Some(Handled {
            state: change.state,
            event,
        })
    }

    /// Tears down the overlay and the indicator, e.g. when the host service
    /// is destroyed. Idempotent.
    pub fn shutdown(&mut self) {
        self.overlay.stop();
        self.stop_indicator();
    }

    fn dispatch(&mut self, state: CallState, event: &LifecycleEvent) -> Result<(), CycleError> {
        if matches!(state, CallState::Ringing | CallState::Active) && self.call_id.is_none() {
            self.call_id = Some(Uuid::new_v4());
        }

        match event {
            LifecycleEvent::Started(number) => {
                tracing::info!(call_id = ?self.call_id, number = ?number, "call started");
                self.start_indicator()?;
                self.overlay.on_lifecycle(event);
                if !self.overlay.is_showing() {
                    self.stop_indicator();
                }
            }
            LifecycleEvent::Ended(number) => {
                tracing::info!(call_id = ?self.call_id, number = ?number, "call ended");
                self.overlay.on_lifecycle(event);
                self.stop_indicator();
                self.call_id = None;
                self.handoff.trigger(number.as_ref())?;
            }
            LifecycleEvent::NoOp => match state {
                CallState::Active => {
                    let number = self.session.last_known_number.clone();
                    self.overlay.on_state_refresh(number.as_ref());
                    if !self.overlay.is_showing() {
                        self.stop_indicator();
                    }
                }
                CallState::Idle => {
                    self.shutdown();
                    self.call_id = None;
                }
                CallState::Ringing | CallState::Unknown => {}
            },
        }
        Ok(())
    }

    fn start_indicator(&mut self) -> Result<(), IndicatorError> {
        if !self.indicator_running {
            self.indicator.start()?;
            self.indicator_running = true;
        }
        Ok(())
    }

    fn stop_indicator(&mut self) {
        if !self.indicator_running {
            return;
        }
        self.indicator_running = false;
        if let Err(e) = self.indicator.stop() {
            tracing::warn!(error = %e, "failed to stop running indicator");
        }
    }
}

impl<S, C, H, F, I> Drop for CallInsightService<S, C, H, F, I>
where
    S: OverlaySurface,
    C: OverlayCapability,
    H: HistoryLookup,
    F: FollowUpScreen,
    I: ForegroundIndicator,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

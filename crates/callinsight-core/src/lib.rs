//! Core call tracking logic for CallInsight.
//!
//! This crate contains the fundamental types and logic for:
//! - Classification: mapping noisy telephony state tokens to call states
//! - Lifecycle tracking: deriving call start/end edges from those states
//! - Overlay control: showing, refreshing and releasing the in-call overlay
//! - Post-call hand-off: opening the follow-up screen once per call
//!
//! Platform concerns (windowing, notifications, data stores) are reached
//! through the collaborator traits defined here.

pub mod handoff;
pub mod history;
pub mod lifecycle;
pub mod notification;
pub mod overlay;
pub mod service;
pub mod state;
pub mod types;

#[cfg(test)]
mod testing;

pub use handoff::{FollowUp, FollowUpScreen, HandoffError, PostCallHandoff};
pub use history::{
    Direction, HistoryError, HistoryLookup, HistorySource, InteractionKind, MAX_SUMMARY_CHARS,
    MergedHistory, OVERLAY_ITEM_LIMIT, OverlayContentItem,
};
pub use lifecycle::{CallSession, LifecycleEvent, observe};
pub use notification::{NotificationAction, PhoneStateChange, RawNotification};
pub use overlay::{
    OverlayCapability, OverlayContent, OverlayController, OverlayState, OverlaySurface,
    PendingLookup, SurfaceError, UNKNOWN_NUMBER_LABEL,
};
pub use service::{CallInsightService, ForegroundIndicator, Handled, IndicatorError};
pub use state::{CallState, classify};
pub use types::{PhoneNumber, ValidationError};

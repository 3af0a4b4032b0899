//! Overlay surface lifecycle.
//!
//! [`OverlayController`] owns the single transient surface shown during a
//! call. It is a two-state machine (`Hidden` and `Showing`): the surface is
//! acquired only after the overlay capability check passes and released on
//! every path out of `Showing`, including drop.
//!
//! History lookups may be slow. Hosts that run them off the event path use
//! [`OverlayController::begin_refresh`] and
//! [`OverlayController::complete_refresh`]; every release invalidates
//! outstanding lookups so a late result can never resurrect a hidden overlay.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::history::{HistoryLookup, OVERLAY_ITEM_LIMIT, OverlayContentItem};
use crate::lifecycle::LifecycleEvent;
use crate::types::PhoneNumber;

/// Header shown when the caller's number is not known.
pub const UNKNOWN_NUMBER_LABEL: &str = "(unknown number)";

/// Errors reported by the windowing collaborator.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("window manager rejected the overlay: {0}")]
    Rejected(String),
    #[error("overlay surface is no longer attached")]
    Detached,
}

/// Rendered overlay text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayContent {
    pub header: String,
    /// One entry per display slot; unused slots are empty strings.
    pub lines: Vec<String>,
}

impl OverlayContent {
    #[must_use]
    pub fn render(number: Option<&PhoneNumber>, items: &[OverlayContentItem], slots: usize) -> Self {
        let label = number.map_or(UNKNOWN_NUMBER_LABEL, PhoneNumber::as_str);
        let mut lines: Vec<String> = items.iter().take(slots).map(ToString::to_string).collect();
        lines.resize(slots, String::new());
        Self {
            header: format!("Recent with {label}"),
            lines,
        }
    }
}

impl fmt::Display for OverlayContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)?;
        for line in &self.lines {
            write!(f, "\n  {line}")?;
        }
        Ok(())
    }
}

/// The windowing collaborator that actually draws the overlay.
pub trait OverlaySurface {
    fn show(&mut self, content: &OverlayContent) -> Result<(), SurfaceError>;
    fn update(&mut self, content: &OverlayContent) -> Result<(), SurfaceError>;
    fn hide(&mut self) -> Result<(), SurfaceError>;
}

/// Whether the app may currently draw over other apps.
///
/// Queried on every show and refresh attempt; the user can revoke the
/// permission at any time.
pub trait OverlayCapability {
    fn can_show_overlay(&self) -> bool;
}

impl<F: Fn() -> bool> OverlayCapability for F {
    fn can_show_overlay(&self) -> bool {
        self()
    }
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Hidden,
    Showing,
}

/// An outstanding history lookup for the current surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLookup {
    generation: u64,
    pub number: Option<PhoneNumber>,
    pub limit: usize,
}

/// Owns the overlay surface and drives it from lifecycle events.
pub struct OverlayController<S, C, H>
where
    S: OverlaySurface,
    C: OverlayCapability,
    H: HistoryLookup,
{
    surface: S,
    capability: C,
    history: H,
    state: OverlayState,
    limit: usize,
    number: Option<PhoneNumber>,
    generation: u64,
}

impl<S, C, H> OverlayController<S, C, H>
where
    S: OverlaySurface,
    C: OverlayCapability,
    H: HistoryLookup,
{
    pub fn new(surface: S, capability: C, history: H) -> Self {
        Self {
            surface,
            capability,
            history,
            state: OverlayState::Hidden,
            limit: OVERLAY_ITEM_LIMIT,
            number: None,
            generation: 0,
        }
    }

    /// Sets how many history items the overlay displays, capped at
    /// [`OVERLAY_ITEM_LIMIT`].
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        if limit > OVERLAY_ITEM_LIMIT {
            tracing::warn!(limit, max = OVERLAY_ITEM_LIMIT, "history limit capped");
        }
        self.limit = limit.min(OVERLAY_ITEM_LIMIT);
        self
    }

    pub const fn state(&self) -> OverlayState {
        self.state
    }

    pub const fn is_showing(&self) -> bool {
        matches!(self.state, OverlayState::Showing)
    }

    pub const fn surface(&self) -> &S {
        &self.surface
    }

    /// Reacts to a lifecycle edge. `NoOp` is ignored.
    pub fn on_lifecycle(&mut self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Started(number) => {
                self.show(number.as_ref());
            }
            LifecycleEvent::Ended(_) => self.stop(),
            LifecycleEvent::NoOp => {}
        }
    }

    /// Acquires the surface for a new call. Idempotent while showing.
    ///
    /// Declines silently (with a log line) when overlays are not permitted.
    /// Returns whether the overlay is showing afterwards.
    pub fn show(&mut self, number: Option<&PhoneNumber>) -> bool {
        if self.is_showing() {
            tracing::debug!("overlay already showing");
            return true;
        }
        if !self.capability.can_show_overlay() {
            tracing::info!("overlay permission not granted, not showing overlay");
            return false;
        }

        let items = self.history.lookup(number, self.limit);
        let content = OverlayContent::render(number, &items, self.limit);
        match self.surface.show(&content) {
            Ok(()) => {
                self.state = OverlayState::Showing;
                self.number = number.cloned();
                tracing::debug!(items = items.len(), "overlay shown");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to show overlay");
                false
            }
        }
    }

    /// Re-renders the live overlay in place for an intermediate state.
    ///
    /// A `None` number keeps the number the overlay was shown for. If the
    /// overlay capability has been revoked, the surface is released.
    pub fn on_state_refresh(&mut self, number: Option<&PhoneNumber>) {
        if let Some(pending) = self.begin_refresh(number) {
            let items = self.history.lookup(pending.number.as_ref(), pending.limit);
            self.complete_refresh(pending, &items);
        }
    }

    /// Starts a refresh, returning the lookup to run, or `None` if there is
    /// nothing to refresh.
    pub fn begin_refresh(&mut self, number: Option<&PhoneNumber>) -> Option<PendingLookup> {
        if !self.is_showing() {
            return None;
        }
        if !self.capability.can_show_overlay() {
            tracing::info!("overlay permission revoked, releasing overlay");
            self.stop();
            return None;
        }
        if let Some(number) = number {
            self.number = Some(number.clone());
        }
        Some(PendingLookup {
            generation: self.generation,
            number: self.number.clone(),
            limit: self.limit,
        })
    }

    /// Applies the result of a lookup started with [`Self::begin_refresh`].
    ///
    /// Results for a surface that has since been released are discarded.
    /// Returns whether the surface was updated.
    pub fn complete_refresh(&mut self, pending: PendingLookup, items: &[OverlayContentItem]) -> bool {
        if !self.is_showing() || pending.generation != self.generation {
            tracing::debug!("discarding stale history lookup");
            return false;
        }
        let content = OverlayContent::render(pending.number.as_ref(), items, pending.limit);
        match self.surface.update(&content) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to update overlay");
                false
            }
        }
    }

    /// Releases the surface if held. Safe to call any number of times.
    pub fn stop(&mut self) {
        if !self.is_showing() {
            return;
        }
        self.state = OverlayState::Hidden;
        self.number = None;
        self.generation = self.generation.wrapping_add(1);
        if let Err(e) = self.surface.hide() {
            tracing::warn!(error = %e, "failed to hide overlay");
        } else {
            tracing::debug!("overlay hidden");
        }
    }
}

impl<S, C, H> Drop for OverlayController<S, C, H>
where
    S: OverlaySurface,
    C: OverlayCapability,
    H: HistoryLookup,
{
    fn drop(&mut self) {
        self.stop();
    }
}

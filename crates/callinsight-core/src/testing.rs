//! Recording collaborators for unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::handoff::{FollowUpScreen, HandoffError};
use crate::history::{HistoryLookup, OverlayContentItem};
use crate::overlay::{OverlayContent, OverlaySurface, SurfaceError};
use crate::service::{ForegroundIndicator, IndicatorError};
use crate::types::PhoneNumber;

/// Ordered log shared between fakes, for cross-collaborator ordering checks.
pub type Journal = Rc<RefCell<Vec<String>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Show(OverlayContent),
    Update(OverlayContent),
    Hide,
}

#[derive(Default)]
pub struct RecordingSurface {
    log: Rc<RefCell<Vec<SurfaceCall>>>,
    journal: Journal,
    live: usize,
    fail_next_show: bool,
}

impl RecordingSurface {
    pub fn with_journal(journal: &Journal) -> Self {
        Self {
            journal: Rc::clone(journal),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.log.borrow().clone()
    }

    pub fn shared_log(&self) -> Rc<RefCell<Vec<SurfaceCall>>> {
        Rc::clone(&self.log)
    }

    pub const fn live(&self) -> usize {
        self.live
    }

    pub fn fail_next_show(&mut self) {
        self.fail_next_show = true;
    }
}

impl OverlaySurface for RecordingSurface {
    fn show(&mut self, content: &OverlayContent) -> Result<(), SurfaceError> {
        if self.fail_next_show {
            self.fail_next_show = false;
            return Err(SurfaceError::Rejected("token expired".to_string()));
        }
        assert_eq!(self.live, 0, "surface shown while another is live");
        self.live += 1;
        self.journal.borrow_mut().push("overlay show".to_string());
        self.log.borrow_mut().push(SurfaceCall::Show(content.clone()));
        Ok(())
    }

    fn update(&mut self, content: &OverlayContent) -> Result<(), SurfaceError> {
        if self.live == 0 {
            return Err(SurfaceError::Detached);
        }
        self.journal.borrow_mut().push("overlay update".to_string());
        self.log.borrow_mut().push(SurfaceCall::Update(content.clone()));
        Ok(())
    }

    fn hide(&mut self) -> Result<(), SurfaceError> {
        self.live = self.live.saturating_sub(1);
        self.journal.borrow_mut().push("overlay hide".to_string());
        self.log.borrow_mut().push(SurfaceCall::Hide);
        Ok(())
    }
}

/// Returns fixed items and records every request.
#[derive(Default)]
pub struct CountingHistory {
    items: Vec<OverlayContentItem>,
    requests: RefCell<Vec<(Option<String>, usize)>>,
}

impl CountingHistory {
    pub fn with_items(items: Vec<OverlayContentItem>) -> Self {
        Self {
            items,
            requests: RefCell::default(),
        }
    }

    pub fn requests(&self) -> Vec<(Option<String>, usize)> {
        self.requests.borrow().clone()
    }
}

impl HistoryLookup for CountingHistory {
    fn lookup(&self, number: Option<&PhoneNumber>, limit: usize) -> Vec<OverlayContentItem> {
        self.requests
            .borrow_mut()
            .push((number.map(ToString::to_string), limit));
        self.items.iter().take(limit).cloned().collect()
    }
}

#[derive(Default)]
pub struct RecordingScreen {
    opened: Vec<String>,
    journal: Journal,
    pub fail: bool,
}

impl RecordingScreen {
    pub fn with_journal(journal: &Journal) -> Self {
        Self {
            journal: Rc::clone(journal),
            ..Self::default()
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.clone()
    }
}

impl FollowUpScreen for RecordingScreen {
    fn open(&mut self, number: &str) -> Result<(), HandoffError> {
        if self.fail {
            return Err(HandoffError::Launch("no activity".to_string()));
        }
        self.journal.borrow_mut().push(format!("follow-up {number}"));
        self.opened.push(number.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingIndicator {
    journal: Journal,
    pub running: bool,
    pub starts: usize,
    pub fail_start: bool,
    pub fail_stop: bool,
}

impl RecordingIndicator {
    pub fn with_journal(journal: &Journal) -> Self {
        Self {
            journal: Rc::clone(journal),
            ..Self::default()
        }
    }
}

impl ForegroundIndicator for RecordingIndicator {
    fn start(&mut self) -> Result<(), IndicatorError> {
        if self.fail_start {
            return Err(IndicatorError::Start("not allowed from background".to_string()));
        }
        self.running = true;
        self.starts += 1;
        self.journal.borrow_mut().push("indicator start".to_string());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), IndicatorError> {
        self.running = false;
        self.journal.borrow_mut().push("indicator stop".to_string());
        if self.fail_stop {
            return Err(IndicatorError::Stop("notification manager gone".to_string()));
        }
        Ok(())
    }
}

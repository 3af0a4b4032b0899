//! Console stand-ins for the platform collaborators.
//!
//! Each collaborator writes what it would have done to a shared transcript,
//! so a replay shows the overlay, indicator and follow-up activity in the
//! order it happened.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use callinsight_core::{
    FollowUp, FollowUpScreen, ForegroundIndicator, HandoffError, IndicatorError, OverlayContent,
    OverlaySurface, SurfaceError,
};

/// A line-oriented writer shared by all console collaborators.
pub struct Transcript<W: Write> {
    out: Rc<RefCell<W>>,
}

impl<W: Write> Clone for Transcript<W> {
    fn clone(&self) -> Self {
        Self {
            out: Rc::clone(&self.out),
        }
    }
}

impl<W: Write> Transcript<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Rc::new(RefCell::new(out)),
        }
    }

    /// Writes one line.
    pub fn line(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
        let mut out = self.out.borrow_mut();
        out.write_fmt(args)?;
        out.write_all(b"\n")
    }
}

/// Prints overlay operations instead of drawing a window.
pub struct ConsoleSurface<W: Write> {
    transcript: Transcript<W>,
}

impl<W: Write> ConsoleSurface<W> {
    pub const fn new(transcript: Transcript<W>) -> Self {
        Self { transcript }
    }

    fn render(&self, verb: &str, content: &OverlayContent) -> io::Result<()> {
        self.transcript
            .line(format_args!("overlay {verb}: {}", content.header))?;
        for line in content.lines.iter().filter(|l| !l.is_empty()) {
            self.transcript.line(format_args!("  | {line}"))?;
        }
        Ok(())
    }
}

impl<W: Write> OverlaySurface for ConsoleSurface<W> {
    fn show(&mut self, content: &OverlayContent) -> Result<(), SurfaceError> {
        self.render("show", content)
            .map_err(|e| SurfaceError::Rejected(e.to_string()))
    }

    fn update(&mut self, content: &OverlayContent) -> Result<(), SurfaceError> {
        self.render("update", content)
            .map_err(|e| SurfaceError::Rejected(e.to_string()))
    }

    fn hide(&mut self) -> Result<(), SurfaceError> {
        self.transcript
            .line(format_args!("overlay hide"))
            .map_err(|_| SurfaceError::Detached)
    }
}

/// Prints the running indicator's start and stop.
pub struct ConsoleIndicator<W: Write> {
    transcript: Transcript<W>,
}

impl<W: Write> ConsoleIndicator<W> {
    pub const fn new(transcript: Transcript<W>) -> Self {
        Self { transcript }
    }
}

impl<W: Write> ForegroundIndicator for ConsoleIndicator<W> {
    fn start(&mut self) -> Result<(), IndicatorError> {
        self.transcript
            .line(format_args!("indicator start"))
            .map_err(|e| IndicatorError::Start(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), IndicatorError> {
        self.transcript
            .line(format_args!("indicator stop"))
            .map_err(|e| IndicatorError::Stop(e.to_string()))
    }
}

/// Prints the follow-up screen the user would land on.
pub struct ConsoleScreen<W: Write> {
    transcript: Transcript<W>,
}

impl<W: Write> ConsoleScreen<W> {
    pub const fn new(transcript: Transcript<W>) -> Self {
        Self { transcript }
    }
}

impl<W: Write> FollowUpScreen for ConsoleScreen<W> {
    fn open(&mut self, number: &str) -> Result<(), HandoffError> {
        let follow_up = FollowUp::new(number);
        let compose = follow_up.compose_uri().unwrap_or_else(|| "-".to_string());
        self.transcript
            .line(format_args!("follow-up: {follow_up} [compose: {compose}]"))
            .map_err(|e| HandoffError::Launch(e.to_string()))
    }
}

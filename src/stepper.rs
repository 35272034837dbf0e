//! Progressive reveal stepper
//!
//! Walks a document line by line, `lines_per_tick` lines per call to
//! [`RevealStepper::tick`]. The stepper knows nothing about timers or
//! rendering: the host decides when to tick and how to draw the update.
//!
//! Page rollover is lazy. When the last line of a page is revealed the cursor
//! stays on that page (`line_index == line_count`), and the move to the next
//! page happens at the start of the following tick. Pages without lines are
//! skipped during rollover.

use std::fmt;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::str::FromStr;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::document::{Document, DocumentError, Page};

/// How the host interprets revealed line ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealMode {
    /// Cumulative highlight over revealed lines
    #[default]
    Highlight,
    /// Opaque mask over lines not yet revealed
    Block,
    /// Drive an external viewer with synthetic key presses
    Autoscroll,
}

impl RevealMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevealMode::Highlight => "highlight",
            RevealMode::Block => "block",
            RevealMode::Autoscroll => "autoscroll",
        }
    }
}

impl fmt::Display for RevealMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevealMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "highlight" => Ok(RevealMode::Highlight),
            "block" => Ok(RevealMode::Block),
            "autoscroll" => Ok(RevealMode::Autoscroll),
            other => Err(format!(
                "unknown mode '{other}' (expected highlight, block or autoscroll)"
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PacerError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepperConfig {
    pub lines_per_tick: NonZeroUsize,
    pub mode: RevealMode,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            lines_per_tick: NonZeroUsize::MIN,
            mode: RevealMode::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorPosition {
    pub page_index: usize,
    /// Next line to reveal; equal to the page's line count once exhausted
    pub line_index: usize,
}

/// Lines revealed by one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealUpdate {
    pub page_index: usize,
    /// Half-open range of line indices on `page_index`
    pub revealed: Range<usize>,
    pub mode: RevealMode,
    /// True when this tick rolled over onto a new page
    pub page_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Revealed(RevealUpdate),
    /// No lines left anywhere in the document
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub page_index: usize,
    pub line_index: usize,
    pub total_lines: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepperState {
    Idle,
    Revealing,
    Complete,
}

pub struct RevealStepper<D: Document> {
    document: D,
    config: StepperConfig,
    cursor: CursorPosition,
    current: Option<D::Page>,
    state: StepperState,
}

impl<D: Document> RevealStepper<D> {
    /// Create a stepper positioned at the first line of the first page
    pub fn new(document: D) -> Result<Self, PacerError> {
        let current = if document.page_count() > 0 {
            Some(document.page(0)?)
        } else {
            None
        };

        Ok(Self {
            document,
            config: StepperConfig::default(),
            cursor: CursorPosition::default(),
            current,
            state: StepperState::Idle,
        })
    }

    /// Set lines per tick and mode. A zero line count is rejected and leaves
    /// the previous configuration untouched.
    pub fn configure(&mut self, lines_per_tick: usize, mode: RevealMode) -> Result<(), PacerError> {
        let lines_per_tick = NonZeroUsize::new(lines_per_tick).ok_or_else(|| {
            PacerError::InvalidConfig("lines per tick must be at least 1".to_string())
        })?;
        self.config = StepperConfig {
            lines_per_tick,
            mode,
        };
        debug!("Stepper configured: {lines_per_tick} lines per tick, {mode} mode");
        Ok(())
    }

    /// Reveal the next batch of lines
    pub fn tick(&mut self) -> Result<Tick, PacerError> {
        if self.state == StepperState::Complete {
            return Ok(Tick::Exhausted);
        }

        let page_count = self.document.page_count();
        if page_count == 0 {
            self.finish();
            return Ok(Tick::Exhausted);
        }

        let mut page = match self.current.take() {
            Some(page) => page,
            None => self.document.page(self.cursor.page_index)?,
        };
        let mut page_changed = false;

        while self.cursor.line_index >= page.lines().len() {
            let next = self.cursor.page_index + 1;
            if next >= page_count {
                self.current = Some(page);
                self.finish();
                return Ok(Tick::Exhausted);
            }
            page = match self.document.page(next) {
                Ok(next_page) => next_page,
                Err(e) => {
                    self.current = Some(page);
                    return Err(e.into());
                }
            };
            self.cursor = CursorPosition {
                page_index: next,
                line_index: 0,
            };
            page_changed = true;
        }

        let line_count = page.lines().len();
        let start = self.cursor.line_index;
        let end = (start + self.config.lines_per_tick.get()).min(line_count);
        self.cursor.line_index = end;
        self.current = Some(page);
        self.state = StepperState::Revealing;

        debug!(
            "Revealed lines {start}..{end} of {line_count} on page {}",
            self.cursor.page_index
        );

        Ok(Tick::Revealed(RevealUpdate {
            page_index: self.cursor.page_index,
            revealed: start..end,
            mode: self.config.mode,
            page_changed,
        }))
    }

    /// Return to the first line of the first page
    pub fn reset(&mut self) {
        self.cursor = CursorPosition::default();
        self.state = StepperState::Idle;

        let on_first_page = self
            .current
            .as_ref()
            .is_some_and(|page| page.index() == 0);
        if !on_first_page {
            self.current = None;
            if self.document.page_count() > 0 {
                match self.document.page(0) {
                    Ok(page) => self.current = Some(page),
                    Err(e) => warn!("Could not reload first page on reset: {e}"),
                }
            }
        }
        debug!("Stepper reset");
    }

    #[must_use]
    pub fn current_progress(&self) -> Progress {
        Progress {
            page_index: self.cursor.page_index,
            line_index: self.cursor.line_index,
            total_lines: self.current.as_ref().map_or(0, |page| page.lines().len()),
        }
    }

    #[must_use]
    pub fn position(&self) -> CursorPosition {
        self.cursor
    }

    #[must_use]
    pub fn config(&self) -> StepperConfig {
        self.config
    }

    #[must_use]
    pub fn state(&self) -> StepperState {
        self.state
    }

    #[must_use]
    pub fn document(&self) -> &D {
        &self.document
    }

    /// The page the cursor is on, if it has been fetched
    #[must_use]
    pub fn current_page(&self) -> Option<&D::Page> {
        self.current.as_ref()
    }

    /// Text of the lines named by `update`, when it refers to the current page
    #[must_use]
    pub fn revealed_lines(&self, update: &RevealUpdate) -> Option<&[String]> {
        let page = self.current.as_ref()?;
        if page.index() != update.page_index {
            return None;
        }
        page.lines().get(update.revealed.clone())
    }

    fn finish(&mut self) {
        self.state = StepperState::Complete;
        info!(
            "Document exhausted at page {} line {}",
            self.cursor.page_index, self.cursor.line_index
        );
    }
}

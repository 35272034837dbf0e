//! Reading session: the host-side owner of a stepper
//!
//! The session decides which reveal mode is active, whether ticks are being
//! scheduled, and what each update means: highlight records in highlight
//! mode, key presses in autoscroll mode, nothing extra in block mode (the
//! mask is derived from the cursor when drawing).

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::annotations::AnnotationSheet;
use crate::autoscroll::{Key, KeySender};
use crate::document::{Document, Page, Rect};
use crate::overlay;
use crate::stepper::{PacerError, Progress, RevealMode, RevealStepper, RevealUpdate, StepperState, Tick};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Revealed(RevealUpdate),
    /// The whole document has been revealed; ticking has stopped
    Completed,
}

pub struct ReaderSession<D: Document> {
    stepper: RevealStepper<D>,
    running: bool,
    annotations: AnnotationSheet,
    key_sender: Option<Box<dyn KeySender>>,
    last_update: Option<RevealUpdate>,
}

impl<D: Document> ReaderSession<D> {
    pub fn new(document: D, lines_per_tick: usize, mode: RevealMode) -> Result<Self, PacerError> {
        let annotations = AnnotationSheet::new(document.source());
        let mut stepper = RevealStepper::new(document)?;
        stepper.configure(lines_per_tick, mode)?;
        Ok(Self {
            stepper,
            running: false,
            annotations,
            key_sender: None,
            last_update: None,
        })
    }

    pub fn with_key_sender(mut self, sender: Box<dyn KeySender>) -> Self {
        self.key_sender = Some(sender);
        self
    }

    pub fn key_sender(&self) -> Option<&dyn KeySender> {
        self.key_sender.as_deref()
    }

    pub fn mode(&self) -> RevealMode {
        self.stepper.config().mode
    }

    pub fn lines_per_tick(&self) -> usize {
        self.stepper.config().lines_per_tick.get()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_complete(&self) -> bool {
        self.stepper.state() == StepperState::Complete
    }

    /// Activate `mode`, deactivating the others, and start ticking.
    /// Selecting the mode that is already active toggles ticking instead.
    pub fn select_mode(&mut self, mode: RevealMode) -> Result<(), PacerError> {
        if mode == self.mode() {
            self.toggle();
            return Ok(());
        }
        self.stepper.configure(self.lines_per_tick(), mode)?;
        info!("Switched to {mode} mode");
        self.start();
        Ok(())
    }

    pub fn set_lines_per_tick(&mut self, lines: usize) -> Result<(), PacerError> {
        self.stepper.configure(lines, self.mode())
    }

    /// Begin scheduling ticks, restarting first if the document was finished
    pub fn start(&mut self) {
        if self.is_complete() {
            self.restart();
        }
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn toggle(&mut self) {
        if self.running {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Stop, rewind to the first line and drop collected highlights
    pub fn restart(&mut self) {
        self.stop();
        self.stepper.reset();
        self.annotations.clear();
        self.last_update = None;
    }

    /// Perform one tick and apply it according to the active mode.
    /// The update is kept in `last_update` even when sending keys fails.
    pub fn advance(&mut self) -> Result<SessionEvent> {
        match self.stepper.tick()? {
            Tick::Revealed(update) => {
                self.last_update = Some(update.clone());
                match update.mode {
                    RevealMode::Highlight => {
                        if let Some(page) = self.stepper.current_page() {
                            self.annotations.record(&update, page);
                        }
                    }
                    RevealMode::Autoscroll => {
                        if let Some(sender) = self.key_sender.as_mut() {
                            for _ in update.revealed.clone() {
                                sender.send_key(Key::Down)?;
                            }
                        } else {
                            warn!("Autoscroll tick without a key sender");
                        }
                    }
                    RevealMode::Block => {}
                }
                Ok(SessionEvent::Revealed(update))
            }
            Tick::Exhausted => {
                self.running = false;
                Ok(SessionEvent::Completed)
            }
        }
    }

    pub fn progress(&self) -> Progress {
        self.stepper.current_progress()
    }

    pub fn stepper(&self) -> &RevealStepper<D> {
        &self.stepper
    }

    pub fn annotations(&self) -> &AnnotationSheet {
        &self.annotations
    }

    pub fn last_update(&self) -> Option<&RevealUpdate> {
        self.last_update.as_ref()
    }

    /// Lines of the page under the cursor
    pub fn current_lines(&self) -> &[String] {
        match self.stepper.current_page() {
            Some(page) => page.lines(),
            None => &[],
        }
    }

    /// How many lines of the current page have been revealed
    pub fn revealed_on_current_page(&self) -> usize {
        self.stepper.position().line_index
    }

    /// Highlight rects recorded for `page`
    pub fn highlight_rects(&self, page: usize) -> Vec<Rect> {
        self.annotations
            .rects_by_page()
            .remove(&page)
            .unwrap_or_default()
    }

    pub fn save_annotations(&self, path: &Path) -> Result<()> {
        self.stepper
            .document()
            .persist_annotations(&self.annotations, path)?;
        Ok(())
    }

    /// Write the document with the collected highlights embedded, when its
    /// format supports that
    pub fn save_annotated_copy(&self, path: &Path) -> Result<bool> {
        let written = self
            .stepper
            .document()
            .write_annotated_copy(&self.annotations, path)?;
        Ok(written)
    }

    /// Render the current page with the active mode painted on and save it
    pub fn export_current_page(&self, path: &Path, scale: f32) -> Result<()> {
        let page = self
            .stepper
            .current_page()
            .context("No page is loaded")?;
        let image = overlay::render_annotated(
            page,
            self.mode(),
            self.revealed_on_current_page(),
            &self.highlight_rects(page.index()),
            scale,
        )?;
        overlay::save_png(&image, path)
    }
}

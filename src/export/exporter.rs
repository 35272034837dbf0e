use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::document::{Document, Page};
use crate::export::filename::{
    annotated_copy_path, annotations_path, frame_image_path, page_image_path,
};
use crate::overlay;
use crate::session::{ReaderSession, SessionEvent};
use crate::stepper::RevealMode;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("{0} mode cannot be exported to images")]
    UnsupportedMode(RevealMode),
    #[error("Export scale must be a positive number, got {0}")]
    InvalidScale(f32),
}

#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub mode: RevealMode,
    pub lines_per_tick: usize,
    pub scale: f32,
}

/// Runs a reveal to completion without delay and writes the result to disk.
///
/// Highlight mode produces the annotation sheet plus one image per page with
/// every highlight painted, and for PDFs a copy carrying the highlights as
/// annotations. Block mode produces one frame per tick showing the
/// mask at that point, followed by the annotation sheet (empty in that mode).
pub struct RevealExporter;

impl RevealExporter {
    pub fn export<D: Document>(
        document: D,
        stem: &str,
        out_dir: &Path,
        options: ExportOptions,
    ) -> Result<Vec<PathBuf>> {
        if options.mode == RevealMode::Autoscroll {
            return Err(ExportError::UnsupportedMode(options.mode).into());
        }
        if !options.scale.is_finite() || options.scale <= 0.0 {
            return Err(ExportError::InvalidScale(options.scale).into());
        }

        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;

        let mut session = ReaderSession::new(document, options.lines_per_tick, options.mode)?;
        session.start();

        info!(
            "Exporting {} mode reveal to {}",
            options.mode,
            out_dir.display()
        );

        let mut written = Vec::new();
        let mut frame = 0;
        while let SessionEvent::Revealed(update) = session.advance()? {
            if options.mode == RevealMode::Block {
                frame += 1;
                let path = frame_image_path(out_dir, stem, frame);
                session.export_current_page(&path, options.scale)?;
                debug!("Frame {frame}: page {} lines {:?}", update.page_index, update.revealed);
                written.push(path);
            }
        }

        if options.mode == RevealMode::Highlight {
            written.extend(Self::export_pages(&session, stem, out_dir, options.scale)?);

            let copy = annotated_copy_path(out_dir, stem);
            if session.save_annotated_copy(&copy)? {
                written.push(copy);
            }
        }

        let sheet = annotations_path(out_dir, stem);
        session.save_annotations(&sheet)?;
        written.push(sheet);

        info!("Export wrote {} files", written.len());
        Ok(written)
    }

    fn export_pages<D: Document>(
        session: &ReaderSession<D>,
        stem: &str,
        out_dir: &Path,
        scale: f32,
    ) -> Result<Vec<PathBuf>> {
        let document = session.stepper().document();
        let mut written = Vec::with_capacity(document.page_count());

        for index in 0..document.page_count() {
            let page = document.page(index)?;
            let image = overlay::render_annotated(
                &page,
                RevealMode::Highlight,
                page.lines().len(),
                &session.highlight_rects(index),
                scale,
            )?;
            let path = page_image_path(out_dir, stem, index);
            overlay::save_png(&image, &path)?;
            written.push(path);
        }
        Ok(written)
    }
}

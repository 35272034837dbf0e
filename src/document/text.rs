//! Plain-text document backend
//!
//! Pages are separated by form feed characters, the convention `pdftotext`
//! and most line printers follow. Bounding boxes and rasters are expressed in
//! character cells.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use super::{check_index, Document, DocumentError, Page, PageImage, Rect};
use crate::lines::{split_lines, LinePolicy};

const PAGE_SEPARATOR: char = '\x0c';

/// Raster size of one character cell at scale 1.0
const CELL_WIDTH_PX: f32 = 8.0;
const CELL_HEIGHT_PX: f32 = 16.0;

pub struct TextDocument {
    pages: Vec<String>,
    policy: LinePolicy,
    path: Option<PathBuf>,
}

impl TextDocument {
    pub fn open(path: &Path, policy: LinePolicy) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Open {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

        let pages = if content.is_empty() {
            Vec::new()
        } else {
            content.split(PAGE_SEPARATOR).map(str::to_string).collect()
        };
        debug!("Loaded {} text pages from {}", pages.len(), path.display());

        Ok(Self {
            pages,
            policy,
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory document, one string of text per page
    pub fn from_pages<S: Into<String>>(pages: Vec<S>, policy: LinePolicy) -> Self {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
            policy,
            path: None,
        }
    }
}

impl Document for TextDocument {
    type Page = TextPage;

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<TextPage, DocumentError> {
        check_index(index, self.pages.len())?;
        Ok(TextPage {
            index,
            lines: Arc::new(split_lines(&self.pages[index], self.policy)),
        })
    }

    fn source(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[derive(Clone, Debug)]
pub struct TextPage {
    index: usize,
    lines: Arc<Vec<String>>,
}

impl Page for TextPage {
    fn index(&self) -> usize {
        self.index
    }

    fn lines(&self) -> &[String] {
        &self.lines
    }

    fn find_bounding_boxes(&self, text: &str) -> Vec<Rect> {
        let needle = text.trim();
        if needle.is_empty() {
            return Vec::new();
        }
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.contains(needle))
            .map(|(row, line)| {
                Rect::new(
                    0.0,
                    row as f32,
                    line.chars().count() as f32,
                    (row + 1) as f32,
                )
            })
            .collect()
    }

    fn render_image(&self, scale: f32) -> Result<PageImage, DocumentError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(DocumentError::Render(format!("invalid scale {scale}")));
        }
        let columns = self
            .lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0)
            .max(1);
        let rows = self.lines.len().max(1);

        let scale_x = CELL_WIDTH_PX * scale;
        let scale_y = CELL_HEIGHT_PX * scale;
        let width = ((columns as f32) * scale_x).ceil() as u32;
        let height = ((rows as f32) * scale_y).ceil() as u32;

        Ok(PageImage::blank(width.max(1), height.max(1), scale_x, scale_y))
    }
}

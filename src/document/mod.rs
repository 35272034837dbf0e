//! Document collaborators consumed by the reveal stepper
//!
//! The stepper never touches document bytes. It only asks for a page count,
//! for pages by index, and for each page's lines. Hosts additionally use
//! bounding-box search, rasterization and annotation persistence.

mod text;

use std::path::{Path, PathBuf};

use crate::annotations::AnnotationSheet;
use crate::lines::LinePolicy;

pub use text::{TextDocument, TextPage};

#[cfg(feature = "pdf")]
use crate::pdf::{PdfDocument, PdfPage};

/// Axis-aligned rectangle in page units
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    #[must_use]
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }
}

/// Rasterized page.
///
/// Pixels are RGB, 3 bytes each, row-major without padding. `scale_x` and
/// `scale_y` convert page units into pixels.
#[derive(Clone)]
pub struct PageImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl std::fmt::Debug for PageImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("scale_x", &self.scale_x)
            .field("scale_y", &self.scale_y)
            .finish_non_exhaustive()
    }
}

impl PageImage {
    /// A white image of the given size
    #[must_use]
    pub fn blank(width: u32, height: u32, scale_x: f32, scale_y: f32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0xFF; width as usize * height as usize * 3],
            scale_x,
            scale_y,
        }
    }

    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]])
    }
}

/// Errors surfaced by document collaborators
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("could not open {}: {detail}", path.display())]
    Open { path: PathBuf, detail: String },

    #[error("page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    #[error("render failed: {0}")]
    Render(String),

    #[error("could not persist annotations to {}: {detail}", path.display())]
    Persist { path: PathBuf, detail: String },

    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),
}

/// A single page of a loaded document
pub trait Page {
    /// 0-based page index
    fn index(&self) -> usize;

    /// Lines of extracted text, in reading order
    fn lines(&self) -> &[String];

    /// Boxes of every occurrence of `text` on the page; empty when not found
    fn find_bounding_boxes(&self, text: &str) -> Vec<Rect>;

    /// Rasterize the page at `scale`
    fn render_image(&self, scale: f32) -> Result<PageImage, DocumentError>;
}

/// A loaded, immutable document
pub trait Document {
    type Page: Page;

    fn page_count(&self) -> usize;

    /// Fetch a page; fails with `PageOutOfRange` for an invalid index
    fn page(&self, index: usize) -> Result<Self::Page, DocumentError>;

    /// Where this document was loaded from, if anywhere
    fn source(&self) -> Option<&Path> {
        None
    }

    fn persist_annotations(
        &self,
        sheet: &AnnotationSheet,
        path: &Path,
    ) -> Result<(), DocumentError> {
        sheet.save(path)
    }

    /// Write a copy of the document with `sheet` embedded as native
    /// highlights. Returns `false` when the format has no such notion.
    fn write_annotated_copy(
        &self,
        _sheet: &AnnotationSheet,
        _path: &Path,
    ) -> Result<bool, DocumentError> {
        Ok(false)
    }
}

pub(crate) fn check_index(index: usize, count: usize) -> Result<(), DocumentError> {
    if index < count {
        Ok(())
    } else {
        Err(DocumentError::PageOutOfRange { index, count })
    }
}

/// Any document the binary knows how to open, picked by file extension
pub enum AnyDocument {
    Text(TextDocument),
    #[cfg(feature = "pdf")]
    Pdf(PdfDocument),
}

pub enum AnyPage {
    Text(TextPage),
    #[cfg(feature = "pdf")]
    Pdf(PdfPage),
}

impl AnyDocument {
    /// Open `path` as a PDF when it has a `.pdf` extension, as text otherwise
    pub fn open(path: &Path, policy: LinePolicy) -> Result<Self, DocumentError> {
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            #[cfg(feature = "pdf")]
            {
                return Ok(AnyDocument::Pdf(PdfDocument::open(path, policy)?));
            }
            #[cfg(not(feature = "pdf"))]
            {
                return Err(DocumentError::Open {
                    path: path.to_path_buf(),
                    detail: "PDF support was not compiled in (enable the `pdf` feature)"
                        .to_string(),
                });
            }
        }

        Ok(AnyDocument::Text(TextDocument::open(path, policy)?))
    }
}

impl Document for AnyDocument {
    type Page = AnyPage;

    fn page_count(&self) -> usize {
        match self {
            AnyDocument::Text(doc) => doc.page_count(),
            #[cfg(feature = "pdf")]
            AnyDocument::Pdf(doc) => doc.page_count(),
        }
    }

    fn page(&self, index: usize) -> Result<AnyPage, DocumentError> {
        match self {
            AnyDocument::Text(doc) => doc.page(index).map(AnyPage::Text),
            #[cfg(feature = "pdf")]
            AnyDocument::Pdf(doc) => doc.page(index).map(AnyPage::Pdf),
        }
    }

    fn source(&self) -> Option<&Path> {
        match self {
            AnyDocument::Text(doc) => doc.source(),
            #[cfg(feature = "pdf")]
            AnyDocument::Pdf(doc) => doc.source(),
        }
    }

    fn persist_annotations(
        &self,
        sheet: &AnnotationSheet,
        path: &Path,
    ) -> Result<(), DocumentError> {
        match self {
            AnyDocument::Text(doc) => doc.persist_annotations(sheet, path),
            #[cfg(feature = "pdf")]
            AnyDocument::Pdf(doc) => doc.persist_annotations(sheet, path),
        }
    }

    fn write_annotated_copy(
        &self,
        sheet: &AnnotationSheet,
        path: &Path,
    ) -> Result<bool, DocumentError> {
        match self {
            AnyDocument::Text(doc) => doc.write_annotated_copy(sheet, path),
            #[cfg(feature = "pdf")]
            AnyDocument::Pdf(doc) => doc.write_annotated_copy(sheet, path),
        }
    }
}

impl Page for AnyPage {
    fn index(&self) -> usize {
        match self {
            AnyPage::Text(page) => page.index(),
            #[cfg(feature = "pdf")]
            AnyPage::Pdf(page) => page.index(),
        }
    }

    fn lines(&self) -> &[String] {
        match self {
            AnyPage::Text(page) => page.lines(),
            #[cfg(feature = "pdf")]
            AnyPage::Pdf(page) => page.lines(),
        }
    }

    fn find_bounding_boxes(&self, text: &str) -> Vec<Rect> {
        match self {
            AnyPage::Text(page) => page.find_bounding_boxes(text),
            #[cfg(feature = "pdf")]
            AnyPage::Pdf(page) => page.find_bounding_boxes(text),
        }
    }

    fn render_image(&self, scale: f32) -> Result<PageImage, DocumentError> {
        match self {
            AnyPage::Text(page) => page.render_image(scale),
            #[cfg(feature = "pdf")]
            AnyPage::Pdf(page) => page.render_image(scale),
        }
    }
}

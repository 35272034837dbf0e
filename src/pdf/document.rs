//! MuPDF document backend

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use mupdf::color::AnnotationColor;
use mupdf::pdf::{PdfAnnotationType, PdfObject};
use mupdf::text_page::TextBlockType;
use mupdf::{Colorspace, Matrix, Pixmap, Point, TextPageFlags};

use super::cache::TextCache;
use super::types::{CharInfo, LineBounds, PageText};
use super::DEFAULT_TEXT_CACHE_SIZE;
use crate::annotations::AnnotationSheet;
use crate::document::{check_index, Document, DocumentError, Page, PageImage, Rect};
use crate::lines::LinePolicy;

const HIGHLIGHT_COLOR: AnnotationColor = AnnotationColor::Rgb {
    red: 1.0,
    green: 1.0,
    blue: 0.0,
};

pub struct PdfDocument {
    doc: mupdf::Document,
    page_count: usize,
    policy: LinePolicy,
    path: PathBuf,
    cache: RefCell<TextCache>,
}

impl PdfDocument {
    pub fn open(path: &Path, policy: LinePolicy) -> Result<Self, DocumentError> {
        Self::open_with_cache(path, policy, DEFAULT_TEXT_CACHE_SIZE)
    }

    pub fn open_with_cache(
        path: &Path,
        policy: LinePolicy,
        cache_size: usize,
    ) -> Result<Self, DocumentError> {
        let open_err = |detail: String| DocumentError::Open {
            path: path.to_path_buf(),
            detail,
        };

        let doc = mupdf::Document::open(path.to_string_lossy().as_ref())
            .map_err(|e| open_err(e.to_string()))?;
        let page_count = doc.page_count().map_err(|e| open_err(e.to_string()))?;
        let page_count = usize::try_from(page_count).unwrap_or(0);
        info!("Opened {} ({page_count} pages)", path.display());

        Ok(Self {
            doc,
            page_count,
            policy,
            path: path.to_path_buf(),
            cache: RefCell::new(TextCache::new(cache_size)),
        })
    }

    fn page_text(&self, index: usize, page: &mupdf::Page) -> Result<Arc<PageText>, DocumentError> {
        if let Some(text) = self.cache.borrow_mut().get(index) {
            return Ok(text);
        }

        let text = PageText::new(extract_line_bounds(page)?, self.policy);
        let mut cache = self.cache.borrow_mut();
        debug!(
            "Extracted {} lines from page {index} (cache {}/{})",
            text.lines.len(),
            cache.len(),
            cache.capacity()
        );
        Ok(cache.insert(index, text))
    }
}

impl Document for PdfDocument {
    type Page = PdfPage;

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page(&self, index: usize) -> Result<PdfPage, DocumentError> {
        check_index(index, self.page_count)?;
        let page = self.doc.load_page(index as i32)?;
        let text = self.page_text(index, &page)?;
        Ok(PdfPage { index, page, text })
    }

    fn source(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn write_annotated_copy(
        &self,
        sheet: &AnnotationSheet,
        path: &Path,
    ) -> Result<bool, DocumentError> {
        let pdf = mupdf::pdf::PdfDocument::open(self.path.as_path())?;
        let mut count = 0;

        for (index, rects) in sheet.rects_by_page() {
            if index >= self.page_count {
                warn!("Skipping highlights for missing page {index}");
                continue;
            }
            let page = pdf.load_page(index as i32)?;
            let mut page = mupdf::pdf::PdfPage::try_from(page)?;
            let to_pdf = invert(&page.object().page_ctm()?).ok_or_else(|| {
                DocumentError::Render(format!("page {index} has a degenerate transform"))
            })?;

            for rect in &rects {
                add_highlight(&pdf, &mut page, rect, &to_pdf)?;
                count += 1;
            }
            page.update()?;
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DocumentError::Persist {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        }
        pdf.save(&path.to_string_lossy())?;
        info!("Wrote {count} highlights into {}", path.display());
        Ok(true)
    }
}

/// Add a yellow highlight annotation covering `rect` (page units, y down)
fn add_highlight(
    pdf: &mupdf::pdf::PdfDocument,
    page: &mut mupdf::pdf::PdfPage,
    rect: &Rect,
    to_pdf: &Matrix,
) -> Result<(), DocumentError> {
    let mut annot = page.create_annotation(PdfAnnotationType::Highlight)?;

    // upper-left, upper-right, lower-left, lower-right in PDF space
    let mut quad = pdf.new_array()?;
    for (x, y) in [
        (rect.x0, rect.y0),
        (rect.x1, rect.y0),
        (rect.x0, rect.y1),
        (rect.x1, rect.y1),
    ] {
        let point = Point::new(x, y).transform(to_pdf);
        quad.array_push(pdf.new_real(point.x)?)?;
        quad.array_push(pdf.new_real(point.y)?)?;
    }
    last_annotation(page)?.dict_put("QuadPoints", quad)?;
    annot.set_color(HIGHLIGHT_COLOR)?;
    Ok(())
}

/// New annotations are appended to the page's `Annots` array
fn last_annotation(page: &mupdf::pdf::PdfPage) -> Result<PdfObject, DocumentError> {
    let missing = || DocumentError::Render("annotation was not added to the page".to_string());
    let annots = page.object().get_dict("Annots")?.ok_or_else(missing)?;
    let last = annots
        .len()?
        .checked_sub(1)
        .and_then(|i| i32::try_from(i).ok())
        .ok_or_else(missing)?;
    annots.get_array(last)?.ok_or_else(missing)
}

fn invert(m: &Matrix) -> Option<Matrix> {
    let det = m.a * m.d - m.b * m.c;
    if det.abs() < f32::EPSILON {
        return None;
    }
    let a = m.d / det;
    let b = -m.b / det;
    let c = -m.c / det;
    let d = m.a / det;
    Some(Matrix::new(a, b, c, d, -m.e * a - m.f * c, -m.e * b - m.f * d))
}

pub struct PdfPage {
    index: usize,
    page: mupdf::Page,
    text: Arc<PageText>,
}

impl Page for PdfPage {
    fn index(&self) -> usize {
        self.index
    }

    fn lines(&self) -> &[String] {
        &self.text.lines
    }

    fn find_bounding_boxes(&self, text: &str) -> Vec<Rect> {
        self.text.find(text)
    }

    fn render_image(&self, scale: f32) -> Result<PageImage, DocumentError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(DocumentError::Render(format!("invalid scale {scale}")));
        }
        let transform = Matrix::new_scale(scale, scale);
        let rgb = Colorspace::device_rgb();
        let pixmap = self.page.to_pixmap(&transform, &rgb, false, false)?;
        let pixels = pixmap_to_rgb(&pixmap)?;

        Ok(PageImage {
            width: pixmap.width(),
            height: pixmap.height(),
            pixels,
            scale_x: scale,
            scale_y: scale,
        })
    }
}

fn extract_line_bounds(page: &mupdf::Page) -> Result<Vec<LineBounds>, DocumentError> {
    let text_page = page.to_text_page(TextPageFlags::empty())?;
    let mut bounds = Vec::new();

    for block in text_page.blocks() {
        if block.r#type() != TextBlockType::Text {
            continue;
        }
        for line in block.lines() {
            let bbox = line.bounds();
            let chars = line
                .chars()
                .filter_map(|ch| {
                    ch.char().map(|c| CharInfo {
                        x: ch.origin().x,
                        c,
                    })
                })
                .collect();

            bounds.push(LineBounds {
                x0: bbox.x0,
                y0: bbox.y0,
                x1: bbox.x1,
                y1: bbox.y1,
                chars,
            });
        }
    }
    Ok(bounds)
}

fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, DocumentError> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(DocumentError::Render(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
        return Err(DocumentError::Render(
            "Pixmap buffer size mismatch".to_string(),
        ));
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    Ok(out)
}

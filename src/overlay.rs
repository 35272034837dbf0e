//! Painting reveal state onto rendered pages

use std::path::Path;

use anyhow::Context;
use image::RgbImage;

use crate::document::{Page, PageImage, Rect};
use crate::stepper::RevealMode;

const HIGHLIGHT_RGB: [u8; 3] = [0xFF, 0xFF, 0x00];
const HIGHLIGHT_ALPHA: f32 = 0.45;
const BLOCK_RGB: [u8; 3] = [0x00, 0x00, 0x00];

/// Pixel bounds of a page-unit rect, clipped to the image
fn pixel_bounds(image: &PageImage, rect: &Rect) -> Option<(u32, u32, u32, u32)> {
    let x0 = (rect.x0 * image.scale_x).floor().max(0.0) as u32;
    let y0 = (rect.y0 * image.scale_y).floor().max(0.0) as u32;
    let x1 = ((rect.x1 * image.scale_x).ceil().max(0.0) as u32).min(image.width);
    let y1 = ((rect.y1 * image.scale_y).ceil().max(0.0) as u32).min(image.height);
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

/// Blend a translucent yellow over every rect
pub fn paint_highlights(image: &mut PageImage, rects: &[Rect]) {
    let width = image.width as usize;
    for rect in rects {
        let Some((x0, y0, x1, y1)) = pixel_bounds(image, rect) else {
            continue;
        };
        for y in y0..y1 {
            let row = y as usize * width;
            for x in x0..x1 {
                let idx = (row + x as usize) * 3;
                for (channel, target) in HIGHLIGHT_RGB.iter().enumerate() {
                    let src = f32::from(image.pixels[idx + channel]);
                    let blended = src + (f32::from(*target) - src) * HIGHLIGHT_ALPHA;
                    image.pixels[idx + channel] = blended.round() as u8;
                }
            }
        }
    }
}

/// Cover everything from `top` (page units) to the bottom of the page
pub fn paint_block(image: &mut PageImage, top: f32) {
    let start = (top * image.scale_y).ceil().max(0.0) as u32;
    if start >= image.height {
        return;
    }
    let offset = start as usize * image.width as usize * 3;
    for px in image.pixels[offset..].chunks_exact_mut(3) {
        px.copy_from_slice(&BLOCK_RGB);
    }
}

/// Where the block mask starts: below the last revealed line, or at the top
/// of the page when nothing is revealed yet.
///
/// A line's text may occur several times on a page, so each line takes the
/// first occurrence that ends below the previous line.
#[must_use]
pub fn block_top<P: Page>(page: &P, revealed: usize) -> f32 {
    let mut top = 0.0_f32;
    for line in page.lines().iter().take(revealed) {
        if let Some(rect) = page
            .find_bounding_boxes(line)
            .into_iter()
            .find(|rect| rect.y1 > top)
        {
            top = rect.y1;
        }
    }
    top
}

/// Render `page` with the given reveal state painted on top
pub fn render_annotated<P: Page>(
    page: &P,
    mode: RevealMode,
    revealed: usize,
    highlights: &[Rect],
    scale: f32,
) -> anyhow::Result<PageImage> {
    let mut image = page
        .render_image(scale)
        .with_context(|| format!("Failed to render page {}", page.index() + 1))?;

    match mode {
        RevealMode::Highlight => paint_highlights(&mut image, highlights),
        RevealMode::Block => paint_block(&mut image, block_top(page, revealed)),
        RevealMode::Autoscroll => {}
    }
    Ok(image)
}

pub fn save_png(image: &PageImage, path: &Path) -> anyhow::Result<()> {
    let buffer = RgbImage::from_raw(image.width, image.height, image.pixels.clone())
        .context("Pixel buffer does not match image dimensions")?;
    buffer
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, TextDocument};
    use crate::lines::LinePolicy;

    #[test]
    fn highlight_only_touches_rect() {
        let mut image = PageImage::blank(10, 10, 1.0, 1.0);
        paint_highlights(&mut image, &[Rect::new(2.0, 2.0, 4.0, 4.0)]);

        let inside = image.pixel(3, 3).unwrap();
        assert_eq!(inside[0], 0xFF);
        assert!(inside[2] < 0xFF);
        assert_eq!(image.pixel(5, 5), Some([0xFF, 0xFF, 0xFF]));
        assert_eq!(image.pixel(1, 3), Some([0xFF, 0xFF, 0xFF]));
    }

    #[test]
    fn highlight_outside_image_is_ignored() {
        let mut image = PageImage::blank(4, 4, 1.0, 1.0);
        paint_highlights(&mut image, &[Rect::new(10.0, 10.0, 20.0, 20.0)]);
        assert!(image.pixels.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn block_covers_from_top_down() {
        let mut image = PageImage::blank(4, 8, 2.0, 2.0);
        paint_block(&mut image, 2.0);
        assert_eq!(image.pixel(0, 3), Some([0xFF, 0xFF, 0xFF]));
        assert_eq!(image.pixel(0, 4), Some([0, 0, 0]));
        assert_eq!(image.pixel(3, 7), Some([0, 0, 0]));
    }

    #[test]
    fn block_mask_retracts_as_lines_are_revealed() {
        let doc = TextDocument::from_pages(vec!["one\ntwo\nthree"], LinePolicy::SkipBlank);
        let page = doc.page(0).unwrap();
        assert_eq!(block_top(&page, 0), 0.0);
        assert_eq!(block_top(&page, 1), 1.0);
        assert_eq!(block_top(&page, 3), 3.0);

        let repeated = TextDocument::from_pages(vec!["intro\nintro again\nend"], LinePolicy::SkipBlank);
        let page = repeated.page(0).unwrap();
        assert_eq!(block_top(&page, 1), 1.0);
        assert_eq!(block_top(&page, 2), 2.0);

        let image = render_annotated(&page, RevealMode::Block, 2, &[], 1.0).unwrap();
        assert_eq!(image.pixel(0, 16 * 2 - 1), Some([0xFF, 0xFF, 0xFF]));
        assert_eq!(image.pixel(0, 16 * 2), Some([0, 0, 0]));
    }

    #[test]
    fn png_is_written() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("page.png");
        let image = PageImage::blank(3, 2, 1.0, 1.0);
        save_png(&image, &path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (3, 2));
    }
}

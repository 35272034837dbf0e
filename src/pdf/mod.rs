//! PDF documents backed by MuPDF

mod cache;
mod document;
mod types;

pub use document::{PdfDocument, PdfPage};
pub use types::{CharInfo, LineBounds, PageText};

/// Pages whose extracted text is kept in memory
pub const DEFAULT_TEXT_CACHE_SIZE: usize = 16;

pub mod exporter;
pub mod filename;

pub use exporter::{ExportError, ExportOptions, RevealExporter};
pub use filename::{
    annotated_copy_path, annotations_path, document_stem, frame_image_path, page_image_path, sanitize_filename,
};

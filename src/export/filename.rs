use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static INVALID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("Failed to compile filename regex"));
static RESERVED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])$").expect("Failed to compile filename regex")
});

const MAX_STEM_CHARS: usize = 200;

/// Sanitize a filename for cross-platform compatibility
/// Removes/replaces characters that are invalid on Windows, macOS, or Linux
pub fn sanitize_filename(name: &str) -> String {
    let sanitized = INVALID_CHARS.replace_all(name, "_");

    // Trim leading/trailing spaces and dots (problematic on Windows)
    let sanitized = sanitized.trim_matches(|c| c == ' ' || c == '.');

    if RESERVED.is_match(sanitized) {
        return format!("_{sanitized}");
    }

    let sanitized: String = sanitized.chars().take(MAX_STEM_CHARS).collect();

    if sanitized.is_empty() {
        "untitled".to_string()
    } else {
        sanitized
    }
}

/// Stem used for every file written about `source`
pub fn document_stem(source: Option<&Path>) -> String {
    source
        .and_then(|path| path.file_stem())
        .map(|stem| sanitize_filename(&stem.to_string_lossy()))
        .unwrap_or_else(|| "document".to_string())
}

pub fn annotations_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.annotations.json"))
}

/// Page numbers in file names are 1-based
pub fn page_image_path(dir: &Path, stem: &str, page_index: usize) -> PathBuf {
    dir.join(format!("{stem}-page-{}.png", page_index + 1))
}

/// Copy of a PDF with the highlights written into it
pub fn annotated_copy_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}-highlighted.pdf"))
}

pub fn frame_image_path(dir: &Path, stem: &str, frame: usize) -> PathBuf {
    dir.join(format!("{stem}-frame-{frame:04}.png"))
}

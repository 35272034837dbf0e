use std::fs;

use pdfpacer::annotations::AnnotationSheet;
use pdfpacer::document::{AnyDocument, Document, DocumentError, Page};
use pdfpacer::export::{ExportOptions, RevealExporter, document_stem};
use pdfpacer::lines::LinePolicy;
use pdfpacer::plain::run_plain;
use pdfpacer::session::{ReaderSession, SessionEvent};
use pdfpacer::stepper::RevealMode;
use tempfile::TempDir;

const LECTURE: &str = "Week one\n\nSets and maps\n\x0cWeek two\n   \nGraphs\nTrees\n";

fn write_lecture(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("lecture.txt");
    fs::write(&path, LECTURE).unwrap();
    path
}

#[test]
fn text_files_split_pages_on_form_feed() {
    let dir = TempDir::new().unwrap();
    let path = write_lecture(&dir);

    let doc = AnyDocument::open(&path, LinePolicy::SkipBlank).unwrap();
    assert_eq!(doc.page_count(), 2);
    assert_eq!(doc.page(0).unwrap().lines(), ["Week one", "Sets and maps"]);
    assert_eq!(doc.page(1).unwrap().lines(), ["Week two", "Graphs", "Trees"]);
    assert_eq!(doc.source(), Some(path.as_path()));

    let keep = AnyDocument::open(&path, LinePolicy::KeepAll).unwrap();
    assert_eq!(keep.page(0).unwrap().lines().len(), 3);
}

#[test]
fn missing_file_reports_open_error() {
    let dir = TempDir::new().unwrap();
    let result = AnyDocument::open(&dir.path().join("absent.txt"), LinePolicy::SkipBlank);
    assert!(matches!(result, Err(DocumentError::Open { .. })));
}

#[test]
fn plain_output_matches_reveal_order() {
    let dir = TempDir::new().unwrap();
    let doc = AnyDocument::open(&write_lecture(&dir), LinePolicy::SkipBlank).unwrap();
    let mut out = Vec::new();

    let written = run_plain(doc, 2, None, &mut out).unwrap();

    assert_eq!(written, 5);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Week one\nSets and maps\n--- page 2 ---\nWeek two\nGraphs\nTrees\n"
    );
}

#[test]
fn export_round_trips_through_annotation_sheet() {
    let dir = TempDir::new().unwrap();
    let path = write_lecture(&dir);
    let out = dir.path().join("out");
    let doc = AnyDocument::open(&path, LinePolicy::SkipBlank).unwrap();

    let options = ExportOptions {
        mode: RevealMode::Highlight,
        lines_per_tick: 3,
        scale: 1.0,
    };
    let written = RevealExporter::export(doc, &document_stem(Some(path.as_path())), &out, options).unwrap();

    assert!(written.iter().all(|p| p.exists()));
    assert!(out.join("lecture-page-1.png").exists());
    assert!(out.join("lecture-page-2.png").exists());

    let sheet = AnnotationSheet::load(&out.join("lecture.annotations.json")).unwrap();
    assert_eq!(sheet.len(), 5);
    assert_eq!(sheet.source.as_deref(), Some(path.as_path()));
    let second_page: Vec<usize> = sheet.lines_on_page(1).collect();
    assert_eq!(second_page, vec![0, 1, 2]);
}

#[test]
fn session_saves_highlights_for_later() {
    let dir = TempDir::new().unwrap();
    let path = write_lecture(&dir);
    let doc = AnyDocument::open(&path, LinePolicy::SkipBlank).unwrap();
    let mut session = ReaderSession::new(doc, 1, RevealMode::Highlight).unwrap();

    session.start();
    for _ in 0..3 {
        assert!(matches!(session.advance().unwrap(), SessionEvent::Revealed(_)));
    }

    let sheet_path = dir.path().join("saved.json");
    session.save_annotations(&sheet_path).unwrap();
    let sheet = AnnotationSheet::load(&sheet_path).unwrap();
    assert_eq!(sheet.len(), 3);
    assert_eq!(sheet.highlights[2].text, "Week two");
    assert_eq!(sheet.highlights[2].page, 1);
}

use std::time::Duration;

use pdfpacer::app::{App, COMPLETION_MESSAGE, run_app_with_event_source};
use pdfpacer::autoscroll::{Key, RecordingKeySender};
use pdfpacer::document::TextDocument;
use pdfpacer::session::ReaderSession;
use pdfpacer::stepper::RevealMode;
use pdfpacer::test_utils::test_helpers::{
    TestScenarioBuilder, capture_terminal_state, create_test_terminal, text_document,
};
use ratatui::style::Color;

fn app(pages: &[&str], lines: usize, mode: RevealMode) -> App<TextDocument> {
    let session = ReaderSession::new(text_document(pages), lines, mode).unwrap();
    App::new(session, Duration::ZERO)
}

#[test]
fn block_mode_hides_lines_not_yet_revealed() {
    let mut app = app(&["alpha\nbeta\ngamma"], 1, RevealMode::Block);
    let mut terminal = create_test_terminal(100, 12);
    let mut events = TestScenarioBuilder::new().toggle().wait(1).quit().build();

    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    let screen = capture_terminal_state(&terminal);
    assert!(screen.contains("alpha"), "{screen}");
    assert!(screen.contains("beta"), "{screen}");
    assert!(!screen.contains("gamma"), "{screen}");
    assert!(screen.contains("Line 2/3"), "{screen}");
    assert!(screen.contains("Running"), "{screen}");
}

#[test]
fn running_to_the_end_notifies_completion() {
    let mut app = app(&["only line"], 1, RevealMode::Highlight);
    let mut terminal = create_test_terminal(100, 10);
    let mut events = TestScenarioBuilder::new().toggle().wait(3).quit().build();

    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    assert!(app.session.is_complete());
    assert!(!app.session.is_running());
    let screen = capture_terminal_state(&terminal);
    assert!(screen.contains(COMPLETION_MESSAGE), "{screen}");
    assert!(screen.contains("Complete"), "{screen}");
}

#[test]
fn highlighted_lines_are_painted_yellow() {
    let mut app = app(&["first\nsecond"], 1, RevealMode::Highlight);
    let mut terminal = create_test_terminal(60, 10);
    let mut events = TestScenarioBuilder::new().step(1).quit().build();

    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    let buffer = terminal.backend().buffer();
    // row 0 is the title, row 1 the pane border
    assert_eq!(buffer.cell((1, 2)).map(|c| c.bg), Some(Color::Yellow));
    assert_ne!(buffer.cell((1, 3)).map(|c| c.bg), Some(Color::Yellow));
    assert_eq!(app.session.annotations().len(), 1);
}

#[test]
fn mode_keys_switch_and_start() {
    let mut app = app(&["a\nb\nc\nd"], 1, RevealMode::Highlight);
    let mut terminal = create_test_terminal(100, 10);
    let mut events = TestScenarioBuilder::new()
        .press_char('b')
        .press_char('h')
        .quit()
        .build();

    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    assert_eq!(app.session.mode(), RevealMode::Highlight);
    assert!(app.session.is_running());
    // block mode revealed one line, highlight mode the next
    assert_eq!(app.session.annotations().len(), 1);
    assert_eq!(app.session.revealed_on_current_page(), 2);
}

#[test]
fn autoscroll_presses_down_once_per_line() {
    let session = ReaderSession::new(text_document(&["1\n2\n3"]), 1, RevealMode::Highlight)
        .unwrap()
        .with_key_sender(Box::new(RecordingKeySender::new()));
    let mut app = App::new(session, Duration::ZERO);
    let mut terminal = create_test_terminal(100, 10);
    let mut events = TestScenarioBuilder::new()
        .press_char('a')
        .wait(5)
        .quit()
        .build();

    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    let keys = app
        .session
        .key_sender()
        .and_then(|sender| sender.as_any().downcast_ref::<RecordingKeySender>())
        .map(|sender| sender.sent_keys().to_vec())
        .unwrap();
    assert_eq!(keys, vec![Key::Down; 3]);
    assert!(app.session.is_complete());
}

#[test]
fn restart_rewinds_and_clears() {
    let mut app = app(&["a\nb"], 1, RevealMode::Highlight);
    let mut terminal = create_test_terminal(100, 10);
    let mut events = TestScenarioBuilder::new()
        .step(2)
        .press_char('r')
        .quit()
        .build();

    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    assert_eq!(app.session.revealed_on_current_page(), 0);
    assert!(app.session.annotations().is_empty());
    assert!(!app.session.is_running());
}

#[test]
fn page_title_follows_rollover() {
    let mut app = app(&["a", "b"], 1, RevealMode::Block);
    let mut terminal = create_test_terminal(60, 10);
    let mut events = TestScenarioBuilder::new().step(2).quit().build();

    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    let screen = capture_terminal_state(&terminal);
    assert!(screen.contains("Page 2/2"), "{screen}");
}

#[test]
fn empty_document_is_titled_without_page_numbers() {
    let mut app = app(&[], 1, RevealMode::Highlight);
    let mut terminal = create_test_terminal(60, 10);
    let mut events = TestScenarioBuilder::new().step(1).quit().build();

    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    let screen = capture_terminal_state(&terminal);
    assert!(screen.contains("Empty document"), "{screen}");
    assert!(!screen.contains("Page 1/0"), "{screen}");
    assert!(app.session.is_complete());
}

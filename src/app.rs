use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{debug, error, info};
use ratatui::{
    Frame, Terminal,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::document::Document;
use crate::event_source::{Event, EventSource, KeyCode, KeyEvent, KeyModifiers};
use crate::export;
use crate::notification::NotificationManager;
use crate::session::{ReaderSession, SessionEvent};
use crate::settings::{
    self, DELAY_STEP_MS, MAX_DELAY_MS, MAX_LINES_PER_TICK, MIN_DELAY_MS, MIN_LINES_PER_TICK,
};
use crate::stepper::RevealMode;

pub const COMPLETION_MESSAGE: &str = "All lines have been revealed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
}

pub struct App<D: Document> {
    pub session: ReaderSession<D>,
    pub notifications: NotificationManager,
    delay: Duration,
    export_scale: f32,
    output_dir: PathBuf,
    title: String,
    last_advance: Instant,
    persist_settings: bool,
}

impl<D: Document> App<D> {
    pub fn new(session: ReaderSession<D>, delay: Duration) -> Self {
        let source = session.stepper().document().source();
        let title = source
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string());
        let output_dir = source
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            session,
            notifications: NotificationManager::new(),
            delay,
            export_scale: 2.0,
            output_dir,
            title,
            last_advance: Instant::now(),
            persist_settings: false,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_export_scale(mut self, scale: f32) -> Self {
        self.export_scale = scale;
        self
    }

    /// Write lines-per-tick and delay changes back to the settings file
    pub fn with_settings_persistence(mut self) -> Self {
        self.persist_settings = true;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn file_stem(&self) -> String {
        export::document_stem(self.session.stepper().document().source())
    }

    pub fn annotations_path(&self) -> PathBuf {
        export::annotations_path(&self.output_dir, &self.file_stem())
    }

    pub fn annotated_copy_path(&self) -> PathBuf {
        export::annotated_copy_path(&self.output_dir, &self.file_stem())
    }

    pub fn page_image_path(&self, page_index: usize) -> PathBuf {
        export::page_image_path(&self.output_dir, &self.file_stem(), page_index)
    }

    pub fn handle_event(&mut self, event: &Event) -> Option<AppAction> {
        match event {
            Event::Key(key) => self.handle_key_event(*key),
            _ => None,
        }
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<AppAction> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(AppAction::Quit);
        }

        match key.code {
            KeyCode::Char('q') => return Some(AppAction::Quit),
            KeyCode::Esc => {
                if !self.notifications.dismiss_current() {
                    return Some(AppAction::Quit);
                }
            }
            KeyCode::Char(' ') => {
                self.session.toggle();
                self.last_advance = Instant::now();
            }
            KeyCode::Char('h') => self.select_mode(RevealMode::Highlight),
            KeyCode::Char('b') => self.select_mode(RevealMode::Block),
            KeyCode::Char('a') => self.select_mode(RevealMode::Autoscroll),
            KeyCode::Char('r') => {
                self.session.restart();
                self.notifications.info("Restarted from the first line");
            }
            KeyCode::Char('n') => self.advance(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_lines(1),
            KeyCode::Char('-') => self.adjust_lines(-1),
            KeyCode::Char(']') => self.adjust_delay(DELAY_STEP_MS as i64),
            KeyCode::Char('[') => self.adjust_delay(-(DELAY_STEP_MS as i64)),
            KeyCode::Char('s') => self.save(),
            _ => {}
        }
        None
    }

    fn select_mode(&mut self, mode: RevealMode) {
        match self.session.select_mode(mode) {
            Ok(()) => {
                self.last_advance = Instant::now();
                if self.persist_settings {
                    settings::set_mode(mode);
                }
            }
            Err(e) => self.notifications.error(format!("Could not switch mode: {e}")),
        }
    }

    fn adjust_lines(&mut self, delta: i64) {
        let current = self.session.lines_per_tick() as i64;
        let lines = (current + delta).clamp(MIN_LINES_PER_TICK as i64, MAX_LINES_PER_TICK as i64)
            as usize;
        if let Err(e) = self.session.set_lines_per_tick(lines) {
            self.notifications.error(e.to_string());
            return;
        }
        if self.persist_settings {
            settings::set_lines_per_tick(lines);
        }
    }

    fn adjust_delay(&mut self, delta_ms: i64) {
        let current = self.delay.as_millis() as i64;
        let delay_ms = (current + delta_ms).clamp(MIN_DELAY_MS as i64, MAX_DELAY_MS as i64) as u64;
        self.delay = Duration::from_millis(delay_ms);
        debug!("Delay set to {delay_ms}ms");
        if self.persist_settings {
            settings::set_delay_ms(delay_ms);
        }
    }

    fn save(&mut self) {
        let annotations = self.annotations_path();
        if let Err(e) = self.session.save_annotations(&annotations) {
            error!("Saving annotations failed: {e:#}");
            self.notifications.error(format!("Save failed: {e}"));
            return;
        }

        let copy = self.annotated_copy_path();
        match self.session.save_annotated_copy(&copy) {
            Ok(true) => info!("Saved highlighted copy {}", copy.display()),
            Ok(false) => {}
            Err(e) => {
                error!("Saving highlighted copy failed: {e:#}");
                self.notifications.error(format!("Save failed: {e}"));
                return;
            }
        }

        let page_index = self.session.progress().page_index;
        let image = self.page_image_path(page_index);
        match self.session.export_current_page(&image, self.export_scale) {
            Ok(()) => {
                info!("Saved {} and {}", annotations.display(), image.display());
                self.notifications
                    .info(format!("Saved {}", annotations.display()));
            }
            Err(e) => {
                error!("Exporting page {page_index} failed: {e:#}");
                self.notifications.error(format!("Export failed: {e}"));
            }
        }
    }

    /// Perform one reveal step and surface its outcome
    pub fn advance(&mut self) {
        self.last_advance = Instant::now();
        match self.session.advance() {
            Ok(SessionEvent::Revealed(_)) => {}
            Ok(SessionEvent::Completed) => {
                info!("Document complete");
                self.notifications.info(COMPLETION_MESSAGE);
            }
            Err(e) => {
                error!("Reveal step failed: {e:#}");
                self.session.stop();
                self.notifications.error(format!("{e}"));
            }
        }
    }

    fn tick_due(&self) -> bool {
        self.session.is_running() && self.last_advance.elapsed() >= self.delay
    }

    /// Advance when the delay has elapsed and expire old notifications.
    /// Returns true if anything visible changed.
    pub fn on_tick(&mut self) -> bool {
        let mut changed = self.notifications.update();
        if self.tick_due() {
            self.advance();
            changed = true;
        }
        changed
    }

    fn poll_timeout(&self, tick_rate: Duration) -> Duration {
        if self.session.is_running() {
            self.delay
                .saturating_sub(self.last_advance.elapsed())
                .min(tick_rate)
        } else {
            tick_rate
        }
    }

    pub fn draw(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(f.area());

        let title = Paragraph::new(Line::from(vec![
            Span::styled(
                " pdfpacer ",
                Style::default().fg(Color::Black).bg(Color::Cyan),
            ),
            Span::raw(format!(" {}", self.title)),
        ]));
        f.render_widget(title, chunks[0]);

        self.render_page(f, chunks[1]);

        let status = Paragraph::new(self.status_line())
            .style(Style::default().fg(Color::Gray));
        f.render_widget(status, chunks[2]);

        let help_text = if let Some(notification) = self.notifications.current() {
            format!(
                "[{}] {} | ESC: Dismiss",
                notification.level.label(),
                notification.message
            )
        } else {
            "Space: Start/Stop | h/b/a: Mode | n: Step | r: Restart | +/-: Lines | [/]: Delay | s: Save | q: Quit"
                .to_string()
        };
        let help = Paragraph::new(help_text).style(Style::default().fg(Color::DarkGray));
        f.render_widget(help, chunks[3]);
    }

    fn render_page(&self, f: &mut Frame, area: ratatui::layout::Rect) {
        let progress = self.session.progress();
        let page_count = self.session.stepper().document().page_count();
        let title = if page_count == 0 {
            " Empty document ".to_string()
        } else {
            format!(
                " Page {}/{} ",
                (progress.page_index + 1).min(page_count),
                page_count
            )
        };
        let block = Block::default().borders(Borders::ALL).title(title);

        let revealed = self.session.revealed_on_current_page();
        let highlighted: HashSet<usize> = self
            .session
            .annotations()
            .lines_on_page(progress.page_index)
            .collect();
        let mode = self.session.mode();

        let lines: Vec<Line> = self
            .session
            .current_lines()
            .iter()
            .enumerate()
            .map(|(i, text)| match mode {
                RevealMode::Highlight if highlighted.contains(&i) => Line::from(Span::styled(
                    text.as_str(),
                    Style::default().fg(Color::Black).bg(Color::Yellow),
                )),
                RevealMode::Highlight => Line::from(text.as_str()),
                RevealMode::Block if i < revealed => Line::from(text.as_str()),
                RevealMode::Block => Line::from(""),
                RevealMode::Autoscroll if i + 1 == revealed => Line::from(Span::styled(
                    format!("> {text}"),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                RevealMode::Autoscroll if i < revealed => Line::from(Span::styled(
                    format!("  {text}"),
                    Style::default().fg(Color::DarkGray),
                )),
                RevealMode::Autoscroll => Line::from(format!("  {text}")),
            })
            .collect();

        let visible = area.height.saturating_sub(2) as usize;
        let scroll = if visible > 0 && revealed > visible {
            revealed - visible
        } else {
            0
        };

        let paragraph = Paragraph::new(lines)
            .block(block)
            .scroll((scroll.min(u16::MAX as usize) as u16, 0));
        f.render_widget(paragraph, area);
    }

    pub fn status_line(&self) -> String {
        let progress = self.session.progress();
        let state = if self.session.is_complete() {
            "Complete"
        } else if self.session.is_running() {
            "Running"
        } else {
            "Paused"
        };
        let delay_ms = self.delay.as_millis() as u64;
        format!(
            "Line {}/{} | Mode: {} | Lines/tick: {} | Delay: {}ms ({}) | {}",
            progress.line_index,
            progress.total_lines,
            self.session.mode(),
            self.session.lines_per_tick(),
            delay_ms,
            settings::speed_label(delay_ms),
            state
        )
    }
}

pub fn run_app_with_event_source<B: ratatui::backend::Backend, D: Document>(
    terminal: &mut Terminal<B>,
    app: &mut App<D>,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(50);
    let mut needs_redraw = true;

    loop {
        if needs_redraw {
            terminal.draw(|f| app.draw(f))?;
            needs_redraw = false;
        }

        if event_source.poll(app.poll_timeout(tick_rate))? {
            let event = event_source.read()?;
            if app.handle_event(&event) == Some(AppAction::Quit) {
                info!("Quit requested");
                return Ok(());
            }
            needs_redraw = true;
        }

        if app.on_tick() {
            needs_redraw = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextDocument;
    use crate::event_source::SimulatedEventSource;
    use crate::lines::LinePolicy;

    fn app(pages: Vec<&str>, lines: usize, mode: RevealMode) -> App<TextDocument> {
        let doc = TextDocument::from_pages(pages, LinePolicy::SkipBlank);
        App::new(ReaderSession::new(doc, lines, mode).unwrap(), Duration::ZERO)
    }

    fn press(app: &mut App<TextDocument>, c: char) -> Option<AppAction> {
        app.handle_event(&SimulatedEventSource::char_key(c))
    }

    #[test]
    fn space_toggles_running() {
        let mut app = app(vec!["a\nb"], 1, RevealMode::Highlight);
        press(&mut app, ' ');
        assert!(app.session.is_running());
        press(&mut app, ' ');
        assert!(!app.session.is_running());
    }

    #[test]
    fn tick_advances_only_while_running() {
        let mut app = app(vec!["a\nb"], 1, RevealMode::Block);
        app.on_tick();
        assert_eq!(app.session.revealed_on_current_page(), 0);

        press(&mut app, ' ');
        app.on_tick();
        assert_eq!(app.session.revealed_on_current_page(), 1);
    }

    #[test]
    fn completion_notifies() {
        let mut app = app(vec!["a"], 1, RevealMode::Highlight);
        press(&mut app, 'n');
        press(&mut app, 'n');
        assert_eq!(app.notifications.current().unwrap().message, COMPLETION_MESSAGE);
        assert!(app.session.is_complete());
    }

    #[test]
    fn lines_per_tick_is_bounded() {
        let mut app = app(vec!["a"], 9, RevealMode::Highlight);
        press(&mut app, '+');
        press(&mut app, '+');
        assert_eq!(app.session.lines_per_tick(), 10);

        for _ in 0..12 {
            press(&mut app, '-');
        }
        assert_eq!(app.session.lines_per_tick(), 1);
    }

    #[test]
    fn delay_is_bounded_and_stepped() {
        let mut app = app(vec!["a"], 1, RevealMode::Highlight);
        press(&mut app, '[');
        assert_eq!(app.delay(), Duration::from_millis(MIN_DELAY_MS));
        press(&mut app, ']');
        assert_eq!(app.delay(), Duration::from_millis(1250));
        for _ in 0..30 {
            press(&mut app, ']');
        }
        assert_eq!(app.delay(), Duration::from_millis(MAX_DELAY_MS));
    }

    #[test]
    fn escape_dismisses_before_quitting() {
        let mut app = app(vec!["a"], 1, RevealMode::Highlight);
        app.notifications.info("hello");
        let esc = SimulatedEventSource::key_event(KeyCode::Esc, KeyModifiers::empty());
        assert_eq!(app.handle_event(&esc), None);
        assert_eq!(app.handle_event(&esc), Some(AppAction::Quit));
        assert_eq!(press(&mut app, 'q'), Some(AppAction::Quit));
    }

    #[test]
    fn status_line_reports_progress() {
        let mut app = app(vec!["a\nb\nc"], 2, RevealMode::Block);
        press(&mut app, 'n');
        let status = app.status_line();
        assert!(status.contains("Line 2/3"));
        assert!(status.contains("Mode: block"));
        assert!(status.contains("Paused"));
    }

    #[test]
    fn save_writes_json_and_png() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut app = app(vec!["one\ntwo"], 1, RevealMode::Highlight).with_output_dir(dir.path());
        app = app.with_export_scale(1.0);
        press(&mut app, 'n');
        press(&mut app, 's');

        assert!(app.annotations_path().exists());
        assert!(app.page_image_path(0).exists());
        assert!(app.annotations_path().ends_with("document.annotations.json"));
        assert!(!app.annotated_copy_path().exists());
    }
}

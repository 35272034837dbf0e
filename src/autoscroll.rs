//! Synthetic key presses for driving an external viewer

use std::any::Any;
use std::process::Command;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};

use crate::event_source::{Event, EventSource, KeyCode, KeyEvent, KeyModifiers};

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Down,
    Up,
    PageDown,
    PageUp,
}

impl Key {
    /// X11 keysym name understood by xdotool
    pub fn keysym(&self) -> &'static str {
        match self {
            Key::Down => "Down",
            Key::Up => "Up",
            Key::PageDown => "Next",
            Key::PageUp => "Prior",
        }
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "down" => Ok(Key::Down),
            "up" => Ok(Key::Up),
            "page-down" | "pagedown" => Ok(Key::PageDown),
            "page-up" | "pageup" => Ok(Key::PageUp),
            other => Err(format!(
                "unknown key '{other}' (expected down, up, page-down or page-up)"
            )),
        }
    }
}

/// Something that can deliver key presses to whatever window has focus
pub trait KeySender {
    fn send_key(&mut self, key: Key) -> Result<()>;
    fn as_any(&self) -> &dyn Any;
}

/// Sends keys through the `xdotool` command line utility
pub struct XdotoolKeySender {
    binary: String,
}

impl XdotoolKeySender {
    pub fn new() -> Self {
        Self::with_binary("xdotool")
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for XdotoolKeySender {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySender for XdotoolKeySender {
    fn send_key(&mut self, key: Key) -> Result<()> {
        let status = Command::new(&self.binary)
            .args(["key", key.keysym()])
            .status()
            .with_context(|| format!("Failed to run {}", self.binary))?;
        if !status.success() {
            bail!("{} exited with {status}", self.binary);
        }
        debug!("Sent {key:?}");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Records keys instead of sending them
#[derive(Debug, Default)]
pub struct RecordingKeySender {
    sent: Vec<Key>,
}

impl RecordingKeySender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_keys(&self) -> &[Key] {
        &self.sent
    }
}

impl KeySender for RecordingKeySender {
    fn send_key(&mut self, key: Key) -> Result<()> {
        self.sent.push(key);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Press `key` every `interval` until `stop` is raised or `max_presses` is hit.
///
/// Returns the number of presses sent.
pub fn run_autoscroll(
    sender: &mut dyn KeySender,
    key: Key,
    interval: Duration,
    max_presses: Option<usize>,
    stop: &Arc<AtomicBool>,
) -> Result<usize> {
    info!(
        "Autoscroll started: {key:?} every {}ms",
        interval.as_millis()
    );
    let mut presses = 0;

    while !stop.load(Ordering::Relaxed) {
        if max_presses.is_some_and(|max| presses >= max) {
            break;
        }
        sender.send_key(key)?;
        presses += 1;
        std::thread::sleep(interval);
    }

    info!("Autoscroll stopped after {presses} presses");
    Ok(presses)
}

fn is_stop_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        KeyCode::Char('q') | KeyCode::Esc => true,
        _ => false,
    }
}

/// Raise `stop` when q, Esc or Ctrl+C arrives on `events`.
///
/// The thread exits once `stop` is raised from either side. With the terminal
/// in raw mode Ctrl+C arrives here as a key instead of killing the process.
pub fn spawn_stop_watcher<E>(mut events: E, stop: Arc<AtomicBool>) -> JoinHandle<()>
where
    E: EventSource + Send + 'static,
{
    thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            match events.poll(STOP_POLL_INTERVAL) {
                Ok(true) => match events.read() {
                    Ok(Event::Key(key)) if is_stop_key(&key) => {
                        info!("Stop requested from keyboard");
                        stop.store(true, Ordering::Relaxed);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Stopped watching keyboard: {e}");
                        return;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!("Stopped watching keyboard: {e}");
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_source::SimulatedEventSource;

    #[test]
    fn loop_honours_press_limit() {
        let mut sender = RecordingKeySender::new();
        let stop = Arc::new(AtomicBool::new(false));

        let presses = run_autoscroll(&mut sender, Key::Down, Duration::ZERO, Some(3), &stop).unwrap();
        assert_eq!(presses, 3);
        assert_eq!(sender.sent_keys(), [Key::Down, Key::Down, Key::Down]);
    }

    #[test]
    fn loop_stops_when_flag_is_raised() {
        let mut sender = RecordingKeySender::new();
        let stop = Arc::new(AtomicBool::new(true));

        let presses = run_autoscroll(&mut sender, Key::Down, Duration::ZERO, None, &stop).unwrap();
        assert_eq!(presses, 0);
        assert!(sender.sent_keys().is_empty());
    }

    #[test]
    fn missing_binary_is_an_error() {
        let mut sender = XdotoolKeySender::with_binary("/nonexistent/xdotool");
        assert!(sender.send_key(Key::Down).is_err());
    }

    #[test]
    fn ctrl_c_raises_the_stop_flag() {
        let events = SimulatedEventSource::new(vec![
            SimulatedEventSource::char_key('x'),
            SimulatedEventSource::key_event(KeyCode::Char('c'), KeyModifiers::CONTROL),
        ]);
        let stop = Arc::new(AtomicBool::new(false));

        spawn_stop_watcher(events, Arc::clone(&stop)).join().unwrap();
        assert!(stop.load(Ordering::Relaxed));
    }

    #[test]
    fn only_quit_keys_stop() {
        let key = |code, modifiers| KeyEvent::new(code, modifiers);
        assert!(is_stop_key(&key(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_stop_key(&key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_stop_key(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_stop_key(&key(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_stop_key(&key(KeyCode::Down, KeyModifiers::NONE)));
    }

    #[test]
    fn watcher_exits_when_loop_finishes_first() {
        let stop = Arc::new(AtomicBool::new(true));
        let events = SimulatedEventSource::new(Vec::new());

        spawn_stop_watcher(events, Arc::clone(&stop)).join().unwrap();
        assert!(stop.load(Ordering::Relaxed));
    }

    #[test]
    fn keysyms() {
        assert_eq!(Key::Down.keysym(), "Down");
        assert_eq!(Key::PageDown.keysym(), "Next");
        assert_eq!(Key::PageUp.keysym(), "Prior");
    }

    #[test]
    fn keys_parse_from_names() {
        assert_eq!("page-down".parse::<Key>(), Ok(Key::PageDown));
        assert_eq!("Up".parse::<Key>(), Ok(Key::Up));
        assert!("left".parse::<Key>().is_err());
    }

    #[test]
    fn loop_sends_the_requested_key() {
        let mut sender = RecordingKeySender::new();
        let stop = Arc::new(AtomicBool::new(false));

        run_autoscroll(&mut sender, Key::PageDown, Duration::ZERO, Some(2), &stop).unwrap();
        assert_eq!(sender.sent_keys(), [Key::PageDown, Key::PageDown]);
    }

    #[test]
    fn boxed_sender_downcasts() {
        let sender: Box<dyn KeySender> = Box::new(RecordingKeySender::new());
        assert!(sender.as_any().downcast_ref::<RecordingKeySender>().is_some());
    }
}

// Export modules for use in tests
pub mod annotations;
pub mod app;
pub mod autoscroll;
pub mod document;
pub mod event_source;
pub mod export;
pub mod lines;
pub mod notification;
pub mod overlay;
pub mod panic_handler;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod plain;
pub mod session;
pub mod settings;
pub mod stepper;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use app::{App, AppAction, run_app_with_event_source};
pub use document::{AnyDocument, Document, Page};
pub use session::{ReaderSession, SessionEvent};
pub use stepper::{PacerError, RevealMode, RevealStepper, RevealUpdate, Tick};

use std::fs::{self, File};
use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

use pdfpacer::app::{App, run_app_with_event_source};
use pdfpacer::autoscroll::{Key, XdotoolKeySender, run_autoscroll, spawn_stop_watcher};
use pdfpacer::document::AnyDocument;
use pdfpacer::event_source::KeyboardEventSource;
use pdfpacer::export::{ExportOptions, RevealExporter, document_stem};
use pdfpacer::lines::LinePolicy;
use pdfpacer::panic_handler::initialize_panic_handler;
use pdfpacer::plain::run_plain;
use pdfpacer::session::ReaderSession;
use pdfpacer::settings::{self, Settings};
use pdfpacer::stepper::RevealMode;

#[derive(Parser, Debug)]
#[command(
    name = "pdfpacer",
    version,
    about = "Reveal a PDF or text document line by line at a steady pace",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    reveal: RevealArgs,

    /// Where to write the log (defaults to the data directory)
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive terminal reader (the default)
    Read(RevealArgs),
    /// Print revealed lines to stdout
    Plain {
        #[command(flatten)]
        reveal: RevealArgs,
        /// Do not wait between ticks
        #[arg(long)]
        no_delay: bool,
    },
    /// Reveal without delay and write annotations and page images
    Export {
        #[command(flatten)]
        reveal: RevealArgs,
        /// Output directory
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
        /// Render scale for page images
        #[arg(long)]
        scale: Option<f32>,
    },
    /// Press Down in the focused window at a fixed interval
    Autoscroll {
        /// Milliseconds between presses
        #[arg(long, value_name = "MS")]
        interval: Option<u64>,
        /// Stop after this many presses
        #[arg(long, value_name = "N")]
        count: Option<usize>,
        /// down, up, page-down or page-up
        #[arg(long, default_value = "down")]
        key: Key,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct RevealArgs {
    /// PDF or plain text file; form feeds separate text pages
    file: Option<PathBuf>,

    /// Lines revealed per tick
    #[arg(long, value_name = "N")]
    lines: Option<usize>,

    /// Milliseconds between ticks
    #[arg(long, value_name = "MS")]
    delay: Option<u64>,

    /// highlight, block or autoscroll
    #[arg(long)]
    mode: Option<RevealMode>,

    /// Keep empty lines instead of skipping them
    #[arg(long)]
    keep_blank_lines: bool,
}

/// Settings from the config file with command line overrides applied
struct Resolved {
    file: PathBuf,
    lines_per_tick: usize,
    delay: Duration,
    mode: RevealMode,
    policy: LinePolicy,
}

impl RevealArgs {
    fn resolve(self, settings: &Settings) -> Result<Resolved> {
        let file = self
            .file
            .context("No input file given (try `pdfpacer <FILE>`)")?;
        let policy = if self.keep_blank_lines {
            LinePolicy::KeepAll
        } else {
            settings.line_policy
        };
        Ok(Resolved {
            file,
            lines_per_tick: self.lines.unwrap_or(settings.lines_per_tick),
            delay: Duration::from_millis(self.delay.unwrap_or(settings.delay_ms)),
            mode: self.mode.unwrap_or(settings.mode),
            policy,
        })
    }
}

fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("pdfpacer").join("pdfpacer.log"))
        .unwrap_or_else(|| PathBuf::from("pdfpacer.log"))
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    WriteLogger::init(
        LevelFilter::Debug,
        Config::default(),
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
    )?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = cli.log_file.clone().unwrap_or_else(default_log_path);
    init_logging(&log_path)?;
    initialize_panic_handler();

    info!("Starting pdfpacer");
    settings::load_settings();
    let settings = settings::current();

    let result = match cli.command {
        None => read(cli.reveal, &settings),
        Some(Command::Read(args)) => read(args, &settings),
        Some(Command::Plain { reveal, no_delay }) => plain(reveal, no_delay, &settings),
        Some(Command::Export { reveal, out, scale }) => export(reveal, out, scale, &settings),
        Some(Command::Autoscroll {
            interval,
            count,
            key,
        }) => autoscroll(interval, count, key, &settings),
    };

    if let Err(err) = &result {
        error!("Application error: {err:?}");
    }
    info!("Shutting down pdfpacer");
    result
}

fn read(args: RevealArgs, settings: &Settings) -> Result<()> {
    let resolved = args.resolve(settings)?;
    let document = AnyDocument::open(&resolved.file, resolved.policy)?;
    let session = ReaderSession::new(document, resolved.lines_per_tick, resolved.mode)?
        .with_key_sender(Box::new(XdotoolKeySender::with_binary(
            settings.xdotool_binary.clone(),
        )));
    let mut app = App::new(session, resolved.delay)
        .with_export_scale(settings.export_scale)
        .with_settings_persistence();

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app_with_event_source(&mut terminal, &mut app, &mut KeyboardEventSource);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    res
}

fn plain(args: RevealArgs, no_delay: bool, settings: &Settings) -> Result<()> {
    let resolved = args.resolve(settings)?;
    let document = AnyDocument::open(&resolved.file, resolved.policy)?;
    let delay = (!no_delay).then_some(resolved.delay);
    run_plain(document, resolved.lines_per_tick, delay, &mut io::stdout().lock())?;
    Ok(())
}

fn export(args: RevealArgs, out: PathBuf, scale: Option<f32>, settings: &Settings) -> Result<()> {
    let resolved = args.resolve(settings)?;
    let document = AnyDocument::open(&resolved.file, resolved.policy)?;
    let options = ExportOptions {
        mode: resolved.mode,
        lines_per_tick: resolved.lines_per_tick,
        scale: scale.unwrap_or(settings.export_scale),
    };
    let stem = document_stem(Some(resolved.file.as_path()));
    let written = RevealExporter::export(document, &stem, &out, options)?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn autoscroll(
    interval: Option<u64>,
    count: Option<usize>,
    key: Key,
    settings: &Settings,
) -> Result<()> {
    let interval = Duration::from_millis(interval.unwrap_or(settings.autoscroll_interval_ms));
    let mut sender = XdotoolKeySender::with_binary(settings.xdotool_binary.clone());
    let stop = Arc::new(AtomicBool::new(false));

    println!("Sending {key:?} every {}ms; press q, Esc or Ctrl+C here to stop", interval.as_millis());
    let watcher = match enable_raw_mode() {
        Ok(()) => Some(spawn_stop_watcher(KeyboardEventSource, Arc::clone(&stop))),
        Err(e) => {
            error!("Keyboard stop unavailable, interrupt the process to stop: {e}");
            None
        }
    };

    let result = run_autoscroll(&mut sender, key, interval, count, &stop);
    stop.store(true, Ordering::Relaxed);
    if let Some(watcher) = watcher {
        if watcher.join().is_err() {
            error!("Keyboard watcher panicked");
        }
        disable_raw_mode()?;
    }

    let presses = result?;
    println!("Sent {presses} key presses");
    Ok(())
}

//! Headless reveal to a writer, one batch per tick

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use log::info;

use crate::document::Document;
use crate::stepper::{RevealMode, RevealStepper, Tick};

/// Print every line of `document` in reveal order.
///
/// Sleeps `delay` between ticks when given; a page change prints a separator
/// naming the new page. Returns the number of lines written.
pub fn run_plain<D: Document, W: Write>(
    document: D,
    lines_per_tick: usize,
    delay: Option<Duration>,
    out: &mut W,
) -> Result<usize> {
    let mut stepper = RevealStepper::new(document)?;
    stepper.configure(lines_per_tick, RevealMode::Highlight)?;

    let mut written = 0;
    let mut first = true;
    while let Tick::Revealed(update) = stepper.tick()? {
        if !first {
            if let Some(delay) = delay {
                std::thread::sleep(delay);
            }
        }
        first = false;

        if update.page_changed {
            writeln!(out, "--- page {} ---", update.page_index + 1)?;
        }
        if let Some(lines) = stepper.revealed_lines(&update) {
            for line in lines {
                writeln!(out, "{line}")?;
                written += 1;
            }
        }
        out.flush()?;
    }

    info!("Plain reveal finished after {written} lines");
    Ok(written)
}

//! Console rendering of transfer progress and batch events
//!
//! The fetcher hands a [`TransferProgress`] to a [`ProgressReporter`] on every
//! received chunk and once more when the stream ends. [`render_status_line`]
//! turns it into the status text; the [`ConsoleReporter`] overwrites one
//! terminal line with it and finalizes the line when the transfer finishes.
//! Batch events go through the same reporter, so one writer owns the console.

use crate::types::{Event, StreamKind, TransferProgress};
use crate::utils::{format_duration, format_size};
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

/// Below this elapsed time no rate is computed
const MIN_RATE_WINDOW: Duration = Duration::from_millis(1);

/// Highest percentage shown while the stream is still open
const MAX_OPEN_PERCENT: f64 = 99.99;

/// Move to column 0 and clear the line
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Receives progress updates from an active transfer and batch events
///
/// Called synchronously from the batch, so implementations must return quickly.
pub trait ProgressReporter: Send + Sync {
    /// Handle one progress update of a transfer that is still running
    fn report(&self, progress: &TransferProgress);

    /// Handle the final update of a completed transfer
    fn finish(&self, progress: &TransferProgress) {
        self.report(progress);
    }

    /// Handle a batch event
    fn event(&self, _event: &Event) {}
}

/// A rendered status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Text without cursor control or trailing newline
    pub text: String,
    /// The transfer is complete and the line should be finalized
    pub finished: bool,
}

/// Render the status line for a transfer
///
/// Returns `None` when the total size is unknown. Only a `complete` transfer
/// renders as `Done`; an open stream that already passed an underestimated
/// total stays just below 100%. Speed and remaining time are left out until a
/// measurable amount of time has elapsed.
pub fn render_status_line(
    kind: StreamKind,
    transferred: u64,
    total: u64,
    elapsed: Duration,
    complete: bool,
) -> Option<StatusLine> {
    if total == 0 {
        return None;
    }

    let state = if complete {
        "Done".to_string()
    } else {
        let percent = (transferred as f64 / total as f64 * 100.0).min(MAX_OPEN_PERCENT);
        format!("{:.2}%", percent)
    };

    let mut text = format!(
        "\t[{}] Progression: {} ({})",
        kind.label(),
        state,
        format_size(total as f64)
    );

    if elapsed >= MIN_RATE_WINDOW {
        let speed = transferred as f64 / elapsed.as_secs_f64();
        text.push_str(&format!(" @ {}/s", format_size(speed)));
        if !complete && speed > 0.0 && transferred < total {
            let remaining = (total - transferred) as f64 / speed;
            text.push_str(&format!(" ({} remaining)", format_duration(remaining)));
        }
    }

    Some(StatusLine {
        text,
        finished: complete,
    })
}

/// Render the console text of a batch event, one entry per line
pub fn render_event(event: &Event) -> Vec<String> {
    match event {
        Event::EnumerationComplete { total, gaps } => {
            let mut lines = vec![format!("Found {} videos on this channel.", total)];
            if *gaps > 0 {
                lines.push(format!(
                    "Warning: {} listing page(s) could not be fetched, the list is incomplete.",
                    gaps
                ));
            }
            lines
        }
        Event::NoItems => vec!["No videos found.".to_string()],
        Event::ItemStarted {
            index,
            total,
            title,
        } => vec![format!("[{}/{}] {}", index, total, title)],
        Event::ItemMerged { output_path, .. } => {
            vec![format!("\tSaved {}", output_path.display())]
        }
        Event::ItemFailed { stage, error, .. } => {
            vec![format!("\tFailed while {}: {}", stage, error)]
        }
        Event::BatchComplete { succeeded, failed } => {
            vec![format!("Finished: {} merged, {} failed.", succeeded, failed)]
        }
    }
}

struct Console<W> {
    out: W,
    /// A status line was written and not yet finalized
    line_open: bool,
}

/// Writes an overwritable status line and event lines to a terminal or any other writer
pub struct ConsoleReporter<W: Write + Send> {
    console: Mutex<Console<W>>,
    show_progress: bool,
}

impl ConsoleReporter<std::io::Stdout> {
    /// Reporter writing to standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    /// Reporter writing to `out`
    pub fn new(out: W) -> Self {
        Self {
            console: Mutex::new(Console {
                out,
                line_open: false,
            }),
            show_progress: true,
        }
    }

    /// Print events only, dropping transfer progress
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        match self.console.into_inner() {
            Ok(console) => console.out,
            Err(poisoned) => poisoned.into_inner().out,
        }
    }

    fn write_status(&self, progress: &TransferProgress, complete: bool) {
        if !self.show_progress {
            return;
        }
        let Some(line) = render_status_line(
            progress.kind,
            progress.bytes_transferred,
            progress.total_bytes,
            progress.elapsed(),
            complete,
        ) else {
            return;
        };

        let mut console = match self.console.lock() {
            Ok(console) => console,
            Err(poisoned) => poisoned.into_inner(),
        };
        let terminator = if line.finished { "\n" } else { "" };
        // Console output is best effort; a closed stdout must not fail the transfer
        let _ = write!(console.out, "{}{}{}", CLEAR_LINE, line.text, terminator);
        let _ = console.out.flush();
        console.line_open = !line.finished;
    }
}

impl<W: Write + Send> ProgressReporter for ConsoleReporter<W> {
    fn report(&self, progress: &TransferProgress) {
        self.write_status(progress, false);
    }

    fn finish(&self, progress: &TransferProgress) {
        self.write_status(progress, true);
    }

    fn event(&self, event: &Event) {
        let mut console = match self.console.lock() {
            Ok(console) => console,
            Err(poisoned) => poisoned.into_inner(),
        };
        // A transfer that failed mid-stream leaves its status line open
        if console.line_open {
            let _ = writeln!(console.out);
            console.line_open = false;
        }
        for line in render_event(event) {
            let _ = writeln!(console.out, "{}", line);
        }
        let _ = console.out.flush();
    }
}

/// Discards every update
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn report(&self, _progress: &TransferProgress) {}
}

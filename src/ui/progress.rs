//! Batch run progress UI.
//!
//! Renders [`BatchEvent`]s from the orchestrator's event channel. Two modes:
//! - `full`: progress bar over the slots plus one line per finished step
//! - `json`: one JSON object per event, for machine consumption

use crate::ui::icons::{CHECK, CLOCK, CROSS, RUNNING, SPARKLE, STOP};
use crate::workflow::{BatchEvent, BatchPhase, BatchReport};
use console::{Term, style};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output mode for the batch UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    /// Progress bar and colored status lines
    #[default]
    Full,
    /// JSON-formatted events
    Json,
}

impl std::str::FromStr for UiMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Full,
        })
    }
}

/// Terminal UI for a batch run, rendered via `indicatif`.
///
/// The slot bar is sized when the `Initiated` event arrives; until then a
/// spinner shows that initiation is in progress.
pub struct BatchUI {
    mode: UiMode,
    multi: MultiProgress,
    slot_bar: ProgressBar,
    term: Term,
}

impl BatchUI {
    pub fn new(mode: UiMode) -> Self {
        let multi = match mode {
            UiMode::Full => MultiProgress::new(),
            UiMode::Json => MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        };
        let slot_bar = multi.add(ProgressBar::new_spinner());
        if mode == UiMode::Full {
            let spinner = ProgressStyle::default_spinner()
                .template("{prefix:.bold.dim} {spinner} {msg}")
                .expect("progress bar template is a valid static string");
            slot_bar.set_style(spinner);
            slot_bar.set_prefix("Batch");
            slot_bar.set_message("initiating...");
            slot_bar.enable_steady_tick(Duration::from_millis(100));
        }

        Self {
            mode,
            multi,
            slot_bar,
            term: Term::stdout(),
        }
    }

    /// Consume events until the orchestrator drops its sender.
    pub async fn drain(&self, mut rx: mpsc::Receiver<BatchEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle_event(&event);
        }
    }

    pub fn handle_event(&self, event: &BatchEvent) {
        match self.mode {
            UiMode::Json => {
                if let Ok(json) = serde_json::to_string(event) {
                    let _ = writeln!(&self.term, "{}", json);
                }
            }
            UiMode::Full => self.handle_full(event),
        }
    }

    fn handle_full(&self, event: &BatchEvent) {
        match event {
            BatchEvent::Initiated { date, jobs, slots } => {
                let bar_style = ProgressStyle::default_bar()
                    .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .expect("progress bar template is a valid static string")
                    .progress_chars("█▓▒░");
                self.slot_bar.set_style(bar_style);
                self.slot_bar.set_length(*slots as u64);
                self.slot_bar.set_position(0);
                self.slot_bar.disable_steady_tick();
                self.print_line(format!(
                    "{} Batch for {} initiated: {} jobs, {} slots",
                    SPARKLE,
                    style(date).cyan(),
                    jobs,
                    slots
                ));
            }
            BatchEvent::SlotStarted { slot, code } => {
                self.slot_bar.set_message(format!(
                    "{}slot {} (job {})",
                    RUNNING,
                    slot,
                    style(code).yellow()
                ));
            }
            BatchEvent::SlotFinished {
                slot,
                code,
                success,
            } => {
                self.slot_bar.inc(1);
                self.print_line(slot_line(*slot, &code.to_string(), *success));
            }
            BatchEvent::Finished { phase } => {
                self.slot_bar.finish_with_message(phase_summary(phase));
            }
        }
    }

    /// Print the closing summary for a run.
    pub fn print_report(&self, report: &BatchReport) {
        if self.mode == UiMode::Json {
            if let Ok(json) = serde_json::to_string(report) {
                let _ = writeln!(&self.term, "{}", json);
            }
            return;
        }
        self.print_line(format!(
            "{}{} slot(s) succeeded in {}",
            CLOCK,
            report.succeeded(),
            format_duration(report.duration)
        ));
    }

    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }
}

fn slot_line(slot: usize, code: &str, success: bool) -> String {
    if success {
        format!("  {}slot {} job {} {}", CHECK, slot, code, style("completed").green())
    } else {
        format!("  {}slot {} job {} {}", CROSS, slot, code, style("failed").red().bold())
    }
}

/// One-line description of a terminal phase.
pub fn phase_summary(phase: &BatchPhase) -> String {
    match phase {
        BatchPhase::Finished => format!("{}{}", CHECK, style("batch finished").green().bold()),
        BatchPhase::Aborted(_) => format!("{}{}", STOP, style(phase).red().bold()),
        other => other.to_string(),
    }
}

/// Format a duration for display.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", d.as_millis())
    }
}

//! Job table rendering.

use crate::job::{JobState, WorkflowJob};
use crate::ui::icons::FILE;
use console::{Alignment, measure_text_width, pad_str, style};

const ABSENT: &str = "--";
const HEADERS: [&str; 7] = ["CODE", "NAME", "STATE", "PLANNED", "STARTED", "ENDED", "FILE"];

/// Colored badge for a job state.
pub fn state_badge(state: JobState) -> String {
    let label = state.as_str();
    match state {
        JobState::Pending => style(label).dim().to_string(),
        JobState::Running => style(label).yellow().bold().to_string(),
        JobState::Completed => style(label).green().to_string(),
        JobState::Error => style(label).red().bold().to_string(),
    }
}

fn or_absent(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => ABSENT.to_string(),
    }
}

fn row(job: &WorkflowJob) -> [String; 7] {
    let planned = format!("{} - {}", job.planned_start, job.planned_end);
    [
        job.code.to_string(),
        job.name.clone(),
        state_badge(job.state),
        planned,
        or_absent(job.actual_start.as_deref()),
        or_absent(job.actual_end.as_deref()),
        if job.has_artifact() {
            format!("{}", FILE).trim_end().to_string()
        } else {
            String::new()
        },
    ]
}

/// Render the registry contents as an aligned table.
pub fn render_jobs(jobs: &[WorkflowJob]) -> String {
    if jobs.is_empty() {
        return style("No jobs for this date.").dim().to_string();
    }

    let rows: Vec<[String; 7]> = jobs.iter().map(row).collect();
    let mut widths = HEADERS.map(measure_text_width);
    for cells in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(measure_text_width(cell));
        }
    }

    let mut out = String::new();
    let header: Vec<String> = HEADERS
        .iter()
        .zip(widths)
        .map(|(h, w)| style(pad_str(h, w, Alignment::Left, None)).bold().to_string())
        .collect();
    out.push_str(header.join("  ").trim_end());
    for cells in &rows {
        out.push('\n');
        let line: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(c, w)| pad_str(c, w, Alignment::Left, None).into_owned())
            .collect();
        out.push_str(line.join("  ").trim_end());
    }
    out
}

use podcast_core::{AppViewModel, Metrics, Phase, PodcastResult};

const BAR_WIDTH: usize = 24;

/// Turns successive view models into terminal lines, printing only what
/// changed since the previous frame.
#[derive(Debug, Default)]
pub(crate) struct Renderer {
    last_status: Option<String>,
    last_notice: Option<String>,
    last_log: Vec<String>,
}

impl Renderer {
    pub(crate) fn frame(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut lines = Vec::new();

        if view.phase == Phase::Idle {
            if let Some(reason) = &view.validation_error {
                lines.push(format!("Cannot submit: {reason}"));
            }
            self.last_log.clear();
            return lines;
        }

        let fresh = new_log_lines(&self.last_log, &view.log);
        lines.extend(fresh.iter().map(|line| format!("  | {line}")));
        self.last_log = view.log.clone();

        let status = status_line(view);
        if self.last_status.as_deref() != Some(status.as_str()) {
            lines.push(status.clone());
            self.last_status = Some(status);
        }

        if view.notice != self.last_notice {
            if let Some(notice) = &view.notice {
                lines.push(format!("  ! {notice}"));
            }
            self.last_notice = view.notice.clone();
        }

        if view.cancel_prompt_open {
            lines.push("Cancel requested, waiting for confirmation".to_string());
        }

        match view.phase {
            Phase::Success => {
                if let Some(result) = &view.result {
                    lines.extend(result_lines(result));
                }
            }
            Phase::Error => {
                lines.push(format!(
                    "Failed: {}",
                    view.error.as_deref().unwrap_or("unknown error")
                ));
            }
            Phase::Idle | Phase::Running => {}
        }

        lines
    }
}

pub(crate) fn status_line(view: &AppViewModel) -> String {
    let job = view.job_id.as_deref().unwrap_or("submitting");
    let checks = if view.attempts > 0 {
        format!("  (check {}/{})", view.attempts, view.max_attempts)
    } else {
        String::new()
    };
    format!(
        "[{}/{}] {:<22} {} {:>3}%  {}{}",
        view.stage + 1,
        view.stage_count.max(1),
        view.stage_label,
        progress_bar(view.percent, BAR_WIDTH),
        view.percent,
        job,
        checks
    )
}

pub(crate) fn progress_bar(percent: u8, width: usize) -> String {
    let filled = usize::from(percent.min(100)) * width / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

pub(crate) fn result_lines(result: &PodcastResult) -> Vec<String> {
    let mut lines = vec![
        format!("Ready: {}", result.title),
        format!("  Audio:  {}", result.audio_url),
    ];
    if let Some(notes) = &result.notes_url {
        lines.push(format!("  Notes:  {notes}"));
    }
    if let Some(script) = &result.script_url {
        lines.push(format!("  Script: {script}"));
    }
    if let Some(metrics) = &result.metrics {
        lines.push(format!("  {}", metrics_summary(metrics)));
    }
    lines
}

fn metrics_summary(metrics: &Metrics) -> String {
    let mut parts = vec![
        format!("Duration {}", format_duration(metrics.duration_secs)),
        format!("Sources {}", metrics.sources_kept),
    ];
    if let Some(words) = metrics.word_count {
        parts.push(format!("Words {}", format_with_commas(u64::from(words))));
    }
    parts.push(format!("TTS {:.1}s", metrics.tts_secs));
    parts.push(format!("Processing {:.1}s", metrics.processing_secs));
    if let Some(lufs) = metrics.lufs {
        parts.push(format!("Loudness {lufs:.1} LUFS"));
    }
    parts.join(" | ")
}

fn format_duration(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn format_with_commas(value: u64) -> String {
    let mut out = String::new();
    for (i, ch) in value.to_string().chars().rev().enumerate() {
        if i != 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

/// Lines of `next` not yet shown. The log is a sliding window, so the
/// longest tail of `previous` that starts `next` counts as already printed.
fn new_log_lines<'a>(previous: &[String], next: &'a [String]) -> &'a [String] {
    let max_overlap = previous.len().min(next.len());
    let overlap = (0..=max_overlap)
        .rev()
        .find(|&len| previous[previous.len() - len..] == next[..len])
        .unwrap_or(0);
    &next[overlap..]
}

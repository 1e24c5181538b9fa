//! Progress bar adapter using indicatif.

use capture_qa_core::{EventSink, MetricResult, PipelineEvent, Report};
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

/// Progress bar adapter for CLI output.
///
/// Receives pipeline events for persistence warnings; batch-level progress
/// is driven by the check loop.
pub struct ProgressBar {
    bar: Option<IndicatifBar>,
    quiet: bool,
}

impl ProgressBar {
    /// Creates a new progress bar.
    ///
    /// # Arguments
    ///
    /// * `total` - Total number of items, if known
    /// * `quiet` - If true, suppress all output
    /// * `show_bar` - If true, show progress bar; otherwise show per-item status
    #[must_use]
    pub fn new(total: Option<u64>, quiet: bool, show_bar: bool) -> Self {
        if quiet {
            return Self {
                bar: None,
                quiet: true,
            };
        }

        let bar = if show_bar {
            let bar = total.map_or_else(IndicatifBar::new_spinner, IndicatifBar::new);

            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }

            Some(bar)
        } else {
            None
        };

        Self { bar, quiet }
    }

    /// An input is about to run through the pipeline.
    pub fn started(&self, path: &str, index: usize, total: Option<usize>) {
        if let Some(bar) = &self.bar {
            if let Some(t) = total {
                bar.set_length(t as u64);
            }
            bar.set_position(index as u64);
            bar.set_message(path.to_string());
        }
    }

    /// An input produced a report.
    pub fn completed(&self, path: &str, report: &Report) {
        if self.quiet {
            return;
        }
        if let Some(bar) = &self.bar {
            bar.inc(1);
        } else if !report.passes() {
            eprintln!("{path}: {}", failing_checks(report).join(", "));
        }
    }

    /// An input could not be read.
    pub fn skipped(&self, path: &str, reason: &str) {
        if self.quiet {
            return;
        }
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
        eprintln!("WARN: Skipping {path}: {reason}");
    }

    /// All inputs have been handled.
    pub fn finished(&self, processed: usize, skipped: usize) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(format!("Done: {processed} processed, {skipped} skipped"));
        }
    }
}

/// Names of the checks a report does not pass.
fn failing_checks(report: &Report) -> Vec<&'static str> {
    if !report.is_valid && report.image_id.is_none() {
        return vec!["unreadable image"];
    }
    let mut failing = Vec::new();
    if !report.sharpness.passes() {
        failing.push("sharpness");
    }
    if !report.exposure.passes() {
        failing.push("exposure");
    }
    if !report.specular_reflections.passes() {
        failing.push("specular_reflections");
    }
    if report.advanced_quality.as_ref().is_some_and(|a| !a.passes()) {
        failing.push("advanced_quality");
    }
    failing
}

impl EventSink for ProgressBar {
    fn on_event(&self, event: PipelineEvent) {
        if self.quiet {
            return;
        }

        match event {
            PipelineEvent::PersistenceFailed { target, reason } => {
                let message = format!("WARN: {target} failed: {reason}");
                match &self.bar {
                    Some(bar) => bar.println(message),
                    None => eprintln!("{message}"),
                }
            }
            PipelineEvent::NormalizationFailed { reason } => {
                if let Some(bar) = &self.bar {
                    bar.set_message(format!("decode failed: {reason}"));
                }
            }
            PipelineEvent::Normalized { .. }
            | PipelineEvent::MetricCompleted { .. }
            | PipelineEvent::MetricFailed { .. }
            | PipelineEvent::ReportBuilt { .. } => {}
        }
    }
}

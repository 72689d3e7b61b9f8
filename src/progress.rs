//! Spinners for apply steps

use colored::Colorize;
use declarative::{ProgressCallback, Step};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner with a message
pub fn spinner(msg: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("  {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.into());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Shows one spinner per apply step, replaced by a check mark when done
#[derive(Default)]
pub struct StepProgress {
    current: Option<ProgressBar>,
    quiet: bool,
}

impl StepProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            current: None,
            quiet,
        }
    }
}

fn describe(step: Step, count: usize) -> String {
    match step {
        Step::RefreshIndex => "refreshing package index".to_string(),
        Step::Remove => format!("removing {count}"),
        Step::Add => format!("adding {count}"),
        Step::Modify => format!("updating {count}"),
    }
}

impl ProgressCallback for StepProgress {
    fn on_step_start(&mut self, backend: &str, step: Step, count: usize) {
        log::info!("{backend}: {step} ({count})");
        if self.quiet {
            return;
        }
        self.current = Some(spinner(format!("{backend}: {}", describe(step, count))));
    }

    fn on_step_complete(&mut self, backend: &str, step: Step) {
        if let Some(pb) = self.current.take() {
            pb.finish_and_clear();
            println!("  {} {backend}: {step}", "✓".green());
        }
    }
}

impl Drop for StepProgress {
    // A failed step never completes; don't leave its spinner running
    fn drop(&mut self) {
        if let Some(pb) = self.current.take() {
            pb.abandon();
        }
    }
}

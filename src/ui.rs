//! Terminal output for the workshop: event stream, banners and progress.
//!
//! Uses `indicatif` for the completion progress bar and `console` for
//! colors. When stdout is not a terminal the bar is hidden and lines are
//! printed plain, so the event stream stays parseable.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::WorkshopConfig;
use crate::journal::{Observe, PhaseEvent};
use crate::orchestrator::RunReport;
use crate::state_machine::{Change, Direction, Job};

/// Console observer printing the chronological event stream.
pub struct ShopConsole {
    // Completed-jobs bar; hidden outside a terminal.
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    cyan: Style,
    dim: Style,
}

impl ShopConsole {
    /// Creates the console for a run of `total_jobs` jobs.
    pub fn new(total_jobs: u64) -> Self {
        let pb = ProgressBar::new(total_jobs);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} jobs done")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            cyan: Style::new().cyan(),
            dim: Style::new().dim(),
        }
    }

    // Routes through the bar when it is drawn so lines don't tear it.
    fn line(&self, message: String) {
        if self.pb.is_hidden() {
            println!("{message}");
        } else {
            self.pb.println(message);
        }
    }

    pub fn waiting(&self, addr: &str) {
        self.line(format!(
            "{} Waiting for controller orders on {addr}...",
            self.yellow.apply_to("…")
        ));
    }

    pub fn opened(&self, config: &WorkshopConfig) {
        self.line(format!(
            "{} Workshop open: {} bays, {} mechanics | jobs: mechanical={} electrical={} bodywork={}\n",
            self.green.apply_to("▶"),
            config.bays,
            config.mechanics,
            config.jobs_mechanical,
            config.jobs_electrical,
            config.jobs_bodywork
        ));
    }

    /// Clears the bar and prints the completion banner with the run summary.
    pub fn finish(&self, report: &RunReport) {
        self.pb.finish_and_clear();
        let style = if report.is_complete() {
            &self.green
        } else {
            &self.red
        };
        println!();
        println!("{}", style.apply_to("=== Workshop closed ==="));
        println!("Duration: {:.2} s", report.duration_ms as f64 / 1000.0);
        println!("Jobs processed: {}/{}", report.processed, report.expected);
        println!("Throughput: {:.2} jobs/s", report.throughput);
    }

    /// Prints the run report as pretty JSON.
    pub fn print_report(&self, report: &RunReport) {
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }
}

impl Observe for ShopConsole {
    fn on_phase(&self, event: &PhaseEvent) {
        let style = match event.direction {
            Direction::Entering => &self.cyan,
            Direction::Leaving => &self.dim,
        };
        self.line(style.apply_to(event).to_string());
    }

    fn on_state_change(&self, change: &Change) {
        self.line(format!(
            "\n{} State: {}",
            self.yellow.apply_to(">>>"),
            change.to.label()
        ));
    }

    fn on_job_done(&self, _job: &Job) {
        self.pb.inc(1);
    }
}

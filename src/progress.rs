//! Progress reporting for the crawl
//!
//! Provides real-time progress display using indicatif progress bars.

use crate::config::CrawlConfig;
use crate::walk::{CrawlProgress, CrawlStats};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Width of the rate-sampling window
const RATE_WINDOW: Duration = Duration::from_secs(2);

/// Progress reporter that displays crawl status
pub struct ProgressReporter {
    /// Progress bar
    bar: ProgressBar,

    /// Start of the current rate window
    window_started: Instant,

    /// Directories walked when the window opened
    dirs_at_window: u64,

    /// Rate measured over the last closed window
    rate: f64,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            bar,
            window_started: Instant::now(),
            dirs_at_window: 0,
            rate: 0.0,
        }
    }

    /// Update the progress display.
    ///
    /// The rate shown is directories per second over the last full sampling
    /// window, not the lifetime average.
    pub fn update(&mut self, progress: &CrawlProgress) {
        let elapsed = self.window_started.elapsed();
        if elapsed >= RATE_WINDOW {
            let walked = progress.dirs.saturating_sub(self.dirs_at_window);
            self.rate = walked as f64 / elapsed.as_secs_f64();
            self.window_started = Instant::now();
            self.dirs_at_window = progress.dirs;
        }

        let bytes_str = format_size(progress.bytes, BINARY);
        let msg = format!(
            "Dirs: {} | Files: {} | Size: {} | Rate: {:.0}/s | Queue: {} | Pending: {}",
            format_number(progress.dirs),
            format_number(progress.files),
            bytes_str,
            self.rate,
            progress.queue_depth,
            progress.pending,
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .rev()
                .map(|&b| b as char)
                .collect::<String>()
        })
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the crawl results
pub fn print_summary(stats: &CrawlStats) {
    let bytes_str = format_size(stats.bytes_seen, BINARY);
    let duration_secs = stats.duration.as_secs_f64();

    println!();
    if stats.completed {
        println!("{}", style("Crawl Complete").green().bold());
    } else {
        println!("{}", style("Crawl Interrupted").yellow().bold());
    }
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Directories:").bold(),
        format_number(stats.dirs_walked)
    );
    println!(
        "  {} {}",
        style("Files:").bold(),
        format_number(stats.files_seen)
    );
    println!("  {} {}", style("Total Size:").bold(), bytes_str);
    println!(
        "  {} {}",
        style("Batches:").bold(),
        format_number(stats.batches_dispatched)
    );
    println!(
        "  {} {:.1}s ({:.0} dirs/sec)",
        style("Duration:").bold(),
        duration_secs,
        stats.dirs_per_second()
    );
    println!();
}

/// Print a header at the start of the crawl
pub fn print_header(config: &CrawlConfig) {
    println!();
    println!(
        "{} {}",
        style("qumulo-crawler").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}:{}",
        style("Cluster:").bold(),
        config.host,
        config.port
    );
    println!("  {} {}", style("Root:").bold(), config.root);
    println!("  {} {}", style("Workers:").bold(), config.worker_count);
    println!(
        "  {} {} ({})",
        style("Queue:").bold(),
        config.redis_url,
        config.queue_prefix
    );
    println!();
}

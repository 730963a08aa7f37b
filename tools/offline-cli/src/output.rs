//! Output formatting for the CLI.

use console::style;
use http::StatusCode;
use indicatif::{ProgressBar, ProgressStyle};

/// Output handler for CLI messages.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

/// Which stream a message goes to.
#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Output {
    /// Create a new output handler.
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    /// Human-readable line; suppressed in JSON mode so stdout stays parseable.
    fn line(&self, stream: Stream, text: impl std::fmt::Display) {
        if self.json {
            return;
        }
        match stream {
            Stream::Stdout => println!("{}", text),
            Stream::Stderr => eprintln!("{}", text),
        }
    }

    pub fn info(&self, msg: &str) {
        self.line(Stream::Stdout, format_args!("{} {}", style("ℹ").blue(), msg));
    }

    pub fn success(&self, msg: &str) {
        self.line(Stream::Stdout, format_args!("{} {}", style("✓").green(), msg));
    }

    pub fn warn(&self, msg: &str) {
        self.line(Stream::Stderr, format_args!("{} {}", style("⚠").yellow(), msg));
    }

    /// Print an error; in JSON mode as `{"error": ...}` on stderr.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
            return;
        }
        eprintln!("{} {}", style("✗").red(), style(msg).red());
    }

    /// Print a debug message (only in verbose mode).
    pub fn debug(&self, msg: &str) {
        if self.verbose {
            self.line(Stream::Stderr, format_args!("{} {}", style("→").dim(), style(msg).dim()));
        }
    }

    /// The offline indicator, highlighted.
    pub fn banner(&self, msg: &str) {
        self.line(Stream::Stdout, style(format!(" {} ", msg)).black().on_yellow());
    }

    pub fn header(&self, msg: &str) {
        self.line(Stream::Stdout, format_args!("\n{}", style(msg).bold().underlined()));
    }

    /// Print JSON output.
    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        self.line(Stream::Stdout, format_args!("  {}: {}", style(key).dim(), value));
    }

    pub fn list_item(&self, item: &str) {
        self.line(Stream::Stdout, format_args!("  {} {}", style("•").dim(), item));
    }

    /// Print columns padded to `widths`; a width of 0 leaves the column as is.
    pub fn table_row(&self, cols: &[&str], widths: &[usize]) {
        let formatted: Vec<String> = cols
            .iter()
            .zip(widths.iter())
            .map(|(col, width)| format!("{:width$}", col, width = width))
            .collect();
        self.line(Stream::Stdout, format_args!("  {}", formatted.join("  ")));
    }

    /// Create a progress bar.
    pub fn progress(&self, len: u64, msg: &str) -> ProgressBar {
        if self.json {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style.progress_chars("#>-"));
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner for indeterminate progress.
    pub fn spinner(&self, msg: &str) -> ProgressBar {
        if self.json {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    /// Check if JSON mode is enabled.
    pub fn is_json(&self) -> bool {
        self.json
    }

}

/// Colored `status reason` label for a response.
pub fn status_badge(status: StatusCode, reason: &str) -> String {
    let label = format!("{} {}", status.as_u16(), reason);
    if status.is_success() {
        style(label).green().to_string()
    } else if status.is_redirection() {
        style(label).yellow().to_string()
    } else if status.is_client_error() || status.is_server_error() {
        style(label).red().to_string()
    } else {
        label
    }
}

/// First `max` characters of a body, noting how much was cut.
pub fn preview(text: &str, max: usize) -> String {
    let total = text.chars().count();
    if total <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max).collect();
    format!("{}… ({} more chars)", head, total - max)
}

/// Format bytes as human-readable size.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format an age in milliseconds as a human-readable string.
pub fn format_age(millis: u64) -> String {
    let secs = millis / 1000;
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

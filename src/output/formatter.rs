//! Message formatting and display.
//!
//! Notifications for the person running the tool go through
//! [`OutputFormatter`]; diagnostics go through `tracing` instead.
//!
//! # Examples
//!
//! ```
//! use invoicecat::output::OutputFormatter;
//!
//! let formatter = OutputFormatter::new(false, false);
//! formatter.info("Connecting to the mail client...");
//! formatter.success("Processing complete");
//! ```

use std::io;

use crate::dispatch::{DispatchMode, ResultTable};
use crate::pipeline::{ProcessReport, RunOutcome};

/// Level of output message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    /// Informational message.
    Info,
    /// Success message.
    Success,
    /// Warning message.
    Warning,
    /// Error message.
    Error,
    /// Debug/verbose message.
    Debug,
}

/// Output formatter with configurable verbosity.
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    quiet: bool,
    verbose: bool,
    colored: bool,
}

impl OutputFormatter {
    /// Create a new output formatter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - Suppress non-error output
    /// * `verbose` - Show verbose output
    pub fn new(quiet: bool, verbose: bool) -> Self {
        Self {
            quiet,
            verbose,
            colored: Self::should_use_color(),
        }
    }

    fn should_use_color() -> bool {
        use std::io::IsTerminal;
        io::stdout().is_terminal() && std::env::var("TERM").is_ok()
    }

    /// Print an informational message. Suppressed in quiet mode.
    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.print_message(MessageLevel::Info, message);
        }
    }

    /// Print a success message. Suppressed in quiet mode.
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.print_message(MessageLevel::Success, message);
        }
    }

    /// Print a warning message, even in quiet mode.
    pub fn warning(&self, message: &str) {
        self.print_message(MessageLevel::Warning, message);
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        self.print_message(MessageLevel::Error, message);
    }

    /// Print a message only in verbose mode.
    pub fn debug(&self, message: &str) {
        if self.verbose {
            self.print_message(MessageLevel::Debug, message);
        }
    }

    fn print_message(&self, level: MessageLevel, message: &str) {
        let (prefix, color_code) = match level {
            MessageLevel::Info => ("", ""),
            MessageLevel::Success => ("✓ ", "\x1b[32m"),
            MessageLevel::Warning => ("⚠ ", "\x1b[33m"),
            MessageLevel::Error => ("✗ ", "\x1b[31m"),
            MessageLevel::Debug => ("→ ", "\x1b[36m"),
        };

        let line = if self.colored && !color_code.is_empty() {
            format!("{color_code}{prefix}{message}\x1b[0m")
        } else {
            format!("{prefix}{message}")
        };

        match level {
            MessageLevel::Warning | MessageLevel::Error => eprintln!("{line}"),
            _ => println!("{line}"),
        }
    }

    /// Print a section header. Suppressed in quiet mode.
    pub fn section(&self, title: &str) {
        if !self.quiet {
            println!("\n{title}");
        }
    }

    /// Print a labelled value. Only shown in verbose mode.
    pub fn detail(&self, label: &str, value: &str) {
        if self.verbose {
            println!("  {label}: {value}");
        }
    }

    /// Print a numbered list item. Suppressed in quiet mode.
    pub fn list_item(&self, index: usize, message: &str) {
        if !self.quiet {
            println!("  {index}. {message}");
        }
    }

    /// Print the summary of a processing run.
    pub fn display_report(&self, report: &ProcessReport) {
        if report.outcome() == RunOutcome::NothingToDo {
            self.info("No unread invoice messages found. Nothing to do.");
            return;
        }

        self.section("Summary");
        self.list_item(1, &format!("Invoice messages: {}", report.eligible));
        self.list_item(2, &format!("Merged files: {}", report.merged()));
        if report.mode == DispatchMode::Forward {
            self.list_item(3, &format!("Forwarded: {}", report.forwarded));
        }
        self.detail("Marked read", &report.marked_read.to_string());

        if report.failures.is_empty() {
            self.success("Processing complete");
            return;
        }

        self.warning(&format!(
            "{} item(s) failed; their messages were left unread",
            report.failures.len()
        ));
        for failure in &report.failures {
            let what = failure.attachment.as_deref().unwrap_or("forward");
            self.debug(&format!(
                "{} ({}): {what}: {}",
                failure.subject, failure.sender, failure.error
            ));
        }
    }

    /// Print the merge results table. Suppressed in quiet mode.
    pub fn display_table(&self, table: &ResultTable) {
        if !self.quiet {
            print!("{}", render_table(table));
        }
    }


}

/// Render `table` as numbered, aligned rows of sender, file name and path.
pub fn render_table(table: &ResultTable) -> String {
    if table.is_empty() {
        return "  (no merged invoices)\n".to_string();
    }

    let sender_width = table
        .rows()
        .iter()
        .map(|r| r.sender.chars().count())
        .chain(std::iter::once("Sender".len()))
        .max()
        .unwrap_or_default();
    let name_width = table
        .rows()
        .iter()
        .map(|r| r.file_name().chars().count())
        .chain(std::iter::once("File".len()))
        .max()
        .unwrap_or_default();

    let mut out = format!(
        "  {:>3}  {:<sender_width$} │ {:<name_width$} │ Path\n",
        "#", "Sender", "File"
    );
    for (i, record) in table.rows().iter().enumerate() {
        out.push_str(&format!(
            "  {:>3}  {:<sender_width$} │ {:<name_width$} │ {}\n",
            i + 1,
            record.sender,
            record.file_name(),
            record.path.display()
        ));
    }
    out
}

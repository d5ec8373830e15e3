//! CLI argument parsing for invoicecat.
//!
//! # Examples
//!
//! ```
//! use clap::Parser;
//! use invoicecat::cli::{Cli, Commands};
//!
//! let cli = Cli::parse_from(["invoicecat", "run", "--dispatch", "forward"]);
//! assert!(matches!(cli.command, Commands::Run(_)));
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{SettingsUpdate, SmtpSecurity};
use crate::dispatch::DispatchMode;

/// Merge invoice PDFs from unread mail with a QR page.
///
/// invoicecat looks for unread messages mentioning "invoice" in a subfolder
/// of your inbox, merges every PDF attachment with a fixed QR-code PDF and
/// either forwards the result or lets you send it from a results table.
#[derive(Parser, Debug)]
#[command(name = "invoicecat")]
#[command(version)]
#[command(about = "Merge invoice PDFs from unread mail with a QR page", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Settings file to use instead of the default location
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the invoice folder and merge attachments
    Run(RunArgs),

    /// Show or change the saved settings
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Open a file with the default application
    Open {
        /// File to open
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}

/// Options for `run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// What to do with merged invoices
    ///
    /// manual: list them and send selected rows from the results shell.
    /// forward: forward each original message immediately.
    #[arg(short, long, value_enum, default_value_t = DispatchMode::Manual)]
    pub dispatch: DispatchMode,

    /// Print the results table and exit instead of opening the results shell
    #[arg(long)]
    pub no_interactive: bool,
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the current settings as JSON
    Show,
    /// Print the settings file location
    Path,
    /// Change settings and save them
    Set(SetArgs),
}

/// Fields accepted by `config set`.
#[derive(Args, Debug, Clone, Default)]
pub struct SetArgs {
    /// Folder receiving attachments and merged PDFs
    #[arg(long, value_name = "DIR")]
    pub save_folder: Option<PathBuf>,

    /// QR-code PDF appended to every invoice
    #[arg(long, value_name = "FILE")]
    pub qr_pdf: Option<PathBuf>,

    /// Recipient of forwarded invoices
    #[arg(long, value_name = "ADDRESS")]
    pub forward_to: Option<String>,

    /// Numeric default-folder id of the inbox (6 = Inbox)
    #[arg(long, value_name = "ID")]
    pub inbox_id: Option<String>,

    /// Name of the invoice subfolder
    #[arg(long, value_name = "NAME")]
    pub subfolder: Option<String>,

    /// IMAP server
    #[arg(long, value_name = "HOST")]
    pub imap_host: Option<String>,

    /// IMAP port
    #[arg(long, value_name = "PORT")]
    pub imap_port: Option<u16>,

    /// SMTP server
    #[arg(long, value_name = "HOST")]
    pub smtp_host: Option<String>,

    /// SMTP port
    #[arg(long, value_name = "PORT")]
    pub smtp_port: Option<u16>,

    /// SMTP transport security
    #[arg(long, value_enum)]
    pub smtp_security: Option<SmtpSecurity>,

    /// Login name for IMAP and SMTP
    #[arg(long, value_name = "USER")]
    pub username: Option<String>,

    /// Sender address, if different from the login name (empty to clear)
    #[arg(long, value_name = "ADDRESS")]
    pub from: Option<String>,

    /// Command that starts the mail client (empty to clear)
    #[arg(long, value_name = "COMMAND")]
    pub launch_command: Option<String>,
}

impl From<SetArgs> for SettingsUpdate {
    fn from(args: SetArgs) -> Self {
        SettingsUpdate {
            save_folder: args.save_folder,
            qr_pdf: args.qr_pdf,
            forward_to: args.forward_to,
            inbox_id: args.inbox_id,
            subfolder_name: args.subfolder,
            imap_host: args.imap_host,
            imap_port: args.imap_port,
            smtp_host: args.smtp_host,
            smtp_port: args.smtp_port,
            smtp_security: args.smtp_security,
            username: args.username,
            from: args.from,
            launch_command: args.launch_command,
        }
    }
}

impl Cli {
    /// Default tracing filter for the `-v`/`-q` flags.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

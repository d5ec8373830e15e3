//! invoicecat - merge invoice PDFs from unread mail with a QR page.
//!
//! The library exposes the processing pipeline and its parts so that the
//! binary and the tests drive the same code:
//!
//! - [`config`]: persisted settings
//! - [`mail`]: the mail session traits and the IMAP/SMTP binding
//! - [`scan`]: selection of unread invoice messages
//! - [`merge`]: attachment saving, output naming and PDF concatenation
//! - [`dispatch`]: manual result table or immediate forward
//! - [`pipeline`]: the run that ties them together
//! - [`shell`]: the interactive results shell

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod dispatch;
mod error;
pub mod io;
pub mod mail;
pub mod merge;
pub mod opener;
pub mod output;
pub mod pipeline;
pub mod scan;
pub mod shell;

pub use error::{InvoiceError, Result};

use std::io::IsTerminal;

use crate::cli::{Cli, Commands, ConfigCommand, RunArgs, SetArgs};
use crate::config::{ConfigStore, SettingsUpdate};
use crate::dispatch::DispatchMode;
use crate::mail::LaunchPolicy;
use crate::mail::imap::ImapConnector;
use crate::opener::{FileOpener, SystemOpener};
use crate::output::OutputFormatter;
use crate::shell::ResultsShell;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Execute the command described by `cli`.
///
/// # Errors
///
/// Returns the first error hit by the command; the caller maps it to an
/// exit code with [`InvoiceError::exit_code`].
pub fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.quiet, cli.verbose > 0);
    let store = ConfigStore::locate(cli.config)?;

    match cli.command {
        Commands::Run(args) => run_pipeline(&store, &args, &formatter),
        Commands::Config(command) => config_command(&store, command, &formatter),
        Commands::Open { path } => {
            SystemOpener.open(&path)?;
            formatter.success(&format!("Opened {}", path.display()));
            Ok(())
        }
    }
}

fn run_pipeline(store: &ConfigStore, args: &RunArgs, formatter: &OutputFormatter) -> Result<()> {
    let settings = store.load()?;
    let connector = ImapConnector::new(settings.mail.clone());
    let policy = LaunchPolicy::from(&settings.mail);

    formatter.info(&format!(
        "Scanning '{}' for unread invoices...",
        settings.subfolder_name
    ));
    let report = pipeline::process_invoices(&connector, &settings, args.dispatch, policy)?;
    formatter.display_report(&report);

    if args.dispatch != DispatchMode::Manual || report.merged() == 0 {
        return Ok(());
    }

    let table = report.into_table();
    if args.no_interactive || !std::io::stdin().is_terminal() {
        formatter.display_table(&table);
        return Ok(());
    }

    let mut shell = ResultsShell::new(
        table,
        &connector,
        policy,
        settings.forward_to.clone(),
        SystemOpener,
    );
    shell.run(std::io::stdin().lock(), &mut std::io::stdout())
}

fn config_command(
    store: &ConfigStore,
    command: ConfigCommand,
    formatter: &OutputFormatter,
) -> Result<()> {
    match command {
        ConfigCommand::Path => {
            println!("{}", store.path().display());
            Ok(())
        }
        ConfigCommand::Show => {
            let mut settings = store.load()?;
            if settings.mail.password.is_some() {
                settings.mail.password = Some("********".to_string());
            }
            let json = serde_json::to_string_pretty(&settings)
                .map_err(|e| InvoiceError::invalid_config(e.to_string()))?;
            println!("{json}");
            Ok(())
        }
        ConfigCommand::Set(args) => save_settings(store, args, formatter),
    }
}

fn save_settings(store: &ConfigStore, args: SetArgs, formatter: &OutputFormatter) -> Result<()> {
    let update = SettingsUpdate::from(args);
    if update.is_empty() {
        formatter.warning("Nothing to change; see 'invoicecat config set --help'");
        return Ok(());
    }

    let mut settings = store.load()?;
    settings.apply(update)?;
    store.save(&settings)?;

    formatter.success(&format!("Settings saved to {}", store.path().display()));
    Ok(())
}

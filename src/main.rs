//! invoicecat - merge invoice PDFs from unread mail with a QR page.

use clap::Parser;
use std::process;

use invoicecat::cli::Cli;
use invoicecat::output::OutputFormatter;

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.log_level());

    let formatter = OutputFormatter::new(cli.quiet, cli.verbose > 0);

    if let Err(err) = invoicecat::run(cli) {
        formatter.error(&err.to_string());
        process::exit(err.exit_code());
    }
}

/// Log to stderr. `RUST_LOG` overrides the level from the command line.
fn setup_logging(level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

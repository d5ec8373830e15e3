//! Interactive results shell for manual dispatch.
//!
//! After a manual run the merged invoices are shown as a numbered table and
//! the user works through them with line commands:
//!
//! ```text
//! list             show the table
//! open N           open row N with the default PDF viewer
//! delete SEL       delete the merged files of the selected rows
//! send SEL         send each selected row as its own mail
//! help             show this list
//! quit             leave the shell
//! ```
//!
//! `SEL` is `all` or a list like `1,3-5`.

use std::io::{BufRead, Write};

use crate::dispatch::{ResultTable, Selection};
use crate::error::Result;
use crate::mail::{self, Connector, LaunchPolicy};
use crate::opener::FileOpener;
use crate::output::formatter::render_table;

const HELP: &str = "\
Commands:
  list          show merged invoices
  open N        open row N
  delete SEL    delete selected rows and their files
  send SEL      send selected rows, one mail each
  help          show this help
  quit          leave
SEL is 'all' or a list like 1,3-5
";

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the table.
    List,
    /// Open a 1-based row.
    Open(usize),
    /// Delete the selected rows.
    Delete(Selection),
    /// Send the selected rows.
    Send(Selection),
    /// Show the command list.
    Help,
    /// Leave the shell.
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a message for unknown commands or bad arguments.
    pub fn parse(line: &str) -> std::result::Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (line, ""),
        };

        let selection = || {
            if arg.is_empty() {
                return Err(format!("'{name}' needs a selection, e.g. 1,3-5 or all"));
            }
            Selection::parse(arg).map_err(|e| e.to_string())
        };

        let command = match name.to_lowercase().as_str() {
            "list" | "ls" => Self::List,
            "open" => Self::Open(
                arg.parse()
                    .map_err(|_| format!("'open' needs a row number, got '{arg}'"))?,
            ),
            "delete" | "rm" => Self::Delete(selection()?),
            "send" => Self::Send(selection()?),
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("Unknown command '{other}'. Type 'help'.")),
        };
        Ok(Some(command))
    }
}

/// The interactive loop over a [`ResultTable`].
pub struct ResultsShell<'a, C, O> {
    table: ResultTable,
    connector: &'a C,
    policy: LaunchPolicy,
    forward_to: String,
    opener: O,
}

impl<'a, C: Connector, O: FileOpener> ResultsShell<'a, C, O> {
    /// Create a shell over `table`. Sending connects through `connector`.
    pub fn new(
        table: ResultTable,
        connector: &'a C,
        policy: LaunchPolicy,
        forward_to: impl Into<String>,
        opener: O,
    ) -> Self {
        Self {
            table,
            connector,
            policy,
            forward_to: forward_to.into(),
            opener,
        }
    }

    /// Current table.
    pub fn table(&self) -> &ResultTable {
        &self.table
    }

    /// Read commands from `input` until `quit` or end of input.
    ///
    /// Command failures are printed and the loop goes on.
    ///
    /// # Errors
    ///
    /// Returns an I/O error only if reading input or writing output fails.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, out: &mut W) -> Result<()> {
        write!(out, "{}", render_table(&self.table))?;
        writeln!(out, "Type 'help' for commands.")?;

        let mut line = String::new();
        loop {
            write!(out, "invoicecat> ")?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                return Ok(());
            }

            let command = match Command::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(message) => {
                    writeln!(out, "{message}")?;
                    continue;
                }
            };

            if command == Command::Quit {
                return Ok(());
            }
            self.execute(command, out)?;
        }
    }

    fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        match command {
            Command::List => write!(out, "{}", render_table(&self.table))?,
            Command::Help => write!(out, "{HELP}")?,
            Command::Quit => {}
            Command::Open(row) => match self.table.get(row) {
                Some(record) => match self.opener.open(&record.path) {
                    Ok(()) => writeln!(out, "Opened {}", record.file_name())?,
                    Err(err) => writeln!(out, "error: {err}")?,
                },
                None => writeln!(out, "No row {row}")?,
            },
            Command::Delete(selection) => match self.table.delete_selected(&selection) {
                Ok(removed) => writeln!(out, "Deleted {} file(s)", removed.len())?,
                Err(err) => writeln!(out, "error: {err}")?,
            },
            Command::Send(selection) => match self.send(&selection) {
                Ok(sent) => writeln!(out, "Sent {sent} invoice(s) to {}", self.forward_to)?,
                Err(err) => writeln!(out, "error: {err}")?,
            },
        }
        Ok(())
    }

    fn send(&self, selection: &Selection) -> Result<usize> {
        // Validate before connecting.
        selection.indexes(self.table.len())?;

        let mut session = mail::connect(self.connector, self.policy)?;
        self.table.send_selected(&mut session, selection, &self.forward_to)
    }
}

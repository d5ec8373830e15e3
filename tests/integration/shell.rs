//! The interactive results shell driven by scripted input.

use std::cell::RefCell;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use invoicecat::dispatch::{MergeRecord, ResultTable};
use invoicecat::mail::LaunchPolicy;
use invoicecat::opener::FileOpener;
use invoicecat::shell::ResultsShell;
use invoicecat::{InvoiceError, Result};

use crate::common::Fixture;

#[derive(Default)]
struct RecordingOpener {
    opened: RefCell<Vec<PathBuf>>,
}

impl FileOpener for &RecordingOpener {
    fn open(&self, path: &Path) -> Result<()> {
        self.opened.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}

struct FailingOpener;

impl FileOpener for FailingOpener {
    fn open(&self, path: &Path) -> Result<()> {
        Err(InvoiceError::OpenFailed {
            path: path.to_path_buf(),
            reason: "no handler".to_string(),
        })
    }
}

fn merged_files(fx: &Fixture, names: &[&str]) -> ResultTable {
    let rows = names
        .iter()
        .map(|name| {
            let path = fx.save_folder().join(name);
            std::fs::write(&path, b"%PDF-1.5").unwrap();
            MergeRecord::new("billing@vendor.example", path)
        })
        .collect::<Vec<_>>();
    ResultTable::new(rows)
}

fn policy() -> LaunchPolicy {
    LaunchPolicy::retry_once(Duration::ZERO)
}

#[test]
fn test_scripted_session() {
    let fx = Fixture::new();
    let connector = fx.connector();
    let opener = RecordingOpener::default();
    let table = merged_files(&fx, &["merged_a_1.pdf", "merged_b_1.pdf", "merged_c_1.pdf"]);

    let mut shell = ResultsShell::new(table, &connector, policy(), "accounts@example.com", &opener);
    let input = Cursor::new("list\nopen 2\nsend 1,3\ndelete 2\nquit\nsend all\n");
    let mut out = Vec::new();

    shell.run(input, &mut out).unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("merged_b_1.pdf"));
    assert!(out.contains("Sent 2 invoice(s) to accounts@example.com"));
    assert!(out.contains("Deleted 1 file(s)"));

    assert_eq!(
        *opener.opened.borrow(),
        vec![fx.save_folder().join("merged_b_1.pdf")]
    );
    assert_eq!(fx.state.borrow().sent.len(), 2);
    assert!(!fx.save_folder().join("merged_b_1.pdf").exists());
    assert_eq!(shell.table().len(), 2);
}

#[test]
fn test_errors_do_not_end_the_session() {
    let fx = Fixture::new();
    let connector = fx.unreachable_connector();
    let table = merged_files(&fx, &["merged_a_1.pdf"]);

    let mut shell = ResultsShell::new(table, &connector, policy(), "accounts@example.com", FailingOpener);
    let input = Cursor::new("bogus\nopen 9\nopen 1\nsend 1\ndelete 5\nlist\n");
    let mut out = Vec::new();

    shell.run(input, &mut out).unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Unknown command 'bogus'"));
    assert!(out.contains("No row 9"));
    assert!(out.contains("no handler"));
    assert!(out.contains("Could not connect"));
    assert!(out.contains("Invalid selection"));
    assert_eq!(shell.table().len(), 1);
    assert!(fx.state.borrow().sent.is_empty());
}

#[test]
fn test_end_of_input_leaves_shell() {
    let fx = Fixture::new();
    let connector = fx.connector();
    let mut shell = ResultsShell::new(
        ResultTable::default(),
        &connector,
        policy(),
        "accounts@example.com",
        FailingOpener,
    );

    let mut out = Vec::new();
    shell.run(Cursor::new(""), &mut out).unwrap();

    assert!(String::from_utf8(out).unwrap().contains("no merged invoices"));
}

use crate::error::{InvoiceError, Result};

/// A set of result-table rows chosen by the user.
///
/// Rows are numbered from 1. The text form is either `all` or a
/// comma-separated list of rows and inclusive ranges, e.g. `1,3-5`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every row.
    All,
    /// The listed rows and ranges.
    Rows(Vec<SelectionItem>),
}

/// One element of a row list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionItem {
    /// A single row.
    Single(usize),
    /// Rows `start..=end`.
    Range(usize, usize),
}

impl Selection {
    /// Parse a selection as typed in the results shell.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError::InvalidSelection`] for empty input, row 0,
    /// non-numeric rows or reversed ranges.
    pub fn parse(s: &str) -> Result<Self> {
        let input = s.trim();
        let invalid = |reason: String| InvoiceError::InvalidSelection {
            input: input.to_string(),
            reason,
        };

        if input.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }

        let mut items = Vec::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let item = match part.split_once('-') {
                Some((start, end)) => {
                    let start = parse_row(start).map_err(&invalid)?;
                    let end = parse_row(end).map_err(&invalid)?;
                    if start > end {
                        return Err(invalid(format!(
                            "range {start}-{end} ends before it starts"
                        )));
                    }
                    SelectionItem::Range(start, end)
                }
                None => SelectionItem::Single(parse_row(part).map_err(&invalid)?),
            };
            items.push(item);
        }

        if items.is_empty() {
            return Err(invalid("no rows given".to_string()));
        }

        Ok(Self::Rows(items))
    }

    /// Whether 1-based `row` is selected.
    pub fn contains(&self, row: usize) -> bool {
        match self {
            Self::All => true,
            Self::Rows(items) => items.iter().any(|item| match *item {
                SelectionItem::Single(r) => r == row,
                SelectionItem::Range(start, end) => (start..=end).contains(&row),
            }),
        }
    }

    /// Zero-based indexes of the selected rows of a table with `len` rows,
    /// ascending and without duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError::InvalidSelection`] if a row is past the end.
    pub fn indexes(&self, len: usize) -> Result<Vec<usize>> {
        if let Self::Rows(items) = self {
            let highest = items
                .iter()
                .map(|item| match *item {
                    SelectionItem::Single(r) => r,
                    SelectionItem::Range(_, end) => end,
                })
                .max()
                .unwrap_or_default();

            if highest > len {
                return Err(InvoiceError::InvalidSelection {
                    input: highest.to_string(),
                    reason: format!("only {len} rows"),
                });
            }
        }

        Ok((1..=len).filter(|row| self.contains(*row)).map(|row| row - 1).collect())
    }
}

fn parse_row(text: &str) -> std::result::Result<usize, String> {
    let text = text.trim();
    match text.parse::<usize>() {
        Ok(0) => Err("rows are numbered from 1".to_string()),
        Ok(row) => Ok(row),
        Err(_) => Err(format!("'{text}' is not a row number")),
    }
}

// 📄 Tabular input boundary - Sheet and Workbook handles
//
// The engine never touches file paths or storage. Callers (CLI, tests, the
// upload layer) open whatever backing store they have and hand the core a
// Workbook: named sheets of string cells. Real exports routinely carry title
// and preamble rows above the data header, so a raw Sheet keeps every row and
// adapters promote the actual header row via token search.

use std::io;

use crate::error::Result;

// ============================================================================
// SHEET
// ============================================================================

/// One named grid of cells. Until `with_header` runs, all rows are data and
/// the header list is empty.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Build a raw sheet: every row is kept, no header is assumed yet.
    pub fn from_rows(name: &str, rows: Vec<Vec<String>>) -> Self {
        Sheet {
            name: name.to_string(),
            headers: Vec::new(),
            rows,
        }
    }

    /// Build a sheet whose header row is already known (mostly for tests).
    pub fn with_columns(name: &str, headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        Sheet {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.trim().to_string()).collect(),
            rows,
        }
    }

    /// Read a raw sheet from an open CSV handle. `has_headers` is off so a
    /// preamble above the real header survives into the grid.
    pub fn from_csv_reader<R: io::Read>(name: &str, reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }

        Ok(Sheet::from_rows(name, rows))
    }

    /// Locate the data header row and return a normalized sheet.
    ///
    /// Scans for the first row containing any of the given tokens
    /// (case-insensitive substring match). When no token is found, row 0 is
    /// assumed to be the header.
    pub fn with_header(&self, tokens: &[&str]) -> Sheet {
        if !self.headers.is_empty() {
            return self.clone();
        }
        if self.rows.is_empty() {
            return Sheet {
                name: self.name.clone(),
                headers: Vec::new(),
                rows: Vec::new(),
            };
        }

        let header_idx = self
            .rows
            .iter()
            .position(|row| {
                row.iter().any(|cell| {
                    let cell = cell.trim().to_lowercase();
                    tokens.iter().any(|token| cell.contains(&token.to_lowercase()))
                })
            })
            .unwrap_or(0);

        Sheet {
            name: self.name.clone(),
            headers: self.rows[header_idx]
                .iter()
                .map(|h| h.trim().to_string())
                .collect(),
            rows: self.rows[header_idx + 1..].to_vec(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by label (trimmed, case-insensitive).
    pub fn column_index(&self, label: &str) -> Option<usize> {
        let wanted = label.trim();
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(wanted))
    }

    /// Iterate data rows as cell views.
    pub fn data_rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(move |cells| RowView { sheet: self, cells })
    }
}

/// Borrowed view of one data row with by-column-name access.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    sheet: &'a Sheet,
    cells: &'a [String],
}

impl<'a> RowView<'a> {
    /// Cell under a named column, or None when the column is unmapped or the
    /// row is short.
    pub fn get(&self, label: &str) -> Option<&'a str> {
        let idx = self.sheet.column_index(label)?;
        self.cells.get(idx).map(|s| s.as_str())
    }

    /// Cell under a named column, trimmed, defaulting to "".
    pub fn text(&self, label: &str) -> &'a str {
        self.get(label).map(str::trim).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|cell| cell.trim().is_empty())
    }
}

// ============================================================================
// WORKBOOK
// ============================================================================

/// An already-opened tabular data source: a list of named sheets.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Workbook { sheets: Vec::new() }
    }

    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Workbook { sheets }
    }

    /// Wrap a single sheet (the common counterparty shape).
    pub fn single(sheet: Sheet) -> Self {
        Workbook {
            sheets: vec![sheet],
        }
    }

    pub fn push(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    /// Look up a sheet by name, case-insensitive.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn first_sheet(&self) -> Option<&Sheet> {
        self.sheets.first()
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

//! In-memory tables parsed from CSV uploads.
//!
//! A [`Table`] keeps every cell as `Option<String>`, where `None` is the
//! canonical missing marker. Parsing already maps the usual NA spellings to
//! `None`; [`Table::normalize`] additionally folds whitespace-only cells into it.
//! Only after classification is a table turned into a [`DisplayTable`], where the
//! missing marker becomes [`MISSING_SENTINEL`].

use std::collections::HashMap;
use std::io::Read;

use crate::catalog::MISSING_SENTINEL;
use crate::error::InsightsError;

pub type Cell = Option<String>;

/// Cell spellings that mean "no value" at parse time.
pub const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, InsightsError> {
        if let Some((position, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(InsightsError::SchemaMismatch {
                message: format!(
                    "Row {} has {} cells but the table has {} columns",
                    position + 1,
                    row.len(),
                    headers.len()
                ),
            });
        }

        Ok(Self { headers, rows })
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, InsightsError> {
        Self::from_csv_reader(bytes)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, InsightsError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let raw_headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let headers = dedupe_headers(raw_headers);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(parse_cell).collect());
        }

        Self::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn rows_count(&self) -> usize {
        self.rows.len()
    }

    pub fn columns_count(&self) -> usize {
        self.headers.len()
    }

    pub fn column(&self, index: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows.iter().map(move |row| row[index].as_deref())
    }

    /// Folds whitespace-only cells into the missing marker.
    pub fn normalize(mut self) -> Self {
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                if cell.as_deref().is_some_and(|value| value.trim().is_empty()) {
                    *cell = None;
                }
            }
        }
        self
    }

    /// Replaces missing cells with [`MISSING_SENTINEL`]. Must run after classification.
    pub fn into_display(self) -> DisplayTable {
        let rows = self
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(DisplayCell::from).collect())
            .collect();

        DisplayTable {
            headers: self.headers,
            rows,
        }
    }
}

/// Rendered cell text. Missingness is tracked separately from the text, so a
/// source value that happens to read `no_value` is still a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayCell {
    pub value: String,
    pub is_missing: bool,
}

impl From<Cell> for DisplayCell {
    fn from(cell: Cell) -> Self {
        match cell {
            Some(value) => Self {
                value,
                is_missing: false,
            },
            None => Self {
                value: MISSING_SENTINEL.to_string(),
                is_missing: true,
            },
        }
    }
}

/// A table whose missing cells were substituted with the display sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayTable {
    headers: Vec<String>,
    rows: Vec<Vec<DisplayCell>>,
}

impl DisplayTable {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<DisplayCell>] {
        &self.rows
    }

    pub fn rows_count(&self) -> usize {
        self.rows.len()
    }
}

fn parse_cell(raw: &str) -> Cell {
    if NA_MARKERS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

// Blank headers become "Unnamed: {position}"; repeats get ".1", ".2", ... suffixes.
fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::with_capacity(raw.len());

    for (position, header) in raw.into_iter().enumerate() {
        let mut name = if header.trim().is_empty() {
            format!("Unnamed: {}", position)
        } else {
            header
        };

        let mut seen = counts.get(&name).copied().unwrap_or(0);
        while seen > 0 {
            counts.insert(name.clone(), seen + 1);
            name = format!("{}.{}", name, seen);
            seen = counts.get(&name).copied().unwrap_or(0);
        }
        counts.insert(name.clone(), 1);
        headers.push(name);
    }

    headers
}

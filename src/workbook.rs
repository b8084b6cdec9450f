//! Spreadsheet loading.
//!
//! A workbook is read once into memory: every sheet becomes a [`Table`] whose
//! columns are named by the configured header row. Later stages only read
//! from it, so a loaded [`Workbook`] can be shared freely between threads.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::TimeDelta;
use log::debug;

use crate::{
    data::Value,
    error::{DocError, DocResult},
};

pub type Row = Vec<Option<Value>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Position of the first column named exactly `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone)]
pub struct Workbook {
    tables: Vec<Table>,
}

impl Workbook {
    pub fn from_tables(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    /// Reads every sheet of `path`, taking column names from the zero-based
    /// sheet row `header_row`. Rows above the header are ignored.
    pub fn load(path: &Path, header_row: usize) -> DocResult<Self> {
        if !path.exists() {
            return Err(DocError::MissingInput(format!(
                "spreadsheet {path:?} does not exist"
            )));
        }
        let mut workbook = open_workbook_auto(path).map_err(|err| {
            DocError::MalformedSource(format!("cannot open spreadsheet {path:?}: {err}"))
        })?;
        let names = workbook.sheet_names().to_owned();
        if names.is_empty() {
            return Err(DocError::MalformedSource(format!(
                "spreadsheet {path:?} contains no sheets"
            )));
        }

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let range = workbook.worksheet_range(&name).map_err(|err| {
                DocError::MalformedSource(format!("cannot read sheet '{name}': {err}"))
            })?;
            let table = table_from_range(&name, &range, header_row);
            debug!(
                "Loaded sheet '{}' with {} column(s) and {} row(s)",
                table.name,
                table.headers.len(),
                table.rows.len()
            );
            tables.push(table);
        }

        if tables.iter().all(|table| table.headers.is_empty()) {
            return Err(DocError::MalformedSource(format!(
                "spreadsheet {path:?} is empty"
            )));
        }

        Ok(Self { tables })
    }

    /// Sheet names in workbook order; each one is a selectable subject.
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|table| table.name.as_str())
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, subject: &str) -> DocResult<&Table> {
        self.tables
            .iter()
            .find(|table| table.name == subject)
            .ok_or_else(|| {
                let available = self.subjects().collect::<Vec<_>>().join(", ");
                DocError::MalformedSource(format!(
                    "subject '{subject}' not found; available sheets: {available}"
                ))
            })
    }
}

fn table_from_range(name: &str, range: &Range<Data>, header_row: usize) -> Table {
    let Some((start_row, start_col)) = range.start() else {
        return Table::new(name, Vec::new(), Vec::new());
    };
    let start_row = start_row as usize;
    let start_col = start_col as usize;

    let header_cells = header_row
        .checked_sub(start_row)
        .and_then(|offset| range.rows().nth(offset));
    let headers = (0..range.width())
        .map(|idx| {
            let label = header_cells
                .and_then(|cells| cells.get(idx))
                .and_then(cell_value)
                .map(|value| value.as_display())
                .unwrap_or_default();
            if label.is_empty() {
                format!("Unnamed: {}", start_col + idx)
            } else {
                label
            }
        })
        .collect::<Vec<_>>();

    let skip = (header_row + 1).saturating_sub(start_row);
    let rows = range
        .rows()
        .skip(skip)
        .map(|cells| cells.iter().map(cell_value).collect::<Row>())
        .collect();

    Table::new(name, headers, rows)
}

pub(crate) fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(Value::String(s.clone())),
        Data::Int(i) => Some(Value::Integer(*i)),
        Data::Float(f) => Some(Value::Float(*f)),
        Data::Bool(b) => Some(Value::Boolean(*b)),
        Data::DateTime(dt) if dt.is_duration() => Some(
            dt.as_duration()
                .map(|elapsed| Value::String(format_duration(elapsed)))
                .unwrap_or(Value::Float(dt.as_f64())),
        ),
        Data::DateTime(dt) => Some(
            dt.as_datetime()
                .map(Value::DateTime)
                .unwrap_or(Value::Float(dt.as_f64())),
        ),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Value::String(s.clone())),
        Data::Error(err) => Some(Value::String(err.to_string())),
    }
}

/// `H:MM:SS`, the way spreadsheets show elapsed-time cells.
fn format_duration(elapsed: TimeDelta) -> String {
    let seconds = elapsed.num_seconds();
    let sign = if seconds < 0 { "-" } else { "" };
    let seconds = seconds.unsigned_abs();
    format!(
        "{sign}{}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

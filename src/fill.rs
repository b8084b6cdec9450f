//! Writing filtered rows into a template table.
//!
//! Target columns are matched to source columns by case-insensitive header
//! name. Cells under a header with no matching source column are never
//! touched.

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::{display_cell, labels_match},
    error::{DocError, DocResult},
    filter::FilteredRows,
};

/// A table that can be filled: a header row followed by body rows that may
/// be appended on demand. Row 0 is the header row.
pub trait TargetTable {
    fn header_labels(&self) -> Vec<String>;
    fn row_count(&self) -> usize;
    fn cell_count(&self, row: usize) -> usize;
    fn append_empty_row(&mut self);
    /// Removes every row after the header.
    fn clear_body(&mut self);
    fn set_cell_text(&mut self, row: usize, cell: usize, text: &str);
}

/// How a fill treats body rows already present in the target table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum FillMode {
    /// Write from the first body row, appending rows only when needed.
    #[default]
    Reuse,
    /// Drop existing body rows, then write.
    Replace,
    /// Start after the last existing row.
    Append,
}

/// Target header position to source column index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    headers: Vec<String>,
    sources: Vec<Option<usize>>,
}

impl ColumnMapping {
    pub fn build(headers: &[String], source_columns: &[String]) -> Self {
        let sources = headers
            .iter()
            .map(|header| {
                source_columns
                    .iter()
                    .position(|column| labels_match(column, header))
            })
            .collect();
        Self {
            headers: headers.to_vec(),
            sources,
        }
    }

    /// Source column for the target cell at `position`.
    pub fn source_at(&self, position: usize) -> Option<usize> {
        self.sources.get(position).copied().flatten()
    }

    pub fn mapped_count(&self) -> usize {
        self.sources.iter().filter(|source| source.is_some()).count()
    }

    pub fn unmapped_headers(&self) -> impl Iterator<Item = &str> {
        self.headers
            .iter()
            .zip(&self.sources)
            .filter(|(_, source)| source.is_none())
            .map(|(header, _)| header.as_str())
    }
}

/// Writes `source` into `table`, one body row per source row.
///
/// Returns the number of rows written.
pub fn fill<T: TargetTable + ?Sized>(
    table: &mut T,
    source: &FilteredRows<'_>,
    mode: FillMode,
) -> DocResult<usize> {
    if table.row_count() == 0 {
        return Err(DocError::InvalidTemplate(
            "target table has no header row".to_string(),
        ));
    }
    let headers = table.header_labels();
    let mapping = ColumnMapping::build(&headers, source.columns);
    debug!(
        "Mapped {} of {} header(s); unmapped: {:?}",
        mapping.mapped_count(),
        headers.len(),
        mapping.unmapped_headers().collect::<Vec<_>>()
    );

    let first_body_row = match mode {
        FillMode::Reuse => 1,
        FillMode::Replace => {
            table.clear_body();
            1
        }
        FillMode::Append => table.row_count(),
    };

    for (offset, row) in source.rows.iter().enumerate() {
        let target_row = first_body_row + offset;
        while table.row_count() <= target_row {
            table.append_empty_row();
        }
        let cells = table.cell_count(target_row).min(headers.len());
        for cell in 0..cells {
            if let Some(column) = mapping.source_at(cell) {
                let text = display_cell(row.get(column).and_then(|value| value.as_ref()));
                table.set_cell_text(target_row, cell, &text);
            }
        }
    }
    Ok(source.rows.len())
}

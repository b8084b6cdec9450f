use log::debug;

use crate::{
    config::ColumnNames,
    data::display_cell,
    error::{DocError, DocResult},
    params::ParameterSet,
    workbook::{Row, Table},
};

/// Rows of one table that matched a parameter set, in source order.
#[derive(Debug, Clone)]
pub struct FilteredRows<'a> {
    pub columns: &'a [String],
    pub rows: Vec<&'a Row>,
}

impl FilteredRows<'_> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct RequiredColumns {
    cycle: usize,
    grade: usize,
    bimester: usize,
    lesson: usize,
}

impl RequiredColumns {
    fn resolve(table: &Table, names: &ColumnNames) -> DocResult<Self> {
        let lookup = |name: &str| {
            table.column_index(name).ok_or_else(|| {
                DocError::MalformedSource(format!(
                    "sheet '{}' has no column '{name}' (columns: {})",
                    table.name,
                    table.headers.join(", ")
                ))
            })
        };
        Ok(Self {
            cycle: lookup(&names.cycle)?,
            grade: lookup(&names.grade)?,
            bimester: lookup(&names.bimester)?,
            lesson: lookup(&names.lesson)?,
        })
    }
}

/// Selects the rows whose cycle, grade and bimester equal the parameters and
/// whose lesson number falls in `[lesson, lesson + count)`.
///
/// Label columns are compared by their canonical text. Rows whose lesson
/// cell is not numeric never match.
pub fn filter<'a>(
    table: &'a Table,
    params: &ParameterSet,
    names: &ColumnNames,
) -> DocResult<FilteredRows<'a>> {
    let required = RequiredColumns::resolve(table, names)?;
    let lessons = params.lesson_range();

    let mut skipped = 0usize;
    let rows = table
        .rows
        .iter()
        .filter(|row| {
            let Some(lesson) = row
                .get(required.lesson)
                .and_then(|cell| cell.as_ref())
                .and_then(|value| value.as_lesson_number())
            else {
                skipped += 1;
                return false;
            };
            lessons.contains(&lesson)
                && text_at(row, required.cycle) == params.cycle
                && text_at(row, required.grade) == params.grade
                && text_at(row, required.bimester) == params.bimester
        })
        .collect::<Vec<_>>();

    debug!(
        "Sheet '{}': {} of {} row(s) matched ({} without a lesson number)",
        table.name,
        rows.len(),
        table.rows.len(),
        skipped
    );
    Ok(FilteredRows {
        columns: &table.headers,
        rows,
    })
}

fn text_at(row: &Row, idx: usize) -> String {
    display_cell(row.get(idx).and_then(|cell| cell.as_ref()))
}

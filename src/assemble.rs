//! Document assembly: one parameter set per template table.
//!
//! The first parameter set fills the first table, the second set the second
//! table, and so on. Assembly works on a copy of the template and either
//! returns a fully filled document or an error; it never touches the
//! filesystem.

use std::sync::LazyLock;

use log::{debug, info, warn};
use regex::Regex;

use crate::{
    config::ColumnNames,
    docx::TemplateDocument,
    error::{DocError, DocResult},
    fill::{FillMode, fill},
    filter::filter,
    params::ParameterSet,
    workbook::Workbook,
};

static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).expect("valid file name pattern"));

#[derive(Debug, Clone, Default)]
pub struct AssemblyOptions {
    pub mode: FillMode,
    pub columns: ColumnNames,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: usize,
    pub subject: String,
    pub rows_written: usize,
}

#[derive(Debug, Clone)]
pub struct Assembly {
    pub document: TemplateDocument,
    pub report: Vec<TableReport>,
}

impl Assembly {
    pub fn rows_written(&self) -> usize {
        self.report.iter().map(|entry| entry.rows_written).sum()
    }
}

pub fn assemble(
    template: &TemplateDocument,
    workbook: &Workbook,
    params: &[ParameterSet],
    options: &AssemblyOptions,
) -> DocResult<Assembly> {
    if params.is_empty() {
        return Err(DocError::MissingInput(
            "at least one parameter set is required".to_string(),
        ));
    }

    let mut document = template.clone();
    let report = {
        let mut tables = document.tables_mut();
        if tables.is_empty() {
            return Err(DocError::assembly(
                0,
                DocError::InvalidTemplate("template contains no tables".to_string()),
            ));
        }
        if params.len() > tables.len() {
            warn!(
                "{} parameter set(s) supplied but the template has {} table(s); ignoring the rest",
                params.len(),
                tables.len()
            );
        }

        let mut report = Vec::with_capacity(params.len().min(tables.len()));
        for (idx, (table, set)) in tables.iter_mut().zip(params).enumerate() {
            debug!("Filling table {} with {}", idx + 1, set);
            let rows_written = workbook
                .table(&set.subject)
                .and_then(|source| filter(source, set, &options.columns))
                .and_then(|matched| fill(table, &matched, options.mode))
                .map_err(|err| DocError::assembly(idx, err))?;
            info!(
                "Table {}: wrote {} row(s) for '{}'",
                idx + 1,
                rows_written,
                set.subject
            );
            report.push(TableReport {
                table: idx,
                subject: set.subject.clone(),
                rows_written,
            });
        }
        report
    };

    Ok(Assembly { document, report })
}

/// `Plano_Aula_{subject}_{bimester}_{grade}_{lesson}.docx`, with characters
/// that are not allowed in file names replaced by `-`.
pub fn default_output_name(params: &ParameterSet) -> String {
    let stem = format!(
        "Plano_Aula_{}_{}_{}_{}",
        params.subject, params.bimester, params.grade, params.lesson
    );
    format!("{}.docx", UNSAFE_FILE_CHARS.replace_all(&stem, "-"))
}

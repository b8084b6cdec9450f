use anyhow::{Context, Result, anyhow};
use log::info;

use crate::{
    cli::PreviewArgs,
    config::Settings,
    data::{display_cell, labels_match},
    filter::filter,
    params::ParameterSet,
    table::TextTable,
    workbook::Workbook,
};

pub fn execute(args: &PreviewArgs, settings: &Settings) -> Result<()> {
    let set = ParameterSet::validate(&args.filter.to_raw())?;
    let workbook = Workbook::load(&args.workbook, settings.header_row)
        .with_context(|| format!("Loading spreadsheet {:?}", args.workbook))?;
    let source = workbook.table(&set.subject)?;
    let matched = filter(source, &set, &settings.columns)?;

    let selected = select_columns(matched.columns, &args.columns)?;
    let headers = selected
        .iter()
        .map(|&idx| matched.columns[idx].as_str())
        .collect::<Vec<_>>();
    let mut listing = TextTable::new(&headers);
    let limit = args.limit.unwrap_or(usize::MAX);
    for row in matched.rows.iter().take(limit) {
        listing.push_row(
            selected
                .iter()
                .map(|&idx| display_cell(row.get(idx).and_then(|cell| cell.as_ref()))),
        );
    }
    listing.print();
    info!(
        "Displayed {} of {} matching row(s) for {}",
        listing.len(),
        matched.len(),
        set
    );
    Ok(())
}

/// Resolves requested column names case-insensitively; no request means all
/// columns in sheet order.
fn select_columns(available: &[String], requested: &[String]) -> Result<Vec<usize>> {
    let requested = requested
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>();
    if requested.is_empty() {
        return Ok((0..available.len()).collect());
    }
    requested
        .into_iter()
        .map(|name| {
            available
                .iter()
                .position(|column| labels_match(column, name))
                .ok_or_else(|| {
                    anyhow!(
                        "Column '{name}' not found (columns: {})",
                        available.join(", ")
                    )
                })
        })
        .collect()
}

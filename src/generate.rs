use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    JOBS,
    assemble::{AssemblyOptions, assemble, default_output_name},
    cli::GenerateArgs,
    config::Settings,
    docx::TemplateDocument,
    error::DocError,
    license::{self, LicenseGate},
    params::{self, ParameterSet},
    workbook::Workbook,
};

pub fn execute(args: &GenerateArgs, settings: &Settings, gate: &LicenseGate) -> Result<()> {
    let sets = collect_parameter_sets(args)?;
    let (workbook_path, template_path) = required_paths(args)?;

    let granted = gate
        .authorize(args.license_code.as_deref(), license::local_now())
        .context("Checking license")?;
    debug!(
        "License {} valid until {}",
        granted.code,
        granted.expiration.format("%Y-%m-%d %H:%M")
    );

    let template = TemplateDocument::open(&template_path)
        .with_context(|| format!("Opening template {template_path:?}"))?;

    info!("Loading spreadsheet {:?}", workbook_path);
    let header_row = settings.header_row;
    let workbook = JOBS.run("Loading spreadsheet", move || {
        Workbook::load(&workbook_path, header_row)
            .with_context(|| format!("Loading spreadsheet {workbook_path:?}"))
    })?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_output_name(&sets[0])));
    let options = AssemblyOptions {
        mode: args.mode,
        columns: settings.columns.clone(),
    };
    let assembly = JOBS.run("Filling template", move || {
        assemble(&template, &workbook, &sets, &options).map_err(anyhow::Error::from)
    })?;

    assembly
        .document
        .save(&output)
        .with_context(|| format!("Writing document {output:?}"))?;
    info!(
        "Wrote {} row(s) across {} table(s) to {:?}",
        assembly.rows_written(),
        assembly.report.len(),
        output
    );
    println!("{}", output.display());
    Ok(())
}

/// Validates the primary set from the command line, then any sets from the
/// parameter file. Runs before the spreadsheet or template is touched.
fn collect_parameter_sets(args: &GenerateArgs) -> Result<Vec<ParameterSet>> {
    let primary = ParameterSet::validate(&args.filter.to_raw())?;
    let mut sets = vec![primary];
    if let Some(path) = &args.extra_params {
        let extra = params::load_parameter_file(path)
            .with_context(|| format!("Reading extra parameters from {path:?}"))?;
        let extra = params::validate_all(&extra)
            .with_context(|| format!("Validating extra parameters from {path:?}"))?;
        debug!("{} extra parameter set(s) from {:?}", extra.len(), path);
        sets.extend(extra);
    }
    Ok(sets)
}

fn required_paths(args: &GenerateArgs) -> Result<(PathBuf, PathBuf)> {
    let workbook = args
        .workbook
        .clone()
        .ok_or_else(|| DocError::MissingInput("select a spreadsheet with --workbook".into()))?;
    let template = args
        .template
        .clone()
        .ok_or_else(|| DocError::MissingInput("select a template with --template".into()))?;
    Ok((workbook, template))
}

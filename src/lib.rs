pub mod assemble;
pub mod background;
pub mod cli;
pub mod config;
pub mod data;
pub mod docx;
pub mod error;
pub mod fill;
pub mod filter;
pub mod generate;
pub mod license;
pub mod params;
pub mod preview;
pub mod table;
pub mod workbook;
pub mod xml;

use std::{
    env,
    sync::{LazyLock, OnceLock},
};

use anyhow::{Context, Result};
use clap::Parser;
use itertools::Itertools;
use log::{LevelFilter, info};

use crate::{
    background::JobRunner,
    cli::{Cli, Commands, LicenseAction},
    config::Settings,
    docx::TemplateDocument,
    license::{LicenseGate, LicenseStatus},
    table::TextTable,
    workbook::Workbook,
};

static LOGGER: OnceLock<()> = OnceLock::new();

/// Shared by every command so only one long job runs at a time.
pub(crate) static JOBS: LazyLock<JobRunner> = LazyLock::new(JobRunner::default);

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("lesson_docs", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let settings = Settings::load_or_default(cli.config.as_deref())
        .context("Loading settings")?;
    let gate = LicenseGate::new(&cli.license_file, settings.license_days);
    match cli.command {
        Commands::Generate(args) => generate::execute(&args, &settings, &gate),
        Commands::Subjects(args) => handle_subjects(&args, &settings),
        Commands::Tables(args) => handle_tables(&args),
        Commands::Preview(args) => preview::execute(&args, &settings),
        Commands::License(args) => handle_license(&args.action, &gate),
    }
}

fn handle_subjects(args: &cli::SubjectsArgs, settings: &Settings) -> Result<()> {
    let workbook = Workbook::load(&args.workbook, settings.header_row)
        .with_context(|| format!("Loading spreadsheet {:?}", args.workbook))?;
    let mut listing = TextTable::new(&["Subject", "Rows", "Columns"]);
    for table in workbook.tables() {
        listing.push_row([
            table.name.clone(),
            table.row_count().to_string(),
            table.headers.len().to_string(),
        ]);
    }
    listing.print();
    info!(
        "{} subject(s) in {:?}",
        workbook.tables().len(),
        args.workbook
    );
    Ok(())
}

fn handle_tables(args: &cli::TablesArgs) -> Result<()> {
    let template = TemplateDocument::open(&args.template)
        .with_context(|| format!("Opening template {:?}", args.template))?;
    let mut listing = TextTable::new(&["#", "Body rows", "Headers"]);
    for (idx, summary) in template.summaries().iter().enumerate() {
        listing.push_row([
            idx.to_string(),
            summary.body_rows.to_string(),
            summary.headers.iter().join(" | "),
        ]);
    }
    listing.print();
    info!("{} table(s) in {:?}", template.table_count(), args.template);
    Ok(())
}

fn handle_license(action: &LicenseAction, gate: &LicenseGate) -> Result<()> {
    let now = license::local_now();
    match action {
        LicenseAction::Status => match gate.stored()? {
            Some(stored) => {
                let state = match stored.check(&stored.code, now) {
                    LicenseStatus::Expired => "expired",
                    _ => "valid",
                };
                println!(
                    "License {} {} until {}",
                    stored.code,
                    state,
                    stored.expiration.format("%Y-%m-%d %H:%M")
                );
            }
            None => println!("No license stored at {}", gate.path().display()),
        },
        LicenseAction::Activate { code } => {
            let code = code.trim();
            anyhow::ensure!(!code.is_empty(), "License code must not be empty");
            let stored = gate
                .activate(code, now)
                .with_context(|| format!("Writing license to {:?}", gate.path()))?;
            println!(
                "License {} valid until {}",
                stored.code,
                stored.expiration.format("%Y-%m-%d %H:%M")
            );
        }
    }
    Ok(())
}

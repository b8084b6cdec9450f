use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{fill::FillMode, params::RawParameters};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Fill lesson-plan document templates from a spreadsheet",
    long_about = None
)]
pub struct Cli {
    /// Settings file (YAML, or JSON when the name ends in .json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Location of the local license record
    #[arg(long = "license-file", global = true, default_value = "license.json")]
    pub license_file: PathBuf,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fill the template tables with matching spreadsheet rows and save the document
    Generate(GenerateArgs),
    /// List the subjects (sheets) available in a spreadsheet
    Subjects(SubjectsArgs),
    /// List the tables of a template document and their headers
    Tables(TablesArgs),
    /// Show the rows a parameter set selects, without writing a document
    Preview(PreviewArgs),
    /// Inspect or activate the local license
    License(LicenseArgs),
}

/// The six filter fields shared by `generate` and `preview`.
#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// Subject; selects the spreadsheet sheet
    #[arg(short = 's', long)]
    pub subject: Option<String>,
    /// Bimester label, e.g. `1°`
    #[arg(short = 'b', long)]
    pub bimester: Option<String>,
    /// Grade label, e.g. `3° ano` or `1ª série`
    #[arg(short = 'g', long)]
    pub grade: Option<String>,
    /// Cycle label, e.g. `Anos Iniciais`
    #[arg(short = 'c', long)]
    pub cycle: Option<String>,
    /// First lesson number to include
    #[arg(short = 'l', long)]
    pub lesson: Option<String>,
    /// Number of consecutive lessons to include
    #[arg(short = 'n', long)]
    pub count: Option<String>,
}

impl FilterArgs {
    pub fn to_raw(&self) -> RawParameters {
        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        RawParameters {
            subject: field(&self.subject),
            bimester: field(&self.bimester),
            grade: field(&self.grade),
            cycle: field(&self.cycle),
            lesson: field(&self.lesson),
            count: field(&self.count),
        }
    }
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Spreadsheet with one sheet per subject
    #[arg(short = 'w', long = "workbook")]
    pub workbook: Option<PathBuf>,
    /// Template document (.docx)
    #[arg(short = 't', long = "template")]
    pub template: Option<PathBuf>,
    /// Destination document (defaults to Plano_Aula_<subject>_<bimester>_<grade>_<lesson>.docx)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub filter: FilterArgs,
    /// YAML or JSON list of parameter sets for the second and later tables
    #[arg(long = "extra-params")]
    pub extra_params: Option<PathBuf>,
    /// How existing body rows in the template are treated
    #[arg(long, value_enum, default_value = "reuse")]
    pub mode: FillMode,
    /// License code; replaces the stored license when it does not match
    #[arg(long = "license-code")]
    pub license_code: Option<String>,
}

#[derive(Debug, Args)]
pub struct SubjectsArgs {
    /// Spreadsheet to inspect
    #[arg(short = 'w', long = "workbook")]
    pub workbook: PathBuf,
}

#[derive(Debug, Args)]
pub struct TablesArgs {
    /// Template document (.docx)
    #[arg(short = 't', long = "template")]
    pub template: PathBuf,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Spreadsheet with one sheet per subject
    #[arg(short = 'w', long = "workbook")]
    pub workbook: PathBuf,
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Restrict output to these comma-separated columns
    #[arg(short = 'C', long = "columns", value_delimiter = ',')]
    pub columns: Vec<String>,
    /// Maximum number of rows to display
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct LicenseArgs {
    #[command(subcommand)]
    pub action: LicenseAction,
}

#[derive(Debug, Subcommand)]
pub enum LicenseAction {
    /// Show whether the stored license is valid
    Status,
    /// Store a new license code, valid for the configured number of days
    Activate {
        /// License code to store
        #[arg(long)]
        code: String,
    },
}

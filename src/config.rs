//! Optional settings file.
//!
//! Every field has a default, so the tool runs without a settings file. When
//! `--config` is given, the file is parsed as JSON if it ends in `.json` and
//! as YAML otherwise.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

pub const MAX_LICENSE_DAYS: i64 = 36_500;

/// Names of the spreadsheet columns the filter engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub cycle: String,
    pub grade: String,
    pub bimester: String,
    pub lesson: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            cycle: "Ciclo".to_string(),
            grade: "Ano/Série".to_string(),
            bimester: "Bimestre".to_string(),
            lesson: "Aula".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub columns: ColumnNames,
    /// Zero-based sheet row holding the column headers.
    pub header_row: usize,
    pub license_days: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            header_row: 1,
            license_days: 30,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening settings file {path:?}"))?;
        let reader = BufReader::new(file);
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let settings: Settings = if is_json {
            serde_json::from_reader(reader).context("Parsing settings JSON")?
        } else {
            serde_yaml::from_reader(reader).context("Parsing settings YAML")?
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        for (field, name) in [
            ("cycle", &self.columns.cycle),
            ("grade", &self.columns.grade),
            ("bimester", &self.columns.bimester),
            ("lesson", &self.columns.lesson),
        ] {
            ensure!(
                !name.trim().is_empty(),
                "Column name for '{field}' cannot be empty"
            );
        }
        ensure!(
            (1..=MAX_LICENSE_DAYS).contains(&self.license_days),
            "license_days must be between 1 and {MAX_LICENSE_DAYS}, got {}",
            self.license_days
        );
        Ok(())
    }
}

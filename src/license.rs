//! Local license-code gate.
//!
//! The license is a plaintext JSON record `{code, expiration}` kept next to
//! the user's files. It only checks that a code was entered within the
//! validity window; anyone who can edit the file can extend it. It is not a
//! security control.

use std::{fs::File, io::BufReader, path::{Path, PathBuf}};

use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDateTime, TimeDelta};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::DocError;

pub const EXPIRATION_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    #[serde(alias = "codigo")]
    pub code: String,
    #[serde(alias = "data_expiracao", with = "expiration_format")]
    pub expiration: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseStatus {
    Valid,
    InvalidCode,
    Expired,
}

impl License {
    pub fn issue(code: &str, now: NaiveDateTime, days: i64) -> Result<Self> {
        let expiration = TimeDelta::try_days(days)
            .and_then(|validity| now.checked_add_signed(validity))
            .ok_or_else(|| anyhow!("License validity of {days} day(s) is out of range"))?;
        Ok(Self {
            code: code.to_string(),
            expiration,
        })
    }

    pub fn check(&self, entered: &str, now: NaiveDateTime) -> LicenseStatus {
        if entered != self.code {
            LicenseStatus::InvalidCode
        } else if now > self.expiration {
            LicenseStatus::Expired
        } else {
            LicenseStatus::Valid
        }
    }

    /// Reads the stored record. A missing or unreadable file yields `None`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(path).with_context(|| format!("Opening license file {path:?}"))?;
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(license) => Ok(Some(license)),
            Err(err) => {
                warn!("Ignoring unreadable license file {path:?}: {err}");
                Ok(None)
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Creating license file {path:?}"))?;
        serde_json::to_writer(file, self).context("Writing license JSON")
    }
}

#[derive(Debug, Clone)]
pub struct LicenseGate {
    path: PathBuf,
    validity_days: i64,
}

impl LicenseGate {
    pub fn new(path: impl Into<PathBuf>, validity_days: i64) -> Self {
        Self {
            path: path.into(),
            validity_days,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stored(&self) -> Result<Option<License>> {
        License::load(&self.path)
    }

    /// Grants access for `entered`, or for the stored code when nothing was
    /// entered. An entered code that does not match a live record replaces
    /// it with a fresh one.
    pub fn authorize(&self, entered: Option<&str>, now: NaiveDateTime) -> Result<License> {
        let stored = self.stored()?;
        match entered.map(str::trim).filter(|code| !code.is_empty()) {
            Some(code) => {
                if let Some(license) = stored
                    .filter(|license| license.check(code, now) == LicenseStatus::Valid)
                {
                    return Ok(license);
                }
                self.activate(code, now)
            }
            None => match stored {
                Some(license) if license.check(&license.code, now) == LicenseStatus::Valid => {
                    Ok(license)
                }
                Some(_) => Err(DocError::MissingInput(
                    "license expired; run `lesson-docs license activate --code <code>`"
                        .to_string(),
                )
                .into()),
                None => Err(DocError::MissingInput(
                    "no license found; run `lesson-docs license activate --code <code>`"
                        .to_string(),
                )
                .into()),
            },
        }
    }

    pub fn activate(&self, code: &str, now: NaiveDateTime) -> Result<License> {
        let license = License::issue(code, now, self.validity_days)?;
        license.save(&self.path)?;
        info!(
            "License activated until {}",
            license.expiration.format("%Y-%m-%d %H:%M")
        );
        Ok(license)
    }
}

pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

mod expiration_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::EXPIRATION_FORMAT;

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(EXPIRATION_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, EXPIRATION_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S"))
            .map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn check_distinguishes_code_and_expiry() {
        let license = License::issue("ABC", at(1), 30).unwrap();
        assert_eq!(license.check("ABC", at(20)), LicenseStatus::Valid);
        assert_eq!(license.check("XYZ", at(20)), LicenseStatus::InvalidCode);
        let later = at(1) + TimeDelta::days(31);
        assert_eq!(license.check("ABC", later), LicenseStatus::Expired);
    }

    #[test]
    fn record_round_trips_through_json() {
        let license = License::issue("ABC", at(1), 30).unwrap();
        let json = serde_json::to_string(&license).unwrap();
        assert_eq!(
            json,
            r#"{"code":"ABC","expiration":"2026-03-31 09:00:00.000000"}"#
        );
        let parsed: License = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, license);
    }

    #[test]
    fn authorize_without_code_requires_live_record() {
        let dir = tempdir().unwrap();
        let gate = LicenseGate::new(dir.path().join("license.json"), 30);
        assert!(gate.authorize(None, at(1)).is_err());

        gate.activate("ABC", at(1)).unwrap();
        assert_eq!(gate.authorize(None, at(2)).unwrap().code, "ABC");
        assert!(gate.authorize(None, at(1) + TimeDelta::days(40)).is_err());
    }

    #[test]
    fn authorize_with_new_code_issues_fresh_record() {
        let dir = tempdir().unwrap();
        let gate = LicenseGate::new(dir.path().join("license.json"), 30);
        gate.activate("OLD", at(1)).unwrap();

        let license = gate.authorize(Some("NEW"), at(5)).unwrap();
        assert_eq!(license.code, "NEW");
        assert_eq!(license.expiration, at(5) + TimeDelta::days(30));
        assert_eq!(gate.stored().unwrap(), Some(license));
    }

    #[test]
    fn authorize_with_matching_code_keeps_existing_expiry() {
        let dir = tempdir().unwrap();
        let gate = LicenseGate::new(dir.path().join("license.json"), 30);
        let original = gate.activate("ABC", at(1)).unwrap();
        let license = gate.authorize(Some("ABC"), at(10)).unwrap();
        assert_eq!(license.expiration, original.expiration);
    }

    #[test]
    fn out_of_range_validity_is_an_error() {
        let dir = tempdir().unwrap();
        let gate = LicenseGate::new(dir.path().join("license.json"), 9_000_000_000_000);
        let err = gate.activate("ABC", at(1)).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert_eq!(gate.stored().unwrap(), None);
    }

    #[test]
    fn records_with_portuguese_keys_load() {
        let parsed: License = serde_json::from_str(
            r#"{"codigo":"ABC","data_expiracao":"2026-03-31 09:00:00.000000"}"#,
        )
        .unwrap();
        assert_eq!(parsed, License::issue("ABC", at(1), 30).unwrap());
    }

    #[test]
    fn corrupt_file_counts_as_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("license.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(License::load(&path).unwrap(), None);
    }
}

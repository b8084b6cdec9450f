//! Filter parameters.
//!
//! [`RawParameters`] holds what the user typed; [`ParameterSet`] is the
//! validated, immutable form handed to the filter engine. Validation happens
//! before any spreadsheet or template is opened.

use std::{fmt, fs::File, io::BufReader, ops::Range, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DocError, DocResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawParameters {
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub subject: String,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub bimester: String,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub grade: String,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub cycle: String,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub lesson: String,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub count: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSet {
    pub subject: String,
    pub bimester: String,
    pub grade: String,
    pub cycle: String,
    pub lesson: i64,
    pub count: i64,
}

impl ParameterSet {
    pub fn validate(raw: &RawParameters) -> DocResult<Self> {
        let fields = [
            ("subject", &raw.subject),
            ("bimester", &raw.bimester),
            ("grade", &raw.grade),
            ("cycle", &raw.cycle),
            ("lesson", &raw.lesson),
            ("count", &raw.count),
        ];
        let empty = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect::<Vec<_>>();
        if !empty.is_empty() {
            return Err(DocError::Validation(format!(
                "all fields must be filled in; missing: {}",
                empty.join(", ")
            )));
        }

        let lesson = parse_integer("lesson", &raw.lesson)?;
        let count = parse_integer("count", &raw.count)?;

        Ok(Self {
            subject: raw.subject.trim().to_string(),
            bimester: raw.bimester.trim().to_string(),
            grade: raw.grade.trim().to_string(),
            cycle: raw.cycle.trim().to_string(),
            lesson,
            count,
        })
    }

    /// Half-open range of lesson numbers selected by this set. Empty when
    /// `count` is zero or negative.
    pub fn lesson_range(&self) -> Range<i64> {
        self.lesson..self.lesson.saturating_add(self.count)
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {} / {} bimester, {} lesson(s) from {}",
            self.subject, self.cycle, self.grade, self.bimester, self.count, self.lesson
        )
    }
}

fn parse_integer(field: &str, raw: &str) -> DocResult<i64> {
    raw.trim().parse::<i64>().map_err(|_| {
        DocError::Validation(format!("{field} must be a whole number, got '{raw}'"))
    })
}

/// Reads additional parameter sets from a YAML or JSON list.
pub fn load_parameter_file(path: &Path) -> Result<Vec<RawParameters>> {
    let file = File::open(path).with_context(|| format!("Opening parameter file {path:?}"))?;
    let reader = BufReader::new(file);
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let sets = if is_json {
        serde_json::from_reader(reader).context("Parsing parameter JSON")?
    } else {
        serde_yaml::from_reader(reader).context("Parsing parameter YAML")?
    };
    Ok(sets)
}

/// Validates a list of sets, naming the offending entry on failure.
pub fn validate_all(raw: &[RawParameters]) -> DocResult<Vec<ParameterSet>> {
    raw.iter()
        .enumerate()
        .map(|(idx, set)| {
            ParameterSet::validate(set).map_err(|err| match err {
                DocError::Validation(message) => {
                    DocError::Validation(format!("parameter set {}: {message}", idx + 1))
                }
                other => other,
            })
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
}

fn scalar_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Text(s)) => s,
        Some(Scalar::Integer(i)) => i.to_string(),
        Some(Scalar::Float(f)) => f.to_string(),
        None => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawParameters {
        RawParameters {
            subject: "Matemática".into(),
            bimester: "1°".into(),
            grade: "3° ano".into(),
            cycle: "Anos Iniciais".into(),
            lesson: "5".into(),
            count: "3".into(),
        }
    }

    #[test]
    fn validate_parses_integers_and_builds_range() {
        let params = ParameterSet::validate(&raw()).unwrap();
        assert_eq!(params.lesson, 5);
        assert_eq!(params.lesson_range(), 5..8);
    }

    #[test]
    fn validate_lists_every_empty_field() {
        let mut input = raw();
        input.grade = "  ".into();
        input.count.clear();
        let err = ParameterSet::validate(&input).unwrap_err();
        assert!(matches!(err, DocError::Validation(_)));
        let message = err.to_string();
        assert!(message.contains("grade"));
        assert!(message.contains("count"));
    }

    #[test]
    fn validate_rejects_non_integer_lesson() {
        let mut input = raw();
        input.lesson = "cinco".into();
        let err = ParameterSet::validate(&input).unwrap_err();
        assert!(err.to_string().contains("lesson must be a whole number"));
    }

    #[test]
    fn zero_or_negative_count_validates_to_an_empty_range() {
        let mut input = raw();
        input.count = "0".into();
        let params = ParameterSet::validate(&input).unwrap();
        assert_eq!(params.count, 0);
        assert!(params.lesson_range().is_empty());

        input.count = "-2".into();
        assert!(ParameterSet::validate(&input).unwrap().lesson_range().is_empty());
    }

    #[test]
    fn yaml_numbers_deserialize_as_text() {
        let yaml = "- subject: História\n  bimester: 2°\n  grade: 7° ano\n  cycle: Anos Finais\n  lesson: 3\n  count: 2\n";
        let sets: Vec<RawParameters> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(sets[0].lesson, "3");
        let validated = validate_all(&sets).unwrap();
        assert_eq!(validated[0].count, 2);
    }

    #[test]
    fn validate_all_names_the_failing_set() {
        let mut second = raw();
        second.cycle.clear();
        let err = validate_all(&[raw(), second]).unwrap_err();
        assert!(err.to_string().contains("parameter set 2"));
    }
}

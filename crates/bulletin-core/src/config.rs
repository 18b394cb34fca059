//! Engine configuration.
//!
//! Trimester boundaries, rounding and mention thresholds are injected here
//! rather than hardcoded, so one binary can serve any school calendar.
//! [`EngineSettings`] is the raw TOML shape; [`EngineConfig`] is the
//! validated form the engine runs on.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mention::{MentionBand, MentionScale};
use crate::period::TrimesterWindow;

/// How averages are rounded to the stored precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Halves round toward +∞ (14.45 → 14.5).
    #[default]
    HalfUp,
    /// Halves round to the even neighbour (14.45 → 14.4).
    HalfEven,
    /// Truncate toward zero.
    Down,
}

/// Rounding mode plus number of decimals kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rounding {
    #[serde(default)]
    pub mode: RoundingMode,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

fn default_decimals() -> u32 {
    1
}

impl Default for Rounding {
    fn default() -> Self {
        Self {
            mode: RoundingMode::HalfUp,
            decimals: default_decimals(),
        }
    }
}

impl Rounding {
    fn factor(&self) -> f64 {
        10f64.powi(self.decimals as i32)
    }

    /// Round `value` to the configured precision.
    ///
    /// With the defaults this is `Int(10*x + 0.5) / 10`. The scaled value is
    /// snapped to 1e-6 first so binary noise (14.45 stored as 14.4499…)
    /// does not flip a half.
    pub fn apply(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        let factor = self.factor();
        let scaled = ((value * factor) * 1e6).round() / 1e6;
        let rounded = match self.mode {
            RoundingMode::HalfUp => (scaled + 0.5).floor(),
            RoundingMode::HalfEven => {
                let floor = scaled.floor();
                let diff = scaled - floor;
                if diff > 0.5 || (diff == 0.5 && floor % 2.0 != 0.0) {
                    floor + 1.0
                } else {
                    floor
                }
            }
            RoundingMode::Down => scaled.trunc(),
        };
        rounded / factor
    }

    /// Integer key of a value at the stored precision; equal keys are ties.
    pub fn key(&self, value: f64) -> i64 {
        (self.apply(value) * self.factor()).round() as i64
    }
}

/// How grades inside one subject are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectWeighting {
    /// Plain arithmetic mean of the grades.
    #[default]
    Equal,
    /// Mean weighted by each exam's coefficient.
    ExamCoefficient,
}

/// Trimester boundaries as written in TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimesterSettings {
    pub number: u8,
    /// First day of the trimester (inclusive), `YYYY-MM-DD`.
    pub start: String,
    /// First day after the trimester (exclusive), `YYYY-MM-DD`.
    pub end: String,
}

/// Raw engine settings, as found in the `[engine]` table of `bulletin.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// School-year tag stamped on every report card (e.g. "2024-2025").
    #[serde(default)]
    pub school_year: String,
    #[serde(default)]
    pub trimesters: Vec<TrimesterSettings>,
    #[serde(default)]
    pub rounding: Rounding,
    #[serde(default)]
    pub mentions: Vec<MentionBand>,
    /// Minimum general average counted as a pass in class statistics.
    #[serde(default = "default_pass_mark")]
    pub pass_mark: f64,
    #[serde(default)]
    pub subject_weighting: SubjectWeighting,
    #[serde(default = "default_true")]
    pub include_subject_ranks: bool,
    /// General remark used when the caller supplies none.
    #[serde(default = "default_remark")]
    pub default_remark: String,
}

fn default_pass_mark() -> f64 {
    10.0
}

fn default_true() -> bool {
    true
}

fn default_remark() -> String {
    "Appréciation générale générée automatiquement.".to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            school_year: String::new(),
            trimesters: Vec::new(),
            rounding: Rounding::default(),
            mentions: Vec::new(),
            pass_mark: default_pass_mark(),
            subject_weighting: SubjectWeighting::default(),
            include_subject_ranks: true,
            default_remark: default_remark(),
        }
    }
}

/// Validated engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub school_year: String,
    /// Trimester windows, sorted by number.
    pub trimesters: Vec<TrimesterWindow>,
    pub rounding: Rounding,
    pub mentions: MentionScale,
    pub pass_mark: f64,
    pub subject_weighting: SubjectWeighting,
    pub include_subject_ranks: bool,
    pub default_remark: String,
}

impl EngineConfig {
    /// Config with the standard mention scale and default rounding.
    pub fn standard(school_year: impl Into<String>, trimesters: Vec<TrimesterWindow>) -> Self {
        let mut trimesters = trimesters;
        trimesters.sort_by_key(|t| t.number);
        Self {
            school_year: school_year.into(),
            trimesters,
            rounding: Rounding::default(),
            mentions: MentionScale::standard(),
            pass_mark: default_pass_mark(),
            subject_weighting: SubjectWeighting::default(),
            include_subject_ranks: true,
            default_remark: default_remark(),
        }
    }

    /// Parse and validate a standalone engine TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: EngineSettings =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::try_from(settings)
    }

    /// Load an engine TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid engine config: {}", path.display()))
    }

    /// Look up a configured trimester.
    pub fn trimester(&self, number: u8) -> Option<&TrimesterWindow> {
        self.trimesters.iter().find(|t| t.number == number)
    }

    /// Check every invariant the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.school_year.trim().is_empty() {
            return Err(ConfigError::MissingSchoolYear);
        }
        if self.trimesters.is_empty() {
            return Err(ConfigError::MissingTrimesters);
        }
        for (i, window) in self.trimesters.iter().enumerate() {
            if !(1..=3).contains(&window.number) {
                return Err(ConfigError::InvalidTrimesterNumber(window.number));
            }
            if window.start >= window.end {
                return Err(ConfigError::EmptyTrimesterWindow {
                    number: window.number,
                    start: window.start.to_string(),
                    end: window.end.to_string(),
                });
            }
            for other in &self.trimesters[i + 1..] {
                if other.number == window.number {
                    return Err(ConfigError::DuplicateTrimester(window.number));
                }
                if window.overlaps(other) {
                    return Err(ConfigError::OverlappingTrimesters {
                        first: window.number,
                        second: other.number,
                    });
                }
            }
        }
        self.mentions.validate()?;
        if self.rounding.decimals > 4 {
            return Err(ConfigError::InvalidDecimals(self.rounding.decimals));
        }
        if !(0.0..=20.0).contains(&self.pass_mark) {
            return Err(ConfigError::InvalidPassMark(self.pass_mark));
        }
        Ok(())
    }
}

fn parse_config_date(field: String, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ConfigError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

impl TryFrom<EngineSettings> for EngineConfig {
    type Error = ConfigError;

    fn try_from(settings: EngineSettings) -> Result<Self, Self::Error> {
        if settings.mentions.is_empty() {
            return Err(ConfigError::MissingMentions);
        }

        let mut trimesters = settings
            .trimesters
            .iter()
            .map(|t| {
                Ok(TrimesterWindow {
                    number: t.number,
                    start: parse_config_date(format!("trimesters[{}].start", t.number), &t.start)?,
                    end: parse_config_date(format!("trimesters[{}].end", t.number), &t.end)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        trimesters.sort_by_key(|t| t.number);

        let config = EngineConfig {
            school_year: settings.school_year,
            trimesters,
            rounding: settings.rounding,
            mentions: MentionScale::new(settings.mentions),
            pass_mark: settings.pass_mark,
            subject_weighting: settings.subject_weighting,
            include_subject_ranks: settings.include_subject_ranks,
            default_remark: settings.default_remark,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mention::Mention;

    const VALID_TOML: &str = r#"
school_year = "2024-2025"
pass_mark = 10.0

[[trimesters]]
number = 1
start = "2024-09-01"
end = "2025-01-01"

[[trimesters]]
number = 2
start = "2025-01-01"
end = "2025-04-01"

[[trimesters]]
number = 3
start = "2025-04-01"
end = "2025-07-15"

[rounding]
mode = "half_up"
decimals = 1

[[mentions]]
min = 16.0
mention = "Très Bien"

[[mentions]]
min = 14.0
mention = "Bien"

[[mentions]]
min = 12.0
mention = "Assez Bien"

[[mentions]]
min = 10.0
mention = "Passable"

[[mentions]]
min = 0.0
mention = "Insuffisant"
"#;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn round_half_up_one_decimal() {
        let r = Rounding::default();
        assert_eq!(r.apply(14.45), 14.5);
        assert_eq!(r.apply(14.44), 14.4);
        assert_eq!(r.apply(13.95), 14.0);
        assert_eq!(r.apply(46.0 / 3.0), 15.3);
        assert_eq!(r.apply(20.0), 20.0);
        assert_eq!(r.apply(0.0), 0.0);
    }

    #[test]
    fn round_half_even_and_down() {
        let even = Rounding {
            mode: RoundingMode::HalfEven,
            decimals: 1,
        };
        assert_eq!(even.apply(14.45), 14.4);
        assert_eq!(even.apply(14.55), 14.6);
        assert_eq!(even.apply(14.46), 14.5);

        let down = Rounding {
            mode: RoundingMode::Down,
            decimals: 1,
        };
        assert_eq!(down.apply(14.49), 14.4);
        assert_eq!(down.apply(19.99), 19.9);
    }

    #[test]
    fn rounding_key_detects_ties() {
        let r = Rounding::default();
        assert_eq!(r.key(15.0), r.key(14.96));
        assert_ne!(r.key(15.0), r.key(14.9));
        assert_eq!(r.key(12.3), 123);
    }

    #[test]
    fn parse_valid_config() {
        let config = EngineConfig::from_toml_str(VALID_TOML).unwrap();
        assert_eq!(config.school_year, "2024-2025");
        assert_eq!(config.trimesters.len(), 3);
        assert_eq!(config.trimester(2).unwrap().start, date("2025-01-01"));
        assert_eq!(config.mentions.classify(14.0), Mention::Bien);
        assert!(config.include_subject_ranks);
        assert_eq!(config.subject_weighting, SubjectWeighting::Equal);
    }

    #[test]
    fn missing_trimesters_is_fatal() {
        let toml = r#"
school_year = "2024-2025"

[[mentions]]
min = 0.0
mention = "Insuffisant"
"#;
        assert_eq!(
            EngineConfig::from_toml_str(toml),
            Err(ConfigError::MissingTrimesters)
        );
    }

    #[test]
    fn missing_mentions_is_fatal() {
        let toml = r#"
school_year = "2024-2025"

[[trimesters]]
number = 1
start = "2024-09-01"
end = "2025-01-01"
"#;
        assert_eq!(
            EngineConfig::from_toml_str(toml),
            Err(ConfigError::MissingMentions)
        );
    }

    #[test]
    fn overlapping_trimesters_rejected() {
        let config = EngineConfig::standard(
            "2024-2025",
            vec![
                TrimesterWindow {
                    number: 1,
                    start: date("2024-09-01"),
                    end: date("2025-01-15"),
                },
                TrimesterWindow {
                    number: 2,
                    start: date("2025-01-01"),
                    end: date("2025-04-01"),
                },
            ],
        );
        assert_eq!(
            config.validate(),
            Err(ConfigError::OverlappingTrimesters {
                first: 1,
                second: 2
            })
        );
    }

    #[test]
    fn bad_dates_and_numbers_rejected() {
        let bad_date = VALID_TOML.replace("2024-09-01", "01/09/2024");
        assert!(matches!(
            EngineConfig::from_toml_str(&bad_date),
            Err(ConfigError::InvalidDate { .. })
        ));

        let bad_number = VALID_TOML.replace("number = 3", "number = 4");
        assert_eq!(
            EngineConfig::from_toml_str(&bad_number),
            Err(ConfigError::InvalidTrimesterNumber(4))
        );

        let duplicate = VALID_TOML.replace("number = 3", "number = 2");
        assert_eq!(
            EngineConfig::from_toml_str(&duplicate),
            Err(ConfigError::DuplicateTrimester(2))
        );
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            EngineConfig::from_toml_str("this is not [valid toml }{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, VALID_TOML).unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.trimesters[0].number, 1);

        assert!(EngineConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}

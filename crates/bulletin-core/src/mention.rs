//! Mention classification.
//!
//! Maps a general average to a qualitative band. Bands are evaluated from the
//! highest threshold down and the first band whose lower bound is reached
//! wins, so each lower bound is inclusive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Qualitative band, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Mention {
    #[serde(rename = "Insuffisant", alias = "insuffisant")]
    Insuffisant,
    #[serde(rename = "Passable", alias = "passable")]
    Passable,
    #[serde(rename = "Assez Bien", alias = "assez_bien")]
    AssezBien,
    #[serde(rename = "Bien", alias = "bien")]
    Bien,
    #[serde(rename = "Très Bien", alias = "tres_bien")]
    TresBien,
}

impl Mention {
    /// All mentions, lowest first.
    pub const ALL: [Mention; 5] = [
        Mention::Insuffisant,
        Mention::Passable,
        Mention::AssezBien,
        Mention::Bien,
        Mention::TresBien,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Mention::Insuffisant => "Insuffisant",
            Mention::Passable => "Passable",
            Mention::AssezBien => "Assez Bien",
            Mention::Bien => "Bien",
            Mention::TresBien => "Très Bien",
        }
    }
}

impl fmt::Display for Mention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "insuffisant" => Ok(Mention::Insuffisant),
            "passable" => Ok(Mention::Passable),
            "assez bien" => Ok(Mention::AssezBien),
            "bien" => Ok(Mention::Bien),
            "très bien" | "tres bien" => Ok(Mention::TresBien),
            _ => Err(format!("unknown mention: {s}")),
        }
    }
}

/// Lower bound of a mention band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MentionBand {
    /// Inclusive lower bound.
    pub min: f64,
    pub mention: Mention,
}

/// Ordered set of mention bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<MentionBand>", into = "Vec<MentionBand>")]
pub struct MentionScale {
    bands: Vec<MentionBand>,
}

impl MentionScale {
    /// Build a scale from bands in any order. Call [`MentionScale::validate`]
    /// before classifying.
    pub fn new(mut bands: Vec<MentionBand>) -> Self {
        bands.sort_by(|a, b| b.min.total_cmp(&a.min));
        Self { bands }
    }

    /// The standard 16 / 14 / 12 / 10 / 0 scale.
    pub fn standard() -> Self {
        Self::new(vec![
            MentionBand {
                min: 16.0,
                mention: Mention::TresBien,
            },
            MentionBand {
                min: 14.0,
                mention: Mention::Bien,
            },
            MentionBand {
                min: 12.0,
                mention: Mention::AssezBien,
            },
            MentionBand {
                min: 10.0,
                mention: Mention::Passable,
            },
            MentionBand {
                min: 0.0,
                mention: Mention::Insuffisant,
            },
        ])
    }

    /// Bands, highest threshold first.
    pub fn bands(&self) -> &[MentionBand] {
        &self.bands
    }

    /// Check the scale is non-empty, covers 0 and never maps a higher
    /// threshold to a lower mention.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Some(lowest) = self.bands.last() else {
            return Err(ConfigError::MissingMentions);
        };
        if lowest.min.is_nan() || lowest.min > 0.0 {
            return Err(ConfigError::IncompleteMentionScale(lowest.min));
        }
        for pair in self.bands.windows(2) {
            let (upper, lower) = (&pair[0], &pair[1]);
            if !upper.min.is_finite() || upper.min == lower.min || upper.mention < lower.mention {
                return Err(ConfigError::NonMonotonicMentions(upper.min));
            }
        }
        Ok(())
    }

    /// Classify an average. Values below the lowest band fall into it.
    pub fn classify(&self, average: f64) -> Mention {
        self.bands
            .iter()
            .find(|band| average >= band.min)
            .or(self.bands.last())
            .map(|band| band.mention)
            .unwrap_or(Mention::Insuffisant)
    }
}

impl From<Vec<MentionBand>> for MentionScale {
    fn from(bands: Vec<MentionBand>) -> Self {
        Self::new(bands)
    }
}

impl From<MentionScale> for Vec<MentionBand> {
    fn from(scale: MentionScale) -> Self {
        scale.bands
    }
}

impl Default for MentionScale {
    fn default() -> Self {
        Self::standard()
    }
}

//! Diagnosis result types.
//!
//! Represents the output of the two-model diabetes ensemble.

use serde::{Deserialize, Serialize};

/// Final binary label returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosisLabel {
    #[serde(rename = "Diabetes")]
    Diabetes,
    #[serde(rename = "No Diabetes")]
    NoDiabetes,
}

impl DiagnosisLabel {
    /// Map a rounded ensemble class to a label. Only `1` means diabetes.
    #[must_use]
    pub fn from_class(class: i64) -> Self {
        if class == 1 {
            Self::Diabetes
        } else {
            Self::NoDiabetes
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diabetes => "Diabetes",
            Self::NoDiabetes => "No Diabetes",
        }
    }
}

impl std::fmt::Display for DiagnosisLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rounding rule applied to the ensemble mean when it sits exactly on 0.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Banker's rounding: 0.5 rounds to 0.
    #[default]
    HalfToEven,
    /// 0.5 rounds to 1.
    HalfUp,
}

impl TieBreak {
    /// Round `value` to the nearest integer.
    #[must_use]
    pub fn round(self, value: f64) -> f64 {
        match self {
            Self::HalfToEven => value.round_ties_even(),
            Self::HalfUp => (value + 0.5).floor(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HalfToEven => "half_to_even",
            Self::HalfUp => "half_up",
        }
    }
}

impl std::str::FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "half_to_even" | "even" => Ok(Self::HalfToEven),
            "half_up" | "up" => Ok(Self::HalfUp),
            other => Err(format!(
                "unknown tie-break policy '{other}' (expected half_to_even or half_up)"
            )),
        }
    }
}

/// Result of combining both model outputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnsembleOutcome {
    /// Tree ensemble class (0 or 1)
    pub forest_class: u8,

    /// Network sigmoid output in [0, 1]
    pub network_score: f64,

    /// Arithmetic mean of the two outputs
    pub mean: f64,

    /// Final label
    pub label: DiagnosisLabel,
}

impl EnsembleOutcome {
    /// Average the two outputs and round with `tie_break`.
    #[must_use]
    pub fn combine(forest_class: u8, network_score: f64, tie_break: TieBreak) -> Self {
        let mean = (f64::from(forest_class) + network_score) / 2.0;
        let rounded = tie_break.round(mean) as i64;
        Self {
            forest_class,
            network_score,
            mean,
            label: DiagnosisLabel::from_class(rounded),
        }
    }
}

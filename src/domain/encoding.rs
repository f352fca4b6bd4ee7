//! Categorical encodings shared by the request encoder and the training data.

use serde::{Deserialize, Serialize};

/// Error type for request encoding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    #[error("request body must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("field `{field}`: could not convert string to float: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("field `{field}`: expected a number, got {kind}")]
    NotANumber {
        field: &'static str,
        kind: &'static str,
    },

    #[error("field `{field}`: value is not finite")]
    NonFinite { field: &'static str },

    #[error("field `{field}`: expected a string, got {kind}")]
    NotAString {
        field: &'static str,
        kind: &'static str,
    },
}

/// Ethnicity category with the integer codes used during training.
///
/// `Other` shares code 4 with `British`: unrecognized labels were folded into
/// the last category by the training pipeline and serving keeps that mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ethnicity {
    Caucasian,
    American,
    Asian,
    Hispanic,
    British,
    #[default]
    Other,
}

impl Ethnicity {
    /// Case-insensitive lookup; anything unrecognized becomes `Other`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "caucasian" => Self::Caucasian,
            "american" => Self::American,
            "asian" => Self::Asian,
            "hispanic" => Self::Hispanic,
            "british" => Self::British,
            _ => Self::Other,
        }
    }

    /// Integer code fed to the models.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Caucasian => 0,
            Self::American => 1,
            Self::Asian => 2,
            Self::Hispanic => 3,
            Self::British | Self::Other => 4,
        }
    }
}

/// `true` only for an exact, case-insensitive "male".
#[must_use]
pub fn encode_gender(label: &str) -> bool {
    label.to_lowercase() == "male"
}

/// `true` only for an exact, case-insensitive "yes".
#[must_use]
pub fn encode_yes_no(label: &str) -> bool {
    label.to_lowercase() == "yes"
}

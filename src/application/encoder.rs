//! Feature encoder: loosely-typed request record -> `PatientFeatures`.
//!
//! Every field is optional. Missing numeric fields become 0, missing
//! categorical fields are treated as the empty string. Field names come from
//! `Feature::name`, the same table that fixes the model input order.

use serde_json::{Map, Value};

use crate::domain::{
    encode_gender, encode_yes_no, EncodeError, Ethnicity, Feature, FeatureVector, PatientFeatures,
};

/// Decode a request record into named patient features.
///
/// # Errors
/// Returns `EncodeError` if the record is not an object, a numeric field holds
/// something that is not a finite number, or a categorical field is not a string.
pub fn encode(record: &Value) -> Result<PatientFeatures, EncodeError> {
    let record = record
        .as_object()
        .ok_or_else(|| EncodeError::NotAnObject(kind_of(record)))?;

    Ok(PatientFeatures {
        pregnancies: numeric(record, Feature::Pregnancies)?,
        glucose: numeric(record, Feature::Glucose)?,
        blood_pressure: numeric(record, Feature::BloodPressure)?,
        skin_thickness: numeric(record, Feature::SkinThickness)?,
        insulin: numeric(record, Feature::Insulin)?,
        bmi: numeric(record, Feature::Bmi)?,
        age: numeric(record, Feature::Age)?,
        is_male: encode_gender(label(record, Feature::Gender)?),
        has_pcos: encode_yes_no(label(record, Feature::Pcos)?),
        exercises: encode_yes_no(label(record, Feature::Exercise)?),
        ethnicity: Ethnicity::from_label(label(record, Feature::Ethnicity)?),
        diabetes_pedigree_function: numeric(record, Feature::DiabetesPedigreeFunction)?,
    })
}

/// Decode a request record straight into the model input vector.
///
/// # Errors
/// Same as [`encode`].
pub fn encode_vector(record: &Value) -> Result<FeatureVector, EncodeError> {
    encode(record).map(|features| features.to_vector())
}

fn numeric(record: &Map<String, Value>, feature: Feature) -> Result<f64, EncodeError> {
    let field = feature.name();
    let Some(value) = record.get(field) else {
        return Ok(0.0);
    };

    let number = match value {
        Value::Number(n) => n.as_f64().ok_or(EncodeError::NonFinite { field })?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| EncodeError::InvalidNumber {
                field,
                value: s.clone(),
            })?,
        other => {
            return Err(EncodeError::NotANumber {
                field,
                kind: kind_of(other),
            })
        }
    };

    if number.is_finite() {
        Ok(number)
    } else {
        Err(EncodeError::NonFinite { field })
    }
}

fn label(record: &Map<String, Value>, feature: Feature) -> Result<&str, EncodeError> {
    let field = feature.name();
    match record.get(field) {
        None => Ok(""),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(EncodeError::NotAString {
            field,
            kind: kind_of(other),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

//! Patient feature types for diabetes risk prediction.
//!
//! The model input order is declared once, in the `define_features!` call
//! below. The encoder, the vector layout and the artifact loaders all read it
//! from here, so training and serving cannot drift apart silently.

use serde::{Deserialize, Serialize};

use super::encoding::Ethnicity;

/// Number of model input features.
pub const FEATURE_COUNT: usize = 12;

macro_rules! define_features {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// One slot of the model input.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Feature {
            $($variant),+
        }

        impl Feature {
            /// Every feature, in model input order.
            pub const ALL: [Feature; FEATURE_COUNT] = [$(Feature::$variant),+];

            /// Field name used in requests and in exported artifacts.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Feature::$variant => $name),+
                }
            }

            /// Position of the feature inside a [`FeatureVector`].
            #[must_use]
            pub const fn index(self) -> usize {
                self as usize
            }
        }

        /// Feature names in model input order.
        pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [$($name),+];
    };
}

define_features! {
    Pregnancies => "pregnancies",
    Glucose => "glucose",
    BloodPressure => "blood_pressure",
    SkinThickness => "skin_thickness",
    Insulin => "insulin",
    Bmi => "bmi",
    Age => "age",
    Gender => "gender",
    Pcos => "pcos",
    Exercise => "exercise",
    Ethnicity => "ethnicity",
    DiabetesPedigreeFunction => "diabetes_pedigree_function",
}

/// Fixed-order numeric model input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Wrap raw values that are already in model input order.
    #[must_use]
    pub const fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// Value of a single feature.
    #[must_use]
    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Copy out the underlying array.
    #[must_use]
    pub fn into_inner(self) -> [f64; FEATURE_COUNT] {
        self.0
    }
}

/// Clinical and demographic features for one patient.
///
/// Numeric fields keep whatever unit the caller sent; the encoder performs
/// no range validation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PatientFeatures {
    /// Number of pregnancies
    pub pregnancies: f64,

    /// Plasma glucose concentration
    pub glucose: f64,

    /// Diastolic blood pressure (mm Hg)
    pub blood_pressure: f64,

    /// Triceps skin fold thickness (mm)
    pub skin_thickness: f64,

    /// Serum insulin
    pub insulin: f64,

    /// Body mass index
    pub bmi: f64,

    /// Age in years
    pub age: f64,

    /// Encoded as 1 when the reported gender is "male"
    pub is_male: bool,

    /// Encoded as 1 when PCOS was reported as "yes"
    pub has_pcos: bool,

    /// Encoded as 1 when regular exercise was reported as "yes"
    pub exercises: bool,

    /// Ethnicity category
    pub ethnicity: Ethnicity,

    /// Diabetes pedigree function score
    pub diabetes_pedigree_function: f64,
}

impl PatientFeatures {
    /// Numeric value of a single feature as seen by the models.
    #[must_use]
    pub fn value(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Pregnancies => self.pregnancies,
            Feature::Glucose => self.glucose,
            Feature::BloodPressure => self.blood_pressure,
            Feature::SkinThickness => self.skin_thickness,
            Feature::Insulin => self.insulin,
            Feature::Bmi => self.bmi,
            Feature::Age => self.age,
            Feature::Gender => flag(self.is_male),
            Feature::Pcos => flag(self.has_pcos),
            Feature::Exercise => flag(self.exercises),
            Feature::Ethnicity => f64::from(self.ethnicity.code()),
            Feature::DiabetesPedigreeFunction => self.diabetes_pedigree_function,
        }
    }

    /// Convert features to the vector used for ML inference.
    #[must_use]
    pub fn to_vector(&self) -> FeatureVector {
        FeatureVector(Feature::ALL.map(|feature| self.value(feature)))
    }
}

fn flag(set: bool) -> f64 {
    if set {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PatientFeatures {
        PatientFeatures {
            pregnancies: 6.0,
            glucose: 148.0,
            blood_pressure: 72.0,
            skin_thickness: 35.0,
            insulin: 0.0,
            bmi: 33.6,
            age: 50.0,
            is_male: false,
            has_pcos: true,
            exercises: true,
            ethnicity: Ethnicity::Asian,
            diabetes_pedigree_function: 0.627,
        }
    }

    #[test]
    fn test_to_vector_follows_feature_order() {
        let vec = sample().to_vector();
        assert_eq!(
            vec.into_inner(),
            [6.0, 148.0, 72.0, 35.0, 0.0, 33.6, 50.0, 0.0, 1.0, 1.0, 2.0, 0.627]
        );
    }

    #[test]
    fn test_feature_names_match_enum() {
        for (idx, feature) in Feature::ALL.iter().enumerate() {
            assert_eq!(feature.index(), idx);
            assert_eq!(FEATURE_NAMES[idx], feature.name());
        }
        assert_eq!(FEATURE_NAMES[0], "pregnancies");
        assert_eq!(FEATURE_NAMES[FEATURE_COUNT - 1], "diabetes_pedigree_function");
    }

    #[test]
    fn test_vector_get_by_feature() {
        let vec = sample().to_vector();
        assert!((vec.get(Feature::Bmi) - 33.6).abs() < f64::EPSILON);
        assert!((vec.get(Feature::Ethnicity) - 2.0).abs() < f64::EPSILON);
        assert_eq!(vec.as_slice().len(), FEATURE_COUNT);
    }

    #[test]
    fn test_default_features_encode_to_zero_except_ethnicity() {
        let vec = PatientFeatures::default().to_vector();
        for feature in Feature::ALL {
            let expected = if feature == Feature::Ethnicity { 4.0 } else { 0.0 };
            assert!((vec.get(feature) - expected).abs() < f64::EPSILON, "{feature:?}");
        }
    }
}

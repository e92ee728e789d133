use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{Biometrics, Gender};

/// Raw child-details form as submitted by the user.
///
/// Values stay textual until validated so a bad entry can be reported
/// against the field it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiometricForm {
    #[serde(deserialize_with = "deserialize_form_value")]
    pub age: String,
    #[serde(deserialize_with = "deserialize_form_value")]
    pub gender: String,
    #[serde(deserialize_with = "deserialize_form_value")]
    pub height: String,
    #[serde(deserialize_with = "deserialize_form_value")]
    pub weight: String,
}

impl BiometricForm {
    pub fn new(
        age: impl Into<String>,
        gender: impl Into<String>,
        height: impl Into<String>,
        weight: impl Into<String>,
    ) -> Self {
        Self {
            age: age.into(),
            gender: gender.into(),
            height: height.into(),
            weight: weight.into(),
        }
    }

    pub fn validate(&self) -> Result<Biometrics, BiometricsError> {
        let age = parse_measure(BiometricField::Age, &self.age)?;
        let gender = parse_gender(&self.gender)?;
        let height = parse_measure(BiometricField::Height, &self.height)?;
        let weight = parse_measure(BiometricField::Weight, &self.weight)?;

        if height == 0.0 {
            return Err(BiometricsError::OutOfRange {
                field: BiometricField::Height,
                value: self.height.trim().to_string(),
            });
        }
        if weight == 0.0 {
            return Err(BiometricsError::OutOfRange {
                field: BiometricField::Weight,
                value: self.weight.trim().to_string(),
            });
        }

        Ok(Biometrics {
            age,
            gender,
            height,
            weight,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometricField {
    Age,
    Gender,
    Height,
    Weight,
}

impl BiometricField {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Gender => "gender",
            Self::Height => "height",
            Self::Weight => "weight",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BiometricsError {
    #[error("{} is required", .field.label())]
    Missing { field: BiometricField },
    #[error("{} must be numeric, got '{value}'", .field.label())]
    NotNumeric { field: BiometricField, value: String },
    #[error("{} is out of range: '{value}'", .field.label())]
    OutOfRange { field: BiometricField, value: String },
    #[error("gender must be one of M, F, male, female; got '{value}'")]
    UnknownGender { value: String },
}

impl BiometricsError {
    pub fn field(&self) -> BiometricField {
        match self {
            Self::Missing { field }
            | Self::NotNumeric { field, .. }
            | Self::OutOfRange { field, .. } => *field,
            Self::UnknownGender { .. } => BiometricField::Gender,
        }
    }
}

fn parse_measure(field: BiometricField, raw: &str) -> Result<f64, BiometricsError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BiometricsError::Missing { field });
    }

    let value = trimmed
        .parse::<f64>()
        .map_err(|_| BiometricsError::NotNumeric {
            field,
            value: trimmed.to_string(),
        })?;

    if !value.is_finite() {
        return Err(BiometricsError::NotNumeric {
            field,
            value: trimmed.to_string(),
        });
    }
    if value < 0.0 {
        return Err(BiometricsError::OutOfRange {
            field,
            value: trimmed.to_string(),
        });
    }

    Ok(value)
}

fn parse_gender(raw: &str) -> Result<Gender, BiometricsError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BiometricsError::Missing {
            field: BiometricField::Gender,
        });
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "m" | "male" => Ok(Gender::Male),
        "f" | "female" => Ok(Gender::Female),
        _ => Err(BiometricsError::UnknownGender {
            value: trimmed.to_string(),
        }),
    }
}

/// Accept either a JSON string or a JSON number for a form field.
fn deserialize_form_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(value) => Ok(value),
        serde_json::Value::Number(value) => Ok(value.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

//! Contracts with the two remote model endpoints.
//!
//! The workflow never calls these directly; it returns effects and the
//! service performs them through the traits below.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{Biometrics, ImageBlob};

pub use http::{HttpScreeningBackend, IMAGE_ENDPOINT, NUMERIC_ENDPOINT};

/// Body returned by `POST /predict/image`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResponse {
    pub prediction: String,
    #[serde(default)]
    pub filename: String,
}

/// Body sent to `POST /predict/numeric`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRequest {
    pub age: f64,
    pub gender: String,
    pub height: f64,
    pub weight: f64,
}

impl From<&Biometrics> for AssessmentRequest {
    fn from(value: &Biometrics) -> Self {
        Self {
            age: value.age,
            gender: value.gender.code().to_string(),
            height: value.height,
            weight: value.weight,
        }
    }
}

/// Body returned by `POST /predict/numeric`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub bmi: f64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("{endpoint} responded with HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("{endpoint} returned an unreadable body: {message}")]
    Malformed { endpoint: String, message: String },
}

/// Image classifier endpoint.
#[async_trait]
pub trait RemoteImageClassifier: Send + Sync {
    async fn classify(&self, image: &ImageBlob) -> Result<ClassificationResponse, RemoteError>;
}

/// Biometric assessment endpoint.
#[async_trait]
pub trait RemoteAssessmentService: Send + Sync {
    async fn assess(&self, request: &AssessmentRequest)
        -> Result<AssessmentResponse, RemoteError>;
}

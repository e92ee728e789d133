use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::workflows::screening::domain::ImageBlob;

use super::{
    AssessmentRequest, AssessmentResponse, ClassificationResponse, RemoteAssessmentService,
    RemoteError, RemoteImageClassifier,
};

pub const IMAGE_ENDPOINT: &str = "/predict/image";
pub const NUMERIC_ENDPOINT: &str = "/predict/numeric";

/// Both model endpoints served from one backend base URL.
#[derive(Debug, Clone)]
pub struct HttpScreeningBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpScreeningBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| RemoteError::Transport {
                endpoint: config.base_url.clone(),
                message: err.to_string(),
            })?;

        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl RemoteImageClassifier for HttpScreeningBackend {
    async fn classify(&self, image: &ImageBlob) -> Result<ClassificationResponse, RemoteError> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.filename().to_string())
            .mime_str(image.media_type())
            .map_err(|err| transport(IMAGE_ENDPOINT, err))?;
        let form = Form::new().part("file", part);

        debug!(filename = image.filename(), bytes = image.len(), "posting image to classifier");
        let response = self
            .client
            .post(self.url(IMAGE_ENDPOINT))
            .multipart(form)
            .send()
            .await
            .map_err(|err| transport(IMAGE_ENDPOINT, err))?;

        decode(IMAGE_ENDPOINT, response).await
    }
}

#[async_trait]
impl RemoteAssessmentService for HttpScreeningBackend {
    async fn assess(
        &self,
        request: &AssessmentRequest,
    ) -> Result<AssessmentResponse, RemoteError> {
        debug!(gender = %request.gender, "posting biometrics to assessment service");
        let response = self
            .client
            .post(self.url(NUMERIC_ENDPOINT))
            .json(request)
            .send()
            .await
            .map_err(|err| transport(NUMERIC_ENDPOINT, err))?;

        decode(NUMERIC_ENDPOINT, response).await
    }
}

fn transport(endpoint: &str, err: reqwest::Error) -> RemoteError {
    RemoteError::Transport {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    }
}

async fn decode<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<T, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        warn!(endpoint, status = status.as_u16(), "remote model rejected request");
        return Err(RemoteError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|err| transport(endpoint, err))?;

    serde_json::from_slice(&body).map_err(|err| RemoteError::Malformed {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    })
}

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, JsonRejection},
        DefaultBodyLimit, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::error::AppError;

use super::biometrics::BiometricForm;
use super::intake::{FileCandidate, ValidationError};
use super::machine::WorkflowError;
use super::remote::{RemoteAssessmentService, RemoteImageClassifier};
use super::service::{ScreeningService, ScreeningServiceError};
use super::view::{ResultPresenter, ViewModel};

/// Header naming the uploaded file, since the image travels as a raw body.
pub const FILENAME_HEADER: &str = "x-filename";

/// Slack above the intake limit so oversized uploads still reach intake.
const BODY_LIMIT_SLACK: usize = 1024;

/// Router builder exposing the screening workflow over HTTP.
pub fn screening_router<C, A, P>(
    service: Arc<ScreeningService<C, A, P>>,
    max_upload_bytes: usize,
) -> Router
where
    C: RemoteImageClassifier + 'static,
    A: RemoteAssessmentService + 'static,
    P: ResultPresenter + 'static,
{
    Router::new()
        .route("/api/v1/screening", get(view_handler::<C, A, P>))
        .route(
            "/api/v1/screening/image",
            post(image_handler::<C, A, P>).layer(DefaultBodyLimit::max(
                max_upload_bytes.saturating_add(BODY_LIMIT_SLACK),
            )),
        )
        .route(
            "/api/v1/screening/biometrics",
            post(biometrics_handler::<C, A, P>),
        )
        .route("/api/v1/screening/retry", post(retry_handler::<C, A, P>))
        .route("/api/v1/screening/reset", post(reset_handler::<C, A, P>))
        .with_state(service)
}

pub(crate) async fn view_handler<C, A, P>(
    State(service): State<Arc<ScreeningService<C, A, P>>>,
) -> Response
where
    C: RemoteImageClassifier + 'static,
    A: RemoteAssessmentService + 'static,
    P: ResultPresenter + 'static,
{
    (StatusCode::OK, Json(service.current_view().await)).into_response()
}

pub(crate) async fn image_handler<C, A, P>(
    State(service): State<Arc<ScreeningService<C, A, P>>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response
where
    C: RemoteImageClassifier + 'static,
    A: RemoteAssessmentService + 'static,
    P: ResultPresenter + 'static,
{
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return reject(rejection.status(), rejection.body_text()),
    };
    let filename = headers
        .get(FILENAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("upload")
        .to_string();
    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let candidate = FileCandidate {
        filename,
        media_type,
        bytes: body.to_vec(),
    };

    respond(service.upload(candidate).await)
}

pub(crate) async fn biometrics_handler<C, A, P>(
    State(service): State<Arc<ScreeningService<C, A, P>>>,
    form: Result<Json<BiometricForm>, JsonRejection>,
) -> Response
where
    C: RemoteImageClassifier + 'static,
    A: RemoteAssessmentService + 'static,
    P: ResultPresenter + 'static,
{
    let Json(form) = match form {
        Ok(form) => form,
        Err(rejection) => return reject(rejection.status(), rejection.body_text()),
    };
    respond(service.submit_biometrics(&form).await)
}

pub(crate) async fn retry_handler<C, A, P>(
    State(service): State<Arc<ScreeningService<C, A, P>>>,
) -> Response
where
    C: RemoteImageClassifier + 'static,
    A: RemoteAssessmentService + 'static,
    P: ResultPresenter + 'static,
{
    respond(service.retry_classification().await)
}

pub(crate) async fn reset_handler<C, A, P>(
    State(service): State<Arc<ScreeningService<C, A, P>>>,
) -> Response
where
    C: RemoteImageClassifier + 'static,
    A: RemoteAssessmentService + 'static,
    P: ResultPresenter + 'static,
{
    (StatusCode::OK, Json(service.reset().await)).into_response()
}

fn respond(result: Result<ViewModel, ScreeningServiceError>) -> Response {
    match result {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

/// Extractor rejections use the same `{"error": ...}` body as workflow errors.
fn reject(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

pub(crate) fn status_for(error: &ScreeningServiceError) -> StatusCode {
    match error {
        ScreeningServiceError::Intake(ValidationError::NotAnImage { .. }) => {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        ScreeningServiceError::Intake(ValidationError::Empty { .. }) => StatusCode::BAD_REQUEST,
        ScreeningServiceError::Intake(ValidationError::TooLarge { .. }) => {
            StatusCode::PAYLOAD_TOO_LARGE
        }
        ScreeningServiceError::Workflow(WorkflowError::InvalidBiometrics(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ScreeningServiceError::Workflow(WorkflowError::InvalidTransition { .. }) => {
            StatusCode::CONFLICT
        }
    }
}

use super::common::*;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::workflows::screening::domain::Stage;
use crate::workflows::screening::intake::ValidationError;
use crate::workflows::screening::router::{
    biometrics_handler, screening_router, status_for, FILENAME_HEADER,
};
use crate::workflows::screening::service::ScreeningServiceError;
use crate::workflows::screening::view::RecordingPresenter;

fn image_request(media_type: &str, filename: &str, bytes: Vec<u8>) -> Request<Body> {
    Request::post("/api/v1/screening/image")
        .header(header::CONTENT_TYPE, media_type)
        .header(FILENAME_HEADER, filename)
        .body(Body::from(bytes))
        .unwrap()
}

fn json_request(uri: &str, payload: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn image_route_rejects_non_images() {
    let (service, classifier, _, _) = build_service(
        ScriptedClassifier::answering([Ok(prediction("Healthy", "a.jpg"))]),
        ScriptedAssessor::default(),
    );
    let router = screening_router(service, 1024);

    let response = router
        .oneshot(image_request("text/plain", "notes.txt", b"hello".to_vec()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = read_json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("notes.txt"));
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn image_route_returns_classified_view() {
    let (service, _, _, _) = build_service(
        ScriptedClassifier::answering([Ok(prediction("Healthy", "a.jpg"))]),
        ScriptedAssessor::default(),
    );
    let router = screening_router(service, 1024);

    let response = router
        .oneshot(image_request("image/jpeg", "a.jpg", vec![0xFF, 0xD8, 0xFF]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["stage"], "classified");
    assert_eq!(body["visible_panels"], json!(["results"]));
    assert_eq!(body["field_values"]["classification"], "Healthy");
    assert_eq!(body["severity_style"], "healthy");
    assert!(body.get("notice").is_none());
}

#[tokio::test]
async fn biometrics_route_flags_invalid_input() {
    let (service, _, assessor, _) = build_service(
        ScriptedClassifier::answering([Ok(prediction("Malnourished", "b.jpg"))]),
        ScriptedAssessor::answering([Ok(underweight())]),
    );
    service
        .upload(jpeg_candidate("b.jpg"))
        .await
        .expect("upload succeeds");
    let router = screening_router(service, 1024);

    let response = router
        .oneshot(json_request(
            "/api/v1/screening/biometrics",
            json!({ "age": "4", "gender": "M", "height": "tall", "weight": "11" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(assessor.calls(), 0);
}

#[tokio::test]
async fn biometrics_route_accepts_numeric_json() {
    let (service, _, assessor, _) = build_service(
        ScriptedClassifier::answering([Ok(prediction("Malnourished", "b.jpg"))]),
        ScriptedAssessor::answering([Ok(underweight())]),
    );
    service
        .upload(jpeg_candidate("b.jpg"))
        .await
        .expect("upload succeeds");
    let router = screening_router(service, 1024);

    let response = router
        .oneshot(json_request(
            "/api/v1/screening/biometrics",
            json!({ "age": 4, "gender": "female", "height": 95.5, "weight": 11 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["stage"], "assessed");
    assert_eq!(
        body["visible_panels"],
        json!(["results", "assessment_metrics"])
    );
    assert_eq!(body["field_values"]["bmi"], "12.2");
    assert_eq!(assessor.requests()[0].gender, "F");
}

#[tokio::test]
async fn biometrics_handler_conflicts_when_idle() {
    let (service, _, assessor, _) = build_service(
        ScriptedClassifier::default(),
        ScriptedAssessor::answering([Ok(underweight())]),
    );

    let response = biometrics_handler::<ScriptedClassifier, ScriptedAssessor, RecordingPresenter>(
        State(service),
        Ok(axum::Json(child_form())),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(assessor.calls(), 0);
}

#[tokio::test]
async fn reset_route_returns_idle_view() {
    let (service, _, _, _) = build_service(
        ScriptedClassifier::answering([Ok(prediction("Healthy", "a.jpg"))]),
        ScriptedAssessor::default(),
    );
    service
        .upload(jpeg_candidate("a.jpg"))
        .await
        .expect("upload succeeds");
    let router = screening_router(service.clone(), 1024);

    let response = router
        .oneshot(
            Request::post("/api/v1/screening/reset")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["stage"], "idle");
    assert_eq!(body["upload_prompt_visible"], true);
    assert_eq!(body["visible_panels"], json!([]));
}

#[tokio::test]
async fn view_route_reports_current_stage() {
    let (service, _, _, _) = build_service(
        ScriptedClassifier::answering([Err(offline("/predict/image"))]),
        ScriptedAssessor::default(),
    );
    service
        .upload(jpeg_candidate("a.jpg"))
        .await
        .expect("outage is reported in the view");
    let router = screening_router(service, 1024);

    let response = router
        .oneshot(
            Request::get("/api/v1/screening")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["stage"], "image_selected");
    assert_eq!(body["notice"]["kind"], "classification_failed");
}

#[tokio::test]
async fn oversized_upload_is_rejected_by_intake_as_json() {
    let (service, classifier, _, _) = build_service(
        ScriptedClassifier::answering([Ok(prediction("Healthy", "a.jpg"))]),
        ScriptedAssessor::default(),
    );
    let router = screening_router(service.clone(), 4);

    let response = router
        .oneshot(image_request("image/jpeg", "big.jpg", vec![0xFF; 6]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = read_json_body(response).await;
    let message = body["error"].as_str().expect("json error message");
    assert!(message.contains("big.jpg"));
    assert!(message.contains("upload limit"));
    assert_eq!(classifier.calls(), 0);
    assert_eq!(service.stage().await, Stage::Idle);
}

#[tokio::test]
async fn upload_beyond_body_limit_still_answers_json() {
    let (service, classifier, _, _) = build_service(
        ScriptedClassifier::answering([Ok(prediction("Healthy", "a.jpg"))]),
        ScriptedAssessor::default(),
    );
    let router = screening_router(service, 4);

    let response = router
        .oneshot(image_request("image/jpeg", "huge.jpg", vec![0xFF; 4 * 1024]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = read_json_body(response).await;
    assert!(body["error"].is_string());
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn malformed_biometrics_body_answers_json() {
    let (service, _, assessor, _) = build_service(
        ScriptedClassifier::answering([Ok(prediction("Malnourished", "b.jpg"))]),
        ScriptedAssessor::answering([Ok(underweight())]),
    );
    service
        .upload(jpeg_candidate("b.jpg"))
        .await
        .expect("upload succeeds");
    let router = screening_router(service, 1024);

    let response = router
        .oneshot(
            Request::post("/api/v1/screening/biometrics")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"age\": 4,"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert!(body["error"].is_string());
    assert_eq!(assessor.calls(), 0);
}

#[test]
fn intake_errors_map_to_distinct_statuses() {
    let empty = ScreeningServiceError::Intake(ValidationError::Empty {
        filename: "a.jpg".to_string(),
    });
    let large = ScreeningServiceError::Intake(ValidationError::TooLarge {
        filename: "a.jpg".to_string(),
        size: 20,
        limit: 10,
    });

    assert_eq!(status_for(&empty), StatusCode::BAD_REQUEST);
    assert_eq!(status_for(&large), StatusCode::PAYLOAD_TOO_LARGE);
}

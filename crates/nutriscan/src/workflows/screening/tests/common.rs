use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;
use tokio::sync::Notify;

use crate::config::IntakeConfig;
use crate::workflows::screening::biometrics::BiometricForm;
use crate::workflows::screening::domain::{ImageBlob, RequestTicket};
use crate::workflows::screening::intake::{FileCandidate, UploadIntake};
use crate::workflows::screening::machine::{Effect, Outcome, ScreeningWorkflow};
use crate::workflows::screening::remote::{
    AssessmentRequest, AssessmentResponse, ClassificationResponse, RemoteAssessmentService,
    RemoteError, RemoteImageClassifier,
};
use crate::workflows::screening::service::ScreeningService;
use crate::workflows::screening::view::RecordingPresenter;

pub(super) fn jpeg(filename: &str) -> ImageBlob {
    ImageBlob::new(
        filename.to_string(),
        "image/jpeg".to_string(),
        vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10],
    )
}

pub(super) fn jpeg_candidate(filename: &str) -> FileCandidate {
    FileCandidate::new(filename, "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
}

pub(super) fn prediction(label: &str, filename: &str) -> ClassificationResponse {
    ClassificationResponse {
        prediction: label.to_string(),
        filename: filename.to_string(),
    }
}

pub(super) fn underweight() -> AssessmentResponse {
    AssessmentResponse {
        bmi: 12.2,
        status: "Underweight".to_string(),
    }
}

pub(super) fn child_form() -> BiometricForm {
    BiometricForm::new("4", "M", "95", "11")
}

pub(super) fn offline(endpoint: &str) -> RemoteError {
    RemoteError::Transport {
        endpoint: endpoint.to_string(),
        message: "connection refused".to_string(),
    }
}

pub(super) fn workflow() -> (ScreeningWorkflow<RecordingPresenter>, Arc<RecordingPresenter>) {
    let presenter = Arc::new(RecordingPresenter::default());
    (ScreeningWorkflow::new(presenter.clone()), presenter)
}

pub(super) fn classify_ticket(outcome: &Outcome) -> RequestTicket {
    match outcome.effect() {
        Some(Effect::Classify { ticket, .. }) => *ticket,
        other => panic!("expected a classify effect, got {other:?}"),
    }
}

pub(super) fn assess_ticket(outcome: &Outcome) -> RequestTicket {
    match outcome.effect() {
        Some(Effect::Assess { ticket, .. }) => *ticket,
        other => panic!("expected an assess effect, got {other:?}"),
    }
}

/// Drive a fresh workflow to `Classified` with the given label.
pub(super) fn classified(
    label: &str,
    filename: &str,
) -> (ScreeningWorkflow<RecordingPresenter>, Arc<RecordingPresenter>) {
    let (mut workflow, presenter) = workflow();
    let outcome = workflow.on_image_ready(jpeg(filename)).expect("image accepted");
    let ticket = classify_ticket(&outcome);
    workflow
        .on_classified(ticket, prediction(label, filename))
        .expect("classification applied");
    (workflow, presenter)
}

#[derive(Default)]
pub(super) struct ScriptedClassifier {
    responses: Mutex<VecDeque<Result<ClassificationResponse, RemoteError>>>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub(super) fn answering(
        responses: impl IntoIterator<Item = Result<ClassificationResponse, RemoteError>>,
    ) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteImageClassifier for ScriptedClassifier {
    async fn classify(&self, _image: &ImageBlob) -> Result<ClassificationResponse, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .expect("classifier script poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(offline("/predict/image")))
    }
}

#[derive(Default)]
pub(super) struct ScriptedAssessor {
    responses: Mutex<VecDeque<Result<AssessmentResponse, RemoteError>>>,
    requests: Mutex<Vec<AssessmentRequest>>,
}

impl ScriptedAssessor {
    pub(super) fn answering(
        responses: impl IntoIterator<Item = Result<AssessmentResponse, RemoteError>>,
    ) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.requests.lock().expect("assessor log poisoned").len()
    }

    pub(super) fn requests(&self) -> Vec<AssessmentRequest> {
        self.requests.lock().expect("assessor log poisoned").clone()
    }
}

#[async_trait]
impl RemoteAssessmentService for ScriptedAssessor {
    async fn assess(
        &self,
        request: &AssessmentRequest,
    ) -> Result<AssessmentResponse, RemoteError> {
        self.requests
            .lock()
            .expect("assessor log poisoned")
            .push(request.clone());
        self.responses
            .lock()
            .expect("assessor script poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(offline("/predict/numeric")))
    }
}

/// Classifier that parks every call until the test releases it.
pub(super) struct GatedClassifier {
    pub(super) entered: Notify,
    pub(super) release: Notify,
    response: ClassificationResponse,
}

impl GatedClassifier {
    pub(super) fn new(response: ClassificationResponse) -> Self {
        Self {
            entered: Notify::new(),
            release: Notify::new(),
            response,
        }
    }
}

#[async_trait]
impl RemoteImageClassifier for GatedClassifier {
    async fn classify(&self, _image: &ImageBlob) -> Result<ClassificationResponse, RemoteError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.response.clone())
    }
}

pub(super) type ScriptedService =
    ScreeningService<ScriptedClassifier, ScriptedAssessor, RecordingPresenter>;

pub(super) fn build_service(
    classifier: ScriptedClassifier,
    assessor: ScriptedAssessor,
) -> (
    Arc<ScriptedService>,
    Arc<ScriptedClassifier>,
    Arc<ScriptedAssessor>,
    Arc<RecordingPresenter>,
) {
    let classifier = Arc::new(classifier);
    let assessor = Arc::new(assessor);
    let presenter = Arc::new(RecordingPresenter::default());
    let service = Arc::new(ScreeningService::new(
        UploadIntake::new(IntakeConfig::default()),
        classifier.clone(),
        assessor.clone(),
        presenter.clone(),
    ));
    (service, classifier, assessor, presenter)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

//! Photo screening workflow: upload intake, remote classification, and the
//! conditional biometric assessment that follows a "Malnourished" label.
//!
//! [`ScreeningWorkflow`] is the synchronous state machine and the single
//! source of truth for what is visible. [`ScreeningService`] drives it
//! against the remote models, and [`screening_router`] exposes the service
//! over HTTP.

pub mod biometrics;
pub mod domain;
pub mod intake;
pub mod machine;
pub mod remote;
pub mod router;
pub mod service;
pub mod view;

#[cfg(test)]
mod tests;

pub use biometrics::{BiometricField, BiometricForm, BiometricsError};
pub use domain::{
    AssessmentResult, Biometrics, ClassificationResult, Gender, ImageBlob, RequestKind,
    RequestTicket, ScanSession, Severity, Stage, HEALTHY_LABEL, MALNOURISHED_LABEL,
};
pub use intake::{FileCandidate, UploadIntake, ValidationError};
pub use machine::{Action, Effect, Outcome, ScreeningEvent, ScreeningWorkflow, WorkflowError};
pub use remote::{
    AssessmentRequest, AssessmentResponse, ClassificationResponse, HttpScreeningBackend,
    RemoteAssessmentService, RemoteError, RemoteImageClassifier, IMAGE_ENDPOINT, NUMERIC_ENDPOINT,
};
pub use router::{screening_router, FILENAME_HEADER};
pub use service::{ScreeningService, ScreeningServiceError};
pub use view::{
    Field, Notice, NoticeKind, Panel, RecordingPresenter, ResultPresenter, SeverityStyle,
    ViewModel,
};

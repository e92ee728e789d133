use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use super::biometrics::BiometricForm;
use super::domain::Stage;
use super::intake::{FileCandidate, UploadIntake, ValidationError};
use super::machine::{Effect, Outcome, ScreeningWorkflow, WorkflowError};
use super::remote::{RemoteAssessmentService, RemoteImageClassifier};
use super::view::{ResultPresenter, ViewModel};

/// Service composing the intake, the workflow, and both remote models.
///
/// The workflow lock is never held across a remote call, so a reset can
/// land while a request is in flight; the late response is then discarded
/// by the workflow's ticket check.
pub struct ScreeningService<C, A, P> {
    intake: UploadIntake,
    classifier: Arc<C>,
    assessor: Arc<A>,
    workflow: Mutex<ScreeningWorkflow<P>>,
}

impl<C, A, P> ScreeningService<C, A, P>
where
    C: RemoteImageClassifier + 'static,
    A: RemoteAssessmentService + 'static,
    P: ResultPresenter + 'static,
{
    pub fn new(
        intake: UploadIntake,
        classifier: Arc<C>,
        assessor: Arc<A>,
        presenter: Arc<P>,
    ) -> Self {
        Self {
            intake,
            classifier,
            assessor,
            workflow: Mutex::new(ScreeningWorkflow::new(presenter)),
        }
    }

    /// Validate an upload and run it through classification.
    ///
    /// A settled previous session is discarded first; an in-flight one
    /// makes the upload an invalid transition.
    pub async fn upload(
        &self,
        candidate: FileCandidate,
    ) -> Result<ViewModel, ScreeningServiceError> {
        let image = self.intake.submit(candidate)?;

        let outcome = {
            let mut workflow = self.workflow.lock().await;
            let stage = workflow.stage();
            if stage != Stage::Idle && !stage.is_in_flight() {
                info!(%stage, "new upload replaces settled session");
                workflow.reset();
            }
            workflow.on_image_ready(image)?
        };

        self.drive(outcome).await
    }

    /// Re-send the staged image after a failed classification.
    pub async fn retry_classification(&self) -> Result<ViewModel, ScreeningServiceError> {
        let outcome = self.workflow.lock().await.retry_classification()?;
        self.drive(outcome).await
    }

    pub async fn submit_biometrics(
        &self,
        form: &BiometricForm,
    ) -> Result<ViewModel, ScreeningServiceError> {
        let outcome = self.workflow.lock().await.on_assessment_requested(form)?;
        self.drive(outcome).await
    }

    pub async fn reset(&self) -> ViewModel {
        let mut workflow = self.workflow.lock().await;
        workflow.reset();
        workflow.view()
    }

    pub async fn current_view(&self) -> ViewModel {
        self.workflow.lock().await.view()
    }

    pub async fn stage(&self) -> Stage {
        self.workflow.lock().await.stage()
    }

    async fn drive(&self, outcome: Outcome) -> Result<ViewModel, ScreeningServiceError> {
        let Some(effect) = outcome.into_effect() else {
            return Ok(self.current_view().await);
        };

        let settled = match effect {
            Effect::Classify { ticket, image } => {
                let result = self.classifier.classify(&image).await;
                let mut workflow = self.workflow.lock().await;
                match result {
                    Ok(response) => workflow.on_classified(ticket, response)?,
                    Err(error) => workflow.on_classification_failed(ticket, error)?,
                }
            }
            Effect::Assess { ticket, request } => {
                let result = self.assessor.assess(&request).await;
                let mut workflow = self.workflow.lock().await;
                match result {
                    Ok(response) => workflow.on_assessed(ticket, response)?,
                    Err(error) => workflow.on_assessment_failed(ticket, error)?,
                }
            }
        };

        match settled {
            Outcome::Applied { view, .. } => Ok(view),
            Outcome::Discarded { .. } => Ok(self.current_view().await),
        }
    }
}

/// Error raised by the screening service.
#[derive(Debug, thiserror::Error)]
pub enum ScreeningServiceError {
    #[error(transparent)]
    Intake(#[from] ValidationError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::biometrics::{BiometricForm, BiometricsError};
use super::domain::{
    AssessmentResult, ClassificationResult, ImageBlob, RequestKind, RequestTicket, ScanSession,
    Severity, Stage,
};
use super::remote::{AssessmentRequest, AssessmentResponse, ClassificationResponse, RemoteError};
use super::view::{Field, Notice, Panel, ResultPresenter, ViewModel};

/// Everything that can happen to a screening workflow.
#[derive(Debug, Clone)]
pub enum ScreeningEvent {
    ImageReady(ImageBlob),
    Classified {
        ticket: RequestTicket,
        response: ClassificationResponse,
    },
    ClassificationFailed {
        ticket: RequestTicket,
        error: RemoteError,
    },
    RetryClassification,
    AssessmentRequested(BiometricForm),
    Assessed {
        ticket: RequestTicket,
        response: AssessmentResponse,
    },
    AssessmentFailed {
        ticket: RequestTicket,
        error: RemoteError,
    },
    Reset,
}

/// Remote call the caller must perform, then report back with the ticket.
#[derive(Debug, Clone)]
pub enum Effect {
    Classify {
        ticket: RequestTicket,
        image: ImageBlob,
    },
    Assess {
        ticket: RequestTicket,
        request: AssessmentRequest,
    },
}

impl Effect {
    pub fn ticket(&self) -> RequestTicket {
        match self {
            Self::Classify { ticket, .. } | Self::Assess { ticket, .. } => *ticket,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Outcome {
    /// The transition ran and `view` reflects the new state.
    Applied {
        view: ViewModel,
        effect: Option<Effect>,
    },
    /// A response for a superseded request was dropped untouched.
    Discarded { ticket: RequestTicket },
}

impl Outcome {
    pub fn view(&self) -> Option<&ViewModel> {
        match self {
            Self::Applied { view, .. } => Some(view),
            Self::Discarded { .. } => None,
        }
    }

    pub fn effect(&self) -> Option<&Effect> {
        match self {
            Self::Applied { effect, .. } => effect.as_ref(),
            Self::Discarded { .. } => None,
        }
    }

    pub fn into_effect(self) -> Option<Effect> {
        match self {
            Self::Applied { effect, .. } => effect,
            Self::Discarded { .. } => None,
        }
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, Self::Discarded { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SelectImage,
    ApplyClassification,
    FailClassification,
    RetryClassification,
    RequestAssessment,
    ApplyAssessment,
    FailAssessment,
}

impl Action {
    pub const fn label(self) -> &'static str {
        match self {
            Self::SelectImage => "select an image",
            Self::ApplyClassification => "apply a classification",
            Self::FailClassification => "fail a classification",
            Self::RetryClassification => "retry classification",
            Self::RequestAssessment => "request an assessment",
            Self::ApplyAssessment => "apply an assessment",
            Self::FailAssessment => "fail an assessment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("cannot {} while the workflow is {stage}", .action.label())]
    InvalidTransition { stage: Stage, action: Action },
    #[error("invalid biometrics: {0}")]
    InvalidBiometrics(#[from] BiometricsError),
}

/// Screening state machine over one owned [`ScanSession`].
///
/// Transitions are synchronous. Network work is handed back as an
/// [`Effect`] and its result re-enters through the matching `on_*` call
/// carrying the effect's ticket; results for tickets that are no longer
/// outstanding are discarded.
pub struct ScreeningWorkflow<P> {
    presenter: Arc<P>,
    session: Option<ScanSession>,
    outstanding: Option<RequestTicket>,
    next_sequence: u64,
    notice: Option<Notice>,
}

impl<P> ScreeningWorkflow<P>
where
    P: ResultPresenter,
{
    pub fn new(presenter: Arc<P>) -> Self {
        Self {
            presenter,
            session: None,
            outstanding: None,
            next_sequence: 0,
            notice: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.session
            .as_ref()
            .map(ScanSession::stage)
            .unwrap_or(Stage::Idle)
    }

    pub fn session(&self) -> Option<&ScanSession> {
        self.session.as_ref()
    }

    pub fn outstanding(&self) -> Option<RequestTicket> {
        self.outstanding
    }

    pub fn handle(&mut self, event: ScreeningEvent) -> Result<Outcome, WorkflowError> {
        match event {
            ScreeningEvent::ImageReady(image) => self.on_image_ready(image),
            ScreeningEvent::Classified { ticket, response } => self.on_classified(ticket, response),
            ScreeningEvent::ClassificationFailed { ticket, error } => {
                self.on_classification_failed(ticket, error)
            }
            ScreeningEvent::RetryClassification => self.retry_classification(),
            ScreeningEvent::AssessmentRequested(form) => self.on_assessment_requested(&form),
            ScreeningEvent::Assessed { ticket, response } => self.on_assessed(ticket, response),
            ScreeningEvent::AssessmentFailed { ticket, error } => {
                self.on_assessment_failed(ticket, error)
            }
            ScreeningEvent::Reset => Ok(self.reset()),
        }
    }

    pub fn on_image_ready(&mut self, image: ImageBlob) -> Result<Outcome, WorkflowError> {
        self.expect_stage(Stage::Idle, Action::SelectImage)?;

        let mut session = ScanSession::new(image);
        debug!(
            filename = session.image.filename(),
            bytes = session.image.len(),
            stage = %session.stage,
            "image staged"
        );

        let ticket = issue_ticket(
            &mut self.next_sequence,
            &mut self.outstanding,
            RequestKind::Classification,
        );
        session.stage = Stage::Classifying;
        let effect = Effect::Classify {
            ticket,
            image: session.image.clone(),
        };
        info!(
            sequence = ticket.sequence,
            filename = session.image.filename(),
            "classification requested"
        );

        self.session = Some(session);
        self.notice = None;
        Ok(self.applied(Some(effect)))
    }

    pub fn retry_classification(&mut self) -> Result<Outcome, WorkflowError> {
        let session = session_in(
            &mut self.session,
            Stage::ImageSelected,
            Action::RetryClassification,
        )?;

        let ticket = issue_ticket(
            &mut self.next_sequence,
            &mut self.outstanding,
            RequestKind::Classification,
        );
        session.stage = Stage::Classifying;
        let effect = Effect::Classify {
            ticket,
            image: session.image.clone(),
        };
        info!(sequence = ticket.sequence, "classification retried");

        self.notice = None;
        Ok(self.applied(Some(effect)))
    }

    pub fn on_classified(
        &mut self,
        ticket: RequestTicket,
        response: ClassificationResponse,
    ) -> Result<Outcome, WorkflowError> {
        if !self.accept(ticket, Stage::Classifying, Action::ApplyClassification)? {
            return Ok(Outcome::Discarded { ticket });
        }

        let session = session_in(
            &mut self.session,
            Stage::Classifying,
            Action::ApplyClassification,
        )?;
        let ClassificationResponse {
            prediction,
            filename,
        } = response;
        let filename = if filename.trim().is_empty() {
            session.image.filename().to_string()
        } else {
            filename
        };

        let classification = ClassificationResult {
            severity: Severity::from_label(&prediction),
            confidence: session.image.placeholder_confidence(),
            findings: vec![format!("Uploaded Image: {filename}")],
            label: prediction,
        };
        info!(
            sequence = ticket.sequence,
            label = %classification.label,
            severity = classification.severity.label(),
            "classification applied"
        );
        session.classification = Some(classification);
        session.stage = Stage::Classified;

        self.outstanding = None;
        self.notice = None;
        Ok(self.applied(None))
    }

    pub fn on_classification_failed(
        &mut self,
        ticket: RequestTicket,
        error: RemoteError,
    ) -> Result<Outcome, WorkflowError> {
        if !self.accept(ticket, Stage::Classifying, Action::FailClassification)? {
            return Ok(Outcome::Discarded { ticket });
        }

        let session = session_in(
            &mut self.session,
            Stage::Classifying,
            Action::FailClassification,
        )?;
        session.stage = Stage::ImageSelected;
        warn!(sequence = ticket.sequence, %error, "classification failed");

        self.outstanding = None;
        self.notice = Some(Notice::classification_failed());
        Ok(self.applied(None))
    }

    pub fn on_assessment_requested(
        &mut self,
        form: &BiometricForm,
    ) -> Result<Outcome, WorkflowError> {
        let stage = self.stage();
        let eligible = self
            .session
            .as_ref()
            .is_some_and(ScanSession::requires_assessment);
        if stage != Stage::Classified || !eligible {
            return Err(WorkflowError::InvalidTransition {
                stage,
                action: Action::RequestAssessment,
            });
        }

        let biometrics = form.validate()?;
        let session = session_in(
            &mut self.session,
            Stage::Classified,
            Action::RequestAssessment,
        )?;

        let ticket = issue_ticket(
            &mut self.next_sequence,
            &mut self.outstanding,
            RequestKind::Assessment,
        );
        let request = AssessmentRequest::from(&biometrics);
        session.biometrics = Some(biometrics);
        session.stage = Stage::AssessmentPending;
        info!(sequence = ticket.sequence, "assessment requested");

        self.notice = None;
        Ok(self.applied(Some(Effect::Assess { ticket, request })))
    }

    pub fn on_assessed(
        &mut self,
        ticket: RequestTicket,
        response: AssessmentResponse,
    ) -> Result<Outcome, WorkflowError> {
        if !self.accept(ticket, Stage::AssessmentPending, Action::ApplyAssessment)? {
            return Ok(Outcome::Discarded { ticket });
        }

        let session = session_in(
            &mut self.session,
            Stage::AssessmentPending,
            Action::ApplyAssessment,
        )?;
        info!(
            sequence = ticket.sequence,
            bmi = response.bmi,
            status = %response.status,
            "assessment applied"
        );
        session.assessment = Some(AssessmentResult {
            bmi: response.bmi,
            status: response.status,
        });
        session.stage = Stage::Assessed;

        self.outstanding = None;
        self.notice = None;
        Ok(self.applied(None))
    }

    pub fn on_assessment_failed(
        &mut self,
        ticket: RequestTicket,
        error: RemoteError,
    ) -> Result<Outcome, WorkflowError> {
        if !self.accept(ticket, Stage::AssessmentPending, Action::FailAssessment)? {
            return Ok(Outcome::Discarded { ticket });
        }

        let session = session_in(
            &mut self.session,
            Stage::AssessmentPending,
            Action::FailAssessment,
        )?;
        session.biometrics = None;
        session.stage = Stage::Classified;
        warn!(sequence = ticket.sequence, %error, "assessment failed");

        self.outstanding = None;
        self.notice = Some(Notice::assessment_failed());
        Ok(self.applied(None))
    }

    /// Drop the session and any outstanding request. Already-idle resets
    /// emit nothing.
    pub fn reset(&mut self) -> Outcome {
        let pristine =
            self.session.is_none() && self.outstanding.is_none() && self.notice.is_none();
        if pristine {
            return Outcome::Applied {
                view: ViewModel::idle(),
                effect: None,
            };
        }

        if let Some(ticket) = self.outstanding.take() {
            info!(sequence = ticket.sequence, "outstanding request abandoned by reset");
        }
        if let Some(session) = self.session.take() {
            info!(
                stage = %session.stage,
                started_at = %session.started_at,
                "session discarded"
            );
        }
        self.notice = None;
        self.applied(None)
    }

    /// Project the current state into what should be on screen.
    pub fn view(&self) -> ViewModel {
        let mut view = ViewModel::idle();
        view.notice = self.notice.clone();

        let Some(session) = &self.session else {
            return view;
        };

        view.stage = session.stage;
        view.upload_prompt_visible = false;
        view.busy = session.stage.is_in_flight();

        if let Some(classification) = &session.classification {
            view.visible_panels.insert(Panel::Results);
            view.field_values
                .insert(Field::Classification, classification.label.clone());
            view.field_values
                .insert(Field::Confidence, format!("{}%", classification.confidence));
            view.field_values.insert(
                Field::Severity,
                classification.severity.label().to_string(),
            );
            view.findings = classification.findings.clone();
            view.severity_style = classification.severity.into();

            let form_stage = matches!(
                session.stage,
                Stage::Classified | Stage::AssessmentPending
            );
            if form_stage && classification.requires_assessment() {
                view.visible_panels.insert(Panel::BiometricForm);
            }
        }

        if let Some(assessment) = &session.assessment {
            let bmi = assessment.bmi.to_string();
            view.visible_panels.insert(Panel::AssessmentMetrics);
            view.field_values.insert(Field::Bmi, bmi.clone());
            for field in [Field::Status, Field::WeightStatus, Field::HeightStatus] {
                view.field_values.insert(field, assessment.status.clone());
            }
            view.findings = vec![
                format!("Assessment: {}", assessment.status),
                format!("BMI: {bmi}"),
            ];
        }

        view
    }

    fn expect_stage(&self, expected: Stage, action: Action) -> Result<(), WorkflowError> {
        let stage = self.stage();
        if stage == expected {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition { stage, action })
        }
    }

    /// `Ok(true)` applies the response, `Ok(false)` discards it as stale.
    fn accept(
        &self,
        ticket: RequestTicket,
        expected: Stage,
        action: Action,
    ) -> Result<bool, WorkflowError> {
        let stage = self.stage();
        if self.outstanding == Some(ticket) {
            return if stage == expected {
                Ok(true)
            } else {
                Err(WorkflowError::InvalidTransition { stage, action })
            };
        }

        if ticket.sequence < self.next_sequence {
            warn!(
                sequence = ticket.sequence,
                kind = ?ticket.kind,
                stage = %stage,
                "discarding response for superseded request"
            );
            return Ok(false);
        }

        Err(WorkflowError::InvalidTransition { stage, action })
    }

    fn applied(&self, effect: Option<Effect>) -> Outcome {
        let view = self.view();
        debug!(stage = %view.stage, panels = ?view.visible_panels, "emitting view");
        self.presenter.present(&view);
        Outcome::Applied { view, effect }
    }
}

fn issue_ticket(
    next_sequence: &mut u64,
    outstanding: &mut Option<RequestTicket>,
    kind: RequestKind,
) -> RequestTicket {
    let ticket = RequestTicket {
        sequence: *next_sequence,
        kind,
    };
    *next_sequence += 1;
    *outstanding = Some(ticket);
    ticket
}

fn session_in(
    session: &mut Option<ScanSession>,
    expected: Stage,
    action: Action,
) -> Result<&mut ScanSession, WorkflowError> {
    match session {
        Some(session) => {
            if session.stage == expected {
                Ok(session)
            } else {
                Err(WorkflowError::InvalidTransition {
                    stage: session.stage,
                    action,
                })
            }
        }
        None => Err(WorkflowError::InvalidTransition {
            stage: Stage::Idle,
            action,
        }),
    }
}

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use nutriscan::workflows::screening::{
    AssessmentRequest, AssessmentResponse, ClassificationResponse, ImageBlob,
    RemoteAssessmentService, RemoteError, RemoteImageClassifier, ResultPresenter, ViewModel,
    IMAGE_ENDPOINT, NUMERIC_ENDPOINT,
};
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Presenter for the HTTP service: clients poll the view, so views only go to the log.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LogPresenter;

impl ResultPresenter for LogPresenter {
    fn present(&self, view: &ViewModel) {
        info!(
            stage = %view.stage,
            panels = view.visible_panels.len(),
            busy = view.busy,
            notice = view.notice.as_ref().map(|notice| notice.message.as_str()),
            "screening view updated"
        );
    }
}

/// Offline stand-in for the model server used by the demo.
///
/// Classifications are served from a script; an exhausted script behaves
/// like an unreachable backend. Assessments compute BMI locally.
#[derive(Default)]
pub(crate) struct OfflineModel {
    predictions: Mutex<VecDeque<Option<String>>>,
}

impl OfflineModel {
    /// `None` entries simulate a dropped connection for that call.
    pub(crate) fn scripted(predictions: impl IntoIterator<Item = Option<&'static str>>) -> Self {
        Self {
            predictions: Mutex::new(
                predictions
                    .into_iter()
                    .map(|label| label.map(str::to_string))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl RemoteImageClassifier for OfflineModel {
    async fn classify(&self, image: &ImageBlob) -> Result<ClassificationResponse, RemoteError> {
        let next = match self.predictions.lock() {
            Ok(mut script) => script.pop_front().flatten(),
            Err(_) => None,
        };

        next.map(|prediction| ClassificationResponse {
            prediction,
            filename: image.filename().to_string(),
        })
        .ok_or_else(|| RemoteError::Transport {
            endpoint: IMAGE_ENDPOINT.to_string(),
            message: "offline model has no answer scripted".to_string(),
        })
    }
}

#[async_trait]
impl RemoteAssessmentService for OfflineModel {
    async fn assess(
        &self,
        request: &AssessmentRequest,
    ) -> Result<AssessmentResponse, RemoteError> {
        let height_m = request.height / 100.0;
        if height_m <= 0.0 {
            return Err(RemoteError::Status {
                endpoint: NUMERIC_ENDPOINT.to_string(),
                status: 422,
            });
        }

        let bmi = (request.weight / (height_m * height_m) * 10.0).round() / 10.0;
        Ok(AssessmentResponse {
            bmi,
            status: bmi_status(bmi).to_string(),
        })
    }
}

pub(crate) fn bmi_status(bmi: f64) -> &'static str {
    if bmi < 14.0 {
        "Underweight"
    } else if bmi <= 18.0 {
        "Normal"
    } else {
        "Overweight"
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::domain::{Severity, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Results,
    BiometricForm,
    AssessmentMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Classification,
    Confidence,
    Severity,
    Bmi,
    Status,
    WeightStatus,
    HeightStatus,
}

/// Styling bucket for the severity readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityStyle {
    Neutral,
    Healthy,
    Moderate,
    Severe,
}

impl From<Severity> for SeverityStyle {
    fn from(value: Severity) -> Self {
        match value {
            Severity::None => Self::Healthy,
            Severity::Moderate => Self::Moderate,
            Severity::Severe => Self::Severe,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    ClassificationFailed,
    AssessmentFailed,
}

/// User-facing failure message, shown once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn classification_failed() -> Self {
        Self {
            kind: NoticeKind::ClassificationFailed,
            message: "Image analysis failed. Check backend connection.".to_string(),
        }
    }

    pub fn assessment_failed() -> Self {
        Self {
            kind: NoticeKind::AssessmentFailed,
            message: "Numeric assessment failed. Check backend.".to_string(),
        }
    }
}

/// Everything a presenter needs to draw the page for one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub stage: Stage,
    pub visible_panels: BTreeSet<Panel>,
    pub field_values: BTreeMap<Field, String>,
    pub findings: Vec<String>,
    pub severity_style: SeverityStyle,
    pub upload_prompt_visible: bool,
    pub busy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

impl ViewModel {
    /// Upload prompt only; nothing selected.
    pub fn idle() -> Self {
        Self {
            stage: Stage::Idle,
            visible_panels: BTreeSet::new(),
            field_values: BTreeMap::new(),
            findings: Vec::new(),
            severity_style: SeverityStyle::Neutral,
            upload_prompt_visible: true,
            busy: false,
            notice: None,
        }
    }

    pub fn shows(&self, panel: Panel) -> bool {
        self.visible_panels.contains(&panel)
    }

    pub fn field(&self, field: Field) -> Option<&str> {
        self.field_values.get(&field).map(String::as_str)
    }
}

/// Renders view-models. Implementations must not decide visibility.
pub trait ResultPresenter: Send + Sync {
    fn present(&self, view: &ViewModel);
}

/// Keeps every emitted view in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingPresenter {
    views: Arc<Mutex<Vec<ViewModel>>>,
}

impl RecordingPresenter {
    pub fn views(&self) -> Vec<ViewModel> {
        self.views
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<ViewModel> {
        self.views
            .lock()
            .ok()
            .and_then(|guard| guard.last().cloned())
    }

    pub fn len(&self) -> usize {
        self.views.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultPresenter for RecordingPresenter {
    fn present(&self, view: &ViewModel) {
        if let Ok(mut guard) = self.views.lock() {
            guard.push(view.clone());
        }
    }
}

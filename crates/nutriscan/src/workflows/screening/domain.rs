use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classifier label that ends the workflow at `Classified` with no follow-up.
pub const HEALTHY_LABEL: &str = "Healthy";
/// Classifier label that unlocks the biometric assessment branch.
pub const MALNOURISHED_LABEL: &str = "Malnourished";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    ImageSelected,
    Classifying,
    Classified,
    AssessmentPending,
    Assessed,
}

impl Stage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::ImageSelected => "Image Selected",
            Self::Classifying => "Classifying",
            Self::Classified => "Classified",
            Self::AssessmentPending => "Assessment Pending",
            Self::Assessed => "Assessed",
        }
    }

    /// A remote request is outstanding.
    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::Classifying | Self::AssessmentPending)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Severity derived from the classifier label.
///
/// `Severe` has styling but no producing rule: the classifier only ever
/// yields a label, and every non-healthy label maps to `Moderate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Moderate,
    Severe,
}

impl Severity {
    pub fn from_label(label: &str) -> Self {
        if label == HEALTHY_LABEL {
            Self::None
        } else {
            Self::Moderate
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
        }
    }
}

/// Staged image owned by the live session.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBlob {
    filename: String,
    media_type: String,
    bytes: Vec<u8>,
}

impl ImageBlob {
    pub(crate) fn new(filename: String, media_type: String, bytes: Vec<u8>) -> Self {
        Self {
            filename,
            media_type,
            bytes,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Stand-in confidence in the 90..=99 range.
    ///
    /// The classifier reports no confidence; this value is for display only
    /// and is derived from the image bytes so it is stable per image.
    pub fn placeholder_confidence(&self) -> u8 {
        let checksum = self
            .bytes
            .iter()
            .fold(0u32, |acc, byte| acc.wrapping_add(u32::from(*byte)));
        90 + (checksum % 10) as u8
    }
}

impl fmt::Debug for ImageBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBlob")
            .field("filename", &self.filename)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    /// Display placeholder, see [`ImageBlob::placeholder_confidence`].
    pub confidence: u8,
    pub severity: Severity,
    pub findings: Vec<String>,
}

impl ClassificationResult {
    pub fn requires_assessment(&self) -> bool {
        self.label == MALNOURISHED_LABEL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }
}

/// Validated child measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Biometrics {
    pub age: f64,
    pub gender: Gender,
    pub height: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub bmi: f64,
    pub status: String,
}

/// Identifies one outstanding remote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestTicket {
    pub sequence: u64,
    pub kind: RequestKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Classification,
    Assessment,
}

/// The single live unit of work.
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub(crate) stage: Stage,
    pub(crate) image: ImageBlob,
    pub(crate) classification: Option<ClassificationResult>,
    pub(crate) biometrics: Option<Biometrics>,
    pub(crate) assessment: Option<AssessmentResult>,
    pub(crate) started_at: DateTime<Utc>,
}

impl ScanSession {
    pub(crate) fn new(image: ImageBlob) -> Self {
        Self {
            stage: Stage::ImageSelected,
            image,
            classification: None,
            biometrics: None,
            assessment: None,
            started_at: Utc::now(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn image(&self) -> &ImageBlob {
        &self.image
    }

    pub fn classification(&self) -> Option<&ClassificationResult> {
        self.classification.as_ref()
    }

    pub fn biometrics(&self) -> Option<&Biometrics> {
        self.biometrics.as_ref()
    }

    pub fn assessment(&self) -> Option<&AssessmentResult> {
        self.assessment.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub(crate) fn requires_assessment(&self) -> bool {
        self.classification
            .as_ref()
            .is_some_and(ClassificationResult::requires_assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_none_only_for_exact_healthy_label() {
        assert_eq!(Severity::from_label("Healthy"), Severity::None);
        assert_eq!(Severity::from_label("healthy"), Severity::Moderate);
        assert_eq!(Severity::from_label("Malnourished"), Severity::Moderate);
        assert_eq!(Severity::from_label(""), Severity::Moderate);
    }

    #[test]
    fn placeholder_confidence_stays_in_display_range() {
        for bytes in [vec![], vec![0u8; 3], vec![255u8; 1024], b"jpeg".to_vec()] {
            let blob = ImageBlob::new("x.jpg".into(), "image/jpeg".into(), bytes);
            let confidence = blob.placeholder_confidence();
            assert!((90..=99).contains(&confidence), "got {confidence}");
        }
    }

    #[test]
    fn gender_serializes_as_single_letter_codes() {
        let json = serde_json::to_string(&Gender::Female).expect("serialize gender");
        assert_eq!(json, "\"F\"");
        assert_eq!(Gender::Male.code(), "M");
    }

    #[test]
    fn image_debug_omits_raw_bytes() {
        let blob = ImageBlob::new("b.jpg".into(), "image/jpeg".into(), vec![1, 2, 3]);
        let rendered = format!("{blob:?}");
        assert!(rendered.contains("len: 3"));
        assert!(!rendered.contains("[1, 2, 3]"));
    }
}

//! Diagnosis and risk taxonomies, and the danger surjection between them.
//!
//! Both catalogues are fixed, ordered arrays indexed by small integers. The classifier's
//! output vector is ordered by [`DIAGNOSIS_CLASSES`], and the reduced risk vector by
//! [`RISK_LEVELS`].

use crate::constants::{DIAGNOSIS_CLASS_COUNT, RISK_LEVEL_COUNT};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A fine-grained skin-lesion class distinguished by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosisClass {
    pub index: usize,
    /// Short code used in the HAM10000 labelling, for example `mel`.
    pub code: &'static str,
    pub full_name: &'static str,
    pub description: &'static str,
}

/// Display colour attached to a risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskColor {
    Green,
    Yellow,
    Orange,
    Red,
}

/// How quickly the patient should be seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    VeryLow,
    Low,
    Medium,
    High,
}

/// A coarse danger tier used for triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskLevel {
    pub level: u8,
    pub name: &'static str,
    pub description: &'static str,
    pub recommendation: &'static str,
    pub color: RiskColor,
    pub urgency: Urgency,
}

pub static DIAGNOSIS_CLASSES: [DiagnosisClass; DIAGNOSIS_CLASS_COUNT] = [
    DiagnosisClass {
        index: 0,
        code: "df",
        full_name: "Dermatofibroma",
        description: "Dermatofibroma, the least dangerous lesion type",
    },
    DiagnosisClass {
        index: 1,
        code: "vasc",
        full_name: "Vascular Lesions",
        description: "Vascular lesions",
    },
    DiagnosisClass {
        index: 2,
        code: "bkl",
        full_name: "Benign Keratosis",
        description: "Benign keratosis",
    },
    DiagnosisClass {
        index: 3,
        code: "nv",
        full_name: "Melanocytic Nevi",
        description: "Moles (require monitoring)",
    },
    DiagnosisClass {
        index: 4,
        code: "akiec",
        full_name: "Actinic Keratoses",
        description: "Actinic keratosis (precancerous)",
    },
    DiagnosisClass {
        index: 5,
        code: "bcc",
        full_name: "Basal Cell Carcinoma",
        description: "Basal cell carcinoma",
    },
    DiagnosisClass {
        index: 6,
        code: "mel",
        full_name: "Melanoma",
        description: "Melanoma, the most dangerous lesion type",
    },
];

pub static RISK_LEVELS: [RiskLevel; RISK_LEVEL_COUNT] = [
    RiskLevel {
        level: 0,
        name: "All clear",
        description: "Benign lesion with no signs of malignancy",
        recommendation: "No scheduled follow-up required. An annual dermatologist check-up is recommended.",
        color: RiskColor::Green,
        urgency: Urgency::VeryLow,
    },
    RiskLevel {
        level: 1,
        name: "Requires monitoring",
        description: "Precancerous condition or lesion that needs monitoring",
        recommendation: "Routine dermatologist consultation is recommended (within 1-2 months).",
        color: RiskColor::Yellow,
        urgency: Urgency::Low,
    },
    RiskLevel {
        level: 2,
        name: "Dangerous",
        description: "Low-grade malignancy, treatment required",
        recommendation: "Urgent oncologist consultation within 2-4 weeks. Biopsy required.",
        color: RiskColor::Orange,
        urgency: Urgency::Medium,
    },
    RiskLevel {
        level: 3,
        name: "Very dangerous",
        description: "High-grade malignancy (melanoma), immediate treatment required",
        recommendation: "See an oncologist IMMEDIATELY. Urgent biopsy and treatment required.",
        color: RiskColor::Red,
        urgency: Urgency::High,
    },
];

/// Risk level index for each diagnosis index.
///
/// Total over all diagnosis classes; several classes share level 0.
pub static DANGER_SURJECTION: [usize; DIAGNOSIS_CLASS_COUNT] = [
    0, // df
    0, // vasc
    0, // bkl
    0, // nv
    1, // akiec
    2, // bcc
    3, // mel
];

pub fn diagnosis_classes() -> &'static [DiagnosisClass] {
    &DIAGNOSIS_CLASSES
}

pub fn risk_levels() -> &'static [RiskLevel] {
    &RISK_LEVELS
}

impl DiagnosisClass {
    /// Risk level index this class reduces to.
    pub fn danger_level(&self) -> usize {
        DANGER_SURJECTION[self.index]
    }

    pub fn risk(&self) -> &'static RiskLevel {
        &RISK_LEVELS[self.danger_level()]
    }
}

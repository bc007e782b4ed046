//! Categorical metadata codec.
//!
//! The classifier consumes sex, body-site localization and diagnosis-confirmation type as
//! small integer codes. This module owns the fixed name <-> code tables for those three fields.
//!
//! - [`CategoricalField::encode`] is strict: a name outside the table is a caller error.
//! - [`CategoricalField::decode`] is fail-soft: a code outside the table yields
//!   [`UNKNOWN_CATEGORY`]. Decoding is only used to echo metadata back to humans.
//!
//! Tables are `static` slices and never change after compilation.

use crate::constants::UNKNOWN_CATEGORY;
use crate::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One row of a categorical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryEntry {
    pub name: &'static str,
    pub code: u8,
    pub description: &'static str,
}

const fn entry(name: &'static str, code: u8, description: &'static str) -> CategoryEntry {
    CategoryEntry {
        name,
        code,
        description,
    }
}

static SEX: [CategoryEntry; 3] = [
    entry("male", 0, "Male"),
    entry("female", 1, "Female"),
    entry("unknown", 2, "Unknown"),
];

static LOCALIZATION: [CategoryEntry; 15] = [
    entry("unknown", 0, "Unknown localization"),
    entry("genital", 1, "Genitals (rare, but important)"),
    entry("acral", 2, "Acral areas (palms, soles), melanoma risk"),
    entry("foot", 3, "Feet"),
    entry("hand", 4, "Hands"),
    entry("lower extremity", 5, "Lower extremities"),
    entry("upper extremity", 6, "Upper extremities"),
    entry("abdomen", 7, "Abdomen"),
    entry("chest", 8, "Chest"),
    entry("trunk", 9, "Trunk"),
    entry("back", 10, "Back"),
    entry("neck", 11, "Neck"),
    entry("ear", 12, "Ears"),
    entry("face", 13, "Face"),
    entry("scalp", 14, "Scalp (high risk)"),
];

static DX_TYPE: [CategoryEntry; 4] = [
    entry("follow_up", 0, "Follow-up examination (less reliable method)"),
    entry("consensus", 1, "Expert consensus (high reliability)"),
    entry("confocal", 2, "Confocal microscopy (high reliability)"),
    entry("histo", 3, "Histopathological confirmation (most reliable method)"),
];

/// The three categorical metadata fields accepted by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    Sex,
    Localization,
    DxType,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 3] = [
        CategoricalField::Sex,
        CategoricalField::Localization,
        CategoricalField::DxType,
    ];

    /// The table rows for this field, ordered by code.
    pub fn entries(self) -> &'static [CategoryEntry] {
        match self {
            CategoricalField::Sex => &SEX,
            CategoricalField::Localization => &LOCALIZATION,
            CategoricalField::DxType => &DX_TYPE,
        }
    }

    /// Wire name of the field, as used in request bodies and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            CategoricalField::Sex => "sex",
            CategoricalField::Localization => "localization",
            CategoricalField::DxType => "dx_type",
        }
    }

    /// Map a category name to its code.
    ///
    /// Surrounding whitespace and ASCII case are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::UnknownCategory`] if `name` is not in the table.
    pub fn encode(self, name: &str) -> TriageResult<u8> {
        let wanted = name.trim();
        self.entries()
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(wanted))
            .map(|e| e.code)
            .ok_or_else(|| TriageError::UnknownCategory {
                field: self,
                name: name.to_owned(),
            })
    }

    /// Map a code back to its category name, or [`UNKNOWN_CATEGORY`] if it has no entry.
    pub fn decode(self, code: u8) -> &'static str {
        self.lookup(code).map_or(UNKNOWN_CATEGORY, |e| e.name)
    }

    /// Human-readable description for a code.
    pub fn describe(self, code: u8) -> &'static str {
        match self.lookup(code) {
            Some(e) => e.description,
            None => match self {
                CategoricalField::Sex => "Unknown",
                CategoricalField::Localization => "Unknown localization",
                CategoricalField::DxType => "Unknown diagnostic method",
            },
        }
    }

    /// Interpret free-form caller input as a code.
    ///
    /// Numeric input is returned unchanged (range checks belong to the validator); anything
    /// else is treated as a category name and encoded.
    pub fn resolve(self, input: &str) -> TriageResult<f64> {
        let trimmed = input.trim();
        match trimmed.parse::<f64>() {
            Ok(value) => Ok(value),
            Err(_) => self.encode(trimmed).map(f64::from),
        }
    }

    fn lookup(self, code: u8) -> Option<&'static CategoryEntry> {
        self.entries().iter().find(|e| e.code == code)
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoricalField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "sex" => Ok(CategoricalField::Sex),
            "localization" | "localisation" => Ok(CategoricalField::Localization),
            "dx_type" | "dxtype" => Ok(CategoricalField::DxType),
            other => Err(format!(
                "unknown categorical field '{other}' (expected sex, localization or dx_type)"
            )),
        }
    }
}

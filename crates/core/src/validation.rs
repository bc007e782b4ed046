//! Input validation utilities.
//!
//! Patient metadata arrives as plain numbers (form fields, JSON, CLI arguments). This module
//! checks those numbers before they are handed to the classifier and produces a
//! [`PatientMetadata`] value that can only exist once validation has passed.

use crate::codec::CategoricalField;
use crate::constants::{MAX_AGE_YEARS, METADATA_DIM};
use crate::ValidationError;
use serde::Serialize;

/// Validates the four metadata inputs.
///
/// Checks run in a fixed order (age, sex, localization, dx-type) and the first violation is
/// returned. Categorical codes must be whole numbers within their table; the accepted ranges
/// come from the codec tables themselves.
///
/// # Errors
///
/// Returns the [`ValidationError`] for the first failing check.
pub fn validate_metadata(
    age: f64,
    sex: f64,
    localization: f64,
    dx_type: f64,
) -> Result<(), ValidationError> {
    if !(0.0..=MAX_AGE_YEARS).contains(&age) {
        return Err(ValidationError::AgeOutOfRange(age));
    }

    if !is_code_of(CategoricalField::Sex, sex) {
        return Err(ValidationError::InvalidSex(sex));
    }

    if !is_code_of(CategoricalField::Localization, localization) {
        return Err(ValidationError::LocalizationOutOfRange(localization));
    }

    if !is_code_of(CategoricalField::DxType, dx_type) {
        return Err(ValidationError::InvalidDxType(dx_type));
    }

    Ok(())
}

fn is_code_of(field: CategoricalField, value: f64) -> bool {
    value.is_finite()
        && value.fract() == 0.0
        && field
            .entries()
            .iter()
            .any(|e| f64::from(e.code) == value)
}

/// Validated patient metadata for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PatientMetadata {
    age: f64,
    sex: u8,
    localization: u8,
    dx_type: u8,
}

impl PatientMetadata {
    /// Validate raw inputs and build the metadata value.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if any input is out of range.
    pub fn new(
        age: f64,
        sex: f64,
        localization: f64,
        dx_type: f64,
    ) -> Result<Self, ValidationError> {
        validate_metadata(age, sex, localization, dx_type)?;

        // Codes are whole numbers inside a u8-sized table at this point.
        Ok(Self {
            age,
            sex: sex as u8,
            localization: localization as u8,
            dx_type: dx_type as u8,
        })
    }

    pub fn age(&self) -> f64 {
        self.age
    }

    pub fn sex(&self) -> u8 {
        self.sex
    }

    pub fn localization(&self) -> u8 {
        self.localization
    }

    pub fn dx_type(&self) -> u8 {
        self.dx_type
    }

    /// Code for a categorical field.
    pub fn code(&self, field: CategoricalField) -> u8 {
        match field {
            CategoricalField::Sex => self.sex,
            CategoricalField::Localization => self.localization,
            CategoricalField::DxType => self.dx_type,
        }
    }

    /// Feature vector in the order the classifier expects.
    pub fn to_features(&self) -> [f32; METADATA_DIM] {
        [
            self.age as f32,
            f32::from(self.sex),
            f32::from(self.localization),
            f32::from(self.dx_type),
        ]
    }
}

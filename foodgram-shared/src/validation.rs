/// Field-level validation results
///
/// Request types derive [`validator::Validate`]; rules that the derive cannot
/// express (per-item bounds, reserved values, cross-field checks) are run by
/// hand and reported in the same [`FieldViolation`] shape.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

/// One failed rule on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Field path, e.g. `cooking_time` or `ingredients[2].amount`
    pub field: String,

    /// Human-readable message
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Flattens `validator` output into violations sorted by field name
pub fn violations_from(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut violations: Vec<FieldViolation> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| FieldViolation {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", error.code)),
            })
        })
        .collect();

    violations.sort_by(|a, b| a.field.cmp(&b.field));
    violations
}

/// Runs the derived rules of `value`
pub fn check<T: Validate>(value: &T) -> Result<(), Vec<FieldViolation>> {
    value.validate().map_err(|e| violations_from(&e))
}

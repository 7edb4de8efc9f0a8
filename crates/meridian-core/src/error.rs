//! # Validation Error Types
//!
//! Item-level validation failures raised while reconciling a batch.
//!
//! ## Design Principles
//! 1. `thiserror` derive macros, never manual impls
//! 2. Context in the message (field name, entity kind)
//! 3. Enum variants, never bare strings at the API surface
//!
//! A validation failure is recovered locally by the engine: the item is
//! counted as an error and the batch continues.

use thiserror::Error;

/// Item-level payload validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The submitted item is not a JSON object.
    #[error("item is not a JSON object")]
    NotAnObject,

    /// A required field is missing, null, or an empty string.
    #[error("{field} is required")]
    Required { field: String },

    /// A field is present but has the wrong JSON type.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A sale arrived with no valid line items.
    #[error("sale {id} has no valid line items")]
    EmptySale { id: String },
}

impl ValidationError {
    /// Creates a `Required` error for a field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an `InvalidFormat` error for a field.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for validation results.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(
            ValidationError::required("name").to_string(),
            "name is required"
        );
        assert_eq!(
            ValidationError::EmptySale { id: "s1".into() }.to_string(),
            "sale s1 has no valid line items"
        );
    }
}

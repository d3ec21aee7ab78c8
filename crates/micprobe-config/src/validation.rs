//! Settings validation errors.
//!
//! Validation never stops at the first problem: [`Settings::validate`]
//! collects every bad field so a user can fix a config file in one pass.
//!
//! [`Settings::validate`]: crate::Settings::validate

use thiserror::Error;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A single field holds an unusable value.
    #[error("{field}: {reason}")]
    Field {
        /// Dotted key of the field, e.g. `measurement.take_count`.
        field: &'static str,
        /// Description of the problem.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

impl ValidationError {
    /// Fold collected errors: none is success, one is returned as-is.
    pub fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }

    /// Dotted keys of every offending field, in report order.
    pub fn fields(&self) -> Vec<&'static str> {
        match self {
            ValidationError::Field { field, .. } => vec![*field],
            ValidationError::Multiple(errors) => errors.iter().flat_map(Self::fields).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &'static str) -> ValidationError {
        ValidationError::Field {
            field: name,
            reason: "bad".to_string(),
        }
    }

    #[test]
    fn collect_folds_by_count() {
        assert_eq!(ValidationError::collect(vec![]), Ok(()));
        assert_eq!(ValidationError::collect(vec![field("a.b")]), Err(field("a.b")));
        assert!(matches!(
            ValidationError::collect(vec![field("a.b"), field("c.d")]),
            Err(ValidationError::Multiple(ref v)) if v.len() == 2
        ));
    }

    #[test]
    fn multiple_display_joins_messages() {
        let err = ValidationError::Multiple(vec![field("a.b"), field("c.d")]);
        assert_eq!(
            err.to_string(),
            "multiple validation errors: a.b: bad; c.d: bad"
        );
        assert_eq!(err.fields(), vec!["a.b", "c.d"]);
    }
}

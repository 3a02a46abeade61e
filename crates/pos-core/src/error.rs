//! # Error Types
//!
//! Domain-specific error types for pos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pos-core errors (this file)                                           │
//! │  ├── CoreError        - Domain failures (state, overflow)              │
//! │  └── ValidationError  - Argument shape violations                      │
//! │                                                                         │
//! │  pos-kernel errors (separate crate)                                    │
//! │  └── KernelError      - Adds NotFound / buffers / internal failures    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → KernelError → ResultCode → caller │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::transaction::TransactionState;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The transaction is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Adding a line to a completed transaction
    /// - Adding a tender after the total has been covered
    #[error("Transaction is {state}, cannot {operation}")]
    InvalidState {
        operation: &'static str,
        state: TransactionState,
    },

    /// Integer arithmetic on minor units left the `i64` range.
    ///
    /// Never expected in normal operation; the mutation is rejected and the
    /// transaction is left untouched.
    #[error("Arithmetic overflow while computing {what}")]
    Overflow { what: &'static str },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised by the validation engine before any mutation takes place.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} bytes")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g. bytes that are not UTF-8).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// A per-transaction collection is full.
    #[error("{field} cannot exceed {max} entries")]
    LimitExceeded { field: String, max: usize },

    /// The referenced line was already voided.
    #[error("line {index} is voided")]
    LineVoided { index: u32 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidState {
            operation: "add line",
            state: TransactionState::Completed,
        };
        assert_eq!(err.to_string(), "Transaction is completed, cannot add line");

        let err = CoreError::Overflow { what: "line total" };
        assert_eq!(err.to_string(), "Arithmetic overflow while computing line total");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");

        let err = ValidationError::LimitExceeded {
            field: "lines".to_string(),
            max: 10,
        };
        assert_eq!(err.to_string(), "lines cannot exceed 10 entries");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

//! # Validation Module
//!
//! The validation engine: stateless predicates run before every mutation.
//!
//! ## Check Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Boundary Call Check Order                          │
//! │                                                                         │
//! │  1. Handle resolves to a live transaction?     (pos-kernel registry)   │
//! │           │ no → NotFound                                               │
//! │           ▼                                                             │
//! │  2. Transaction state allows the operation?    (transaction.rs)        │
//! │           │ no → InvalidState                                           │
//! │           ▼                                                             │
//! │  3. Arguments well-formed?                     THIS MODULE             │
//! │           │ no → ValidationFailed                                       │
//! │           ▼                                                             │
//! │  4. Mutate                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers arrive as raw bytes exactly as the caller passed them across
//! the boundary, so UTF-8 decoding is part of validation here.
//!
//! ## Usage
//! ```rust
//! use pos_core::validation::{validate_quantity, validate_sku, Limits};
//!
//! let limits = Limits::default();
//! assert_eq!(validate_sku(b"COFFEE", &limits).unwrap(), "COFFEE");
//! assert!(validate_quantity(0).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::{
    DEFAULT_DECIMAL_PLACES, DEFAULT_MAX_IDENTIFIER_BYTES, DEFAULT_MAX_LINES, DEFAULT_MAX_TENDERS,
    MAX_DECIMAL_PLACES,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Limits
// =============================================================================

/// Per-transaction size limits enforced by the validation engine.
///
/// Loaded from the `[limits]` table of `kernel.toml`; every field falls back
/// to its default when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum line items in one transaction.
    #[serde(default = "default_max_lines")]
    pub max_lines_per_transaction: usize,

    /// Maximum tenders in one transaction.
    #[serde(default = "default_max_tenders")]
    pub max_tenders_per_transaction: usize,

    /// Maximum length of store ids, currency codes and SKUs, in bytes.
    #[serde(default = "default_max_identifier_bytes")]
    pub max_identifier_bytes: usize,
}

fn default_max_lines() -> usize {
    DEFAULT_MAX_LINES
}

fn default_max_tenders() -> usize {
    DEFAULT_MAX_TENDERS
}

fn default_max_identifier_bytes() -> usize {
    DEFAULT_MAX_IDENTIFIER_BYTES
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_lines_per_transaction: default_max_lines(),
            max_tenders_per_transaction: default_max_tenders(),
            max_identifier_bytes: default_max_identifier_bytes(),
        }
    }
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates an identifier delivered as raw bytes.
///
/// ## Rules
/// - Must not be empty
/// - Must not exceed `max_bytes`
/// - Must be valid UTF-8
///
/// ## Returns
/// The identifier exactly as passed, borrowed from the input. Whitespace is
/// significant: `" "` is a valid (if unusual) SKU.
pub fn validate_identifier<'a>(
    field: &str,
    bytes: &'a [u8],
    max_bytes: usize,
) -> ValidationResult<&'a str> {
    if bytes.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if bytes.len() > max_bytes {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: max_bytes,
        });
    }

    std::str::from_utf8(bytes).map_err(|e| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: format!("not valid UTF-8 ({e})"),
    })
}

/// Validates a free-text void reason. Unlike identifiers it may be empty.
pub fn validate_reason<'a>(bytes: &'a [u8], limits: &Limits) -> ValidationResult<&'a str> {
    if bytes.len() > limits.max_identifier_bytes {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: limits.max_identifier_bytes,
        });
    }

    std::str::from_utf8(bytes).map_err(|e| ValidationError::InvalidFormat {
        field: "reason".to_string(),
        reason: format!("not valid UTF-8 ({e})"),
    })
}

/// Validates a store identifier.
pub fn validate_store_id<'a>(bytes: &'a [u8], limits: &Limits) -> ValidationResult<&'a str> {
    validate_identifier("store_id", bytes, limits.max_identifier_bytes)
}

/// Validates a currency code.
///
/// Any non-empty code is accepted; the kernel does not know currencies.
pub fn validate_currency<'a>(bytes: &'a [u8], limits: &Limits) -> ValidationResult<&'a str> {
    validate_identifier("currency", bytes, limits.max_identifier_bytes)
}

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Example
/// ```rust
/// use pos_core::validation::{validate_sku, Limits};
///
/// let limits = Limits::default();
/// assert!(validate_sku(b"COKE-330", &limits).is_ok());
/// assert!(validate_sku(b"", &limits).is_err());
/// assert!(validate_sku(&[0xff, 0xfe], &limits).is_err());
/// ```
pub fn validate_sku<'a>(bytes: &'a [u8], limits: &Limits) -> ValidationResult<&'a str> {
    validate_identifier("sku", bytes, limits.max_identifier_bytes)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_quantity(qty: i32) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a unit price in minor units.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
pub fn validate_unit_price(minor: i64) -> ValidationResult<()> {
    if minor < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "unit_price_minor".to_string(),
        });
    }

    Ok(())
}

/// Validates a tender amount in minor units.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_tender_amount(minor: i64) -> ValidationResult<()> {
    if minor <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount_minor".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more entry fits into a collection of `current` entries.
pub fn validate_capacity(field: &str, current: usize, max: usize) -> ValidationResult<()> {
    if current >= max {
        return Err(ValidationError::LimitExceeded {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a zero-based line index against the current line count.
pub fn validate_line_index(index: u32, line_count: usize) -> ValidationResult<usize> {
    let index = index as usize;
    if index >= line_count {
        return Err(ValidationError::OutOfRange {
            field: "line index".to_string(),
            min: 0,
            max: line_count as i64 - 1,
        });
    }

    Ok(index)
}

// =============================================================================
// Operation Validators
// =============================================================================

/// Validated arguments for opening a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginArgs {
    pub store_id: String,
    pub currency: String,
    /// Minor-unit digits of the currency (2 for USD, 0 for JPY).
    pub decimal_places: u8,
}

/// Validates currency decimal places.
///
/// The kernel knows nothing about real currencies; the caller says how many
/// minor-unit digits its currency has. The bound keeps one major unit
/// representable in `i64`.
pub fn validate_decimal_places(places: u8) -> ValidationResult<()> {
    if places > MAX_DECIMAL_PLACES {
        return Err(ValidationError::OutOfRange {
            field: "decimal_places".to_string(),
            min: 0,
            max: i64::from(MAX_DECIMAL_PLACES),
        });
    }

    Ok(())
}

/// Validates the arguments of "begin transaction" with the default of
/// two decimal places.
pub fn validate_begin(store: &[u8], currency: &[u8], limits: &Limits) -> ValidationResult<BeginArgs> {
    validate_begin_with_places(store, currency, DEFAULT_DECIMAL_PLACES, limits)
}

/// Validates the arguments of "begin transaction".
///
/// The currency code is upper-cased so `usd` and `USD` are the same code.
/// The store id is kept byte for byte.
pub fn validate_begin_with_places(
    store: &[u8],
    currency: &[u8],
    decimal_places: u8,
    limits: &Limits,
) -> ValidationResult<BeginArgs> {
    let store_id = validate_store_id(store, limits)?;
    let currency = validate_currency(currency, limits)?;
    validate_decimal_places(decimal_places)?;

    Ok(BeginArgs {
        store_id: store_id.to_string(),
        currency: currency.to_uppercase(),
        decimal_places,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

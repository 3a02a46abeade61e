//! # pos-core: Pure Transaction Logic for the POS Kernel
//!
//! This crate is the **heart** of the POS kernel. It contains all business
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        POS Kernel Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Caller (C, C#, Python, ... via C ABI)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ pk_* functions                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    pos-kernel                                   │   │
//! │  │    handle table, per-transaction locks, result codes           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ pos-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌─────────────┐  ┌──────────┐  │   │
//! │  │   │   money   │  │validation │  │ transaction │  │  error   │  │   │
//! │  │   │   Money   │  │  Limits   │  │ Transaction │  │CoreError │  │   │
//! │  │   │  checked  │  │  checks   │  │ state, sums │  │          │  │   │
//! │  │   └───────────┘  └───────────┘  └─────────────┘  └──────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with checked integer arithmetic (no floating point!)
//! - [`validation`] - The validation engine and per-transaction limits
//! - [`transaction`] - Transaction aggregate and its state machine
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use pos_core::transaction::{Transaction, TransactionState};
//! use pos_core::validation::{validate_begin, Limits};
//!
//! let limits = Limits::default();
//! let args = validate_begin(b"Store-001", b"USD", &limits).unwrap();
//! let mut tx = Transaction::new(1, args);
//!
//! tx.add_line(b"COFFEE", 1, 399, &limits).unwrap();
//! tx.add_line(b"MUFFIN", 1, 249, &limits).unwrap();
//! assert_eq!(tx.add_tender(1000, &limits).unwrap(), TransactionState::Completed);
//!
//! let totals = tx.totals().unwrap();
//! assert_eq!(totals.change.minor(), 352);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod transaction;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use transaction::{LineItem, Tender, Totals, Transaction, TransactionSnapshot, TransactionState};
pub use validation::{BeginArgs, Limits};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default maximum line items in a single transaction.
pub const DEFAULT_MAX_LINES: usize = 10_000;

/// Default maximum tenders in a single transaction.
pub const DEFAULT_MAX_TENDERS: usize = 1_000;

/// Default maximum length, in bytes, of store ids, currency codes and SKUs.
pub const DEFAULT_MAX_IDENTIFIER_BYTES: usize = 256;

/// Currency decimal places used when the caller does not supply any.
pub const DEFAULT_DECIMAL_PLACES: u8 = 2;

/// Largest accepted decimal places; `10^18` minor units still fit in `i64`.
pub const MAX_DECIMAL_PLACES: u8 = 18;

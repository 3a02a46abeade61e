//! # Kernel Error Types
//!
//! Error types for kernel operations and the result codes they map to.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Kernel Error → Result Code                        │
//! │                                                                         │
//! │  NotFound            ──►  1  handle stale, closed or never issued      │
//! │  InvalidState        ──►  2  legal call, wrong lifecycle state          │
//! │  AlreadyInitialized  ──►  2                                            │
//! │  Validation          ──►  3  argument shape violates a domain rule      │
//! │  Config / Toml       ──►  3                                            │
//! │  InsufficientBuffer  ──►  4  caller's output buffer too small          │
//! │  Internal / Io       ──► 255 kernel bug: overflow, poisoned lock, ...   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The boundary never invents a code of its own: every non-Ok code is
//! `KernelError::code()` of the error the kernel returned.

use pos_core::{CoreError, TransactionState, ValidationError};
use thiserror::Error;

use crate::handle::Handle;

// =============================================================================
// Result Codes
// =============================================================================

/// Stable result codes returned by every `pk_*` function.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Ok = 0,
    NotFound = 1,
    InvalidState = 2,
    ValidationFailed = 3,
    InsufficientBuffer = 4,
    InternalError = 255,
}

impl ResultCode {
    /// Returns true if the code indicates success.
    pub fn is_ok(self) -> bool {
        self == ResultCode::Ok
    }

    /// Parses a raw code; `None` for values outside the enumeration.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ResultCode::Ok),
            1 => Some(ResultCode::NotFound),
            2 => Some(ResultCode::InvalidState),
            3 => Some(ResultCode::ValidationFailed),
            4 => Some(ResultCode::InsufficientBuffer),
            255 => Some(ResultCode::InternalError),
            _ => None,
        }
    }
}

impl From<ResultCode> for i32 {
    fn from(code: ResultCode) -> Self {
        code as i32
    }
}

// =============================================================================
// Kernel Error
// =============================================================================

/// Kernel error type covering every failure a boundary call can report.
#[derive(Debug, Error)]
pub enum KernelError {
    /// The handle does not resolve to a live transaction.
    #[error("Transaction handle {0} not found")]
    NotFound(Handle),

    /// The transaction's state forbids the operation.
    #[error("Transaction is {state}, cannot {operation}")]
    InvalidState {
        operation: &'static str,
        state: TransactionState,
    },

    /// The kernel was already created when explicit initialization ran.
    #[error("Kernel is already initialized")]
    AlreadyInitialized,

    /// An argument violates a domain rule.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The caller's output buffer cannot hold the result.
    #[error("Output buffer too small: {required} bytes required, {provided} provided")]
    InsufficientBuffer { required: usize, provided: usize },

    /// Configuration is well-formed TOML but semantically invalid.
    #[error("Invalid kernel configuration: {0}")]
    Config(String),

    /// Configuration document could not be parsed.
    #[error("Failed to parse kernel configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Reading the configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invariant violation inside the kernel.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KernelError {
    /// The boundary result code for this error.
    pub fn code(&self) -> ResultCode {
        match self {
            KernelError::NotFound(_) => ResultCode::NotFound,
            KernelError::InvalidState { .. } | KernelError::AlreadyInitialized => {
                ResultCode::InvalidState
            }
            KernelError::Validation(_) | KernelError::Config(_) | KernelError::Toml(_) => {
                ResultCode::ValidationFailed
            }
            KernelError::InsufficientBuffer { .. } => ResultCode::InsufficientBuffer,
            KernelError::Io(_) | KernelError::Internal(_) => ResultCode::InternalError,
        }
    }

    /// Error for a lock whose holder panicked.
    pub(crate) fn poisoned(what: &str) -> Self {
        KernelError::Internal(format!("{what} lock poisoned"))
    }
}

impl From<CoreError> for KernelError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidState { operation, state } => {
                KernelError::InvalidState { operation, state }
            }
            CoreError::Validation(v) => KernelError::Validation(v),
            overflow @ CoreError::Overflow { .. } => KernelError::Internal(overflow.to_string()),
        }
    }
}

/// Result type alias for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

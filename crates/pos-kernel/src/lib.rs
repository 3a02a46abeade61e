//! # pos-kernel: Transaction Kernel Runtime and C ABI
//!
//! Hosts live transactions behind opaque handles and exposes them to any
//! language that can call C.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        pos-kernel Layers                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  ffi         pk_* extern "C" functions, catch_unwind, last error│   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ KernelResult<T> ──► ResultCode         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │  kernel      Kernel facade: begin, add_line, tender, totals     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌──────────────────┐  ┌───────▼──────────┐  ┌───────────────────┐     │
//! │  │  handle          │  │  registry        │  │  config / logging │     │
//! │  │  (gen, index)    │  │  HandleTable<T>  │  │  kernel.toml, env │     │
//! │  └──────────────────┘  └──────────────────┘  └───────────────────┘     │
//! │                                │                                        │
//! │                        pos_core::Transaction                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rust Usage
//! ```rust
//! use pos_kernel::Kernel;
//!
//! let kernel = Kernel::default();
//! let handle = kernel.begin_transaction(b"Store-001", b"USD").unwrap();
//! kernel.add_line(handle, b"COFFEE", 1, 399).unwrap();
//! kernel.add_cash_tender(handle, 500).unwrap();
//!
//! let totals = kernel.get_totals(handle).unwrap();
//! assert_eq!(totals.change.minor(), 101);
//! kernel.close_transaction(handle).unwrap();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod ffi;
pub mod handle;
pub mod kernel;
pub mod logging;
pub mod registry;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::{KernelConfig, LoggingConfig};
pub use error::{KernelError, KernelResult, ResultCode};
pub use handle::{Handle, PkTransactionHandle, PK_INVALID_HANDLE};
pub use kernel::Kernel;
pub use logging::init_logging;

pub use pos_core::{LineItem, Limits, Money, Totals, TransactionSnapshot, TransactionState};

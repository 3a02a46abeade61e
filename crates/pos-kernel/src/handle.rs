//! # Transaction Handles
//!
//! Opaque integer tokens handed across the boundary.
//!
//! ## Bit Layout
//! ```text
//! ┌─────────────────────────────────┬─────────────────────────────────┐
//! │  generation (high 32 bits)      │  slot index (low 32 bits)       │
//! └─────────────────────────────────┴─────────────────────────────────┘
//! ```
//! Generations start at 1, so no issued handle is ever `0`
//! ([`Handle::INVALID`]). A slot's generation is bumped every time its
//! transaction is closed, so a stale handle never matches the slot's next
//! occupant.

use std::fmt;

/// Raw handle type used by the C ABI.
pub type PkTransactionHandle = u64;

/// The reserved "no handle" sentinel.
pub const PK_INVALID_HANDLE: PkTransactionHandle = 0;

/// An opaque transaction handle: slot index plus generation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Handle(u64);

impl Handle {
    /// The reserved sentinel; never returned by a successful begin.
    pub const INVALID: Handle = Handle(PK_INVALID_HANDLE);

    /// Packs a slot index and generation into a handle.
    #[inline]
    pub const fn from_parts(index: u32, generation: u32) -> Self {
        Handle(((generation as u64) << 32) | index as u64)
    }

    /// Reinterprets a raw value received from a caller.
    #[inline]
    pub const fn from_raw(raw: PkTransactionHandle) -> Self {
        Handle(raw)
    }

    #[inline]
    pub const fn raw(&self) -> PkTransactionHandle {
        self.0
    }

    #[inline]
    pub const fn index(&self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    #[inline]
    pub const fn generation(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// True for the sentinel and for any value with a zero generation,
    /// neither of which can have been issued.
    #[inline]
    pub const fn is_invalid(&self) -> bool {
        self.generation() == 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

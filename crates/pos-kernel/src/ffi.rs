//! # C ABI
//!
//! The `pk_*` functions foreign callers link against.
//!
//! ## Call Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Boundary Call                                    │
//! │                                                                         │
//! │  pk_xxx(handle, args..., out...)                                       │
//! │     │                                                                   │
//! │     ├── clear thread's last error                                      │
//! │     ├── catch_unwind {                                                 │
//! │     │      Kernel::xxx(handle, args)   handle ─► state ─► arguments    │
//! │     │      out pointers non-null?      (only after the kernel call)    │
//! │     │      write outputs                                               │
//! │     │   }                                                               │
//! │     ├── Err(e) ─► last error = e.to_string()                           │
//! │     └── return e.code() as i32   (0 on success)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Strings are passed as `(pointer, length)` pairs and are never
//! NUL-terminated. A null pointer reads as an empty string.
//!
//! ## Buffer Protocol
//! Functions returning variable-length bytes take `(buf, buf_len, out_len)`.
//! `out_len` always receives the required length; when `buf_len` is smaller
//! the call fails with `InsufficientBuffer` and nothing is copied. Passing a
//! null `buf` with `buf_len = 0` is the way to query the size. Lengths count
//! elements, so `pk_find_line_children` measures in `u32` indexes.
//!
//! ## Kernel Creation
//! The first `pk_*` call creates the kernel. Without a prior `pk_initialize`
//! it is built by `KernelConfig::load_or_default`, which reads the config
//! file under the platform config directory and the `POS_KERNEL_*`
//! environment variables. Hosts (and tests) that need fixed limits call
//! `pk_initialize` with a TOML document first; that path reads neither.

use std::any::Any;
use std::cell::RefCell;
use std::ffi::{c_char, CString};
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use pos_core::ValidationError;
use tracing::{error, info};

use crate::config::KernelConfig;
use crate::error::{KernelError, KernelResult, ResultCode};
use crate::handle::{Handle, PkTransactionHandle, PK_INVALID_HANDLE};
use crate::kernel::Kernel;
use crate::logging::init_logging;

static KERNEL: OnceLock<Kernel> = OnceLock::new();

static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

// Thread-local storage for last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

// =============================================================================
// Helpers
// =============================================================================

/// The process-wide kernel.
///
/// Created lazily from the default config file and `POS_KERNEL_*` environment
/// variables when `pk_initialize` has not run, so its limits depend on the
/// host machine in that case.
fn kernel() -> &'static Kernel {
    KERNEL.get_or_init(|| Kernel::new(&KernelConfig::load_or_default(None)))
}

fn set_last_error(err: &KernelError) {
    let message = err.to_string().replace('\0', " ");
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(message).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Runs a boundary body, converting its outcome (or a panic) into a code.
fn guarded<F>(body: F) -> i32
where
    F: FnOnce() -> KernelResult<()>,
{
    clear_last_error();

    let outcome = panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        error!(panic = message, "Panic caught at kernel boundary");
        Err(KernelError::Internal(format!("panic: {message}")))
    });

    match outcome {
        Ok(()) => ResultCode::Ok.into(),
        Err(err) => {
            set_last_error(&err);
            err.code().into()
        }
    }
}

/// Reads a `(pointer, length)` string argument.
///
/// # Safety
/// A non-null `ptr` must be valid for `len` bytes for the duration of the call.
unsafe fn bytes_arg<'a>(ptr: *const u8, len: usize) -> &'a [u8] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, len)
    }
}

fn require_out<T>(ptr: *mut T, name: &str) -> KernelResult<()> {
    if ptr.is_null() {
        return Err(ValidationError::Required {
            field: name.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Copies `items` into a caller buffer following the buffer protocol.
///
/// # Safety
/// `buf` must be valid for `buf_len` writable elements; `out_len` must be
/// null or valid for a write.
unsafe fn copy_to_buffer<T: Copy>(
    items: &[T],
    buf: *mut T,
    buf_len: usize,
    out_len: *mut usize,
) -> KernelResult<()> {
    require_out(out_len, "out_len")?;
    *out_len = items.len();

    if buf_len < items.len() {
        return Err(KernelError::InsufficientBuffer {
            required: items.len(),
            provided: buf_len,
        });
    }
    if !items.is_empty() {
        require_out(buf, "buf")?;
        std::ptr::copy_nonoverlapping(items.as_ptr(), buf, items.len());
    }
    Ok(())
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Explicitly initializes the kernel from a TOML document.
///
/// An empty document loads configuration from the default file and the
/// environment instead. Also installs the tracing subscriber unless the host
/// already has one. Fails with `InvalidState` once the kernel exists, which
/// includes the case where another `pk_*` call already created it lazily.
///
/// # Safety
/// `config_ptr` must be null or valid for `config_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn pk_initialize(config_ptr: *const u8, config_len: usize) -> i32 {
    guarded(|| {
        let document = bytes_arg(config_ptr, config_len);
        let config = if document.is_empty() {
            KernelConfig::load(None)?
        } else {
            let text = std::str::from_utf8(document).map_err(|e| ValidationError::InvalidFormat {
                field: "config".to_string(),
                reason: e.to_string(),
            })?;
            KernelConfig::from_toml_str(text)?
        };

        let mut created = false;
        KERNEL.get_or_init(|| {
            created = true;
            Kernel::new(&config)
        });
        if !created {
            return Err(KernelError::AlreadyInitialized);
        }

        init_logging(&config.logging);
        info!(limits = ?config.limits, "Kernel initialized");
        Ok(())
    })
}

/// Opens a transaction and writes its handle to `out_handle`.
///
/// `out_handle` receives `PK_INVALID_HANDLE` on failure.
///
/// # Safety
/// String pointers must be null or valid for their lengths; `out_handle` must
/// be null or valid for a write.
#[no_mangle]
pub unsafe extern "C" fn pk_begin_transaction(
    store_ptr: *const u8,
    store_len: usize,
    currency_ptr: *const u8,
    currency_len: usize,
    out_handle: *mut PkTransactionHandle,
) -> i32 {
    guarded(|| {
        // No handle exists yet, so the output is checked first: a begin that
        // cannot report its handle must not open a transaction.
        require_out(out_handle, "out_handle")?;
        *out_handle = PK_INVALID_HANDLE;

        let store = bytes_arg(store_ptr, store_len);
        let currency = bytes_arg(currency_ptr, currency_len);
        let handle = kernel().begin_transaction(store, currency)?;
        *out_handle = handle.raw();
        Ok(())
    })
}

/// Same as `pk_begin_transaction` with an explicit number of currency
/// decimal places (at most 18).
///
/// # Safety
/// See `pk_begin_transaction`.
#[no_mangle]
pub unsafe extern "C" fn pk_begin_transaction_with_places(
    store_ptr: *const u8,
    store_len: usize,
    currency_ptr: *const u8,
    currency_len: usize,
    decimal_places: u8,
    out_handle: *mut PkTransactionHandle,
) -> i32 {
    guarded(|| {
        require_out(out_handle, "out_handle")?;
        *out_handle = PK_INVALID_HANDLE;

        let store = bytes_arg(store_ptr, store_len);
        let currency = bytes_arg(currency_ptr, currency_len);
        let handle = kernel().begin_transaction_with_places(store, currency, decimal_places)?;
        *out_handle = handle.raw();
        Ok(())
    })
}

/// Closes a transaction in any state.
#[no_mangle]
pub extern "C" fn pk_close_transaction(handle: PkTransactionHandle) -> i32 {
    guarded(|| kernel().close_transaction(Handle::from_raw(handle)))
}

// =============================================================================
// Mutations
// =============================================================================

/// Appends a line item.
///
/// # Safety
/// `sku_ptr` must be null or valid for `sku_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn pk_add_line(
    handle: PkTransactionHandle,
    sku_ptr: *const u8,
    sku_len: usize,
    quantity: i32,
    unit_price_minor: i64,
) -> i32 {
    guarded(|| {
        let sku = bytes_arg(sku_ptr, sku_len);
        kernel().add_line(Handle::from_raw(handle), sku, quantity, unit_price_minor)
    })
}

/// Appends a line linked to an earlier, non-voided parent line.
///
/// # Safety
/// `sku_ptr` must be null or valid for `sku_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn pk_add_child_line(
    handle: PkTransactionHandle,
    parent_index: u32,
    sku_ptr: *const u8,
    sku_len: usize,
    quantity: i32,
    unit_price_minor: i64,
) -> i32 {
    guarded(|| {
        let sku = bytes_arg(sku_ptr, sku_len);
        kernel().add_child_line(Handle::from_raw(handle), parent_index, sku, quantity, unit_price_minor)
    })
}

/// Voids a line and every line below it. Building transactions only.
///
/// # Safety
/// `reason_ptr` must be null or valid for `reason_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn pk_void_line(
    handle: PkTransactionHandle,
    index: u32,
    reason_ptr: *const u8,
    reason_len: usize,
) -> i32 {
    guarded(|| {
        let reason = bytes_arg(reason_ptr, reason_len);
        kernel()
            .void_line(Handle::from_raw(handle), index, reason)
            .map(|_| ())
    })
}

/// Appends a cash tender. The transaction completes once tendered covers
/// the total.
#[no_mangle]
pub extern "C" fn pk_add_cash_tender(handle: PkTransactionHandle, amount_minor: i64) -> i32 {
    guarded(|| {
        kernel()
            .add_cash_tender(Handle::from_raw(handle), amount_minor)
            .map(|_| ())
    })
}

// =============================================================================
// Reads
// =============================================================================

/// Writes total, tendered, change (all minor units) and the state code.
///
/// # Safety
/// Each output must be null or valid for a write.
#[no_mangle]
pub unsafe extern "C" fn pk_get_totals(
    handle: PkTransactionHandle,
    out_total: *mut i64,
    out_tendered: *mut i64,
    out_change: *mut i64,
    out_state: *mut i32,
) -> i32 {
    guarded(|| {
        let totals = kernel().get_totals(Handle::from_raw(handle))?;

        require_out(out_total, "out_total")?;
        require_out(out_tendered, "out_tendered")?;
        require_out(out_change, "out_change")?;
        require_out(out_state, "out_state")?;

        *out_total = totals.total.minor();
        *out_tendered = totals.tendered.minor();
        *out_change = totals.change.minor();
        *out_state = totals.state.code();
        Ok(())
    })
}

/// # Safety
/// `out_count` must be null or valid for a write.
#[no_mangle]
pub unsafe extern "C" fn pk_get_line_count(
    handle: PkTransactionHandle,
    out_count: *mut u32,
) -> i32 {
    guarded(|| {
        let count = kernel().get_line_count(Handle::from_raw(handle))?;
        require_out(out_count, "out_count")?;
        *out_count = count;
        Ok(())
    })
}

/// Reads the line at a zero-based index.
///
/// The SKU is copied using the buffer protocol. Quantity and price are only
/// written when the SKU fits.
///
/// # Safety
/// `sku_buf` must be valid for `sku_buf_len` writable bytes; each output must
/// be null or valid for a write.
#[no_mangle]
pub unsafe extern "C" fn pk_get_line_item(
    handle: PkTransactionHandle,
    index: u32,
    sku_buf: *mut u8,
    sku_buf_len: usize,
    out_sku_len: *mut usize,
    out_quantity: *mut i32,
    out_unit_price_minor: *mut i64,
) -> i32 {
    guarded(|| {
        let line = kernel().get_line_item(Handle::from_raw(handle), index)?;

        require_out(out_quantity, "out_quantity")?;
        require_out(out_unit_price_minor, "out_unit_price_minor")?;
        copy_to_buffer(line.sku.as_bytes(), sku_buf, sku_buf_len, out_sku_len)?;

        *out_quantity = line.quantity;
        *out_unit_price_minor = line.unit_price.minor();
        Ok(())
    })
}

/// Reports a line's parent. `out_parent_index` is only meaningful when
/// `out_has_parent` is true.
///
/// # Safety
/// Each output must be null or valid for a write.
#[no_mangle]
pub unsafe extern "C" fn pk_get_line_parent(
    handle: PkTransactionHandle,
    index: u32,
    out_has_parent: *mut bool,
    out_parent_index: *mut u32,
) -> i32 {
    guarded(|| {
        let line = kernel().get_line_item(Handle::from_raw(handle), index)?;

        require_out(out_has_parent, "out_has_parent")?;
        require_out(out_parent_index, "out_parent_index")?;
        *out_has_parent = line.parent_line.is_some();
        *out_parent_index = line.parent_line.unwrap_or(0);
        Ok(())
    })
}

/// # Safety
/// `out_voided` must be null or valid for a write.
#[no_mangle]
pub unsafe extern "C" fn pk_get_line_voided(
    handle: PkTransactionHandle,
    index: u32,
    out_voided: *mut bool,
) -> i32 {
    guarded(|| {
        let line = kernel().get_line_item(Handle::from_raw(handle), index)?;
        require_out(out_voided, "out_voided")?;
        *out_voided = line.is_voided();
        Ok(())
    })
}

/// Copies the indexes of every line below `index`, in line order.
///
/// # Safety
/// See the buffer protocol in the module docs; `buf_len` counts `u32`s.
#[no_mangle]
pub unsafe extern "C" fn pk_find_line_children(
    handle: PkTransactionHandle,
    index: u32,
    buf: *mut u32,
    buf_len: usize,
    out_len: *mut usize,
) -> i32 {
    guarded(|| {
        let children = kernel().get_line_children(Handle::from_raw(handle), index)?;
        copy_to_buffer(&children, buf, buf_len, out_len)
    })
}

/// # Safety
/// `out_places` must be null or valid for a write.
#[no_mangle]
pub unsafe extern "C" fn pk_get_currency_decimal_places(
    handle: PkTransactionHandle,
    out_places: *mut u8,
) -> i32 {
    guarded(|| {
        let places = kernel().get_decimal_places(Handle::from_raw(handle))?;
        require_out(out_places, "out_places")?;
        *out_places = places;
        Ok(())
    })
}

/// Copies the transaction's currency code.
///
/// # Safety
/// See the buffer protocol in the module docs.
#[no_mangle]
pub unsafe extern "C" fn pk_get_currency(
    handle: PkTransactionHandle,
    buf: *mut u8,
    buf_len: usize,
    out_len: *mut usize,
) -> i32 {
    guarded(|| {
        let currency = kernel().get_currency(Handle::from_raw(handle))?;
        copy_to_buffer(currency.as_bytes(), buf, buf_len, out_len)
    })
}

/// Copies a JSON snapshot of the whole transaction.
///
/// # Safety
/// See the buffer protocol in the module docs.
#[no_mangle]
pub unsafe extern "C" fn pk_get_transaction_json(
    handle: PkTransactionHandle,
    buf: *mut u8,
    buf_len: usize,
    out_len: *mut usize,
) -> i32 {
    guarded(|| {
        let snapshot = kernel().snapshot(Handle::from_raw(handle))?;
        let json = serde_json::to_vec(&snapshot)
            .map_err(|e| KernelError::Internal(format!("snapshot serialization failed: {e}")))?;
        copy_to_buffer(&json, buf, buf_len, out_len)
    })
}

/// Number of transactions begun and not yet closed.
///
/// # Safety
/// `out_count` must be null or valid for a write.
#[no_mangle]
pub unsafe extern "C" fn pk_get_open_transaction_count(out_count: *mut u32) -> i32 {
    guarded(|| {
        let count = kernel().open_transaction_count()?;
        require_out(out_count, "out_count")?;
        *out_count = u32::try_from(count)
            .map_err(|_| KernelError::Internal("open transaction count exceeds u32".into()))?;
        Ok(())
    })
}

// =============================================================================
// Diagnostics
// =============================================================================

#[no_mangle]
pub extern "C" fn pk_result_is_ok(code: i32) -> bool {
    ResultCode::from_code(code).is_some_and(ResultCode::is_ok)
}

/// The crate version as a static NUL-terminated string.
#[no_mangle]
pub extern "C" fn pk_get_version() -> *const c_char {
    VERSION.as_ptr() as *const c_char
}

/// Describes the last failed call on this thread.
///
/// Returns null if the last call succeeded. The pointer is valid until the
/// next `pk_*` call on this thread.
#[no_mangle]
pub extern "C" fn pk_get_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => std::ptr::null(),
    })
}

#[no_mangle]
pub extern "C" fn pk_clear_last_error() {
    clear_last_error();
}

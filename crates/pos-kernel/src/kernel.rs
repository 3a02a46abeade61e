//! # Transaction Kernel
//!
//! The facade composing the handle table, per-transaction locks and the
//! pure transaction logic from `pos-core`.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Kernel Operation Flow                               │
//! │                                                                         │
//! │  handle ──► HandleTable::resolve ──► NotFound?                         │
//! │                  │                                                      │
//! │                  ▼                                                      │
//! │          Mutex<OpenTransaction>::lock   (held until the call returns)  │
//! │                  │                                                      │
//! │                  ├── closed by a racing close? ──► NotFound            │
//! │                  ▼                                                      │
//! │          Transaction::{add_line, void_line, add_tender, totals, ...}   │
//! │             state check ──► validation ──► mutate / read               │
//! │                  │                                                      │
//! │                  ▼                                                      │
//! │          KernelResult<T>  ──► ResultCode at the boundary               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operations on one handle serialize on that transaction's mutex;
//! operations on different handles only share the table's read lock.

use std::sync::{Mutex, PoisonError};

use pos_core::validation::validate_begin_with_places;
use pos_core::{
    LineItem, Limits, Money, Totals, Transaction, TransactionSnapshot, TransactionState,
    DEFAULT_DECIMAL_PLACES,
};
use tracing::{debug, error, info, warn};

use crate::config::KernelConfig;
use crate::error::{KernelError, KernelResult};
use crate::handle::Handle;
use crate::registry::HandleTable;

/// A transaction plus the flag a racing close leaves behind.
struct OpenTransaction {
    transaction: Transaction,
    closed: bool,
}

/// The in-process transaction kernel.
///
/// ## Thread Safety
/// `Kernel` is `Send + Sync`; share it by reference or `Arc`. The boundary
/// layer keeps one instance for the whole process.
pub struct Kernel {
    limits: Limits,
    table: HandleTable<Mutex<OpenTransaction>>,
}

impl Kernel {
    /// Creates a kernel from a loaded configuration.
    pub fn new(config: &KernelConfig) -> Self {
        Self::with_limits(config.limits.clone())
    }

    /// Creates a kernel with explicit limits.
    pub fn with_limits(limits: Limits) -> Self {
        Kernel {
            limits,
            table: HandleTable::new(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Opens a new transaction with a two-decimal currency.
    pub fn begin_transaction(&self, store_id: &[u8], currency: &[u8]) -> KernelResult<Handle> {
        self.begin_transaction_with_places(store_id, currency, DEFAULT_DECIMAL_PLACES)
    }

    /// Opens a new transaction and returns its handle.
    ///
    /// Arguments are validated before a handle is allocated, so a rejected
    /// begin never consumes a slot.
    pub fn begin_transaction_with_places(
        &self,
        store_id: &[u8],
        currency: &[u8],
        decimal_places: u8,
    ) -> KernelResult<Handle> {
        let args = validate_begin_with_places(store_id, currency, decimal_places, &self.limits)
            .map_err(|e| {
                warn!(error = %e, "Begin transaction rejected");
                KernelError::from(e)
            })?;

        let (handle, entry) = self.table.allocate_with(|handle| {
            Mutex::new(OpenTransaction {
                transaction: Transaction::new(handle.raw(), args),
                closed: false,
            })
        })?;

        let open = entry.lock().map_err(|_| KernelError::poisoned("transaction"))?;
        let tx = &open.transaction;
        info!(
            %handle,
            sale_id = %tx.sale_id(),
            store_id = tx.store_id(),
            currency = tx.currency(),
            decimal_places = tx.decimal_places(),
            "Transaction opened"
        );

        Ok(handle)
    }

    /// Closes a transaction in any state. The handle is dead afterwards.
    pub fn close_transaction(&self, handle: Handle) -> KernelResult<()> {
        let entry = self.table.release(handle).map_err(|e| {
            warn!(%handle, error = %e, "Close transaction rejected");
            e
        })?;

        // The handle is already gone from the table; mark the record so any
        // caller still holding the Arc sees NotFound once it gets the lock.
        let mut open = entry.lock().unwrap_or_else(PoisonError::into_inner);
        open.closed = true;
        info!(
            %handle,
            sale_id = %open.transaction.sale_id(),
            state = %open.transaction.state(),
            lines = open.transaction.line_count(),
            "Transaction closed"
        );

        Ok(())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Appends a line item. Requires `Building`.
    pub fn add_line(
        &self,
        handle: Handle,
        sku: &[u8],
        quantity: i32,
        unit_price_minor: i64,
    ) -> KernelResult<()> {
        self.with_transaction(handle, "add line", |tx, limits| {
            let places = tx.decimal_places();
            let line = tx.add_line(sku, quantity, unit_price_minor, limits)?;
            debug!(
                %handle,
                sku = %line.sku,
                quantity,
                unit_price = %line.unit_price.format_with_places(places),
                "Line added"
            );
            Ok(())
        })
    }

    /// Appends a line linked to `parent_index`. Requires `Building`.
    pub fn add_child_line(
        &self,
        handle: Handle,
        parent_index: u32,
        sku: &[u8],
        quantity: i32,
        unit_price_minor: i64,
    ) -> KernelResult<()> {
        self.with_transaction(handle, "add child line", |tx, limits| {
            let places = tx.decimal_places();
            let line = tx.add_child_line(parent_index, sku, quantity, unit_price_minor, limits)?;
            debug!(
                %handle,
                parent_index,
                sku = %line.sku,
                quantity,
                unit_price = %line.unit_price.format_with_places(places),
                "Child line added"
            );
            Ok(())
        })
    }

    /// Voids a line and its linked children, returning every index voided.
    /// Requires `Building`.
    pub fn void_line(&self, handle: Handle, index: u32, reason: &[u8]) -> KernelResult<Vec<u32>> {
        self.with_transaction(handle, "void line", |tx, limits| {
            let voided = tx.void_line(index, reason, limits)?;
            info!(
                %handle,
                sale_id = %tx.sale_id(),
                index,
                cascaded = voided.len() - 1,
                reason = %String::from_utf8_lossy(reason),
                total = %tx.format_amount(tx.total().unwrap_or_default()),
                "Line voided"
            );
            Ok(voided)
        })
    }

    /// Appends a cash tender and returns the resulting state. Requires `Building`.
    pub fn add_cash_tender(&self, handle: Handle, amount_minor: i64) -> KernelResult<TransactionState> {
        self.with_transaction(handle, "add tender", |tx, limits| {
            let state = tx.add_tender(amount_minor, limits)?;
            debug!(
                %handle,
                amount = %tx.format_amount(Money::from_minor(amount_minor)),
                %state,
                "Cash tender added"
            );
            if state == TransactionState::Completed {
                info!(%handle, sale_id = %tx.sale_id(), "Transaction completed");
            }
            Ok(state)
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Total, tendered, change and state.
    pub fn get_totals(&self, handle: Handle) -> KernelResult<Totals> {
        self.with_transaction(handle, "get totals", |tx, _| Ok(tx.totals()?))
    }

    /// Number of line items.
    pub fn get_line_count(&self, handle: Handle) -> KernelResult<u32> {
        self.with_transaction(handle, "get line count", |tx, _| {
            u32::try_from(tx.line_count())
                .map_err(|_| KernelError::Internal("line count exceeds u32".into()))
        })
    }

    /// A copy of the line at a zero-based index.
    pub fn get_line_item(&self, handle: Handle, index: u32) -> KernelResult<LineItem> {
        self.with_transaction(handle, "get line item", |tx, _| Ok(tx.line(index)?.clone()))
    }

    /// Indexes of every line linked below `index`, ascending.
    pub fn get_line_children(&self, handle: Handle, index: u32) -> KernelResult<Vec<u32>> {
        self.with_transaction(handle, "get line children", |tx, _| Ok(tx.line_children(index)?))
    }

    /// The transaction's (upper-cased) currency code.
    pub fn get_currency(&self, handle: Handle) -> KernelResult<String> {
        self.with_transaction(handle, "get currency", |tx, _| Ok(tx.currency().to_string()))
    }

    /// Minor-unit digits of the transaction's currency.
    pub fn get_decimal_places(&self, handle: Handle) -> KernelResult<u8> {
        self.with_transaction(handle, "get decimal places", |tx, _| Ok(tx.decimal_places()))
    }

    /// A serializable copy of the whole transaction.
    pub fn snapshot(&self, handle: Handle) -> KernelResult<TransactionSnapshot> {
        self.with_transaction(handle, "snapshot", |tx, _| Ok(tx.snapshot()?))
    }

    /// Number of transactions begun and not yet closed.
    pub fn open_transaction_count(&self) -> KernelResult<usize> {
        self.table.len()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Resolves `handle`, locks its transaction and runs `op` under the lock.
    fn with_transaction<R, F>(&self, handle: Handle, operation: &'static str, op: F) -> KernelResult<R>
    where
        F: FnOnce(&mut Transaction, &Limits) -> KernelResult<R>,
    {
        let result = self.table.resolve(handle).and_then(|entry| {
            let mut open = entry
                .lock()
                .map_err(|_| KernelError::poisoned("transaction"))?;
            if open.closed {
                return Err(KernelError::NotFound(handle));
            }
            op(&mut open.transaction, &self.limits)
        });

        if let Err(ref err) = result {
            match err {
                KernelError::Internal(_) | KernelError::Io(_) => {
                    error!(%handle, operation, error = %err, "Kernel operation failed")
                }
                _ => warn!(%handle, operation, error = %err, "Kernel operation rejected"),
            }
        }

        result
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::with_limits(Limits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultCode;
    use std::sync::Arc;
    use std::thread;

    fn begin(kernel: &Kernel) -> Handle {
        kernel.begin_transaction(b"Store-001", b"USD").unwrap()
    }

    #[test]
    fn begin_returns_valid_handle() {
        let kernel = Kernel::default();
        let handle = begin(&kernel);
        assert!(!handle.is_invalid());
        assert_eq!(kernel.get_line_count(handle).unwrap(), 0);
        assert_eq!(kernel.get_currency(handle).unwrap(), "USD");
        assert_eq!(kernel.open_transaction_count().unwrap(), 1);
    }

    #[test]
    fn begin_rejects_empty_identifiers() {
        let kernel = Kernel::default();
        let err = kernel.begin_transaction(b"", b"USD").unwrap_err();
        assert_eq!(err.code(), ResultCode::ValidationFailed);
        let err = kernel.begin_transaction(b"Store-001", b"").unwrap_err();
        assert_eq!(err.code(), ResultCode::ValidationFailed);
        assert_eq!(kernel.open_transaction_count().unwrap(), 0);
    }

    #[test]
    fn sale_scenario_totals() {
        let kernel = Kernel::default();
        let handle = begin(&kernel);

        kernel.add_line(handle, b"COFFEE", 1, 399).unwrap();
        kernel.add_line(handle, b"MUFFIN", 1, 249).unwrap();
        let state = kernel.add_cash_tender(handle, 1000).unwrap();
        assert_eq!(state, TransactionState::Completed);

        let totals = kernel.get_totals(handle).unwrap();
        assert_eq!(totals.total.minor(), 648);
        assert_eq!(totals.tendered.minor(), 1000);
        assert_eq!(totals.change.minor(), 352);
    }

    #[test]
    fn completed_transaction_rejects_mutation() {
        let kernel = Kernel::default();
        let handle = begin(&kernel);
        kernel.add_line(handle, b"ITEM", 1, 325).unwrap();
        kernel.add_cash_tender(handle, 500).unwrap();

        let err = kernel.add_line(handle, b"MORE", 1, 100).unwrap_err();
        assert_eq!(err.code(), ResultCode::InvalidState);
        let err = kernel.add_cash_tender(handle, 100).unwrap_err();
        assert_eq!(err.code(), ResultCode::InvalidState);

        let totals = kernel.get_totals(handle).unwrap();
        assert_eq!(totals.total.minor(), 325);
        assert_eq!(totals.tendered.minor(), 500);
        assert_eq!(totals.state, TransactionState::Completed);
    }

    #[test]
    fn closed_handle_checked_before_arguments() {
        let kernel = Kernel::default();
        let handle = begin(&kernel);
        kernel.close_transaction(handle).unwrap();

        let err = kernel.add_line(handle, b"", 0, -1).unwrap_err();
        assert_eq!(err.code(), ResultCode::NotFound);
        let err = kernel.add_cash_tender(handle, 0).unwrap_err();
        assert_eq!(err.code(), ResultCode::NotFound);
        assert_eq!(kernel.get_totals(handle).unwrap_err().code(), ResultCode::NotFound);
        assert_eq!(kernel.get_line_count(handle).unwrap_err().code(), ResultCode::NotFound);
        assert_eq!(kernel.close_transaction(handle).unwrap_err().code(), ResultCode::NotFound);
    }

    #[test]
    fn overflow_reports_internal_error() {
        let kernel = Kernel::default();
        let handle = begin(&kernel);
        let err = kernel.add_line(handle, b"BIG", 2, i64::MAX).unwrap_err();
        assert_eq!(err.code(), ResultCode::InternalError);
        assert_eq!(kernel.get_line_count(handle).unwrap(), 0);
    }

    #[test]
    fn line_item_lookup() {
        let kernel = Kernel::default();
        let handle = begin(&kernel);
        kernel.add_line(handle, b"COFFEE", 2, 399).unwrap();

        let line = kernel.get_line_item(handle, 0).unwrap();
        assert_eq!(line.sku, "COFFEE");
        assert_eq!(line.quantity, 2);
        let err = kernel.get_line_item(handle, 1).unwrap_err();
        assert_eq!(err.code(), ResultCode::ValidationFailed);
    }

    #[test]
    fn snapshot_reflects_transaction() {
        let kernel = Kernel::default();
        let handle = begin(&kernel);
        kernel.add_line(handle, b"COFFEE", 1, 399).unwrap();

        let snapshot = kernel.snapshot(handle).unwrap();
        assert_eq!(snapshot.handle, handle.raw());
        assert_eq!(snapshot.total_minor, 399);
        assert_eq!(snapshot.change_minor, -399);
        assert_eq!(snapshot.lines.len(), 1);
    }

    #[test]
    fn racing_close_marks_record_closed() {
        let kernel = Kernel::default();
        let handle = begin(&kernel);

        // Simulate a caller that resolved the handle just before close.
        let stale = kernel.table.resolve(handle).unwrap();
        kernel.close_transaction(handle).unwrap();
        assert!(stale.lock().unwrap().closed);
    }

    #[test]
    fn whitespace_identifiers_are_kept_verbatim() {
        let kernel = Kernel::default();
        let handle = kernel.begin_transaction(b"   ", b"USD").unwrap();
        kernel.add_line(handle, b" ", 1, 100).unwrap();
        kernel.add_line(handle, b"  COFFEE ", 1, 399).unwrap();

        assert_eq!(kernel.get_line_item(handle, 0).unwrap().sku, " ");
        assert_eq!(kernel.get_line_item(handle, 1).unwrap().sku, "  COFFEE ");
        assert_eq!(kernel.snapshot(handle).unwrap().store_id, "   ");
    }

    #[test]
    fn void_cascades_through_kernel() {
        let kernel = Kernel::default();
        let handle = begin(&kernel);
        kernel.add_line(handle, b"BURGER", 1, 899).unwrap();
        kernel.add_child_line(handle, 0, b"CHEESE", 1, 100).unwrap();
        kernel.add_line(handle, b"SODA", 1, 199).unwrap();

        assert_eq!(kernel.get_line_children(handle, 0).unwrap(), vec![1]);
        assert_eq!(kernel.get_line_item(handle, 1).unwrap().parent_line, Some(0));

        assert_eq!(kernel.void_line(handle, 0, b"customer changed mind").unwrap(), vec![0, 1]);
        assert_eq!(kernel.get_totals(handle).unwrap().total.minor(), 199);
        assert_eq!(kernel.get_line_count(handle).unwrap(), 3);

        let err = kernel.void_line(handle, 1, b"").unwrap_err();
        assert_eq!(err.code(), ResultCode::ValidationFailed);
        let err = kernel.add_child_line(handle, 9, b"SAUCE", 1, 10).unwrap_err();
        assert_eq!(err.code(), ResultCode::ValidationFailed);
    }

    #[test]
    fn void_after_completion_is_invalid_state() {
        let kernel = Kernel::default();
        let handle = begin(&kernel);
        kernel.add_line(handle, b"ITEM", 1, 100).unwrap();
        kernel.add_cash_tender(handle, 100).unwrap();

        let err = kernel.void_line(handle, 0, b"").unwrap_err();
        assert_eq!(err.code(), ResultCode::InvalidState);
        kernel.close_transaction(handle).unwrap();
        let err = kernel.void_line(handle, 0, b"").unwrap_err();
        assert_eq!(err.code(), ResultCode::NotFound);
    }

    #[test]
    fn decimal_places_are_per_transaction() {
        let kernel = Kernel::default();
        let usd = begin(&kernel);
        let yen = kernel.begin_transaction_with_places(b"Store-001", b"JPY", 0).unwrap();

        assert_eq!(kernel.get_decimal_places(usd).unwrap(), 2);
        assert_eq!(kernel.get_decimal_places(yen).unwrap(), 0);

        let err = kernel
            .begin_transaction_with_places(b"Store-001", b"XXX", 19)
            .unwrap_err();
        assert_eq!(err.code(), ResultCode::ValidationFailed);
    }

    #[test]
    fn concurrent_lines_on_one_handle_are_all_counted() {
        let kernel = Arc::new(Kernel::default());
        let handle = begin(&kernel);

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let kernel = Arc::clone(&kernel);
                thread::spawn(move || {
                    for _ in 0..50 {
                        kernel.add_line(handle, b"ITEM", 1, 10).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(kernel.get_line_count(handle).unwrap(), 400);
        assert_eq!(kernel.get_totals(handle).unwrap().total.minor(), 4000);
    }
}

//! # Transaction Aggregate
//!
//! The sale transaction record and its state machine.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Transaction Lifecycle                                │
//! │                                                                         │
//! │   begin ──► ┌──────────┐  add_tender (tendered ≥ total)  ┌───────────┐  │
//! │             │ Building │ ───────────────────────────────► │ Completed │  │
//! │             └──────────┘                                  └───────────┘  │
//! │               │    ▲                                          │          │
//! │   add_line ───┘    │ add_tender (tendered < total)            │          │
//! │   add_tender ──────┘                                          │          │
//! │                                                               │          │
//! │   add_child_line / void_line: Building only                   │          │
//! │   get_totals / line reads: allowed in both states             │          │
//! │   any mutation in Completed: InvalidState ◄───────────────────┘          │
//! │   close: removes the handle in any state (pos-kernel)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Derived Totals
//! Totals are never cached. `total`, `tendered` and `change` are recomputed
//! from the line and tender sequences on every read, so they cannot drift
//! from the data they summarize. Voided lines stay in the sequence (and in
//! the line count) but contribute nothing to the total.
//!
//! ## Linked Lines
//! ```text
//!   0 BURGER                  void_line(0) voids 0, 1, 2 and 3
//!   ├── 1 EXTRA-CHEESE        void_line(1) voids 1 and 2
//!   │   └── 2 EXTRA-BACON
//!   └── 3 SIDE-FRIES
//!   4 SODA                    (top level, untouched)
//! ```
//! A child always refers to an earlier line, so the tree below any line
//! is found in one forward pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{
    validate_capacity, validate_line_index, validate_quantity, validate_reason, validate_sku,
    validate_tender_amount, validate_unit_price, BeginArgs, Limits,
};

// =============================================================================
// Transaction State
// =============================================================================

/// The lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// Lines and tenders may be appended.
    #[default]
    Building,
    /// Fully tendered; no further mutation.
    Completed,
}

impl TransactionState {
    /// Stable integer code reported across the boundary.
    #[inline]
    pub const fn code(&self) -> i32 {
        match self {
            TransactionState::Building => 0,
            TransactionState::Completed => 1,
        }
    }

    /// Returns true if lines and tenders may still be appended.
    #[inline]
    pub const fn is_mutable(&self) -> bool {
        matches!(self, TransactionState::Building)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Building => write!(f, "building"),
            TransactionState::Completed => write!(f, "completed"),
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// A line item in a transaction. Only the void fields change after it is
/// appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    /// Always > 0.
    pub quantity: i32,
    /// Always >= 0.
    pub unit_price: Money,
    /// Zero-based index of the line this one is linked to (a modifier or
    /// add-on), always lower than this line's own index.
    pub parent_line: Option<u32>,
    pub added_at: DateTime<Utc>,
    pub voided_at: Option<DateTime<Utc>>,
    pub void_reason: Option<String>,
}

impl LineItem {
    /// Line total (unit price × quantity), `None` on overflow.
    #[inline]
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul_quantity(i64::from(self.quantity))
    }

    /// What the line adds to the transaction total: zero once voided.
    #[inline]
    pub fn effective_total(&self) -> Option<Money> {
        if self.is_voided() {
            Some(Money::zero())
        } else {
            self.line_total()
        }
    }

    #[inline]
    pub fn is_voided(&self) -> bool {
        self.voided_at.is_some()
    }
}

// =============================================================================
// Tender
// =============================================================================

/// A cash payment applied toward the transaction total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tender {
    /// Always > 0.
    pub amount: Money,
    pub tendered_at: DateTime<Utc>,
}

// =============================================================================
// Totals
// =============================================================================

/// Totals as reported by "get totals".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total: Money,
    pub tendered: Money,
    /// `tendered - total`; negative when under-tendered.
    pub change: Money,
    pub state: TransactionState,
}

// =============================================================================
// Snapshot
// =============================================================================

/// A serializable copy of a transaction, used for the JSON read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSnapshot {
    pub handle: u64,
    pub sale_id: Uuid,
    pub store_id: String,
    pub currency: String,
    pub decimal_places: u8,
    pub state: TransactionState,
    pub lines: Vec<LineItem>,
    pub tenders: Vec<Tender>,
    pub total_minor: i64,
    pub tendered_minor: i64,
    pub change_minor: i64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Transaction
// =============================================================================

/// A point-of-sale sale transaction.
///
/// ## Invariants
/// - `store_id` and `currency` are set once, here, and never empty
/// - every line has `quantity > 0` and `unit_price >= 0`
/// - every tender has `amount > 0`
/// - lines and tenders are only appended while `Building`
/// - the running total and tendered sums always fit in `i64`
#[derive(Debug, Clone)]
pub struct Transaction {
    id: u64,
    sale_id: Uuid,
    store_id: String,
    currency: String,
    decimal_places: u8,
    state: TransactionState,
    lines: Vec<LineItem>,
    tenders: Vec<Tender>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Creates a new transaction in `Building` from validated arguments.
    pub fn new(id: u64, args: BeginArgs) -> Self {
        Transaction {
            id,
            sale_id: Uuid::new_v4(),
            store_id: args.store_id,
            currency: args.currency,
            decimal_places: args.decimal_places,
            state: TransactionState::Building,
            lines: Vec::new(),
            tenders: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn sale_id(&self) -> Uuid {
        self.sale_id
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Minor-unit digits of the currency, as supplied at begin.
    pub fn decimal_places(&self) -> u8 {
        self.decimal_places
    }

    /// Formats an amount with this transaction's decimal places.
    pub fn format_amount(&self, amount: Money) -> String {
        amount.format_with_places(self.decimal_places)
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn tenders(&self) -> &[Tender] {
        &self.tenders
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the line at a zero-based index.
    pub fn line(&self, index: u32) -> CoreResult<&LineItem> {
        let index = validate_line_index(index, self.lines.len())?;
        Ok(&self.lines[index])
    }

    /// Indexes of every line linked below `index`, directly or through
    /// other children, in ascending order. Voided children are included.
    pub fn line_children(&self, index: u32) -> CoreResult<Vec<u32>> {
        let root = validate_line_index(index, self.lines.len())?;
        Ok(self.descendants(root))
    }

    fn descendants(&self, root: usize) -> Vec<u32> {
        let mut in_tree = vec![false; self.lines.len()];
        in_tree[root] = true;

        let mut found = Vec::new();
        for (i, line) in self.lines.iter().enumerate().skip(root + 1) {
            if let Some(parent) = line.parent_line {
                if in_tree[parent as usize] {
                    in_tree[i] = true;
                    // Line indexes are bounded to u32 when lines are appended.
                    found.push(i as u32);
                }
            }
        }
        found
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Appends a top-level line item.
    ///
    /// Checks run in contract order: state, then argument shape, then
    /// capacity, then overflow. On any error the transaction is unchanged.
    pub fn add_line(
        &mut self,
        sku: &[u8],
        quantity: i32,
        unit_price_minor: i64,
        limits: &Limits,
    ) -> CoreResult<&LineItem> {
        self.ensure_mutable("add line")?;
        self.push_line(sku, quantity, unit_price_minor, None, limits)
    }

    /// Appends a line linked to an existing, non-voided parent line.
    pub fn add_child_line(
        &mut self,
        parent_index: u32,
        sku: &[u8],
        quantity: i32,
        unit_price_minor: i64,
        limits: &Limits,
    ) -> CoreResult<&LineItem> {
        self.ensure_mutable("add child line")?;

        let parent = validate_line_index(parent_index, self.lines.len())?;
        if self.lines[parent].is_voided() {
            return Err(ValidationError::LineVoided {
                index: parent_index,
            }
            .into());
        }

        self.push_line(sku, quantity, unit_price_minor, Some(parent_index), limits)
    }

    fn push_line(
        &mut self,
        sku: &[u8],
        quantity: i32,
        unit_price_minor: i64,
        parent_line: Option<u32>,
        limits: &Limits,
    ) -> CoreResult<&LineItem> {
        let sku = validate_sku(sku, limits)?;
        validate_quantity(quantity)?;
        validate_unit_price(unit_price_minor)?;
        validate_capacity("lines", self.lines.len(), limits.max_lines_per_transaction)?;
        u32::try_from(self.lines.len()).map_err(|_| CoreError::Overflow { what: "line index" })?;

        let line = LineItem {
            sku: sku.to_string(),
            quantity,
            unit_price: Money::from_minor(unit_price_minor),
            parent_line,
            added_at: Utc::now(),
            voided_at: None,
            void_reason: None,
        };
        let line_total = line
            .line_total()
            .ok_or(CoreError::Overflow { what: "line total" })?;
        self.total()?
            .checked_add(line_total)
            .ok_or(CoreError::Overflow {
                what: "transaction total",
            })?;

        self.lines.push(line);
        Ok(&self.lines[self.lines.len() - 1])
    }

    /// Voids a line and every line linked below it.
    ///
    /// Returns the indexes voided by this call: the line itself first, then
    /// its children in ascending order. Children voided earlier are skipped.
    /// Voiding never changes the state; a sale whose remaining total is now
    /// covered completes on its next tender.
    pub fn void_line(&mut self, index: u32, reason: &[u8], limits: &Limits) -> CoreResult<Vec<u32>> {
        self.ensure_mutable("void line")?;

        let root = validate_line_index(index, self.lines.len())?;
        let reason = validate_reason(reason, limits)?;
        if self.lines[root].is_voided() {
            return Err(ValidationError::LineVoided { index }.into());
        }

        let now = Utc::now();
        let mut voided = vec![index];
        voided.extend(
            self.descendants(root)
                .into_iter()
                .filter(|&child| !self.lines[child as usize].is_voided()),
        );
        for &i in &voided {
            let line = &mut self.lines[i as usize];
            line.voided_at = Some(now);
            line.void_reason = Some(reason.to_string());
        }

        Ok(voided)
    }

    /// Appends a cash tender and returns the resulting state.
    ///
    /// The transaction completes as soon as the tendered sum covers the total.
    pub fn add_tender(&mut self, amount_minor: i64, limits: &Limits) -> CoreResult<TransactionState> {
        self.ensure_mutable("add tender")?;

        validate_tender_amount(amount_minor)?;
        validate_capacity(
            "tenders",
            self.tenders.len(),
            limits.max_tenders_per_transaction,
        )?;

        let amount = Money::from_minor(amount_minor);
        let tendered = self
            .tendered()?
            .checked_add(amount)
            .ok_or(CoreError::Overflow {
                what: "tendered total",
            })?;
        let total = self.total()?;

        let now = Utc::now();
        self.tenders.push(Tender {
            amount,
            tendered_at: now,
        });

        if tendered >= total {
            self.state = TransactionState::Completed;
            self.completed_at = Some(now);
        }

        Ok(self.state)
    }

    fn ensure_mutable(&self, operation: &'static str) -> CoreResult<()> {
        if !self.state.is_mutable() {
            return Err(CoreError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Derived Values
    // =========================================================================

    /// Σ(quantity × unit_price) over all non-voided lines.
    pub fn total(&self) -> CoreResult<Money> {
        let mut total = Money::zero();
        for line in &self.lines {
            total = line
                .effective_total()
                .and_then(|lt| total.checked_add(lt))
                .ok_or(CoreError::Overflow {
                    what: "transaction total",
                })?;
        }
        Ok(total)
    }

    /// Σ(amount) over all tenders.
    pub fn tendered(&self) -> CoreResult<Money> {
        Money::checked_sum(self.tenders.iter().map(|t| t.amount)).ok_or(CoreError::Overflow {
            what: "tendered total",
        })
    }

    /// Total, tendered, change and state in one read.
    pub fn totals(&self) -> CoreResult<Totals> {
        let total = self.total()?;
        let tendered = self.tendered()?;
        let change = tendered
            .checked_sub(total)
            .ok_or(CoreError::Overflow { what: "change" })?;

        Ok(Totals {
            total,
            tendered,
            change,
            state: self.state,
        })
    }

    /// Builds a serializable copy of the transaction.
    pub fn snapshot(&self) -> CoreResult<TransactionSnapshot> {
        let totals = self.totals()?;

        Ok(TransactionSnapshot {
            handle: self.id,
            sale_id: self.sale_id,
            store_id: self.store_id.clone(),
            currency: self.currency.clone(),
            decimal_places: self.decimal_places,
            state: self.state,
            lines: self.lines.clone(),
            tenders: self.tenders.clone(),
            total_minor: totals.total.minor(),
            tendered_minor: totals.tendered.minor(),
            change_minor: totals.change.minor(),
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{validate_begin, validate_begin_with_places};

    fn new_transaction() -> Transaction {
        let args = validate_begin(b"Store-001", b"USD", &Limits::default()).unwrap();
        Transaction::new(42, args)
    }

    #[test]
    fn test_new_transaction_is_building_and_empty() {
        let tx = new_transaction();
        assert_eq!(tx.id(), 42);
        assert_eq!(tx.store_id(), "Store-001");
        assert_eq!(tx.currency(), "USD");
        assert_eq!(tx.decimal_places(), 2);
        assert_eq!(tx.state(), TransactionState::Building);
        assert_eq!(tx.line_count(), 0);
        assert_eq!(tx.total().unwrap(), Money::zero());
    }

    #[test]
    fn test_coffee_and_muffin_scenario() {
        let limits = Limits::default();
        let mut tx = new_transaction();

        tx.add_line(b"COFFEE", 1, 399, &limits).unwrap();
        tx.add_line(b"MUFFIN", 1, 249, &limits).unwrap();
        assert_eq!(tx.state(), TransactionState::Building);

        let state = tx.add_tender(1000, &limits).unwrap();
        assert_eq!(state, TransactionState::Completed);

        let totals = tx.totals().unwrap();
        assert_eq!(totals.total.minor(), 648);
        assert_eq!(totals.tendered.minor(), 1000);
        assert_eq!(totals.change.minor(), 352);
        assert_eq!(totals.state, TransactionState::Completed);
    }

    #[test]
    fn test_total_is_order_independent() {
        let limits = Limits::default();
        let items: [(&[u8], i32, i64); 3] = [(b"A", 3, 125), (b"B", 1, 0), (b"C", 7, 999)];

        let mut forward = new_transaction();
        for (sku, qty, price) in items {
            forward.add_line(sku, qty, price, &limits).unwrap();
        }

        let mut backward = new_transaction();
        for (sku, qty, price) in items.iter().rev() {
            backward.add_line(sku, *qty, *price, &limits).unwrap();
        }

        assert_eq!(forward.total().unwrap().minor(), 3 * 125 + 7 * 999);
        assert_eq!(forward.total().unwrap(), backward.total().unwrap());
    }

    #[test]
    fn test_under_tender_reports_negative_change() {
        let limits = Limits::default();
        let mut tx = new_transaction();
        tx.add_line(b"WIDGET", 2, 500, &limits).unwrap();

        let state = tx.add_tender(300, &limits).unwrap();
        assert_eq!(state, TransactionState::Building);

        let totals = tx.totals().unwrap();
        assert_eq!(totals.change.minor(), -700);

        // A second tender covering the rest completes the sale.
        assert_eq!(tx.add_tender(700, &limits).unwrap(), TransactionState::Completed);
        assert_eq!(tx.totals().unwrap().change.minor(), 0);
    }

    #[test]
    fn test_invalid_lines_leave_transaction_unchanged() {
        let limits = Limits::default();
        let mut tx = new_transaction();

        assert!(matches!(
            tx.add_line(b"SKU", 0, 100, &limits),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
        assert!(matches!(
            tx.add_line(b"SKU", 1, -100, &limits),
            Err(CoreError::Validation(ValidationError::MustNotBeNegative { .. }))
        ));
        assert!(matches!(
            tx.add_line(b"", 1, 100, &limits),
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));
        assert_eq!(tx.line_count(), 0);
    }

    #[test]
    fn test_completed_rejects_mutation_before_validation() {
        let limits = Limits::default();
        let mut tx = new_transaction();
        tx.add_line(b"ITEM", 1, 325, &limits).unwrap();
        tx.add_tender(500, &limits).unwrap();

        // State is checked before argument shape.
        assert!(matches!(
            tx.add_line(b"", 0, -1, &limits),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            tx.add_tender(-1, &limits),
            Err(CoreError::InvalidState { .. })
        ));

        let totals = tx.totals().unwrap();
        assert_eq!(totals.total.minor(), 325);
        assert_eq!(totals.tendered.minor(), 500);
        assert_eq!(tx.line_count(), 1);
    }

    #[test]
    fn test_overflow_rejected_without_mutation() {
        let limits = Limits::default();
        let mut tx = new_transaction();

        assert!(matches!(
            tx.add_line(b"BIG", 2, i64::MAX, &limits),
            Err(CoreError::Overflow { .. })
        ));
        assert_eq!(tx.line_count(), 0);

        tx.add_line(b"BIG", 1, i64::MAX, &limits).unwrap();
        assert!(matches!(
            tx.add_line(b"ONE", 1, 1, &limits),
            Err(CoreError::Overflow { .. })
        ));
        assert_eq!(tx.line_count(), 1);
        assert_eq!(tx.total().unwrap().minor(), i64::MAX);
    }

    #[test]
    fn test_line_limit() {
        let limits = Limits {
            max_lines_per_transaction: 2,
            ..Limits::default()
        };
        let mut tx = new_transaction();
        tx.add_line(b"A", 1, 1, &limits).unwrap();
        tx.add_line(b"B", 1, 1, &limits).unwrap();
        assert!(matches!(
            tx.add_line(b"C", 1, 1, &limits),
            Err(CoreError::Validation(ValidationError::LimitExceeded { max: 2, .. }))
        ));
    }

    #[test]
    fn test_line_lookup() {
        let limits = Limits::default();
        let mut tx = new_transaction();
        tx.add_line(b"COFFEE", 2, 399, &limits).unwrap();

        let line = tx.line(0).unwrap();
        assert_eq!(line.sku, "COFFEE");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.unit_price.minor(), 399);
        assert!(tx.line(1).is_err());
    }

    #[test]
    fn test_snapshot_serializes() {
        let limits = Limits::default();
        let mut tx = new_transaction();
        tx.add_line(b"COFFEE", 1, 399, &limits).unwrap();

        let snapshot = tx.snapshot().unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["store_id"], "Store-001");
        assert_eq!(json["state"], "building");
        assert_eq!(json["total_minor"], 399);
        assert_eq!(json["lines"][0]["unit_price"], 399);
        assert!(json["lines"][0]["parent_line"].is_null());
        assert!(json["lines"][0]["voided_at"].is_null());
        assert_eq!(json["decimal_places"], 2);
        assert!(json["completed_at"].is_null());
    }

    #[test]
    fn test_identifiers_are_stored_unchanged() {
        let limits = Limits::default();
        let mut tx = new_transaction();
        tx.add_line(b"  COFFEE ", 1, 399, &limits).unwrap();
        tx.add_line(b" ", 1, 100, &limits).unwrap();

        assert_eq!(tx.line(0).unwrap().sku, "  COFFEE ");
        assert_eq!(tx.line(1).unwrap().sku, " ");
        assert_eq!(tx.total().unwrap().minor(), 499);
    }

    /// BURGER(0) ─┬─ CHEESE(1) ── BACON(2)
    ///            └─ FRIES(3)
    /// SODA(4)
    fn burger_meal(limits: &Limits) -> Transaction {
        let mut tx = new_transaction();
        tx.add_line(b"BURGER", 1, 899, limits).unwrap();
        tx.add_child_line(0, b"CHEESE", 1, 100, limits).unwrap();
        tx.add_child_line(1, b"BACON", 1, 150, limits).unwrap();
        tx.add_child_line(0, b"FRIES", 1, 299, limits).unwrap();
        tx.add_line(b"SODA", 2, 199, limits).unwrap();
        tx
    }

    #[test]
    fn test_child_lines_record_parent() {
        let limits = Limits::default();
        let tx = burger_meal(&limits);

        assert_eq!(tx.line(0).unwrap().parent_line, None);
        assert_eq!(tx.line(1).unwrap().parent_line, Some(0));
        assert_eq!(tx.line(2).unwrap().parent_line, Some(1));
        assert_eq!(tx.line(3).unwrap().parent_line, Some(0));
        assert_eq!(tx.total().unwrap().minor(), 899 + 100 + 150 + 299 + 398);

        assert_eq!(tx.line_children(0).unwrap(), vec![1, 2, 3]);
        assert_eq!(tx.line_children(1).unwrap(), vec![2]);
        assert!(tx.line_children(4).unwrap().is_empty());
        assert!(tx.line_children(5).is_err());
    }

    #[test]
    fn test_child_line_requires_existing_parent() {
        let limits = Limits::default();
        let mut tx = new_transaction();
        assert!(matches!(
            tx.add_child_line(0, b"CHEESE", 1, 100, &limits),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert_eq!(tx.line_count(), 0);
    }

    #[test]
    fn test_void_cascades_to_children() {
        let limits = Limits::default();
        let mut tx = burger_meal(&limits);

        let voided = tx.void_line(0, b"wrong order", &limits).unwrap();
        assert_eq!(voided, vec![0, 1, 2, 3]);

        // Voided lines stay in the sequence but no longer count.
        assert_eq!(tx.line_count(), 5);
        assert_eq!(tx.total().unwrap().minor(), 398);
        let line = tx.line(2).unwrap();
        assert!(line.is_voided());
        assert_eq!(line.void_reason.as_deref(), Some("wrong order"));
        assert!(!tx.line(4).unwrap().is_voided());
    }

    #[test]
    fn test_void_child_leaves_parent() {
        let limits = Limits::default();
        let mut tx = burger_meal(&limits);

        assert_eq!(tx.void_line(1, b"", &limits).unwrap(), vec![1, 2]);
        assert_eq!(tx.total().unwrap().minor(), 899 + 299 + 398);

        // Already-voided children are not voided twice.
        assert_eq!(tx.void_line(0, b"", &limits).unwrap(), vec![0, 3]);
        assert!(matches!(
            tx.void_line(2, b"", &limits),
            Err(CoreError::Validation(ValidationError::LineVoided { index: 2 }))
        ));
        assert!(matches!(
            tx.add_child_line(0, b"SAUCE", 1, 50, &limits),
            Err(CoreError::Validation(ValidationError::LineVoided { index: 0 }))
        ));
    }

    #[test]
    fn test_void_requires_building() {
        let limits = Limits::default();
        let mut tx = burger_meal(&limits);
        tx.add_tender(10_000, &limits).unwrap();

        assert!(matches!(
            tx.void_line(99, &[0xff], &limits),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            tx.add_child_line(0, b"SAUCE", 1, 50, &limits),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(!tx.line(0).unwrap().is_voided());
    }

    #[test]
    fn test_void_then_tender_completes_on_reduced_total() {
        let limits = Limits::default();
        let mut tx = burger_meal(&limits);
        tx.void_line(0, b"", &limits).unwrap();

        assert_eq!(tx.add_tender(398, &limits).unwrap(), TransactionState::Completed);
        assert_eq!(tx.totals().unwrap().change.minor(), 0);
    }

    #[test]
    fn test_decimal_places_drive_formatting() {
        let limits = Limits::default();
        let args = validate_begin_with_places(b"Store-001", b"JPY", 0, &limits).unwrap();
        let mut tx = Transaction::new(7, args);
        tx.add_line(b"RAMEN", 1, 980, &limits).unwrap();

        assert_eq!(tx.decimal_places(), 0);
        assert_eq!(tx.format_amount(tx.total().unwrap()), "980");
        assert_eq!(new_transaction().format_amount(Money::from_minor(980)), "9.80");
        assert_eq!(tx.snapshot().unwrap().decimal_places, 0);
    }

    #[test]
    fn test_state_codes() {
        assert_eq!(TransactionState::Building.code(), 0);
        assert_eq!(TransactionState::Completed.code(), 1);
        assert_eq!(TransactionState::default(), TransactionState::Building);
    }
}

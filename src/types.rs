//! Core document types and errors shared by the matching engine and the budget ledger

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matching::tolerance::AppliedTolerance;

/// Request-scoped handle carrying the tenant and the caller's identity
///
/// Every engine operation receives one explicitly instead of reading an
/// ambient session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Company (tenant) the request is scoped to
    pub company_id: String,
    /// Authenticated user, if the session resolved one
    pub user_id: Option<String>,
    /// Moment the request was received
    pub requested_at: DateTime<Utc>,
}

impl RequestContext {
    /// Create a context for an authenticated user
    pub fn new(company_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            user_id: Some(user_id.into()),
            requested_at: Utc::now(),
        }
    }

    /// Create a context with no resolved identity
    pub fn anonymous(company_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            user_id: None,
            requested_at: Utc::now(),
        }
    }

    /// Pin the request timestamp (fiscal year resolution, override attribution)
    pub fn at(mut self, requested_at: DateTime<Utc>) -> Self {
        self.requested_at = requested_at;
        self
    }

    /// The authenticated user id, or `Unauthenticated`
    pub fn require_user(&self) -> ProcurementResult<&str> {
        match self.user_id.as_deref() {
            Some(user_id) if !user_id.trim().is_empty() => Ok(user_id),
            _ => Err(ProcurementError::Unauthenticated(
                "no authenticated user on request".to_string(),
            )),
        }
    }
}

/// Purchase order line, the baseline for matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    /// Unique identifier for the line
    pub id: String,
    /// Purchase order the line belongs to
    pub po_id: String,
    /// Free text, also the match key against invoice lines
    pub description: String,
    /// Ordered quantity
    pub quantity: BigDecimal,
    /// Agreed unit price
    pub unit_price: BigDecimal,
}

impl PurchaseOrderLine {
    /// Create a new purchase order line
    pub fn new(
        id: String,
        po_id: String,
        description: String,
        quantity: BigDecimal,
        unit_price: BigDecimal,
    ) -> Self {
        Self {
            id,
            po_id,
            description,
            quantity,
            unit_price,
        }
    }

    /// Ordered quantity times unit price
    pub fn line_total(&self) -> BigDecimal {
        &self.quantity * &self.unit_price
    }
}

/// Purchase order with its line items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    /// Unique identifier for the purchase order
    pub id: String,
    /// Owning company
    pub company_id: String,
    /// Human-readable document number
    pub po_number: String,
    /// Line items in entry order
    pub lines: Vec<PurchaseOrderLine>,
}

impl PurchaseOrder {
    /// Create a purchase order with no lines
    pub fn new(id: String, company_id: String, po_number: String) -> Self {
        Self {
            id,
            company_id,
            po_number,
            lines: Vec::new(),
        }
    }

    /// Append a line, stamping it with this order's id
    pub fn add_line(
        &mut self,
        line_id: String,
        description: String,
        quantity: BigDecimal,
        unit_price: BigDecimal,
    ) -> &PurchaseOrderLine {
        let po_id = self.id.clone();
        let line = PurchaseOrderLine::new(line_id, po_id, description, quantity, unit_price);
        self.lines.push(line);
        &self.lines[self.lines.len() - 1]
    }

    /// Sum of line totals
    pub fn total_amount(&self) -> BigDecimal {
        self.lines.iter().map(|line| line.line_total()).sum()
    }
}

/// Goods receipt status; only confirmed receipts count towards matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoodsReceiptStatus {
    Draft,
    Confirmed,
    Cancelled,
}

/// Quantity received for one purchase order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodsReceiptLine {
    /// Unique identifier for the line
    pub id: String,
    /// Goods receipt the line belongs to
    pub gr_id: String,
    /// Purchase order line this quantity was received against
    pub po_line_item_id: String,
    /// Quantity physically received
    pub received_qty: BigDecimal,
}

/// Goods receipt recorded against a purchase order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodsReceipt {
    /// Unique identifier for the goods receipt
    pub id: String,
    /// Owning company
    pub company_id: String,
    /// Purchase order the goods were delivered against
    pub po_id: String,
    pub status: GoodsReceiptStatus,
    pub lines: Vec<GoodsReceiptLine>,
}

impl GoodsReceipt {
    /// Create a goods receipt with no lines
    pub fn new(id: String, company_id: String, po_id: String, status: GoodsReceiptStatus) -> Self {
        Self {
            id,
            company_id,
            po_id,
            status,
            lines: Vec::new(),
        }
    }

    /// Record a received quantity for a purchase order line
    pub fn receive(&mut self, po_line_item_id: String, received_qty: BigDecimal) {
        let line = GoodsReceiptLine {
            id: uuid::Uuid::new_v4().to_string(),
            gr_id: self.id.clone(),
            po_line_item_id,
            received_qty,
        };
        self.lines.push(line);
    }

    /// Whether the receipt counts towards matching
    pub fn is_confirmed(&self) -> bool {
        self.status == GoodsReceiptStatus::Confirmed
    }
}

/// AP voucher line item as invoiced by the vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// Matched against purchase order line descriptions
    pub description: String,
    /// Invoiced quantity
    pub quantity: BigDecimal,
    /// Invoiced unit price
    pub unit_price: BigDecimal,
}

impl InvoiceLine {
    /// Create a new invoice line
    pub fn new(description: String, quantity: BigDecimal, unit_price: BigDecimal) -> Self {
        Self {
            description,
            quantity,
            unit_price,
        }
    }

    /// Invoiced quantity times unit price
    pub fn line_total(&self) -> BigDecimal {
        &self.quantity * &self.unit_price
    }
}

/// Voucher-level matching verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStatus {
    /// No purchase order reference; never written by a matching run
    Unmatched,
    Matched,
    ToleranceExceeded,
    /// Manual override by a reviewer
    ForceMatched,
}

impl MatchingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchingStatus::Unmatched => "unmatched",
            MatchingStatus::Matched => "matched",
            MatchingStatus::ToleranceExceeded => "tolerance_exceeded",
            MatchingStatus::ForceMatched => "force_matched",
        }
    }

    /// Whether the voucher may proceed to approval
    pub fn is_cleared(&self) -> bool {
        matches!(self, Self::Matched | Self::ForceMatched)
    }
}

/// Per-line classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLineStatus {
    Matched,
    WithinTolerance,
    Exceeded,
}

/// Outcome of matching one invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchLineResult {
    /// Matched purchase order line, empty when no description matched
    pub po_line_id: String,
    /// Invoice line description
    pub description: String,
    /// Ordered quantity, zero for an unmatched line
    pub po_qty: BigDecimal,
    /// Sum across confirmed goods receipts
    pub gr_qty: BigDecimal,
    pub invoice_qty: BigDecimal,
    /// Agreed unit price, zero for an unmatched line
    pub po_price: BigDecimal,
    pub invoice_price: BigDecimal,
    /// Percentage, two decimals
    pub qty_variance: BigDecimal,
    /// Percentage, two decimals
    pub price_variance: BigDecimal,
    pub status: MatchLineStatus,
}

impl MatchLineResult {
    /// Whether a purchase order line was found for the invoice line
    pub fn has_po_line(&self) -> bool {
        !self.po_line_id.is_empty()
    }
}

/// Manual override record stored in place of computed line results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceMatchRecord {
    /// Always `true`; kept so the stored payload is self-describing
    pub force_matched: bool,
    /// User who applied the override
    pub force_matched_by: String,
    /// Moment the override was requested
    pub force_matched_at: DateTime<Utc>,
    /// Reviewer's justification
    pub reason: String,
}

/// Matching payload persisted on the voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchingResult {
    Override(ForceMatchRecord),
    Computed {
        lines: Vec<MatchLineResult>,
        tolerance: AppliedTolerance,
    },
}

impl MatchingResult {
    /// Computed line results, if this is not an override
    pub fn lines(&self) -> Option<&[MatchLineResult]> {
        match self {
            MatchingResult::Computed { lines, .. } => Some(lines),
            MatchingResult::Override(_) => None,
        }
    }
}

/// Accounts payable voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApVoucher {
    /// Unique identifier for the voucher
    pub id: String,
    /// Owning company
    pub company_id: String,
    /// Purchase order the invoice was raised against
    pub po_id: Option<String>,
    /// Invoiced line items
    pub lines: Vec<InvoiceLine>,
    /// Verdict of the latest matching write
    pub matching_status: MatchingStatus,
    /// Line results or override record behind `matching_status`
    pub matching_result: Option<MatchingResult>,
    /// Bumped on every matching write
    pub version: u64,
    pub updated_at: NaiveDateTime,
}

impl ApVoucher {
    /// Create an unmatched voucher with no lines
    pub fn new(id: String, company_id: String, po_id: Option<String>) -> Self {
        Self {
            id,
            company_id,
            po_id,
            lines: Vec::new(),
            matching_status: MatchingStatus::Unmatched,
            matching_result: None,
            version: 0,
            updated_at: Utc::now().naive_utc(),
        }
    }

    /// Append an invoice line
    pub fn add_line(&mut self, line: InvoiceLine) {
        self.lines.push(line);
        self.updated_at = Utc::now().naive_utc();
    }

    /// Sum of invoiced line totals before tax
    pub fn subtotal(&self) -> BigDecimal {
        self.lines.iter().map(|line| line.line_total()).sum()
    }
}

/// Resource touched by a write, for downstream cache refresh
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "resource", content = "id", rename_all = "snake_case")]
pub enum ResourceChange {
    ApVoucher(String),
    BudgetControl(String),
}

/// Errors raised by the procurement engine
#[derive(Debug, thiserror::Error)]
pub enum ProcurementError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("AP voucher not found: {0}")]
    VoucherNotFound(String),
    #[error("Purchase order not found: {0}")]
    PurchaseOrderNotFound(String),
    #[error("Budget control not found: {0}")]
    BudgetNotFound(String),
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Budget {budget_id} exceeded: requested {requested}, remaining {remaining}")]
    BudgetExceeded {
        budget_id: String,
        requested: BigDecimal,
        remaining: BigDecimal,
    },
    #[error("Concurrent modification: {0}")]
    Conflict(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for procurement operations
pub type ProcurementResult<T> = Result<T, ProcurementError>;

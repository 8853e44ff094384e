//! Traits for storage abstraction and change propagation

use async_trait::async_trait;
use bigdecimal::BigDecimal;

use crate::budget::control::{BudgetControl, BudgetScopeQuery, CostCenter, Department};
use crate::matching::tolerance::ToleranceGroup;
use crate::types::*;

/// Read access to procurement documents plus the voucher matching write
///
/// Implementations back this with whatever store holds the documents
/// (PostgreSQL, a hosted API, in-memory, etc.). Row-level tenancy is the
/// implementation's concern; the services re-check `company_id` anyway.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Get an AP voucher with its line items
    async fn get_ap_voucher(&self, ap_id: &str) -> ProcurementResult<Option<ApVoucher>>;

    /// Get a purchase order with its line items
    async fn get_purchase_order(&self, po_id: &str) -> ProcurementResult<Option<PurchaseOrder>>;

    /// List goods receipts for a purchase order, optionally filtered by status
    async fn list_goods_receipts(
        &self,
        po_id: &str,
        status: Option<GoodsReceiptStatus>,
    ) -> ProcurementResult<Vec<GoodsReceipt>>;

    /// The first active tolerance group for a company, if any
    async fn get_active_tolerance_group(
        &self,
        company_id: &str,
    ) -> ProcurementResult<Option<ToleranceGroup>>;

    /// Write the matching verdict if the voucher is still at `expected_version`
    ///
    /// Returns `false` without writing when the version moved on; a
    /// successful write bumps the version.
    async fn update_matching(
        &self,
        ap_id: &str,
        expected_version: u64,
        status: MatchingStatus,
        result: &MatchingResult,
    ) -> ProcurementResult<bool>;
}

/// Storage for budget control rows and the org lookups that scope them
#[async_trait]
pub trait BudgetStorage: Send + Sync {
    /// Resolve a department by code within a company
    async fn find_department(
        &self,
        company_id: &str,
        code: &str,
    ) -> ProcurementResult<Option<Department>>;

    /// Resolve a cost center by code within a company
    async fn find_cost_center(
        &self,
        company_id: &str,
        code: &str,
    ) -> ProcurementResult<Option<CostCenter>>;

    /// Active budget controls matching a scope
    async fn find_budget_controls(
        &self,
        query: &BudgetScopeQuery,
    ) -> ProcurementResult<Vec<BudgetControl>>;

    /// Get a budget control row by id
    async fn get_budget_control(&self, id: &str) -> ProcurementResult<Option<BudgetControl>>;

    /// Write new reserved/used balances if the row is still at `expected_version`
    ///
    /// Must be a single atomic compare-and-set; returns `false` on a version
    /// mismatch. A successful write bumps the version.
    async fn update_budget_balances(
        &self,
        budget_id: &str,
        expected_version: u64,
        reserved_amount: &BigDecimal,
        used_amount: &BigDecimal,
    ) -> ProcurementResult<bool>;
}

/// Receives a signal after every successful write so dependent views can refresh
pub trait ChangeNotifier: Send + Sync {
    fn notify(&self, change: &ResourceChange);
}

/// Notifier that drops every signal
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn notify(&self, _change: &ResourceChange) {}
}

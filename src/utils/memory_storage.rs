//! In-memory storage implementation for testing

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::budget::control::{BudgetControl, BudgetScopeQuery, CostCenter, Department};
use crate::matching::tolerance::ToleranceGroup;
use crate::traits::*;
use crate::types::*;

fn read<T>(lock: &RwLock<T>) -> ProcurementResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| ProcurementError::Storage("memory storage lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> ProcurementResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| ProcurementError::Storage("memory storage lock poisoned".to_string()))
}

/// In-memory storage implementation for testing and development
///
/// Clones share the same underlying data, so one instance can back both
/// services and the test that seeds it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    vouchers: Arc<RwLock<HashMap<String, ApVoucher>>>,
    purchase_orders: Arc<RwLock<HashMap<String, PurchaseOrder>>>,
    goods_receipts: Arc<RwLock<Vec<GoodsReceipt>>>,
    tolerance_groups: Arc<RwLock<Vec<ToleranceGroup>>>,
    departments: Arc<RwLock<Vec<Department>>>,
    cost_centers: Arc<RwLock<Vec<CostCenter>>>,
    budget_controls: Arc<RwLock<HashMap<String, BudgetControl>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an AP voucher
    pub fn save_ap_voucher(&self, voucher: ApVoucher) -> ProcurementResult<()> {
        write(&self.vouchers)?.insert(voucher.id.clone(), voucher);
        Ok(())
    }

    /// Insert or replace a purchase order
    pub fn save_purchase_order(&self, purchase_order: PurchaseOrder) -> ProcurementResult<()> {
        write(&self.purchase_orders)?.insert(purchase_order.id.clone(), purchase_order);
        Ok(())
    }

    /// Insert or replace a goods receipt, keeping insertion order
    pub fn save_goods_receipt(&self, receipt: GoodsReceipt) -> ProcurementResult<()> {
        let mut receipts = write(&self.goods_receipts)?;
        match receipts.iter_mut().find(|gr| gr.id == receipt.id) {
            Some(existing) => *existing = receipt,
            None => receipts.push(receipt),
        }
        Ok(())
    }

    /// Change the status of a stored goods receipt
    pub fn set_goods_receipt_status(
        &self,
        gr_id: &str,
        status: GoodsReceiptStatus,
    ) -> ProcurementResult<()> {
        let mut receipts = write(&self.goods_receipts)?;
        let receipt = receipts
            .iter_mut()
            .find(|receipt| receipt.id == gr_id)
            .ok_or_else(|| {
                ProcurementError::Storage(format!("goods receipt {} not found", gr_id))
            })?;
        receipt.status = status;
        Ok(())
    }

    pub fn save_tolerance_group(&self, group: ToleranceGroup) -> ProcurementResult<()> {
        write(&self.tolerance_groups)?.push(group);
        Ok(())
    }

    pub fn save_department(&self, department: Department) -> ProcurementResult<()> {
        write(&self.departments)?.push(department);
        Ok(())
    }

    pub fn save_cost_center(&self, cost_center: CostCenter) -> ProcurementResult<()> {
        write(&self.cost_centers)?.push(cost_center);
        Ok(())
    }

    /// Insert or replace a budget control row
    pub fn save_budget_control(&self, control: BudgetControl) -> ProcurementResult<()> {
        write(&self.budget_controls)?.insert(control.id.clone(), control);
        Ok(())
    }
}

#[async_trait]
impl DocumentStorage for MemoryStorage {
    async fn get_ap_voucher(&self, ap_id: &str) -> ProcurementResult<Option<ApVoucher>> {
        Ok(read(&self.vouchers)?.get(ap_id).cloned())
    }

    async fn get_purchase_order(&self, po_id: &str) -> ProcurementResult<Option<PurchaseOrder>> {
        Ok(read(&self.purchase_orders)?.get(po_id).cloned())
    }

    async fn list_goods_receipts(
        &self,
        po_id: &str,
        status: Option<GoodsReceiptStatus>,
    ) -> ProcurementResult<Vec<GoodsReceipt>> {
        let receipts = read(&self.goods_receipts)?;
        Ok(receipts
            .iter()
            .filter(|receipt| receipt.po_id == po_id)
            .filter(|receipt| status.is_none_or(|s| receipt.status == s))
            .cloned()
            .collect())
    }

    async fn get_active_tolerance_group(
        &self,
        company_id: &str,
    ) -> ProcurementResult<Option<ToleranceGroup>> {
        let groups = read(&self.tolerance_groups)?;
        Ok(groups
            .iter()
            .find(|group| group.company_id == company_id && group.is_active)
            .cloned())
    }

    async fn update_matching(
        &self,
        ap_id: &str,
        expected_version: u64,
        status: MatchingStatus,
        result: &MatchingResult,
    ) -> ProcurementResult<bool> {
        let mut vouchers = write(&self.vouchers)?;
        let voucher = vouchers
            .get_mut(ap_id)
            .ok_or_else(|| ProcurementError::VoucherNotFound(ap_id.to_string()))?;

        if voucher.version != expected_version {
            return Ok(false);
        }

        voucher.matching_status = status;
        voucher.matching_result = Some(result.clone());
        voucher.version += 1;
        voucher.updated_at = chrono::Utc::now().naive_utc();
        Ok(true)
    }
}

#[async_trait]
impl BudgetStorage for MemoryStorage {
    async fn find_department(
        &self,
        company_id: &str,
        code: &str,
    ) -> ProcurementResult<Option<Department>> {
        let departments = read(&self.departments)?;
        Ok(departments
            .iter()
            .find(|d| d.company_id == company_id && d.code == code)
            .cloned())
    }

    async fn find_cost_center(
        &self,
        company_id: &str,
        code: &str,
    ) -> ProcurementResult<Option<CostCenter>> {
        let cost_centers = read(&self.cost_centers)?;
        Ok(cost_centers
            .iter()
            .find(|cc| cc.company_id == company_id && cc.code == code)
            .cloned())
    }

    async fn find_budget_controls(
        &self,
        query: &BudgetScopeQuery,
    ) -> ProcurementResult<Vec<BudgetControl>> {
        let controls = read(&self.budget_controls)?;
        let mut matching: Vec<BudgetControl> = controls
            .values()
            .filter(|control| {
                control.is_active
                    && control.company_id == query.company_id
                    && control.fiscal_year == query.fiscal_year
                    && control.department_id == query.department_id
                    && query
                        .cost_center_id
                        .as_ref()
                        .is_none_or(|cc| control.cost_center_id.as_ref() == Some(cc))
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matching)
    }

    async fn get_budget_control(
        &self,
        budget_id: &str,
    ) -> ProcurementResult<Option<BudgetControl>> {
        Ok(read(&self.budget_controls)?.get(budget_id).cloned())
    }

    async fn update_budget_balances(
        &self,
        budget_id: &str,
        expected_version: u64,
        reserved_amount: &BigDecimal,
        used_amount: &BigDecimal,
    ) -> ProcurementResult<bool> {
        let mut controls = write(&self.budget_controls)?;
        let control = controls
            .get_mut(budget_id)
            .ok_or_else(|| ProcurementError::BudgetNotFound(budget_id.to_string()))?;

        if control.version != expected_version {
            return Ok(false);
        }

        control.reserved_amount = reserved_amount.clone();
        control.used_amount = used_amount.clone();
        control.version += 1;
        control.updated_at = chrono::Utc::now().naive_utc();
        Ok(true)
    }
}

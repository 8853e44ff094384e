//! Matching service: loads documents, runs the engine, persists the verdict

use serde::{Deserialize, Serialize};

use crate::matching::engine;
use crate::matching::tolerance::AppliedTolerance;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_override_reason;

/// Verdict returned to the caller of a matching run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub status: MatchingStatus,
    pub lines: Vec<MatchLineResult>,
}

impl MatchOutcome {
    fn unmatched() -> Self {
        Self {
            status: MatchingStatus::Unmatched,
            lines: Vec::new(),
        }
    }

    /// Lines that pushed the voucher over tolerance
    pub fn exceeded_lines(&self) -> impl Iterator<Item = &MatchLineResult> {
        self.lines
            .iter()
            .filter(|line| line.status == MatchLineStatus::Exceeded)
    }
}

/// Three-way matching over a document store
pub struct MatchingService<S: DocumentStorage, N: ChangeNotifier = NoopNotifier> {
    storage: S,
    notifier: N,
}

impl<S: DocumentStorage> MatchingService<S> {
    /// Create a matching service that emits no change notifications
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            notifier: NoopNotifier,
        }
    }
}

impl<S: DocumentStorage, N: ChangeNotifier> MatchingService<S, N> {
    /// Create a matching service with a change notifier
    pub fn with_notifier(storage: S, notifier: N) -> Self {
        Self { storage, notifier }
    }

    /// Load a voucher, hiding vouchers owned by other companies
    async fn load_voucher(
        &self,
        ctx: &RequestContext,
        ap_id: &str,
    ) -> ProcurementResult<ApVoucher> {
        match self.storage.get_ap_voucher(ap_id).await? {
            Some(voucher) if voucher.company_id == ctx.company_id => Ok(voucher),
            _ => Err(ProcurementError::VoucherNotFound(ap_id.to_string())),
        }
    }

    /// Reconcile a voucher against its purchase order and confirmed receipts
    ///
    /// A voucher without a purchase order comes back `unmatched` and is left
    /// untouched. Otherwise the verdict and line results are persisted,
    /// provided nobody else wrote the voucher since it was read. Purchase
    /// orders and receipts of another company are treated as absent.
    pub async fn perform_three_way_match(
        &self,
        ctx: &RequestContext,
        ap_id: &str,
    ) -> ProcurementResult<MatchOutcome> {
        let voucher = self.load_voucher(ctx, ap_id).await?;

        let po_id = match voucher.po_id.as_deref() {
            Some(po_id) => po_id,
            None => {
                tracing::debug!(ap_id = %ap_id, "Voucher has no purchase order, skipping match");
                return Ok(MatchOutcome::unmatched());
            }
        };

        let po = match self.storage.get_purchase_order(po_id).await? {
            Some(order) if order.company_id == voucher.company_id => order,
            _ => return Err(ProcurementError::PurchaseOrderNotFound(po_id.to_string())),
        };

        let receipts: Vec<GoodsReceipt> = self
            .storage
            .list_goods_receipts(po_id, Some(GoodsReceiptStatus::Confirmed))
            .await?
            .into_iter()
            .filter(|receipt| receipt.company_id == voucher.company_id)
            .collect();
        let tolerance_group = self
            .storage
            .get_active_tolerance_group(&voucher.company_id)
            .await?;
        let tolerance = AppliedTolerance::from_group(tolerance_group.as_ref());

        let received = engine::aggregate_received_quantities(&receipts);
        let lines = engine::match_lines(&voucher.lines, &po.lines, &received, &tolerance);
        let status = engine::overall_status(&lines);

        tracing::debug!(
            ap_id = %ap_id,
            po_id = %po_id,
            receipt_count = receipts.len(),
            line_count = lines.len(),
            "Computed three-way match"
        );

        let result = MatchingResult::Computed {
            lines: lines.clone(),
            tolerance,
        };
        let written = self
            .storage
            .update_matching(ap_id, voucher.version, status, &result)
            .await?;
        if !written {
            tracing::warn!(
                ap_id = %ap_id,
                expected_version = voucher.version,
                "Voucher changed during matching, discarding stale result"
            );
            return Err(ProcurementError::Conflict(format!(
                "AP voucher {} was modified while matching",
                ap_id
            )));
        }

        self.notifier
            .notify(&ResourceChange::ApVoucher(ap_id.to_string()));

        let outcome = MatchOutcome { status, lines };
        if status == MatchingStatus::ToleranceExceeded {
            tracing::warn!(
                ap_id = %ap_id,
                exceeded_lines = outcome.exceeded_lines().count(),
                unknown_lines = outcome.lines.iter().filter(|l| !l.has_po_line()).count(),
                "Three-way match exceeded tolerance"
            );
        } else {
            tracing::info!(
                ap_id = %ap_id,
                status = status.as_str(),
                "Three-way match recorded"
            );
        }

        Ok(outcome)
    }

    /// Override the computed verdict, discarding stored line results
    pub async fn force_match(
        &self,
        ctx: &RequestContext,
        ap_id: &str,
        reason: &str,
    ) -> ProcurementResult<ForceMatchRecord> {
        let user_id = ctx.require_user()?;
        validate_override_reason(reason)?;

        let voucher = self.load_voucher(ctx, ap_id).await?;

        let record = ForceMatchRecord {
            force_matched: true,
            force_matched_by: user_id.to_string(),
            force_matched_at: ctx.requested_at,
            reason: reason.to_string(),
        };

        let written = self
            .storage
            .update_matching(
                ap_id,
                voucher.version,
                MatchingStatus::ForceMatched,
                &MatchingResult::Override(record.clone()),
            )
            .await?;
        if !written {
            return Err(ProcurementError::Conflict(format!(
                "AP voucher {} was modified during force match",
                ap_id
            )));
        }

        self.notifier
            .notify(&ResourceChange::ApVoucher(ap_id.to_string()));

        tracing::info!(
            ap_id = %ap_id,
            user_id = %user_id,
            "Voucher force matched"
        );

        Ok(record)
    }

    /// Persisted matching status and payload of a voucher
    pub async fn get_voucher_matching(
        &self,
        ctx: &RequestContext,
        ap_id: &str,
    ) -> ProcurementResult<(MatchingStatus, Option<MatchingResult>)> {
        let voucher = self.load_voucher(ctx, ap_id).await?;
        Ok((voucher.matching_status, voucher.matching_result))
    }
}

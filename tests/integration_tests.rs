//! Integration tests for procurement-core

use bigdecimal::BigDecimal;
use chrono::{TimeZone, Utc};
use procurement_core::utils::{MemoryStorage, RecordingNotifier};
use procurement_core::{
    ApTaxCalculator, ApVoucher, BudgetControl, BudgetLedger, BudgetPolicy, CostCenter, Department,
    DocumentStorage, GoodsReceipt, GoodsReceiptStatus, InvoiceLine, MatchLineStatus,
    MatchingResult, MatchingService, MatchingStatus, ProcurementError, PurchaseOrder,
    RequestContext, ResourceChange, ToleranceGroup, WithholdingCategory,
};
use std::str::FromStr;

fn dec(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

fn ctx() -> RequestContext {
    let at = Utc.with_ymd_and_hms(2025, 4, 10, 10, 0, 0).unwrap();
    RequestContext::new("acme", "buyer-1").at(at)
}

fn tolerance_group(name: &str, qty_percent: i64, price_percent: i64) -> ToleranceGroup {
    ToleranceGroup::new(
        format!("tg-{}", name.to_lowercase()),
        "acme".to_string(),
        name.to_string(),
        BigDecimal::from(qty_percent),
        BigDecimal::from(price_percent),
    )
    .unwrap()
}

/// PO `po-1` with `(line id, description, quantity, unit price)` lines
fn purchase_order(lines: &[(&str, &str, i64, i64)]) -> PurchaseOrder {
    let mut po = PurchaseOrder::new("po-1".to_string(), "acme".to_string(), "PO-1".to_string());
    for (id, description, qty, price) in lines {
        po.add_line(
            id.to_string(),
            description.to_string(),
            BigDecimal::from(*qty),
            BigDecimal::from(*price),
        );
    }
    po
}

fn receipt(id: &str, status: GoodsReceiptStatus, lines: &[(&str, i64)]) -> GoodsReceipt {
    let mut gr = GoodsReceipt::new(
        id.to_string(),
        "acme".to_string(),
        "po-1".to_string(),
        status,
    );
    for (po_line_id, qty) in lines {
        gr.receive(po_line_id.to_string(), BigDecimal::from(*qty));
    }
    gr
}

/// Voucher `ap-1` against `po-1` with `(description, quantity, unit price)` lines
fn voucher(lines: &[(&str, i64, i64)]) -> ApVoucher {
    let po_id = Some("po-1".to_string());
    let mut voucher = ApVoucher::new("ap-1".to_string(), "acme".to_string(), po_id);
    for (description, qty, price) in lines {
        voucher.add_line(InvoiceLine::new(
            description.to_string(),
            BigDecimal::from(*qty),
            BigDecimal::from(*price),
        ));
    }
    voucher
}

fn setup_org(storage: &MemoryStorage) {
    storage
        .save_department(Department {
            id: "dep-ops".to_string(),
            company_id: "acme".to_string(),
            code: "OPS".to_string(),
            name: "Operations".to_string(),
        })
        .unwrap();
    storage
        .save_cost_center(CostCenter {
            id: "cc-wh".to_string(),
            company_id: "acme".to_string(),
            code: "WH-01".to_string(),
            name: "Warehouse".to_string(),
        })
        .unwrap();
    storage
        .save_budget_control(BudgetControl::new(
            "bud-ops-2568".to_string(),
            "acme".to_string(),
            2568,
            "dep-ops".to_string(),
            Some("cc-wh".to_string()),
            BigDecimal::from(50000),
        ))
        .unwrap();
    let group = tolerance_group("Default", 5, 2);
    storage.save_tolerance_group(group).unwrap();
}

#[tokio::test]
async fn test_complete_procure_to_pay_workflow() {
    let storage = MemoryStorage::new();
    setup_org(&storage);
    let notifier = RecordingNotifier::new();
    let policy = BudgetPolicy::default();
    let ledger = BudgetLedger::with_policy(storage.clone(), notifier.clone(), policy);
    let matching = MatchingService::with_notifier(storage.clone(), notifier.clone());
    let ctx = ctx();

    // PR approved for 12,000: check then reserve
    let pr_amount = BigDecimal::from(12000);
    let availability = ledger
        .check_budget_availability(&ctx, "OPS", Some("WH-01"), &pr_amount)
        .await
        .unwrap();
    assert!(availability.available);
    let budget_id = availability.budget_id.unwrap();
    ledger
        .reserve_budget(&ctx, &budget_id, &pr_amount)
        .await
        .unwrap();

    // PO approved at 11,500 (100 pallets at 100 + 300 strapping rolls at 5)
    let po = purchase_order(&[
        ("pol-1", "Pallet", 100, 100),
        ("pol-2", "Strapping", 300, 5),
    ]);
    let po_amount = po.total_amount();
    assert_eq!(po_amount, BigDecimal::from(11500));
    storage.save_purchase_order(po).unwrap();

    let adjusted = ledger
        .adjust_reservation(&ctx, &budget_id, &pr_amount, &po_amount)
        .await
        .unwrap();
    assert_eq!(adjusted.reserved_amount, BigDecimal::from(11500));

    // Staged receipts: two confirmed, one still draft
    let confirmed = GoodsReceiptStatus::Confirmed;
    let receipts = [
        receipt("gr-1", confirmed, &[("pol-1", 60), ("pol-2", 300)]),
        receipt("gr-2", confirmed, &[("pol-1", 38)]),
        receipt("gr-3", GoodsReceiptStatus::Draft, &[("pol-1", 2)]),
    ];
    for gr in receipts {
        storage.save_goods_receipt(gr).unwrap();
    }

    // Invoice for 100 pallets at 101 and 300 strapping rolls at 5
    let voucher = voucher(&[("Pallet", 100, 101), ("Strapping", 300, 5)]);
    storage.save_ap_voucher(voucher.clone()).unwrap();

    let outcome = matching
        .perform_three_way_match(&ctx, "ap-1")
        .await
        .unwrap();
    assert_eq!(outcome.status, MatchingStatus::Matched);
    assert_eq!(outcome.lines.len(), 2);

    let pallet = &outcome.lines[0];
    assert_eq!(pallet.gr_qty, BigDecimal::from(98));
    assert_eq!(pallet.qty_variance, dec("2.00"));
    assert_eq!(pallet.price_variance, dec("1.00"));
    assert_eq!(pallet.status, MatchLineStatus::WithinTolerance);

    let strapping = &outcome.lines[1];
    assert_eq!(strapping.status, MatchLineStatus::Matched);

    // The draft receipt is confirmed later; matching again picks it up
    storage
        .set_goods_receipt_status("gr-3", GoodsReceiptStatus::Confirmed)
        .unwrap();
    let rerun = matching
        .perform_three_way_match(&ctx, "ap-1")
        .await
        .unwrap();
    assert_eq!(rerun.lines[0].gr_qty, BigDecimal::from(100));
    assert!(rerun.lines[0].qty_variance.eq(&dec("0")));

    // AP posted: commit the invoice subtotal
    let tax = ApTaxCalculator::default()
        .calculate_by_category(&voucher.lines, WithholdingCategory::None)
        .unwrap();
    assert_eq!(tax.subtotal, BigDecimal::from(11600));
    assert_eq!(tax.net_payable, dec("12412.00"));

    let committed = ledger
        .commit_budget(&ctx, &budget_id, &tax.subtotal)
        .await
        .unwrap();
    assert_eq!(committed.reserved_amount, BigDecimal::from(0));
    assert_eq!(committed.used_amount, BigDecimal::from(11600));
    assert_eq!(committed.utilization_percent().round(2), dec("23.20"));

    let remaining = ledger
        .check_budget_availability(&ctx, "OPS", Some("WH-01"), &BigDecimal::from(38400))
        .await
        .unwrap();
    assert_eq!(remaining.remaining, Some(BigDecimal::from(38400)));
    assert!(remaining.available);

    let changes = notifier.changes();
    let voucher_change = ResourceChange::ApVoucher("ap-1".to_string());
    assert!(changes.contains(&voucher_change));
    let budget_change = ResourceChange::BudgetControl(budget_id.clone());
    let budget_changes = changes.iter().filter(|c| **c == budget_change).count();
    assert_eq!(budget_changes, 3);
}

#[tokio::test]
async fn test_unknown_invoice_line_taints_voucher_regardless_of_tolerance() {
    let storage = MemoryStorage::new();
    let group = tolerance_group("Loose", 100, 100);
    storage.save_tolerance_group(group).unwrap();

    let po = purchase_order(&[("pol-1", "Laptop", 2, 30000)]);
    storage.save_purchase_order(po).unwrap();
    let gr = receipt("gr-1", GoodsReceiptStatus::Confirmed, &[("pol-1", 2)]);
    storage.save_goods_receipt(gr).unwrap();
    let voucher = voucher(&[("Laptop", 2, 30000), ("laptop bag", 2, 900)]);
    storage.save_ap_voucher(voucher).unwrap();

    let matching = MatchingService::new(storage.clone());
    let outcome = matching
        .perform_three_way_match(&ctx(), "ap-1")
        .await
        .unwrap();
    assert_eq!(outcome.lines[0].status, MatchLineStatus::Matched);
    assert_eq!(outcome.lines[1].status, MatchLineStatus::Exceeded);
    assert!(outcome.lines[0].has_po_line());
    assert!(!outcome.lines[1].has_po_line());
    assert_eq!(outcome.lines[1].qty_variance.to_string(), "100.00");
    assert_eq!(outcome.status, MatchingStatus::ToleranceExceeded);

    let stored = storage.get_ap_voucher("ap-1").await.unwrap().unwrap();
    assert_eq!(stored.matching_status, MatchingStatus::ToleranceExceeded);
}

#[tokio::test]
async fn test_persisted_matching_payload_shapes() {
    let storage = MemoryStorage::new();
    let po = purchase_order(&[("pol-1", "Cable", 10, 50)]);
    storage.save_purchase_order(po).unwrap();
    let voucher = voucher(&[("Cable", 10, 50)]);
    storage.save_ap_voucher(voucher).unwrap();

    let matching = MatchingService::new(storage.clone());
    matching
        .perform_three_way_match(&ctx(), "ap-1")
        .await
        .unwrap();

    let stored = storage.get_ap_voucher("ap-1").await.unwrap().unwrap();
    let json = serde_json::to_value(&stored.matching_result).unwrap();
    assert!(json.get("lines").is_some());
    assert!(json.get("tolerance").is_some());
    assert_eq!(json["lines"][0]["status"], "exceeded");
    let status = serde_json::to_value(stored.matching_status).unwrap();
    assert_eq!(status, "tolerance_exceeded");

    let reason = "Receipt delayed at customs, goods inspected on site";
    matching.force_match(&ctx(), "ap-1", reason).await.unwrap();
    let stored = storage.get_ap_voucher("ap-1").await.unwrap().unwrap();
    let json = serde_json::to_value(&stored.matching_result).unwrap();
    assert_eq!(json["force_matched"], true);
    assert_eq!(json["force_matched_by"], "buyer-1");
    assert!(json.get("lines").is_none());

    let parsed: MatchingResult = serde_json::from_value(json).unwrap();
    assert!(matches!(parsed, MatchingResult::Override(_)));
}

#[tokio::test]
async fn test_budget_exceeded_is_reported_not_written() {
    let storage = MemoryStorage::new();
    setup_org(&storage);
    let ledger = BudgetLedger::new(storage.clone());
    let ctx = ctx();

    ledger
        .reserve_budget(&ctx, "bud-ops-2568", &BigDecimal::from(45000))
        .await
        .unwrap();

    let check = ledger
        .check_budget_availability(&ctx, "OPS", Some("WH-01"), &BigDecimal::from(6000))
        .await
        .unwrap();
    assert!(!check.available);
    assert_eq!(check.remaining, Some(BigDecimal::from(5000)));

    match ledger
        .reserve_budget(&ctx, "bud-ops-2568", &BigDecimal::from(6000))
        .await
    {
        Err(ProcurementError::BudgetExceeded {
            remaining,
            requested,
            ..
        }) => {
            assert_eq!(remaining, BigDecimal::from(5000));
            assert_eq!(requested, BigDecimal::from(6000));
        }
        other => panic!("expected BudgetExceeded, got {:?}", other),
    }

    let control = ledger.get_budget(&ctx, "bud-ops-2568").await.unwrap();
    assert_eq!(control.reserved_amount, BigDecimal::from(45000));
}

//! Line-level reconciliation of invoice, purchase order and goods receipt data
//!
//! Everything here is pure: the service loads the documents, this module
//! decides the verdict.

use bigdecimal::{BigDecimal, RoundingMode, Zero};
use std::collections::HashMap;

use crate::matching::tolerance::AppliedTolerance;
use crate::types::*;

/// Decimal places kept on stored variance percentages
pub const VARIANCE_SCALE: i64 = 2;

/// Sum received quantities per purchase order line across confirmed receipts
pub fn aggregate_received_quantities(receipts: &[GoodsReceipt]) -> HashMap<String, BigDecimal> {
    let mut received: HashMap<String, BigDecimal> = HashMap::new();

    for receipt in receipts.iter().filter(|r| r.is_confirmed()) {
        for line in &receipt.lines {
            *received
                .entry(line.po_line_item_id.clone())
                .or_insert_with(BigDecimal::zero) += &line.received_qty;
        }
    }

    received
}

/// `|actual - expected| / base`, or zero when `base` is zero
pub fn variance_fraction(
    actual: &BigDecimal,
    expected: &BigDecimal,
    base: &BigDecimal,
) -> BigDecimal {
    if base.is_zero() {
        return BigDecimal::zero();
    }
    (actual - expected).abs() / base
}

/// Fraction to percentage, rounded half-up to two decimals
pub fn to_percent(fraction: &BigDecimal) -> BigDecimal {
    (fraction * BigDecimal::from(100)).with_scale_round(VARIANCE_SCALE, RoundingMode::HalfUp)
}

/// Classify a line from its unrounded variance fractions
pub fn classify(
    qty_fraction: &BigDecimal,
    price_fraction: &BigDecimal,
    tolerance: &AppliedTolerance,
) -> MatchLineStatus {
    if qty_fraction.is_zero() && price_fraction.is_zero() {
        MatchLineStatus::Matched
    } else if *qty_fraction <= tolerance.quantity_fraction()
        && *price_fraction <= tolerance.price_fraction()
    {
        MatchLineStatus::WithinTolerance
    } else {
        MatchLineStatus::Exceeded
    }
}

/// Result for an invoice line whose description matches no PO line
///
/// Both variances are pinned at 100% in the same two-decimal form as
/// computed lines.
fn unmatched_line(invoice_line: &InvoiceLine) -> MatchLineResult {
    let full_variance = to_percent(&BigDecimal::from(1));

    MatchLineResult {
        po_line_id: String::new(),
        description: invoice_line.description.clone(),
        po_qty: BigDecimal::zero(),
        gr_qty: BigDecimal::zero(),
        invoice_qty: invoice_line.quantity.clone(),
        po_price: BigDecimal::zero(),
        invoice_price: invoice_line.unit_price.clone(),
        qty_variance: full_variance.clone(),
        price_variance: full_variance,
        status: MatchLineStatus::Exceeded,
    }
}

/// Match one invoice line against its purchase order line
pub fn match_line(
    invoice_line: &InvoiceLine,
    po_line: &PurchaseOrderLine,
    received: &HashMap<String, BigDecimal>,
    tolerance: &AppliedTolerance,
) -> MatchLineResult {
    let gr_qty = received
        .get(&po_line.id)
        .cloned()
        .unwrap_or_else(BigDecimal::zero);

    let qty_fraction = variance_fraction(&invoice_line.quantity, &gr_qty, &po_line.quantity);
    let price_fraction = variance_fraction(
        &invoice_line.unit_price,
        &po_line.unit_price,
        &po_line.unit_price,
    );
    let status = classify(&qty_fraction, &price_fraction, tolerance);

    MatchLineResult {
        po_line_id: po_line.id.clone(),
        description: invoice_line.description.clone(),
        po_qty: po_line.quantity.clone(),
        gr_qty,
        invoice_qty: invoice_line.quantity.clone(),
        po_price: po_line.unit_price.clone(),
        invoice_price: invoice_line.unit_price.clone(),
        qty_variance: to_percent(&qty_fraction),
        price_variance: to_percent(&price_fraction),
        status,
    }
}

/// Match every invoice line, preserving invoice order
///
/// PO lines are found by exact, case-sensitive description equality; the
/// first PO line with that description wins.
pub fn match_lines(
    invoice_lines: &[InvoiceLine],
    po_lines: &[PurchaseOrderLine],
    received: &HashMap<String, BigDecimal>,
    tolerance: &AppliedTolerance,
) -> Vec<MatchLineResult> {
    invoice_lines
        .iter()
        .map(|invoice_line| {
            match po_lines
                .iter()
                .find(|po_line| po_line.description == invoice_line.description)
            {
                Some(po_line) => match_line(invoice_line, po_line, received, tolerance),
                None => unmatched_line(invoice_line),
            }
        })
        .collect()
}

/// A single exceeded line taints the whole voucher
pub fn overall_status(lines: &[MatchLineResult]) -> MatchingStatus {
    if lines
        .iter()
        .any(|line| line.status == MatchLineStatus::Exceeded)
    {
        MatchingStatus::ToleranceExceeded
    } else {
        MatchingStatus::Matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    fn po_line(id: &str, description: &str, qty: i64, price: i64) -> PurchaseOrderLine {
        PurchaseOrderLine::new(
            id.to_string(),
            "po1".to_string(),
            description.to_string(),
            BigDecimal::from(qty),
            BigDecimal::from(price),
        )
    }

    fn invoice_line(description: &str, qty: i64, price: BigDecimal) -> InvoiceLine {
        InvoiceLine::new(description.to_string(), BigDecimal::from(qty), price)
    }

    fn receipt(status: GoodsReceiptStatus, lines: &[(&str, i64)]) -> GoodsReceipt {
        let mut gr = GoodsReceipt::new(
            uuid::Uuid::new_v4().to_string(),
            "co1".to_string(),
            "po1".to_string(),
            status,
        );
        for (po_line_id, qty) in lines {
            gr.receive(po_line_id.to_string(), BigDecimal::from(*qty));
        }
        gr
    }

    fn confirmed(lines: &[(&str, i64)]) -> HashMap<String, BigDecimal> {
        let receipts = [receipt(GoodsReceiptStatus::Confirmed, lines)];
        aggregate_received_quantities(&receipts)
    }

    fn tolerance(qty: &str, price: &str) -> AppliedTolerance {
        AppliedTolerance {
            quantity_variance_percent: dec(qty),
            price_variance_percent: dec(price),
        }
    }

    #[test]
    fn test_aggregate_ignores_unconfirmed_receipts() {
        let receipts = vec![
            receipt(GoodsReceiptStatus::Confirmed, &[("l1", 40), ("l2", 5)]),
            receipt(GoodsReceiptStatus::Confirmed, &[("l1", 55)]),
            receipt(GoodsReceiptStatus::Draft, &[("l1", 1000)]),
            receipt(GoodsReceiptStatus::Cancelled, &[("l2", 1000)]),
        ];

        let received = aggregate_received_quantities(&receipts);
        assert_eq!(received["l1"], BigDecimal::from(95));
        assert_eq!(received["l2"], BigDecimal::from(5));
        assert_eq!(received.len(), 2);
    }

    #[test]
    fn test_variance_fraction_zero_base() {
        let zero = BigDecimal::zero();
        let hundred = BigDecimal::from(100);

        let fraction = variance_fraction(&BigDecimal::from(5), &BigDecimal::from(3), &zero);
        assert_eq!(fraction, BigDecimal::zero());

        let fraction = variance_fraction(&BigDecimal::from(98), &BigDecimal::from(95), &hundred);
        assert_eq!(fraction, dec("0.03"));
    }

    #[test]
    fn test_to_percent_rounds_half_up() {
        assert_eq!(to_percent(&dec("0.03")), dec("3.00"));
        assert_eq!(to_percent(&dec("0.123456")), dec("12.35"));
        assert_eq!(to_percent(&dec("0.000049")), dec("0.00"));
        assert_eq!(to_percent(&dec("0.00005")), dec("0.01"));
        let third = BigDecimal::from(1) / BigDecimal::from(3);
        assert_eq!(to_percent(&third), dec("33.33"));
    }

    #[test]
    fn test_exact_line_is_matched() {
        let received = confirmed(&[("l1", 95)]);
        let invoice = invoice_line("Widget", 95, BigDecimal::from(10));
        let line = po_line("l1", "Widget", 100, 10);

        let result = match_line(&invoice, &line, &received, &AppliedTolerance::zero());
        assert_eq!(result.status, MatchLineStatus::Matched);
        assert!(result.qty_variance.is_zero());
        assert!(result.price_variance.is_zero());
        assert_eq!(result.gr_qty, BigDecimal::from(95));
        assert_eq!(result.po_line_id, "l1");
    }

    #[test]
    fn test_quantity_variance_against_tolerance() {
        let received = confirmed(&[("l1", 95)]);
        let invoice = invoice_line("Widget", 98, BigDecimal::from(10));
        let line = po_line("l1", "Widget", 100, 10);

        let loose = match_line(&invoice, &line, &received, &tolerance("5", "0"));
        assert_eq!(loose.qty_variance, dec("3.00"));
        assert_eq!(loose.status, MatchLineStatus::WithinTolerance);

        let strict = match_line(&invoice, &line, &received, &tolerance("2", "0"));
        assert_eq!(strict.status, MatchLineStatus::Exceeded);
        assert_eq!(
            overall_status(&[loose, strict]),
            MatchingStatus::ToleranceExceeded
        );
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        let received = confirmed(&[("l1", 100)]);
        let invoice = invoice_line("Widget", 100, dec("10.50"));
        let line = po_line("l1", "Widget", 100, 10);

        let result = match_line(&invoice, &line, &received, &tolerance("0", "5"));
        assert_eq!(result.price_variance, dec("5.00"));
        assert_eq!(result.status, MatchLineStatus::WithinTolerance);
    }

    #[test]
    fn test_classification_uses_unrounded_variance() {
        // rounds to 0.00% but is not an exact match
        let tiny = dec("0.0000004");
        let status = classify(&tiny, &BigDecimal::zero(), &AppliedTolerance::zero());
        assert_eq!(status, MatchLineStatus::Exceeded);
        assert_eq!(to_percent(&tiny), dec("0.00"));
    }

    #[test]
    fn test_unknown_description_is_exceeded() {
        let invoice = invoice_line("widget", 1, BigDecimal::from(1));
        let results = match_lines(
            &[invoice],
            &[po_line("l1", "Widget", 1, 1)],
            &HashMap::new(),
            &tolerance("100", "100"),
        );

        let result = &results[0];
        assert!(!result.has_po_line());
        assert_eq!(result.status, MatchLineStatus::Exceeded);
        assert_eq!(result.qty_variance, BigDecimal::from(100));
        assert_eq!(result.price_variance, BigDecimal::from(100));
        assert!(result.po_qty.is_zero());
        assert_eq!(overall_status(&results), MatchingStatus::ToleranceExceeded);
    }

    #[test]
    fn test_unknown_and_computed_variances_share_two_decimals() {
        let invoice = vec![
            invoice_line("Cable", 30, BigDecimal::from(5)),
            invoice_line("Adapter", 1, BigDecimal::from(5)),
        ];
        let results = match_lines(
            &invoice,
            &[po_line("l1", "Cable", 10, 5)],
            &confirmed(&[("l1", 10)]),
            &AppliedTolerance::zero(),
        );

        assert_eq!(results[0].qty_variance.to_string(), "200.00");
        assert_eq!(results[1].qty_variance.to_string(), "100.00");
        assert_eq!(results[1].price_variance.to_string(), "100.00");

        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json[0]["qty_variance"], "200.00");
        assert_eq!(json[1]["qty_variance"], "100.00");
    }

    #[test]
    fn test_first_po_line_with_description_wins_and_order_is_kept() {
        let po_lines = vec![
            po_line("l1", "Bolt", 10, 2),
            po_line("l2", "Bolt", 50, 3),
            po_line("l3", "Nut", 10, 1),
        ];
        let invoice = vec![
            invoice_line("Nut", 10, BigDecimal::from(1)),
            invoice_line("Bolt", 10, BigDecimal::from(2)),
        ];
        let received = confirmed(&[("l1", 10), ("l3", 10)]);

        let results = match_lines(&invoice, &po_lines, &received, &AppliedTolerance::zero());
        assert_eq!(results[0].po_line_id, "l3");
        assert_eq!(results[1].po_line_id, "l1");
        assert_eq!(overall_status(&results), MatchingStatus::Matched);
    }

    #[test]
    fn test_unreceived_line_measures_against_zero_receipts() {
        let invoice = invoice_line("Desk", 4, BigDecimal::from(300));
        let results = match_lines(
            &[invoice],
            &[po_line("l1", "Desk", 4, 300)],
            &HashMap::new(),
            &tolerance("10", "10"),
        );
        assert!(results[0].gr_qty.is_zero());
        assert_eq!(results[0].qty_variance, dec("100.00"));
        assert_eq!(results[0].status, MatchLineStatus::Exceeded);
    }

    #[test]
    fn test_empty_invoice_is_matched() {
        assert_eq!(overall_status(&[]), MatchingStatus::Matched);
    }
}

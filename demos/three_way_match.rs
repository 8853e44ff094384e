//! Three-way matching example

use bigdecimal::BigDecimal;
use procurement_core::utils::MemoryStorage;
use procurement_core::{
    ApTaxCalculator, ApVoucher, GoodsReceipt, GoodsReceiptStatus, InvoiceLine, MatchingService,
    PurchaseOrder, RequestContext, ToleranceGroup, WithholdingCategory,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("🧾 Procurement Core - Three-Way Match Example\n");

    let storage = MemoryStorage::new();
    let matching = MatchingService::new(storage.clone());
    let ctx = RequestContext::new("acme", "ap-clerk");

    // 1. Company tolerance: 5% quantity, 2% price
    let tolerance = ToleranceGroup::new(
        "tg-default".to_string(),
        "acme".to_string(),
        "Default".to_string(),
        BigDecimal::from(5),
        BigDecimal::from(2),
    )?;
    storage.save_tolerance_group(tolerance)?;
    println!("📐 Tolerance group: 5% quantity, 2% price\n");

    // 2. Purchase order
    let mut po = PurchaseOrder::new(
        "po-1".to_string(),
        "acme".to_string(),
        "PO-0001".to_string(),
    );
    po.add_line(
        "pol-1".to_string(),
        "Office chair".to_string(),
        BigDecimal::from(100),
        BigDecimal::from(100),
    );
    po.add_line(
        "pol-2".to_string(),
        "Desk lamp".to_string(),
        BigDecimal::from(40),
        BigDecimal::from(250),
    );
    println!("📦 {} total: ฿{}", po.po_number, po.total_amount());
    storage.save_purchase_order(po)?;

    // 3. Goods receipts, one still in draft
    let mut confirmed = GoodsReceipt::new(
        "gr-1".to_string(),
        "acme".to_string(),
        "po-1".to_string(),
        GoodsReceiptStatus::Confirmed,
    );
    confirmed.receive("pol-1".to_string(), BigDecimal::from(98));
    confirmed.receive("pol-2".to_string(), BigDecimal::from(40));
    storage.save_goods_receipt(confirmed)?;

    let mut draft = GoodsReceipt::new(
        "gr-2".to_string(),
        "acme".to_string(),
        "po-1".to_string(),
        GoodsReceiptStatus::Draft,
    );
    draft.receive("pol-1".to_string(), BigDecimal::from(2));
    storage.save_goods_receipt(draft)?;
    println!("🚚 Received 98 chairs and 40 lamps (2 more chairs in a draft receipt)\n");

    // 4. Vendor invoice
    let mut voucher = ApVoucher::new(
        "ap-1".to_string(),
        "acme".to_string(),
        Some("po-1".to_string()),
    );
    voucher.add_line(InvoiceLine::new(
        "Office chair".to_string(),
        BigDecimal::from(100),
        BigDecimal::from(101),
    ));
    voucher.add_line(InvoiceLine::new(
        "Desk lamp".to_string(),
        BigDecimal::from(40),
        BigDecimal::from(260),
    ));
    storage.save_ap_voucher(voucher.clone())?;

    // 5. Match
    println!("🔍 Running three-way match...");
    let outcome = matching.perform_three_way_match(&ctx, "ap-1").await?;
    for line in &outcome.lines {
        println!(
            "  {:<14} qty {:>6}%  price {:>6}%  {:?}",
            line.description, line.qty_variance, line.price_variance, line.status
        );
    }
    println!("  ➜ Voucher status: {}\n", outcome.status.as_str());

    // 6. Reviewer clears the exceeded voucher
    if !outcome.status.is_cleared() {
        let reviewer = RequestContext::new("acme", "ap-manager");
        let reason = "Lamp price increase agreed by phone with vendor";
        let record = matching.force_match(&reviewer, "ap-1", reason).await?;
        println!(
            "✅ Force matched by {} at {}: {}\n",
            record.force_matched_by, record.force_matched_at, record.reason
        );
    }

    // 7. Payment totals
    let calculator = ApTaxCalculator::default();
    let category = WithholdingCategory::None;
    let tax = calculator.calculate_by_category(&voucher.lines, category)?;
    println!("💰 Subtotal ฿{}", tax.subtotal);
    println!("   VAT {}%   ฿{}", tax.vat_percent, tax.vat_amount);
    println!("   WHT {}%   ฿{}", tax.wht_percent, tax.wht_amount);
    println!("   Net payable ฿{}", tax.net_payable);

    Ok(())
}

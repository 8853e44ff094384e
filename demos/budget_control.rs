//! Budget control example: reserve, adjust, commit

use bigdecimal::BigDecimal;
use procurement_core::utils::{MemoryStorage, RecordingNotifier};
use procurement_core::{
    BudgetControl, BudgetLedger, BudgetPolicy, CostCenter, Department, ProcurementError,
    RequestContext,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("📊 Procurement Core - Budget Control Example\n");

    let policy = BudgetPolicy::from_env()?;
    println!("⚙️  Policy: {:?}\n", policy);

    let storage = MemoryStorage::new();
    let notifier = RecordingNotifier::new();
    let ledger = BudgetLedger::with_policy(storage.clone(), notifier.clone(), policy);
    let ctx = RequestContext::new("acme", "requester");
    let fiscal_year = ledger.fiscal_year(&ctx);

    storage.save_department(Department {
        id: "dep-it".to_string(),
        company_id: "acme".to_string(),
        code: "IT".to_string(),
        name: "Information Technology".to_string(),
    })?;
    storage.save_cost_center(CostCenter {
        id: "cc-infra".to_string(),
        company_id: "acme".to_string(),
        code: "INFRA".to_string(),
        name: "Infrastructure".to_string(),
    })?;
    storage.save_budget_control(BudgetControl::new(
        "bud-it".to_string(),
        "acme".to_string(),
        fiscal_year,
        "dep-it".to_string(),
        Some("cc-infra".to_string()),
        BigDecimal::from(100000),
    ))?;
    println!(
        "🏦 IT / INFRA budget for fiscal year {}: ฿100,000\n",
        fiscal_year
    );

    // Requisition approved
    let pr_amount = BigDecimal::from(30000);
    let check = ledger
        .check_budget_availability(&ctx, "IT", Some("INFRA"), &pr_amount)
        .await?;
    println!("🔍 PR for ฿{}: available = {}", pr_amount, check.available);
    let budget_id = check.budget_id.unwrap_or_else(|| "bud-it".to_string());
    let control = ledger.reserve_budget(&ctx, &budget_id, &pr_amount).await?;
    print_balances("Reserved for PR", &control);

    // PO comes in lower than the requisition
    let po_amount = BigDecimal::from(28500);
    let control = ledger
        .adjust_reservation(&ctx, &budget_id, &pr_amount, &po_amount)
        .await?;
    print_balances("Adjusted for PO", &control);

    // AP posted
    let control = ledger.commit_budget(&ctx, &budget_id, &po_amount).await?;
    print_balances("Committed on AP", &control);

    // A requisition that no longer fits
    match ledger
        .reserve_budget(&ctx, &budget_id, &BigDecimal::from(80000))
        .await
    {
        Err(ProcurementError::BudgetExceeded { remaining, .. }) => {
            println!("\n⛔ ฿80,000 refused, only ฿{} remaining", remaining);
        }
        Ok(control) => print_balances("Reserved without enforcement", &control),
        Err(err) => return Err(err.into()),
    }

    // Departments without a configured budget are unrestricted
    let open = ledger
        .check_budget_availability(&ctx, "MARKETING", None, &BigDecimal::from(1_000_000))
        .await?;
    println!(
        "\n🌐 MARKETING: available = {}, no_budget = {}",
        open.available, open.no_budget
    );

    println!("\n🔔 {} change notifications", notifier.changes().len());

    Ok(())
}

fn print_balances(label: &str, control: &BudgetControl) {
    println!(
        "  ✓ {:<28} reserved ฿{:>10}  used ฿{:>10}  remaining ฿{:>10}  ({}% used)",
        label,
        control.reserved_amount,
        control.used_amount,
        control.remaining(),
        control.utilization_percent().round(2)
    );
}

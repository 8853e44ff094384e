//! VAT and withholding tax (WHT) totals for AP vouchers
//!
//! WHT is computed on the pre-VAT subtotal and deducted from what is paid to
//! the vendor, so `net_payable = subtotal + vat - wht`.

use bigdecimal::{BigDecimal, RoundingMode, Zero};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::InvoiceLine;

/// Standard VAT rate, percent
pub const STANDARD_VAT_PERCENT: i64 = 7;

/// Withholding categories with their standard rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithholdingCategory {
    /// Goods purchases - 0%
    None,
    /// Transport services - 1%
    Transport,
    /// Advertising - 2%
    Advertising,
    /// Professional and general services - 3%
    Services,
    /// Rent of property - 5%
    Rent,
}

impl WithholdingCategory {
    /// Get the standard WHT rate for this category
    pub fn rate(&self) -> BigDecimal {
        match self {
            WithholdingCategory::None => BigDecimal::from(0),
            WithholdingCategory::Transport => BigDecimal::from(1),
            WithholdingCategory::Advertising => BigDecimal::from(2),
            WithholdingCategory::Services => BigDecimal::from(3),
            WithholdingCategory::Rent => BigDecimal::from(5),
        }
    }
}

fn validate_rate(name: &str, rate: &BigDecimal) -> Result<(), TaxError> {
    if *rate < BigDecimal::zero() || *rate > BigDecimal::from(100) {
        return Err(TaxError::InvalidRate(format!(
            "{} rate must be between 0 and 100, got {}",
            name, rate
        )));
    }
    Ok(())
}

fn round_currency(amount: BigDecimal) -> BigDecimal {
    amount.with_scale_round(2, RoundingMode::HalfUp)
}

/// Tax breakdown of an AP voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApTaxCalculation {
    /// Sum of line totals before tax
    pub subtotal: BigDecimal,
    pub vat_percent: BigDecimal,
    pub vat_amount: BigDecimal,
    pub wht_percent: BigDecimal,
    pub wht_amount: BigDecimal,
    /// Subtotal plus VAT
    pub total_amount: BigDecimal,
    /// Amount actually paid to the vendor
    pub net_payable: BigDecimal,
}

impl ApTaxCalculation {
    /// Calculate totals from a pre-tax subtotal
    pub fn from_subtotal(
        subtotal: BigDecimal,
        vat_percent: BigDecimal,
        wht_percent: BigDecimal,
    ) -> Result<Self, TaxError> {
        validate_rate("VAT", &vat_percent)?;
        validate_rate("WHT", &wht_percent)?;

        let vat_amount = round_currency((&subtotal * &vat_percent) / BigDecimal::from(100));
        let wht_amount = round_currency((&subtotal * &wht_percent) / BigDecimal::from(100));
        let total_amount = &subtotal + &vat_amount;
        let net_payable = &total_amount - &wht_amount;

        Ok(Self {
            subtotal,
            vat_percent,
            vat_amount,
            wht_percent,
            wht_amount,
            total_amount,
            net_payable,
        })
    }

    /// Calculate totals for a set of invoice lines
    pub fn calculate(
        lines: &[InvoiceLine],
        vat_percent: BigDecimal,
        wht_percent: BigDecimal,
    ) -> Result<Self, TaxError> {
        let subtotal: BigDecimal = lines.iter().map(|line| line.line_total()).sum();
        Self::from_subtotal(subtotal, vat_percent, wht_percent)
    }
}

/// AP tax calculator with a default VAT rate and vendor-group WHT overrides
#[derive(Debug)]
pub struct ApTaxCalculator {
    vat_percent: BigDecimal,
    /// WHT rates keyed by vendor group code
    vendor_group_rates: HashMap<String, BigDecimal>,
}

impl Default for ApTaxCalculator {
    fn default() -> Self {
        Self {
            vat_percent: BigDecimal::from(STANDARD_VAT_PERCENT),
            vendor_group_rates: HashMap::new(),
        }
    }
}

impl ApTaxCalculator {
    /// Create a calculator with an explicit VAT rate
    pub fn new(vat_percent: BigDecimal) -> Result<Self, TaxError> {
        validate_rate("VAT", &vat_percent)?;
        Ok(Self {
            vat_percent,
            vendor_group_rates: HashMap::new(),
        })
    }

    /// Set a WHT rate for a vendor group, overriding category rates
    pub fn set_vendor_group_rate(
        &mut self,
        vendor_group: String,
        wht_percent: BigDecimal,
    ) -> Result<(), TaxError> {
        validate_rate("WHT", &wht_percent)?;
        self.vendor_group_rates.insert(vendor_group, wht_percent);
        Ok(())
    }

    /// Calculate using a withholding category
    pub fn calculate_by_category(
        &self,
        lines: &[InvoiceLine],
        category: WithholdingCategory,
    ) -> Result<ApTaxCalculation, TaxError> {
        ApTaxCalculation::calculate(lines, self.vat_percent.clone(), category.rate())
    }

    /// Calculate using a vendor group's configured WHT rate
    pub fn calculate_by_vendor_group(
        &self,
        lines: &[InvoiceLine],
        vendor_group: &str,
    ) -> Result<ApTaxCalculation, TaxError> {
        let wht_percent = self
            .vendor_group_rates
            .get(vendor_group)
            .ok_or_else(|| TaxError::VendorGroupNotFound(vendor_group.to_string()))?;

        ApTaxCalculation::calculate(lines, self.vat_percent.clone(), wht_percent.clone())
    }
}

/// Tax-related errors
#[derive(Debug, thiserror::Error)]
pub enum TaxError {
    #[error("Invalid tax rate: {0}")]
    InvalidRate(String),
    #[error("Vendor group not found: {0}")]
    VendorGroupNotFound(String),
}

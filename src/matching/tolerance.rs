//! Variance tolerance configuration

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Per-company tolerance group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceGroup {
    /// Unique identifier for the group
    pub id: String,
    /// Owning company
    pub company_id: String,
    /// Display name
    pub name: String,
    /// Accepted quantity variance, 0-100
    pub quantity_variance_percent: BigDecimal,
    /// Accepted price variance, 0-100
    pub price_variance_percent: BigDecimal,
    pub is_active: bool,
}

impl ToleranceGroup {
    /// Create an active tolerance group, rejecting percentages outside 0-100
    pub fn new(
        id: String,
        company_id: String,
        name: String,
        quantity_variance_percent: BigDecimal,
        price_variance_percent: BigDecimal,
    ) -> ProcurementResult<Self> {
        validate_percent("quantity_variance_percent", &quantity_variance_percent)?;
        validate_percent("price_variance_percent", &price_variance_percent)?;

        Ok(Self {
            id,
            company_id,
            name,
            quantity_variance_percent,
            price_variance_percent,
            is_active: true,
        })
    }

    /// The tolerance as applied to a matching run
    pub fn applied(&self) -> AppliedTolerance {
        AppliedTolerance {
            quantity_variance_percent: self.quantity_variance_percent.clone(),
            price_variance_percent: self.price_variance_percent.clone(),
        }
    }
}

fn validate_percent(field: &str, value: &BigDecimal) -> ProcurementResult<()> {
    if *value < BigDecimal::zero() || *value > BigDecimal::from(100) {
        return Err(ProcurementError::Validation(format!(
            "{} must be between 0 and 100, got {}",
            field, value
        )));
    }
    Ok(())
}

/// Tolerance used by one matching run, stored alongside its line results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedTolerance {
    /// Accepted quantity variance, percent
    pub quantity_variance_percent: BigDecimal,
    /// Accepted price variance, percent
    pub price_variance_percent: BigDecimal,
}

impl AppliedTolerance {
    /// Exact match required
    pub fn zero() -> Self {
        Self {
            quantity_variance_percent: BigDecimal::zero(),
            price_variance_percent: BigDecimal::zero(),
        }
    }

    /// Resolve the tolerance for a run; no active group means zero tolerance
    pub fn from_group(group: Option<&ToleranceGroup>) -> Self {
        match group {
            Some(group) if group.is_active => group.applied(),
            _ => Self::zero(),
        }
    }

    /// Quantity tolerance as a fraction
    pub fn quantity_fraction(&self) -> BigDecimal {
        &self.quantity_variance_percent / BigDecimal::from(100)
    }

    /// Price tolerance as a fraction
    pub fn price_fraction(&self) -> BigDecimal {
        &self.price_variance_percent / BigDecimal::from(100)
    }
}

impl Default for AppliedTolerance {
    fn default() -> Self {
        Self::zero()
    }
}

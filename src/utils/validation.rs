//! Validation utilities

use bigdecimal::{BigDecimal, Zero};

use crate::types::*;

/// Validate that a ledger movement amount is not negative
pub fn validate_non_negative_amount(amount: &BigDecimal) -> ProcurementResult<()> {
    if *amount < BigDecimal::zero() {
        Err(ProcurementError::Validation(format!("Amount cannot be negative, got {}", amount)))
    } else {
        Ok(())
    }
}

/// Validate a force-match reason
pub fn validate_override_reason(reason: &str) -> ProcurementResult<()> {
    if reason.trim().is_empty() {
        return Err(ProcurementError::Validation(
            "Force match reason cannot be empty".to_string(),
        ));
    }

    Ok(())
}

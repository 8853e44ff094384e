//! Engine configuration parsed from environment variables

use std::env;

use crate::budget::control::BUDDHIST_ERA_OFFSET;
use crate::types::*;

/// Budget ledger policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetPolicy {
    /// Added to the Gregorian year to get the fiscal year
    pub fiscal_year_offset: i32,
    /// Refuse reservations that would exceed the budget at write time
    pub enforce_limit_on_reserve: bool,
    /// Grow `used_amount` on commit only by what was actually reserved
    pub clamp_commit_to_reserved: bool,
    /// Compare-and-set attempts before a balance update gives up
    pub max_update_attempts: u32,
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self {
            fiscal_year_offset: BUDDHIST_ERA_OFFSET,
            enforce_limit_on_reserve: true,
            clamp_commit_to_reserved: false,
            max_update_attempts: 8,
        }
    }
}

impl BudgetPolicy {
    /// Read `PROCUREMENT_*` variables, falling back to defaults for unset ones
    pub fn from_env() -> ProcurementResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a policy from any key/value source
    pub fn from_lookup<F>(lookup: F) -> ProcurementResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let fiscal_year_offset = match lookup("PROCUREMENT_FISCAL_YEAR_OFFSET") {
            Some(raw) => raw.trim().parse::<i32>().map_err(|_| {
                ProcurementError::Configuration(
                    "PROCUREMENT_FISCAL_YEAR_OFFSET must be an integer".to_string(),
                )
            })?,
            None => defaults.fiscal_year_offset,
        };

        let enforce_limit_on_reserve = match lookup("PROCUREMENT_ENFORCE_BUDGET_ON_RESERVE") {
            Some(raw) => parse_flag("PROCUREMENT_ENFORCE_BUDGET_ON_RESERVE", &raw)?,
            None => defaults.enforce_limit_on_reserve,
        };

        let clamp_commit_to_reserved = match lookup("PROCUREMENT_CLAMP_COMMIT_TO_RESERVED") {
            Some(raw) => parse_flag("PROCUREMENT_CLAMP_COMMIT_TO_RESERVED", &raw)?,
            None => defaults.clamp_commit_to_reserved,
        };

        let max_update_attempts = match lookup("PROCUREMENT_BUDGET_MAX_ATTEMPTS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|attempts| *attempts > 0)
                .ok_or_else(|| {
                    ProcurementError::Configuration(
                        "PROCUREMENT_BUDGET_MAX_ATTEMPTS must be a positive integer".to_string(),
                    )
                })?,
            None => defaults.max_update_attempts,
        };

        Ok(Self {
            fiscal_year_offset,
            enforce_limit_on_reserve,
            clamp_commit_to_reserved,
            max_update_attempts,
        })
    }
}

fn parse_flag(key: &str, raw: &str) -> ProcurementResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ProcurementError::Configuration(format!(
            "{} must be a boolean, got '{}'",
            key, raw
        ))),
    }
}

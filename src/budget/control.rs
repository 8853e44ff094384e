//! Budget control rows and their balance transitions

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Offset from the Gregorian to the Buddhist calendar year
pub const BUDDHIST_ERA_OFFSET: i32 = 543;

/// Fiscal year of a timestamp, as Gregorian year plus `offset`
pub fn buddhist_fiscal_year(at: DateTime<Utc>, offset: i32) -> i32 {
    at.year() + offset
}

/// Organisational department owning budgets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    /// Unique identifier for the department
    pub id: String,
    /// Owning company
    pub company_id: String,
    /// Code used by requisitions, unique within the company
    pub code: String,
    /// Display name
    pub name: String,
}

/// Cost center narrowing a department's budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCenter {
    /// Unique identifier for the cost center
    pub id: String,
    /// Owning company
    pub company_id: String,
    /// Code used by requisitions, unique within the company
    pub code: String,
    /// Display name
    pub name: String,
}

/// Lookup key for active budget controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetScopeQuery {
    pub company_id: String,
    pub fiscal_year: i32,
    pub department_id: String,
    /// When `None`, rows for any cost center of the department match
    pub cost_center_id: Option<String>,
}

/// Reserved and used amounts after a transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetBalances {
    /// New reserved amount
    pub reserved_amount: BigDecimal,
    pub used_amount: BigDecimal,
}

/// Budget for one (company, fiscal year, department, cost center) scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetControl {
    /// Unique identifier for the budget row
    pub id: String,
    /// Owning company
    pub company_id: String,
    /// Buddhist calendar year
    pub fiscal_year: i32,
    pub department_id: String,
    /// `None` for a department-wide budget
    pub cost_center_id: Option<String>,
    /// Approved budget
    pub budget_amount: BigDecimal,
    /// Committed by posted AP vouchers
    pub used_amount: BigDecimal,
    /// Earmarked by approved requisitions and orders
    pub reserved_amount: BigDecimal,
    /// Inactive rows are ignored by lookups and refuse movements
    pub is_active: bool,
    /// Bumped on every balance write
    pub version: u64,
    pub updated_at: NaiveDateTime,
}

impl BudgetControl {
    /// Create an active control with nothing reserved or used
    pub fn new(
        id: String,
        company_id: String,
        fiscal_year: i32,
        department_id: String,
        cost_center_id: Option<String>,
        budget_amount: BigDecimal,
    ) -> Self {
        Self {
            id,
            company_id,
            fiscal_year,
            department_id,
            cost_center_id,
            budget_amount,
            used_amount: BigDecimal::zero(),
            reserved_amount: BigDecimal::zero(),
            is_active: true,
            version: 0,
            updated_at: Utc::now().naive_utc(),
        }
    }

    /// `budget - used - reserved`; negative when over-committed
    pub fn remaining(&self) -> BigDecimal {
        &self.budget_amount - &self.used_amount - &self.reserved_amount
    }

    /// Whether `amount` still fits in the remaining budget
    pub fn is_available(&self, amount: &BigDecimal) -> bool {
        self.remaining() >= *amount
    }

    /// Balances after reserving `amount`
    ///
    /// With `enforce_limit`, a reservation that would push
    /// `used + reserved` past the budget is refused.
    pub fn reserved(
        &self,
        amount: &BigDecimal,
        enforce_limit: bool,
    ) -> ProcurementResult<BudgetBalances> {
        if enforce_limit && !self.is_available(amount) {
            return Err(ProcurementError::BudgetExceeded {
                budget_id: self.id.clone(),
                requested: amount.clone(),
                remaining: self.remaining(),
            });
        }

        Ok(BudgetBalances {
            reserved_amount: &self.reserved_amount + amount,
            used_amount: self.used_amount.clone(),
        })
    }

    /// Balances after releasing `amount`; reserved never drops below zero
    pub fn released(&self, amount: &BigDecimal) -> BudgetBalances {
        BudgetBalances {
            reserved_amount: floor_at_zero(&self.reserved_amount - amount),
            used_amount: self.used_amount.clone(),
        }
    }

    /// Balances after converting `amount` of reservation into usage
    ///
    /// Without `clamp`, used grows by the full `amount` even when less than
    /// that was reserved. With `clamp`, used grows only by what actually
    /// left the reservation.
    pub fn committed(&self, amount: &BigDecimal, clamp: bool) -> BudgetBalances {
        let reserved_amount = floor_at_zero(&self.reserved_amount - amount);
        let consumed = if clamp {
            &self.reserved_amount - &reserved_amount
        } else {
            amount.clone()
        };

        BudgetBalances {
            reserved_amount,
            used_amount: &self.used_amount + consumed,
        }
    }

    /// Share of the budget already used or reserved, in percent
    pub fn utilization_percent(&self) -> BigDecimal {
        if self.budget_amount.is_zero() {
            return BigDecimal::zero();
        }
        ((&self.used_amount + &self.reserved_amount) * BigDecimal::from(100)) / &self.budget_amount
    }
}

fn floor_at_zero(value: BigDecimal) -> BigDecimal {
    if value < BigDecimal::zero() {
        BigDecimal::zero()
    } else {
        value
    }
}

/// Answer to a budget availability check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAvailability {
    /// Whether the requested amount fits
    pub available: bool,
    /// `None` when no budget is configured for the scope
    pub remaining: Option<BigDecimal>,
    pub budget_id: Option<String>,
    pub budget_amount: Option<BigDecimal>,
    pub used_amount: Option<BigDecimal>,
    pub reserved_amount: Option<BigDecimal>,
    /// No control row applies, so nothing is restricted
    pub no_budget: bool,
    /// Fiscal year the check was made for
    pub fiscal_year: i32,
}

impl BudgetAvailability {
    /// Budget enforcement is opt-in: no configured row means no restriction
    pub fn unrestricted(fiscal_year: i32) -> Self {
        Self {
            available: true,
            remaining: None,
            budget_id: None,
            budget_amount: None,
            used_amount: None,
            reserved_amount: None,
            no_budget: true,
            fiscal_year,
        }
    }

    /// Answer from a configured control row
    pub fn for_control(control: &BudgetControl, amount: &BigDecimal) -> Self {
        let remaining = control.remaining();
        Self {
            available: remaining >= *amount,
            remaining: Some(remaining),
            budget_id: Some(control.id.clone()),
            budget_amount: Some(control.budget_amount.clone()),
            used_amount: Some(control.used_amount.clone()),
            reserved_amount: Some(control.reserved_amount.clone()),
            no_budget: false,
            fiscal_year: control.fiscal_year,
        }
    }
}

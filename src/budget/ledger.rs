//! Budget ledger: availability checks and reserve/release/commit transitions

use bigdecimal::{BigDecimal, Zero};

use crate::budget::control::*;
use crate::config::BudgetPolicy;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_non_negative_amount;

/// Which balance transition to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BudgetMovement {
    Reserve,
    Release,
    Commit,
}

impl BudgetMovement {
    fn as_str(&self) -> &'static str {
        match self {
            BudgetMovement::Reserve => "reserve",
            BudgetMovement::Release => "release",
            BudgetMovement::Commit => "commit",
        }
    }
}

/// Budget ledger over a budget store
///
/// Every balance write is a compare-and-set on the row version, retried
/// on conflict, so concurrent movements on one budget never lose updates.
pub struct BudgetLedger<S: BudgetStorage, N: ChangeNotifier = NoopNotifier> {
    storage: S,
    notifier: N,
    policy: BudgetPolicy,
}

impl<S: BudgetStorage> BudgetLedger<S> {
    /// Create a ledger with the default policy and no change notifications
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            notifier: NoopNotifier,
            policy: BudgetPolicy::default(),
        }
    }
}

impl<S: BudgetStorage, N: ChangeNotifier> BudgetLedger<S, N> {
    /// Create a ledger with an explicit policy and notifier
    pub fn with_policy(storage: S, notifier: N, policy: BudgetPolicy) -> Self {
        Self {
            storage,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> &BudgetPolicy {
        &self.policy
    }

    /// Fiscal year the request falls in
    pub fn fiscal_year(&self, ctx: &RequestContext) -> i32 {
        buddhist_fiscal_year(ctx.requested_at, self.policy.fiscal_year_offset)
    }

    /// Check whether `amount` fits the budget of a department / cost center
    ///
    /// Unknown departments and unconfigured scopes are unrestricted. The
    /// cost center narrows the lookup only when it resolves.
    pub async fn check_budget_availability(
        &self,
        ctx: &RequestContext,
        department_code: &str,
        cost_center_code: Option<&str>,
        amount: &BigDecimal,
    ) -> ProcurementResult<BudgetAvailability> {
        let fiscal_year = self.fiscal_year(ctx);

        let department = match self
            .storage
            .find_department(&ctx.company_id, department_code)
            .await?
        {
            Some(department) => department,
            None => {
                tracing::debug!(
                    company_id = %ctx.company_id,
                    department_code = %department_code,
                    "Department not found, budget unrestricted"
                );
                return Ok(BudgetAvailability::unrestricted(fiscal_year));
            }
        };

        let cost_center = match cost_center_code {
            Some(code) => self.storage.find_cost_center(&ctx.company_id, code).await?,
            None => None,
        };

        let query = BudgetScopeQuery {
            company_id: ctx.company_id.clone(),
            fiscal_year,
            department_id: department.id.clone(),
            cost_center_id: cost_center.map(|cc| cc.id),
        };
        let controls = self.storage.find_budget_controls(&query).await?;

        let availability = match select_control(&query, controls)? {
            Some(control) => BudgetAvailability::for_control(&control, amount),
            None => BudgetAvailability::unrestricted(fiscal_year),
        };

        tracing::debug!(
            company_id = %ctx.company_id,
            department_id = %query.department_id,
            fiscal_year = fiscal_year,
            available = availability.available,
            no_budget = availability.no_budget,
            "Checked budget availability"
        );

        Ok(availability)
    }

    /// Get a budget control row owned by the request's company
    pub async fn get_budget(
        &self,
        ctx: &RequestContext,
        budget_id: &str,
    ) -> ProcurementResult<BudgetControl> {
        match self.storage.get_budget_control(budget_id).await? {
            Some(control) if control.company_id == ctx.company_id => Ok(control),
            _ => Err(ProcurementError::BudgetNotFound(budget_id.to_string())),
        }
    }

    /// Earmark `amount` of the budget for a pending document
    pub async fn reserve_budget(
        &self,
        ctx: &RequestContext,
        budget_id: &str,
        amount: &BigDecimal,
    ) -> ProcurementResult<BudgetControl> {
        self.apply(ctx, budget_id, amount, BudgetMovement::Reserve)
            .await
    }

    /// Give back `amount` of reservation (rejection, cancellation, shrink)
    pub async fn release_budget(
        &self,
        ctx: &RequestContext,
        budget_id: &str,
        amount: &BigDecimal,
    ) -> ProcurementResult<BudgetControl> {
        self.apply(ctx, budget_id, amount, BudgetMovement::Release)
            .await
    }

    /// Turn `amount` of reservation into used budget
    pub async fn commit_budget(
        &self,
        ctx: &RequestContext,
        budget_id: &str,
        amount: &BigDecimal,
    ) -> ProcurementResult<BudgetControl> {
        self.apply(ctx, budget_id, amount, BudgetMovement::Commit)
            .await
    }

    /// Move a reservation from `previous_amount` to `new_amount`
    ///
    /// Used when a PO replaces its requisition's reservation with a
    /// different amount. Returns the unchanged row when the amounts agree.
    pub async fn adjust_reservation(
        &self,
        ctx: &RequestContext,
        budget_id: &str,
        previous_amount: &BigDecimal,
        new_amount: &BigDecimal,
    ) -> ProcurementResult<BudgetControl> {
        validate_non_negative_amount(previous_amount)?;
        validate_non_negative_amount(new_amount)?;

        let delta = new_amount - previous_amount;
        if delta.is_zero() {
            self.get_budget(ctx, budget_id).await
        } else if delta > BigDecimal::zero() {
            self.reserve_budget(ctx, budget_id, &delta).await
        } else {
            self.release_budget(ctx, budget_id, &delta.abs()).await
        }
    }

    async fn apply(
        &self,
        ctx: &RequestContext,
        budget_id: &str,
        amount: &BigDecimal,
        movement: BudgetMovement,
    ) -> ProcurementResult<BudgetControl> {
        validate_non_negative_amount(amount)?;
        let attempts = self.policy.max_update_attempts;

        for attempt in 1..=attempts {
            let control = self.get_budget(ctx, budget_id).await?;
            if !control.is_active {
                return Err(ProcurementError::BudgetNotFound(budget_id.to_string()));
            }

            let balances = match movement {
                BudgetMovement::Reserve => {
                    control.reserved(amount, self.policy.enforce_limit_on_reserve)?
                }
                BudgetMovement::Release => control.released(amount),
                BudgetMovement::Commit => {
                    control.committed(amount, self.policy.clamp_commit_to_reserved)
                }
            };

            let written = self
                .storage
                .update_budget_balances(
                    budget_id,
                    control.version,
                    &balances.reserved_amount,
                    &balances.used_amount,
                )
                .await?;

            if written {
                self.notifier
                    .notify(&ResourceChange::BudgetControl(budget_id.to_string()));

                let updated = BudgetControl {
                    reserved_amount: balances.reserved_amount,
                    used_amount: balances.used_amount,
                    version: control.version + 1,
                    updated_at: chrono::Utc::now().naive_utc(),
                    ..control
                };

                tracing::info!(
                    budget_id = %budget_id,
                    movement = movement.as_str(),
                    amount = %amount,
                    reserved_amount = %updated.reserved_amount,
                    used_amount = %updated.used_amount,
                    utilization_percent = %updated.utilization_percent().round(2),
                    attempt = attempt,
                    "Budget balances updated"
                );

                return Ok(updated);
            }

            tracing::debug!(
                budget_id = %budget_id,
                movement = movement.as_str(),
                attempt = attempt,
                "Budget row changed concurrently, retrying"
            );
        }

        tracing::warn!(
            budget_id = %budget_id,
            movement = movement.as_str(),
            attempts = attempts,
            "Budget update abandoned after repeated conflicts"
        );

        Err(ProcurementError::Conflict(format!(
            "budget {} {} failed after {} attempts",
            budget_id,
            movement.as_str(),
            attempts
        )))
    }
}

/// Pick the control row for a scope
///
/// A department-only lookup may hit one row per cost center; the row
/// without a cost center is the department-wide budget and wins.
fn select_control(
    query: &BudgetScopeQuery,
    mut controls: Vec<BudgetControl>,
) -> ProcurementResult<Option<BudgetControl>> {
    if controls.len() <= 1 {
        return Ok(controls.pop());
    }

    let mut department_wide = controls
        .into_iter()
        .filter(|control| control.cost_center_id.is_none());
    match (department_wide.next(), department_wide.next()) {
        (Some(control), None) => Ok(Some(control)),
        _ => Err(ProcurementError::Validation(format!(
            "ambiguous budget scope for department {} in fiscal year {}",
            query.department_id, query.fiscal_year
        ))),
    }
}

//! Expense ledger: the approval state machine and its actor guards.
//!
//! | action | actor | from |
//! |---|---|---|
//! | submit | creator | draft |
//! | delete | creator | draft, submitted |
//! | accept | assigned approver | submitted |
//! | reject | assigned approver | submitted |
//!
//! Actor checks run before status checks. Every write is a compare-and-swap on
//! the status that was checked, so of two racing transitions exactly one wins
//! and the other fails with [`LedgerError::InvalidTransition`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use expensegate_auth::Principal;
use expensegate_core::{DepartmentId, ExpenseId};

use crate::expense::{Expense, PendingExpense};
use crate::repository::{ExpenseRepository, RepositoryError};
use crate::status::{ExpenseStatus, TransitionAction};
use crate::values::{Amount, Description, RejectionReason, Title, ValidationError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("expense not found")]
    NotFound,

    #[error("principal may not act on this expense")]
    NotAuthorized,

    #[error("cannot {action} expense: {refusal}")]
    InvalidTransition {
        action: TransitionAction,
        refusal: TransitionRefusal,
    },

    #[error("principal is not an approver")]
    NotApprover,

    #[error("no approver configured for department {0}")]
    NoApprover(DepartmentId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl LedgerError {
    /// Errors that must look identical to callers so that the existence of an
    /// expense is not disclosed to principals without rights over it.
    pub fn is_concealed(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::NotAuthorized | Self::InvalidTransition { .. }
        )
    }
}

/// Why a transition precondition failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRefusal {
    /// The stored status does not allow the action.
    Status(ExpenseStatus),

    /// The record left `expected` (or was deleted) between the check and the
    /// compare-and-swap write.
    Superseded { expected: ExpenseStatus },
}

impl core::fmt::Display for TransitionRefusal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Status(status) => write!(f, "status {status} does not allow it"),
            Self::Superseded { expected } => {
                write!(f, "status changed from {expected} by a concurrent request")
            }
        }
    }
}

/// Unvalidated create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    pub title: String,
    pub description: String,
    pub amount: Decimal,
}

/// Which relationship to the expense a lookup goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Creator,
    Approver,
}

#[derive(Clone)]
pub struct ExpenseLedger {
    repo: Arc<dyn ExpenseRepository>,
}

impl ExpenseLedger {
    pub fn new(repo: Arc<dyn ExpenseRepository>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Arc<dyn ExpenseRepository> {
        &self.repo
    }

    /// Record a new draft created by `creator` and routed to `approver`.
    pub async fn create(
        &self,
        creator: &Principal,
        approver: &Principal,
        input: NewExpense,
        now: DateTime<Utc>,
    ) -> Result<Expense, LedgerError> {
        let pending = PendingExpense {
            title: Title::parse(&input.title)?,
            description: Description::parse(&input.description)?,
            amount: Amount::parse(input.amount)?,
            creator_id: creator.user_id.clone(),
            approver_id: approver.user_id.clone(),
            created_at: now,
        };

        let expense = self.repo.insert_new(pending).await?;
        info!(
            expense_id = %expense.expense_id,
            creator = %expense.creator_id,
            approver = %expense.approver_id,
            "expense created"
        );
        Ok(expense)
    }

    pub async fn submit(&self, actor: &Principal, id: &ExpenseId) -> Result<Expense, LedgerError> {
        let current = self.load_for(actor, id, TransitionAction::Submit).await?;
        let next = current.submitted();
        self.commit(&next, current.status, TransitionAction::Submit).await?;
        Ok(next)
    }

    /// Remove a draft or submitted expense. Returns the removed record.
    pub async fn delete(&self, actor: &Principal, id: &ExpenseId) -> Result<Expense, LedgerError> {
        let current = self.load_for(actor, id, TransitionAction::Delete).await?;
        if !self.repo.delete(id, current.status).await? {
            return Err(superseded(TransitionAction::Delete, current.status));
        }
        info!(expense_id = %id, by = %actor.user_id, "expense deleted");
        Ok(current)
    }

    pub async fn accept(
        &self,
        actor: &Principal,
        id: &ExpenseId,
        now: DateTime<Utc>,
    ) -> Result<Expense, LedgerError> {
        let current = self.load_for(actor, id, TransitionAction::Accept).await?;
        let next = current.accepted(now);
        self.commit(&next, current.status, TransitionAction::Accept).await?;
        Ok(next)
    }

    pub async fn reject(
        &self,
        actor: &Principal,
        id: &ExpenseId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Expense, LedgerError> {
        let reason = RejectionReason::parse(reason)?;
        let current = self.load_for(actor, id, TransitionAction::Reject).await?;
        let next = current.rejected(reason, now);
        self.commit(&next, current.status, TransitionAction::Reject).await?;
        Ok(next)
    }

    pub async fn list_created_by(&self, actor: &Principal) -> Result<Vec<Expense>, LedgerError> {
        Ok(self.repo.list_by_creator(&actor.user_id).await?)
    }

    /// Expenses routed to `actor`. Only approvers have an approval queue.
    pub async fn list_for_approval(&self, actor: &Principal) -> Result<Vec<Expense>, LedgerError> {
        if !actor.is_approver {
            return Err(LedgerError::NotApprover);
        }
        Ok(self.repo.list_by_approver(&actor.user_id).await?)
    }

    pub async fn get_by_id(
        &self,
        id: &ExpenseId,
        actor: &Principal,
        view: View,
    ) -> Result<Expense, LedgerError> {
        if view == View::Approver && !actor.is_approver {
            return Err(LedgerError::NotApprover);
        }

        let expense = self.repo.find(id).await?.ok_or(LedgerError::NotFound)?;
        let visible = match view {
            View::Creator => expense.is_created_by(&actor.user_id),
            View::Approver => expense.is_assigned_to(&actor.user_id),
        };
        if !visible {
            return Err(LedgerError::NotAuthorized);
        }
        Ok(expense)
    }

    async fn load_for(
        &self,
        actor: &Principal,
        id: &ExpenseId,
        action: TransitionAction,
    ) -> Result<Expense, LedgerError> {
        let expense = self.repo.find(id).await?.ok_or(LedgerError::NotFound)?;

        let permitted = match action {
            TransitionAction::Submit | TransitionAction::Delete => expense.is_created_by(&actor.user_id),
            TransitionAction::Accept | TransitionAction::Reject => expense.is_assigned_to(&actor.user_id),
        };
        if !permitted {
            debug!(expense_id = %id, actor = %actor.user_id, %action, "actor not permitted");
            return Err(LedgerError::NotAuthorized);
        }

        if !expense.status.allows(action) {
            debug!(expense_id = %id, %action, from = %expense.status, "transition refused");
            return Err(LedgerError::InvalidTransition {
                action,
                refusal: TransitionRefusal::Status(expense.status),
            });
        }

        Ok(expense)
    }

    async fn commit(
        &self,
        next: &Expense,
        expected: ExpenseStatus,
        action: TransitionAction,
    ) -> Result<(), LedgerError> {
        if !self.repo.save(next, expected).await? {
            return Err(superseded(action, expected));
        }
        info!(
            expense_id = %next.expense_id,
            %action,
            from = %expected,
            to = %next.status,
            "expense transitioned"
        );
        Ok(())
    }
}

/// A compare-and-swap on `expected` found the record moved on or gone.
fn superseded(action: TransitionAction, expected: ExpenseStatus) -> LedgerError {
    debug!(%action, %expected, "transition lost a concurrent race");
    LedgerError::InvalidTransition {
        action,
        refusal: TransitionRefusal::Superseded { expected },
    }
}

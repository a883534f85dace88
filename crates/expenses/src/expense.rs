use chrono::{DateTime, Utc};

use expensegate_core::{Entity, ExpenseId, UserId};

use crate::status::ExpenseStatus;
use crate::values::{Amount, Description, RejectionReason, Title};

/// An expense claim.
///
/// # Invariants
/// - `approver_id` is assigned at creation and never changes.
/// - `status` only moves along the transitions allowed by [`ExpenseStatus::allows`].
/// - `rejected_at` and `rejection_reason` are set together by a rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expense {
    pub expense_id: ExpenseId,
    pub title: Title,
    pub description: Description,
    pub amount: Amount,
    pub creator_id: UserId,
    pub approver_id: UserId,
    pub status: ExpenseStatus,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<RejectionReason>,
}

impl Expense {
    pub fn is_created_by(&self, user_id: &UserId) -> bool {
        &self.creator_id == user_id
    }

    pub fn is_assigned_to(&self, user_id: &UserId) -> bool {
        &self.approver_id == user_id
    }

    pub(crate) fn submitted(&self) -> Self {
        Self {
            status: ExpenseStatus::Submitted,
            ..self.clone()
        }
    }

    pub(crate) fn accepted(&self, now: DateTime<Utc>) -> Self {
        Self {
            status: ExpenseStatus::Accepted,
            approved_at: Some(now),
            ..self.clone()
        }
    }

    pub(crate) fn rejected(&self, reason: RejectionReason, now: DateTime<Utc>) -> Self {
        Self {
            status: ExpenseStatus::Rejected,
            rejected_at: Some(now),
            rejection_reason: Some(reason),
            ..self.clone()
        }
    }
}

impl Entity for Expense {
    type Id = ExpenseId;

    fn id(&self) -> &Self::Id {
        &self.expense_id
    }
}

/// A validated draft waiting for the repository to assign its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExpense {
    pub title: Title,
    pub description: Description,
    pub amount: Amount,
    pub creator_id: UserId,
    pub approver_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl PendingExpense {
    pub fn with_id(self, expense_id: ExpenseId) -> Expense {
        Expense {
            expense_id,
            title: self.title,
            description: self.description,
            amount: self.amount,
            creator_id: self.creator_id,
            approver_id: self.approver_id,
            status: ExpenseStatus::Draft,
            created_at: self.created_at,
            approved_at: None,
            rejected_at: None,
            rejection_reason: None,
        }
    }
}

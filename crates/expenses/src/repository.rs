//! Expense persistence port.
//!
//! Writes to existing records are compare-and-swap on the status column so two
//! concurrent transitions of the same expense cannot both land.

use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use expensegate_core::{Entity, ExpenseId, UserId};

use crate::expense::{Expense, PendingExpense};
use crate::status::ExpenseStatus;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("expense storage error: {0}")]
    Storage(String),

    /// A stored row could not be turned back into a valid [`Expense`].
    #[error("corrupt expense record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    /// Assign the next identifier from the sequence and store the draft.
    ///
    /// Identifier assignment is serialized: concurrent calls never receive the
    /// same identifier.
    async fn insert_new(&self, pending: PendingExpense) -> Result<Expense, RepositoryError>;

    /// Store a fully-formed record (bootstrap data). Returns `false` if the
    /// identifier already exists. The sequence is advanced past imported ids.
    async fn import(&self, expense: Expense) -> Result<bool, RepositoryError>;

    async fn find(&self, id: &ExpenseId) -> Result<Option<Expense>, RepositoryError>;

    /// Expenses created by `creator`, in creation order.
    async fn list_by_creator(&self, creator: &UserId) -> Result<Vec<Expense>, RepositoryError>;

    /// Expenses assigned to `approver`, in creation order.
    async fn list_by_approver(&self, approver: &UserId) -> Result<Vec<Expense>, RepositoryError>;

    /// Replace the stored record if its status is still `expected`.
    ///
    /// Returns `false` (and writes nothing) when the record is gone or its
    /// status moved on.
    async fn save(&self, expense: &Expense, expected: ExpenseStatus) -> Result<bool, RepositoryError>;

    /// Remove the record if its status is still `expected`.
    async fn delete(&self, id: &ExpenseId, expected: ExpenseStatus) -> Result<bool, RepositoryError>;
}

#[derive(Debug)]
struct Inner {
    records: Vec<Expense>,
    next_seq: u64,
}

/// In-memory expense repository.
///
/// A single lock covers both the records and the sequence, so identifier
/// assignment and every compare-and-swap are atomic.
#[derive(Debug)]
pub struct InMemoryExpenseRepository {
    inner: RwLock<Inner>,
}

impl Default for InMemoryExpenseRepository {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner {
                records: Vec::new(),
                next_seq: 1,
            }),
        }
    }
}

impl Inner {
    fn contains(&self, id: &ExpenseId) -> bool {
        self.records.iter().any(|e| e.id() == id)
    }
}

impl InMemoryExpenseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> RepositoryError {
        RepositoryError::Storage("lock poisoned".to_string())
    }

    fn filtered(&self, pred: impl Fn(&Expense) -> bool) -> Result<Vec<Expense>, RepositoryError> {
        let inner = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(inner.records.iter().filter(|e| pred(e)).cloned().collect())
    }
}

#[async_trait]
impl ExpenseRepository for InMemoryExpenseRepository {
    async fn insert_new(&self, pending: PendingExpense) -> Result<Expense, RepositoryError> {
        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;

        let mut seq = inner.next_seq;
        while inner.contains(&ExpenseId::from_sequence(seq)) {
            seq = seq
                .checked_add(1)
                .ok_or_else(|| RepositoryError::Storage("expense id sequence exhausted".to_string()))?;
        }
        inner.next_seq = seq.saturating_add(1);

        let expense = pending.with_id(ExpenseId::from_sequence(seq));
        inner.records.push(expense.clone());
        Ok(expense)
    }

    async fn import(&self, expense: Expense) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;
        if inner.contains(expense.id()) {
            return Ok(false);
        }
        if let Some(seq) = expense.expense_id.sequence() {
            inner.next_seq = inner.next_seq.max(seq.saturating_add(1));
        }
        inner.records.push(expense);
        Ok(true)
    }

    async fn find(&self, id: &ExpenseId) -> Result<Option<Expense>, RepositoryError> {
        let inner = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(inner.records.iter().find(|e| e.id() == id).cloned())
    }

    async fn list_by_creator(&self, creator: &UserId) -> Result<Vec<Expense>, RepositoryError> {
        self.filtered(|e| e.is_created_by(creator))
    }

    async fn list_by_approver(&self, approver: &UserId) -> Result<Vec<Expense>, RepositoryError> {
        self.filtered(|e| e.is_assigned_to(approver))
    }

    async fn save(&self, expense: &Expense, expected: ExpenseStatus) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;
        match inner
            .records
            .iter_mut()
            .find(|e| e.id() == expense.id() && e.status == expected)
        {
            Some(slot) => {
                *slot = expense.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &ExpenseId, expected: ExpenseStatus) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;
        let before = inner.records.len();
        inner
            .records
            .retain(|e| !(e.id() == id && e.status == expected));
        Ok(inner.records.len() != before)
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use expensegate_core::{ExpenseId, UserId};
use expensegate_expenses::{
    Amount, Description, Expense, ExpenseRepository, ExpenseStatus, PendingExpense,
    RejectionReason, RepositoryError, Title,
};

use super::describe_sqlx_error;

const SELECT_COLUMNS: &str = "expense_id, title, description, amount, creator_id, approver_id, \
     status, created_at, approved_at, rejected_at, rejection_reason";

/// Postgres-backed expense repository (`expenses` table).
///
/// Identifiers come from the `expense_id_seq` sequence. Updates and deletes
/// carry `AND status = $expected` so a concurrent transition that got there
/// first makes them affect zero rows.
#[derive(Debug, Clone)]
pub struct PostgresExpenseRepository {
    pool: Arc<PgPool>,
}

impl PostgresExpenseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    async fn list_where(&self, operation: &str, column: &str, user: &UserId) -> Result<Vec<Expense>, RepositoryError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM expenses WHERE {column} = $1 ORDER BY row_seq");
        let rows = sqlx::query(&sql)
            .bind(user.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        rows.iter().map(expense_from_row).collect()
    }
}

#[async_trait]
impl ExpenseRepository for PostgresExpenseRepository {
    #[instrument(skip(self, pending), fields(creator = %pending.creator_id), err)]
    async fn insert_new(&self, pending: PendingExpense) -> Result<Expense, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("insert_new", e))?;

        let seq: i64 = sqlx::query_scalar("SELECT nextval('expense_id_seq')")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_new", e))?;

        let expense = pending.with_id(ExpenseId::from_sequence(seq.unsigned_abs()));
        insert_row(&mut tx, &expense)
            .await
            .map_err(|e| map_sqlx_error("insert_new", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("insert_new", e))?;
        Ok(expense)
    }

    #[instrument(skip(self, expense), fields(expense_id = %expense.expense_id), err)]
    async fn import(&self, expense: Expense) -> Result<bool, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("import", e))?;

        let inserted = insert_row(&mut tx, &expense)
            .await
            .map_err(|e| map_sqlx_error("import", e))?;

        if let Some(seq) = expense.expense_id.sequence() {
            sqlx::query(
                "SELECT setval('expense_id_seq', GREATEST($1, (SELECT last_value FROM expense_id_seq)))",
            )
            .bind(i64::try_from(seq).unwrap_or(i64::MAX))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("import", e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("import", e))?;
        Ok(inserted)
    }

    #[instrument(skip(self), fields(expense_id = %id), err)]
    async fn find(&self, id: &ExpenseId) -> Result<Option<Expense>, RepositoryError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM expenses WHERE expense_id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find", e))?;

        row.as_ref().map(expense_from_row).transpose()
    }

    #[instrument(skip(self), fields(creator = %creator), err)]
    async fn list_by_creator(&self, creator: &UserId) -> Result<Vec<Expense>, RepositoryError> {
        self.list_where("list_by_creator", "creator_id", creator).await
    }

    #[instrument(skip(self), fields(approver = %approver), err)]
    async fn list_by_approver(&self, approver: &UserId) -> Result<Vec<Expense>, RepositoryError> {
        self.list_where("list_by_approver", "approver_id", approver).await
    }

    #[instrument(
        skip(self, expense),
        fields(expense_id = %expense.expense_id, expected = %expected, next = %expense.status),
        err
    )]
    async fn save(&self, expense: &Expense, expected: ExpenseStatus) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE expenses
            SET status = $3, approved_at = $4, rejected_at = $5, rejection_reason = $6
            WHERE expense_id = $1 AND status = $2
            "#,
        )
        .bind(expense.expense_id.as_str())
        .bind(expected.as_str())
        .bind(expense.status.as_str())
        .bind(expense.approved_at)
        .bind(expense.rejected_at)
        .bind(expense.rejection_reason.as_ref().map(|r| r.as_str()))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save", e))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(expense_id = %id, expected = %expected), err)]
    async fn delete(&self, id: &ExpenseId, expected: ExpenseStatus) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM expenses WHERE expense_id = $1 AND status = $2")
            .bind(id.as_str())
            .bind(expected.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        Ok(result.rows_affected() == 1)
    }
}

/// Insert `expense` unless its identifier exists. Returns whether a row was written.
async fn insert_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    expense: &Expense,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO expenses (
            expense_id, title, description, amount, creator_id, approver_id,
            status, created_at, approved_at, rejected_at, rejection_reason
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (expense_id) DO NOTHING
        "#,
    )
    .bind(expense.expense_id.as_str())
    .bind(expense.title.as_str())
    .bind(expense.description.as_str())
    .bind(expense.amount.value())
    .bind(expense.creator_id.as_str())
    .bind(expense.approver_id.as_str())
    .bind(expense.status.as_str())
    .bind(expense.created_at)
    .bind(expense.approved_at)
    .bind(expense.rejected_at)
    .bind(expense.rejection_reason.as_ref().map(|r| r.as_str()))
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}

fn expense_from_row(row: &PgRow) -> Result<Expense, RepositoryError> {
    ExpenseRow::decode(row)
        .map_err(|e| map_sqlx_error("decode", e))?
        .into_expense()
}

/// Column values of one `expenses` row, before validation.
#[derive(Debug, Clone)]
struct ExpenseRow {
    expense_id: String,
    title: String,
    description: String,
    amount: Decimal,
    creator_id: String,
    approver_id: String,
    status: String,
    created_at: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
}

impl ExpenseRow {
    fn decode(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            expense_id: row.try_get("expense_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            amount: row.try_get("amount")?,
            creator_id: row.try_get("creator_id")?,
            approver_id: row.try_get("approver_id")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            approved_at: row.try_get("approved_at")?,
            rejected_at: row.try_get("rejected_at")?,
            rejection_reason: row.try_get("rejection_reason")?,
        })
    }

    /// Re-apply the domain bounds; a row that fails them is `Corrupt`.
    fn into_expense(self) -> Result<Expense, RepositoryError> {
        let corrupt = |reason: String| RepositoryError::Corrupt {
            id: self.expense_id.clone(),
            reason,
        };

        let title = Title::parse(&self.title).map_err(|e| corrupt(e.to_string()))?;
        let description = Description::parse(&self.description).map_err(|e| corrupt(e.to_string()))?;
        let amount = Amount::parse(self.amount).map_err(|e| corrupt(e.to_string()))?;
        let status = self
            .status
            .parse::<ExpenseStatus>()
            .map_err(|e| corrupt(e.to_string()))?;
        let rejection_reason = self
            .rejection_reason
            .as_deref()
            .map(RejectionReason::parse)
            .transpose()
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(Expense {
            expense_id: ExpenseId::new(self.expense_id.as_str()),
            title,
            description,
            amount,
            creator_id: UserId::new(self.creator_id.as_str()),
            approver_id: UserId::new(self.approver_id.as_str()),
            status,
            created_at: self.created_at,
            approved_at: self.approved_at,
            rejected_at: self.rejected_at,
            rejection_reason,
        })
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(describe_sqlx_error(operation, err))
}

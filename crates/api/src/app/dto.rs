use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use expensegate_auth::{Principal, SessionToken};
use expensegate_expenses::{Expense, NewExpense};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub title: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

impl From<CreateExpenseRequest> for NewExpense {
    fn from(body: CreateExpenseRequest) -> Self {
        NewExpense {
            title: body.title,
            description: body.description,
            amount: body.amount,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RejectExpenseRequest {
    pub rejection_reason: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

impl From<SessionToken> for LoginResponse {
    fn from(token: SessionToken) -> Self {
        Self {
            access_token: token.access_token,
            token_type: SessionToken::TOKEN_TYPE,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub user_id: String,
    pub username: String,
    pub name: String,
    pub department_id: i32,
    pub is_approver: bool,
}

impl From<&Principal> for WhoAmIResponse {
    fn from(p: &Principal) -> Self {
        Self {
            user_id: p.user_id.to_string(),
            username: p.username.to_string(),
            name: p.display_name.clone(),
            department_id: p.department_id.get(),
            is_approver: p.is_approver,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    pub expense_id: String,
    pub title: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub creator_id: String,
    pub approver_id: Option<String>,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl From<&Expense> for ExpenseResponse {
    fn from(e: &Expense) -> Self {
        Self {
            expense_id: e.expense_id.to_string(),
            title: e.title.to_string(),
            description: e.description.to_string(),
            amount: e.amount.value(),
            creator_id: e.creator_id.to_string(),
            approver_id: Some(e.approver_id.to_string()),
            status: e.status.as_str(),
            created_at: e.created_at,
            approved_at: e.approved_at,
            rejected_at: e.rejected_at,
            rejection_reason: e.rejection_reason.as_ref().map(|r| r.to_string()),
        }
    }
}

pub fn expenses_to_json(expenses: &[Expense]) -> Vec<ExpenseResponse> {
    expenses.iter().map(ExpenseResponse::from).collect()
}

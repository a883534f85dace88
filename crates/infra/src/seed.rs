//! Demo principals and expenses for a fresh deployment.
//!
//! Seeding is idempotent: records whose identifier already exists are skipped.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use tracing::info;

use expensegate_auth::{Principal, PrincipalRepository, PrincipalStoreError, Secret};
use expensegate_core::{DepartmentId, ExpenseId, UserId, Username};
use expensegate_expenses::{
    Amount, Description, Expense, ExpenseRepository, ExpenseStatus, RejectionReason,
    RepositoryError, Title, ValidationError,
};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Principals(#[from] PrincipalStoreError),

    #[error(transparent)]
    Expenses(#[from] RepositoryError),

    #[error("invalid seed record: {0}")]
    Invalid(#[from] ValidationError),
}

/// How many records were actually written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub principals: usize,
    pub expenses: usize,
}

const DEMO_SECRET: &str = "password";
const MISSING_RECEIPT: &str = "Missing receipt from airline.";

fn demo_principals() -> Vec<Principal> {
    [
        ("UID01", "patson", "Patson", 1, true),
        ("UID02", "jane_doe", "Jane Doe", 2, false),
        ("UID03", "john_smith", "John Smith", 1, false),
        ("UID04", "adam_sandler", "Adam Sandler", 2, true),
    ]
    .into_iter()
    .map(|(id, username, name, dept, approver)| {
        Principal::new(
            UserId::new(id),
            Username::new(username),
            name,
            DepartmentId::new(dept),
            approver,
            Secret::new(DEMO_SECRET),
        )
    })
    .collect()
}

struct DemoExpense {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    amount: Decimal,
    creator: &'static str,
    approver: &'static str,
    status: ExpenseStatus,
    created_days_ago: i64,
    decided_days_ago: Option<i64>,
}

const DEMO_EXPENSES: &[DemoExpense] = &[
    DemoExpense {
        id: "EID01",
        title: "Office Supplies",
        description: "Purchase of pens, paper, and ink cartridges.",
        amount: dec!(75.50),
        creator: "UID02",
        approver: "UID04",
        status: ExpenseStatus::Submitted,
        created_days_ago: 2,
        decided_days_ago: None,
    },
    DemoExpense {
        id: "EID02",
        title: "Client Lunch",
        description: "Lunch with the Acme Corp. team to discuss the new project.",
        amount: dec!(120.00),
        creator: "UID03",
        approver: "UID01",
        status: ExpenseStatus::Accepted,
        created_days_ago: 5,
        decided_days_ago: Some(4),
    },
    DemoExpense {
        id: "EID03",
        title: "Software Subscription",
        description: "Monthly subscription for project management software.",
        amount: dec!(29.99),
        creator: "UID03",
        approver: "UID01",
        status: ExpenseStatus::Draft,
        created_days_ago: 1,
        decided_days_ago: None,
    },
    DemoExpense {
        id: "EID04",
        title: "Travel Expenses",
        description: "Flight ticket for the Q2 conference.",
        amount: dec!(450.00),
        creator: "UID02",
        approver: "UID04",
        status: ExpenseStatus::Rejected,
        created_days_ago: 7,
        decided_days_ago: Some(6),
    },
    DemoExpense {
        id: "EID05",
        title: "Travel Expenses",
        description: "Flight ticket for the Q3 conference.",
        amount: dec!(450.00),
        creator: "UID01",
        approver: "UID01",
        status: ExpenseStatus::Rejected,
        created_days_ago: 7,
        decided_days_ago: Some(6),
    },
];

impl DemoExpense {
    fn to_expense(&self, now: DateTime<Utc>) -> Result<Expense, ValidationError> {
        let decided_at = self.decided_days_ago.map(|days| now - Duration::days(days));
        let rejected = self.status == ExpenseStatus::Rejected;

        Ok(Expense {
            expense_id: ExpenseId::new(self.id),
            title: Title::parse(self.title)?,
            description: Description::parse(self.description)?,
            amount: Amount::parse(self.amount)?,
            creator_id: UserId::new(self.creator),
            approver_id: UserId::new(self.approver),
            status: self.status,
            created_at: now - Duration::days(self.created_days_ago),
            approved_at: decided_at.filter(|_| self.status == ExpenseStatus::Accepted),
            rejected_at: decided_at.filter(|_| rejected),
            rejection_reason: if rejected {
                Some(RejectionReason::parse(MISSING_RECEIPT)?)
            } else {
                None
            },
        })
    }
}

/// Provision the demo principals, then import the demo expenses with
/// timestamps relative to `now`.
pub async fn seed_demo_data(
    principals: &dyn PrincipalRepository,
    expenses: &dyn ExpenseRepository,
    now: DateTime<Utc>,
) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    for principal in demo_principals() {
        if principals.provision(principal).await? {
            report.principals += 1;
        }
    }

    for demo in DEMO_EXPENSES {
        if expenses.import(demo.to_expense(now)?).await? {
            report.expenses += 1;
        }
    }

    info!(
        principals = report.principals,
        expenses = report.expenses,
        "demo data seeded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use expensegate_auth::InMemoryPrincipalRepository;
    use expensegate_expenses::InMemoryExpenseRepository;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let principals = InMemoryPrincipalRepository::new();
        let expenses = InMemoryExpenseRepository::new();

        let first = seed_demo_data(&principals, &expenses, now()).await.unwrap();
        assert_eq!(first, SeedReport { principals: 4, expenses: 5 });

        let second = seed_demo_data(&principals, &expenses, now()).await.unwrap();
        assert_eq!(second, SeedReport::default());
    }

    #[tokio::test]
    async fn demo_records_match_the_bootstrap_set() {
        let principals = InMemoryPrincipalRepository::new();
        let expenses = InMemoryExpenseRepository::new();
        seed_demo_data(&principals, &expenses, now()).await.unwrap();

        let approver = principals.find_approver(DepartmentId::new(2)).await.unwrap().unwrap();
        assert_eq!(approver.username.as_str(), "adam_sandler");

        let eid04 = expenses.find(&ExpenseId::new("EID04")).await.unwrap().unwrap();
        assert_eq!(eid04.status, ExpenseStatus::Rejected);
        assert_eq!(eid04.rejected_at, Some(now() - Duration::days(6)));
        assert_eq!(eid04.approved_at, None);
        assert_eq!(eid04.rejection_reason.unwrap().as_str(), MISSING_RECEIPT);

        let eid02 = expenses.find(&ExpenseId::new("EID02")).await.unwrap().unwrap();
        assert_eq!(eid02.approved_at, Some(now() - Duration::days(4)));

        let john = expenses.list_by_creator(&UserId::new("UID03")).await.unwrap();
        assert_eq!(john.len(), 2);
    }

    #[tokio::test]
    async fn new_expenses_continue_after_the_seeded_ids() {
        let principals = InMemoryPrincipalRepository::new();
        let expenses = InMemoryExpenseRepository::new();
        seed_demo_data(&principals, &expenses, now()).await.unwrap();

        let pending = DEMO_EXPENSES[2].to_expense(now()).unwrap();
        let created = expenses
            .insert_new(expensegate_expenses::PendingExpense {
                title: pending.title,
                description: pending.description,
                amount: pending.amount,
                creator_id: pending.creator_id,
                approver_id: pending.approver_id,
                created_at: now(),
            })
            .await
            .unwrap();
        assert_eq!(created.expense_id.as_str(), "EID06");
    }
}

//! Authorization mediator.
//!
//! Takes an identity already verified by the token service, resolves it to a
//! principal, and forwards the request to the ledger as that principal. It is
//! transport-independent; the HTTP layer only maps its errors.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

use expensegate_auth::{AccessError, AuthError, CredentialStore, Principal};
use expensegate_core::{ExpenseId, Username};

use crate::expense::Expense;
use crate::ledger::{ExpenseLedger, LedgerError, NewExpense, View};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediatorError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Clone)]
pub struct AuthorizationMediator {
    credentials: Arc<CredentialStore>,
    ledger: ExpenseLedger,
}

impl AuthorizationMediator {
    pub fn new(credentials: Arc<CredentialStore>, ledger: ExpenseLedger) -> Self {
        Self { credentials, ledger }
    }

    pub fn ledger(&self) -> &ExpenseLedger {
        &self.ledger
    }

    /// Resolve a verified identity to its principal record.
    pub async fn principal(&self, identity: &Username) -> Result<Principal, MediatorError> {
        self.credentials.lookup(identity).await.map_err(|err| {
            if err == AuthError::NotFound {
                warn!(username = %identity, "verified identity has no principal record");
            }
            MediatorError::Access(err.into())
        })
    }

    /// Create a draft routed to the approver of the creator's department.
    pub async fn create(
        &self,
        identity: &Username,
        input: NewExpense,
        now: DateTime<Utc>,
    ) -> Result<Expense, MediatorError> {
        let creator = self.principal(identity).await?;
        let approver = match self.credentials.find_approver(creator.department_id).await {
            Ok(approver) => approver,
            Err(AuthError::NotFound) => {
                warn!(department = %creator.department_id, "no approver for department");
                return Err(LedgerError::NoApprover(creator.department_id).into());
            }
            Err(err) => return Err(MediatorError::Access(err.into())),
        };
        Ok(self.ledger.create(&creator, &approver, input, now).await?)
    }

    pub async fn submit(&self, identity: &Username, id: &ExpenseId) -> Result<Expense, MediatorError> {
        let actor = self.principal(identity).await?;
        Ok(self.ledger.submit(&actor, id).await?)
    }

    pub async fn delete(&self, identity: &Username, id: &ExpenseId) -> Result<Expense, MediatorError> {
        let actor = self.principal(identity).await?;
        Ok(self.ledger.delete(&actor, id).await?)
    }

    pub async fn accept(
        &self,
        identity: &Username,
        id: &ExpenseId,
        now: DateTime<Utc>,
    ) -> Result<Expense, MediatorError> {
        let actor = self.principal(identity).await?;
        Ok(self.ledger.accept(&actor, id, now).await?)
    }

    pub async fn reject(
        &self,
        identity: &Username,
        id: &ExpenseId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Expense, MediatorError> {
        let actor = self.principal(identity).await?;
        Ok(self.ledger.reject(&actor, id, reason, now).await?)
    }

    pub async fn list_created_by(&self, identity: &Username) -> Result<Vec<Expense>, MediatorError> {
        let actor = self.principal(identity).await?;
        Ok(self.ledger.list_created_by(&actor).await?)
    }

    pub async fn list_for_approval(&self, identity: &Username) -> Result<Vec<Expense>, MediatorError> {
        let actor = self.principal(identity).await?;
        Ok(self.ledger.list_for_approval(&actor).await?)
    }

    pub async fn get_by_id(
        &self,
        identity: &Username,
        id: &ExpenseId,
        view: View,
    ) -> Result<Expense, MediatorError> {
        let actor = self.principal(identity).await?;
        Ok(self.ledger.get_by_id(id, &actor, view).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryExpenseRepository;
    use crate::status::ExpenseStatus;
    use chrono::TimeZone;
    use expensegate_auth::{InMemoryPrincipalRepository, PrincipalRepository, Secret};
    use expensegate_core::{DepartmentId, UserId};
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    async fn mediator() -> AuthorizationMediator {
        let principals = InMemoryPrincipalRepository::new();
        for (id, name, dept, approver) in [
            ("UID01", "patson", 1, true),
            ("UID02", "jane_doe", 2, false),
            ("UID03", "john_smith", 1, false),
            ("UID05", "lonely", 3, false),
        ] {
            principals
                .provision(Principal::new(
                    UserId::new(id),
                    Username::new(name),
                    name,
                    DepartmentId::new(dept),
                    approver,
                    Secret::new("password"),
                ))
                .await
                .unwrap();
        }
        AuthorizationMediator::new(
            Arc::new(CredentialStore::plaintext(Arc::new(principals))),
            ExpenseLedger::new(Arc::new(InMemoryExpenseRepository::new())),
        )
    }

    fn input() -> NewExpense {
        NewExpense {
            title: "Office Supplies".to_string(),
            description: "Printer paper and toner for the team.".to_string(),
            amount: dec!(75.50),
        }
    }

    #[tokio::test]
    async fn create_routes_to_the_department_approver() {
        let m = mediator().await;
        let expense = m.create(&Username::new("john_smith"), input(), t0()).await.unwrap();
        assert_eq!(expense.creator_id.as_str(), "UID03");
        assert_eq!(expense.approver_id.as_str(), "UID01");
        assert_eq!(expense.status, ExpenseStatus::Draft);
    }

    #[tokio::test]
    async fn department_without_approver_is_reported() {
        let m = mediator().await;
        let err = m.create(&Username::new("jane_doe"), input(), t0()).await.unwrap_err();
        assert_eq!(err, MediatorError::Ledger(LedgerError::NoApprover(DepartmentId::new(2))));
    }

    #[tokio::test]
    async fn unknown_identity_is_unknown_principal() {
        let m = mediator().await;
        let err = m.list_created_by(&Username::new("ghost")).await.unwrap_err();
        assert_eq!(err, MediatorError::Access(AccessError::UnknownPrincipal));
    }

    #[tokio::test]
    async fn full_flow_through_identities() {
        let m = mediator().await;
        let john = Username::new("john_smith");
        let patson = Username::new("patson");

        let id = m.create(&john, input(), t0()).await.unwrap().expense_id;
        m.submit(&john, &id).await.unwrap();

        assert_eq!(m.list_for_approval(&patson).await.unwrap().len(), 1);
        assert_eq!(
            m.list_for_approval(&john).await.unwrap_err(),
            MediatorError::Ledger(LedgerError::NotApprover)
        );

        let accepted = m.accept(&patson, &id, t0()).await.unwrap();
        assert_eq!(accepted.status, ExpenseStatus::Accepted);
        assert_eq!(
            m.get_by_id(&john, &id, View::Creator).await.unwrap().status,
            ExpenseStatus::Accepted
        );
        assert!(m.reject(&patson, &id, "Missing receipt from airline.", t0()).await.is_err());
        assert!(m.delete(&john, &id).await.is_err());
    }
}

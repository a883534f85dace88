//! `expensegate-expenses` — expense records and their approval state machine.
//!
//! - [`Expense`] and its validated fields ([`Title`], [`Description`],
//!   [`Amount`], [`RejectionReason`])
//! - [`ExpenseRepository`] with compare-and-swap writes
//! - [`ExpenseLedger`]: the state machine and its actor guards
//! - [`AuthorizationMediator`]: verified identity in, authorized ledger call out

pub mod expense;
pub mod ledger;
pub mod mediator;
pub mod repository;
pub mod status;
pub mod values;

pub use expense::{Expense, PendingExpense};
pub use ledger::{ExpenseLedger, LedgerError, NewExpense, TransitionRefusal, View};
pub use mediator::{AuthorizationMediator, MediatorError};
pub use repository::{ExpenseRepository, InMemoryExpenseRepository, RepositoryError};
pub use status::{ExpenseStatus, TransitionAction};
pub use values::{Amount, Description, RejectionReason, Title, ValidationError};

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use expensegate_core::DomainError;

/// Expense lifecycle: `draft -> submitted -> {accepted | rejected}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    Draft,
    Submitted,
    Accepted,
    Rejected,
}

impl ExpenseStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }

    /// Whether `action` may start from this status.
    pub const fn allows(self, action: TransitionAction) -> bool {
        match action {
            TransitionAction::Submit => matches!(self, Self::Draft),
            TransitionAction::Delete => matches!(self, Self::Draft | Self::Submitted),
            TransitionAction::Accept | TransitionAction::Reject => matches!(self, Self::Submitted),
        }
    }
}

impl core::fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(DomainError::validation(format!("unknown expense status '{other}'"))),
        }
    }
}

/// State-changing operations on an existing expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionAction {
    Submit,
    Delete,
    Accept,
    Reject,
}

impl TransitionAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Delete => "delete",
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }
}

impl core::fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

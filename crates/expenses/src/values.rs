//! Validated expense fields.
//!
//! Each type can only be constructed through its `parse` function, so a value
//! in hand is known to satisfy its bounds. Lengths count Unicode scalar
//! values; input is not trimmed.

use rust_decimal::Decimal;
use thiserror::Error;

use expensegate_core::{DomainError, ValueObject};

/// Input bounds violated for a named field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for DomainError {
    fn from(value: ValidationError) -> Self {
        DomainError::validation(value.to_string())
    }
}

fn bounded(field: &'static str, value: &str, min: usize, max: usize) -> Result<String, ValidationError> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::new(
            field,
            format!("should have at least {min} characters"),
        ));
    }
    if len > max {
        return Err(ValidationError::new(
            field,
            format!("should have at most {max} characters"),
        ));
    }
    Ok(value.to_string())
}

macro_rules! bounded_text {
    ($(#[$meta:meta])* $name:ident, $field:literal, $min:expr, $max:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(String);

        impl $name {
            pub const MIN_CHARS: usize = $min;
            pub const MAX_CHARS: usize = $max;

            pub fn parse(value: &str) -> Result<Self, ValidationError> {
                bounded($field, value, Self::MIN_CHARS, Self::MAX_CHARS).map(Self)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ValueObject for $name {}

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

bounded_text!(
    /// Expense title, 3 to 100 characters.
    Title, "title", 3, 100
);
bounded_text!(
    /// Expense description, 10 to 500 characters.
    Description, "description", 10, 500
);
bounded_text!(
    /// Reason recorded when an approver rejects an expense, 10 to 500 characters.
    RejectionReason, "rejection_reason", 10, 500
);

/// Strictly positive monetary amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    pub fn parse(value: Decimal) -> Result<Self, ValidationError> {
        if value <= Decimal::ZERO {
            return Err(ValidationError::new("amount", "should be greater than 0"));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl ValueObject for Amount {}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn title_bounds() {
        assert!(Title::parse("ab").is_err());
        assert!(Title::parse("abc").is_ok());
        assert!(Title::parse(&"t".repeat(100)).is_ok());
        let err = Title::parse(&"t".repeat(101)).unwrap_err();
        assert_eq!(err.field, "title");
    }

    #[test]
    fn description_bounds() {
        assert!(Description::parse(&"d".repeat(9)).is_err());
        assert!(Description::parse(&"d".repeat(10)).is_ok());
        assert!(Description::parse(&"d".repeat(500)).is_ok());
        assert!(Description::parse(&"d".repeat(501)).is_err());
    }

    #[test]
    fn rejection_reason_bounds() {
        assert!(RejectionReason::parse(&"r".repeat(9)).is_err());
        assert!(RejectionReason::parse("Missing receipt from airline.").is_ok());
        assert!(RejectionReason::parse(&"r".repeat(500)).is_ok());
        let err = RejectionReason::parse(&"r".repeat(501)).unwrap_err();
        assert_eq!(err.field, "rejection_reason");
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        // 3 characters, 6 bytes.
        assert!(Title::parse("äöü").is_ok());
        assert!(Title::parse("äö").is_err());
    }

    #[test]
    fn whitespace_is_not_trimmed() {
        assert!(Title::parse("   ").is_ok());
        assert_eq!(Title::parse(" ab ").unwrap().as_str(), " ab ");
    }

    #[test]
    fn amount_must_be_strictly_positive() {
        assert!(Amount::parse(dec!(0)).is_err());
        assert!(Amount::parse(dec!(-1.00)).is_err());
        assert_eq!(Amount::parse(dec!(75.50)).unwrap().value(), dec!(75.50));
        assert!(Amount::parse(dec!(0.01)).is_ok());
    }

    #[test]
    fn validation_error_converts_to_domain_error() {
        let err: DomainError = Title::parse("x").unwrap_err().into();
        assert!(matches!(err, DomainError::Validation(msg) if msg.starts_with("title:")));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn title_accepts_exactly_its_bounds(s in "\\PC{0,120}") {
                let len = s.chars().count();
                prop_assert_eq!(Title::parse(&s).is_ok(), (3..=100).contains(&len));
            }

            #[test]
            fn description_accepts_exactly_its_bounds(len in 0usize..600) {
                let s = "x".repeat(len);
                prop_assert_eq!(Description::parse(&s).is_ok(), (10..=500).contains(&len));
            }

            #[test]
            fn rejection_reason_accepts_exactly_its_bounds(len in 0usize..600) {
                let s = "é".repeat(len);
                prop_assert_eq!(RejectionReason::parse(&s).is_ok(), (10..=500).contains(&len));
            }

            #[test]
            fn amount_sign_decides_validity(cents in -1_000_000i64..1_000_000) {
                let value = Decimal::new(cents, 2);
                prop_assert_eq!(Amount::parse(value).is_ok(), cents > 0);
            }
        }
    }
}

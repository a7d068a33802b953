use std::fmt::Display;

use thiserror::Error;

/// Rejected user input, tagged with the offending field so HTTP hints can
/// point at it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("`{field}` must not be empty")]
    Blank { field: &'static str },
    #[error("`{field}` is {value}, expected {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("invalid `{field}`: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl DomainError {
    pub fn blank(field: &'static str) -> Self {
        Self::Blank { field }
    }

    pub fn out_of_range(field: &'static str, value: impl Display, expected: &'static str) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
            expected,
        }
    }

    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            Self::Blank { field } | Self::OutOfRange { field, .. } | Self::Invalid { field, .. } => {
                field
            }
        }
    }
}

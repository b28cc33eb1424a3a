//! Unified error types for the ledger.
//!
//! Every fallible operation returns [`Result`]. Each [`Error`] variant falls into one
//! [`ErrorKind`], which is what the Discord layer (or any other boundary) uses to pick
//! a stable status and a generic user-facing message. The detailed `Display` text is
//! for server-side logs only.

use crate::core::money::Money;
use sea_orm::DbErr;
use thiserror::Error;

/// All errors produced by the ledger.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced user, sender, receiver or transaction does not exist
    #[error("{what} {id} not found")]
    NotFound {
        /// What was looked up (`"user"`, `"sender"`, `"receiver"`, `"transaction"`)
        what: &'static str,
        /// The id that was not found
        id: i64,
    },

    /// Input failed a business rule (amount, lengths, duplicates, malformed category)
    #[error("Validation failed: {message}")]
    Validation {
        /// Description of the failed rule
        message: String,
    },

    /// A debit would drive the balance below zero
    #[error("Insufficient funds for user {user_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Owner of the account
        user_id: i64,
        /// Balance at the time of the attempt
        balance: Money,
        /// Amount that was requested
        requested: Money,
    },

    /// The actor lacks the role or ownership needed for the action
    #[error("Not authorized: {message}")]
    Authorization {
        /// What was denied
        message: String,
    },

    /// No authenticated actor was supplied
    #[error("Not authenticated")]
    Authentication,

    /// Storage or commit failure
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// A notification could not be delivered
    #[error("Notification delivery failed: {message}")]
    Notification {
        /// Description of the delivery failure
        message: String,
    },

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the Discord framework
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for an [`Error::Authorization`] with the given message.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Classifies the error into the stable taxonomy used at the boundary.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::Authorization { .. } => ErrorKind::Authorization,
            Self::Authentication => ErrorKind::Authentication,
            Self::Database(_)
            | Self::Config { .. }
            | Self::Notification { .. }
            | Self::Io(_)
            | Self::Framework(_) => ErrorKind::Internal,
        }
    }
}

/// Error classification exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Referenced entity does not exist
    NotFound,
    /// Input rejected by a business rule
    Validation,
    /// Debit larger than the available balance
    InsufficientFunds,
    /// Actor not allowed to act on the target
    Authorization,
    /// No authenticated actor
    Authentication,
    /// Anything unrelated to business rules
    Internal,
}

impl ErrorKind {
    /// HTTP-style status code for the kind.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Validation | Self::InsufficientFunds => 400,
            Self::Authorization => 403,
            Self::Authentication => 401,
            Self::Internal => 500,
        }
    }

    /// Generic message safe to show to the requester.
    #[must_use]
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::NotFound => "Not found.",
            Self::Validation => "Validation error.",
            Self::InsufficientFunds => "Insufficient balance.",
            Self::Authorization => "You are not allowed to do that.",
            Self::Authentication => {
                "Your Discord account is not linked to a ledger user."
            }
            Self::Internal => "An internal error occurred.",
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let not_found = Error::NotFound {
            what: "user",
            id: 7,
        };
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(not_found.kind().status_code(), 404);
        assert_eq!(not_found.to_string(), "user 7 not found");

        assert_eq!(Error::validation("bad").kind(), ErrorKind::Validation);
        assert_eq!(Error::authorization("no").kind().status_code(), 403);
        assert_eq!(Error::Authentication.kind().status_code(), 401);
        assert_eq!(
            Error::Database(DbErr::Custom("boom".to_string())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_insufficient_funds_message_keeps_details_server_side() {
        let err = Error::InsufficientFunds {
            user_id: 3,
            balance: Money::from_cents(1000),
            requested: Money::from_cents(1500),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds for user 3: balance 10.00, requested 15.00"
        );
        assert_eq!(err.kind().user_message(), "Insufficient balance.");
        assert!(!err.kind().user_message().contains("10.00"));
    }
}

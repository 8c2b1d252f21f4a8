//! Checkout error taxonomy.
//!
//! Every failure in the checkout flow is classified into one of these
//! variants, independent of the exact processor error text. Classification
//! drives two policies: whether an automatic retry is attempted
//! ([`CheckoutError::is_transient`]) and which user-facing message is
//! shown ([`CheckoutError::user_message`]). No error is surfaced without a
//! recovery affordance.

use thiserror::Error;

/// Errors surfaced by the checkout core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Processor response lacked the expected client secret.
    #[error("payment intent response was missing its client secret")]
    MissingSecret,

    /// Bearer credential missing or expired.
    #[error("not authorized")]
    Unauthorized,

    /// The request did not complete (timeout or connection failure).
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response from the backend.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code of the response.
        status: u16,
        /// Message extracted from the response body, possibly empty.
        message: String,
    },

    /// Locally detected missing or malformed required fields. Blocks the
    /// confirmation step; never reaches the network.
    #[error("invalid fields: {}", fields.join(", "))]
    Validation {
        /// Names of the offending fields.
        fields: Vec<String>,
    },

    /// The confirmation endpoint rejected the attempt. Terminal: a prior
    /// attempt may have partially mutated processor state.
    #[error("confirmation rejected: {0}")]
    ConfirmFailed(String),

    /// Anything the client could not classify.
    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl CheckoutError {
    /// Whether this class is eligible for bounded automatic retry.
    ///
    /// Only incomplete requests and 5xx responses qualify; everything else
    /// requires user action.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether recovery requires a fresh sign-in.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// The distinct, actionable message shown to the shopper.
    ///
    /// Confirmation rejections pass the server's reason through verbatim;
    /// everything else gets a class-level message that never leaks
    /// internals.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingSecret => {
                "The payment service returned an incomplete response. \
                 Please try again, or contact support if this keeps happening."
                    .to_owned()
            }
            Self::Unauthorized => "Your session has expired. Please sign in again.".to_owned(),
            Self::Network(_) => {
                "We couldn't reach the payment service. Check your connection and try again."
                    .to_owned()
            }
            Self::Server { status, .. } if *status >= 500 => {
                "The payment service is temporarily unavailable. Please try again in a moment."
                    .to_owned()
            }
            Self::Server { message, .. } => {
                if message.is_empty() {
                    "Your request could not be processed. Please review your order and try again."
                        .to_owned()
                } else {
                    message.clone()
                }
            }
            Self::Validation { fields } => format!("Please review: {}", fields.join(", ")),
            Self::ConfirmFailed(reason) => reason.clone(),
            Self::Unknown(_) => "Something went wrong. Please try again.".to_owned(),
        }
    }
}

impl From<reqwest::Error> for CheckoutError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Unknown(err.to_string())
        } else {
            // Timeouts, connection failures, and anything else that kept
            // the request from completing.
            Self::Network(err.to_string())
        }
    }
}

/// Classify a non-success HTTP status.
pub(crate) fn classify_status(status: u16, message: String) -> CheckoutError {
    match status {
        401 | 403 => CheckoutError::Unauthorized,
        _ => CheckoutError::Server { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classes() {
        assert!(CheckoutError::Network("timed out".into()).is_transient());
        assert!(
            CheckoutError::Server {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_terminal_classes() {
        assert!(!CheckoutError::MissingSecret.is_transient());
        assert!(!CheckoutError::Unauthorized.is_transient());
        assert!(
            !CheckoutError::Server {
                status: 422,
                message: String::new()
            }
            .is_transient()
        );
        assert!(!CheckoutError::ConfirmFailed("declined".into()).is_transient());
        assert!(!CheckoutError::Unknown("?".into()).is_transient());
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(
            classify_status(401, String::new()),
            CheckoutError::Unauthorized
        );
        assert_eq!(
            classify_status(403, String::new()),
            CheckoutError::Unauthorized
        );
        assert_eq!(
            classify_status(500, "boom".into()),
            CheckoutError::Server {
                status: 500,
                message: "boom".into()
            }
        );
    }

    #[test]
    fn test_confirm_failed_message_is_verbatim() {
        let err = CheckoutError::ConfirmFailed("Slot already booked".into());
        assert_eq!(err.user_message(), "Slot already booked");
    }

    #[test]
    fn test_messages_are_distinct_per_class() {
        let errors = [
            CheckoutError::MissingSecret,
            CheckoutError::Unauthorized,
            CheckoutError::Network("x".into()),
            CheckoutError::Server {
                status: 503,
                message: String::new(),
            },
            CheckoutError::Server {
                status: 422,
                message: "quantity unavailable".into(),
            },
            CheckoutError::Validation {
                fields: vec!["email".into()],
            },
            CheckoutError::ConfirmFailed("card declined".into()),
            CheckoutError::Unknown("x".into()),
        ];

        let messages: Vec<String> = errors.iter().map(CheckoutError::user_message).collect();
        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_requires_login() {
        assert!(CheckoutError::Unauthorized.requires_login());
        assert!(!CheckoutError::MissingSecret.requires_login());
    }
}

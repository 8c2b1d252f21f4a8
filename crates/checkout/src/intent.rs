//! Payment intent lifecycle and retry policy.

use std::time::Duration;

use crate::error::CheckoutError;

/// Lifecycle of the processor-issued payment intent.
///
/// Transitions happen only through the gateway; `Ready` gates the
/// confirmation step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PaymentIntentState {
    /// No intent requested yet.
    #[default]
    Absent,
    /// A creation attempt is in flight or queued behind a backoff timer.
    Pending,
    /// The processor issued a client secret; confirmation may run.
    Ready {
        /// The secret handed to the processor-hosted confirmation UI.
        client_secret: String,
    },
    /// Creation failed and no automatic retry remains.
    Failed(CheckoutError),
}

impl PaymentIntentState {
    /// Whether confirmation may run.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// The client secret, when ready.
    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        match self {
            Self::Ready { client_secret } => Some(client_secret),
            _ => None,
        }
    }
}

/// Automatic retry policy for payment-intent creation.
///
/// Retries apply only to transient failures. The backoff before retry
/// `n` (1-indexed) is `n × backoff_unit`: 2 s then 4 s with the default
/// policy. A manual retry resets the counter and is never subject to the
/// cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum automatic retries after the initial attempt.
    pub max_retries: u8,
    /// Base delay multiplied by the retry number.
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    /// Create a new policy.
    #[must_use]
    pub const fn new(max_retries: u8, backoff_unit: Duration) -> Self {
        Self {
            max_retries,
            backoff_unit,
        }
    }

    /// Whether another automatic retry should be scheduled for `error`
    /// after `retries_used` automatic retries.
    #[must_use]
    pub fn should_retry(&self, error: &CheckoutError, retries_used: u8) -> bool {
        error.is_transient() && retries_used < self.max_retries
    }

    /// Backoff before the given retry (1-indexed).
    #[must_use]
    pub fn delay_for_retry(&self, retry: u8) -> Duration {
        self.backoff_unit * u32::from(retry)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_retry(2), Duration::from_secs(4));
    }

    #[test]
    fn test_retry_cap() {
        let policy = RetryPolicy::default();
        let network = CheckoutError::Network("timed out".into());

        assert!(policy.should_retry(&network, 0));
        assert!(policy.should_retry(&network, 1));
        assert!(!policy.should_retry(&network, 2));
    }

    #[test]
    fn test_terminal_classes_never_retry() {
        let policy = RetryPolicy::default();

        assert!(!policy.should_retry(&CheckoutError::Unauthorized, 0));
        assert!(!policy.should_retry(&CheckoutError::MissingSecret, 0));
        assert!(!policy.should_retry(
            &CheckoutError::Server {
                status: 422,
                message: String::new()
            },
            0
        ));
        assert!(policy.should_retry(
            &CheckoutError::Server {
                status: 503,
                message: String::new()
            },
            0
        ));
    }

    #[test]
    fn test_intent_state_gates_confirmation() {
        assert!(!PaymentIntentState::Absent.is_ready());
        assert!(!PaymentIntentState::Pending.is_ready());

        let ready = PaymentIntentState::Ready {
            client_secret: "pi_secret".into(),
        };
        assert!(ready.is_ready());
        assert_eq!(ready.client_secret(), Some("pi_secret"));

        let failed = PaymentIntentState::Failed(CheckoutError::MissingSecret);
        assert!(!failed.is_ready());
        assert!(failed.client_secret().is_none());
    }
}

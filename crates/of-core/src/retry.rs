//! Centralized retry policy for extraction steps.
//!
//! Errors are classified once, into retryable kinds or fatal kinds. The
//! policy decides whether to retry and how long to wait; call sites never
//! carry their own retry loops.

use crate::literals::storage_literals;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Classified error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorClass {
    // Retryable
    Network,
    RateLimited,
    ServerError,
    ResourceExhausted,
    Timeout,
    // Fatal
    Configuration,
    Validation,
    Cancelled,
    Internal,
}

storage_literals!(ErrorClass, "error class", {
    Network => "network",
    RateLimited => "rateLimited",
    ServerError => "serverError",
    ResourceExhausted => "resourceExhausted",
    Timeout => "timeout",
    Configuration => "configuration",
    Validation => "validation",
    Cancelled => "cancelled",
    Internal => "internal",
});

impl ErrorClass {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorClass::Network
                | ErrorClass::RateLimited
                | ErrorClass::ServerError
                | ErrorClass::ResourceExhausted
                | ErrorClass::Timeout
        )
    }

    /// Classify an HTTP status code returned by an external service.
    pub fn from_http_status(status: u16) -> Option<Self> {
        match status {
            429 => Some(ErrorClass::RateLimited),
            408 | 504 => Some(ErrorClass::Timeout),
            500..=599 => Some(ErrorClass::ServerError),
            400..=499 => Some(ErrorClass::Validation),
            _ => None,
        }
    }

    /// Classify a driver or service error by its message.
    ///
    /// Used where the underlying error exposes no structured kind.
    pub fn from_message(message: &str) -> Self {
        let msg = message.to_ascii_lowercase();
        if msg.contains("rate limit") || msg.contains("too many requests") || msg.contains("429")
        {
            ErrorClass::RateLimited
        } else if msg.contains("timed out") || msg.contains("timeout") {
            ErrorClass::Timeout
        } else if msg.contains("out of memory")
            || msg.contains("resource exhausted")
            || msg.contains("too many connections")
            || msg.contains("could not set lock")
        {
            ErrorClass::ResourceExhausted
        } else if msg.contains("connection") || msg.contains("network") || msg.contains("broken pipe")
        {
            ErrorClass::Network
        } else if msg.contains("503") || msg.contains("502") || msg.contains("500") {
            ErrorClass::ServerError
        } else {
            ErrorClass::Internal
        }
    }
}

/// Anything that can report its [`ErrorClass`].
pub trait Classify {
    fn error_class(&self) -> ErrorClass;
}

/// Retry parameters shared by every step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total attempts per step, including the first.
    pub max_attempts: u32,
    /// Consecutive failures of one classified kind before escalating to fatal.
    pub same_error_threshold: u32,
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Upper bound on the nominal delay.
    pub max_delay_ms: u64,
    /// Relative jitter applied around the nominal delay (0.1 = ±10%).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            same_error_threshold: 5,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Nominal (un-jittered) delay before retry number `attempt` (1-based).
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(20);
        let ms = self
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Jittered delay: nominal ± `jitter * nominal`, drawn from `rng`.
    pub fn delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let nominal = self.nominal_delay(attempt).as_secs_f64();
        let spread = nominal * self.jitter.clamp(0.0, 1.0);
        let offset = if spread > 0.0 {
            rng.gen_range(-spread..=spread)
        } else {
            0.0
        };
        Duration::from_secs_f64((nominal + offset).max(0.0))
    }

    /// Jittered delay using the thread-local RNG.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }

    /// Inclusive bounds any jittered delay for `attempt` falls within.
    pub fn delay_bounds(&self, attempt: u32) -> (Duration, Duration) {
        let nominal = self.nominal_delay(attempt).as_secs_f64();
        let spread = nominal * self.jitter.clamp(0.0, 1.0);
        (
            Duration::from_secs_f64((nominal - spread).max(0.0)),
            Duration::from_secs_f64(nominal + spread),
        )
    }

    /// Fresh per-step tracker.
    pub fn tracker(&self) -> RetryTracker<'_> {
        RetryTracker {
            policy: self,
            attempts: 0,
            last_class: None,
            same_class_streak: 0,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, then try again.
    RetryAfter(Duration),
    /// Stop. `escalated` is set when a retryable error exhausted its budget.
    GiveUp { class: ErrorClass, escalated: bool },
}

/// Per-step attempt bookkeeping.
#[derive(Debug)]
pub struct RetryTracker<'a> {
    policy: &'a RetryPolicy,
    attempts: u32,
    last_class: Option<ErrorClass>,
    same_class_streak: u32,
}

impl RetryTracker<'_> {
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record a failed attempt and decide what happens next.
    pub fn on_failure(&mut self, class: ErrorClass) -> RetryDecision {
        self.on_failure_with(class, &mut rand::thread_rng())
    }

    pub fn on_failure_with<R: Rng + ?Sized>(
        &mut self,
        class: ErrorClass,
        rng: &mut R,
    ) -> RetryDecision {
        self.attempts += 1;
        if self.last_class == Some(class) {
            self.same_class_streak += 1;
        } else {
            self.last_class = Some(class);
            self.same_class_streak = 1;
        }

        if !class.is_retryable() {
            return RetryDecision::GiveUp {
                class,
                escalated: false,
            };
        }
        if self.attempts >= self.policy.max_attempts
            || self.same_class_streak >= self.policy.same_error_threshold
        {
            return RetryDecision::GiveUp {
                class,
                escalated: true,
            };
        }
        RetryDecision::RetryAfter(self.policy.delay_with(self.attempts, rng))
    }
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;

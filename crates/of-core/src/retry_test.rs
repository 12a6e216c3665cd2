use super::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        same_error_threshold: 5,
        base_delay_ms: 100,
        max_delay_ms: 1_000,
        jitter: 0.1,
    }
}

#[test]
fn test_nominal_delay_is_exponential_and_capped() {
    let policy = fast_policy();
    assert_eq!(policy.nominal_delay(1), Duration::from_millis(100));
    assert_eq!(policy.nominal_delay(2), Duration::from_millis(200));
    assert_eq!(policy.nominal_delay(3), Duration::from_millis(400));
    assert_eq!(policy.nominal_delay(5), Duration::from_millis(1_000));
    assert_eq!(policy.nominal_delay(40), Duration::from_millis(1_000));
}

#[test]
fn test_jittered_delay_within_bounds() {
    let policy = fast_policy();
    let mut rng = StdRng::seed_from_u64(7);
    for attempt in 1..=6 {
        let (lo, hi) = policy.delay_bounds(attempt);
        for _ in 0..200 {
            let d = policy.delay_with(attempt, &mut rng);
            assert!(d >= lo && d <= hi, "attempt {attempt}: {d:?} not in [{lo:?}, {hi:?}]");
        }
    }
}

#[test]
fn test_jitter_actually_varies() {
    let policy = fast_policy();
    let mut rng = StdRng::seed_from_u64(42);
    let delays: std::collections::HashSet<Duration> =
        (0..20).map(|_| policy.delay_with(3, &mut rng)).collect();
    assert!(delays.len() > 1);
}

#[test]
fn test_fatal_errors_never_retry() {
    let policy = fast_policy();
    let mut tracker = policy.tracker();
    assert_eq!(
        tracker.on_failure(ErrorClass::Configuration),
        RetryDecision::GiveUp {
            class: ErrorClass::Configuration,
            escalated: false
        }
    );
    assert_eq!(tracker.attempts(), 1);
}

#[test]
fn test_transient_errors_retry_until_max_attempts() {
    let policy = fast_policy();
    let mut tracker = policy.tracker();
    let mut rng = StdRng::seed_from_u64(1);
    for attempt in 1..5 {
        match tracker.on_failure_with(ErrorClass::RateLimited, &mut rng) {
            RetryDecision::RetryAfter(d) => {
                let (lo, hi) = policy.delay_bounds(attempt);
                assert!(d >= lo && d <= hi);
            }
            other => panic!("attempt {attempt} should retry, got {other:?}"),
        }
    }
    assert_eq!(
        tracker.on_failure_with(ErrorClass::RateLimited, &mut rng),
        RetryDecision::GiveUp {
            class: ErrorClass::RateLimited,
            escalated: true
        }
    );
}

#[test]
fn test_same_error_streak_escalates_before_max_attempts() {
    let policy = RetryPolicy {
        max_attempts: 10,
        same_error_threshold: 3,
        ..fast_policy()
    };
    let mut tracker = policy.tracker();
    assert!(matches!(
        tracker.on_failure(ErrorClass::Network),
        RetryDecision::RetryAfter(_)
    ));
    assert!(matches!(
        tracker.on_failure(ErrorClass::Timeout),
        RetryDecision::RetryAfter(_)
    ));
    // Streak resets when the kind changes.
    assert!(matches!(
        tracker.on_failure(ErrorClass::Network),
        RetryDecision::RetryAfter(_)
    ));
    assert!(matches!(
        tracker.on_failure(ErrorClass::Network),
        RetryDecision::RetryAfter(_)
    ));
    assert!(matches!(
        tracker.on_failure(ErrorClass::Network),
        RetryDecision::GiveUp { escalated: true, .. }
    ));
}

#[test]
fn test_classification_from_status_and_message() {
    assert_eq!(ErrorClass::from_http_status(429), Some(ErrorClass::RateLimited));
    assert_eq!(ErrorClass::from_http_status(503), Some(ErrorClass::ServerError));
    assert_eq!(ErrorClass::from_http_status(400), Some(ErrorClass::Validation));
    assert_eq!(ErrorClass::from_http_status(200), None);

    assert_eq!(
        ErrorClass::from_message("HTTP 429: Too Many Requests"),
        ErrorClass::RateLimited
    );
    assert_eq!(
        ErrorClass::from_message("connection reset by peer"),
        ErrorClass::Network
    );
    assert_eq!(
        ErrorClass::from_message("Out of Memory Error: failed to allocate"),
        ErrorClass::ResourceExhausted
    );
    assert_eq!(
        ErrorClass::from_message("Binder Error: column not found"),
        ErrorClass::Internal
    );
    assert!(ErrorClass::Timeout.is_retryable());
    assert!(!ErrorClass::Cancelled.is_retryable());
}

/*!
 * Optimistic-concurrency retry for stock transactions.
 *
 * Each attempt opens, runs and commits its own transaction. When an attempt
 * loses a version race (or collides with a concurrent insert of the same
 * balance slot) its transaction is dropped, which rolls it back, and the
 * whole unit of work is re-run from a fresh read after a short, jittered
 * exponential backoff.
 */

use crate::errors::ServiceError;
use crate::metrics;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const BASE_DELAY: Duration = Duration::from_millis(2);
const MAX_DELAY: Duration = Duration::from_millis(100);

/// Exponential delay before the next attempt, with jitter so writers that
/// collided once do not collide again in lockstep.
fn backoff_delay(retries: u32) -> Duration {
    let ceiling = BASE_DELAY
        .saturating_mul(1 << retries.min(6))
        .min(MAX_DELAY);
    let millis = ceiling.as_millis() as u64;
    Duration::from_millis(rand::thread_rng().gen_range(millis / 2..=millis))
}

/// Runs `attempt` until it succeeds, fails with a non-conflict error, or
/// has been retried `retry_limit` times.
pub async fn retry_on_conflict<T, F, Fut>(
    operation: &'static str,
    retry_limit: u32,
    mut attempt: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Err(err) if err.is_conflict() && retries < retry_limit => {
                retries += 1;
                metrics::record_conflict_retry(operation);
                let delay = backoff_delay(retries);
                debug!(operation, retries, ?delay, "Retrying after concurrent modification");
                sleep(delay).await;
            }
            Err(err) => {
                if err.is_conflict() {
                    warn!(operation, retries, "Giving up after concurrent modifications");
                }
                metrics::record_failure(operation);
                return Err(err);
            }
            Ok(value) => return Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    #[tokio::test]
    async fn retries_conflicts_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = retry_on_conflict("test_op", 3, move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ServiceError::ConcurrentModification(Uuid::nil()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn surfaces_conflict_after_limit() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = retry_on_conflict("test_op", 2, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::ConcurrentModification(Uuid::nil()))
        })
        .await;

        assert!(matches!(result, Err(ServiceError::ConcurrentModification(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        for retries in 1..20 {
            let delay = backoff_delay(retries);
            assert!(delay >= Duration::from_millis(2));
            assert!(delay <= MAX_DELAY);
        }
        assert!(backoff_delay(10) >= MAX_DELAY / 2);
    }

    #[tokio::test]
    async fn never_retries_domain_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = retry_on_conflict("test_op", 5, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::InsufficientStock("x".into()))
        })
        .await;

        assert!(matches!(result, Err(ServiceError::InsufficientStock(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}

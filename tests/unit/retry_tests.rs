use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use dav_bridge_rs::{RetryConfig, with_retries};

fn fast_config(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        jitter: false,
    }
}

#[tokio::test]
async fn succeeds_on_first_attempt_without_sleeping() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_in = calls.clone();

    let result = with_retries(&fast_config(3), "op", move || {
        let calls = calls_in.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(42)
        }
    })
    .await
    .unwrap();

    assert_eq!(result, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retries_until_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_in = calls.clone();

    let result = with_retries(&fast_config(5), "op", move || {
        let calls = calls_in.clone();
        async move {
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt < 3 {
                Err(anyhow::anyhow!("transient failure {attempt}"))
            } else {
                Ok("done")
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(result, "done");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhaustion_surfaces_the_last_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_in = calls.clone();

    let err = with_retries(&fast_config(3), "op", move || {
        let calls = calls_in.clone();
        async move {
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err::<(), _>(anyhow::anyhow!("failure {attempt}"))
        }
    })
    .await
    .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(err.to_string().contains("failure 3"));
}

#[tokio::test]
async fn zero_attempts_still_runs_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_in = calls.clone();

    let _ = with_retries(&fast_config(0), "op", move || {
        let calls = calls_in.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(())
        }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn delay_schedule_doubles_then_caps() {
    let config = RetryConfig {
        max_attempts: 10,
        base_delay: Duration::from_millis(1000),
        max_delay: Duration::from_millis(10_000),
        jitter: false,
    };
    let delays: Vec<u64> = (1..=5)
        .map(|k| config.delay_for_attempt(k).as_millis() as u64)
        .collect();
    assert_eq!(delays, vec![1000, 2000, 4000, 8000, 10_000]);
}

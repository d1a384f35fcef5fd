use clinisync_source::{RateLimiter, SourceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[test]
fn rejects_zero_permits_and_interval() {
    assert!(matches!(
        RateLimiter::new(0, Duration::from_secs(1)),
        Err(SourceError::Config(_))
    ));
    assert!(matches!(
        RateLimiter::new(5, Duration::ZERO),
        Err(SourceError::Config(_))
    ));
}

#[test]
fn tick_rounds_up() {
    let limiter = RateLimiter::new(3, Duration::from_secs(1)).unwrap();
    assert_eq!(limiter.tick(), Duration::from_nanos(333_333_334));

    let limiter = RateLimiter::new(100, Duration::from_secs(60)).unwrap();
    assert_eq!(limiter.tick(), Duration::from_millis(600));
}

#[tokio::test(start_paused = true)]
async fn bounds_concurrency_and_start_rate() {
    let limiter = RateLimiter::new(5, Duration::from_secs(1)).unwrap();
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let origin = Instant::now();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let limiter = limiter.clone();
            let running = running.clone();
            let peak = peak.clone();
            tokio::spawn(async move {
                limiter
                    .run(async {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        let started = origin.elapsed();
                        sleep(Duration::from_millis(100)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        started
                    })
                    .await
            })
        })
        .collect();

    let mut starts = Vec::new();
    for handle in handles {
        starts.push(handle.await.unwrap());
    }
    starts.sort();

    assert!(peak.load(Ordering::SeqCst) <= 5);
    assert_eq!(starts.iter().filter(|s| s.is_zero()).count(), 5);
    assert!(starts[19] >= Duration::from_millis(2900), "20th task started at {:?}", starts[19]);
    assert!(starts[19] < Duration::from_millis(3500));
}

#[tokio::test(start_paused = true)]
async fn ticker_stops_when_idle_and_restarts() {
    let limiter = RateLimiter::new(2, Duration::from_millis(100)).unwrap();
    assert!(!limiter.is_ticking());

    limiter.run(async {}).await;
    assert!(limiter.is_ticking());
    assert_eq!(limiter.available_permits(), 1);

    sleep(Duration::from_millis(60)).await;
    assert_eq!(limiter.available_permits(), 2);

    sleep(Duration::from_millis(500)).await;
    assert!(!limiter.is_ticking());
    assert_eq!(limiter.available_permits(), 2);

    limiter.run(async {}).await;
    assert!(limiter.is_ticking());
}

#[tokio::test(start_paused = true)]
async fn failed_tasks_still_consume_permits() {
    let limiter = RateLimiter::new(2, Duration::from_secs(1)).unwrap();

    let result: Result<(), &str> = limiter.run(async { Err("boom") }).await;
    assert_eq!(result, Err("boom"));
    assert_eq!(limiter.available_permits(), 1);

    sleep(Duration::from_millis(600)).await;
    assert_eq!(limiter.available_permits(), 2);
}

#[tokio::test(start_paused = true)]
async fn never_exceeds_limit() {
    let limiter = RateLimiter::new(3, Duration::from_millis(300)).unwrap();
    limiter.run(async {}).await;

    sleep(Duration::from_secs(2)).await;
    assert_eq!(limiter.available_permits(), 3);
}

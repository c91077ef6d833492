//! Load testing for the gateway.

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::StatusCode;
use tower::ServiceExt;

mod common;
use common::{post_logs, test_config, Harness, RecordingTransport, TWO_FRAMES, TWO_FRAMES_FIXED};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_posts() {
    let mut config = test_config();
    config.outlet.capacity = 16;
    config.outlet.deliver_timeout_ms = 5000;
    let h = Harness::new(config, RecordingTransport::with_delay(Duration::from_millis(1)));

    let concurrency = 10;
    let requests_per_task = 20;
    let total_requests = concurrency * requests_per_task;

    let start = Instant::now();
    let mut tasks = Vec::new();
    for task in 0..concurrency {
        let router = h.router.clone();
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for i in 0..requests_per_task {
                let req_start = Instant::now();
                let request = post_logs("/logs")
                    .header("x-request-id", format!("load-{task}-{i}"))
                    .body(Body::from(TWO_FRAMES))
                    .unwrap();
                let response = router.clone().oneshot(request).await.unwrap();
                if response.status() == StatusCode::OK {
                    latencies.push(req_start.elapsed());
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }
    let duration = start.elapsed();

    assert_eq!(all_latencies.len(), total_requests, "every post succeeds");

    let bodies = h.transport.bodies();
    assert_eq!(bodies.len(), total_requests);
    assert!(bodies.iter().all(|b| b == TWO_FRAMES_FIXED.as_bytes()));

    let m = h.server.metrics().snapshot();
    assert_eq!(m.successes, total_requests as u64);
    assert_eq!(m.frames, 2 * total_requests as u64);
    assert_eq!(h.inflight.count(), 0);

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", total_requests as f64 / duration.as_secs_f64());
    println!("P50 Latency:    {:?}", p50);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");
}

//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus exporter
//! - Count ingress outcomes, authentication results and deadline misses
//! - Record fixer, forwarder and outlet activity
//!
//! # Metrics
//! - `logplex_gateway_posts_total` (counter): POST /logs attempts
//! - `logplex_gateway_post_successes_total` (counter)
//! - `logplex_gateway_post_errors_total` (counter): by status
//! - `logplex_gateway_auth_successes_total` (counter): by stage
//! - `logplex_gateway_auth_errors_total` (counter): by reason
//! - `logplex_gateway_outlet_timeouts_total` / `..._ack_timeouts_total` (counter)
//! - `logplex_gateway_post_duration_seconds` (histogram)
//! - `logplex_gateway_health_duration_seconds` (histogram)
//! - `logplex_gateway_outlet_send_duration_seconds` (histogram)
//! - `logplex_gateway_ack_wait_seconds` (histogram)
//! - `logplex_gateway_fixer_frames_total` (counter)
//! - `logplex_gateway_fixer_metadata_requests_total` (counter)
//! - `logplex_gateway_fixer_truncations_total` (counter): by field
//! - `logplex_gateway_forwarder_deliveries_total` (counter): by outcome
//! - `logplex_gateway_forwarder_send_duration_seconds` (histogram)
//! - `logplex_gateway_outlet_depth` (gauge)
//!
//! # Design Decisions
//! - Ingress counters are atomics mirrored to the facade so tests can read
//!   them back without an exporter installed
//! - Without an installed recorder the facade calls are no-ops

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::security::credentials::{AuthError, Credential};
use crate::syslog::FixResult;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Point-in-time copy of [`IngressMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngressSnapshot {
    pub posts: u64,
    pub successes: u64,
    pub errors: u64,
    pub auth_successes: u64,
    pub auth_errors: u64,
    pub outlet_timeouts: u64,
    pub ack_timeouts: u64,
    pub frames: u64,
}

/// Counters for the ingress path, shared by every request task.
#[derive(Debug, Default)]
pub struct IngressMetrics {
    posts: AtomicU64,
    successes: AtomicU64,
    errors: AtomicU64,
    auth_successes: AtomicU64,
    auth_errors: AtomicU64,
    outlet_timeouts: AtomicU64,
    ack_timeouts: AtomicU64,
    frames: AtomicU64,
}

impl IngressMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_post(&self) {
        self.posts.fetch_add(1, Ordering::Relaxed);
        counter!("logplex_gateway_posts_total").increment(1);
    }

    pub fn record_success(&self, started: Instant) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        counter!("logplex_gateway_post_successes_total").increment(1);
        record_post_duration(started);
    }

    pub fn record_error(&self, status: u16, started: Instant) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        counter!("logplex_gateway_post_errors_total", "status" => status.to_string()).increment(1);
        record_post_duration(started);
    }

    pub fn record_auth_success(&self, credential: &Credential) {
        self.auth_successes.fetch_add(1, Ordering::Relaxed);
        counter!(
            "logplex_gateway_auth_successes_total",
            "stage" => credential.stage.clone()
        )
        .increment(1);
    }

    pub fn record_auth_error(&self, error: AuthError) {
        self.auth_errors.fetch_add(1, Ordering::Relaxed);
        counter!("logplex_gateway_auth_errors_total", "reason" => error.reason()).increment(1);
    }

    pub fn record_outlet_send(&self, started: Instant, timed_out: bool) {
        if timed_out {
            self.outlet_timeouts.fetch_add(1, Ordering::Relaxed);
            counter!("logplex_gateway_outlet_timeouts_total").increment(1);
        }
        histogram!("logplex_gateway_outlet_send_duration_seconds")
            .record(started.elapsed().as_secs_f64());
    }

    pub fn record_ack_wait(&self, started: Instant, timed_out: bool) {
        if timed_out {
            self.ack_timeouts.fetch_add(1, Ordering::Relaxed);
            counter!("logplex_gateway_ack_timeouts_total").increment(1);
        }
        histogram!("logplex_gateway_ack_wait_seconds").record(started.elapsed().as_secs_f64());
    }

    /// Per-request fixer counts, recorded for successful transforms only.
    pub fn record_fix(&self, result: &FixResult) {
        self.frames.fetch_add(result.frames, Ordering::Relaxed);
        counter!("logplex_gateway_fixer_frames_total").increment(result.frames);
        if result.has_metadata {
            counter!("logplex_gateway_fixer_metadata_requests_total").increment(1);
        }

        let t = &result.truncations;
        for (field, count) in [
            ("hostname", t.hostname),
            ("appname", t.app_name),
            ("procid", t.proc_id),
            ("msgid", t.msg_id),
        ] {
            if count > 0 {
                counter!("logplex_gateway_fixer_truncations_total", "field" => field)
                    .increment(count);
            }
        }
    }

    pub fn snapshot(&self) -> IngressSnapshot {
        IngressSnapshot {
            posts: self.posts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            auth_successes: self.auth_successes.load(Ordering::Relaxed),
            auth_errors: self.auth_errors.load(Ordering::Relaxed),
            outlet_timeouts: self.outlet_timeouts.load(Ordering::Relaxed),
            ack_timeouts: self.ack_timeouts.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
        }
    }
}

fn record_post_duration(started: Instant) {
    histogram!("logplex_gateway_post_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_health(started: Instant) {
    histogram!("logplex_gateway_health_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_delivery(delivered: bool, started: Instant) {
    let outcome = if delivered { "delivered" } else { "failed" };
    counter!("logplex_gateway_forwarder_deliveries_total", "outcome" => outcome).increment(1);
    histogram!("logplex_gateway_forwarder_send_duration_seconds")
        .record(started.elapsed().as_secs_f64());
}

pub fn record_outlet_depth(depth: usize) {
    gauge!("logplex_gateway_outlet_depth").set(depth as f64);
}

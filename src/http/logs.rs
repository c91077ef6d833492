//! `POST /logs`: admission, rewrite and hand-off.
//!
//! # Responsibilities
//! - Run the admission checks in order; the first failure wins
//! - Stream the (optionally gzipped) body through the fixer; every gzip
//!   member of a concatenated body is decoded
//! - Hand the rewritten batch to the outlet and wait for its completion
//!
//! # Design Decisions
//! - The fixer runs on the blocking pool over a sync bridge of the body
//!   stream, so the body is never buffered whole before rewriting
//! - Enqueue and acknowledgment share one deadline
//! - Parse errors discard partial output (fail closed)

use std::io::{self, BufReader};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use flate2::read::MultiGzDecoder;
use futures_util::TryStreamExt;
use tokio_util::io::{StreamReader, SyncIoBridge};
use url::form_urlencoded;

use crate::config::schema::MetadataConfig;
use crate::delivery::{OutletError, Payload};
use crate::http::error::IngressError;
use crate::http::server::AppState;
use crate::security::credentials::Credential;
use crate::security::headers;
use crate::syslog::{fix, FixParams, FixResult};

pub const CONTENT_TYPE_LOGPLEX: &str = "application/logplex-1";
pub const CONTENT_TYPE_MSGPACK: &str = "application/msgpack";

/// Per-request identifiers carried into every log line.
struct RequestContext {
    remote_addr: String,
    request_id: String,
    drain_token: String,
}

pub async fn handle_logs(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    state.metrics.record_post();

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ctx = RequestContext {
        remote_addr: headers::remote_addr(request.headers(), peer),
        request_id: headers::request_id(request.headers()).to_string(),
        drain_token: headers::drain_token(request.headers()).to_string(),
    };

    match process(&state, request, &ctx).await {
        Ok(frames) => {
            state.metrics.record_success(started);
            tracing::debug!(
                remote_addr = %ctx.remote_addr,
                request_id = %ctx.request_id,
                logdrain_token = %ctx.drain_token,
                frames,
                "Logs accepted"
            );
            StatusCode::OK.into_response()
        }
        Err(e) => {
            let status = e.status();
            state.metrics.record_error(status.as_u16(), started);
            if status.is_server_error() {
                tracing::error!(
                    remote_addr = %ctx.remote_addr,
                    request_id = %ctx.request_id,
                    logdrain_token = %ctx.drain_token,
                    status = status.as_u16(),
                    error = %e,
                    "Logs rejected"
                );
            } else {
                tracing::warn!(
                    remote_addr = %ctx.remote_addr,
                    request_id = %ctx.request_id,
                    logdrain_token = %ctx.drain_token,
                    status = status.as_u16(),
                    error = %e,
                    "Logs rejected"
                );
            }
            e.into_response()
        }
    }
}

async fn process(
    state: &AppState,
    request: Request<Body>,
    ctx: &RequestContext,
) -> Result<u64, IngressError> {
    let credential = admit(state, request.method(), request.headers())?;
    let _flight = state
        .inflight
        .admit(&state.shutdown)
        .ok_or(IngressError::ShuttingDown)?;

    let (parts, body) = request.into_parts();
    let gzip = parts
        .headers
        .get(header::CONTENT_ENCODING)
        .is_some_and(|v| v.as_bytes().eq_ignore_ascii_case(b"gzip"));
    let query: Vec<(String, String)> = parts
        .uri
        .query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let job = FixJob {
        metadata: Arc::clone(&state.metadata),
        query,
        credential,
        remote_addr: ctx.remote_addr.clone(),
        drain_token: ctx.drain_token.clone(),
    };
    let result = fix_body(job, body, gzip).await?;
    state.metrics.record_fix(&result);

    let FixResult { frames, bytes, .. } = result;
    deliver(state, ctx, bytes).await?;
    Ok(frames)
}

/// Admission checks in order. Returns the authenticated credential.
fn admit(state: &AppState, method: &Method, headers: &HeaderMap) -> Result<Credential, IngressError> {
    if state.enforce_ssl && !headers::forwarded_proto_is_https(headers) {
        return Err(IngressError::InsecureTransport);
    }

    if state.shutdown.is_shutting_down() {
        return Err(IngressError::ShuttingDown);
    }

    if method != Method::POST {
        return Err(IngressError::MethodNotAllowed);
    }

    match media_type(headers) {
        Some(ct) if ct.eq_ignore_ascii_case(CONTENT_TYPE_LOGPLEX) => {}
        Some(ct) if ct.eq_ignore_ascii_case(CONTENT_TYPE_MSGPACK) => {
            return Err(IngressError::NotImplemented)
        }
        _ => return Err(IngressError::UnsupportedContentType),
    }

    let authorization = headers.get(header::AUTHORIZATION).map(|v| v.as_bytes());
    match state.credentials.authenticate(authorization) {
        Ok(credential) => {
            state.metrics.record_auth_success(credential);
            Ok(credential.clone())
        }
        Err(e) => {
            state.metrics.record_auth_error(e);
            Err(IngressError::Unauthorized(e))
        }
    }
}

/// Content-Type without parameters.
fn media_type(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    value.split(';').next().map(str::trim)
}

/// Owned fixer inputs, moved onto the blocking pool.
struct FixJob {
    metadata: Arc<MetadataConfig>,
    query: Vec<(String, String)>,
    credential: Credential,
    remote_addr: String,
    drain_token: String,
}

impl FixJob {
    fn params(&self) -> FixParams<'_> {
        FixParams {
            metadata: &self.metadata,
            query: &self.query,
            credential: Some(&self.credential),
            remote_addr: &self.remote_addr,
            drain_token: &self.drain_token,
        }
    }
}

async fn fix_body(job: FixJob, body: Body, gzip: bool) -> Result<FixResult, IngressError> {
    let stream = body.into_data_stream().map_err(io::Error::other);
    let reader = SyncIoBridge::new(StreamReader::new(stream));

    let fixed = tokio::task::spawn_blocking(move || {
        let params = job.params();
        if gzip {
            fix(&params, BufReader::new(MultiGzDecoder::new(reader)))
        } else {
            fix(&params, BufReader::new(reader))
        }
    })
    .await
    .map_err(|e| IngressError::Internal(e.to_string()))?;

    fixed.map_err(|e| {
        tracing::debug!(frames = e.partial.frames, "Discarding partial output");
        IngressError::from(e.source)
    })
}

async fn deliver(state: &AppState, ctx: &RequestContext, body: Vec<u8>) -> Result<(), IngressError> {
    let deadline = tokio::time::Instant::now() + state.deliver_timeout;
    let (payload, ack) = Payload::new(ctx.remote_addr.clone(), ctx.request_id.clone(), body);

    let send_started = Instant::now();
    let sent = state.outlet.send_until(payload, deadline).await;
    state
        .metrics
        .record_outlet_send(send_started, sent == Err(OutletError::Timeout));
    sent?;

    let wait_started = Instant::now();
    match tokio::time::timeout_at(deadline, ack.wait()).await {
        Ok(Ok(())) => {
            state.metrics.record_ack_wait(wait_started, false);
            Ok(())
        }
        Ok(Err(e)) => {
            state.metrics.record_ack_wait(wait_started, false);
            Err(IngressError::Internal(e.to_string()))
        }
        Err(_) => {
            state.metrics.record_ack_wait(wait_started, true);
            Err(IngressError::AckTimeout)
        }
    }
}

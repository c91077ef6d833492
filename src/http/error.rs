//! Ingress error taxonomy and its HTTP mapping.

use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tower_http::timeout::TimeoutError;

use crate::delivery::OutletError;
use crate::security::credentials::AuthError;
use crate::syslog::FrameError;

/// Everything that can end a `POST /logs` without a 200.
#[derive(Debug, Error)]
pub enum IngressError {
    #[error("Only SSL requests accepted")]
    InsecureTransport,

    #[error("Shutting down")]
    ShuttingDown,

    #[error("Only POST is accepted")]
    MethodNotAllowed,

    #[error("Only Content-Type application/logplex-1 is accepted")]
    UnsupportedContentType,

    #[error("Not Supported")]
    NotImplemented,

    #[error("Unable to authenticate request: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("Problem fixing body: {0}")]
    MalformedBody(FrameError),

    #[error("Could not decode request body: {0}")]
    BodyDecode(#[source] io::Error),

    #[error("Request body stalled")]
    BodyTimeout,

    #[error("Timeout delivering message")]
    OutletTimeout,

    #[error("Timeout waiting for delivery")]
    AckTimeout,

    #[error("Outlet closed")]
    OutletClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngressError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngressError::InsecureTransport
            | IngressError::MethodNotAllowed
            | IngressError::UnsupportedContentType
            | IngressError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            IngressError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            IngressError::BodyTimeout => StatusCode::REQUEST_TIMEOUT,
            IngressError::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            IngressError::ShuttingDown | IngressError::OutletClosed => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            IngressError::OutletTimeout | IngressError::AckTimeout => StatusCode::GATEWAY_TIMEOUT,
            IngressError::BodyDecode(_) | IngressError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<FrameError> for IngressError {
    /// Reader failures are decoding problems; everything else is bad input.
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Io(io) if is_body_timeout(&io) => IngressError::BodyTimeout,
            FrameError::Io(io) => IngressError::BodyDecode(io),
            other => IngressError::MalformedBody(other),
        }
    }
}

/// True when the body read failed because the idle timeout layer fired.
fn is_body_timeout(e: &io::Error) -> bool {
    let mut current = e
        .get_ref()
        .map(|inner| inner as &(dyn std::error::Error + 'static));
    while let Some(err) = current {
        if err.is::<TimeoutError>() {
            return true;
        }
        current = err.source();
    }
    false
}

impl From<OutletError> for IngressError {
    fn from(e: OutletError) -> Self {
        match e {
            OutletError::Timeout => IngressError::OutletTimeout,
            OutletError::Closed => IngressError::OutletClosed,
        }
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(IngressError::InsecureTransport.status(), 400);
        assert_eq!(IngressError::ShuttingDown.status(), 503);
        assert_eq!(IngressError::MethodNotAllowed.status(), 400);
        assert_eq!(IngressError::UnsupportedContentType.status(), 400);
        assert_eq!(IngressError::NotImplemented.status(), 501);
        assert_eq!(IngressError::from(AuthError::UnknownUser).status(), 401);
        assert_eq!(IngressError::OutletTimeout.status(), 504);
        assert_eq!(IngressError::AckTimeout.status(), 504);
        assert_eq!(IngressError::OutletClosed.status(), 503);
        assert_eq!(IngressError::BodyTimeout.status(), 408);
    }

    #[test]
    fn frame_errors_split_on_io() {
        let parse = IngressError::from(FrameError::BadLength { frame: 0 });
        assert_eq!(parse.status(), 400);
        assert!(parse.to_string().starts_with("Problem fixing body"));

        let io = IngressError::from(FrameError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            "corrupt deflate stream",
        )));
        assert_eq!(io.status(), 500);
    }
}

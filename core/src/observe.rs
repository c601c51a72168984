#![deny(missing_docs)]

//! # Observability Hook
//!
//! `OapiTester` reports its progress through an injected [`Observer`] instead of
//! logging directly. [`TracingObserver`] forwards checkpoints to `tracing`.

use actix_web::http::Method;
use tracing::{debug, warn};

/// A step reached while validating one request.
#[derive(Debug, Clone, Copy)]
pub enum Checkpoint<'a> {
    /// The URL used for route resolution was computed.
    RouteUrl {
        /// Request method.
        method: &'a Method,
        /// Base URL joined with the request path.
        url: &'a str,
    },
    /// The request matched a declared operation.
    RouteResolved {
        /// Request method.
        method: &'a Method,
        /// Matched path template.
        path_template: &'a str,
        /// `operationId` of the matched operation.
        operation_id: Option<&'a str>,
    },
    /// The handler produced a response.
    HandlerResponded {
        /// Response status.
        status: u16,
        /// Collected body length in bytes.
        body_len: usize,
    },
    /// The call finished; `error` holds the rendered failure, if any.
    Validated {
        /// Request method.
        method: &'a Method,
        /// Request path as supplied by the caller.
        path: &'a str,
        /// Rendered error when the call failed.
        error: Option<&'a str>,
    },
}

/// Receives checkpoints emitted by `OapiTester`.
pub trait Observer {
    /// Called once per checkpoint, in pipeline order.
    fn observe(&self, checkpoint: &Checkpoint<'_>);
}

impl<F> Observer for F
where
    F: Fn(&Checkpoint<'_>),
{
    fn observe(&self, checkpoint: &Checkpoint<'_>) {
        self(checkpoint)
    }
}

/// Emits checkpoints as `tracing` events; failures are logged at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn observe(&self, checkpoint: &Checkpoint<'_>) {
        match *checkpoint {
            Checkpoint::RouteUrl { method, url } => {
                debug!(%method, url, "resolving route");
            }
            Checkpoint::RouteResolved {
                method,
                path_template,
                operation_id,
            } => {
                debug!(%method, path_template, operation_id, "route resolved");
            }
            Checkpoint::HandlerResponded { status, body_len } => {
                debug!(status, body_len, "handler responded");
            }
            Checkpoint::Validated {
                method,
                path,
                error: None,
            } => {
                debug!(%method, path, "response conforms");
            }
            Checkpoint::Validated {
                method,
                path,
                error: Some(error),
            } => {
                warn!(%method, path, error, "validation failed");
            }
        }
    }
}

/// Discards every checkpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn observe(&self, _checkpoint: &Checkpoint<'_>) {}
}

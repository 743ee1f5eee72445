//! The seam between the request pipeline and the network.
//!
//! The pipeline never performs I/O itself. It hands a fully validated
//! `HttpRequest` to a `Transport` and interprets whatever comes back.
//! A transport reports non-2xx responses as `Err(TransportError)` with the
//! response attached (see `HttpResponse::error_for_status`); network-level
//! failures carry no response.

use async_trait::async_trait;
use thiserror::Error;

use crate::http::{HttpRequest, HttpResponse};

/// Executes HTTP requests on behalf of the pipeline.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// A failed transport call.
///
/// Opaque to the pipeline except for `config` and `response`: when both are
/// present the status code decides whether a registered handler takes over.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    /// Transport-specific error code, e.g. `ECONNREFUSED`.
    pub code: Option<String>,
    /// The request that was being executed.
    pub config: Option<HttpRequest>,
    /// The response, when the server answered with a non-2xx status.
    pub response: Option<HttpResponse>,
}

impl TransportError {
    /// The server answered, but not with a 2xx status.
    pub fn status(config: HttpRequest, response: HttpResponse) -> Self {
        Self {
            message: format!("request failed with status code {}", response.status),
            code: None,
            config: Some(config),
            response: Some(response),
        }
    }

    /// The request never produced a response.
    pub fn network(config: HttpRequest, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            config: Some(config),
            response: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Status code of the attached response.
    pub fn status_code(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }
}

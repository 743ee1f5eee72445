//! Error types for assertions, request construction and dispatch.
//!
//! # Design
//! `AssertError` is what every validator produces; its `Display` output is
//! the human-readable message callers see, so alternation and casting keep
//! the original branch messages intact. `ApiError` is the single error type
//! returned by `Request::send`: validation failures, construction mistakes,
//! transport failures that no handler claimed, and response validation
//! failures (with the response envelope attached) each get a variant.

use std::fmt;

use thiserror::Error;

use crate::assert::{Kind, Mixed};
use crate::http::HttpResponse;
use crate::transport::TransportError;

/// Failure raised by a validator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssertError {
    /// The value had the wrong kind or failed a check.
    #[error("Expected {name} to be {expected}; received {received}")]
    Mismatch {
        name: String,
        expected: String,
        received: String,
    },

    /// Every branch of an alternation failed.
    #[error("{}", JoinedAlternatives(.0))]
    Alternatives(Vec<AssertError>),

    /// The value was castable but the cast result still failed the target
    /// validator.
    #[error(transparent)]
    CastExhausted(Box<AssertError>),

    /// Raised by user validators and typed decoding.
    #[error("{name}: {message}")]
    Custom { name: String, message: String },
}

impl AssertError {
    pub fn mismatch(name: &str, expected: impl Into<String>, mixed: Mixed<'_>) -> Self {
        AssertError::Mismatch {
            name: name.to_string(),
            expected: expected.into(),
            received: describe(mixed),
        }
    }

    pub fn custom(name: &str, message: impl Into<String>) -> Self {
        AssertError::Custom {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Name of the field the failure refers to. For alternations this is
    /// the name reported by the first branch.
    pub fn name(&self) -> &str {
        match self {
            AssertError::Mismatch { name, .. } | AssertError::Custom { name, .. } => name,
            AssertError::Alternatives(errors) => errors.first().map_or("", |e| e.name()),
            AssertError::CastExhausted(inner) => inner.name(),
        }
    }
}

struct JoinedAlternatives<'a>(&'a [AssertError]);

impl fmt::Display for JoinedAlternatives<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" or ")?;
            }
            write!(f, "({error})")?;
        }
        Ok(())
    }
}

/// Render the runtime kind and value, e.g. `number(3)` or `undefined`.
pub(crate) fn describe(mixed: Mixed<'_>) -> String {
    let kind = Kind::of(mixed);
    match mixed {
        None | Some(serde_json::Value::Null) => kind.to_string(),
        Some(serde_json::Value::String(s)) => format!("{kind}({s})"),
        Some(serde_json::Value::Array(_)) | Some(serde_json::Value::Object(_)) => kind.to_string(),
        Some(other) => format!("{kind}({other})"),
    }
}

/// Mistakes made while building a `Request`. Always reported before any
/// hook or transport call.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The route declares no validator for this field.
    #[error("route {route} does not accept a {field}")]
    Undeclared { route: String, field: &'static str },

    /// The field was already assigned on this request.
    #[error("{field} has already been set")]
    AlreadySet { field: &'static str },

    /// The route declares this field but no value was assigned.
    #[error("{field} is required by route {route} but was not set")]
    Missing { route: String, field: &'static str },

    /// The supplied value could not be converted to JSON.
    #[error("{field} could not be serialized: {source}")]
    Serialize {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// An access token was requested but the client has no provider.
    #[error("access token {kind} requested but no provider is configured")]
    NoTokenProvider { kind: String },
}

/// Errors returned by `Request::send`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Build(#[from] BuildError),

    /// A request field failed validation. No network call was made.
    #[error(transparent)]
    Assert(#[from] AssertError),

    /// The transport failed and no handler claimed the failure. This is the
    /// transport's error, unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The call succeeded but its response failed validation.
    #[error("{source}")]
    Response {
        #[source]
        source: AssertError,
        response: HttpResponse,
    },

    /// Raised by a hook, a status handler or an access-token provider.
    #[error("{0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A handler's result could not be converted to JSON.
    #[error("handler payload could not be serialized: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl ApiError {
    pub fn handler(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ApiError::Handler(error.into())
    }

    /// The response envelope this error carries, if any.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            ApiError::Response { response, .. } => Some(response),
            ApiError::Transport(error) => error.response.as_ref(),
            _ => None,
        }
    }
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid base url {0:?}")]
    InvalidBaseUrl(String),
}

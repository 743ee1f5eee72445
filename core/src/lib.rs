//! Runtime assertions for untyped JSON and a request pipeline built on them.
//!
//! # Overview
//! The `assert` module holds small validators that check or cast a raw
//! value and combinators that compose them. A `Route` attaches validators to
//! the fields of an endpoint; `ApiClient::request` starts a `Request`
//! against it, and `Request::send` validates every field, hands the
//! resulting `HttpRequest` to a `Transport` and resolves the reply into an
//! `Outcome` chosen by status code.
//!
//! # Design
//! - The core never performs I/O. Transports and token lookup are supplied
//!   by the caller through async traits, which keeps the pipeline
//!   deterministic under test.
//! - Validators borrow their input and return a `Cow`, so "unchanged" and
//!   "new value" are distinguishable without comparing contents.
//! - Failed calls a request registered a handler for become typed outcomes;
//!   every other failure is returned as the transport produced it.
//!
//! ```rust,ignore
//! use api_assert::assert::*;
//! use api_assert::{ApiClient, ClientConfig, Outcome, Route};
//!
//! let route = Route::get("/items/{id}")
//!     .with_param(field("id", string_to_natural_number()))
//!     .with_response(field("name", string()));
//!
//! let outcome = client
//!     .request(route)
//!     .set_param(&json!({"id": "7"}))?
//!     .set_on_not_found(|_| async { Ok::<_, ApiError>(None::<String>) })
//!     .send()
//!     .await?;
//! ```

pub mod assert;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
mod macros;
pub mod outcome;
pub mod request;
pub mod route;
pub mod transport;

pub use assert::{Assert, AssertExt, DynAssert, Kind, Mixed, Refined};
pub use client::{AccessTokenProvider, ApiClient, ACCESS_TOKEN_HEADER};
pub use config::ClientConfig;
pub use error::{ApiError, AssertError, BuildError, ConfigError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use outcome::{Envelope, Outcome, Status};
pub use request::{Headers, Request};
pub use route::{Field, PathTemplate, Route};
pub use transport::{Transport, TransportError};

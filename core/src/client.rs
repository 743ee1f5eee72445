//! The entry point for building requests.
//!
//! # Design
//! `ApiClient` is a cheap handle: configuration, transport and the optional
//! access-token provider live behind one `Arc` and are never mutated after
//! construction. Every `Request` keeps a clone of the handle, so requests can
//! be built, cloned and sent from any task.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::error::{ApiError, BuildError};
use crate::request::Request;
use crate::route::Route;
use crate::transport::Transport;

/// Header that carries the token selected with `Request::set_access_token`.
pub const ACCESS_TOKEN_HEADER: &str = "Access-Token";

/// Looks up access tokens by kind (e.g. `"user"` or `"service"`).
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self, kind: &str) -> Result<String, ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    tokens: Option<Arc<dyn AccessTokenProvider>>,
}

impl ApiClient {
    pub fn new<T: Transport + 'static>(config: ClientConfig, transport: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport: Arc::new(transport),
                tokens: None,
            }),
        }
    }

    /// A client that resolves access tokens through `provider`.
    #[must_use]
    pub fn with_access_tokens<P: AccessTokenProvider + 'static>(&self, provider: P) -> Self {
        Self {
            inner: Arc::new(Inner {
                config: self.inner.config.clone(),
                transport: Arc::clone(&self.inner.transport),
                tokens: Some(Arc::new(provider)),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Start a request against `route`.
    pub fn request(&self, route: impl Into<Arc<Route>>) -> Request {
        Request::new(self.clone(), route.into())
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    pub(crate) async fn access_token(&self, kind: &str) -> Result<String, ApiError> {
        match &self.inner.tokens {
            Some(tokens) => tokens.access_token(kind).await,
            None => Err(BuildError::NoTokenProvider {
                kind: kind.to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.config.base_url())
            .field("access_tokens", &self.inner.tokens.is_some())
            .finish()
    }
}

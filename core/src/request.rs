//! Building and sending a request.
//!
//! # Design
//! A `Request` is an immutable value: every setter returns a new request and
//! leaves the receiver untouched, so partially built requests can be cloned
//! and reused as templates. Whether a field may be set is decided by the
//! route: an undeclared field or a second assignment is a `BuildError`
//! returned immediately, and `send` refuses to start until every declared
//! field has a value.
//!
//! `send` runs the pipeline in a fixed order. Every validation happens before
//! the first suspension point, and the suspension points (header injection,
//! token lookup, body transform, transport call, response transform, status
//! handler) are awaited one after the other:
//!
//! ```text
//! param -> path   query   body   header
//!            \      |      |      /
//!             inject headers + access token
//!                      |
//!                transform body
//!                      |
//!                  transport
//!                 /         \
//!       2xx: transform +     failure with response:
//!       validate response    status handler, else re-raise
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::assert::Assert;
use crate::client::{ApiClient, ACCESS_TOKEN_HEADER};
use crate::error::{ApiError, AssertError, BuildError};
use crate::http::{scalar_text, HttpRequest, HttpResponse};
use crate::outcome::{Envelope, Outcome, Status};
use crate::route::{Field, Route};
use crate::transport::TransportError;

/// Header name/value pairs, in insertion order.
pub type Headers = Vec<(String, String)>;

/// Turns a failed response into an outcome payload.
pub type StatusHandler = Arc<dyn Fn(HttpResponse) -> BoxFuture<'static, Result<Value, ApiError>> + Send + Sync>;

/// Rewrites a JSON value: the validated body before sending, or the raw
/// response data before validation.
pub type TransformHook = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, ApiError>> + Send + Sync>;

/// Computes headers from the route being called.
pub type InjectHeaderHook = Arc<dyn Fn(Arc<Route>) -> BoxFuture<'static, Result<Headers, ApiError>> + Send + Sync>;

#[derive(Clone)]
pub struct Request {
    client: ApiClient,
    route: Arc<Route>,
    param: Option<Value>,
    query: Option<Value>,
    body: Option<Value>,
    header: Option<Value>,
    headers: Headers,
    access_token: Option<String>,
    handlers: HashMap<Status, StatusHandler>,
    on_transform_body: Option<TransformHook>,
    on_inject_header: Option<InjectHeaderHook>,
    on_transform_response: Option<TransformHook>,
}

impl Request {
    pub(crate) fn new(client: ApiClient, route: Arc<Route>) -> Self {
        Self {
            client,
            route,
            param: None,
            query: None,
            body: None,
            header: None,
            headers: Vec::new(),
            access_token: None,
            handlers: HashMap::new(),
            on_transform_body: None,
            on_inject_header: None,
            on_transform_response: None,
        }
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    /// Whether `field` has been assigned.
    pub fn is_set(&self, field: Field) -> bool {
        self.slot(field).is_some()
    }

    fn slot(&self, field: Field) -> Option<&Value> {
        match field {
            Field::Param => self.param.as_ref(),
            Field::Query => self.query.as_ref(),
            Field::Body => self.body.as_ref(),
            Field::Header => self.header.as_ref(),
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<Value> {
        match field {
            Field::Param => &mut self.param,
            Field::Query => &mut self.query,
            Field::Body => &mut self.body,
            Field::Header => &mut self.header,
        }
    }

    fn assign<T: Serialize + ?Sized>(&self, field: Field, value: &T) -> Result<Self, BuildError> {
        if !self.route.declares(field) {
            return Err(BuildError::Undeclared {
                route: self.route.to_string(),
                field: field.as_str(),
            });
        }
        if self.is_set(field) {
            return Err(BuildError::AlreadySet {
                field: field.as_str(),
            });
        }
        let value = serde_json::to_value(value).map_err(|source| BuildError::Serialize {
            field: field.as_str(),
            source,
        })?;
        let mut next = self.clone();
        *next.slot_mut(field) = Some(value);
        Ok(next)
    }

    pub fn set_param<T: Serialize + ?Sized>(&self, param: &T) -> Result<Self, BuildError> {
        self.assign(Field::Param, param)
    }

    pub fn set_query<T: Serialize + ?Sized>(&self, query: &T) -> Result<Self, BuildError> {
        self.assign(Field::Query, query)
    }

    pub fn set_body<T: Serialize + ?Sized>(&self, body: &T) -> Result<Self, BuildError> {
        self.assign(Field::Body, body)
    }

    /// Set the header input checked by the route's header validator. For
    /// headers the route knows nothing about, use `add_header`.
    pub fn set_header<T: Serialize + ?Sized>(&self, header: &T) -> Result<Self, BuildError> {
        self.assign(Field::Header, header)
    }

    /// Add an unvalidated header. Repeating a key replaces the earlier value.
    #[must_use]
    pub fn add_header(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        put_header(&mut next.headers, key.into(), value.into());
        next
    }

    /// Send an access token of `kind`, looked up through the client's
    /// `AccessTokenProvider`. The token overrides any other `Access-Token`
    /// header.
    pub fn set_access_token(&self, kind: impl Into<String>) -> Result<Self, BuildError> {
        if self.access_token.is_some() {
            return Err(BuildError::AlreadySet {
                field: "access token",
            });
        }
        let mut next = self.clone();
        next.access_token = Some(kind.into());
        Ok(next)
    }

    /// Handle a failed call with `status`. The handler's result becomes the
    /// payload of the matching `Outcome` variant. Registering again replaces
    /// the previous handler.
    #[must_use]
    pub fn set_on_status<F, Fut, T>(&self, status: Status, handler: F) -> Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        T: Serialize + 'static,
    {
        let mut next = self.clone();
        next.handlers.insert(status, status_handler(handler));
        next
    }

    #[must_use]
    pub fn set_on_unmodified<F, Fut, T>(&self, handler: F) -> Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.set_on_status(Status::Unmodified, handler)
    }

    #[must_use]
    pub fn set_on_syntactic_error<F, Fut, T>(&self, handler: F) -> Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.set_on_status(Status::SyntacticError, handler)
    }

    #[must_use]
    pub fn set_on_unauthorized<F, Fut, T>(&self, handler: F) -> Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.set_on_status(Status::Unauthorized, handler)
    }

    #[must_use]
    pub fn set_on_forbidden<F, Fut, T>(&self, handler: F) -> Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.set_on_status(Status::Forbidden, handler)
    }

    #[must_use]
    pub fn set_on_not_found<F, Fut, T>(&self, handler: F) -> Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.set_on_status(Status::NotFound, handler)
    }

    #[must_use]
    pub fn set_on_semantic_error<F, Fut, T>(&self, handler: F) -> Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.set_on_status(Status::SemanticError, handler)
    }

    #[must_use]
    pub fn set_on_too_many_requests<F, Fut, T>(&self, handler: F) -> Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.set_on_status(Status::TooManyRequests, handler)
    }

    /// One handler for both 400 and 422.
    #[must_use]
    pub fn set_on_syntactic_or_semantic_error<F, Fut, T>(&self, handler: F) -> Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        T: Serialize + 'static,
    {
        let handler = status_handler(handler);
        let mut next = self.clone();
        next.handlers.insert(Status::SyntacticError, Arc::clone(&handler));
        next.handlers.insert(Status::SemanticError, handler);
        next
    }

    /// Rewrite the validated body just before it is sent. Not called when
    /// the request has no body.
    #[must_use]
    pub fn set_on_transform_body<F, Fut>(&self, hook: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
    {
        let transform: TransformHook = Arc::new(move |body| hook(body).boxed());
        let mut next = self.clone();
        next.on_transform_body = Some(transform);
        next
    }

    /// Compute extra headers from the route. They have the lowest
    /// precedence: explicit and validated headers overwrite them.
    #[must_use]
    pub fn set_on_inject_header<F, Fut>(&self, hook: F) -> Self
    where
        F: Fn(Arc<Route>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Headers, ApiError>> + Send + 'static,
    {
        let inject: InjectHeaderHook = Arc::new(move |route| hook(route).boxed());
        let mut next = self.clone();
        next.on_inject_header = Some(inject);
        next
    }

    /// Rewrite successful response data before the response validator sees
    /// it. Only called when the route declares a response validator.
    #[must_use]
    pub fn set_on_transform_response<F, Fut>(&self, hook: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
    {
        let transform: TransformHook = Arc::new(move |data| hook(data).boxed());
        let mut next = self.clone();
        next.on_transform_response = Some(transform);
        next
    }

    #[must_use]
    pub fn clear_on_transform_body(&self) -> Self {
        let mut next = self.clone();
        next.on_transform_body = None;
        next
    }

    #[must_use]
    pub fn clear_on_inject_header(&self) -> Self {
        let mut next = self.clone();
        next.on_inject_header = None;
        next
    }

    #[must_use]
    pub fn clear_on_transform_response(&self) -> Self {
        let mut next = self.clone();
        next.on_transform_response = None;
        next
    }

    fn check_complete(&self) -> Result<(), BuildError> {
        for field in Field::ALL {
            if self.route.declares(field) && !self.is_set(field) {
                return Err(BuildError::Missing {
                    route: self.route.to_string(),
                    field: field.as_str(),
                });
            }
        }
        Ok(())
    }

    fn validate(&self, field: Field) -> Result<Option<Value>, AssertError> {
        match self.route.validator(field) {
            Some(assert) => Ok(assert
                .assert(field.as_str(), self.slot(field))?
                .map(Cow::into_owned)),
            None => Ok(None),
        }
    }

    /// Validate every field, call the transport and resolve the result.
    ///
    /// Fails with `ApiError::Build` before any effect when a declared field
    /// is missing. A transport failure is handed to the handler registered
    /// for its status; without one it is returned unchanged as
    /// `ApiError::Transport`.
    #[tracing::instrument(skip_all, fields(route = %self.route))]
    pub async fn send(self) -> Result<Outcome, ApiError> {
        self.check_complete()?;

        let param = self.validate(Field::Param)?.unwrap_or_else(|| Value::Object(Map::new()));
        let path = self.route.path().calling_path(&param)?;
        let url = self.client.config().url_for(&path);
        let query = self.validate(Field::Query)?;
        let mut body = self.validate(Field::Body)?;
        let header = self.validate(Field::Header)?;
        debug!(%url, "request validated");

        let mut headers = Vec::new();
        if let Some(hook) = &self.on_inject_header {
            for (key, value) in hook(Arc::clone(&self.route)).await? {
                put_header(&mut headers, key, value);
            }
        }
        for (key, value) in &self.headers {
            put_header(&mut headers, key.clone(), value.clone());
        }
        if let Some(header) = &header {
            for (key, value) in header_entries(header) {
                put_header(&mut headers, key, value);
            }
        }
        if let Some(kind) = &self.access_token {
            let token = self.client.access_token(kind).await?;
            put_header(&mut headers, ACCESS_TOKEN_HEADER.to_string(), token);
        }

        if let Some(hook) = &self.on_transform_body {
            if let Some(raw) = body.take() {
                body = Some(hook(raw).await?);
            }
        }

        let request = HttpRequest {
            method: self.route.method(),
            url,
            query,
            body,
            headers,
        };
        match self.client.transport().send(request).await {
            Ok(response) => self.resolve(response).await,
            Err(error) => self.dispatch(error).await,
        }
    }

    async fn resolve(&self, response: HttpResponse) -> Result<Outcome, ApiError> {
        debug!(status = response.status, "request succeeded");
        let Some(validator) = self.route.response() else {
            let payload = response.data.clone();
            return Ok(Outcome::Normal(Envelope { response, payload }));
        };

        let data = match &self.on_transform_response {
            Some(hook) => hook(response.data.clone()).await?,
            None => response.data.clone(),
        };
        match validator.assert("response", Some(&data)) {
            Ok(refined) => {
                let payload = refined.map_or(Value::Null, Cow::into_owned);
                Ok(Outcome::Normal(Envelope { response, payload }))
            }
            Err(source) => {
                warn!(error = %source, "response failed validation");
                Err(ApiError::Response { source, response })
            }
        }
    }

    async fn dispatch(&self, error: TransportError) -> Result<Outcome, ApiError> {
        let handled = match (&error.config, &error.response) {
            (Some(_), Some(response)) => Status::from_code(response.status)
                .and_then(|status| self.handlers.get(&status).map(|h| (status, Arc::clone(h), response.clone()))),
            _ => None,
        };
        let Some((status, handler, response)) = handled else {
            debug!(error = %error, status = ?error.status_code(), "transport failure not handled");
            return Err(ApiError::Transport(error));
        };

        debug!(%status, "dispatching to status handler");
        let payload = handler(response.clone()).await?;
        Ok(Outcome::handled(status, Envelope { response, payload }))
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handled: Vec<u16> = self.handlers.keys().map(|status| status.code()).collect();
        handled.sort_unstable();
        f.debug_struct("Request")
            .field("route", &self.route.to_string())
            .field("param", &self.param)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("header", &self.header)
            .field("headers", &self.headers)
            .field("access_token", &self.access_token)
            .field("handled", &handled)
            .finish()
    }
}

fn status_handler<F, Fut, T>(handler: F) -> StatusHandler
where
    F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    T: Serialize + 'static,
{
    Arc::new(move |response| {
        let pending = handler(response);
        async move {
            let payload = pending.await?;
            serde_json::to_value(payload).map_err(ApiError::Serialize)
        }
        .boxed()
    })
}

/// Insert or replace `key`, compared case-insensitively.
fn put_header(headers: &mut Headers, key: String, value: String) {
    headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&key));
    headers.push((key, value));
}

/// Header pairs from a validated header object. Array values are joined
/// with `", "`; nulls and nested objects are dropped.
fn header_entries(header: &Value) -> Headers {
    let Value::Object(map) = header else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Array(items) => {
                    let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
                    Some(parts.join(", "))
                }
                other => scalar_text(other),
            };
            text.map(|text| (key.clone(), text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert::{field, natural_number, string};
    use crate::config::ClientConfig;
    use crate::transport::Transport;
    use async_trait::async_trait;
    use serde_json::json;

    struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::network(request, "unreachable"))
        }
    }

    fn request(route: Route) -> Request {
        let client = ApiClient::new(ClientConfig::new("http://localhost:3000").unwrap(), Unreachable);
        client.request(route)
    }

    fn item_route() -> Route {
        Route::put("/items/{id}")
            .with_param(field("id", natural_number()))
            .with_body(string())
    }

    #[test]
    fn setters_do_not_touch_the_receiver() {
        let empty = request(item_route());
        let with_body = empty.set_body("hello").unwrap();
        assert!(!empty.is_set(Field::Body));
        assert!(with_body.is_set(Field::Body));
    }

    #[test]
    fn undeclared_field_is_rejected() {
        let err = request(item_route()).set_query(&json!({})).unwrap_err();
        assert!(matches!(err, BuildError::Undeclared { field: "query", .. }));
    }

    #[test]
    fn second_assignment_is_rejected() {
        let req = request(item_route()).set_body("a").unwrap();
        let err = req.set_body("b").unwrap_err();
        assert!(matches!(err, BuildError::AlreadySet { field: "body" }));
    }

    #[test]
    fn access_token_is_set_once() {
        let req = request(item_route()).set_access_token("user").unwrap();
        assert!(req.set_access_token("service").is_err());
    }

    #[test]
    fn completeness_names_first_missing_field() {
        let req = request(item_route()).set_body("a").unwrap();
        let err = req.check_complete().unwrap_err();
        assert!(matches!(err, BuildError::Missing { field: "param", .. }));
    }

    #[test]
    fn add_header_replaces_case_insensitively() {
        let req = request(item_route())
            .add_header("X-Trace", "1")
            .add_header("x-trace", "2");
        assert_eq!(req.headers, vec![("x-trace".to_string(), "2".to_string())]);
    }

    #[test]
    fn header_entries_flatten_scalars() {
        let entries = header_entries(&json!({"a": "x", "b": 2, "c": ["p", "q"], "d": null}));
        assert_eq!(
            entries,
            vec![
                ("a".to_string(), "x".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "p, q".to_string()),
            ]
        );
    }

    #[test]
    fn requests_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Request>();
    }

    #[tokio::test]
    async fn network_failure_is_returned_unchanged() {
        let req = request(item_route())
            .set_param(&json!({"id": 1}))
            .unwrap()
            .set_body("a")
            .unwrap()
            .set_on_not_found(|_| async { Ok::<_, ApiError>("unused") });
        let err = req.send().await.unwrap_err();
        match err {
            ApiError::Transport(error) => {
                assert_eq!(error.message, "unreachable");
                assert_eq!(error.config.map(|c| c.url), Some("http://localhost:3000/items/1".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

//! Route descriptors.
//!
//! A `Route` names an endpoint (method plus path template) and declares which
//! request fields it takes by attaching a validator to each. A field without
//! a validator is not part of the route: it cannot be set, and its pipeline
//! stage is skipped.

use std::fmt;

use serde_json::Value;
use url::Url;

use crate::assert::{Assert, AssertExt, DynAssert};
use crate::error::AssertError;
use crate::http::{scalar_text, HttpMethod};

/// A request field that a route may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Param,
    Query,
    Body,
    Header,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Param, Field::Query, Field::Body, Field::Header];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Param => "param",
            Field::Query => "query",
            Field::Body => "body",
            Field::Header => "header",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A path such as `/items/{id}/tags/{tag}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Split `raw` into literal text and `{name}` placeholders. An unclosed
    /// `{` is kept as literal text.
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut rest = raw;
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            segments.push(Segment::Param(rest[start + 1..start + len].to_string()));
            rest = &rest[start + len + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Names of the placeholders, in order.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute validated path parameters into the template.
    ///
    /// Each placeholder takes the scalar under the same key of `param`,
    /// percent-encoded. A missing or non-scalar value fails with the name
    /// `param.<key>`.
    pub fn calling_path(&self, param: &Value) -> Result<String, AssertError> {
        let mut path = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Param(name) => {
                    let value = param.get(name);
                    let encoded = value
                        .and_then(scalar_text)
                        .and_then(|text| encode_segment(&text))
                        .ok_or_else(|| {
                            AssertError::mismatch(&format!("param.{name}"), "a path segment", value)
                        })?;
                    path.push_str(&encoded);
                }
            }
        }
        Ok(path)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Percent-encode `text` as a single path segment.
fn encode_segment(text: &str) -> Option<String> {
    let mut url = Url::parse("http://segment.invalid/").ok()?;
    url.path_segments_mut().ok()?.clear().push(text);
    Some(url.path().trim_start_matches('/').to_string())
}

/// An endpoint and the validators for each of its fields.
#[derive(Clone)]
pub struct Route {
    method: HttpMethod,
    path: PathTemplate,
    param: Option<DynAssert>,
    query: Option<DynAssert>,
    body: Option<DynAssert>,
    header: Option<DynAssert>,
    response: Option<DynAssert>,
}

impl Route {
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            method,
            path: PathTemplate::parse(path),
            param: None,
            query: None,
            body: None,
            header: None,
            response: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: &str) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: &str) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    #[must_use]
    pub fn with_param<A: Assert + 'static>(mut self, assert: A) -> Self {
        self.param = Some(assert.into_dyn());
        self
    }

    #[must_use]
    pub fn with_query<A: Assert + 'static>(mut self, assert: A) -> Self {
        self.query = Some(assert.into_dyn());
        self
    }

    #[must_use]
    pub fn with_body<A: Assert + 'static>(mut self, assert: A) -> Self {
        self.body = Some(assert.into_dyn());
        self
    }

    #[must_use]
    pub fn with_header<A: Assert + 'static>(mut self, assert: A) -> Self {
        self.header = Some(assert.into_dyn());
        self
    }

    #[must_use]
    pub fn with_response<A: Assert + 'static>(mut self, assert: A) -> Self {
        self.response = Some(assert.into_dyn());
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &PathTemplate {
        &self.path
    }

    /// The validator declared for `field`, if any.
    pub fn validator(&self, field: Field) -> Option<&DynAssert> {
        match field {
            Field::Param => self.param.as_ref(),
            Field::Query => self.query.as_ref(),
            Field::Body => self.body.as_ref(),
            Field::Header => self.header.as_ref(),
        }
    }

    pub fn declares(&self, field: Field) -> bool {
        self.validator(field).is_some()
    }

    pub fn response(&self) -> Option<&DynAssert> {
        self.response.as_ref()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let declared: Vec<&str> = Field::ALL
            .into_iter()
            .filter(|field| self.declares(*field))
            .map(Field::as_str)
            .collect();
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path.raw)
            .field("fields", &declared)
            .field("response", &self.response.is_some())
            .finish()
    }
}

//! What a sent request resolves to.
//!
//! `Normal` carries the validated response. Every other variant is the
//! result of a status handler claiming a failed call; its payload is
//! whatever the handler returned.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::http::HttpResponse;

/// Statuses a request can register a handler for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Unmodified,
    SyntacticError,
    Unauthorized,
    Forbidden,
    NotFound,
    SemanticError,
    TooManyRequests,
}

impl Status {
    pub const ALL: [Status; 7] = [
        Status::Unmodified,
        Status::SyntacticError,
        Status::Unauthorized,
        Status::Forbidden,
        Status::NotFound,
        Status::SemanticError,
        Status::TooManyRequests,
    ];

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            304 => Some(Status::Unmodified),
            400 => Some(Status::SyntacticError),
            401 => Some(Status::Unauthorized),
            403 => Some(Status::Forbidden),
            404 => Some(Status::NotFound),
            422 => Some(Status::SemanticError),
            429 => Some(Status::TooManyRequests),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Status::Unmodified => 304,
            Status::SyntacticError => 400,
            Status::Unauthorized => 401,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::SemanticError => 422,
            Status::TooManyRequests => 429,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Unmodified => "unmodified",
            Status::SyntacticError => "syntactic error",
            Status::Unauthorized => "unauthorized",
            Status::Forbidden => "forbidden",
            Status::NotFound => "not found",
            Status::SemanticError => "semantic error",
            Status::TooManyRequests => "too many requests",
        };
        write!(f, "{} {name}", self.code())
    }
}

/// The response a payload was produced from.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub response: HttpResponse,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Normal(Envelope),
    Unmodified(Envelope),
    SyntacticError(Envelope),
    Unauthorized(Envelope),
    Forbidden(Envelope),
    NotFound(Envelope),
    SemanticError(Envelope),
    TooManyRequests(Envelope),
}

impl Outcome {
    pub(crate) fn handled(status: Status, envelope: Envelope) -> Self {
        match status {
            Status::Unmodified => Outcome::Unmodified(envelope),
            Status::SyntacticError => Outcome::SyntacticError(envelope),
            Status::Unauthorized => Outcome::Unauthorized(envelope),
            Status::Forbidden => Outcome::Forbidden(envelope),
            Status::NotFound => Outcome::NotFound(envelope),
            Status::SemanticError => Outcome::SemanticError(envelope),
            Status::TooManyRequests => Outcome::TooManyRequests(envelope),
        }
    }

    /// The handled status, or `None` for `Normal`.
    pub fn status(&self) -> Option<Status> {
        match self {
            Outcome::Normal(_) => None,
            Outcome::Unmodified(_) => Some(Status::Unmodified),
            Outcome::SyntacticError(_) => Some(Status::SyntacticError),
            Outcome::Unauthorized(_) => Some(Status::Unauthorized),
            Outcome::Forbidden(_) => Some(Status::Forbidden),
            Outcome::NotFound(_) => Some(Status::NotFound),
            Outcome::SemanticError(_) => Some(Status::SemanticError),
            Outcome::TooManyRequests(_) => Some(Status::TooManyRequests),
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, Outcome::Normal(_))
    }

    pub fn envelope(&self) -> &Envelope {
        match self {
            Outcome::Normal(e)
            | Outcome::Unmodified(e)
            | Outcome::SyntacticError(e)
            | Outcome::Unauthorized(e)
            | Outcome::Forbidden(e)
            | Outcome::NotFound(e)
            | Outcome::SemanticError(e)
            | Outcome::TooManyRequests(e) => e,
        }
    }

    pub fn into_envelope(self) -> Envelope {
        match self {
            Outcome::Normal(e)
            | Outcome::Unmodified(e)
            | Outcome::SyntacticError(e)
            | Outcome::Unauthorized(e)
            | Outcome::Forbidden(e)
            | Outcome::NotFound(e)
            | Outcome::SemanticError(e)
            | Outcome::TooManyRequests(e) => e,
        }
    }

    pub fn response(&self) -> &HttpResponse {
        &self.envelope().response
    }

    pub fn payload(&self) -> &Value {
        &self.envelope().payload
    }

    pub fn into_payload(self) -> Value {
        self.into_envelope().payload
    }

    /// Decode the payload into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(self.payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_codes_round_trip() {
        for status in Status::ALL {
            assert_eq!(Status::from_code(status.code()), Some(status));
        }
        assert_eq!(Status::from_code(500), None);
        assert_eq!(Status::from_code(200), None);
        assert_eq!(Status::TooManyRequests.to_string(), "429 too many requests");
    }

    #[test]
    fn handled_outcome_matches_status() {
        let envelope = Envelope {
            response: HttpResponse::new(404, json!({"error": "missing"})),
            payload: json!("fallback"),
        };
        let outcome = Outcome::handled(Status::NotFound, envelope);
        assert!(matches!(outcome, Outcome::NotFound(_)));
        assert_eq!(outcome.status(), Some(Status::NotFound));
        assert_eq!(outcome.response().status, 404);
        assert_eq!(outcome.decode::<String>().unwrap(), "fallback");
    }

    #[test]
    fn normal_has_no_status() {
        let outcome = Outcome::Normal(Envelope {
            response: HttpResponse::new(200, json!([1])),
            payload: json!([1]),
        });
        assert!(outcome.is_normal());
        assert_eq!(outcome.status(), None);
        assert_eq!(outcome.into_payload(), json!([1]));
    }
}

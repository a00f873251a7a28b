use serde::Serialize;

use crate::CommentableError;

/// The client-visible shape of a refused request.
///
/// Transports map these to their own status codes; this crate never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Denial {
    /// The resource is missing or must not be revealed.
    NotFound,
    /// The principal is known but lacks rights.
    Forbidden,
    /// The request itself is invalid.
    BadRequest,
}

/// Values that may have had fields withheld from the requester.
pub trait Redaction {
    fn is_redacted(&self) -> bool;
}

impl Redaction for () {
    fn is_redacted(&self) -> bool {
        false
    }
}

/// The decision handed to a transport for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Allowed; the value is complete.
    Allowed(T),
    /// Allowed; some fields were withheld.
    Redacted(T),
    NotFound,
    Forbidden(String),
    BadRequest(String),
}

impl<T: Redaction> Outcome<T> {
    /// Classify the result of a service call.
    ///
    /// Errors that are not denials, such as store failures, are returned as
    /// errors so the transport can report them as internal failures.
    pub fn from_result(result: Result<T, CommentableError>) -> Result<Self, CommentableError> {
        let error = match result {
            Ok(value) if value.is_redacted() => return Ok(Outcome::Redacted(value)),
            Ok(value) => return Ok(Outcome::Allowed(value)),
            Err(error) => error,
        };

        match error.denial() {
            Some(Denial::NotFound) => Ok(Outcome::NotFound),
            Some(Denial::Forbidden) => Ok(Outcome::Forbidden(error.to_string())),
            Some(Denial::BadRequest) => Ok(Outcome::BadRequest(error.to_string())),
            None => Err(error),
        }
    }
}

impl<T> Outcome<T> {
    /// The denial, if the request was refused.
    pub fn denial(&self) -> Option<Denial> {
        match self {
            Outcome::Allowed(_) | Outcome::Redacted(_) => None,
            Outcome::NotFound => Some(Denial::NotFound),
            Outcome::Forbidden(_) => Some(Denial::Forbidden),
            Outcome::BadRequest(_) => Some(Denial::BadRequest),
        }
    }

    /// The value, if the request was allowed.
    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Allowed(value) | Outcome::Redacted(value) => Some(value),
            _ => None,
        }
    }
}

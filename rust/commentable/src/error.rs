use std::path::PathBuf;

use commentable_policy::{FieldWriteError, PolicyConfigurationError};
use commentable_query::QueryError;
use thiserror::Error;

use crate::{Denial, Status};

/// Fatal problems with deployment configuration.
///
/// These surface only while building a service or authorizer. A process that
/// sees one should refuse to start.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("allowed_types cannot be empty")]
    NoAllowedTypes,

    #[error("allowed_types cannot contain empty strings")]
    EmptyAllowedType,

    #[error("duplicate type in allowed_types: {value}")]
    DuplicateAllowedType { value: String },

    #[error("max_content_length must be between 1 and {max} bytes (got {value})")]
    ContentLength { value: usize, max: usize },

    #[error("pagination_limit must be between 1 and max_pagination_limit ({max}) (got {value})")]
    PaginationLimit { value: u32, max: u32 },

    #[error("max_page must be at least 1")]
    MaxPage,

    #[error("max_filter_values must be at least 1")]
    MaxFilterValues,

    #[error("max_nesting_depth must be between 1 and {max} (got {value})")]
    NestingDepth { value: u32, max: u32 },

    #[error("default_status cannot be empty")]
    EmptyDefaultStatus,

    #[error("invalid default_status: {value} (allowed: {})", Status::names().join(", "))]
    InvalidDefaultStatus { value: String },

    /// The role hierarchy or field policies are inconsistent.
    #[error(transparent)]
    Policy(#[from] PolicyConfigurationError),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read configuration from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Client-correctable problems with a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("commentable type '{value}' is not allowed (allowed: {})", .allowed.join(", "))]
    DisallowedType { value: String, allowed: Vec<String> },

    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("content cannot be empty")]
    EmptyContent,

    #[error("content exceeds maximum length of {max} bytes")]
    ContentTooLong { max: usize, length: usize },

    #[error("at least one field must be provided")]
    EmptyUpdate,

    #[error("invalid status value '{value}' (allowed: {})", Status::names().join(", "))]
    InvalidStatus { value: String },

    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("replies are disabled")]
    NestingDisabled,

    #[error("replies cannot be nested deeper than {max} levels")]
    NestingTooDeep { max: u32 },

    #[error("parent comment not found")]
    ParentNotFound,

    #[error("a reply must target the same resource as its parent")]
    ParentMismatch,
}

/// Failures reported by a [`CommentStore`].
///
/// [`CommentStore`]: crate::CommentStore
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Comment '{id}' already exists")]
    Conflict { id: String },

    #[error("Comment '{id}' does not exist")]
    Missing { id: String },

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// Every failure a [`CommentService`] operation can produce.
///
/// [`CommentService`]: crate::CommentService
#[derive(Error, Debug)]
pub enum CommentableError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Query(#[from] QueryError),

    /// The principal is identified but lacks the rights for the operation.
    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    /// The resource does not exist, or its existence must not be confirmed
    /// to this principal.
    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CommentableError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        CommentableError::Forbidden {
            reason: reason.into(),
        }
    }

    /// How the error is presented to the client, or `None` when it is not a
    /// per-request denial and should propagate as an internal failure.
    pub fn denial(&self) -> Option<Denial> {
        match self {
            CommentableError::Validation(_) | CommentableError::Query(_) => {
                Some(Denial::BadRequest)
            }
            CommentableError::Forbidden { .. } => Some(Denial::Forbidden),
            CommentableError::NotFound => Some(Denial::NotFound),
            CommentableError::Configuration(_) | CommentableError::Store(_) => None,
        }
    }
}

impl From<FieldWriteError> for CommentableError {
    fn from(error: FieldWriteError) -> Self {
        CommentableError::forbidden(error.to_string())
    }
}

use thiserror::Error;

/// Client-correctable failures while compiling a query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A parameter key does not follow the `name`, `name[]` or `name[op]`
    /// shape.
    #[error("Malformed query parameter '{key}'")]
    MalformedKey { key: String },

    /// A filter names a field outside the whitelist.
    #[error("Filtering on field '{field}' is not allowed")]
    UnknownField { field: String },

    /// A filter uses an operator the field does not support.
    #[error("Operator '{operator}' is not allowed for field '{field}'")]
    UnsupportedOperator { field: String, operator: String },

    /// A filter supplies more values than the configured maximum.
    #[error("Too many filter values for field '{field}' (max: {max}, got: {count})")]
    TooManyValues {
        field: String,
        max: usize,
        count: usize,
    },

    /// A single-valued operator received several values.
    #[error("Operator '{operator}' on field '{field}' expects exactly one value")]
    SingleValueExpected { field: String, operator: String },

    /// A filter supplied no usable value.
    #[error("Filter on field '{field}' has no value")]
    EmptyValue { field: String },

    /// A value falls outside the field's allowed values.
    #[error("Invalid {field} '{value}' (allowed: {})", .allowed.join(", "))]
    DisallowedValue {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    /// A value could not be interpreted for the field's kind.
    #[error("Invalid value '{value}' for field '{field}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// An ordering names a field outside the sortable whitelist.
    #[error("Sorting on field '{field}' is not allowed")]
    UnknownSortField { field: String },
}

impl QueryError {
    /// The external field name the error is about, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            QueryError::MalformedKey { .. } => None,
            QueryError::UnknownField { field }
            | QueryError::UnsupportedOperator { field, .. }
            | QueryError::TooManyValues { field, .. }
            | QueryError::SingleValueExpected { field, .. }
            | QueryError::EmptyValue { field }
            | QueryError::DisallowedValue { field, .. }
            | QueryError::InvalidValue { field, .. }
            | QueryError::UnknownSortField { field } => Some(field.as_str()),
        }
    }
}

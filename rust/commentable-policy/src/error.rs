use crate::{Access, Role};

/// Errors raised while building policy from configuration.
///
/// These are fatal: a process must refuse to start rather than serve
/// requests against a policy that failed to validate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyConfigurationError {
    /// A role name was empty or consisted only of whitespace.
    #[error("Role names cannot be empty")]
    EmptyRole,

    /// A role lists itself among the roles it implies.
    #[error("Role '{role}' cannot imply itself")]
    SelfReference {
        /// The offending role.
        role: Role,
    },

    /// Following implications leads back to a role already on the path.
    #[error("Role hierarchy contains a cycle: {}", render_path(.path))]
    Cycle {
        /// The roles forming the cycle, starting and ending with the same role.
        path: Vec<Role>,
    },

    /// A role was referenced that is not part of the declared vocabulary.
    #[error("Unknown role '{role}' referenced by {context}")]
    UnknownRole {
        /// The unknown role.
        role: Role,
        /// Where the role was referenced.
        context: String,
    },

    /// The same field was configured more than once.
    #[error("Field '{field}' has more than one policy")]
    DuplicateField {
        /// The duplicated field name.
        field: String,
    },
}

/// Errors raised when a principal attempts to write a field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldWriteError {
    /// The field is managed by the system and never accepts external writes.
    #[error("Field '{field}' is read-only")]
    ReadOnly {
        /// The field name.
        field: String,
    },

    /// The principal's roles do not satisfy the field's write requirement.
    #[error("Insufficient role to write field '{field}' (requires {required})")]
    Insufficient {
        /// The field name.
        field: String,
        /// The requirement that was not met.
        required: Access,
    },
}

fn render_path(path: &[Role]) -> String {
    path.iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

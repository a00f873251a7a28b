//! Role-based access policy for threaded comments.
//!
//! This crate answers two questions for every request: which roles does a
//! principal actually hold, and does that set of roles satisfy the access
//! requirement attached to a field?
//!
//! # Core Concepts
//!
//! ## Roles and the hierarchy
//!
//! A [`Role`] is an opaque name such as `reader` or `moderator`. The
//! [`RoleHierarchy`] maps a role to the roles it implies, and
//! [`RoleHierarchy::resolve`] expands a principal's declared roles into the
//! transitive closure, producing a [`RoleSet`]:
//!
//! ```text
//! writer ──► moderator ──► reader
//!
//! declared: [writer]   resolved: {writer, moderator, reader}
//! ```
//!
//! The hierarchy is validated once when it is built. A role that implies
//! itself, directly or through a chain, is a configuration error and the
//! hierarchy refuses to construct.
//!
//! ## Access requirements
//!
//! Every field carries an [`Access`] requirement for reading and another for
//! writing:
//!
//! | Access | Written as | Satisfied by |
//! |--------|------------|--------------|
//! | [`Access::Public`] | `*` | everyone, including anonymous principals |
//! | [`Access::Role`] | `moderator` | role sets containing the role |
//! | [`Access::Nobody`] | `none` | the superuser only |
//!
//! ## Voting
//!
//! The [`PermissionVoter`] combines the hierarchy with a superuser role and a
//! default policy. The superuser satisfies every requirement. The
//! [`FieldPolicyTable`] layers the system-managed rule on top: a field whose
//! write access is [`Access::Nobody`] rejects writes from everybody, the
//! superuser included.
//!
//! # Example
//!
//! ```
//! use commentable_policy::{Access, PermissionVoter, PolicySettings, Role};
//!
//! let voter = PermissionVoter::new(&PolicySettings::default()).unwrap();
//! let roles = voter.resolve(&[Role::from("writer")]);
//!
//! assert!(voter.allows(&roles, &Access::from("reader")));
//! assert!(!voter.is_superuser(&roles));
//! ```

mod error;
pub use error::*;

mod role;
pub use role::*;

mod access;
pub use access::*;

mod hierarchy;
pub use hierarchy::*;

mod settings;
pub use settings::*;

mod voter;
pub use voter::*;

mod field;
pub use field::*;

//! Threaded comments with role-aware moderation.
//!
//! This crate decides who may see and change a comment, and turns untrusted
//! list requests into bounded store queries. It is transport agnostic: a
//! web layer builds a [`Principal`] per request, calls the
//! [`CommentService`], and maps any [`CommentableError`] through
//! [`CommentableError::denial`] (or the whole result through
//! [`Outcome::from_result`]) to its own responses.
//!
//! # Visibility and ownership
//!
//! A comment moves through four [`Status`]es. Only `published` comments are
//! visible below the moderator role; to everyone else an unpublished comment
//! does not exist, so fetching it is answered as not found and listing skips
//! it silently.
//!
//! Fields are gated individually by the
//! [`FieldPolicyTable`](commentable_policy::FieldPolicyTable): network
//! metadata of anonymous authors is omitted from reads below the moderator
//! role, and identifiers and timestamps can never be written.
//!
//! Editing content and deleting are reserved for the comment's author. Roles
//! never substitute for ownership, and anonymous comments have no author.
//! Changing the status is a matter of roles alone.
//!
//! # Example
//!
//! ```
//! use commentable::{
//!     CommentService, CommentableConfig, CreateCommentRequest, MemoryStore, Origin, Principal,
//! };
//! use commentable_query::QueryParameters;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), commentable::CommentableError> {
//! let service = CommentService::new(&CommentableConfig::default(), MemoryStore::new())?;
//!
//! let visitor = Principal::anonymous(Origin::new("203.0.113.7", "curl/8"));
//! let created = service
//!     .create(
//!         &visitor,
//!         CreateCommentRequest {
//!             commentable: "post".into(),
//!             commentable_id: "welcome".into(),
//!             parent_id: None,
//!             content: "First!".into(),
//!         },
//!     )
//!     .await?;
//!
//! // New comments wait for a moderator before the public can see them.
//! assert_eq!(created.get("status").and_then(|s| s.as_str()), Some("awaiting"));
//! let listed = service.list(&visitor, &QueryParameters::parse("")).await?;
//! assert!(listed.items.is_empty());
//! # Ok(())
//! # }
//! ```

mod error;
pub use error::*;

mod status;
pub use status::*;

mod comment;
pub use comment::*;

pub mod fields;

mod config;
pub use config::*;

mod request;
pub use request::*;

mod principal;
pub use principal::*;

mod decision;
pub use decision::*;

mod authorizer;
pub use authorizer::*;

mod collection;
pub use collection::*;

mod store;
pub use store::*;

mod memory;
pub use memory::*;

mod service;
pub use service::*;

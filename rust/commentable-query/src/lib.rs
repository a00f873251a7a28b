//! Compile untrusted query-string parameters into bounded, whitelisted
//! retrieval queries.
//!
//! A list request arrives as a bag of client-supplied key/value pairs. This
//! crate turns that bag into three things a store can execute safely:
//!
//! - a [`Filter`]: conjunctive [`FilterClause`]s over whitelisted fields,
//!   rendered into a dialect-neutral [`Predicate`];
//! - an ordering: [`OrderClause`]s over sortable whitelisted fields;
//! - a [`Page`]: limit, offset and whether to count, clamped into bounds.
//!
//! The compilers never perform I/O. Anything outside the [`Whitelist`]
//! fails the whole request with a [`QueryError`]; nothing is silently
//! dropped.
//!
//! # Query-string grammar
//!
//! ```text
//! status=published                 equals
//! status=published&status=draft    in-set (repeated key)
//! commentable[]=post               in-set
//! commentable[in]=post,article     in-set (comma separated)
//! createdAt[gte]=2026-01-01T00:00:00Z
//! order[createdAt]=desc            ordering
//! limit=20&page=2&count=false      pagination
//! ```

mod error;
pub use error::*;

mod parameters;
pub use parameters::*;

mod operator;
pub use operator::*;

mod value;
pub use value::*;

mod whitelist;
pub use whitelist::*;

mod predicate;
pub use predicate::*;

mod filter;
pub use filter::*;

mod order;
pub use order::*;

mod pagination;
pub use pagination::*;

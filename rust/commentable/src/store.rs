use async_trait::async_trait;
use commentable_query::{OrderClause, Page, Predicate};

use crate::{Comment, CommentId, StoreError};

/// A compiled list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Rows must satisfy every condition.
    pub predicate: Predicate,
    /// Sort keys in priority order. Stores break ties by identifier.
    pub order: Vec<OrderClause>,
    pub limit: u32,
    pub offset: u64,
    /// Whether to compute the number of matching rows.
    pub include_count: bool,
}

impl ListQuery {
    pub fn new(predicate: Predicate, order: Vec<OrderClause>, page: &Page) -> Self {
        Self {
            predicate,
            order,
            limit: page.limit,
            offset: page.offset,
            include_count: page.include_count,
        }
    }
}

/// One page of a list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub items: Vec<Comment>,
    /// Total matching rows, when requested.
    pub total: Option<u64>,
}

/// Persistence for comments.
///
/// Implementations translate the dialect-neutral [`Predicate`] into their
/// own query language. Nothing here is authorization aware; callers only
/// hand over queries the authorizer has already bounded.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Fetch one comment.
    async fn get(&self, id: &CommentId) -> Result<Option<Comment>, StoreError>;

    /// Insert a new comment.
    async fn create(&self, comment: Comment) -> Result<(), StoreError>;

    /// Replace an existing comment.
    async fn update(&self, id: &CommentId, comment: Comment) -> Result<(), StoreError>;

    /// Remove a comment together with its replies.
    async fn delete(&self, id: &CommentId) -> Result<(), StoreError>;

    /// Fetch one page of matching comments.
    async fn list(&self, query: &ListQuery) -> Result<Listing, StoreError>;
}

use std::{cmp::Ordering, collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use commentable_query::{Direction, OrderClause, Record};
use tokio::sync::RwLock;

use crate::{Comment, CommentId, CommentStore, ListQuery, Listing, StoreError};

/// A [`CommentStore`] that keeps every comment in memory.
///
/// Clones share the same comments.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    comments: Arc<RwLock<BTreeMap<CommentId, Comment>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored comments.
    pub async fn len(&self) -> usize {
        self.comments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.comments.read().await.is_empty()
    }
}

fn compare(left: &Comment, right: &Comment, order: &[OrderClause]) -> Ordering {
    order
        .iter()
        .map(|clause| {
            let ordering = left.column(&clause.column).cmp(&right.column(&clause.column));
            match clause.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| left.id.cmp(&right.id))
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn get(&self, id: &CommentId) -> Result<Option<Comment>, StoreError> {
        Ok(self.comments.read().await.get(id).cloned())
    }

    async fn create(&self, comment: Comment) -> Result<(), StoreError> {
        let mut comments = self.comments.write().await;
        if comments.contains_key(&comment.id) {
            return Err(StoreError::Conflict {
                id: comment.id.to_string(),
            });
        }
        comments.insert(comment.id.clone(), comment);
        Ok(())
    }

    async fn update(&self, id: &CommentId, comment: Comment) -> Result<(), StoreError> {
        let mut comments = self.comments.write().await;
        match comments.get_mut(id) {
            Some(existing) => {
                *existing = comment;
                Ok(())
            }
            None => Err(StoreError::Missing { id: id.to_string() }),
        }
    }

    async fn delete(&self, id: &CommentId) -> Result<(), StoreError> {
        let mut comments = self.comments.write().await;
        if comments.remove(id).is_none() {
            return Err(StoreError::Missing { id: id.to_string() });
        }

        let mut orphaned = vec![id.clone()];
        while let Some(parent) = orphaned.pop() {
            let replies: Vec<CommentId> = comments
                .values()
                .filter(|comment| comment.parent_id.as_ref() == Some(&parent))
                .map(|comment| comment.id.clone())
                .collect();
            for reply in replies {
                comments.remove(&reply);
                orphaned.push(reply);
            }
        }
        Ok(())
    }

    async fn list(&self, query: &ListQuery) -> Result<Listing, StoreError> {
        let comments = self.comments.read().await;
        let mut matching: Vec<&Comment> = comments
            .values()
            .filter(|comment| query.predicate.matches(*comment))
            .collect();
        matching.sort_by(|left, right| compare(left, right, &query.order));

        let total = query.include_count.then_some(matching.len() as u64);
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(Listing { items, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Authorship, Status};
    use chrono::{Duration, TimeZone, Utc};
    use commentable_query::{Condition, Operator, Predicate};
    use pretty_assertions::assert_eq;

    fn comment(id: &str, parent: Option<&str>, minutes: i64, status: Status) -> Comment {
        Comment {
            id: CommentId::from(id),
            authorship: Authorship::Principal("u1".into()),
            commentable: "post".into(),
            commentable_id: "p1".into(),
            parent_id: parent.map(CommentId::from),
            content: format!("comment {id}"),
            status,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
            updated_at: None,
        }
    }

    async fn seeded() -> anyhow::Result<MemoryStore> {
        let store = MemoryStore::new();
        store.create(comment("a", None, 3, Status::Published)).await?;
        store.create(comment("b", Some("a"), 1, Status::Awaiting)).await?;
        store.create(comment("c", Some("b"), 2, Status::Published)).await?;
        store.create(comment("d", None, 0, Status::Published)).await?;
        Ok(store)
    }

    fn ids(listing: &Listing) -> Vec<&str> {
        listing.items.iter().map(|comment| comment.id.as_str()).collect()
    }

    #[tokio::test]
    async fn it_filters_orders_and_pages() -> anyhow::Result<()> {
        let store = seeded().await?;
        let query = ListQuery {
            predicate: Predicate::new(vec![Condition {
                column: "status".into(),
                operator: Operator::Eq,
                values: vec!["published".into()],
            }]),
            order: vec![OrderClause {
                field: "createdAt".into(),
                column: "created_at".into(),
                direction: Direction::Desc,
            }],
            limit: 2,
            offset: 0,
            include_count: true,
        };

        let first = store.list(&query).await?;
        let second = store
            .list(&ListQuery {
                offset: 2,
                include_count: false,
                ..query.clone()
            })
            .await?;

        assert_eq!(ids(&first), vec!["a", "c"]);
        assert_eq!(first.total, Some(3));
        assert_eq!(ids(&second), vec!["d"]);
        assert_eq!(second.total, None);
        Ok(())
    }

    #[tokio::test]
    async fn it_orders_by_identifier_without_sort_keys() -> anyhow::Result<()> {
        let store = seeded().await?;
        let listing = store
            .list(&ListQuery {
                predicate: Predicate::default(),
                order: Vec::new(),
                limit: 10,
                offset: 0,
                include_count: false,
            })
            .await?;

        assert_eq!(ids(&listing), vec!["a", "b", "c", "d"]);
        Ok(())
    }

    #[tokio::test]
    async fn it_cascades_deletes_to_replies() -> anyhow::Result<()> {
        let store = seeded().await?;

        store.delete(&CommentId::from("a")).await?;

        assert_eq!(store.len().await, 1);
        assert!(store.get(&CommentId::from("d")).await?.is_some());
        assert_eq!(
            store.delete(&CommentId::from("a")).await,
            Err(StoreError::Missing { id: "a".into() })
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_rejects_duplicate_and_missing_rows() -> anyhow::Result<()> {
        let store = seeded().await?;

        assert!(matches!(
            store.create(comment("a", None, 0, Status::Draft)).await,
            Err(StoreError::Conflict { .. })
        ));
        assert!(matches!(
            store
                .update(&CommentId::from("z"), comment("z", None, 0, Status::Draft))
                .await,
            Err(StoreError::Missing { .. })
        ));
        Ok(())
    }
}

use std::{borrow::Cow, fmt};

use chrono::{DateTime, Utc};
use commentable_query::{Record, render_timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ulid::Ulid;

use crate::{Status, fields};

/// Opaque, immutable comment identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(String);

impl CommentId {
    /// A fresh, time-ordered identifier.
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CommentId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for CommentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Network metadata recorded for anonymous authors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Client network address.
    pub address: String,
    /// Client agent string.
    pub agent: String,
}

impl Origin {
    pub fn new(address: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            agent: agent.into(),
        }
    }
}

/// Who wrote a comment. Fixed at creation.
///
/// Authenticated authorship never records network metadata, and anonymous
/// authorship never records a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authorship {
    Principal(String),
    Anonymous(Origin),
}

/// A node in a forest of threaded comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub authorship: Authorship,
    /// Kind of resource being commented on, e.g. `post`.
    pub commentable: String,
    /// Identifier of the resource being commented on.
    pub commentable_id: String,
    /// `None` for thread roots.
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    /// Set on every mutation after creation.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Comment {
    /// The owning principal, if the comment was written while authenticated.
    pub fn owner(&self) -> Option<&str> {
        match &self.authorship {
            Authorship::Principal(id) => Some(id),
            Authorship::Anonymous(_) => None,
        }
    }

    /// Origin metadata, if the comment was written anonymously.
    pub fn origin(&self) -> Option<&Origin> {
        match &self.authorship {
            Authorship::Principal(_) => None,
            Authorship::Anonymous(origin) => Some(origin),
        }
    }

    /// Whether the comment is attached to the given resource.
    pub fn is_on(&self, commentable: &str, commentable_id: &str) -> bool {
        self.commentable == commentable && self.commentable_id == commentable_id
    }

    /// Every populated field under its external name. Absent values are
    /// omitted rather than rendered as null.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let mut put = |field: &str, value: Value| {
            map.insert(field.to_owned(), value);
        };

        put(fields::ID, self.id.as_str().into());
        match &self.authorship {
            Authorship::Principal(id) => put(fields::USER_ID, id.as_str().into()),
            Authorship::Anonymous(origin) => {
                put(fields::IP_ADDRESS, origin.address.as_str().into());
                put(fields::USER_AGENT, origin.agent.as_str().into());
            }
        }
        put(fields::COMMENTABLE_ID, self.commentable_id.as_str().into());
        put(fields::COMMENTABLE, self.commentable.as_str().into());
        if let Some(parent) = &self.parent_id {
            put(fields::PARENT_ID, parent.as_str().into());
        }
        put(fields::CONTENT, self.content.as_str().into());
        put(fields::STATUS, self.status.as_str().into());
        if let Some(updated_at) = &self.updated_at {
            put(fields::UPDATED_AT, render_timestamp(updated_at).into());
        }
        put(fields::CREATED_AT, render_timestamp(&self.created_at).into());

        map
    }
}

impl Record for Comment {
    fn column(&self, column: &str) -> Option<Cow<'_, str>> {
        let value = match column {
            "id" => Cow::Borrowed(self.id.as_str()),
            "user_id" => Cow::Borrowed(self.owner()?),
            "commentable_id" => Cow::Borrowed(self.commentable_id.as_str()),
            "commentable" => Cow::Borrowed(self.commentable.as_str()),
            "parent_id" => Cow::Borrowed(self.parent_id.as_ref()?.as_str()),
            "content" => Cow::Borrowed(self.content.as_str()),
            "status" => Cow::Borrowed(self.status.as_str()),
            "ip_address" => Cow::Borrowed(self.origin()?.address.as_str()),
            "user_agent" => Cow::Borrowed(self.origin()?.agent.as_str()),
            "updated_at" => Cow::Owned(render_timestamp(self.updated_at.as_ref()?)),
            "created_at" => Cow::Owned(render_timestamp(&self.created_at)),
            _ => return None,
        };
        Some(value)
    }
}

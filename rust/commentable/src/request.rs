use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CommentId, Status, ValidationError};

/// Makes comment bodies safe to store and render.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, text: &str) -> String;
}

/// Escapes the characters that are significant in HTML so bodies can only
/// ever render as plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl Sanitizer for PlainText {
    fn sanitize(&self, text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for character in text.chars() {
            match character {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '\'' => escaped.push_str("&#39;"),
                '"' => escaped.push_str("&#34;"),
                other => escaped.push(other),
            }
        }
        escaped
    }
}

/// Trim, bound and sanitize a comment body.
pub(crate) fn clean_content(
    content: &str,
    max_length: usize,
    sanitizer: &dyn Sanitizer,
) -> Result<String, ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    if trimmed.len() > max_length {
        return Err(ValidationError::ContentTooLong {
            max: max_length,
            length: trimmed.len(),
        });
    }
    Ok(sanitizer.sanitize(trimmed))
}

/// A request to create a comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub commentable_id: String,
    pub commentable: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
    pub content: String,
}

impl CreateCommentRequest {
    /// Check required fields and clean the body.
    ///
    /// Whether the commentable type is allowed is an authorization question
    /// and is answered by [`CommentAuthorizer::authorize_create`].
    ///
    /// [`CommentAuthorizer::authorize_create`]: crate::CommentAuthorizer::authorize_create
    pub fn validate(
        self,
        max_content_length: usize,
        sanitizer: &dyn Sanitizer,
    ) -> Result<Self, ValidationError> {
        let commentable_id = self.commentable_id.trim();
        if commentable_id.is_empty() {
            return Err(ValidationError::MissingField {
                field: "commentableId",
            });
        }
        if self.commentable.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "commentable",
            });
        }

        Ok(Self {
            commentable_id: commentable_id.to_owned(),
            content: clean_content(&self.content, max_content_length, sanitizer)?,
            ..self
        })
    }
}

/// A request to change a comment.
///
/// Only `content` and `status` can change. Any other key in the body is kept
/// in `other` so it can be refused explicitly rather than ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// A validated [`UpdateCommentRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// New body, already cleaned.
    pub content: Option<String>,
    pub status: Option<Status>,
    /// Names of any other fields the request tried to change.
    pub other: Vec<String>,
}

impl ChangeSet {
    /// External names of every field the change touches.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        let content: Option<&str> = self.content.as_ref().map(|_| crate::fields::CONTENT);
        let status: Option<&str> = self.status.map(|_| crate::fields::STATUS);

        content
            .into_iter()
            .chain(status)
            .chain(self.other.iter().map(String::as_str))
    }
}

impl UpdateCommentRequest {
    pub fn validate(
        self,
        max_content_length: usize,
        sanitizer: &dyn Sanitizer,
    ) -> Result<ChangeSet, ValidationError> {
        if self.content.is_none() && self.status.is_none() && self.other.is_empty() {
            return Err(ValidationError::EmptyUpdate);
        }

        let content = self
            .content
            .map(|content| clean_content(&content, max_content_length, sanitizer))
            .transpose()?;
        let status = self
            .status
            .map(|status| status.parse::<Status>())
            .transpose()?;

        Ok(ChangeSet {
            content,
            status,
            other: self.other.into_keys().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_escapes_markup() {
        assert_eq!(
            PlainText.sanitize(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&#34;Tom&#34; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn it_trims_then_bounds_then_escapes_content() {
        assert_eq!(clean_content("  a<b  ", 3, &PlainText), Ok("a&lt;b".into()));
        assert_eq!(clean_content(" \n\t ", 3, &PlainText), Err(ValidationError::EmptyContent));
        assert_eq!(
            clean_content("abcd", 3, &PlainText),
            Err(ValidationError::ContentTooLong { max: 3, length: 4 })
        );
    }

    #[test]
    fn it_requires_a_target() {
        let request = CreateCommentRequest {
            commentable: "post".into(),
            content: "hi".into(),
            ..Default::default()
        };

        assert_eq!(
            request.validate(100, &PlainText),
            Err(ValidationError::MissingField {
                field: "commentableId"
            })
        );
    }

    #[test]
    fn it_collects_unexpected_update_fields() -> testresult::TestResult {
        let request: UpdateCommentRequest =
            serde_json::from_str(r#"{"status": "published", "id": "x", "ipAddress": "1.2.3.4"}"#)?;
        let changes = request.validate(100, &PlainText)?;

        assert_eq!(changes.status, Some(Status::Published));
        assert_eq!(
            changes.fields().collect::<Vec<_>>(),
            vec!["status", "id", "ipAddress"]
        );
        Ok(())
    }

    #[test]
    fn it_rejects_empty_and_invalid_updates() {
        assert_eq!(
            UpdateCommentRequest::default().validate(100, &PlainText),
            Err(ValidationError::EmptyUpdate)
        );
        assert_eq!(
            UpdateCommentRequest {
                status: Some("archived".into()),
                ..Default::default()
            }
            .validate(100, &PlainText),
            Err(ValidationError::InvalidStatus {
                value: "archived".into()
            })
        );
    }
}

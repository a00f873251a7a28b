use std::collections::BTreeSet;

use commentable_policy::{FieldPolicyTable, PermissionVoter, RoleSet};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    Authorship, ChangeSet, Comment, CommentableConfig, CommentableError, ConfigurationError,
    CreateCommentRequest, Principal, Redaction, Status, StatusMachine, ValidationError, fields,
};

/// A comment as one principal is allowed to see it.
///
/// Fields the principal may not read are omitted, never nulled out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CommentView {
    fields: Map<String, Value>,
    #[serde(skip)]
    redacted: bool,
}

impl CommentView {
    /// The value of an external field, if visible.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The comment identifier. Always visible under the default policies.
    pub fn id(&self) -> Option<&str> {
        self.get(fields::ID).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl Redaction for CommentView {
    fn is_redacted(&self) -> bool {
        self.redacted
    }
}

/// What a create request becomes once authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// The status the comment starts in. Clients cannot choose it.
    pub status: Status,
    pub authorship: Authorship,
}

/// Decides who may see and change comments.
///
/// Every method is a pure function of its inputs. The authorizer is built
/// once from configuration and shared between requests.
#[derive(Debug)]
pub struct CommentAuthorizer {
    voter: PermissionVoter,
    fields: FieldPolicyTable,
    statuses: StatusMachine,
    allowed_types: BTreeSet<String>,
}

impl CommentAuthorizer {
    /// Validate configuration and build an authorizer.
    pub fn new(config: &CommentableConfig) -> Result<Self, ConfigurationError> {
        let compiled = config.compile()?;

        Ok(Self {
            voter: compiled.voter,
            fields: compiled.fields,
            statuses: StatusMachine::new(compiled.default_status),
            allowed_types: config.allowed_types.iter().cloned().collect(),
        })
    }

    pub fn voter(&self) -> &PermissionVoter {
        &self.voter
    }

    pub fn field_policies(&self) -> &FieldPolicyTable {
        &self.fields
    }

    pub fn statuses(&self) -> &StatusMachine {
        &self.statuses
    }

    /// The principal's declared roles expanded under the hierarchy.
    pub fn roles(&self, principal: &Principal) -> RoleSet {
        self.voter.resolve(principal.roles())
    }

    /// Whether the roles may see unpublished comments.
    pub fn can_moderate(&self, roles: &RoleSet) -> bool {
        self.voter.can_moderate(roles)
    }

    /// Whether the roles may read an external field.
    pub fn can_read_field(&self, roles: &RoleSet, field: &str) -> bool {
        self.fields.can_read(&self.voter, roles, field)
    }

    /// Whether the principal wrote the comment while authenticated.
    ///
    /// Anonymous comments have no owner, so nobody owns them.
    pub fn is_owner(&self, principal: &Principal, comment: &Comment) -> bool {
        match (principal.id(), comment.owner()) {
            (Some(principal), Some(owner)) => principal == owner,
            _ => false,
        }
    }

    /// Whether the comment's status lets these roles see it.
    pub fn is_visible(&self, roles: &RoleSet, comment: &Comment) -> bool {
        comment.status.is_public() || self.can_moderate(roles)
    }

    /// Check the target type and decide the initial status and authorship.
    pub fn authorize_create(
        &self,
        principal: &Principal,
        request: &CreateCommentRequest,
    ) -> Result<Admission, CommentableError> {
        if !self.allowed_types.contains(&request.commentable) {
            tracing::debug!(
                commentable = %request.commentable,
                "Rejected comment on a disallowed type"
            );
            return Err(ValidationError::DisallowedType {
                value: request.commentable.clone(),
                allowed: self.allowed_types.iter().cloned().collect(),
            }
            .into());
        }

        let authorship = match principal.id() {
            Some(id) => Authorship::Principal(id.to_owned()),
            None => Authorship::Anonymous(principal.origin().clone()),
        };

        Ok(Admission {
            status: self.statuses.initial(),
            authorship,
        })
    }

    /// The comment as the roles may see it, or `None` when they may not see
    /// it at all. Callers must report `None` as not found.
    pub fn authorize_read(&self, roles: &RoleSet, comment: &Comment) -> Option<CommentView> {
        if !self.is_visible(roles, comment) {
            tracing::debug!(comment = %comment.id, status = %comment.status, "Hid comment");
            return None;
        }
        Some(self.redact(roles, comment))
    }

    /// Drop every field the roles may not read, without checking visibility.
    pub fn redact(&self, roles: &RoleSet, comment: &Comment) -> CommentView {
        let mut fields = comment.to_fields();
        let before = fields.len();
        fields.retain(|field, _| self.can_read_field(roles, field));

        CommentView {
            redacted: fields.len() != before,
            fields,
        }
    }

    /// Check a change set against an existing comment.
    ///
    /// Every field is checked before anything is returned, so a change is
    /// authorized as a whole or not at all:
    ///
    /// - fields with no policy are not part of a comment;
    /// - only `content` and `status` may change;
    /// - `content` may only be changed by the owner, whatever their roles;
    /// - `status` needs the field's write role.
    pub fn authorize_update(
        &self,
        principal: &Principal,
        existing: &Comment,
        changes: &ChangeSet,
    ) -> Result<(), CommentableError> {
        if let Some(field) = changes
            .other
            .iter()
            .find(|field| self.fields.get(field).is_none())
        {
            return Err(ValidationError::UnknownField {
                field: field.clone(),
            }
            .into());
        }

        if let Some(field) = changes.other.first() {
            tracing::debug!(comment = %existing.id, field = %field, "Rejected update of immutable field");
            let reason = if self.fields.is_system_managed(field) {
                format!("Field '{field}' is read-only")
            } else {
                format!("Field '{field}' cannot be changed")
            };
            return Err(CommentableError::forbidden(reason));
        }

        if changes.content.is_some() && !self.is_owner(principal, existing) {
            tracing::debug!(comment = %existing.id, "Rejected content edit by non-owner");
            return Err(CommentableError::forbidden(
                "You can only edit your own comments",
            ));
        }

        // Content is governed by ownership alone; every other change needs
        // its field's write role.
        let roles = self.roles(principal);
        self.fields.check_writes(
            &self.voter,
            &roles,
            changes.fields().filter(|field| *field != fields::CONTENT),
        )?;

        if let Some(status) = changes.status {
            if !self.statuses.permits(existing.status, status) {
                return Err(CommentableError::forbidden(format!(
                    "Cannot move a comment from {} to {status}",
                    existing.status
                )));
            }
        }

        Ok(())
    }

    /// Only the owner may delete a comment.
    pub fn authorize_delete(
        &self,
        principal: &Principal,
        existing: &Comment,
    ) -> Result<(), CommentableError> {
        if self.is_owner(principal, existing) {
            Ok(())
        } else {
            tracing::debug!(comment = %existing.id, "Rejected delete by non-owner");
            Err(CommentableError::forbidden(
                "You can only delete your own comments",
            ))
        }
    }
}

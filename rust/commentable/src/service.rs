use chrono::Utc;
use commentable_policy::RoleSet;
use commentable_query::{
    Audience, FilterCompiler, ORDER_KEY, OrderCompiler, PaginationGuard, QueryKey,
    QueryParameters, Whitelist,
};
use tracing::{debug, info, warn};

use crate::{
    Collection, Comment, CommentAuthorizer, CommentId, CommentStore, CommentView,
    CommentableConfig, CommentableError, ConfigurationError, CreateCommentRequest, ListQuery,
    PlainText, Principal, Sanitizer, Status, StoreError, UpdateCommentRequest, ValidationError,
    fields,
};

/// List, read, create, update and delete comments on behalf of principals.
///
/// The service owns no transport. It composes the [`CommentAuthorizer`], the
/// query compilers and a [`CommentStore`], and reports every refusal as a
/// [`CommentableError`] whose [`denial`] tells the transport how to answer.
///
/// [`denial`]: CommentableError::denial
pub struct CommentService<S> {
    authorizer: CommentAuthorizer,
    whitelist: Whitelist,
    filters: FilterCompiler,
    orders: OrderCompiler,
    pages: PaginationGuard,
    max_content_length: usize,
    max_nesting_depth: Option<u32>,
    sanitizer: Box<dyn Sanitizer>,
    store: S,
}

impl<S> CommentService<S>
where
    S: CommentStore,
{
    /// Validate configuration and build a service over `store`.
    pub fn new(config: &CommentableConfig, store: S) -> Result<Self, ConfigurationError> {
        let authorizer = CommentAuthorizer::new(config).inspect_err(|error| {
            warn!(%error, "Refusing invalid comment configuration");
        })?;
        let whitelist = fields::whitelist(&config.allowed_types);

        info!(
            allowed_types = ?config.allowed_types,
            default_status = %authorizer.statuses().initial(),
            nesting = config.enable_nesting,
            "Comment service configured"
        );

        Ok(Self {
            filters: FilterCompiler::new(whitelist.clone())
                .with_max_values(config.max_filter_values)
                .with_public_constraint(fields::STATUS, Status::Published.as_str()),
            orders: OrderCompiler::new(whitelist.clone()),
            pages: PaginationGuard::new(
                config.pagination_limit,
                config.max_pagination_limit,
                config.max_page,
            ),
            max_content_length: config.max_content_length,
            max_nesting_depth: config.enable_nesting.then_some(config.max_nesting_depth),
            sanitizer: Box::new(PlainText),
            authorizer,
            whitelist,
            store,
        })
    }

    /// Replace the body sanitizer.
    pub fn with_sanitizer(mut self, sanitizer: impl Sanitizer + 'static) -> Self {
        self.sanitizer = Box::new(sanitizer);
        self
    }

    pub fn authorizer(&self) -> &CommentAuthorizer {
        &self.authorizer
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// One page of the comments matching `parameters` that the principal
    /// may see.
    pub async fn list(
        &self,
        principal: &Principal,
        parameters: &QueryParameters,
    ) -> Result<Collection<CommentView>, CommentableError> {
        let roles = self.authorizer.roles(principal);
        self.reject_unreadable_fields(&roles, parameters)?;

        let audience = if self.authorizer.can_moderate(&roles) {
            Audience::Privileged
        } else {
            Audience::Public
        };
        let filter = self.filters.compile(parameters, audience).inspect_err(|error| {
            debug!(%error, "Rejected comment filter");
        })?;
        let order = self.orders.compile(parameters)?;
        let page = self.pages.from_parameters(parameters);

        let listing = self
            .store
            .list(&ListQuery::new(filter.predicate(), order, &page))
            .await
            .inspect_err(log_store_failure)?;

        let items = listing
            .items
            .iter()
            .filter_map(|comment| self.authorizer.authorize_read(&roles, comment))
            .collect();

        Ok(Collection {
            items,
            total: listing.total,
            limit: page.limit,
            page: page.page,
        })
    }

    /// A single comment, or not found when it is missing or hidden.
    pub async fn get(
        &self,
        principal: &Principal,
        id: &CommentId,
    ) -> Result<CommentView, CommentableError> {
        let roles = self.authorizer.roles(principal);
        let comment = self.fetch(id).await?;

        self.authorizer
            .authorize_read(&roles, &comment)
            .ok_or(CommentableError::NotFound)
    }

    /// Validate, authorize and store a new comment.
    pub async fn create(
        &self,
        principal: &Principal,
        request: CreateCommentRequest,
    ) -> Result<CommentView, CommentableError> {
        let request = request.validate(self.max_content_length, &*self.sanitizer)?;
        let admission = self.authorizer.authorize_create(principal, &request)?;
        let roles = self.authorizer.roles(principal);

        if let Some(parent_id) = &request.parent_id {
            self.check_parent(&roles, &request, parent_id).await?;
        }

        let comment = Comment {
            id: CommentId::generate(),
            authorship: admission.authorship,
            commentable: request.commentable,
            commentable_id: request.commentable_id,
            parent_id: request.parent_id,
            content: request.content,
            status: admission.status,
            created_at: Utc::now(),
            updated_at: None,
        };

        self.store
            .create(comment.clone())
            .await
            .inspect_err(log_store_failure)?;
        info!(comment = %comment.id, status = %comment.status, "Created comment");

        Ok(self.authorizer.redact(&roles, &comment))
    }

    /// Apply an authorized change to an existing comment.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &CommentId,
        request: UpdateCommentRequest,
    ) -> Result<CommentView, CommentableError> {
        let changes = request.validate(self.max_content_length, &*self.sanitizer)?;
        let existing = self.fetch(id).await?;
        let roles = self.authorizer.roles(principal);
        self.hide_from_strangers(principal, &roles, &existing)?;

        self.authorizer
            .authorize_update(principal, &existing, &changes)?;

        let mut updated = existing;
        if let Some(content) = changes.content {
            updated.content = content;
        }
        if let Some(status) = changes.status {
            updated.status = status;
        }
        updated.updated_at = Some(Utc::now());

        self.store
            .update(id, updated.clone())
            .await
            .inspect_err(log_store_failure)?;
        info!(comment = %id, status = %updated.status, "Updated comment");

        Ok(self.authorizer.redact(&roles, &updated))
    }

    /// Delete a comment and its replies.
    pub async fn delete(
        &self,
        principal: &Principal,
        id: &CommentId,
    ) -> Result<(), CommentableError> {
        let existing = self.fetch(id).await?;
        let roles = self.authorizer.roles(principal);
        self.hide_from_strangers(principal, &roles, &existing)?;

        self.authorizer.authorize_delete(principal, &existing)?;

        self.store
            .delete(id)
            .await
            .inspect_err(log_store_failure)?;
        info!(comment = %id, "Deleted comment");
        Ok(())
    }

    async fn fetch(&self, id: &CommentId) -> Result<Comment, CommentableError> {
        self.store
            .get(id)
            .await
            .inspect_err(log_store_failure)?
            .ok_or(CommentableError::NotFound)
    }

    /// Comments the principal can neither see nor owns do not exist as far
    /// as the principal is concerned.
    fn hide_from_strangers(
        &self,
        principal: &Principal,
        roles: &RoleSet,
        comment: &Comment,
    ) -> Result<(), CommentableError> {
        if self.authorizer.is_visible(roles, comment) || self.authorizer.is_owner(principal, comment)
        {
            Ok(())
        } else {
            debug!(comment = %comment.id, "Hid comment from non-owner");
            Err(CommentableError::NotFound)
        }
    }

    /// Filtering or sorting on a field reveals its values even when the
    /// field itself is redacted, so such requests are answered as if nothing
    /// matched the field at all.
    fn reject_unreadable_fields(
        &self,
        roles: &RoleSet,
        parameters: &QueryParameters,
    ) -> Result<(), CommentableError> {
        for (key, _) in parameters.iter() {
            let Ok(key) = QueryKey::parse(key) else {
                continue;
            };
            let field = match (key.is_reserved(), key.name, key.modifier) {
                (false, name, _) => name,
                (true, ORDER_KEY, Some(field)) => field,
                (true, _, _) => continue,
            };

            if self.whitelist.get(field).is_some()
                && !self.authorizer.can_read_field(roles, field)
            {
                debug!(field, "Rejected query on unreadable field");
                return Err(CommentableError::NotFound);
            }
        }
        Ok(())
    }

    async fn check_parent(
        &self,
        roles: &RoleSet,
        request: &CreateCommentRequest,
        parent_id: &CommentId,
    ) -> Result<(), CommentableError> {
        let Some(max_depth) = self.max_nesting_depth else {
            return Err(ValidationError::NestingDisabled.into());
        };

        let parent = self
            .store
            .get(parent_id)
            .await
            .inspect_err(log_store_failure)?
            .filter(|parent| self.authorizer.is_visible(roles, parent))
            .ok_or(ValidationError::ParentNotFound)?;

        if !parent.is_on(&request.commentable, &request.commentable_id) {
            return Err(ValidationError::ParentMismatch.into());
        }

        if self.depth_of(&parent, max_depth).await? + 1 > max_depth {
            return Err(ValidationError::NestingTooDeep { max: max_depth }.into());
        }
        Ok(())
    }

    /// How many ancestors the comment has, counting no further than one past
    /// `limit`.
    async fn depth_of(&self, comment: &Comment, limit: u32) -> Result<u32, CommentableError> {
        let mut depth = 0;
        let mut ancestor = comment.parent_id.clone();

        while let Some(id) = ancestor {
            depth += 1;
            if depth > limit {
                break;
            }
            ancestor = self
                .store
                .get(&id)
                .await
                .inspect_err(log_store_failure)?
                .and_then(|comment| comment.parent_id);
        }
        Ok(depth)
    }
}

fn log_store_failure(error: &StoreError) {
    warn!(%error, "Comment store failed");
}

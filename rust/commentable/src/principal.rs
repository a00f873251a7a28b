use commentable_policy::Role;

use crate::Origin;

/// The actor behind a request.
///
/// The transport builds one per request from its authentication layer. The
/// origin is always recorded because anonymous authorship needs it; it is
/// only ever stored for anonymous comments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    id: Option<String>,
    roles: Vec<Role>,
    origin: Origin,
}

impl Principal {
    /// An authenticated principal with its declared roles.
    pub fn authenticated<R>(id: impl Into<String>, roles: impl IntoIterator<Item = R>) -> Self
    where
        R: Into<Role>,
    {
        Self {
            id: Some(id.into()),
            roles: roles.into_iter().map(Into::into).collect(),
            origin: Origin::default(),
        }
    }

    /// An unauthenticated principal.
    pub fn anonymous(origin: Origin) -> Self {
        Self {
            id: None,
            roles: Vec::new(),
            origin,
        }
    }

    /// Attach network metadata.
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// The principal identifier, if authenticated.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.id.is_some()
    }

    /// Roles as declared, before hierarchy expansion.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}

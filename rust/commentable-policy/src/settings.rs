use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Role;

/// How role requirements treat a principal that holds no roles at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPolicy {
    /// A principal without roles satisfies only public requirements.
    #[default]
    DenyAll,
    /// A principal without roles satisfies every role requirement.
    AllowAll,
}

/// Configuration for a [`PermissionVoter`].
///
/// [`PermissionVoter`]: crate::PermissionVoter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicySettings {
    /// Every role name the deployment knows about.
    pub roles: Vec<Role>,
    /// The role that bypasses field and status checks.
    pub superuser: Role,
    /// The least role that may see unpublished content.
    pub moderator: Role,
    /// Direct implications; closure is computed when the voter is built.
    pub hierarchy: BTreeMap<Role, Vec<Role>>,
    /// Treatment of principals that hold no roles.
    pub default_policy: DefaultPolicy,
    /// Memoize role resolution per distinct declared role list.
    pub cache: bool,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            roles: ["admin", "writer", "moderator", "reader"]
                .into_iter()
                .map(Role::from)
                .collect(),
            superuser: Role::from("admin"),
            moderator: Role::from("moderator"),
            hierarchy: BTreeMap::from([
                (Role::from("writer"), vec![Role::from("moderator")]),
                (Role::from("moderator"), vec![Role::from("reader")]),
            ]),
            default_policy: DefaultPolicy::DenyAll,
            cache: true,
        }
    }
}

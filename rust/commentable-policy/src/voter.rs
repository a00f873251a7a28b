use dashmap::DashMap;

use crate::{
    Access, DefaultPolicy, PolicyConfigurationError, PolicySettings, Role, RoleHierarchy, RoleSet,
};

/// Decides whether a resolved role set satisfies an access requirement.
///
/// A voter is built once from [`PolicySettings`] and is read-only afterwards,
/// so it can be shared freely between concurrent requests. When caching is
/// enabled, resolved role sets are memoized by their declared input. Only
/// inputs made entirely of known roles are cached, which bounds the cache by
/// the vocabulary. The cache is never invalidated; reloading policy means
/// building a new voter.
#[derive(Debug)]
pub struct PermissionVoter {
    hierarchy: RoleHierarchy,
    superuser: Role,
    moderator: Role,
    default_policy: DefaultPolicy,
    cache: Option<DashMap<Vec<Role>, RoleSet>>,
}

impl PermissionVoter {
    /// Validate settings and build a voter.
    pub fn new(settings: &PolicySettings) -> Result<Self, PolicyConfigurationError> {
        let hierarchy = RoleHierarchy::new(&settings.roles, &settings.hierarchy)?;

        for (role, context) in [
            (&settings.superuser, "the superuser setting"),
            (&settings.moderator, "the moderator setting"),
        ] {
            if !hierarchy.knows(role.as_str()) {
                return Err(PolicyConfigurationError::UnknownRole {
                    role: role.clone(),
                    context: context.into(),
                });
            }
        }

        Ok(Self {
            hierarchy,
            superuser: settings.superuser.clone(),
            moderator: settings.moderator.clone(),
            default_policy: settings.default_policy,
            cache: settings.cache.then(DashMap::new),
        })
    }

    /// The validated hierarchy backing this voter.
    pub fn hierarchy(&self) -> &RoleHierarchy {
        &self.hierarchy
    }

    /// The superuser role.
    pub fn superuser(&self) -> &Role {
        &self.superuser
    }

    /// The least role that may see unpublished content.
    pub fn moderator(&self) -> &Role {
        &self.moderator
    }

    /// Expand a principal's declared roles under the hierarchy.
    pub fn resolve(&self, declared: &[Role]) -> RoleSet {
        let Some(cache) = &self.cache else {
            return self.hierarchy.resolve(declared);
        };
        if !declared.iter().all(|role| self.hierarchy.knows(role.as_str())) {
            return self.hierarchy.resolve(declared);
        }

        let mut key = declared.to_vec();
        key.sort();
        key.dedup();

        if let Some(resolved) = cache.get(&key) {
            return resolved.clone();
        }

        let resolved = self.hierarchy.resolve(&key);
        cache.insert(key, resolved.clone());
        resolved
    }

    /// Whether the role set holds the superuser role.
    pub fn is_superuser(&self, roles: &RoleSet) -> bool {
        roles.contains(self.superuser.as_str())
    }

    /// Whether the role set satisfies `required`.
    ///
    /// The superuser satisfies every requirement, [`Access::Nobody`]
    /// included. Enforcing that system-managed fields stay unwritable is the
    /// job of [`FieldPolicyTable::check_write`].
    ///
    /// [`FieldPolicyTable::check_write`]: crate::FieldPolicyTable::check_write
    pub fn allows(&self, roles: &RoleSet, required: &Access) -> bool {
        if self.is_superuser(roles) {
            return true;
        }

        match required {
            Access::Public => true,
            Access::Nobody => false,
            Access::Role(role) => {
                roles.contains(role.as_str())
                    || (roles.is_empty() && self.default_policy == DefaultPolicy::AllowAll)
            }
        }
    }

    /// Whether the role set holds `role` after resolution, or is the
    /// superuser.
    pub fn has_role(&self, roles: &RoleSet, role: &Role) -> bool {
        self.is_superuser(roles) || roles.contains(role.as_str())
    }

    /// Whether the role set reaches the moderator threshold.
    pub fn can_moderate(&self, roles: &RoleSet) -> bool {
        self.has_role(roles, &self.moderator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn voter() -> PermissionVoter {
        PermissionVoter::new(&PolicySettings::default()).unwrap()
    }

    fn declared(names: &[&str]) -> Vec<Role> {
        names.iter().copied().map(Role::from).collect()
    }

    #[test]
    fn it_denies_role_requirements_to_anonymous_principals() {
        let voter = voter();
        let roles = voter.resolve(&[]);

        assert!(voter.allows(&roles, &Access::Public));
        assert!(!voter.allows(&roles, &Access::from("reader")));
        assert!(!voter.allows(&roles, &Access::Nobody));
    }

    #[test]
    fn it_allows_role_requirements_to_anonymous_principals_under_allow_all() {
        let voter = PermissionVoter::new(&PolicySettings {
            default_policy: DefaultPolicy::AllowAll,
            ..PolicySettings::default()
        })
        .unwrap();

        assert!(voter.allows(&RoleSet::empty(), &Access::from("moderator")));
        assert!(!voter.allows(&RoleSet::empty(), &Access::Nobody));
    }

    #[test]
    fn it_honours_inherited_roles() {
        let voter = voter();
        let writer = voter.resolve(&declared(&["writer"]));
        let reader = voter.resolve(&declared(&["reader"]));

        assert!(voter.allows(&writer, &Access::from("moderator")));
        assert!(!voter.allows(&reader, &Access::from("moderator")));
        assert!(voter.has_role(&writer, &Role::from("reader")));
        assert!(voter.can_moderate(&writer));
        assert!(!voter.can_moderate(&reader));
    }

    #[test]
    fn it_identifies_the_superuser() {
        let voter = voter();

        assert!(voter.is_superuser(&voter.resolve(&declared(&["admin"]))));
        assert!(!voter.is_superuser(&voter.resolve(&declared(&["writer"]))));
    }

    #[test]
    fn it_rejects_an_unknown_superuser() {
        let result = PermissionVoter::new(&PolicySettings {
            superuser: Role::from("root"),
            ..PolicySettings::default()
        });

        assert!(matches!(
            result,
            Err(PolicyConfigurationError::UnknownRole { role, .. }) if role.as_str() == "root"
        ));
    }

    #[test]
    fn it_rejects_an_unknown_moderator_role() {
        let result = PermissionVoter::new(&PolicySettings {
            moderator: Role::from("janitor"),
            ..PolicySettings::default()
        });

        assert!(matches!(
            result,
            Err(PolicyConfigurationError::UnknownRole { context, .. }) if context.contains("moderator")
        ));
    }

    #[test]
    fn it_resolves_identically_with_and_without_cache() {
        let cached = voter();
        let uncached = PermissionVoter::new(&PolicySettings {
            cache: false,
            ..PolicySettings::default()
        })
        .unwrap();

        let cases: [&[&str]; 4] = [
            &["writer"],
            &["reader", "moderator"],
            &["moderator", "reader"],
            &[],
        ];

        for names in cases {
            let roles = declared(names);
            assert_eq!(cached.resolve(&roles), uncached.resolve(&roles));
            // Second lookup is served from the cache.
            assert_eq!(cached.resolve(&roles), uncached.resolve(&roles));
        }
    }

    #[test]
    fn it_caches_only_known_role_lists() {
        let voter = voter();

        voter.resolve(&declared(&["writer"]));
        voter.resolve(&declared(&["reader", "writer"]));
        voter.resolve(&declared(&["writer", "reader"]));
        for n in 0..100 {
            let resolved = voter.resolve(&[Role::from(format!("guest-{n}"))]);
            assert_eq!(resolved.len(), 1);
        }

        assert_eq!(voter.cache.as_ref().map(DashMap::len), Some(2));
    }

    fn role_names() -> impl Strategy<Value = Vec<Role>> {
        prop::collection::vec(
            prop::sample::select(vec!["admin", "writer", "moderator", "reader", "guest"]),
            0..6,
        )
        .prop_map(|names| names.into_iter().map(Role::from).collect())
    }

    fn requirements() -> impl Strategy<Value = Access> {
        prop_oneof![
            Just(Access::Public),
            Just(Access::Nobody),
            prop::sample::select(vec!["admin", "writer", "moderator", "reader", "unlisted"])
                .prop_map(Access::from),
        ]
    }

    proptest! {
        #[test]
        fn resolution_is_idempotent(names in role_names()) {
            let voter = voter();
            let once = voter.resolve(&names);
            let twice = voter.resolve(&once.iter().cloned().collect::<Vec<_>>());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn superuser_satisfies_every_requirement(
            names in role_names(),
            required in requirements()
        ) {
            let voter = voter();
            let mut names = names;
            names.push(Role::from("admin"));
            let roles = voter.resolve(&names);
            prop_assert!(voter.allows(&roles, &required));
        }
    }
}

use std::{collections::BTreeSet, path::Path};

use commentable_policy::{FieldPolicy, FieldPolicyTable, PermissionVoter, PolicySettings};
use serde::{Deserialize, Serialize};

use crate::{ConfigurationError, Status, fields};

/// Upper bound for `max_content_length`, in bytes.
pub const CONTENT_LENGTH_CEILING: usize = 1_048_576;
/// Upper bound for `max_nesting_depth`.
pub const NESTING_DEPTH_CEILING: u32 = 100;

/// Deployment configuration for comments.
///
/// Every key is optional and falls back to its default. Load with
/// [`CommentableConfig::from_json`] or [`CommentableConfig::from_path`]; both
/// validate before returning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommentableConfig {
    /// Kinds of resource that may be commented on.
    pub allowed_types: Vec<String>,
    /// Maximum content size in bytes, measured after trimming.
    pub max_content_length: usize,
    /// Page size when the client does not ask for one.
    pub pagination_limit: u32,
    /// Largest page size a client may ask for.
    pub max_pagination_limit: u32,
    /// Largest page number a client may ask for.
    pub max_page: u32,
    /// Largest number of values a single filter may carry.
    pub max_filter_values: usize,
    pub enable_nesting: bool,
    /// Deepest reply level; thread roots are level zero.
    pub max_nesting_depth: u32,
    /// Status given to new comments.
    pub default_status: String,
    pub policy: PolicySettings,
    /// Per-field read and write requirements.
    pub fields: Vec<FieldPolicy>,
}

impl Default for CommentableConfig {
    fn default() -> Self {
        Self {
            allowed_types: vec!["post".into()],
            max_content_length: 10_000,
            pagination_limit: 20,
            max_pagination_limit: 100,
            max_page: 10_000,
            max_filter_values: 50,
            enable_nesting: true,
            max_nesting_depth: 10,
            default_status: Status::Awaiting.as_str().into(),
            policy: PolicySettings::default(),
            fields: fields::default_policies(),
        }
    }
}

/// The validated runtime form of a [`CommentableConfig`].
#[derive(Debug)]
pub(crate) struct Compiled {
    pub default_status: Status,
    pub voter: PermissionVoter,
    pub fields: FieldPolicyTable,
}

impl CommentableConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Check every setting.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.compile().map(|_| ())
    }

    /// Whether comments may be attached to this kind of resource.
    pub fn is_allowed_type(&self, commentable: &str) -> bool {
        self.allowed_types.iter().any(|allowed| allowed == commentable)
    }

    pub(crate) fn compile(&self) -> Result<Compiled, ConfigurationError> {
        if self.allowed_types.is_empty() {
            return Err(ConfigurationError::NoAllowedTypes);
        }
        let mut seen = BTreeSet::new();
        for kind in &self.allowed_types {
            if kind.is_empty() {
                return Err(ConfigurationError::EmptyAllowedType);
            }
            if !seen.insert(kind.as_str()) {
                return Err(ConfigurationError::DuplicateAllowedType {
                    value: kind.clone(),
                });
            }
        }

        if !(1..=CONTENT_LENGTH_CEILING).contains(&self.max_content_length) {
            return Err(ConfigurationError::ContentLength {
                value: self.max_content_length,
                max: CONTENT_LENGTH_CEILING,
            });
        }
        if self.pagination_limit < 1 || self.pagination_limit > self.max_pagination_limit {
            return Err(ConfigurationError::PaginationLimit {
                value: self.pagination_limit,
                max: self.max_pagination_limit,
            });
        }
        if self.max_page < 1 {
            return Err(ConfigurationError::MaxPage);
        }
        if self.max_filter_values < 1 {
            return Err(ConfigurationError::MaxFilterValues);
        }
        if !(1..=NESTING_DEPTH_CEILING).contains(&self.max_nesting_depth) {
            return Err(ConfigurationError::NestingDepth {
                value: self.max_nesting_depth,
                max: NESTING_DEPTH_CEILING,
            });
        }

        if self.default_status.is_empty() {
            return Err(ConfigurationError::EmptyDefaultStatus);
        }
        let default_status: Status =
            self.default_status
                .parse()
                .map_err(|_| ConfigurationError::InvalidDefaultStatus {
                    value: self.default_status.clone(),
                })?;

        let voter = PermissionVoter::new(&self.policy)?;
        let fields = FieldPolicyTable::new(self.fields.iter().cloned())?;
        fields.validate_roles(voter.hierarchy())?;

        Ok(Compiled {
            default_status,
            voter,
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commentable_policy::{PolicyConfigurationError, Role};

    #[test]
    fn it_defaults_to_a_valid_awaiting_configuration() -> anyhow::Result<()> {
        let config = CommentableConfig::default();

        assert_eq!(config.default_status, "awaiting");
        config.validate()?;
        Ok(())
    }

    #[test]
    fn it_validates_the_default_status() {
        let cases = [
            ("awaiting", None),
            ("published", None),
            ("draft", None),
            ("moderated", None),
            ("invalid", Some("invalid default_status")),
            ("", Some("default_status cannot be empty")),
        ];

        for (status, expected) in cases {
            let config = CommentableConfig {
                default_status: status.into(),
                ..CommentableConfig::default()
            };

            match (config.validate(), expected) {
                (Ok(()), None) => {}
                (Err(error), Some(message)) => {
                    assert!(error.to_string().contains(message), "{status}: {error}")
                }
                (result, _) => panic!("{status:?}: unexpected {result:?}"),
            }
        }
    }

    #[test]
    fn it_rejects_bad_allowed_types() {
        let check = |types: &[&str]| {
            CommentableConfig {
                allowed_types: types.iter().map(|t| t.to_string()).collect(),
                ..CommentableConfig::default()
            }
            .validate()
        };

        assert!(matches!(check(&[]), Err(ConfigurationError::NoAllowedTypes)));
        assert!(matches!(check(&["post", ""]), Err(ConfigurationError::EmptyAllowedType)));
        assert!(matches!(
            check(&["post", "article", "post"]),
            Err(ConfigurationError::DuplicateAllowedType { value }) if value == "post"
        ));
    }

    #[test]
    fn it_rejects_out_of_range_bounds() {
        let defaults = CommentableConfig::default;

        assert!(matches!(
            CommentableConfig { max_content_length: 0, ..defaults() }.validate(),
            Err(ConfigurationError::ContentLength { .. })
        ));
        assert!(matches!(
            CommentableConfig { max_content_length: 1_048_577, ..defaults() }.validate(),
            Err(ConfigurationError::ContentLength { .. })
        ));
        assert!(matches!(
            CommentableConfig { pagination_limit: 101, ..defaults() }.validate(),
            Err(ConfigurationError::PaginationLimit { .. })
        ));
        assert!(matches!(
            CommentableConfig { max_nesting_depth: 101, ..defaults() }.validate(),
            Err(ConfigurationError::NestingDepth { .. })
        ));
        assert!(CommentableConfig { max_nesting_depth: 100, ..defaults() }.validate().is_ok());
    }

    #[test]
    fn it_rejects_cyclic_role_hierarchies() {
        let mut config = CommentableConfig::default();
        config
            .policy
            .hierarchy
            .insert(Role::from("reader"), vec![Role::from("writer")]);

        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::Policy(PolicyConfigurationError::Cycle { .. }))
        ));
    }

    #[test]
    fn it_rejects_field_policies_naming_unknown_roles() {
        let config = CommentableConfig {
            fields: vec![FieldPolicy::new(fields::STATUS, "*", "editor")],
            ..CommentableConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::Policy(PolicyConfigurationError::UnknownRole { .. }))
        ));
    }

    #[test]
    fn it_loads_partial_json_over_defaults() -> anyhow::Result<()> {
        let config = CommentableConfig::from_json(
            r#"{
                "allowed_types": ["post", "article"],
                "max_nesting_depth": 3,
                "policy": { "default_policy": "allow_all" }
            }"#,
        )?;

        assert!(config.is_allowed_type("article"));
        assert!(!config.is_allowed_type("product"));
        assert_eq!(config.max_nesting_depth, 3);
        assert_eq!(config.pagination_limit, 20);
        assert_eq!(config.policy.superuser, Role::from("admin"));
        Ok(())
    }

    #[test]
    fn it_rejects_unknown_keys_and_invalid_values_in_json() {
        assert!(matches!(
            CommentableConfig::from_json(r#"{ "allowed_type": ["post"] }"#),
            Err(ConfigurationError::Parse(_))
        ));
        assert!(matches!(
            CommentableConfig::from_json(r#"{ "default_status": "archived" }"#),
            Err(ConfigurationError::InvalidDefaultStatus { .. })
        ));
    }

    #[test]
    fn it_reports_unreadable_paths() {
        assert!(matches!(
            CommentableConfig::from_path("/nonexistent/commentable.json"),
            Err(ConfigurationError::Read { .. })
        ));
    }
}

//! External field names of a comment and their default policies.

use commentable_policy::FieldPolicy;
use commentable_query::{FieldRule, Whitelist};

use crate::Status;

pub const ID: &str = "id";
pub const USER_ID: &str = "userId";
pub const COMMENTABLE_ID: &str = "commentableId";
pub const COMMENTABLE: &str = "commentable";
pub const PARENT_ID: &str = "parentId";
pub const CONTENT: &str = "content";
pub const STATUS: &str = "status";
pub const IP_ADDRESS: &str = "ipAddress";
pub const USER_AGENT: &str = "userAgent";
pub const UPDATED_AT: &str = "updatedAt";
pub const CREATED_AT: &str = "createdAt";

/// Every external field name paired with its storage column.
pub const COLUMNS: [(&str, &str); 11] = [
    (ID, "id"),
    (USER_ID, "user_id"),
    (COMMENTABLE_ID, "commentable_id"),
    (COMMENTABLE, "commentable"),
    (PARENT_ID, "parent_id"),
    (CONTENT, "content"),
    (STATUS, "status"),
    (IP_ADDRESS, "ip_address"),
    (USER_AGENT, "user_agent"),
    (UPDATED_AT, "updated_at"),
    (CREATED_AT, "created_at"),
];

/// The storage column for an external field name.
pub fn column(field: &str) -> Option<&'static str> {
    COLUMNS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, column)| *column)
}

/// Default read and write requirements per field.
///
/// Identifiers and timestamps are system managed. Network metadata is only
/// visible from the moderator role upwards.
pub fn default_policies() -> Vec<FieldPolicy> {
    vec![
        FieldPolicy::new(ID, "*", "none"),
        FieldPolicy::new(USER_ID, "*", "reader"),
        FieldPolicy::new(COMMENTABLE_ID, "*", "reader"),
        FieldPolicy::new(COMMENTABLE, "*", "reader"),
        FieldPolicy::new(PARENT_ID, "*", "reader"),
        FieldPolicy::new(CONTENT, "*", "reader"),
        FieldPolicy::new(STATUS, "*", "moderator"),
        FieldPolicy::new(IP_ADDRESS, "moderator", "none"),
        FieldPolicy::new(USER_AGENT, "moderator", "none"),
        FieldPolicy::new(UPDATED_AT, "*", "none"),
        FieldPolicy::new(CREATED_AT, "*", "none"),
    ]
}

/// The fields clients may filter and sort on.
///
/// `commentable` values are limited to the deployment's allowed types and
/// `status` values to the closed status set.
pub fn whitelist<S: AsRef<str>>(allowed_types: &[S]) -> Whitelist {
    COLUMNS
        .into_iter()
        .fold(Whitelist::new(), |whitelist, (field, column)| {
            let rule = match field {
                UPDATED_AT | CREATED_AT => FieldRule::timestamp(column),
                COMMENTABLE => FieldRule::text(column)
                    .with_allowed_values(allowed_types.iter().map(|kind| kind.as_ref().to_owned())),
                STATUS => FieldRule::text(column).with_allowed_values(Status::names()),
                _ => FieldRule::text(column),
            };
            whitelist.allow(field, rule)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_maps_camel_case_names_to_columns() {
        assert_eq!(column(COMMENTABLE_ID), Some("commentable_id"));
        assert_eq!(column(CREATED_AT), Some("created_at"));
        assert_eq!(column("created_at"), None);
    }

    #[test]
    fn it_covers_every_field_with_a_policy() {
        let policies = default_policies();

        for (field, _) in COLUMNS {
            assert!(
                policies.iter().any(|policy| policy.field == field),
                "{field} has no policy"
            );
        }
    }

    #[test]
    fn it_restricts_commentable_and_status_values() {
        let whitelist = whitelist(&["post"]);

        let commentable = whitelist.get(COMMENTABLE).and_then(|rule| rule.allowed_values());
        let status = whitelist.get(STATUS).and_then(|rule| rule.allowed_values());

        assert_eq!(commentable.map(|values| values.len()), Some(1));
        assert_eq!(status.map(|values| values.len()), Some(4));
        assert!(whitelist.get(USER_ID).is_some_and(|rule| rule.allowed_values().is_none()));
    }
}

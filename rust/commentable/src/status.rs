use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Moderation state of a comment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Submitted and waiting for a moderator.
    #[default]
    Awaiting,
    /// Visible to everyone.
    Published,
    /// Saved but not submitted.
    Draft,
    /// Hidden by a moderator.
    Moderated,
}

impl Status {
    /// The closed set of states, in declaration order.
    pub const ALL: [Status; 4] = [
        Status::Awaiting,
        Status::Published,
        Status::Draft,
        Status::Moderated,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Awaiting => "awaiting",
            Status::Published => "published",
            Status::Draft => "draft",
            Status::Moderated => "moderated",
        }
    }

    /// Whether principals below the moderator threshold may see the comment.
    pub const fn is_public(self) -> bool {
        matches!(self, Status::Published)
    }

    /// Every state name, for error messages and value allow-lists.
    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|status| status.as_str().to_owned()).collect()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| ValidationError::InvalidStatus {
                value: value.to_owned(),
            })
    }
}

/// The comment workflow.
///
/// The machine enumerates states and picks the initial one. It does not
/// police edges: every state may move to every other state, and who may
/// move a comment at all is decided by the write policy of the `status`
/// field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMachine {
    initial: Status,
}

impl StatusMachine {
    pub fn new(initial: Status) -> Self {
        Self { initial }
    }

    /// The state assigned to newly created comments.
    pub fn initial(&self) -> Status {
        self.initial
    }

    /// The states a comment may be in.
    pub fn states(&self) -> &'static [Status] {
        &Status::ALL
    }

    /// Whether `from` may move to `to`.
    pub fn permits(&self, from: Status, to: Status) -> bool {
        self.states().contains(&from) && self.states().contains(&to)
    }
}

impl Default for StatusMachine {
    fn default() -> Self {
        Self::new(Status::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_only_the_closed_set() {
        assert_eq!("published".parse::<Status>(), Ok(Status::Published));
        assert_eq!(
            "Published".parse::<Status>(),
            Err(ValidationError::InvalidStatus {
                value: "Published".into()
            })
        );
        assert!("".parse::<Status>().is_err());
    }

    #[test]
    fn it_only_treats_published_as_public() {
        let public: Vec<Status> = Status::ALL.into_iter().filter(|s| s.is_public()).collect();
        assert_eq!(public, vec![Status::Published]);
    }

    #[test]
    fn it_permits_every_transition() {
        let machine = StatusMachine::default();

        assert_eq!(machine.initial(), Status::Awaiting);
        for from in Status::ALL {
            for to in Status::ALL {
                assert!(machine.permits(from, to), "{from} -> {to}");
            }
        }
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    Access, FieldWriteError, PermissionVoter, PolicyConfigurationError, RoleHierarchy, RoleSet,
};

/// Read and write requirements for one entity field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldPolicy {
    /// External field name, e.g. `ipAddress`.
    pub field: String,
    /// Requirement for the field to appear in read responses.
    pub read: Access,
    /// Requirement for the field to be changed by a request.
    pub write: Access,
}

impl FieldPolicy {
    /// Describe a field's requirements.
    pub fn new(field: impl Into<String>, read: impl Into<Access>, write: impl Into<Access>) -> Self {
        Self {
            field: field.into(),
            read: read.into(),
            write: write.into(),
        }
    }
}

/// Per-field access requirements, keyed by field name.
///
/// The table is loaded once and consulted through ordinary lookups. Fields
/// that are not listed are treated as [`Access::Nobody`] on both sides, so
/// only the superuser may see them and nobody may write them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldPolicy>", into = "Vec<FieldPolicy>")]
pub struct FieldPolicyTable {
    policies: Vec<FieldPolicy>,
    index: BTreeMap<String, usize>,
}

static UNLISTED: Access = Access::Nobody;

impl FieldPolicyTable {
    /// Build a table, rejecting duplicate field entries.
    pub fn new(
        policies: impl IntoIterator<Item = FieldPolicy>,
    ) -> Result<Self, PolicyConfigurationError> {
        let policies: Vec<FieldPolicy> = policies.into_iter().collect();
        let mut index = BTreeMap::new();

        for (position, policy) in policies.iter().enumerate() {
            if index.insert(policy.field.clone(), position).is_some() {
                return Err(PolicyConfigurationError::DuplicateField {
                    field: policy.field.clone(),
                });
            }
        }

        Ok(Self { policies, index })
    }

    /// Check that every role named by the table exists in the hierarchy.
    pub fn validate_roles(&self, hierarchy: &RoleHierarchy) -> Result<(), PolicyConfigurationError> {
        for policy in &self.policies {
            for access in [&policy.read, &policy.write] {
                if let Some(role) = access.role() {
                    if !hierarchy.knows(role.as_str()) {
                        return Err(PolicyConfigurationError::UnknownRole {
                            role: role.clone(),
                            context: format!("the policy of field '{}'", policy.field),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Look up a field's policy.
    pub fn get(&self, field: &str) -> Option<&FieldPolicy> {
        self.index.get(field).map(|position| &self.policies[*position])
    }

    /// Policies in the order they were configured.
    pub fn iter(&self) -> impl Iterator<Item = &FieldPolicy> {
        self.policies.iter()
    }

    /// The read requirement for a field.
    pub fn read_access(&self, field: &str) -> &Access {
        self.get(field).map_or(&UNLISTED, |policy| &policy.read)
    }

    /// The write requirement for a field.
    pub fn write_access(&self, field: &str) -> &Access {
        self.get(field).map_or(&UNLISTED, |policy| &policy.write)
    }

    /// Whether the field is listed and never accepts external writes.
    pub fn is_system_managed(&self, field: &str) -> bool {
        self.get(field)
            .is_some_and(|policy| policy.write == Access::Nobody)
    }

    /// Whether the role set may see the field.
    pub fn can_read(&self, voter: &PermissionVoter, roles: &RoleSet, field: &str) -> bool {
        voter.allows(roles, self.read_access(field))
    }

    /// Check a single field write.
    ///
    /// System-managed fields are rejected before the voter is consulted, so
    /// the superuser cannot write them either.
    pub fn check_write(
        &self,
        voter: &PermissionVoter,
        roles: &RoleSet,
        field: &str,
    ) -> Result<(), FieldWriteError> {
        if self.is_system_managed(field) {
            return Err(FieldWriteError::ReadOnly {
                field: field.to_owned(),
            });
        }

        let required = self.write_access(field);
        if voter.allows(roles, required) {
            Ok(())
        } else {
            Err(FieldWriteError::Insufficient {
                field: field.to_owned(),
                required: required.clone(),
            })
        }
    }

    /// Check every field of a proposed change set.
    ///
    /// All fields are checked before anything is returned; the first failure
    /// in input order wins. A change set either passes as a whole or not at
    /// all.
    pub fn check_writes<'a, I>(
        &self,
        voter: &PermissionVoter,
        roles: &RoleSet,
        fields: I,
    ) -> Result<(), FieldWriteError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let failures: Vec<FieldWriteError> = fields
            .into_iter()
            .filter_map(|field| self.check_write(voter, roles, field).err())
            .collect();

        match failures.into_iter().next() {
            Some(failure) => {
                tracing::debug!(%failure, "Rejected field write");
                Err(failure)
            }
            None => Ok(()),
        }
    }
}

impl TryFrom<Vec<FieldPolicy>> for FieldPolicyTable {
    type Error = PolicyConfigurationError;

    fn try_from(value: Vec<FieldPolicy>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FieldPolicyTable> for Vec<FieldPolicy> {
    fn from(value: FieldPolicyTable) -> Self {
        value.policies
    }
}

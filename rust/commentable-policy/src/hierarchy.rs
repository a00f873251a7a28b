use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{PolicyConfigurationError, Role, RoleSet};

/// A validated mapping from each role to every role it implies.
///
/// The mapping is stored already closed: looking up `writer` yields
/// `moderator` and `reader` when `writer` implies `moderator` and `moderator`
/// implies `reader`. This keeps [`RoleHierarchy::resolve`] a single pass over
/// the declared roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleHierarchy {
    vocabulary: BTreeSet<Role>,
    closure: BTreeMap<Role, BTreeSet<Role>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl RoleHierarchy {
    /// Build a hierarchy from direct implications.
    ///
    /// Every role appearing in `implications`, either as a key or as an
    /// implied role, must be part of `vocabulary`. No role may reach itself
    /// by following implications.
    pub fn new(
        vocabulary: &[Role],
        implications: &BTreeMap<Role, Vec<Role>>,
    ) -> Result<Self, PolicyConfigurationError> {
        let vocabulary: BTreeSet<Role> = vocabulary.iter().cloned().collect();
        if vocabulary.iter().any(Role::is_blank) {
            return Err(PolicyConfigurationError::EmptyRole);
        }

        for (role, implied) in implications {
            if !vocabulary.contains(role) {
                return Err(PolicyConfigurationError::UnknownRole {
                    role: role.clone(),
                    context: "the role hierarchy".into(),
                });
            }
            for target in implied {
                if target == role {
                    return Err(PolicyConfigurationError::SelfReference { role: role.clone() });
                }
                if !vocabulary.contains(target) {
                    return Err(PolicyConfigurationError::UnknownRole {
                        role: target.clone(),
                        context: format!("the implications of '{role}'"),
                    });
                }
            }
        }

        detect_cycle(implications)?;

        let closure = implications
            .keys()
            .map(|role| (role.clone(), reachable(role, implications)))
            .collect();

        Ok(Self {
            vocabulary,
            closure,
        })
    }

    /// Whether the role is part of the declared vocabulary.
    pub fn knows(&self, role: &str) -> bool {
        self.vocabulary.contains(role)
    }

    /// The roles `role` implies, not including `role` itself.
    pub fn implied_by(&self, role: &str) -> impl Iterator<Item = &Role> {
        self.closure.get(role).into_iter().flatten()
    }

    /// Expand declared roles into their transitive closure.
    ///
    /// Declared roles outside the vocabulary are kept so that a superuser or
    /// deployment-specific role still matches by name, but they imply
    /// nothing. Resolving an already resolved set yields the same set.
    pub fn resolve<'a, I>(&self, declared: I) -> RoleSet
    where
        I: IntoIterator<Item = &'a Role>,
    {
        let mut resolved = RoleSet::empty();
        for role in declared {
            if !self.knows(role.as_str()) {
                tracing::debug!(role = %role, "Declared role is not part of the hierarchy");
            }
            resolved.insert(role.clone());
            for implied in self.implied_by(role.as_str()) {
                resolved.insert(implied.clone());
            }
        }
        resolved
    }
}

fn reachable(start: &Role, implications: &BTreeMap<Role, Vec<Role>>) -> BTreeSet<Role> {
    let mut seen = BTreeSet::new();
    let mut queue: VecDeque<&Role> = implications.get(start).into_iter().flatten().collect();

    while let Some(role) = queue.pop_front() {
        if seen.insert(role.clone()) {
            queue.extend(implications.get(role).into_iter().flatten());
        }
    }

    seen
}

fn detect_cycle(implications: &BTreeMap<Role, Vec<Role>>) -> Result<(), PolicyConfigurationError> {
    let mut marks: BTreeMap<&Role, Mark> = BTreeMap::new();

    for root in implications.keys() {
        if marks.contains_key(root) {
            continue;
        }

        // Iterative depth-first walk. Each frame is a role and the index of
        // the next implication to follow.
        let mut path: Vec<(&Role, usize)> = vec![(root, 0)];
        marks.insert(root, Mark::Visiting);

        while let Some((role, next)) = path.last_mut() {
            let children = implications.get(*role).map(Vec::as_slice).unwrap_or(&[]);
            let Some(child) = children.get(*next) else {
                marks.insert(*role, Mark::Done);
                path.pop();
                continue;
            };
            *next += 1;

            match marks.get(child) {
                Some(Mark::Done) => {}
                Some(Mark::Visiting) => {
                    let start = path
                        .iter()
                        .position(|(role, _)| *role == child)
                        .unwrap_or_default();
                    let mut cycle: Vec<Role> =
                        path[start..].iter().map(|(role, _)| (*role).clone()).collect();
                    cycle.push(child.clone());
                    return Err(PolicyConfigurationError::Cycle { path: cycle });
                }
                None => {
                    marks.insert(child, Mark::Visiting);
                    path.push((child, 0));
                }
            }
        }
    }

    Ok(())
}

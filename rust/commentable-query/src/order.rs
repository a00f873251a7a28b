use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ORDER_KEY, QueryError, QueryKey, QueryParameters, Whitelist};

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl Direction {
    /// Parse a direction token, falling back to ascending for anything that
    /// is not recognizably `desc`.
    pub fn parse_lenient(token: &str) -> Self {
        let token = token.trim();
        if token.eq_ignore_ascii_case("desc") {
            Direction::Desc
        } else {
            if !token.is_empty() && !token.eq_ignore_ascii_case("asc") {
                tracing::debug!(direction = token, "Unrecognized sort direction, using asc");
            }
            Direction::Asc
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        })
    }
}

/// One validated sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderClause {
    /// External field name.
    pub field: String,
    /// Storage column the field maps to.
    pub column: String,
    /// Sort direction.
    pub direction: Direction,
}

/// Compiles `order[field]=direction` parameters against a [`Whitelist`].
#[derive(Debug, Clone)]
pub struct OrderCompiler {
    whitelist: Whitelist,
}

impl OrderCompiler {
    pub fn new(whitelist: Whitelist) -> Self {
        Self { whitelist }
    }

    /// Sort keys in the order the client gave them. A field named more than
    /// once keeps its first direction.
    pub fn compile(&self, parameters: &QueryParameters) -> Result<Vec<OrderClause>, QueryError> {
        let mut clauses: Vec<OrderClause> = Vec::new();

        for (key, value) in parameters.iter() {
            let key = QueryKey::parse(key)?;
            let (ORDER_KEY, Some(field)) = (key.name, key.modifier) else {
                continue;
            };

            let rule = self
                .whitelist
                .get(field)
                .filter(|rule| rule.is_sortable())
                .ok_or_else(|| QueryError::UnknownSortField {
                    field: field.to_owned(),
                })?;

            if clauses.iter().any(|clause| clause.field == field) {
                continue;
            }

            clauses.push(OrderClause {
                field: field.to_owned(),
                column: rule.column().to_owned(),
                direction: Direction::parse_lenient(value),
            });
        }

        Ok(clauses)
    }
}

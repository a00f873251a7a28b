use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Operator;

/// Read access to the columns of a stored row.
///
/// Stores that evaluate predicates in memory implement this for their row
/// type. Timestamp columns must be rendered with [`render_timestamp`].
///
/// [`render_timestamp`]: crate::render_timestamp
pub trait Record {
    /// The value of `column`, or `None` when the column is null or unknown.
    fn column(&self, column: &str) -> Option<Cow<'_, str>>;
}

/// One storage-level comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Storage column.
    pub column: String,
    /// Comparison to apply.
    pub operator: Operator,
    /// Operand values; exactly one unless the operator is multi-valued.
    pub values: Vec<String>,
}

impl Condition {
    /// Evaluate against a column value. Null never matches, mirroring SQL
    /// three-valued logic.
    pub fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        let Some(first) = self.values.first().map(String::as_str) else {
            return false;
        };

        match self.operator {
            Operator::Eq => value == first,
            Operator::Ne => value != first,
            Operator::In => self.values.iter().any(|candidate| candidate == value),
            Operator::Gt => value > first,
            Operator::Gte => value >= first,
            Operator::Lt => value < first,
            Operator::Lte => value <= first,
        }
    }
}

/// A conjunction of conditions, handed to the store as-is.
///
/// The structure is dialect neutral: a SQL store renders each condition as a
/// parameterized comparison joined with `AND`; an in-memory store calls
/// [`Predicate::matches`]. An empty predicate matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    /// Conjoin conditions.
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    /// The conditions in evaluation order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Whether every condition holds for the record.
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.matches(record.column(&condition.column).as_deref()))
    }
}

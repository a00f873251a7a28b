use std::fmt;

use serde::{Deserialize, Serialize};

/// Comparison applied by a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Equal to the single value.
    Eq,
    /// Not equal to the single value.
    Ne,
    /// Equal to any of the values.
    In,
    /// Strictly greater than the single value.
    Gt,
    /// Greater than or equal to the single value.
    Gte,
    /// Strictly less than the single value.
    Lt,
    /// Less than or equal to the single value.
    Lte,
}

impl Operator {
    /// Every operator, in declaration order.
    pub const ALL: [Operator; 7] = [
        Operator::Eq,
        Operator::Ne,
        Operator::In,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
    ];

    /// Parse the bracketed modifier of a filter key.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|operator| operator.token() == token)
    }

    /// The modifier spelling of this operator.
    pub const fn token(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::In => "in",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
        }
    }

    /// Whether the operator accepts a list of values.
    pub const fn is_multi_valued(self) -> bool {
        matches!(self, Operator::In)
    }

    /// Whether the operator orders values rather than matching them.
    pub const fn is_range(self) -> bool {
        matches!(
            self,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

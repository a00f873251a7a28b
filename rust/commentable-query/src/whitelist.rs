use std::collections::{BTreeMap, BTreeSet};

use crate::{Operator, ValueKind};

/// What clients may do with one external field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    column: String,
    kind: ValueKind,
    operators: BTreeSet<Operator>,
    allowed_values: Option<BTreeSet<String>>,
    sortable: bool,
}

impl FieldRule {
    /// A text field supporting equality and in-set filters.
    pub fn text(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            kind: ValueKind::Text,
            operators: BTreeSet::from([Operator::Eq, Operator::In]),
            allowed_values: None,
            sortable: true,
        }
    }

    /// A timestamp field supporting equality and range filters.
    pub fn timestamp(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            kind: ValueKind::Timestamp,
            operators: BTreeSet::from([
                Operator::Eq,
                Operator::Gt,
                Operator::Gte,
                Operator::Lt,
                Operator::Lte,
            ]),
            allowed_values: None,
            sortable: true,
        }
    }

    /// Replace the supported operators.
    ///
    /// Range operators are dropped from text fields: comparing arbitrary
    /// text lexically is not a meaningful filter.
    pub fn with_operators(mut self, operators: impl IntoIterator<Item = Operator>) -> Self {
        let kind = self.kind;
        self.operators = operators
            .into_iter()
            .filter(|operator| kind == ValueKind::Timestamp || !operator.is_range())
            .collect();
        self
    }

    /// Restrict every filter value to a closed set.
    pub fn with_allowed_values<V>(mut self, values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Allow filtering but not ordering on this field.
    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    /// Storage column the field maps to.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// The field's value kind.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Whether the operator may be used on this field.
    pub fn supports(&self, operator: Operator) -> bool {
        self.operators.contains(&operator)
    }

    /// The closed set of allowed values, if the field has one.
    pub fn allowed_values(&self) -> Option<&BTreeSet<String>> {
        self.allowed_values.as_ref()
    }

    /// Whether the field may appear in an ordering.
    pub fn is_sortable(&self) -> bool {
        self.sortable
    }
}

/// The closed set of external field names clients may filter and sort on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    fields: BTreeMap<String, FieldRule>,
}

impl Whitelist {
    /// An empty whitelist; every field is rejected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow an external field name under the given rule.
    pub fn allow(mut self, field: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.insert(field.into(), rule);
        self
    }

    /// Look up the rule for a field.
    pub fn get(&self, field: &str) -> Option<&FieldRule> {
        self.fields.get(field)
    }

    /// Iterate fields and rules in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(field, rule)| (field.as_str(), rule))
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    Condition, FieldRule, Operator, Predicate, QueryError, QueryKey, QueryParameters, ValueKind,
    Whitelist, normalize_timestamp,
};

/// Default cap on the number of values a single filter may carry.
pub const DEFAULT_MAX_FILTER_VALUES: usize = 50;

/// Who the compiled filter is for.
///
/// Public audiences have the compiler's public constraints appended to every
/// filter, whatever the client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// The requester may see every row the filter selects.
    Privileged,
    /// The requester may only see publicly visible rows.
    Public,
}

/// A validated filter over one whitelisted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterClause {
    /// External field name.
    pub field: String,
    /// Storage column the field maps to.
    pub column: String,
    /// Comparison to apply.
    pub operator: Operator,
    /// Operand values, validated and normalized.
    pub values: Vec<String>,
}

impl FilterClause {
    /// The storage-level comparison for this clause.
    pub fn condition(&self) -> Condition {
        Condition {
            column: self.column.clone(),
            operator: self.operator,
            values: self.values.clone(),
        }
    }
}

/// The ordered conjunction of clauses produced by a [`FilterCompiler`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<FilterClause>,
}

impl Filter {
    /// Clauses in input order, followed by any enforced constraints.
    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    /// Number of clauses.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Whether the filter selects every row.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Render the dialect-neutral predicate handed to a store.
    pub fn predicate(&self) -> Predicate {
        Predicate::new(self.clauses.iter().map(FilterClause::condition).collect())
    }
}

/// Compiles query parameters into a [`Filter`] against a [`Whitelist`].
#[derive(Debug, Clone)]
pub struct FilterCompiler {
    whitelist: Whitelist,
    max_values: usize,
    public_constraints: Vec<FilterClause>,
}

/// Values collected for one field and operator while scanning.
///
/// Plain `field=value` keys are kept apart from bracketed ones, so the
/// result never depends on which form came first.
struct Pending<'a> {
    field: &'a str,
    rule: &'a FieldRule,
    operator: Operator,
    /// No bracketed operator was given; several values widen to in-set.
    implicit: bool,
    values: Vec<String>,
}

impl FilterCompiler {
    /// A compiler with the default value cap and no public constraints.
    pub fn new(whitelist: Whitelist) -> Self {
        Self {
            whitelist,
            max_values: DEFAULT_MAX_FILTER_VALUES,
            public_constraints: Vec::new(),
        }
    }

    /// Cap the number of values per filter.
    pub fn with_max_values(mut self, max_values: usize) -> Self {
        self.max_values = max_values.max(1);
        self
    }

    /// Append `field = value` to every filter compiled for a public
    /// audience.
    ///
    /// The constraint is added alongside whatever the client supplied for
    /// the same field, so the client can narrow but never widen it.
    pub fn with_public_constraint(mut self, field: &str, value: impl Into<String>) -> Self {
        let column = self
            .whitelist
            .get(field)
            .map_or_else(|| field.to_owned(), |rule| rule.column().to_owned());

        self.public_constraints.push(FilterClause {
            field: field.to_owned(),
            column,
            operator: Operator::Eq,
            values: vec![value.into()],
        });
        self
    }

    /// The whitelist this compiler validates against.
    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// The configured value cap.
    pub fn max_values(&self) -> usize {
        self.max_values
    }

    /// Compile every non-reserved parameter into a clause.
    ///
    /// Parameters sharing a field and operator fold into one clause, placed
    /// where the key first appeared. Plain keys fold separately from
    /// bracketed keys. The value cap applies to each field across all of its
    /// clauses. Any invalid parameter fails the whole request; no partial
    /// filter is ever returned.
    pub fn compile(
        &self,
        parameters: &QueryParameters,
        audience: Audience,
    ) -> Result<Filter, QueryError> {
        let mut pending: Vec<Pending<'_>> = Vec::new();

        for (key, value) in parameters.iter() {
            let key = QueryKey::parse(key)?;
            if key.is_reserved() {
                continue;
            }

            let (field, rule) = self.lookup(key.name)?;
            let (operator, implicit) = match key.modifier {
                None => (Operator::Eq, true),
                Some("") => (Operator::In, false),
                Some(token) => (
                    Operator::from_token(token).ok_or_else(|| {
                        QueryError::UnsupportedOperator {
                            field: field.to_owned(),
                            operator: token.to_owned(),
                        }
                    })?,
                    false,
                ),
            };

            let values = split_values(rule, operator, implicit, value);
            match pending.iter_mut().find(|entry| {
                entry.field == field && entry.operator == operator && entry.implicit == implicit
            }) {
                Some(entry) => entry.values.extend(values),
                None => pending.push(Pending {
                    field,
                    rule,
                    operator,
                    implicit,
                    values,
                }),
            }
        }

        let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in &pending {
            *totals.entry(entry.field).or_default() += entry.values.len();
        }

        let mut clauses = pending
            .into_iter()
            .map(|entry| {
                let total = totals.get(entry.field).copied().unwrap_or_default();
                self.validate(entry, total)
            })
            .collect::<Result<Vec<_>, _>>()?;

        if audience == Audience::Public {
            clauses.extend(self.public_constraints.iter().cloned());
        }

        Ok(Filter { clauses })
    }

    fn lookup<'a>(&'a self, name: &str) -> Result<(&'a str, &'a FieldRule), QueryError> {
        self.whitelist
            .iter()
            .find(|(field, _)| *field == name)
            .ok_or_else(|| {
                tracing::debug!(field = name, "Rejected filter on non-whitelisted field");
                QueryError::UnknownField {
                    field: name.to_owned(),
                }
            })
    }

    /// Check one pending clause. `total` counts the values supplied for the
    /// field across every clause.
    fn validate(&self, entry: Pending<'_>, total: usize) -> Result<FilterClause, QueryError> {
        let Pending {
            field,
            rule,
            mut operator,
            implicit,
            values,
        } = entry;

        if implicit && values.len() > 1 {
            operator = Operator::In;
        }

        if !rule.supports(operator) {
            return Err(QueryError::UnsupportedOperator {
                field: field.to_owned(),
                operator: operator.token().to_owned(),
            });
        }

        // Cardinality is checked before individual values so an oversized
        // list always reports the limit.
        if total > self.max_values {
            return Err(QueryError::TooManyValues {
                field: field.to_owned(),
                max: self.max_values,
                count: total,
            });
        }
        if values.is_empty() {
            return Err(QueryError::EmptyValue {
                field: field.to_owned(),
            });
        }
        if !operator.is_multi_valued() && values.len() > 1 {
            return Err(QueryError::SingleValueExpected {
                field: field.to_owned(),
                operator: operator.token().to_owned(),
            });
        }

        let values = values
            .into_iter()
            .map(|value| check_value(field, rule, value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FilterClause {
            field: field.to_owned(),
            column: rule.column().to_owned(),
            operator,
            values,
        })
    }
}

/// Comma lists split for in-set keys, and for plain keys on fields that
/// accept in-set. Anywhere else a comma is part of the value.
fn split_values(rule: &FieldRule, operator: Operator, implicit: bool, value: &str) -> Vec<String> {
    if operator.is_multi_valued() || (implicit && rule.supports(Operator::In)) {
        value
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
            .collect()
    } else {
        vec![value.to_owned()]
    }
}

fn check_value(field: &str, rule: &FieldRule, value: String) -> Result<String, QueryError> {
    if let Some(allowed) = rule.allowed_values() {
        if !allowed.contains(&value) {
            return Err(QueryError::DisallowedValue {
                field: field.to_owned(),
                allowed: allowed.iter().cloned().collect(),
                value,
            });
        }
    }

    match rule.kind() {
        ValueKind::Text => Ok(value),
        ValueKind::Timestamp => {
            normalize_timestamp(&value).map_err(|error| QueryError::InvalidValue {
                field: field.to_owned(),
                reason: error.to_string(),
                value,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compiler() -> FilterCompiler {
        let whitelist = Whitelist::new()
            .allow("status", FieldRule::text("status").with_allowed_values(["published", "draft"]))
            .allow(
                "commentable",
                FieldRule::text("commentable").with_allowed_values(["post", "article"]),
            )
            .allow("userId", FieldRule::text("user_id"))
            .allow("content", FieldRule::text("content").with_operators([Operator::Eq]))
            .allow("createdAt", FieldRule::timestamp("created_at"));

        FilterCompiler::new(whitelist).with_public_constraint("status", "published")
    }

    fn compile(query: &str) -> Result<Filter, QueryError> {
        compiler().compile(&QueryParameters::parse(query), Audience::Privileged)
    }

    #[test]
    fn it_compiles_clauses_in_input_order() -> testresult::TestResult {
        let filter = compile("userId=u1&commentable[]=post&status=draft&commentable[]=article")?;

        assert_eq!(
            filter.clauses(),
            &[
                FilterClause {
                    field: "userId".into(),
                    column: "user_id".into(),
                    operator: Operator::Eq,
                    values: vec!["u1".into()],
                },
                FilterClause {
                    field: "commentable".into(),
                    column: "commentable".into(),
                    operator: Operator::In,
                    values: vec!["post".into(), "article".into()],
                },
                FilterClause {
                    field: "status".into(),
                    column: "status".into(),
                    operator: Operator::Eq,
                    values: vec!["draft".into()],
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn it_widens_repeated_plain_keys_to_in_set() -> testresult::TestResult {
        let filter = compile("status=draft&status=published")?;

        assert_eq!(filter.clauses()[0].operator, Operator::In);
        assert_eq!(filter.clauses()[0].values, vec!["draft", "published"]);
        Ok(())
    }

    #[test]
    fn it_widens_plain_comma_lists_to_in_set() -> testresult::TestResult {
        let filter = compile("commentable=post,article")?;

        assert_eq!(filter.len(), 1);
        assert_eq!(filter.clauses()[0].operator, Operator::In);
        assert_eq!(filter.clauses()[0].values, vec!["post", "article"]);
        Ok(())
    }

    #[test]
    fn it_keeps_commas_in_values_of_fields_without_in_set() -> testresult::TestResult {
        let filter = compile("content=hello,%20world")?;

        assert_eq!(filter.clauses()[0].operator, Operator::Eq);
        assert_eq!(filter.clauses()[0].values, vec!["hello, world"]);
        Ok(())
    }

    #[test]
    fn it_reports_the_value_cap_for_plain_comma_lists() {
        let values = (0..51).map(|n| format!("v{n}")).collect::<Vec<_>>().join(",");

        assert_eq!(
            compile(&format!("commentable={values}")),
            Err(QueryError::TooManyValues {
                field: "commentable".into(),
                max: 50,
                count: 51,
            })
        );
    }

    #[test]
    fn it_caps_values_per_field_across_key_forms() {
        let query = std::iter::repeat_n("commentable=post", 30)
            .chain(std::iter::repeat_n("commentable[]=post", 30))
            .collect::<Vec<_>>()
            .join("&");

        assert_eq!(
            compile(&query),
            Err(QueryError::TooManyValues {
                field: "commentable".into(),
                max: 50,
                count: 60,
            })
        );
    }

    #[test]
    fn it_compiles_mixed_key_forms_the_same_in_either_order() -> testresult::TestResult {
        let plain_first = compile("status=draft&status[eq]=published")?;
        let bracketed_first = compile("status[eq]=published&status=draft")?;

        for filter in [&plain_first, &bracketed_first] {
            assert_eq!(filter.len(), 2);
            assert!(filter.clauses().iter().all(|clause| clause.operator == Operator::Eq));
        }
        assert_eq!(plain_first.clauses()[0].values, vec!["draft"]);
        assert_eq!(bracketed_first.clauses()[0].values, vec!["published"]);
        Ok(())
    }

    #[test]
    fn it_rejects_the_whole_request_on_an_unknown_field() {
        assert_eq!(
            compile("status=draft&ipAddress=10.0.0.1"),
            Err(QueryError::UnknownField {
                field: "ipAddress".into()
            })
        );
    }

    #[test]
    fn it_rejects_values_outside_the_allowed_set() {
        assert!(matches!(
            compile("commentable[in]=post,comment"),
            Err(QueryError::DisallowedValue { field, value, .. })
                if field == "commentable" && value == "comment"
        ));
    }

    #[test]
    fn it_reports_the_value_cap_before_disallowed_values() {
        let values = vec!["nope"; 51].join(",");
        let error = compile(&format!("commentable[in]={values}")).unwrap_err();

        assert_eq!(
            error,
            QueryError::TooManyValues {
                field: "commentable".into(),
                max: 50,
                count: 51,
            }
        );
        assert_eq!(
            error.to_string(),
            "Too many filter values for field 'commentable' (max: 50, got: 51)"
        );
    }

    #[test]
    fn it_accepts_exactly_the_value_cap() -> testresult::TestResult {
        let values = vec!["post"; 50].join(",");
        let filter = compile(&format!("commentable[in]={values}"))?;

        assert_eq!(filter.clauses()[0].values.len(), 50);
        Ok(())
    }

    #[test]
    fn it_rejects_unsupported_operators() {
        assert!(matches!(
            compile("content[in]=a"),
            Err(QueryError::UnsupportedOperator { field, operator })
                if field == "content" && operator == "in"
        ));
        assert!(matches!(
            compile("userId[like]=a"),
            Err(QueryError::UnsupportedOperator { operator, .. }) if operator == "like"
        ));
        assert!(matches!(
            compile("userId[gt]=a"),
            Err(QueryError::UnsupportedOperator { .. })
        ));
    }

    #[test]
    fn it_normalizes_timestamp_ranges() -> testresult::TestResult {
        let filter = compile("createdAt[gte]=2026-01-01T02:00:00%2B02:00")?;

        assert_eq!(filter.clauses()[0].operator, Operator::Gte);
        assert_eq!(filter.clauses()[0].values, vec!["2026-01-01T00:00:00.000000Z"]);
        Ok(())
    }

    #[test]
    fn it_rejects_malformed_timestamps() {
        assert!(matches!(
            compile("createdAt[lt]=soon"),
            Err(QueryError::InvalidValue { field, .. }) if field == "createdAt"
        ));
    }

    #[test]
    fn it_rejects_several_values_for_single_valued_operators() {
        assert!(matches!(
            compile("createdAt[gt]=2026-01-01T00:00:00Z&createdAt[gt]=2026-02-01T00:00:00Z"),
            Err(QueryError::SingleValueExpected { .. })
        ));
    }

    #[test]
    fn it_rejects_empty_in_sets() {
        assert_eq!(
            compile("commentable[]=,"),
            Err(QueryError::EmptyValue {
                field: "commentable".into()
            })
        );
    }

    #[test]
    fn it_skips_reserved_keys() -> testresult::TestResult {
        let filter = compile("limit=10&page=2&count=false&order[createdAt]=desc")?;

        assert!(filter.is_empty());
        Ok(())
    }

    #[test]
    fn it_appends_public_constraints_after_client_filters() -> testresult::TestResult {
        let filter = compiler().compile(
            &QueryParameters::parse("status=draft"),
            Audience::Public,
        )?;

        assert_eq!(filter.len(), 2);
        assert_eq!(filter.clauses()[0].values, vec!["draft"]);
        assert_eq!(filter.clauses()[1].operator, Operator::Eq);
        assert_eq!(filter.clauses()[1].values, vec!["published"]);
        Ok(())
    }

    #[test]
    fn it_renders_a_predicate_per_clause() -> testresult::TestResult {
        let filter = compile("userId=u1&createdAt[lt]=2026-01-01T00:00:00Z")?;
        let predicate = filter.predicate();

        assert_eq!(predicate.conditions().len(), 2);
        assert_eq!(predicate.conditions()[0].column, "user_id");
        assert_eq!(predicate.conditions()[1].column, "created_at");
        Ok(())
    }
}

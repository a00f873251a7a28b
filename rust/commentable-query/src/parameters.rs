use url::form_urlencoded;

use crate::QueryError;

/// Key prefix used for ordering parameters, e.g. `order[createdAt]`.
pub const ORDER_KEY: &str = "order";
/// Page size parameter.
pub const LIMIT_KEY: &str = "limit";
/// One-based page number parameter.
pub const PAGE_KEY: &str = "page";
/// Whether the total should be counted; anything but `false` means yes.
pub const COUNT_KEY: &str = "count";

/// Decoded query-string pairs in the order the client sent them.
///
/// Repeated keys are kept as separate pairs so compilers can group them
/// while preserving first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    pairs: Vec<(String, String)>,
}

impl QueryParameters {
    /// Decode an `application/x-www-form-urlencoded` query string. A leading
    /// `?` is ignored.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }

    /// The first value supplied for `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }

    /// All pairs in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no pairs were supplied.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// A parameter key split into its name and optional bracketed modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryKey<'a> {
    /// The part before the brackets.
    pub name: &'a str,
    /// The bracketed part: `None` for `name`, `Some("")` for `name[]`.
    pub modifier: Option<&'a str>,
}

impl<'a> QueryKey<'a> {
    /// Split `name`, `name[]` or `name[modifier]`.
    pub fn parse(key: &'a str) -> Result<Self, QueryError> {
        let malformed = || QueryError::MalformedKey {
            key: key.to_owned(),
        };

        let (name, modifier) = match key.split_once('[') {
            None => (key, None),
            Some((name, rest)) => {
                let modifier = rest.strip_suffix(']').ok_or_else(malformed)?;
                if modifier.contains(['[', ']']) {
                    return Err(malformed());
                }
                (name, Some(modifier))
            }
        };

        if name.is_empty() || name.contains(']') {
            return Err(malformed());
        }

        Ok(Self { name, modifier })
    }

    /// Whether the key is consumed by ordering or pagination rather than
    /// filtering.
    pub fn is_reserved(&self) -> bool {
        match self.modifier {
            None => matches!(self.name, LIMIT_KEY | PAGE_KEY | COUNT_KEY),
            Some(_) => self.name == ORDER_KEY,
        }
    }
}

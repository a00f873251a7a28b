use std::num::IntErrorKind;

use serde::{Deserialize, Serialize};

use crate::{COUNT_KEY, LIMIT_KEY, PAGE_KEY, QueryParameters};

/// Page-size default used when none is configured.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
/// Page-size ceiling used when none is configured.
pub const DEFAULT_MAX_PAGE_LIMIT: u32 = 100;
/// Page-number ceiling used when none is configured.
pub const DEFAULT_MAX_PAGE: u32 = 10_000;

/// A bounded window into a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Rows per page, at least one.
    pub limit: u32,
    /// One-based page number.
    pub page: u32,
    /// Rows to skip: `(page - 1) * limit`.
    pub offset: u64,
    /// Whether the store should compute the total row count.
    pub include_count: bool,
}

/// Clamps client pagination into configured bounds.
///
/// Out-of-range values are pulled into range rather than rejected; values
/// that are not numbers at all fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationGuard {
    default_limit: u32,
    max_limit: u32,
    max_page: u32,
}

impl Default for PaginationGuard {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT, DEFAULT_MAX_PAGE_LIMIT, DEFAULT_MAX_PAGE)
    }
}

impl PaginationGuard {
    /// A guard with the given bounds. Zero bounds are raised to one and the
    /// default limit never exceeds the maximum.
    pub fn new(default_limit: u32, max_limit: u32, max_page: u32) -> Self {
        let max_limit = max_limit.max(1);
        Self {
            default_limit: default_limit.clamp(1, max_limit),
            max_limit,
            max_page: max_page.max(1),
        }
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    pub fn max_limit(&self) -> u32 {
        self.max_limit
    }

    pub fn max_page(&self) -> u32 {
        self.max_page
    }

    /// Clamp a requested limit and page.
    pub fn clamp(&self, limit: Option<i64>, page: Option<i64>, include_count: bool) -> Page {
        let limit = clamp_into(limit, self.default_limit, self.max_limit);
        let page = clamp_into(page, 1, self.max_page);

        Page {
            limit,
            page,
            offset: u64::from(page - 1) * u64::from(limit),
            include_count,
        }
    }

    /// Read `limit`, `page` and `count` from query parameters.
    pub fn from_parameters(&self, parameters: &QueryParameters) -> Page {
        let number = |key: &str| parameters.first(key).and_then(parse_number);
        let include_count = parameters
            .first(COUNT_KEY)
            .is_none_or(|value| !value.trim().eq_ignore_ascii_case("false"));

        self.clamp(number(LIMIT_KEY), number(PAGE_KEY), include_count)
    }
}

/// A signed integer, saturated at the `i64` bounds. Anything else is not a
/// number.
fn parse_number(value: &str) -> Option<i64> {
    match value.trim().parse::<i64>() {
        Ok(number) => Some(number),
        Err(error) => match error.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

fn clamp_into(requested: Option<i64>, default: u32, max: u32) -> u32 {
    match requested {
        None => default,
        Some(value) => value.clamp(1, i64::from(max)) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_clamps_oversized_limits_down() {
        let page = PaginationGuard::default().clamp(Some(10_000), None, true);

        assert_eq!(page.limit, 100);
        assert_eq!(page.page, 1);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn it_raises_non_positive_values_to_one() {
        let page = PaginationGuard::default().clamp(Some(0), Some(-4), false);

        assert_eq!(page.limit, 1);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn it_computes_offsets() {
        let page = PaginationGuard::new(20, 100, 50).clamp(Some(25), Some(3), true);

        assert_eq!(page.offset, 50);
    }

    #[test]
    fn it_caps_the_page_number() {
        let page = PaginationGuard::new(20, 100, 50).clamp(None, Some(51), true);

        assert_eq!(
            page,
            Page {
                limit: 20,
                page: 50,
                offset: 980,
                include_count: true,
            }
        );
    }

    #[test]
    fn it_reads_query_parameters() {
        let guard = PaginationGuard::default();

        assert_eq!(
            guard.from_parameters(&QueryParameters::parse("limit=5&page=2&count=false")),
            Page {
                limit: 5,
                page: 2,
                offset: 5,
                include_count: false,
            }
        );
        assert_eq!(
            guard.from_parameters(&QueryParameters::parse("limit=lots&page=")),
            Page {
                limit: 20,
                page: 1,
                offset: 0,
                include_count: true,
            }
        );
    }

    proptest::proptest! {
        #[test]
        fn pages_always_fall_within_bounds(
            limit in proptest::option::of(proptest::num::i64::ANY),
            page in proptest::option::of(proptest::num::i64::ANY),
        ) {
            let guard = PaginationGuard::new(20, 100, 10_000);
            let window = guard.clamp(limit, page, true);

            proptest::prop_assert!((1..=100).contains(&window.limit));
            proptest::prop_assert!((1..=10_000).contains(&window.page));
            proptest::prop_assert_eq!(
                window.offset,
                u64::from(window.page - 1) * u64::from(window.limit)
            );
        }
    }

    #[test]
    fn it_clamps_numbers_beyond_the_integer_range() {
        let guard = PaginationGuard::default();

        let page = guard.from_parameters(&QueryParameters::parse(
            "limit=99999999999999999999&page=99999999999999999999",
        ));
        assert_eq!(page.limit, 100);
        assert_eq!(page.page, 10_000);

        let page = guard.from_parameters(&QueryParameters::parse(
            "limit=-99999999999999999999&page=-99999999999999999999",
        ));
        assert_eq!(page.limit, 1);
        assert_eq!(page.page, 1);

        let page = guard.from_parameters(&QueryParameters::parse("limit=lots&page=1.5"));
        assert_eq!(page.limit, 20);
        assert_eq!(page.page, 1);
    }
}

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::types::FilterOrderInfo;
use crate::validator::{permitted_value, Validator};

pub const MAX_PAGE: i64 = 10_000_000;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Request-scoped paging and sorting options for a list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
    pub sort_safelist: &'static [&'static str],
}

impl Filters {
    pub fn new(page: i64, page_size: i64, sort: impl Into<String>, sort_safelist: &'static [&'static str]) -> Self {
        Self {
            page,
            page_size,
            sort: sort.into(),
            sort_safelist,
        }
    }

    pub fn sort_order(&self) -> Result<FilterOrderInfo, FilterError> {
        FilterOrder::parse(&self.sort, self.sort_safelist)
    }

    /// Full `ORDER BY` clause with `tiebreak` appended.
    pub fn order_by(&self, tiebreak: &str) -> Result<String, FilterError> {
        let info = self.sort_order()?;
        FilterOrder::generate(&[info], tiebreak)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

pub fn validate_filters(v: &mut Validator, f: &Filters) {
    v.check(f.page > 0, "page", "must be greater than zero");
    v.check(f.page <= MAX_PAGE, "page", "must be a maximum of 10 million");
    v.check(f.page_size > 0, "page_size", "must be greater than zero");
    v.check(f.page_size <= MAX_PAGE_SIZE, "page_size", "must be a maximum of 100");
    v.check(
        permitted_value(&f.sort.as_str(), f.sort_safelist),
        "sort",
        "invalid sort value",
    );
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::FilterError;
use crate::config::QueryConfig;
use crate::database::models::Condition;

/// Filter values meaning "do not filter on this field". Matched exactly.
pub const NO_FILTER_SENTINELS: &[&str] = &["", "All", "Все"];

pub fn is_no_filter(value: &str) -> bool {
    NO_FILTER_SENTINELS.contains(&value)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
}

impl FromStr for SortBy {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "newest" => Ok(SortBy::Newest),
            "oldest" => Ok(SortBy::Oldest),
            "price_asc" => Ok(SortBy::PriceAsc),
            "price_desc" => Ok(SortBy::PriceDesc),
            other => Err(FilterError::InvalidSortBy(other.to_string())),
        }
    }
}

/// Which products to keep and in what order. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub condition: Option<Condition>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort_by: SortBy,
}

impl ProductFilter {
    pub fn has_price_bounds(&self) -> bool {
        self.min_price.is_some() || self.max_price.is_some()
    }
}

/// 1-based page of `page_size` items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Result<Self, FilterError> {
        if page_size == 0 {
            return Err(FilterError::InvalidPageSize("pageSize must be at least 1".to_string()));
        }
        Ok(Self { page, page_size })
    }

    /// Everything on a single page
    pub fn all(total: usize) -> Self {
        Self {
            page: 1,
            page_size: total.max(1),
        }
    }
}

/// One page of results plus the totals needed to render a pager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Raw listing parameters as they arrive in a query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl ProductQuery {
    pub fn to_filter(&self) -> Result<ProductFilter, FilterError> {
        // Search and category are compared verbatim; only the empty string is "no search"
        let search = self
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let category = self
            .category
            .as_deref()
            .filter(|c| !is_no_filter(c))
            .map(str::to_string);

        let condition = match self.condition.as_deref() {
            Some(c) if !is_no_filter(c) => {
                Some(c.parse::<Condition>().map_err(FilterError::InvalidCondition)?)
            }
            _ => None,
        };

        Ok(ProductFilter {
            search,
            category,
            condition,
            min_price: parse_bound("minPrice", self.min_price.as_deref())?,
            max_price: parse_bound("maxPrice", self.max_price.as_deref())?,
            sort_by: self.sort_by.as_deref().unwrap_or_default().parse()?,
        })
    }

    /// Page request with defaults applied and the size capped to the configured maximum
    pub fn to_page_request(&self, config: &QueryConfig) -> Result<PageRequest, FilterError> {
        let page = match self.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| FilterError::InvalidPage(format!("'{}' is not a page number", raw)))?,
        };

        let requested = match self.page_size.as_deref().map(str::trim) {
            None | Some("") => config.default_page_size,
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| FilterError::InvalidPageSize(format!("'{}' is not a number", raw)))?,
        };

        let page_size = if requested > config.max_page_size {
            tracing::debug!("pageSize {} exceeds max {}, capping to max", requested, config.max_page_size);
            config.max_page_size
        } else {
            requested
        };

        PageRequest::new(page, page_size)
    }
}

fn parse_bound(field: &'static str, raw: Option<&str>) -> Result<Option<Decimal>, FilterError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_price(value)
            .map(Some)
            .ok_or_else(|| FilterError::InvalidPrice {
                field,
                value: value.to_string(),
            }),
    }
}

/// Parse a price token. Accepts plain decimal text and scientific notation.
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_config() -> QueryConfig {
        QueryConfig {
            default_page_size: 20,
            max_page_size: 50,
        }
    }

    #[test]
    fn sentinels_disable_category_and_condition() {
        let query = ProductQuery {
            category: Some("Все".into()),
            condition: Some("All".into()),
            ..Default::default()
        };
        let filter = query.to_filter().unwrap();
        assert_eq!(filter.category, None);
        assert_eq!(filter.condition, None);
        assert_eq!(filter.sort_by, SortBy::Newest);
    }

    #[test]
    fn only_exact_sentinels_disable_filters() {
        for sentinel in ["", "All", "Все"] {
            let query = ProductQuery { category: Some(sentinel.into()), ..Default::default() };
            assert_eq!(query.to_filter().unwrap().category, None, "sentinel {:?}", sentinel);
        }

        for real in ["all", "все", " All"] {
            let query = ProductQuery { category: Some(real.into()), ..Default::default() };
            assert_eq!(query.to_filter().unwrap().category.as_deref(), Some(real));
        }
    }

    #[test]
    fn search_and_category_are_not_trimmed() {
        let query = ProductQuery {
            search: Some("Phone ".into()),
            category: Some(" Books".into()),
            ..Default::default()
        };
        let filter = query.to_filter().unwrap();
        assert_eq!(filter.search.as_deref(), Some("Phone "));
        assert_eq!(filter.category.as_deref(), Some(" Books"));

        let blank = ProductQuery { search: Some("   ".into()), ..Default::default() };
        assert_eq!(blank.to_filter().unwrap().search.as_deref(), Some("   "));

        let empty = ProductQuery { search: Some(String::new()), ..Default::default() };
        assert_eq!(empty.to_filter().unwrap().search, None);
    }

    #[test]
    fn bounds_parse_as_exact_decimals() {
        let query = ProductQuery {
            min_price: Some("100".into()),
            max_price: Some("0.30".into()),
            ..Default::default()
        };
        let filter = query.to_filter().unwrap();
        assert_eq!(filter.min_price, Some(Decimal::from(100)));
        assert_eq!(filter.max_price, Some(Decimal::new(30, 2)));
    }

    #[test]
    fn rejects_garbage_inputs() {
        let bad_price = ProductQuery { min_price: Some("cheap".into()), ..Default::default() };
        assert!(matches!(bad_price.to_filter(), Err(FilterError::InvalidPrice { field: "minPrice", .. })));

        let bad_sort = ProductQuery { sort_by: Some("random".into()), ..Default::default() };
        assert!(matches!(bad_sort.to_filter(), Err(FilterError::InvalidSortBy(_))));

        let bad_condition = ProductQuery { condition: Some("Broken".into()), ..Default::default() };
        assert!(matches!(bad_condition.to_filter(), Err(FilterError::InvalidCondition(_))));
    }

    #[test]
    fn page_request_defaults_and_caps() {
        let defaults = ProductQuery::default().to_page_request(&query_config()).unwrap();
        assert_eq!(defaults, PageRequest { page: 1, page_size: 20 });

        let capped = ProductQuery { page_size: Some("500".into()), ..Default::default() }
            .to_page_request(&query_config())
            .unwrap();
        assert_eq!(capped.page_size, 50);

        let zero = ProductQuery { page_size: Some("0".into()), ..Default::default() };
        assert!(matches!(zero.to_page_request(&query_config()), Err(FilterError::InvalidPageSize(_))));
    }

    #[test]
    fn price_parsing() {
        assert_eq!(parse_price(" 500 "), Some(Decimal::from(500)));
        assert_eq!(parse_price("1e3"), Some(Decimal::from(1000)));
        assert_eq!(parse_price("abc"), None);
        assert_eq!(parse_price(""), None);
    }
}

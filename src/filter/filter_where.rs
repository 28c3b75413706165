use std::cell::Cell;

use rust_decimal::Decimal;

use super::types::{parse_price, ProductFilter};
use crate::database::models::Product;

/// Keep/drop predicate built from a `ProductFilter`
pub struct FilterWhere<'a> {
    filter: &'a ProductFilter,
    search: Option<String>,
    unpriced: Cell<usize>,
}

impl<'a> FilterWhere<'a> {
    pub fn new(filter: &'a ProductFilter) -> Self {
        Self {
            filter,
            search: filter.search.as_ref().map(|s| s.to_lowercase()),
            unpriced: Cell::new(0),
        }
    }

    /// Products dropped so far because their stored price does not parse
    pub fn unpriced(&self) -> usize {
        self.unpriced.get()
    }

    /// A product is kept iff every active criterion matches
    pub fn matches(&self, product: &Product) -> bool {
        self.matches_search(product)
            && self.matches_category(product)
            && self.matches_condition(product)
            && self.matches_price(product)
    }

    fn matches_search(&self, product: &Product) -> bool {
        match &self.search {
            Some(needle) => product.title.to_lowercase().contains(needle.as_str()),
            None => true,
        }
    }

    fn matches_category(&self, product: &Product) -> bool {
        match &self.filter.category {
            Some(category) => product.category == *category,
            None => true,
        }
    }

    fn matches_condition(&self, product: &Product) -> bool {
        match self.filter.condition {
            Some(condition) => product.condition == condition,
            None => true,
        }
    }

    fn matches_price(&self, product: &Product) -> bool {
        if !self.filter.has_price_bounds() {
            return true;
        }

        // A stored price that is not a number cannot satisfy any bound
        let Some(price) = parse_price(&product.price) else {
            tracing::debug!(product_id = %product.id, price = %product.price, "Unparseable product price excluded from price filter");
            self.unpriced.set(self.unpriced.get() + 1);
            return false;
        };

        within(price, self.filter.min_price, self.filter.max_price)
    }
}

fn within(price: Decimal, min: Option<Decimal>, max: Option<Decimal>) -> bool {
    min.map_or(true, |min| price >= min) && max.map_or(true, |max| price <= max)
}

use std::cmp::Ordering;

use rust_decimal::Decimal;

use super::types::{parse_price, SortBy};
use crate::database::models::Product;

pub struct FilterOrder;

impl FilterOrder {
    /// Stable sort: products with equal keys keep their input order.
    ///
    /// Prices that do not parse sort after every parseable price in both
    /// directions.
    pub fn sort(products: Vec<Product>, sort_by: SortBy) -> Vec<Product> {
        match sort_by {
            SortBy::Newest => Self::sort_by_created(products, true),
            SortBy::Oldest => Self::sort_by_created(products, false),
            SortBy::PriceAsc => Self::sort_by_price(products, false),
            SortBy::PriceDesc => Self::sort_by_price(products, true),
        }
    }

    fn sort_by_created(mut products: Vec<Product>, descending: bool) -> Vec<Product> {
        products.sort_by(|a, b| {
            let ord = a.created_at.cmp(&b.created_at);
            if descending { ord.reverse() } else { ord }
        });
        products
    }

    fn sort_by_price(products: Vec<Product>, descending: bool) -> Vec<Product> {
        let mut keyed: Vec<(Option<Decimal>, Product)> = products
            .into_iter()
            .map(|p| (parse_price(&p.price), p))
            .collect();

        keyed.sort_by(|(a, _), (b, _)| compare_prices(*a, *b, descending));
        keyed.into_iter().map(|(_, p)| p).collect()
    }
}

fn compare_prices(a: Option<Decimal>, b: Option<Decimal>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            if descending { b.cmp(&a) } else { a.cmp(&b) }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{Page, PageRequest, ProductFilter};
use crate::database::models::Product;

/// Product query pipeline: filter, then sort, then paginate.
///
/// Pure and deterministic: it only looks at the products it is handed and the
/// filter it was built with.
pub struct Filter {
    spec: ProductFilter,
}

impl Filter {
    pub fn new(spec: ProductFilter) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &ProductFilter {
        &self.spec
    }

    /// Products matching every criterion, in input order
    pub fn filter(&self, products: Vec<Product>) -> Vec<Product> {
        let predicate = FilterWhere::new(&self.spec);
        let kept: Vec<Product> = products.into_iter().filter(|p| predicate.matches(p)).collect();
        if predicate.unpriced() > 0 {
            tracing::warn!(count = predicate.unpriced(), "Products with unparseable prices excluded from price filter");
        }
        kept
    }

    pub fn sort(&self, products: Vec<Product>) -> Vec<Product> {
        FilterOrder::sort(products, self.spec.sort_by)
    }

    /// Full pipeline
    pub fn apply(&self, products: Vec<Product>, request: PageRequest) -> Page<Product> {
        paginate(self.sort(self.filter(products)), request)
    }
}

/// Slice `[(page-1)*size, page*size)`. Pages past the end (and page 0) are empty.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len();
    let page_size = request.page_size.max(1);
    let total_pages = total.div_ceil(page_size);

    let page_items = match request.page.checked_sub(1).and_then(|p| p.checked_mul(page_size)) {
        Some(start) if start < total => items.into_iter().skip(start).take(page_size).collect(),
        _ => Vec::new(),
    };

    Page {
        items: page_items,
        page: request.page,
        page_size,
        total,
        total_pages,
    }
}

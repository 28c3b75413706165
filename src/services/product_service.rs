use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::QueryConfig;
use crate::database::models::{Condition, Product};
use crate::database::{Repository, StoreError};
use crate::filter::{parse_price, Filter, Page, ProductQuery};
use crate::services::{MarketError, Validator};

/// Listing fields as submitted by the seller, before validation
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
}

impl NewProduct {
    /// Assign a text form field by name. Unknown names are ignored.
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "title" => &mut self.title,
            "description" => &mut self.description,
            "price" => &mut self.price,
            "category" => &mut self.category,
            "condition" => &mut self.condition,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

#[derive(Clone)]
pub struct ProductService {
    products: Repository<Product>,
    query: QueryConfig,
}

impl ProductService {
    pub fn new(products: Repository<Product>, query: QueryConfig) -> Self {
        Self { products, query }
    }

    /// Filter, sort and paginate the current listings
    pub async fn list(&self, query: &ProductQuery) -> Result<Page<Product>, MarketError> {
        let filter = Filter::new(query.to_filter()?);
        let page = query.to_page_request(&self.query)?;
        let products = self.products.select_all().await?;
        Ok(filter.apply(products, page))
    }

    pub async fn get(&self, id: &str) -> Result<Product, MarketError> {
        match self.products.find_by_id(id).await {
            Ok(product) => Ok(product),
            Err(StoreError::NotFound { .. }) => {
                Err(MarketError::NotFound(format!("Product {} not found", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check the submitted fields without touching storage
    pub fn validate(&self, input: &NewProduct) -> Result<(), MarketError> {
        validated(input).map(|_| ())
    }

    pub async fn create(
        &self,
        owner_id: &str,
        input: NewProduct,
        images: Vec<String>,
    ) -> Result<Product, MarketError> {
        let fields = validated(&input)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            title: fields.title,
            description: fields.description,
            price: fields.price,
            category: fields.category,
            condition: fields.condition,
            images,
            user_id: owner_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        let saved = self.products.save(product).await?;
        info!(product_id = %saved.id, owner = %owner_id, images = saved.images.len(), "Product created");
        Ok(saved)
    }

    /// Remove a listing owned by `requester_id`, returning what was removed
    pub async fn delete(&self, requester_id: &str, id: &str) -> Result<Product, MarketError> {
        let removed = self
            .products
            .transact(|products: &mut Vec<Product>| {
                let index = products
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or_else(|| MarketError::NotFound(format!("Product {} not found", id)))?;

                if products[index].user_id != requester_id {
                    warn!(product_id = %id, requester = %requester_id, "Delete refused for non-owner");
                    return Err(MarketError::Forbidden(
                        "Only the owner can delete this product".to_string(),
                    ));
                }
                Ok(products.remove(index))
            })
            .await?;

        info!(product_id = %id, "Product deleted");
        Ok(removed)
    }
}

struct ValidFields {
    title: String,
    description: String,
    price: String,
    category: String,
    condition: Condition,
}

fn validated(input: &NewProduct) -> Result<ValidFields, MarketError> {
    let mut v = Validator::new();
    let title = v.required("title", input.title.as_deref());
    let description = v.required("description", input.description.as_deref());
    let price = v.required("price", input.price.as_deref());
    let category = v.required("category", input.category.as_deref());
    let condition = v.required("condition", input.condition.as_deref());

    if let Some(price) = price {
        match parse_price(price) {
            Some(value) if value >= Decimal::ZERO => {}
            Some(_) => v.reject("price", "Price cannot be negative"),
            None => v.reject("price", format!("'{}' is not a decimal number", price)),
        }
    }
    let condition = condition.and_then(|c| match c.parse::<Condition>() {
        Ok(condition) => Some(condition),
        Err(problem) => {
            v.reject("condition", problem);
            None
        }
    });
    if category.is_some_and(crate::filter::is_no_filter) {
        v.reject("category", "Choose a specific category");
    }
    v.finish("Invalid product")?;

    match (title, description, price, category, condition) {
        (Some(title), Some(description), Some(price), Some(category), Some(condition)) => Ok(ValidFields {
            title: title.to_string(),
            description: description.to_string(),
            price: price.to_string(),
            category: category.to_string(),
            condition,
        }),
        _ => Err(MarketError::Internal("validated product lost a field".to_string())),
    }
}

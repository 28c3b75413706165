use axum::extract::{rejection::QueryRejection, Path, Query, State};

use crate::app::AppState;
use crate::database::models::Product;
use crate::error::ApiError;
use crate::filter::{Page, ProductQuery};
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/products - Filtered, sorted, paginated listings
///
/// Query: `search`, `category`, `condition`, `minPrice`, `maxPrice`,
/// `sortBy` (newest | oldest | price_asc | price_desc), `page`, `pageSize`.
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> ApiResult<Page<Product>> {
    let Query(query) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let page = state.products.list(&query).await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/products/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Product> {
    let product = state.products.get(&id).await?;
    Ok(ApiResponse::success(product))
}

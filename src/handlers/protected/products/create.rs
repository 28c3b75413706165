use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use tracing::debug;

use crate::app::AppState;
use crate::database::models::Product;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{MarketError, NewProduct};

/// Multipart fields whose name starts with this carry image files
const IMAGE_FIELD_PREFIX: &str = "image";

/// POST /api/products - Create a listing owned by the caller
///
/// `multipart/form-data` with text fields `title`, `description`, `price`,
/// `category`, `condition`, plus any number of file fields named `image*`.
/// Text fields are validated before any image is written.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Product> {
    let mut multipart = multipart.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let mut input = NewProduct::default();
    let mut uploads: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name.starts_with(IMAGE_FIELD_PREFIX) {
            let file_name = field.file_name().unwrap_or("image").to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            // Browsers submit an empty part for an untouched file input
            if bytes.is_empty() {
                continue;
            }
            if bytes.len() > state.images.max_size() {
                return Err(MarketError::invalid_field(
                    "images",
                    format!("Image '{}' exceeds {} bytes", file_name, state.images.max_size()),
                )
                .into());
            }
            uploads.push((file_name, bytes.to_vec()));
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            if !input.set_field(&name, value) {
                debug!(field = %name, "Ignoring unknown form field");
            }
        }
    }

    state.products.validate(&input)?;

    let mut images = Vec::with_capacity(uploads.len());
    for (file_name, bytes) in &uploads {
        match state.images.store(file_name, bytes).await {
            Ok(path) => images.push(path),
            Err(e) => {
                state.images.remove_all(&images).await;
                return Err(e.into());
            }
        }
    }

    match state.products.create(&auth.user.id, input, images.clone()).await {
        Ok(product) => Ok(ApiResponse::created(product)),
        Err(e) => {
            state.images.remove_all(&images).await;
            Err(e.into())
        }
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(err.body_text())
    } else {
        ApiError::bad_request(err.body_text())
    }
}

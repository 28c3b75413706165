pub mod auth_gate;
pub mod image_store;
pub mod product_service;
pub mod user_service;

use std::collections::HashMap;

use crate::auth::SessionError;
use crate::database::StoreError;
use crate::filter::FilterError;

pub use auth_gate::AuthGate;
pub use image_store::{sanitize_file_name, ImageStore};
pub use product_service::{NewProduct, ProductService};
pub use user_service::{ProfileUpdate, RegisterRequest, UserService};

/// Field name -> problem, reported alongside validation failures
pub type FieldErrors = HashMap<String, String>;

/// Outcome taxonomy of marketplace operations
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("{message}")]
    Validation { message: String, field_errors: FieldErrors },

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Query error: {0}")]
    Filter(#[from] FilterError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarketError {
    pub fn validation(message: impl Into<String>, field_errors: FieldErrors) -> Self {
        MarketError::Validation {
            message: message.into(),
            field_errors,
        }
    }

    /// Validation failure on a single field
    pub fn invalid_field(field: &str, problem: impl Into<String>) -> Self {
        let problem = problem.into();
        let mut field_errors = FieldErrors::new();
        field_errors.insert(field.to_string(), problem.clone());
        MarketError::Validation {
            message: problem,
            field_errors,
        }
    }
}

impl From<SessionError> for MarketError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Malformed | SessionError::Unknown => {
                MarketError::Unauthenticated("Invalid session".to_string())
            }
            SessionError::Expired => MarketError::Unauthenticated("Session expired".to_string()),
            SessionError::InvalidSecret | SessionError::TokenGeneration(_) => {
                MarketError::Internal(err.to_string())
            }
        }
    }
}

/// Trimmed value, with blank input treated as absent
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Collects per-field problems, then fails once with all of them
#[derive(Debug, Default)]
pub(crate) struct Validator {
    field_errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a required field is missing, returning its trimmed value otherwise
    pub fn required<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        let found = present(value);
        if found.is_none() {
            self.reject(field, "This field is required");
        }
        found
    }

    pub fn reject(&mut self, field: &str, problem: impl Into<String>) {
        self.field_errors
            .entry(field.to_string())
            .or_insert_with(|| problem.into());
    }

    pub fn finish(self, message: &str) -> Result<(), MarketError> {
        if self.field_errors.is_empty() {
            Ok(())
        } else {
            Err(MarketError::validation(message, self.field_errors))
        }
    }
}

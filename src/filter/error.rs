use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid {field}: '{value}' is not a decimal number")]
    InvalidPrice { field: &'static str, value: String },

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Invalid sortBy '{0}'; expected newest, oldest, price_asc or price_desc")]
    InvalidSortBy(String),

    #[error("Invalid page: {0}")]
    InvalidPage(String),

    #[error("Invalid pageSize: {0}")]
    InvalidPageSize(String),
}

impl FilterError {
    /// Query parameter the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            FilterError::InvalidPrice { field, .. } => field,
            FilterError::InvalidCondition(_) => "condition",
            FilterError::InvalidSortBy(_) => "sortBy",
            FilterError::InvalidPage(_) => "page",
            FilterError::InvalidPageSize(_) => "pageSize",
        }
    }
}

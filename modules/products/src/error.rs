use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::repo::ProductRepoError;

/// Error response body
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProductsError {
    #[error("product not found")]
    ProductNotFound,

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl ProductsError {
    fn status(&self) -> StatusCode {
        match self {
            ProductsError::ProductNotFound => StatusCode::NOT_FOUND,
            ProductsError::Validation(_) => StatusCode::BAD_REQUEST,
            ProductsError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ProductsError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            message: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

impl From<ProductRepoError> for ProductsError {
    fn from(err: ProductRepoError) -> Self {
        match err {
            ProductRepoError::NotFound => ProductsError::ProductNotFound,
            ProductRepoError::Unavailable(e) => ProductsError::Unavailable(e),
        }
    }
}

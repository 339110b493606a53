//! Mapping from service errors to HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::domain::error::PanelError;
use crate::domain::response::ApiResponse;

impl PanelError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PanelError::InvalidInput(_) | PanelError::NoFieldsToUpdate => StatusCode::BAD_REQUEST,
            PanelError::NotFound(_) | PanelError::EmptySubscription => StatusCode::NOT_FOUND,
            PanelError::GeoLookup(_) => StatusCode::BAD_GATEWAY,
            PanelError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PanelError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}

impl From<JsonRejection> for PanelError {
    fn from(rejection: JsonRejection) -> Self {
        PanelError::InvalidInput(rejection.body_text())
    }
}

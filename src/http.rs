//! HTTP response shaping for validation failures

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::schema::ValidationFailure;

impl ValidationFailure {
    /// Status code of the response. Codes outside the 4xx/5xx range fall
    /// back to 422.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.code())
            .ok()
            .filter(|status| status.is_client_error() || status.is_server_error())
            .unwrap_or(StatusCode::UNPROCESSABLE_ENTITY)
    }
}

impl IntoResponse for ValidationFailure {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!(
            status = status.as_u16(),
            code = self.kind().code(),
            "rejecting request"
        );
        (status, Json(self.report())).into_response()
    }
}

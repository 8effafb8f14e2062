//! Consistent JSON error responses.
//!
//! Every error body has the shape `{"success": false, "message": "..."}`.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use kycflow_workflow::WorkflowError;

pub fn workflow_error_to_response(err: WorkflowError) -> axum::response::Response {
    match err {
        WorkflowError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, msg),
        WorkflowError::NotFound => json_error(StatusCode::NOT_FOUND, "KYC record not found"),
        WorkflowError::Forbidden => json_error(StatusCode::FORBIDDEN, "Access denied"),
        WorkflowError::InvalidTransition { .. } => {
            json_error(StatusCode::BAD_REQUEST, err.to_string())
        }
        WorkflowError::NotApproved => {
            json_error(StatusCode::BAD_REQUEST, "KYC record is not approved")
        }
        WorkflowError::QueueUnavailable(msg) => {
            tracing::error!(error = %msg, "render queue publish failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to queue PDF generation, please retry",
            )
        }
        WorkflowError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "message": message.into(),
        })),
    )
        .into_response()
}

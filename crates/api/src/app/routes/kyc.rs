//! Applicant-facing KYC endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use kycflow_core::KycId;

use crate::app::dto::{SubmitKycRequest, kyc_to_json};
use crate::app::{errors, services::AppServices};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/kyc", post(submit))
        .route("/kyc/list/my", get(my_submissions))
        .route("/kyc/:id", get(get_submission))
}

/// POST /api/kyc - submit a new KYC application
pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<SubmitKycRequest>,
) -> axum::response::Response {
    match services
        .submissions
        .submit(ctx.user_id(), body.into_profile())
        .await
    {
        Ok(record) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "success": true,
                "message": "KYC submitted successfully",
                "data": kyc_to_json(&record),
            })),
        )
            .into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}

/// GET /api/kyc/list/my - list the caller's own submissions
pub async fn my_submissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> axum::response::Response {
    match services.submissions.my_submissions(ctx.user_id()).await {
        Ok(records) => Json(serde_json::json!({
            "success": true,
            "data": records.iter().map(kyc_to_json).collect::<Vec<_>>(),
        }))
        .into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}

/// GET /api/kyc/:id - fetch a single submission (owner or admin)
pub async fn get_submission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let kyc_id = match id.parse::<KycId>() {
        Ok(id) => id,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid KYC id"),
    };

    let result = if ctx.role().is_admin() {
        services.review.get(kyc_id).await
    } else {
        services.submissions.get_owned(ctx.user_id(), kyc_id).await
    };

    match result {
        Ok(record) => Json(serde_json::json!({
            "success": true,
            "data": kyc_to_json(&record),
        }))
        .into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}

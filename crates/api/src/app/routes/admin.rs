//! Admin review endpoints: listing, status decisions and document retrieval.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};

use kycflow_core::{KycId, KycStatus};
use kycflow_workflow::DownloadOutcome;

use crate::app::dto::{StatusUpdateRequest, kyc_to_json};
use crate::app::{errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/kyc", get(list_all))
        .route("/kyc/:id", get(get_record).patch(update_status))
        .route("/kyc/:id/pdf", get(download_pdf))
}

fn parse_id(id: &str) -> Result<KycId, axum::response::Response> {
    id.parse::<KycId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid KYC id"))
}

/// GET /api/admin/kyc - list all submissions
pub async fn list_all(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.review.list_all().await {
        Ok(records) => Json(serde_json::json!({
            "success": true,
            "data": records.iter().map(kyc_to_json).collect::<Vec<_>>(),
        }))
        .into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}

/// GET /api/admin/kyc/:id
pub async fn get_record(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let kyc_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match services.review.get(kyc_id).await {
        Ok(record) => Json(serde_json::json!({
            "success": true,
            "data": kyc_to_json(&record),
        }))
        .into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}

/// PATCH /api/admin/kyc/:id - approve or reject a submission
pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateRequest>,
) -> axum::response::Response {
    let kyc_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let target = match body.status.parse::<KycStatus>() {
        Ok(status) => status,
        Err(err) => return errors::json_error(StatusCode::BAD_REQUEST, err.to_string()),
    };

    match services.review.set_status(kyc_id, target).await {
        Ok(record) => Json(serde_json::json!({
            "success": true,
            "message": format!("KYC {}", record.status),
            "data": kyc_to_json(&record),
        }))
        .into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}

/// GET /api/admin/kyc/:id/pdf - download the document, or queue a render
pub async fn download_pdf(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let kyc_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.review.download(kyc_id).await {
        Ok(DownloadOutcome::Ready { file_name, bytes }) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{file_name}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Ok(DownloadOutcome::Queued) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({
                "success": true,
                "status": "queued",
                "message": "PDF generation has been queued. Please retry shortly.",
            })),
        )
            .into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}

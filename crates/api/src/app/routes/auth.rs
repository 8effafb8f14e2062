//! Registration and login.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;

use kycflow_auth::{Hs256Tokens, Role, password};
use kycflow_core::UserId;
use kycflow_store::{StoreError, UserAccount};

use crate::app::dto::{LoginRequest, RegisterRequest, user_to_json};
use crate::app::{errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// POST /api/auth/register
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tokens): Extension<Arc<Hs256Tokens>>,
    Json(body): Json<RegisterRequest>,
) -> axum::response::Response {
    if body.username.trim().is_empty() || body.email.trim().is_empty() || body.password.is_empty()
    {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "username, email and password are required",
        );
    }

    let role = match body.role.as_deref() {
        None => Role::User,
        Some(value) => match value.parse::<Role>() {
            Ok(role) => role,
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "role must be 'admin' or 'user'",
                );
            }
        },
    };

    let password_hash = match password::hash_password(&body.password) {
        Ok(hash) => hash,
        Err(err) => {
            tracing::error!(error = %err, "password hashing failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            );
        }
    };

    let account = UserAccount {
        id: UserId::new(),
        username: body.username,
        email: body.email,
        password_hash,
        role: role.as_str().to_string(),
        created_at: Utc::now(),
    };

    match services.users.insert(account.clone()).await {
        Ok(()) => {}
        Err(StoreError::Conflict(_)) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "Username or email already exists",
            );
        }
        Err(err) => {
            tracing::error!(error = %err, "account insert failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            );
        }
    }

    match tokens.issue(account.id, &account.username, role) {
        Ok(token) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "success": true,
                "token": token,
                "user": user_to_json(&account),
            })),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "token issue failed");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// POST /api/auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tokens): Extension<Arc<Hs256Tokens>>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    let account = match services.users.find_by_username(&body.username).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return errors::json_error(StatusCode::UNAUTHORIZED, "Invalid credentials");
        }
        Err(err) => {
            tracing::error!(error = %err, "account lookup failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            );
        }
    };

    if !password::verify_password(&body.password, &account.password_hash) {
        return errors::json_error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }

    let role = account.role.parse::<Role>().unwrap_or(Role::User);
    match tokens.issue(account.id, &account.username, role) {
        Ok(token) => Json(serde_json::json!({
            "success": true,
            "token": token,
            "user": user_to_json(&account),
        }))
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "token issue failed");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

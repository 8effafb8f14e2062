//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (stores, queue, worker)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::path::PathBuf;
use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use kycflow_auth::Hs256Tokens;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router with its own wiring (entrypoint for `main.rs`).
/// Spawns the background PDF worker.
///
/// Default wiring is in-memory. With the `persistent` feature compiled in,
/// `USE_PERSISTENT_STORES=true` switches to Postgres + Redis Streams.
pub async fn build_app(jwt_secret: String, output_dir: PathBuf) -> anyhow::Result<Router> {
    let tokens = Arc::new(Hs256Tokens::new(jwt_secret.as_bytes()));

    #[cfg(feature = "persistent")]
    if std::env::var("USE_PERSISTENT_STORES").is_ok_and(|v| v == "true" || v == "1") {
        let (app_services, worker) = services::build_persistent(output_dir.clone()).await?;
        tokio::spawn(async move { worker.run().await });
        return Ok(build_router(app_services, tokens));
    }

    let wiring = services::build_in_memory(output_dir);
    let worker = wiring.worker;
    tokio::spawn(async move { worker.run().await });
    Ok(build_router(wiring.services, tokens))
}

/// Assemble the router around pre-built services. Tests use this directly to
/// keep handles on the underlying in-memory infrastructure.
pub fn build_router(services: Arc<AppServices>, tokens: Arc<Hs256Tokens>) -> Router {
    let auth_state = middleware::AuthState {
        tokens: tokens.clone(),
    };

    let admin = routes::admin::router().layer(axum::middleware::from_fn(middleware::require_admin));

    // Protected routes: require a valid bearer token.
    let protected = routes::kyc::router()
        .nest("/admin", admin)
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest(
            "/api/auth",
            routes::auth::router()
                .layer(Extension(services))
                .layer(Extension(tokens)),
        )
        .nest("/api", protected)
        .layer(ServiceBuilder::new())
}

//! `kycflow-store` — durable record store adapters.
//!
//! The rest of the workspace talks to [`KycStore`] and [`UserStore`] traits;
//! implementations here are the in-memory stores (dev/test default) and, behind
//! the `postgres` feature, sqlx-backed stores. Per-document atomicity is the
//! only consistency guarantee callers may rely on.

pub mod error;
pub mod kyc;
pub mod user;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use error::StoreError;
pub use kyc::{InMemoryKycStore, KycStore};
pub use user::{InMemoryUserStore, UserAccount, UserStore};

#[cfg(feature = "postgres")]
pub use postgres::{PostgresKycStore, PostgresUserStore};

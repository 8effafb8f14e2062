//! `kycflow-core` — domain model shared across the workspace.
//!
//! Holds the strongly-typed identifiers, the KYC record itself, the render
//! job message published to the queue, and the domain error model. No I/O.

pub mod error;
pub mod id;
pub mod job;
pub mod kyc;

pub use error::{DomainError, DomainResult};
pub use id::{KycId, UserId};
pub use job::RenderJob;
pub use kyc::{KycProfile, KycRecord, KycStatus};

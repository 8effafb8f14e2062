//! `kycflow-workflow` — submission, review and background rendering services.
//!
//! The services own the business rules; storage and queueing stay behind the
//! `KycStore` / `JobQueue` traits so the same logic runs against the
//! in-memory wiring and the persistent one.

pub mod error;
pub mod review;
pub mod submission;
pub mod worker;

pub use error::WorkflowError;
pub use review::{DownloadOutcome, ReviewService};
pub use submission::SubmissionService;
pub use worker::PdfWorker;

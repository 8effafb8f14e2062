pub mod admin;
pub mod auth;
pub mod kyc;
pub mod system;

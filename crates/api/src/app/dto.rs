//! Request/response DTOs and JSON mapping helpers.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use kycflow_core::{KycProfile, KycRecord};
use kycflow_store::UserAccount;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// "admin" or "user"; defaults to "user".
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitKycRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub id_number: String,
    pub date_of_birth: NaiveDate,
}

impl SubmitKycRequest {
    pub fn into_profile(self) -> KycProfile {
        KycProfile {
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            id_number: self.id_number,
            date_of_birth: self.date_of_birth,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

pub fn kyc_to_json(record: &KycRecord) -> serde_json::Value {
    json!({
        "id": record.id.to_string(),
        "userId": record.user_id.to_string(),
        "fullName": record.profile.full_name,
        "email": record.profile.email,
        "phone": record.profile.phone,
        "address": record.profile.address,
        "idNumber": record.profile.id_number,
        "dateOfBirth": record.profile.date_of_birth.format("%Y-%m-%d").to_string(),
        "summary": record.summary,
        "status": record.status.as_str(),
        "pdfGenerated": record.pdf_path.is_some(),
        "pdfGeneratedAt": record.pdf_generated_at.map(|t| t.to_rfc3339()),
        "submittedAt": record.submitted_at.to_rfc3339(),
    })
}

pub fn user_to_json(account: &UserAccount) -> serde_json::Value {
    json!({
        "id": account.id.to_string(),
        "username": account.username,
        "email": account.email,
        "role": account.role,
    })
}

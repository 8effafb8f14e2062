use kycflow_auth::Role;
use kycflow_core::UserId;

/// Authenticated caller identity, attached to every protected request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    user_id: UserId,
    username: String,
    role: Role,
}

impl AuthContext {
    pub fn new(user_id: UserId, username: String, role: Role) -> Self {
        Self {
            user_id,
            username,
            role,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

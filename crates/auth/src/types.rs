use lumen_core::types::Role;
use serde::{Deserialize, Serialize};

/// Full account record. Stored in SQLite; `password_hash` never leaves this
/// crate in any API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUIDv7 — time-sortable, useful for log correlation.
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn to_principal(&self) -> lumen_core::types::Principal {
        lumen_core::types::Principal {
            user_id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

/// A one-time code sent for password recovery. At most one live row exists
/// per user: issuing a new code overwrites the prior one in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpCode {
    pub id: String,
    pub user_id: String,
    pub code_hash: String,
    pub attempts_remaining: i64,
    pub consumed: bool,
    pub expires_at: String,
    pub created_at: String,
}

/// A long-lived opaque token exchanged for a fresh access token. One row per
/// issued refresh token so logout can revoke a single device's session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub revoked: bool,
    pub expires_at: String,
    pub created_at: String,
}

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a fresh, time-sortable identifier (UUIDv7), following the
/// teacher's convention of using v7 ids for anything that gets ordered
/// by recency without a separate `created_at` index scan.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// RFC3339 timestamp for "now", used consistently across every table so
/// timestamps are directly comparable as strings.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Role hierarchy: admin > instructor > student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Instructor,
    #[default]
    Student,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Instructor => write!(f, "instructor"),
            Role::Student => write!(f, "student"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "instructor" => Ok(Role::Instructor),
            "student" => Ok(Role::Student),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The authenticated principal extracted from a verified access token.
/// Passed down from the auth guard into handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl Principal {
    /// Returns an error-shaped reason if `caller` may not act on behalf of
    /// `subject_user_id`. Resolves the open question in spec.md §9: a
    /// non-admin caller's `user_id` query parameter must match their own
    /// bearer identity.
    pub fn authorize_user_scope(&self, subject_user_id: &str) -> Result<(), String> {
        if self.role.is_admin() || self.user_id == subject_user_id {
            Ok(())
        } else {
            Err(format!(
                "caller {} may not act as user {subject_user_id}",
                self.user_id
            ))
        }
    }
}

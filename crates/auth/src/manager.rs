use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use lumen_core::jwt::{self, KeyRing};
use lumen_core::types::{new_id, now_rfc3339, Role};
use lumen_generator::Mailer;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::otp;
use crate::password;
use crate::types::User;

const OTP_TTL_MINUTES: i64 = 10;
const OTP_MAX_ATTEMPTS: i64 = 5;
const OTP_RESEND_COOLDOWN_SECS: i64 = 60;
const REFRESH_TOKEN_TTL_DAYS: i64 = 14;

/// Result of any flow that ends with the caller being logged in.
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Thread-safe manager for accounts, OTP codes and refresh tokens.
///
/// Wraps a single SQLite connection in a `Mutex`, following the same
/// single-node trade-off as the rest of Lumen's per-service managers.
pub struct AuthManager {
    db: Mutex<Connection>,
    keys: KeyRing,
    mailer: Arc<dyn Mailer>,
}

impl lumen_core::auth_guard::HasKeyRing for AuthManager {
    fn key_ring(&self) -> &KeyRing {
        &self.keys
    }
}

impl AuthManager {
    pub fn new(conn: Connection, keys: KeyRing, mailer: Arc<dyn Mailer>) -> Self {
        Self { db: Mutex::new(conn), keys, mailer }
    }

    #[instrument(skip(self, password))]
    pub fn signup(&self, email: &str, name: &str, password: &str) -> Result<Session> {
        password::check_policy(password, name, email)?;
        let email = email.trim().to_lowercase();

        let db = self.db.lock().unwrap();
        let exists: Option<String> =
            db.query_row("SELECT id FROM users WHERE email = ?1", params![email], |r| r.get(0)).optional()?;
        if exists.is_some() {
            return Err(AuthError::AlreadyExists(email));
        }

        let now = now_rfc3339();
        let user = User {
            id: new_id(),
            email: email.clone(),
            name: name.to_string(),
            role: Role::Student,
            password_hash: password::hash(password)?,
            email_verified: false,
            created_at: now.clone(),
            updated_at: now,
        };
        insert_user(&db, &user)?;
        info!(user_id = %user.id, "account created");
        drop(db);

        self.issue_session(user)
    }

    #[instrument(skip(self, password))]
    pub fn login(&self, email: &str, password: &str) -> Result<Session> {
        let user = self.find_by_email(email)?.ok_or(AuthError::InvalidCredentials)?;
        if !password::verify(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        self.issue_session(user)
    }

    /// Issues a password-recovery one-time code via the mailer. Silently
    /// succeeds for unknown emails, and silently no-ops within the resend
    /// cooldown, so the endpoint cannot be used to enumerate accounts or
    /// to flood a mailbox.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let Some(user) = self.find_by_email(email)? else {
            return Ok(());
        };
        self.issue_otp(&user).await?;
        Ok(())
    }

    /// Checks a recovery code without consuming it, so a client can
    /// validate the code before presenting the "set new password" form.
    /// Wrong attempts still decrement `attempts_remaining`, and exhausting
    /// them burns the code.
    #[instrument(skip(self, code))]
    pub fn verify_otp(&self, email: &str, code: &str) -> Result<()> {
        let user = self.find_by_email(email)?.ok_or(AuthError::InvalidOtp)?;
        self.check_otp(&user.id, code)
    }

    #[instrument(skip(self, code, new_password))]
    pub fn reset_password(&self, email: &str, code: &str, new_password: &str) -> Result<()> {
        let user = self.find_by_email(email)?.ok_or(AuthError::InvalidOtp)?;
        password::check_policy(new_password, &user.name, &user.email)?;
        self.consume_otp(&user.id, code)?;

        let hash = password::hash(new_password)?;
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
            params![user.id, hash, now],
        )?;
        db.execute("UPDATE refresh_tokens SET revoked = 1 WHERE user_id = ?1", params![user.id])?;
        Ok(())
    }

    #[instrument(skip(self, refresh_token))]
    pub fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let token_hash = otp::hash(refresh_token);
        let db = self.db.lock().unwrap();
        let row: Option<(String, String, bool, String)> = db
            .query_row(
                "SELECT id, user_id, revoked, expires_at FROM refresh_tokens WHERE token_hash = ?1",
                params![token_hash],
                |r| Ok((r.get(0)?, r.get(1)?, r.get::<_, i64>(2)? != 0, r.get(3)?)),
            )
            .optional()?;

        let (token_id, user_id, revoked, expires_at) = row.ok_or(AuthError::InvalidRefreshToken)?;
        if revoked || expires_at < now_rfc3339() {
            return Err(AuthError::InvalidRefreshToken);
        }
        db.execute("UPDATE refresh_tokens SET revoked = 1 WHERE id = ?1", params![token_id])?;

        let user = get_user(&db, &user_id)?.ok_or_else(|| AuthError::NotFound(user_id.clone()))?;
        drop(db);
        self.issue_session(user)
    }

    #[instrument(skip(self, refresh_token))]
    pub fn logout(&self, refresh_token: &str) -> Result<()> {
        let token_hash = otp::hash(refresh_token);
        let db = self.db.lock().unwrap();
        db.execute("UPDATE refresh_tokens SET revoked = 1 WHERE token_hash = ?1", params![token_hash])?;
        Ok(())
    }

    pub fn get_user(&self, user_id: &str) -> Result<User> {
        let db = self.db.lock().unwrap();
        get_user(&db, user_id)?.ok_or_else(|| AuthError::NotFound(user_id.to_string()))
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        let db = self.db.lock().unwrap();
        find_user_by_email(&db, &email)
    }

    fn issue_session(&self, user: User) -> Result<Session> {
        let access_token = jwt::encode_access_token(&self.keys, &user.to_principal())
            .map_err(|e| AuthError::TokenIssue(e.to_string()))?;
        let refresh_token = Uuid::new_v4().to_string();
        let token_hash = otp::hash(&refresh_token);
        let now = Utc::now();
        let expires_at = (now + Duration::days(REFRESH_TOKEN_TTL_DAYS)).to_rfc3339();

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, revoked, expires_at, created_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5)",
            params![new_id(), user.id, token_hash, expires_at, now.to_rfc3339()],
        )?;

        Ok(Session { user, access_token, refresh_token })
    }

    /// Issues (or supersedes) the single live recovery code for `user`.
    /// Upserts by `user_id`, so a redelivered/repeat request always leaves
    /// exactly one non-consumed row behind, per the "≤1 live OTP per
    /// email" invariant. A request inside the resend cooldown is a no-op.
    async fn issue_otp(&self, user: &User) -> Result<()> {
        let now = Utc::now();

        {
            let db = self.db.lock().unwrap();
            let last_issued: Option<String> =
                db.query_row("SELECT created_at FROM otp_codes WHERE user_id = ?1", params![user.id], |r| r.get(0)).optional()?;
            if let Some(last_issued) = last_issued {
                if let Ok(last_issued) = chrono::DateTime::parse_from_rfc3339(&last_issued) {
                    if now.signed_duration_since(last_issued) < Duration::seconds(OTP_RESEND_COOLDOWN_SECS) {
                        return Ok(());
                    }
                }
            }
        }

        let code = otp::generate();
        let code_hash = otp::hash(&code);
        let expires_at = (now + Duration::minutes(OTP_TTL_MINUTES)).to_rfc3339();

        {
            let db = self.db.lock().unwrap();
            db.execute(
                "INSERT INTO otp_codes (id, user_id, code_hash, attempts_remaining, consumed, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)
                 ON CONFLICT(user_id) DO UPDATE SET
                    code_hash = excluded.code_hash,
                    attempts_remaining = excluded.attempts_remaining,
                    consumed = 0,
                    expires_at = excluded.expires_at,
                    created_at = excluded.created_at",
                params![new_id(), user.id, code_hash, OTP_MAX_ATTEMPTS, expires_at, now.to_rfc3339()],
            )?;
        }

        self.mailer
            .send_otp(&user.email, &code)
            .await
            .map_err(|_| AuthError::InvalidOtp)?;
        Ok(())
    }

    /// Checks `code` against the user's live OTP without consuming it on
    /// success. A wrong code decrements `attempts_remaining`; reaching zero
    /// consumes (burns) the code so it can no longer be checked or used.
    fn check_otp(&self, user_id: &str, code: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let row: Option<(String, String, i64, String, bool)> = db
            .query_row(
                "SELECT id, code_hash, attempts_remaining, expires_at, consumed FROM otp_codes WHERE user_id = ?1",
                params![user_id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get::<_, i64>(4)? != 0)),
            )
            .optional()?;
        let Some((otp_id, code_hash, attempts_remaining, expires_at, consumed)) = row else {
            return Err(AuthError::InvalidOtp);
        };

        if consumed || attempts_remaining <= 0 || expires_at < now_rfc3339() {
            return Err(AuthError::InvalidOtp);
        }

        if otp::verify(code, &code_hash) {
            return Ok(());
        }

        let attempts_remaining = attempts_remaining - 1;
        db.execute(
            "UPDATE otp_codes SET attempts_remaining = ?2, consumed = ?3 WHERE id = ?1",
            params![otp_id, attempts_remaining, (attempts_remaining <= 0) as i32],
        )?;
        Err(AuthError::InvalidOtp)
    }

    /// Verifies then consumes the user's live OTP, so it cannot be replayed.
    fn consume_otp(&self, user_id: &str, code: &str) -> Result<()> {
        self.check_otp(user_id, code)?;
        let db = self.db.lock().unwrap();
        db.execute("UPDATE otp_codes SET consumed = 1 WHERE user_id = ?1", params![user_id])?;
        Ok(())
    }
}

fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, name, role, password_hash, email_verified, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id,
            user.email,
            user.name,
            user.role.to_string(),
            user.password_hash,
            user.email_verified as i32,
            user.created_at,
            user.updated_at,
        ],
    )?;
    Ok(())
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let role_str: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: role_str.parse().unwrap_or_default(),
        password_hash: row.get(4)?,
        email_verified: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    const SQL: &str =
        "SELECT id, email, name, role, password_hash, email_verified, created_at, updated_at FROM users WHERE id = ?1";
    conn.query_row(SQL, params![user_id], row_to_user).optional().map_err(AuthError::Database)
}

fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    const SQL: &str =
        "SELECT id, email, name, role, password_hash, email_verified, created_at, updated_at FROM users WHERE email = ?1";
    conn.query_row(SQL, params![email], row_to_user).optional().map_err(AuthError::Database)
}

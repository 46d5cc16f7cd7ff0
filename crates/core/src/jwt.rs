use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::types::{Principal, Role};

/// Claims embedded in a signed access token, per spec.md §4.2:
/// `{sub, email, name, role, iat, exp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl From<AccessClaims> for Principal {
    fn from(c: AccessClaims) -> Self {
        Principal {
            user_id: c.sub,
            email: c.email,
            name: c.name,
            role: c.role,
        }
    }
}

pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
pub const REFRESH_TOKEN_TTL_SECS: i64 = 14 * 24 * 60 * 60;

/// A rotatable set of HMAC signing keys, indexed by `kid`.
///
/// Every service loads the same keyring from shared config so that access
/// tokens minted by Auth can be verified statelessly by every other
/// service, per spec.md §4.2's "signing key is rotated by `kid`" note.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeyRing {
    pub current_kid: String,
    pub keys: HashMap<String, String>,
}

impl KeyRing {
    pub fn single(kid: impl Into<String>, secret: impl Into<String>) -> Self {
        let kid = kid.into();
        let mut keys = HashMap::new();
        keys.insert(kid.clone(), secret.into());
        Self { current_kid: kid, keys }
    }

    fn signing_secret(&self) -> Result<&str> {
        self.keys
            .get(&self.current_kid)
            .map(String::as_str)
            .ok_or_else(|| AppError::Internal("current_kid not present in keyring".into()))
    }

    fn verifying_secret(&self, kid: &str) -> Result<&str> {
        self.keys
            .get(kid)
            .map(String::as_str)
            .ok_or_else(|| AppError::Auth("unknown signing key id".into()))
    }
}

/// Mint a signed access token for `principal`, valid for `ACCESS_TOKEN_TTL_SECS`.
pub fn encode_access_token(keys: &KeyRing, principal: &Principal) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = AccessClaims {
        sub: principal.user_id.clone(),
        email: principal.email.clone(),
        name: principal.name.clone(),
        role: principal.role,
        iat: now,
        exp: now + ACCESS_TOKEN_TTL_SECS,
    };
    let header = jsonwebtoken::Header {
        kid: Some(keys.current_kid.clone()),
        ..jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256)
    };
    let secret = keys.signing_secret()?;
    jsonwebtoken::encode(
        &header,
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("jwt encode failed: {e}")))
}

/// Verify and decode an access token, selecting the verifying key by the
/// token's own `kid` header so rotation never invalidates tokens signed
/// under a still-retained previous key.
pub fn decode_access_token(keys: &KeyRing, token: &str) -> Result<AccessClaims> {
    let header = jsonwebtoken::decode_header(token)
        .map_err(|_| AppError::Auth("malformed token".into()))?;
    let kid = header.kid.ok_or_else(|| AppError::Auth("token missing kid".into()))?;
    let secret = keys.verifying_secret(&kid)?;

    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;

    let data = jsonwebtoken::decode::<AccessClaims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::Auth("expired_token".into()),
        _ => AppError::Auth("invalid_token".into()),
    })?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal {
            user_id: "u1".into(),
            email: "asha@x.io".into(),
            name: "Asha Rao".into(),
            role: Role::Student,
        }
    }

    #[test]
    fn round_trips_claims() {
        let keys = KeyRing::single("k1", "super-secret");
        let token = encode_access_token(&keys, &principal()).unwrap();
        let claims = decode_access_token(&keys, &token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.email, "asha@x.io");
    }

    #[test]
    fn rotated_key_still_verifies_old_tokens() {
        let mut keys = KeyRing::single("k1", "secret-one");
        let token = encode_access_token(&keys, &principal()).unwrap();

        keys.keys.insert("k2".to_string(), "secret-two".to_string());
        keys.current_kid = "k2".to_string();

        // old token, signed under k1, must still verify because k1 is retained.
        let claims = decode_access_token(&keys, &token).unwrap();
        assert_eq!(claims.sub, "u1");
    }

    #[test]
    fn unknown_kid_is_rejected() {
        let keys = KeyRing::single("k1", "secret-one");
        let token = encode_access_token(&keys, &principal()).unwrap();

        let other_keys = KeyRing::single("k2", "secret-two");
        let err = decode_access_token(&other_keys, &token).unwrap_err();
        assert_eq!(err.code(), "auth");
    }
}

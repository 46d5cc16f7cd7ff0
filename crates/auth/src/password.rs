use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{AuthError, Result};

/// Minimum password length enforced at signup and reset time.
const MIN_PASSWORD_LEN: usize = 8;

/// Case-folded substrings shorter than this are too common to ban.
const MIN_FORBIDDEN_SUBSTRING_LEN: usize = 3;

/// Enforces the signup/reset password policy: minimum length, an uppercase
/// letter, a digit, a symbol, and no case-folded substring of length ≥3
/// drawn from `name`'s whitespace-separated parts or `email`'s local part.
pub fn check_policy(password: &str, name: &str, email: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword(format!("must be at least {MIN_PASSWORD_LEN} characters")));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(AuthError::WeakPassword("must contain an uppercase letter".into()));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword("must contain a digit".into()));
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err(AuthError::WeakPassword("must contain a symbol".into()));
    }

    let password_lower = password.to_lowercase();
    let email_local = email.split('@').next().unwrap_or("");
    let forbidden_parts = name.split_whitespace().chain(std::iter::once(email_local));
    for part in forbidden_parts {
        if contains_forbidden_substring(&password_lower, part) {
            return Err(AuthError::WeakPassword("must not contain part of your name or email".into()));
        }
    }
    Ok(())
}

/// True if any substring of `part` with length ≥`MIN_FORBIDDEN_SUBSTRING_LEN`
/// (case-folded) occurs in `password_lower`.
fn contains_forbidden_substring(password_lower: &str, part: &str) -> bool {
    let part_lower = part.to_lowercase();
    let chars: Vec<char> = part_lower.chars().collect();
    let len = chars.len();
    if len < MIN_FORBIDDEN_SUBSTRING_LEN {
        return false;
    }
    for window in MIN_FORBIDDEN_SUBSTRING_LEN..=len {
        for start in 0..=(len - window) {
            let substring: String = chars[start..start + window].iter().collect();
            if password_lower.contains(&substring) {
                return true;
            }
        }
    }
    false
}

pub fn hash(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

pub fn verify(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trips() {
        let h = hash("correct-horse-battery").unwrap();
        assert!(verify("correct-horse-battery", &h));
        assert!(!verify("wrong-password-entirely", &h));
    }

    #[test]
    fn rejects_short_passwords() {
        assert!(check_policy("Short1!", "Asha Rao", "asha@x.io").is_err());
    }

    #[test]
    fn rejects_missing_character_classes() {
        assert!(check_policy("alllowercase1!", "Asha Rao", "asha@x.io").is_err());
        assert!(check_policy("NoDigitsHere!", "Asha Rao", "asha@x.io").is_err());
        assert!(check_policy("NoSymbol1here", "Asha Rao", "asha@x.io").is_err());
    }

    #[test]
    fn rejects_password_containing_name_or_email_substring() {
        assert!(check_policy("asharao#1A", "Asha Rao", "asha@x.io").is_err());
        assert!(check_policy("xRaoPass1!", "Asha Rao", "asha@x.io").is_err());
    }

    #[test]
    fn accepts_strong_unrelated_password() {
        assert!(check_policy("Strong#1a", "Asha Rao", "asha@x.io").is_ok());
    }
}

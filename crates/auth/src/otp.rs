use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of a human-typeable one-time code.
const OTP_LEN: usize = 6;

pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    (0..OTP_LEN).map(|_| rng.gen_range(0..10).to_string()).collect()
}

pub fn hash(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify(code: &str, stored_hash: &str) -> bool {
    hash(code) == stored_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_has_expected_length_and_is_numeric() {
        let code = generate();
        assert_eq!(code.len(), OTP_LEN);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn hash_verifies_only_matching_code() {
        let code = generate();
        let h = hash(&code);
        assert!(verify(&code, &h));
        assert!(!verify("000000", &h));
    }
}

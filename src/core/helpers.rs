use std::collections::HashSet;
use std::sync::OnceLock;

use ammonia::Builder;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use rand::Rng;
use regex::Regex;

use crate::core::errors::ApiError;

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789_ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const USER_ID_LENGTH: usize = 10;
pub const EVENT_ID_LENGTH: usize = 14;
pub const PLACE_ID_LENGTH: usize = 14;
pub const TICKET_ID_LENGTH: usize = 12;
pub const MERCH_ID_LENGTH: usize = 14;
pub const MEDIA_ID_LENGTH: usize = 16;
pub const REVIEW_ID_LENGTH: usize = 12;
pub const ACTIVITY_ID_LENGTH: usize = 16;

/// UTC timestamp with fixed precision, so stored values sort as strings.
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Random opaque identifier of `len` characters from `[a-z0-9_A-Z]`.
pub fn generate_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

pub fn generate_user_id() -> String {
    format!("u{}", generate_id(USER_ID_LENGTH))
}

fn id_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{1,64}$").expect("Regex should compile"))
}

pub fn validate_id(id: &str) -> bool {
    id_regex().is_match(id)
}

/// Rejects malformed path identifiers before they reach the store.
pub fn checked_id(id: &str) -> Result<&str, ApiError> {
    if validate_id(id) {
        Ok(id)
    } else {
        Err(ApiError::bad_request("Invalid id"))
    }
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Plain text only: every HTML tag is stripped. Entities are decoded again
/// so stored text is escaped once, at render time.
pub fn sanitize_text(text: &str) -> String {
    let stripped = Builder::default().tags(HashSet::new()).clean(text).to_string();
    html_escape::decode_html_entities(&stripped).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_use_the_alphabet() {
        let id = generate_id(EVENT_ID_LENGTH);

        assert_eq!(id.len(), EVENT_ID_LENGTH);
        assert!(validate_id(&id));
        assert!(generate_user_id().starts_with('u'));
        assert_eq!(generate_user_id().len(), USER_ID_LENGTH + 1);
    }

    #[test]
    fn path_ids_reject_traversal() {
        assert!(!validate_id("../etc/passwd"));
        assert!(!validate_id(""));
        assert!(!validate_id("a b"));
        assert!(checked_id("abc_DEF9").is_ok());
    }

    #[test]
    fn password_hash_is_not_the_plaintext() {
        let hash = hash_password("hunter2").unwrap();

        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }

    #[test]
    fn sanitize_strips_markup() {
        assert_eq!(sanitize_text("<b>Gig</b> <script>x()</script>night"), "Gig night");
        assert_eq!(sanitize_text("Rock & Roll"), "Rock & Roll");
    }
}

//! Password hashing and verification for Solera.
//!
//! New hashes use Argon2id by default, with bcrypt and PBKDF2-HMAC-SHA256
//! as configurable alternatives. Stored hashes are self-describing:
//! verification dispatches on the parsed format, including a legacy
//! unsalted SHA-256 format kept only for migrating pre-existing records.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2, Params,
};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Hard floor below which a password is rejected outright.
pub const ABSOLUTE_MIN_PASSWORD_LENGTH: usize = 4;

/// Maximum password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Iteration count used when producing PBKDF2 hashes.
pub const PBKDF2_ITERATIONS: u32 = 310_000;

/// Minimum acceptable PBKDF2 iteration count before a rehash is due.
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

/// Minimum acceptable bcrypt cost factor before a rehash is due.
pub const MIN_BCRYPT_COST: u32 = 12;

const PBKDF2_SALT_LEN: usize = 16;
const PBKDF2_DIGEST_LEN: usize = 32;
const PBKDF2_PREFIX: &str = "pbkdf2_sha256";

/// Password-related errors.
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Password is too short.
    #[error("password must be at least {ABSOLUTE_MIN_PASSWORD_LENGTH} characters")]
    TooShort,

    /// Password is too long.
    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    TooLong,

    /// Stored hash string is malformed or in an unknown format.
    #[error("invalid password hash format")]
    InvalidHash,

    /// The underlying hashing backend failed.
    #[error("password hashing failed: {0}")]
    Backend(String),
}

/// Hashing algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashMethod {
    /// Pick the strongest algorithm from [`PREFERRED_METHODS`].
    #[default]
    Auto,
    /// Argon2id.
    Argon2,
    /// bcrypt.
    Bcrypt,
    /// PBKDF2-HMAC-SHA256.
    Pbkdf2,
}

/// Method preference order for `HashMethod::Auto`, strongest first.
pub const PREFERRED_METHODS: &[HashMethod] =
    &[HashMethod::Argon2, HashMethod::Bcrypt, HashMethod::Pbkdf2];

impl HashMethod {
    /// Parse a configuration tag; unknown tags fall back to Auto.
    pub fn from_config(tag: &str) -> Self {
        match tag.to_lowercase().as_str() {
            "argon2" | "argon2id" => HashMethod::Argon2,
            "bcrypt" => HashMethod::Bcrypt,
            "pbkdf2" | "pbkdf2_sha256" => HashMethod::Pbkdf2,
            _ => HashMethod::Auto,
        }
    }
}

/// A parsed stored hash.
///
/// All format detection lives in [`HashFormat::parse`]; everything else
/// dispatches on the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashFormat {
    /// PHC-formatted Argon2 hash string.
    Argon2(String),
    /// bcrypt hash string.
    Bcrypt(String),
    /// PBKDF2-HMAC-SHA256 with explicit parameters.
    Pbkdf2 {
        /// Iteration count.
        iterations: u32,
        /// Per-password random salt.
        salt: Vec<u8>,
        /// Derived key.
        digest: Vec<u8>,
    },
    /// Legacy unsalted SHA-256 digest (verify-only).
    LegacySha256([u8; 32]),
}

impl HashFormat {
    /// Parse a stored hash string into its format.
    pub fn parse(stored: &str) -> Result<Self, PasswordError> {
        if stored.starts_with("$argon2") {
            return Ok(HashFormat::Argon2(stored.to_string()));
        }

        if stored.starts_with("$2a$") || stored.starts_with("$2b$") || stored.starts_with("$2y$") {
            return Ok(HashFormat::Bcrypt(stored.to_string()));
        }

        if let Some(rest) = stored.strip_prefix("pbkdf2_sha256$") {
            let mut parts = rest.splitn(3, '$');
            let iterations = parts
                .next()
                .and_then(|p| p.parse::<u32>().ok())
                .ok_or(PasswordError::InvalidHash)?;
            let salt = parts
                .next()
                .and_then(|p| STANDARD_NO_PAD.decode(p).ok())
                .ok_or(PasswordError::InvalidHash)?;
            let digest = parts
                .next()
                .and_then(|p| STANDARD_NO_PAD.decode(p).ok())
                .ok_or(PasswordError::InvalidHash)?;
            if salt.is_empty() || digest.is_empty() {
                return Err(PasswordError::InvalidHash);
            }
            return Ok(HashFormat::Pbkdf2 {
                iterations,
                salt,
                digest,
            });
        }

        if stored.len() == 64 && stored.chars().all(|c| c.is_ascii_hexdigit()) {
            let bytes = hex::decode(stored).map_err(|_| PasswordError::InvalidHash)?;
            let digest: [u8; 32] = bytes.try_into().map_err(|_| PasswordError::InvalidHash)?;
            return Ok(HashFormat::LegacySha256(digest));
        }

        Err(PasswordError::InvalidHash)
    }
}

/// Stateless password hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher {
    method: HashMethod,
}

impl PasswordHasher {
    /// Create a hasher using the given method.
    pub fn new(method: HashMethod) -> Self {
        Self { method }
    }

    /// The configured method.
    pub fn method(&self) -> HashMethod {
        self.method
    }

    /// Hash a password into a self-describing storable string.
    ///
    /// Rejects passwords shorter than 4 or longer than 128 characters.
    /// Never produces the legacy format.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.len() < ABSOLUTE_MIN_PASSWORD_LENGTH {
            return Err(PasswordError::TooShort);
        }
        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(PasswordError::TooLong);
        }

        match self.method {
            HashMethod::Auto => match PREFERRED_METHODS[0] {
                HashMethod::Bcrypt => hash_bcrypt(password),
                HashMethod::Pbkdf2 => Ok(hash_pbkdf2(password)),
                _ => hash_argon2(password),
            },
            HashMethod::Argon2 => hash_argon2(password),
            HashMethod::Bcrypt => hash_bcrypt(password),
            HashMethod::Pbkdf2 => Ok(hash_pbkdf2(password)),
        }
    }

    /// Verify a password against a stored hash.
    ///
    /// Returns false for a mismatch; errors only on malformed input or a
    /// backend failure.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool, PasswordError> {
        match HashFormat::parse(stored)? {
            HashFormat::Argon2(phc) => {
                let parsed = PasswordHash::new(&phc).map_err(|_| PasswordError::InvalidHash)?;
                match Argon2::default().verify_password(password.as_bytes(), &parsed) {
                    Ok(()) => Ok(true),
                    Err(argon2::password_hash::Error::Password) => Ok(false),
                    Err(e) => Err(PasswordError::Backend(e.to_string())),
                }
            }
            HashFormat::Bcrypt(hash) => {
                bcrypt::verify(password, &hash).map_err(|e| PasswordError::Backend(e.to_string()))
            }
            HashFormat::Pbkdf2 {
                iterations,
                salt,
                digest,
            } => {
                let mut computed = vec![0u8; digest.len()];
                pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut computed);
                Ok(computed.as_slice().ct_eq(digest.as_slice()).into())
            }
            HashFormat::LegacySha256(digest) => {
                let computed = Sha256::digest(password.as_bytes());
                Ok(computed.as_slice().ct_eq(digest.as_slice()).into())
            }
        }
    }

    /// Whether a stored hash should be re-hashed on next successful login.
    ///
    /// True for the legacy format, for PBKDF2 below the minimum
    /// iteration count, for bcrypt below the minimum cost, and for
    /// anything unparseable. Performs no rehash itself.
    pub fn needs_rehash(&self, stored: &str) -> bool {
        match HashFormat::parse(stored) {
            Ok(HashFormat::Argon2(_)) => false,
            Ok(HashFormat::Bcrypt(hash)) => {
                bcrypt_cost(&hash).map_or(true, |cost| cost < MIN_BCRYPT_COST)
            }
            Ok(HashFormat::Pbkdf2 { iterations, .. }) => iterations < MIN_PBKDF2_ITERATIONS,
            Ok(HashFormat::LegacySha256(_)) => true,
            Err(_) => true,
        }
    }
}

/// Create the Argon2 hasher with recommended parameters.
///
/// Memory cost 64 MB, time cost 3, parallelism 4.
fn create_argon2() -> Argon2<'static> {
    let params = Params::new(65536, 3, 4, None).expect("valid Argon2 params");
    Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
}

fn hash_argon2(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = create_argon2()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Backend(e.to_string()))?;
    Ok(hash.to_string())
}

fn hash_bcrypt(password: &str) -> Result<String, PasswordError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| PasswordError::Backend(e.to_string()))
}

fn hash_pbkdf2(password: &str) -> String {
    let mut salt = [0u8; PBKDF2_SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut digest = [0u8; PBKDF2_DIGEST_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut digest);

    format!(
        "{PBKDF2_PREFIX}${PBKDF2_ITERATIONS}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(digest)
    )
}

/// Extract the cost factor from a bcrypt hash string.
fn bcrypt_cost(hash: &str) -> Option<u32> {
    hash.split('$').nth(2).and_then(|c| c.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SHA-256 of "hello", as an old record would store it.
    const LEGACY_HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_hash_produces_argon2_by_default() {
        let hasher = PasswordHasher::default();
        let hash = hasher.hash("correct_horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_hash_and_verify_round_trip() {
        for method in [HashMethod::Argon2, HashMethod::Bcrypt, HashMethod::Pbkdf2] {
            let hasher = PasswordHasher::new(method);
            let hash = hasher.hash("Str0ng!Pass").unwrap();
            assert!(hasher.verify("Str0ng!Pass", &hash).unwrap(), "{method:?}");
            assert!(!hasher.verify("wrong_password", &hash).unwrap(), "{method:?}");
        }
    }

    #[test]
    fn test_hash_salted_per_call() {
        for method in [HashMethod::Argon2, HashMethod::Bcrypt, HashMethod::Pbkdf2] {
            let hasher = PasswordHasher::new(method);
            let hash1 = hasher.hash("same_password").unwrap();
            let hash2 = hasher.hash("same_password").unwrap();
            assert_ne!(hash1, hash2, "{method:?}");
        }
    }

    #[test]
    fn test_hash_rejects_too_short() {
        let hasher = PasswordHasher::default();
        assert!(matches!(hasher.hash("abc"), Err(PasswordError::TooShort)));
        assert!(matches!(hasher.hash(""), Err(PasswordError::TooShort)));
    }

    #[test]
    fn test_hash_rejects_too_long() {
        let hasher = PasswordHasher::default();
        let long = "a".repeat(129);
        assert!(matches!(hasher.hash(&long), Err(PasswordError::TooLong)));
    }

    #[test]
    fn test_verify_legacy_sha256() {
        let hasher = PasswordHasher::default();
        assert!(hasher.verify("hello", LEGACY_HELLO).unwrap());
        assert!(!hasher.verify("goodbye", LEGACY_HELLO).unwrap());
    }

    #[test]
    fn test_verify_unknown_format_is_error() {
        let hasher = PasswordHasher::default();
        let result = hasher.verify("anything", "not_a_valid_hash");
        assert!(matches!(result, Err(PasswordError::InvalidHash)));
    }

    #[test]
    fn test_needs_rehash_legacy() {
        let hasher = PasswordHasher::default();
        assert!(hasher.needs_rehash(LEGACY_HELLO));
    }

    #[test]
    fn test_needs_rehash_fresh_hashes() {
        for method in [HashMethod::Argon2, HashMethod::Bcrypt, HashMethod::Pbkdf2] {
            let hasher = PasswordHasher::new(method);
            let hash = hasher.hash("Str0ng!Pass").unwrap();
            assert!(!hasher.needs_rehash(&hash), "{method:?}");
        }
    }

    #[test]
    fn test_needs_rehash_weak_pbkdf2() {
        let hasher = PasswordHasher::default();
        // 10_000 iterations is below the acceptable minimum
        let mut digest = [0u8; 32];
        pbkdf2_hmac::<Sha256>(b"pass", b"0123456789abcdef", 10_000, &mut digest);
        let stored = format!(
            "pbkdf2_sha256$10000${}${}",
            STANDARD_NO_PAD.encode(b"0123456789abcdef"),
            STANDARD_NO_PAD.encode(digest)
        );

        assert!(hasher.verify("pass", &stored).unwrap());
        assert!(hasher.needs_rehash(&stored));
    }

    #[test]
    fn test_needs_rehash_weak_bcrypt() {
        let hasher = PasswordHasher::default();
        let weak = bcrypt::hash("Str0ng!Pass", 4).unwrap();
        assert!(hasher.verify("Str0ng!Pass", &weak).unwrap());
        assert!(hasher.needs_rehash(&weak));
    }

    #[test]
    fn test_needs_rehash_garbage() {
        let hasher = PasswordHasher::default();
        assert!(hasher.needs_rehash("garbage"));
        assert!(hasher.needs_rehash(""));
    }

    #[test]
    fn test_hash_format_parse_argon2() {
        let format = HashFormat::parse("$argon2id$v=19$m=65536,t=3,p=4$c2FsdA$aGFzaA").unwrap();
        assert!(matches!(format, HashFormat::Argon2(_)));
    }

    #[test]
    fn test_hash_format_parse_bcrypt() {
        let hash = bcrypt::hash("test_password", 4).unwrap();
        let format = HashFormat::parse(&hash).unwrap();
        assert!(matches!(format, HashFormat::Bcrypt(_)));
    }

    #[test]
    fn test_hash_format_parse_pbkdf2() {
        let stored = hash_pbkdf2("test_password");
        match HashFormat::parse(&stored).unwrap() {
            HashFormat::Pbkdf2 {
                iterations,
                salt,
                digest,
            } => {
                assert_eq!(iterations, PBKDF2_ITERATIONS);
                assert_eq!(salt.len(), PBKDF2_SALT_LEN);
                assert_eq!(digest.len(), PBKDF2_DIGEST_LEN);
            }
            other => panic!("unexpected format: {other:?}"),
        }
    }

    #[test]
    fn test_hash_format_parse_legacy() {
        let format = HashFormat::parse(LEGACY_HELLO).unwrap();
        assert!(matches!(format, HashFormat::LegacySha256(_)));
    }

    #[test]
    fn test_hash_format_parse_rejects_junk() {
        assert!(HashFormat::parse("").is_err());
        assert!(HashFormat::parse("plaintext").is_err());
        assert!(HashFormat::parse("pbkdf2_sha256$notanumber$c2FsdA$aGFzaA").is_err());
        assert!(HashFormat::parse("pbkdf2_sha256$1000$$").is_err());
        // 63 hex chars: not the legacy format
        assert!(HashFormat::parse(&"a".repeat(63)).is_err());
        // 64 chars but not hex
        assert!(HashFormat::parse(&"z".repeat(64)).is_err());
    }

    #[test]
    fn test_method_from_config() {
        assert_eq!(HashMethod::from_config("argon2"), HashMethod::Argon2);
        assert_eq!(HashMethod::from_config("BCRYPT"), HashMethod::Bcrypt);
        assert_eq!(HashMethod::from_config("pbkdf2"), HashMethod::Pbkdf2);
        assert_eq!(HashMethod::from_config("auto"), HashMethod::Auto);
        assert_eq!(HashMethod::from_config("unknown"), HashMethod::Auto);
    }

    #[test]
    fn test_preference_order() {
        // Strongest first; Auto must resolve to the head of the list
        assert_eq!(PREFERRED_METHODS[0], HashMethod::Argon2);
        let hash = PasswordHasher::new(HashMethod::Auto).hash("test_password").unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_never_produces_legacy_format() {
        for method in [
            HashMethod::Auto,
            HashMethod::Argon2,
            HashMethod::Bcrypt,
            HashMethod::Pbkdf2,
        ] {
            let hash = PasswordHasher::new(method).hash("test_password").unwrap();
            assert!(!matches!(
                HashFormat::parse(&hash).unwrap(),
                HashFormat::LegacySha256(_)
            ));
        }
    }

    #[test]
    fn test_bcrypt_cost_parsing() {
        assert_eq!(bcrypt_cost("$2b$12$abcdefghijk"), Some(12));
        assert_eq!(bcrypt_cost("$2b$04$abcdefghijk"), Some(4));
        assert_eq!(bcrypt_cost("$2b$xx$abcdefghijk"), None);
    }

    #[test]
    fn test_unicode_password() {
        let hasher = PasswordHasher::default();
        let hash = hasher.hash("contraseña123").unwrap();
        assert!(hasher.verify("contraseña123", &hash).unwrap());
    }
}

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;

use crate::error::{Error, Result};

const ARGON2_MEMORY: u32 = 64 * 1024; // 64KB
const ARGON2_ITERATIONS: u32 = 1;
const ARGON2_PARALLELISM: u32 = 4;
const ARGON2_OUTPUT_LEN: usize = 32;

const TOKEN_PREFIX: &str = "atelier";
const LOOKUP_BYTES: usize = 4;
const LOOKUP_LENGTH: usize = LOOKUP_BYTES * 2;
const SECRET_BYTES: usize = 12;
const SECRET_LENGTH: usize = SECRET_BYTES * 2;

/// Issues and checks API tokens of the form `atelier_<lookup>_<secret>`.
///
/// Only the argon2id hash of the full token is persisted; the lookup part
/// is stored in clear so the matching row can be found without scanning.
pub struct TokenGenerator {
    argon2: Argon2<'static>,
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGenerator {
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(
            ARGON2_MEMORY,
            ARGON2_ITERATIONS,
            ARGON2_PARALLELISM,
            Some(ARGON2_OUTPUT_LEN),
        )
        .expect("invalid argon2 params");

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Returns (raw_token, lookup, hash). The raw token is shown to the
    /// caller exactly once and never stored.
    pub fn generate(&self) -> Result<(String, String, String)> {
        let lookup = random_hex(LOOKUP_BYTES);
        let secret = random_hex(SECRET_BYTES);
        let raw_token = format!("{TOKEN_PREFIX}_{lookup}_{secret}");
        let hash = self.hash(&raw_token)?;
        Ok((raw_token, lookup, hash))
    }

    pub fn hash(&self, token: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(token.as_bytes(), &salt)
            .map_err(|e| Error::Config(format!("failed to hash token: {e}")))?;
        Ok(hash.to_string())
    }

    pub fn verify(&self, token: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| Error::Config(format!("invalid hash format: {e}")))?;

        match self.argon2.verify_password(token.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Config(format!("failed to verify token: {e}"))),
        }
    }
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill(buf.as_mut_slice());
    hex::encode(buf)
}

/// Splits a presented token into its (lookup, secret) parts, rejecting
/// anything that does not match the issued shape.
pub fn parse_token(token: &str) -> Result<(String, String)> {
    let mut parts = token.split('_');

    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(TOKEN_PREFIX), Some(lookup), Some(secret), None)
            if lookup.len() == LOOKUP_LENGTH && secret.len() == SECRET_LENGTH =>
        {
            Ok((lookup.to_string(), secret.to_string()))
        }
        _ => Err(Error::InvalidTokenFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_shape() {
        let generator = TokenGenerator::new();
        let (token, lookup, _hash) = generator.generate().unwrap();

        let (parsed_lookup, secret) = parse_token(&token).unwrap();
        assert_eq!(parsed_lookup, lookup);
        assert_eq!(lookup.len(), 8);
        assert_eq!(secret.len(), 24);
        assert!(token.starts_with("atelier_"));
    }

    #[test]
    fn test_verify_round_trip() {
        let generator = TokenGenerator::new();
        let (token, _, hash) = generator.generate().unwrap();

        assert!(generator.verify(&token, &hash).unwrap());
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_verify_rejects_tampered_secret() {
        let generator = TokenGenerator::new();
        let (token, _, hash) = generator.generate().unwrap();

        let wrong_token = format!("{}abcde", &token[..token.len() - 5]);
        assert!(!generator.verify(&wrong_token, &hash).unwrap());
    }

    #[test]
    fn test_parse_token_rejects_bad_shapes() {
        assert!(parse_token("atelier_12345678_123456789012345678901234").is_ok());
        assert!(parse_token("other_12345678_123456789012345678901234").is_err());
        assert!(parse_token("atelier_12345678").is_err());
        assert!(parse_token("atelier_1234_123456789012345678901234").is_err());
        assert!(parse_token("atelier_12345678_123456789012345678901234_extra").is_err());
    }
}

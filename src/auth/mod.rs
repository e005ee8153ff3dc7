//! Credential primitives: opaque bearer tokens and password hashes.
//!
//! Tokens are 16 random bytes encoded as URL-safe base64. Only the SHA-256
//! digest of a token is persisted; the plaintext is handed to the client once.

use argon2::{
    password_hash::{rand_core::OsRng as SaltRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::database::models::{Scope, Token};
use crate::validator::Validator;

pub const TOKEN_PLAINTEXT_LEN: usize = 22;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Stored password hash is malformed")]
    MalformedHash,
}

pub fn generate_token(user_id: i64, ttl: Duration, scope: Scope) -> Token {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);

    let plaintext = URL_SAFE_NO_PAD.encode(bytes);
    let hash = hash_token(&plaintext);

    Token {
        plaintext,
        hash,
        user_id,
        expiry: Utc::now() + ttl,
        scope,
    }
}

pub fn hash_token(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

pub fn validate_token_plaintext(v: &mut Validator, token: &str) {
    v.check(!token.is_empty(), "token", "must be provided");
    v.check(
        token.len() == TOKEN_PLAINTEXT_LEN
            && token.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'),
        "token",
        "must be 22 bytes long",
    );
}

pub fn hash_password(plaintext: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut SaltRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

pub fn verify_password(plaintext: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|_| AuthError::MalformedHash)?;
    Ok(Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok())
}

//! Credential primitives: password and passcode hashing, bearer tokens.
//!
//! Argon2 work is CPU-bound, so the async wrappers move it onto the blocking
//! pool instead of stalling the runtime.

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fmt::Write;
use tokio::task;

use crate::config::SecurityConfig;

/// Number of digits in an emailed login code.
pub const OTP_DIGITS: usize = 6;

const TOKEN_BYTES: usize = 32;

/// Hash a secret using Argon2id with the configured cost parameters.
pub fn hash_secret(secret: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash secret: {e}"))?;

    Ok(hash.to_string())
}

/// Check a secret against a stored PHC string. Params are read from the hash itself.
pub fn verify_secret(secret: &str, stored_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn hash_secret_blocking(secret: &str, config: &SecurityConfig) -> Result<String> {
    let secret = secret.to_string();
    let config = config.clone();
    task::spawn_blocking(move || hash_secret(&secret, &config))
        .await
        .context("Hashing task panicked")?
}

pub async fn verify_secret_blocking(secret: &str, stored_hash: &str) -> Result<bool> {
    let secret = secret.to_string();
    let stored_hash = stored_hash.to_string();
    task::spawn_blocking(move || verify_secret(&secret, &stored_hash))
        .await
        .context("Verification task panicked")?
}

/// Generate a bearer token: 256 random bits, hex encoded.
#[must_use]
pub fn generate_session_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; TOKEN_BYTES] = rng.random();
    to_hex(&bytes)
}

/// Digest under which a bearer token is stored and looked up.
#[must_use]
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    to_hex(&hasher.finalize())
}

/// Uniformly random, zero-padded six digit code.
#[must_use]
pub fn generate_otp() -> String {
    let code: u32 = rand::rng().random_range(0..1_000_000);
    format!("{code:0width$}", width = OTP_DIGITS)
}

#[must_use]
pub fn is_otp_format(code: &str) -> bool {
    code.len() == OTP_DIGITS && code.bytes().all(|b| b.is_ascii_digit())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

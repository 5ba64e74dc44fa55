use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SecurityError {
    #[error("Key derivation failed")]
    KeyDerivationError,
    #[error("Malformed password hash")]
    MalformedHash,
}

pub const SALT_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const DEFAULT_ROUNDS: u32 = 100_000;

const SCHEME: &str = "pbkdf2";

pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

pub fn derive_key(
    password: &str,
    salt: &[u8],
    rounds: u32,
) -> Result<[u8; KEY_LEN], SecurityError> {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, rounds, &mut key)
        .map_err(|_| SecurityError::KeyDerivationError)?;
    Ok(key)
}

/// Hash a password into the self-describing `pbkdf2$rounds$salt$key` form.
pub fn hash_password(password: &str, rounds: u32) -> Result<String, SecurityError> {
    let salt = generate_salt();
    let key = derive_key(password, &salt, rounds)?;
    Ok(format!(
        "{}${}${}${}",
        SCHEME,
        rounds,
        hex::encode(salt),
        hex::encode(key)
    ))
}

pub fn verify_password(password: &str, stored: &str) -> Result<bool, SecurityError> {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(rounds), Some(salt), Some(key), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(SecurityError::MalformedHash);
    };

    let rounds: u32 = rounds.parse().map_err(|_| SecurityError::MalformedHash)?;
    let salt = hex::decode(salt).map_err(|_| SecurityError::MalformedHash)?;
    let expected = hex::decode(key).map_err(|_| SecurityError::MalformedHash)?;

    let derived = derive_key(password, &salt, rounds)?;
    Ok(derived.as_slice() == expected.as_slice())
}

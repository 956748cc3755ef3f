use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use bcrypt::{hash_with_salt, verify, BcryptError, Version};
use rand::RngCore;

/// Stored form of a password: the bcrypt string and the salt it was built from.
#[derive(Debug)]
pub struct EncryptedPassword {
    pub encrypted_password: String,
    pub salt: String,
}

pub fn encrypt(password: &str, cost: u32) -> Result<EncryptedPassword, BcryptError> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let parts = hash_with_salt(password, cost, salt)?;
    Ok(EncryptedPassword {
        encrypted_password: parts.format_for_version(Version::TwoB),
        salt: STANDARD.encode(salt),
    })
}

/// Checks `submitted` against a stored bcrypt string. Malformed hashes never match.
pub fn has_password(encrypted_password: &str, submitted: &str) -> bool {
    verify(submitted, encrypted_password).unwrap_or(false)
}

pub fn generate_remember_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

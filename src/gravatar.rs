use md5::{Digest, Md5};

/// Where users change the image behind their gravatar.
pub const EDIT_URL: &str = "http://gravatar.com/emails";

pub fn gravatar_url(email: &str, size: u32) -> String {
    let hash = Md5::digest(email.trim().to_lowercase().as_bytes());
    format!("http://gravatar.com/avatar/{:x}?s={}", hash, size)
}

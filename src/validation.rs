use once_cell::sync::Lazy;
use regex::Regex;

pub const NAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 40;
pub const MICROPOST_MAX: usize = 140;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[\w+\-.]+@[a-z\d\-.]+\.[a-z]+$").expect("email regex"));

pub type ValidationErrors = Vec<String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordRule {
    /// Password and confirmation must be present.
    Required,
    /// Only checked when either field carries a value.
    IfPresent,
}

pub fn valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

pub fn validate_user(
    name: &str,
    email: &str,
    password: &str,
    password_confirmation: &str,
    rule: PasswordRule,
) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if name.trim().is_empty() {
        errors.push("Name can't be blank".to_string());
    } else if name.chars().count() > NAME_MAX {
        errors.push(format!("Name is too long (maximum is {} characters)", NAME_MAX));
    }

    if email.trim().is_empty() {
        errors.push("Email can't be blank".to_string());
    } else if !valid_email(email) {
        errors.push("Email is invalid".to_string());
    }

    let check_password = match rule {
        PasswordRule::Required => true,
        PasswordRule::IfPresent => !password.is_empty() || !password_confirmation.is_empty(),
    };
    if check_password {
        let len = password.chars().count();
        if password.is_empty() {
            errors.push("Password can't be blank".to_string());
        } else if len < PASSWORD_MIN {
            errors.push(format!("Password is too short (minimum is {} characters)", PASSWORD_MIN));
        } else if len > PASSWORD_MAX {
            errors.push(format!("Password is too long (maximum is {} characters)", PASSWORD_MAX));
        }
        if password != password_confirmation {
            errors.push("Password doesn't match confirmation".to_string());
        }
    }

    finish(errors)
}

pub fn validate_micropost(content: &str) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    if content.trim().is_empty() {
        errors.push("Content can't be blank".to_string());
    } else if content.chars().count() > MICROPOST_MAX {
        errors.push(format!("Content is too long (maximum is {} characters)", MICROPOST_MAX));
    }
    finish(errors)
}

pub fn validate_relationship(
    follower_id: Option<i32>,
    followed_id: Option<i32>,
) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    if follower_id.is_none() {
        errors.push("Follower can't be blank".to_string());
    }
    if followed_id.is_none() {
        errors.push("Followed can't be blank".to_string());
    }
    finish(errors)
}

fn finish(errors: ValidationErrors) -> Result<(), ValidationErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

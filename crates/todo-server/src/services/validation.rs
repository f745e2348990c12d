//! Input checks shared by the auth and account services

use once_cell::sync::Lazy;
use regex::Regex;
use todo_core::{Result, TodoError};

/// Minimum password length after trimming
pub const PASSWORD_MIN: usize = 6;

/// Fails with `Validation("{name} is required")` when `value` is empty or blank.
pub fn require(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TodoError::Validation(format!("{} is required", name)));
    }
    Ok(())
}

/// Return true if `email` is a single bare address.
///
/// Surrounding whitespace is tolerated but the address itself may not end in
/// a dot or carry a display name.
pub fn is_valid_email(email: &str) -> bool {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*$")
            .expect("valid regex")
    });
    let trimmed = email.trim();
    !trimmed.ends_with('.') && RE.is_match(trimmed)
}

pub fn is_valid_password(password: &str) -> bool {
    password.trim().chars().count() >= PASSWORD_MIN
}

pub fn check_email(email: &str) -> Result<()> {
    if !is_valid_email(email) {
        return Err(TodoError::Validation("Invalid email".to_string()));
    }
    Ok(())
}

pub fn check_password(password: &str) -> Result<()> {
    if !is_valid_password(password) {
        return Err(TodoError::Validation(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN
        )));
    }
    Ok(())
}

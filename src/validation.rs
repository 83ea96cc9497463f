use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_TITLE_LEN: usize = 255;

/// Letters, digits and `@.+-_`, at most 150 characters.
pub fn is_valid_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if len == 0 {
        return Err("This field may not be blank.".to_string());
    }
    if len > MAX_USERNAME_LEN {
        return Err(format!(
            "Ensure this field has no more than {MAX_USERNAME_LEN} characters."
        ));
    }
    match username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        true => Ok(()),
        false => Err("Enter a valid username. This value may contain only \
                      letters, numbers, and @/./+/-/_ characters."
            .to_string()),
    }
}

pub fn is_valid_password(password: &str) -> Result<(), String> {
    match password.is_empty() {
        true => Err("This field may not be blank.".to_string()),
        false => Ok(()),
    }
}

/// The empty string is accepted: accounts are not required to have an
/// email address.
pub fn is_valid_email(string: &str) -> Result<(), String> {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
        r#"^(?:[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*|"(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21\x23-\x5b\x5d-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])*")@(?:(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?|\[(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?|[a-z0-9-]*[a-z0-9]:(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21-\x5a\x53-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])+)\])$"#
    ).unwrap()
    });
    if string.is_empty() {
        return Ok(());
    }
    match RE.is_match(&string.to_lowercase()) {
        true => Ok(()),
        false => Err("Enter a valid email address.".to_string()),
    }
}

pub fn is_valid_title(title: &str) -> Result<(), String> {
    let len = title.chars().count();
    if title.trim().is_empty() {
        Err("This field may not be blank.".to_string())
    } else if len > MAX_TITLE_LEN {
        Err(format!(
            "Ensure this field has no more than {MAX_TITLE_LEN} characters."
        ))
    } else {
        Ok(())
    }
}

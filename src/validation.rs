//! Input rules for request payloads. Each check returns the message shown to
//! the client as an `AppError::Validation`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref SPECIAL_RE: Regex =
        Regex::new(r#"[!@#$%^&*()_+\-=\[\]{};':"\\|,.<>/?~]"#).unwrap();
    static ref NAME_RE: Regex = Regex::new(r"^[a-zA-Z_\-\s]+$").unwrap();
    static ref PROSE_RE: Regex = Regex::new(r"^[a-zA-Z0-9\s.!?',\-]+$").unwrap();
    static ref MESSAGE_RE: Regex = Regex::new(r"^[a-zA-Z0-9,.\-\s]+$").unwrap();
    static ref URL_RE: Regex = Regex::new(r"^https?://[^\s/$.?#][^\s]*$").unwrap();
}

pub const MAX_ID: i64 = 100_000;

fn invalid(msg: impl Into<String>) -> AppError {
    AppError::Validation(msg.into())
}

/// Trims and lowercases, then checks the address shape.
pub fn email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(invalid("Your email address is not valid. Try again."));
    }
    Ok(email)
}

pub fn password(raw: &str) -> Result<String, AppError> {
    let pw = raw.trim();
    let len = pw.chars().count();
    if len < 8 {
        return Err(invalid("Password must have at least 8 characters"));
    }
    if len > 20 {
        return Err(invalid("Password must have a maximum of 20 characters"));
    }
    if !pw.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(invalid("Password must have one lowercase character"));
    }
    if !pw.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(invalid("Password must have one uppercase character"));
    }
    if !pw.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid("Password must contain one number"));
    }
    if !SPECIAL_RE.is_match(pw) {
        return Err(invalid("Password must contain a special character"));
    }
    Ok(pw.to_string())
}

pub fn password_pair(password: &str, confirm: &str) -> Result<String, AppError> {
    let pw = self::password(password)?;
    let confirm = self::password(confirm)?;
    if pw != confirm {
        return Err(invalid("Passwords do not match"));
    }
    Ok(pw)
}

fn bounded(raw: &str, min: usize, max: usize, short: &str, long: &str) -> Result<String, AppError> {
    let v = raw.trim();
    let len = v.chars().count();
    if len < min {
        return Err(invalid(short));
    }
    if len > max {
        return Err(invalid(long));
    }
    Ok(v.to_string())
}

pub fn name(raw: &str) -> Result<String, AppError> {
    let v = bounded(
        raw,
        4,
        50,
        "Your name is too short. Please enter at least 4 characters.",
        "Your name is too long.",
    )?;
    if !NAME_RE.is_match(&v) {
        return Err(invalid("You can only add letters to your name"));
    }
    Ok(v)
}

pub fn job_title(raw: &str) -> Result<String, AppError> {
    let v = bounded(
        raw,
        4,
        50,
        "Please enter your current job title. It helps showcase your experience.",
        "Your job title is too long.",
    )?;
    if !NAME_RE.is_match(&v) {
        return Err(invalid("Your job title can only contain letters"));
    }
    Ok(v)
}

fn prose(raw: &str, min: usize, max: usize) -> Result<String, AppError> {
    let v = bounded(
        raw,
        min,
        max,
        &format!("Must be at least {min} characters long."),
        &format!("Cannot exceed {max} characters."),
    )?;
    if !PROSE_RE.is_match(&v) {
        return Err(invalid(
            "Cannot contain special characters. Keep it simple and clean.",
        ));
    }
    Ok(v)
}

pub fn description(raw: &str) -> Result<String, AppError> {
    prose(raw, 125, 250)
}

pub fn bio(raw: &str) -> Result<String, AppError> {
    prose(raw, 175, 350)
}

pub fn url(raw: &str) -> Result<String, AppError> {
    let v = raw.trim();
    if v.is_empty() {
        return Err(invalid("Please enter a URL."));
    }
    if !URL_RE.is_match(v) {
        return Err(invalid("Invalid URL"));
    }
    Ok(v.to_string())
}

pub fn technologies(items: &[String]) -> Result<Vec<String>, AppError> {
    let items: Vec<String> = items
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if items.len() < 2 {
        return Err(invalid("Select a minimum of 2 technologies"));
    }
    if items.len() > 5 {
        return Err(invalid("Select a maximum of 5 technologies"));
    }
    Ok(items)
}

pub fn contact_message(raw: &str) -> Result<String, AppError> {
    let v = bounded(
        raw,
        50,
        500,
        "You should write at least 50 characters. Tell us what's on your mind.",
        "Your message is too long. Try to be more concise with your message.",
    )?;
    if !MESSAGE_RE.is_match(&v) {
        return Err(invalid("Your message can only contain letters and numbers."));
    }
    Ok(v)
}

pub fn id(raw: i64) -> Result<i64, AppError> {
    if raw <= 0 {
        return Err(invalid("Id should not have a negative value"));
    }
    if raw > MAX_ID {
        return Err(invalid("Your value is too large for an id"));
    }
    Ok(raw)
}

/// Path segment holding an id.
pub fn id_param(raw: &str) -> Result<i64, AppError> {
    let parsed = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| invalid("Id must be a number"))?;
    id(parsed)
}

/// Empty input means "leave unchanged".
pub fn optional<F>(raw: &str, rule: F) -> Result<Option<String>, AppError>
where
    F: Fn(&str) -> Result<String, AppError>,
{
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        rule(raw).map(Some)
    }
}

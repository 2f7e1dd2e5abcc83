//! Input validation for API requests.
//!
//! Validators return `Result<(), String>`; handlers convert failures into
//! a 400 `ApiError` with the message surfaced to the client.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Reasonable email shape; real verification is out of scope.
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();

    /// WhatsApp numbers: optional +, then 8-15 digits.
    static ref WHATSAPP_REGEX: Regex = Regex::new(r"^\+?\d{8,15}$").unwrap();

    /// Settings keys: lowercase snake_case, as the frontend expects.
    static ref SETTING_KEY_REGEX: Regex = Regex::new(r"^[a-z][a-z0-9_]{0,63}$").unwrap();
}

/// Validate a display name (user or campus)
pub fn validate_name(value: &str, field: &str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{} is required", field));
    }
    if trimmed.len() > 100 {
        return Err(format!("{} is too long (max 100 characters)", field));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    // Argon2 input limit safeguard
    if password.len() > 72 {
        return Err("Password is too long (max 72 characters)".to_string());
    }
    Ok(())
}

pub fn validate_whatsapp(whatsapp: &str) -> Result<(), String> {
    if !WHATSAPP_REGEX.is_match(whatsapp) {
        return Err("Invalid WhatsApp number".to_string());
    }
    Ok(())
}

/// Validate a product name
pub fn validate_product_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Product name is required".to_string());
    }
    if trimmed.len() > 150 {
        return Err("Product name is too long (max 150 characters)".to_string());
    }
    Ok(())
}

/// Validate a price in whole rupiah
pub fn validate_price(harga: i64) -> Result<(), String> {
    if harga <= 0 {
        return Err("Price must be greater than zero".to_string());
    }
    if harga > 1_000_000_000 {
        return Err("Price is unreasonably large".to_string());
    }
    Ok(())
}

pub fn validate_category_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Category name is required".to_string());
    }
    if trimmed.len() < 2 {
        return Err("Category name is too short (min 2 characters)".to_string());
    }
    if trimmed.len() > 100 {
        return Err("Category name is too long (max 100 characters)".to_string());
    }
    Ok(())
}

/// Validate a positive numeric id from a path segment
pub fn validate_id(id: i64, field: &str) -> Result<(), String> {
    if id <= 0 {
        return Err(format!("Invalid {}", field));
    }
    Ok(())
}

pub fn validate_setting_key(key: &str) -> Result<(), String> {
    if !SETTING_KEY_REGEX.is_match(key) {
        return Err(format!("Invalid setting key: {}", key));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("budi@kampus.ac.id").is_ok());
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("two@@signs.com").is_err());
        assert!(validate_email("spaces in@mail.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("rahasia123").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(73)).is_err());
    }

    #[test]
    fn test_validate_whatsapp() {
        assert!(validate_whatsapp("081234567890").is_ok());
        assert!(validate_whatsapp("+6281234567890").is_ok());
        assert!(validate_whatsapp("123").is_err());
        assert!(validate_whatsapp("08-1234-5678").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Budi Santoso", "Name").is_ok());
        let err = validate_name("  ", "Name").unwrap_err();
        assert_eq!(err, "Name is required");
        assert!(validate_name(&"x".repeat(101), "Name").is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(150_000).is_ok());
        assert!(validate_price(0).is_err());
        assert!(validate_price(-5).is_err());
        assert!(validate_price(2_000_000_000).is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id(1, "product id").is_ok());
        assert_eq!(validate_id(0, "product id").unwrap_err(), "Invalid product id");
    }

    #[test]
    fn test_validate_setting_key() {
        assert!(validate_setting_key("site_name").is_ok());
        assert!(validate_setting_key("github_url").is_ok());
        assert!(validate_setting_key("Site Name").is_err());
        assert!(validate_setting_key("").is_err());
    }
}

//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{Address, NewProduct, UpdateProduct};

/// Validate display name
pub fn validate_name(name: &str) -> Result<(), String> {
    let name = name.trim();

    if name.is_empty() {
        return Err("Name is required".to_string());
    }

    if name.chars().count() > 64 {
        return Err("Name must be at most 64 characters long".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < 6 {
        return Err("Password must be at least 6 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate a 10 digit phone number
pub fn validate_phone(phone: &str) -> Result<(), String> {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex =
        PHONE_REGEX.get_or_init(|| Regex::new(r"^\d{10}$").expect("Failed to compile phone regex"));

    if !regex.is_match(phone) {
        return Err("Phone must be 10 digits".to_string());
    }

    Ok(())
}

/// Validate a 6 digit pincode
pub fn validate_pincode(pincode: &str) -> Result<(), String> {
    static PINCODE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PINCODE_REGEX
        .get_or_init(|| Regex::new(r"^\d{6}$").expect("Failed to compile pincode regex"));

    if !regex.is_match(pincode) {
        return Err("Pincode must be 6 digits".to_string());
    }

    Ok(())
}

/// Validate a shipping address
///
/// Presence of every field is checked first, then pincode, then phone.
pub fn validate_address(address: &Address) -> Result<(), String> {
    let fields = [
        &address.name,
        &address.phone,
        &address.street,
        &address.city,
        &address.pincode,
    ];

    if fields.iter().any(|field| field.trim().is_empty()) {
        return Err("All address fields are required".to_string());
    }

    validate_pincode(&address.pincode)?;
    validate_phone(&address.phone)?;

    Ok(())
}

fn validate_price(price: f64) -> Result<(), String> {
    if !price.is_finite() || price <= 0.0 {
        return Err("Price must be greater than zero".to_string());
    }
    Ok(())
}

fn validate_image(image: &str) -> Result<(), String> {
    if image.trim().is_empty() {
        return Err("Image is required".to_string());
    }
    Ok(())
}

/// Validate a product creation payload
pub fn validate_new_product(product: &NewProduct) -> Result<(), String> {
    if product.name.trim().is_empty() {
        return Err("Product name is required".to_string());
    }
    validate_price(product.price)?;
    validate_image(&product.image)?;
    Ok(())
}

/// Validate a product update payload
pub fn validate_product_update(update: &UpdateProduct) -> Result<(), String> {
    if update.is_empty() {
        return Err("Nothing to update".to_string());
    }
    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err("Product name is required".to_string());
        }
    }
    if let Some(price) = update.price {
        validate_price(price)?;
    }
    if let Some(image) = &update.image {
        validate_image(image)?;
    }
    Ok(())
}

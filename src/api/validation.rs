//! Input validation for API requests.
//!
//! Shape validation (required fields, unknown-field rejection) happens at the
//! deserialization boundary; these functions cover the range and format
//! checks that serde cannot express.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::Spheres;

lazy_static! {
    /// Regex for validating usernames (lowercase alphanumeric with . _ -,
    /// 3-32 chars, starting alphanumeric)
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-z0-9][a-z0-9._-]{2,31}$").unwrap();
}

/// Validate a username (expects an already-normalized value)
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Username must be 3-32 lowercase alphanumeric characters, dots, dashes or underscores"
                .to_string(),
        );
    }

    Ok(())
}

/// Validate a location name
pub fn validate_location_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required".to_string());
    }

    if trimmed.len() > 200 {
        return Err("Name is too long (max 200 characters)".to_string());
    }

    Ok(())
}

/// Validate map coordinates
pub fn validate_coordinates(lat: f64, lng: f64) -> Result<(), String> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err("lat must be between -90 and 90".to_string());
    }

    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err("lng must be between -180 and 180".to_string());
    }

    Ok(())
}

/// Validate free-text content (event bodies, note bodies)
pub fn validate_content(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("Content is required".to_string());
    }

    if content.len() > 10_000 {
        return Err("Content is too long (max 10000 characters)".to_string());
    }

    Ok(())
}

/// Validate the nine sphere tracks (each rated 0..=5)
pub fn validate_spheres(spheres: &Spheres) -> Result<(), String> {
    if spheres.ratings().iter().any(|&r| r > 5) {
        return Err("Sphere ratings must be between 0 and 5".to_string());
    }

    Ok(())
}

//! Common validation utilities.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

use crate::slug::is_valid_slug;

lazy_static! {
    static ref LOCALE_REGEX: Regex = Regex::new(r"^[a-z]{2,3}(_[A-Z]{2})?$").unwrap();
    static ref PLUGIN_SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap();
}

/// Validates a WordPress locale tag such as `en_US`, `zh_TW` or `fr`.
pub fn validate_locale(locale: &str) -> Result<(), ValidationError> {
    if LOCALE_REGEX.is_match(locale) {
        Ok(())
    } else {
        let mut err = ValidationError::new("locale_format");
        err.message = Some("Locale must look like en_US or fr".into());
        Err(err)
    }
}

/// Validates a theme or plugin identifier as published in the WordPress directory.
pub fn validate_package_slug(slug: &str) -> Result<(), ValidationError> {
    if PLUGIN_SLUG_REGEX.is_match(slug) {
        Ok(())
    } else {
        let mut err = ValidationError::new("package_slug_format");
        err.message = Some(
            "Identifier may only contain lowercase letters, digits, hyphens and underscores"
                .into(),
        );
        Err(err)
    }
}

/// Validates a tenant slug taken from a request path.
pub fn validate_tenant_slug(slug: &str) -> Result<(), ValidationError> {
    if is_valid_slug(slug) {
        Ok(())
    } else {
        let mut err = ValidationError::new("tenant_slug_format");
        err.message = Some("Tenant must be a lowercase slug such as my-shop".into());
        Err(err)
    }
}

/// Validates a container image reference (`name[:tag]`, optionally with a registry).
pub fn validate_image_reference(image: &str) -> Result<(), ValidationError> {
    let ok = !image.is_empty()
        && image.len() <= 255
        && image
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '/' | ':' | '@'));
    if ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("image_reference");
        err.message = Some("Invalid container image reference".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_locale() {
        assert!(validate_locale("en_US").is_ok());
        assert!(validate_locale("zh_TW").is_ok());
        assert!(validate_locale("fr").is_ok());
        assert!(validate_locale("EN_us").is_err());
        assert!(validate_locale("en-US").is_err());
        assert!(validate_locale("en_US; rm -rf /").is_err());
        assert!(validate_locale("").is_err());
    }

    #[test]
    fn test_validate_locale_error_message() {
        let err = validate_locale("english").unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Locale must look like en_US or fr"
        );
    }

    #[test]
    fn test_validate_package_slug() {
        assert!(validate_package_slug("woostify").is_ok());
        assert!(validate_package_slug("woocommerce-gateway-stripe").is_ok());
        assert!(validate_package_slug("twentytwentyfour").is_ok());
        assert!(validate_package_slug("Woostify").is_err());
        assert!(validate_package_slug("theme name").is_err());
        assert!(validate_package_slug("-leading").is_err());
    }

    #[test]
    fn test_validate_tenant_slug() {
        assert!(validate_tenant_slug("my-shop").is_ok());
        assert!(validate_tenant_slug("../etc").is_err());
        assert!(validate_tenant_slug("My Shop").is_err());
    }

    #[test]
    fn test_validate_image_reference() {
        assert!(validate_image_reference("mysql:5.7").is_ok());
        assert!(validate_image_reference("wordpress:6.7-php8.2-apache").is_ok());
        assert!(validate_image_reference("ghcr.io/acme/wp@sha256:abc").is_ok());
        assert!(validate_image_reference("").is_err());
        assert!(validate_image_reference("mysql; reboot").is_err());
    }
}

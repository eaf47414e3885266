//! Tenant slug derivation.
//!
//! A slug is the URL path segment a tenant site lives under in the shared
//! multisite network, so it must stay within `[a-z0-9-]`.

use lazy_static::lazy_static;
use regex::Regex;

/// Slug used when a site name normalizes to nothing.
pub const FALLBACK_SLUG: &str = "site";

lazy_static! {
    static ref NON_ALNUM_RUN: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
    pub static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap();
}

/// Derives a URL-safe slug from a display name.
///
/// Lowercases the input, collapses every run of characters outside
/// `[a-z0-9]` into a single `-`, trims separators from both ends, and falls
/// back to [`FALLBACK_SLUG`] when nothing is left.
pub fn sanitize_slug(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let collapsed = NON_ALNUM_RUN.replace_all(&lowered, "-");
    let trimmed = collapsed.trim_matches('-');

    if trimmed.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Returns true if the value is already a well-formed slug.
pub fn is_valid_slug(value: &str) -> bool {
    SLUG_REGEX.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::company::en::CompanyName;
    use fake::faker::lorem::en::Sentence;
    use fake::Fake;

    #[test]
    fn test_sanitize_slug_collapses_runs() {
        assert_eq!(sanitize_slug("My  Shop!! 2024"), "my-shop-2024");
    }

    #[test]
    fn test_sanitize_slug_all_symbols_falls_back() {
        assert_eq!(sanitize_slug("###"), FALLBACK_SLUG);
        assert_eq!(sanitize_slug(""), FALLBACK_SLUG);
        assert_eq!(sanitize_slug("   "), FALLBACK_SLUG);
    }

    #[test]
    fn test_sanitize_slug_trims_separators() {
        assert_eq!(sanitize_slug("--Hello World--"), "hello-world");
        assert_eq!(sanitize_slug("  _shop_ "), "shop");
    }

    #[test]
    fn test_sanitize_slug_non_ascii_is_separator() {
        assert_eq!(sanitize_slug("咖啡 Coffee 店"), "coffee");
        assert_eq!(sanitize_slug("Café Olé"), "caf-ol");
        assert_eq!(sanitize_slug("商店"), FALLBACK_SLUG);
    }

    #[test]
    fn test_sanitize_slug_is_idempotent() {
        let once = sanitize_slug("Acme & Sons, Ltd.");
        assert_eq!(once, "acme-sons-ltd");
        assert_eq!(sanitize_slug(&once), once);
    }

    #[test]
    fn test_sanitize_slug_always_valid() {
        for _ in 0..200 {
            let name: String = if rand::random::<bool>() {
                CompanyName().fake()
            } else {
                Sentence(0..6).fake()
            };
            let slug = sanitize_slug(&name);
            assert!(is_valid_slug(&slug), "{name:?} produced invalid slug {slug:?}");
            assert!(!slug.contains("--"));
        }
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("shop"));
        assert!(is_valid_slug("my-shop-2024"));
        assert!(!is_valid_slug("-shop"));
        assert!(!is_valid_slug("shop-"));
        assert!(!is_valid_slug("my--shop"));
        assert!(!is_valid_slug("My-Shop"));
        assert!(!is_valid_slug(""));
    }
}

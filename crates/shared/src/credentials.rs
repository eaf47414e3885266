//! Administrator credential generation.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of generated administrator passwords.
pub const GENERATED_PASSWORD_LENGTH: usize = 24;

/// Generates a random alphanumeric password.
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_password_length() {
        assert_eq!(generate_password().len(), GENERATED_PASSWORD_LENGTH);
    }

    #[test]
    fn test_generate_password_alphanumeric() {
        assert!(generate_password().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_password_unique() {
        assert_ne!(generate_password(), generate_password());
    }
}

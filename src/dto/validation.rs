//! Validation helpers for DTOs.

use validator::ValidationError;

/// Characters game codes are drawn from.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Length of a well-formed game code.
pub const CODE_LENGTH: usize = 6;

/// Validates that a game code is exactly 6 uppercase alphanumeric characters.
///
/// # Examples
///
/// ```ignore
/// validate_game_code("AB12CD") // Ok
/// validate_game_code("ab12cd") // Err - lowercase
/// validate_game_code("AB12C")  // Err - too short
/// ```
pub fn validate_game_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != CODE_LENGTH {
        let mut err = ValidationError::new("game_code_length");
        err.message =
            Some(format!("Game code must be exactly {CODE_LENGTH} characters (got {})", code.len()).into());
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        let mut err = ValidationError::new("game_code_format");
        err.message =
            Some("Game code must contain only uppercase letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a display name is non-blank and reasonably short.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("display_name_blank");
        err.message = Some("Display name must not be blank".into());
        return Err(err);
    }

    if name.chars().count() > 32 {
        let mut err = ValidationError::new("display_name_length");
        err.message = Some("Display name must be at most 32 characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_game_code_valid() {
        assert!(validate_game_code("AB12CD").is_ok());
        assert!(validate_game_code("ZZZZZZ").is_ok());
        assert!(validate_game_code("000000").is_ok());
    }

    #[test]
    fn test_validate_game_code_invalid_length() {
        assert!(validate_game_code("AB12C").is_err()); // too short
        assert!(validate_game_code("AB12CDE").is_err()); // too long
        assert!(validate_game_code("").is_err()); // empty
    }

    #[test]
    fn test_validate_game_code_invalid_format() {
        assert!(validate_game_code("ab12cd").is_err()); // lowercase
        assert!(validate_game_code("AB 2CD").is_err()); // space
        assert!(validate_game_code("AB12C!").is_err()); // punctuation
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("Ada").is_ok());
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(33)).is_err());
    }
}

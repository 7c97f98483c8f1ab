//! Lightweight obfuscation for API keys kept in configuration files.
//!
//! This keeps keys out of plain sight; it is not encryption in any strong
//! sense. The salt and the encrypted value must be stored apart for it to
//! be worth anything.

use crate::errors::SecretError;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Prefix marking an obfuscated value.
pub const ENC_PREFIX: &str = "ENC:";

/// Default salt length used by the CLI.
pub const DEFAULT_SALT_LENGTH: usize = 64;

/// Generates a random alphanumeric string.
#[must_use]
pub fn generate_salt(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

// Bytes beyond the key length are dropped, so the salt must be at least
// as long as the secret.
fn xor(text: &[u8], key: &[u8]) -> Vec<u8> {
    text.iter().zip(key).map(|(t, k)| t ^ k).collect()
}

/// Obfuscates `text` with `salt`, returning an `ENC:`-prefixed hex string.
#[must_use]
pub fn encrypt(text: &str, salt: &str) -> String {
    format!("{ENC_PREFIX}{}", hex::encode(xor(text.as_bytes(), salt.as_bytes())))
}

/// Reverses [`encrypt`]. Values without the `ENC:` prefix are returned as-is.
///
/// # Errors
///
/// Fails if the payload is not hex or does not decode to UTF-8.
pub fn decrypt(text: &str, salt: &str) -> Result<String, SecretError> {
    let Some(payload) = text.strip_prefix(ENC_PREFIX) else {
        return Ok(text.to_string());
    };

    let bytes = hex::decode(payload)?;
    Ok(String::from_utf8(xor(&bytes, salt.as_bytes()))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_then_decrypt() {
        let salt = generate_salt(DEFAULT_SALT_LENGTH);
        let encrypted = encrypt("AIza-secret-key", &salt);

        assert!(encrypted.starts_with(ENC_PREFIX));
        assert_ne!(encrypted, "AIza-secret-key");
        assert_eq!(decrypt(&encrypted, &salt).unwrap(), "AIza-secret-key");
    }

    #[test]
    fn test_known_value() {
        // 'a' ^ 'b' = 0x03, 'b' ^ 'b' = 0x00
        assert_eq!(encrypt("ab", "bb"), "ENC:0300");
    }

    #[test]
    fn test_plain_values_pass_through() {
        assert_eq!(decrypt("plain-key", "salt").unwrap(), "plain-key");
    }

    #[test]
    fn test_short_salt_truncates() {
        let encrypted = encrypt("abcdef", "xyz");
        assert_eq!(decrypt(&encrypted, "xyz").unwrap(), "abc");
    }

    #[test]
    fn test_invalid_hex() {
        assert!(matches!(
            decrypt("ENC:zz", "salt"),
            Err(SecretError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_generate_salt() {
        let salt = generate_salt(16);
        assert_eq!(salt.len(), 16);
        assert!(salt.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}

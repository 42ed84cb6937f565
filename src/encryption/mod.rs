//! Sealed-box encryption of Actions and Dependabot secret values.
//!
//! GitHub accepts secret values only as a libsodium sealed box
//! (X25519 + XSalsa20-Poly1305) addressed to the repository or organization
//! public key, base64 encoded.

use crate::errors::{ProviderError, ProviderResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use crypto_box::aead::OsRng;
use crypto_box::PublicKey;

/// Length of an X25519 public key.
pub const KEY_LENGTH: usize = 32;

/// Encrypts `plaintext` to the base64 `public_key` and returns the base64
/// ciphertext expected by the secrets API.
pub fn encrypt_secret(public_key: &str, plaintext: &[u8]) -> ProviderResult<String> {
    let key = decode_public_key(public_key)?;
    let sealed = key
        .seal(&mut OsRng, plaintext)
        .map_err(|e| ProviderError::Encryption(format!("sealing failed: {}", e)))?;
    Ok(STANDARD.encode(sealed))
}

/// Decodes a base64 X25519 public key.
pub fn decode_public_key(public_key: &str) -> ProviderResult<PublicKey> {
    let bytes = STANDARD
        .decode(public_key.trim())
        .map_err(|e| ProviderError::Encryption(format!("public key is not valid base64: {}", e)))?;

    let bytes: [u8; KEY_LENGTH] = bytes.try_into().map_err(|v: Vec<u8>| {
        ProviderError::Encryption(format!(
            "public key must be {} bytes, got {}",
            KEY_LENGTH,
            v.len()
        ))
    })?;

    Ok(PublicKey::from(bytes))
}

/// Value sent to the secrets API: `encrypted_value` is passed through
/// untouched, otherwise `plaintext_value` is sealed to `public_key`.
pub fn secret_payload(
    public_key: &str,
    plaintext_value: Option<&str>,
    encrypted_value: Option<&str>,
) -> ProviderResult<String> {
    match (encrypted_value, plaintext_value) {
        (Some(encrypted), _) => {
            STANDARD.decode(encrypted).map_err(|e| {
                ProviderError::Encryption(format!("encrypted_value is not valid base64: {}", e))
            })?;
            Ok(encrypted.to_string())
        }
        (None, Some(plain)) => encrypt_secret(public_key, plain.as_bytes()),
        (None, None) => encrypt_secret(public_key, b""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_box::SecretKey;

    #[test]
    fn test_encrypt_secret_opens_with_private_key() {
        let secret_key = SecretKey::generate(&mut OsRng);
        let public_key = STANDARD.encode(secret_key.public_key().as_bytes());

        let ciphertext = encrypt_secret(&public_key, b"hunter2").unwrap();
        let sealed = STANDARD.decode(ciphertext).unwrap();

        // 32-byte ephemeral key + 16-byte tag
        assert_eq!(sealed.len(), b"hunter2".len() + 48);
        assert_eq!(secret_key.unseal(&sealed).unwrap(), b"hunter2");
    }

    #[test]
    fn test_invalid_base64_key() {
        let err = encrypt_secret("not base64!!", b"x").unwrap_err();
        assert!(matches!(err, ProviderError::Encryption(_)));
    }

    #[test]
    fn test_wrong_key_length() {
        let err = encrypt_secret(&STANDARD.encode([0u8; 16]), b"x").unwrap_err();
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn test_secret_payload_passes_encrypted_value_through() {
        let key = STANDARD.encode([7u8; 32]);
        assert_eq!(secret_payload(&key, None, Some("aGk=")).unwrap(), "aGk=");
        assert!(secret_payload(&key, None, Some("%%%")).is_err());

        let sealed = secret_payload(&key, Some("hi"), None).unwrap();
        assert_eq!(STANDARD.decode(sealed).unwrap().len(), 2 + 48);
    }
}

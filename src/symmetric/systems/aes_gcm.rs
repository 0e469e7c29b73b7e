//! AES-GCM 对称加密实现
//!
//! 输出遵循 WebCrypto 约定：`密文 || 16 字节认证标签`，IV 单独返回。
use crate::common::utils::{SecretBytes, random_bytes};
use crate::symmetric::traits::SymmetricCryptographicSystem;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use thiserror::Error;

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16; // AES-GCM's tag is 16 bytes

/// AES-GCM 系统的独立错误类型
#[derive(Error, Debug)]
pub enum AesGcmSystemError {
    #[error("Random source unavailable: {0}")]
    KeyGeneration(String),

    #[error("Invalid key size: expected {expected}, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },

    #[error("Invalid nonce size: expected {expected}, got {actual}")]
    InvalidNonceSize { expected: usize, actual: usize },

    #[error("AEAD encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Ciphertext is malformed or truncated: {0}")]
    MalformedCiphertext(String),
}

/// AES-GCM 对称加密系统
#[derive(Debug)]
pub struct AesGcmSystem;

impl AesGcmSystem {
    fn cipher(key: &[u8], iv: &[u8]) -> Result<Aes256Gcm, AesGcmSystemError> {
        if iv.len() != NONCE_SIZE {
            return Err(AesGcmSystemError::InvalidNonceSize {
                expected: NONCE_SIZE,
                actual: iv.len(),
            });
        }
        Aes256Gcm::new_from_slice(key).map_err(|_| AesGcmSystemError::InvalidKeySize {
            expected: KEY_SIZE,
            actual: key.len(),
        })
    }
}

impl SymmetricCryptographicSystem for AesGcmSystem {
    const KEY_SIZE: usize = KEY_SIZE;
    const IV_SIZE: usize = NONCE_SIZE;
    type Error = AesGcmSystemError;

    fn generate_key() -> Result<SecretBytes, Self::Error> {
        random_bytes(KEY_SIZE)
            .map(SecretBytes::new)
            .map_err(|e| AesGcmSystemError::KeyGeneration(e.to_string()))
    }

    fn generate_iv() -> Result<Vec<u8>, Self::Error> {
        random_bytes(NONCE_SIZE).map_err(|e| AesGcmSystemError::KeyGeneration(e.to_string()))
    }

    fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Self::Error> {
        let cipher = Self::cipher(key, iv)?;
        cipher
            .encrypt(Nonce::from_slice(iv), plaintext)
            .map_err(|_| AesGcmSystemError::EncryptionFailed)
    }

    fn decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Self::Error> {
        if ciphertext.len() < TAG_SIZE {
            return Err(AesGcmSystemError::MalformedCiphertext(
                "Ciphertext is too short to contain an authentication tag".to_string(),
            ));
        }
        let cipher = Self::cipher(key, iv)?;
        cipher
            .decrypt(Nonce::from_slice(iv), ciphertext)
            .map_err(|_| AesGcmSystemError::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key() {
        let key = AesGcmSystem::generate_key().unwrap();
        assert_eq!(key.len(), KEY_SIZE);
        assert_eq!(AesGcmSystem::generate_iv().unwrap().len(), NONCE_SIZE);
    }

    #[test]
    fn test_encrypt_decrypt_success() {
        let key = AesGcmSystem::generate_key().unwrap();
        let iv = AesGcmSystem::generate_iv().unwrap();
        let plaintext = b"this is a secret message";

        let ciphertext = AesGcmSystem::encrypt(&key, &iv, plaintext).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + TAG_SIZE);

        let decrypted_plaintext = AesGcmSystem::decrypt(&key, &iv, &ciphertext).unwrap();
        assert_eq!(plaintext, decrypted_plaintext.as_slice());
    }

    #[test]
    fn test_encrypt_empty_plaintext_yields_tag_only() {
        let key = AesGcmSystem::generate_key().unwrap();
        let iv = AesGcmSystem::generate_iv().unwrap();

        let ciphertext = AesGcmSystem::encrypt(&key, &iv, b"").unwrap();
        assert_eq!(ciphertext.len(), TAG_SIZE);
        assert!(AesGcmSystem::decrypt(&key, &iv, &ciphertext).unwrap().is_empty());
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let key1 = AesGcmSystem::generate_key().unwrap();
        let key2 = AesGcmSystem::generate_key().unwrap();
        let iv = AesGcmSystem::generate_iv().unwrap();

        let ciphertext = AesGcmSystem::encrypt(&key1, &iv, b"this is another secret").unwrap();
        let result = AesGcmSystem::decrypt(&key2, &iv, &ciphertext);
        assert!(matches!(result, Err(AesGcmSystemError::DecryptionFailed)));
    }

    #[test]
    fn test_decrypt_tampered_ciphertext() {
        let key = AesGcmSystem::generate_key().unwrap();
        let iv = AesGcmSystem::generate_iv().unwrap();

        let mut ciphertext = AesGcmSystem::encrypt(&key, &iv, b"some important data").unwrap();
        ciphertext[0] ^= 0xff;

        let result = AesGcmSystem::decrypt(&key, &iv, &ciphertext);
        assert!(matches!(result, Err(AesGcmSystemError::DecryptionFailed)));
    }

    #[test]
    fn test_cbc_sized_iv_rejected() {
        let key = AesGcmSystem::generate_key().unwrap();
        let result = AesGcmSystem::encrypt(&key, &[0u8; 16], b"data");
        assert!(matches!(
            result,
            Err(AesGcmSystemError::InvalidNonceSize {
                expected: 12,
                actual: 16
            })
        ));
    }

    #[test]
    fn test_decrypt_truncated_ciphertext() {
        let key = AesGcmSystem::generate_key().unwrap();
        let iv = AesGcmSystem::generate_iv().unwrap();
        let result = AesGcmSystem::decrypt(&key, &iv, &[0u8; 8]);
        assert!(matches!(result, Err(AesGcmSystemError::MalformedCiphertext(_))));
    }
}

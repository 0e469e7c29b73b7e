//! AES-256-CBC 对称加密实现（PKCS#7 填充）
use crate::common::utils::{SecretBytes, random_bytes};
use crate::symmetric::traits::SymmetricCryptographicSystem;
use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use thiserror::Error;

const KEY_SIZE: usize = 32;
const IV_SIZE: usize = 16;
const BLOCK_SIZE: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES-CBC 系统的独立错误类型
#[derive(Error, Debug)]
pub enum AesCbcSystemError {
    #[error("Random source unavailable: {0}")]
    KeyGeneration(String),

    #[error("Invalid key size: expected {expected}, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },

    #[error("Invalid IV size: expected {expected}, got {actual}")]
    InvalidIvSize { expected: usize, actual: usize },

    #[error("Ciphertext is malformed or truncated: {0}")]
    MalformedCiphertext(String),

    #[error("Invalid padding after decryption")]
    Unpad,
}

/// AES-256-CBC 对称加密系统
#[derive(Debug)]
pub struct AesCbcSystem;

impl AesCbcSystem {
    fn check_lengths(key: &[u8], iv: &[u8]) -> Result<(), AesCbcSystemError> {
        if key.len() != KEY_SIZE {
            return Err(AesCbcSystemError::InvalidKeySize {
                expected: KEY_SIZE,
                actual: key.len(),
            });
        }
        if iv.len() != IV_SIZE {
            return Err(AesCbcSystemError::InvalidIvSize {
                expected: IV_SIZE,
                actual: iv.len(),
            });
        }
        Ok(())
    }
}

impl SymmetricCryptographicSystem for AesCbcSystem {
    const KEY_SIZE: usize = KEY_SIZE;
    const IV_SIZE: usize = IV_SIZE;
    type Error = AesCbcSystemError;

    fn generate_key() -> Result<SecretBytes, Self::Error> {
        random_bytes(KEY_SIZE)
            .map(SecretBytes::new)
            .map_err(|e| AesCbcSystemError::KeyGeneration(e.to_string()))
    }

    fn generate_iv() -> Result<Vec<u8>, Self::Error> {
        random_bytes(IV_SIZE).map_err(|e| AesCbcSystemError::KeyGeneration(e.to_string()))
    }

    fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Self::Error> {
        Self::check_lengths(key, iv)?;
        let cipher = Aes256CbcEnc::new_from_slices(key, iv).map_err(|_| {
            AesCbcSystemError::InvalidKeySize {
                expected: KEY_SIZE,
                actual: key.len(),
            }
        })?;
        Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Self::Error> {
        Self::check_lengths(key, iv)?;
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(AesCbcSystemError::MalformedCiphertext(format!(
                "length {} is not a positive multiple of {BLOCK_SIZE}",
                ciphertext.len()
            )));
        }
        let cipher = Aes256CbcDec::new_from_slices(key, iv).map_err(|_| {
            AesCbcSystemError::InvalidKeySize {
                expected: KEY_SIZE,
                actual: key.len(),
            }
        })?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| AesCbcSystemError::Unpad)
    }
}

//! 使用会话密钥加密单个明文快照

use crate::common::codec::Base64Codec;
use crate::common::errors::{Error, Result};
use crate::keys::{KeyUsage, SymmetricKey};
use crate::symmetric::{AesCbcSystem, AesGcmSystem, CipherMode, SymmetricCryptographicSystem};
use serde::{Deserialize, Serialize};

/// 一次加密调用的结果：密文及其使用的 IV
///
/// GCM 模式下认证标签附在密文末尾。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionResult {
    pub ciphertext: Vec<u8>,
    pub iv: Vec<u8>,
}

impl EncryptionResult {
    pub fn ciphertext_base64(&self) -> String {
        Base64Codec::encode(&self.ciphertext)
    }

    pub fn iv_base64(&self) -> String {
        Base64Codec::encode(&self.iv)
    }
}

/// 对称加密器
#[derive(Debug, Clone, Copy, Default)]
pub struct Encryptor;

impl Encryptor {
    /// 使用新抽取的 IV 加密明文
    ///
    /// 每次调用都会从操作系统随机源重新抽取 IV，因此同一密钥下的两次调用
    /// 不会复用 IV。
    pub fn encrypt(
        plaintext: &[u8],
        key: &SymmetricKey,
        mode: CipherMode,
    ) -> Result<EncryptionResult> {
        Self::check_key(key, mode, KeyUsage::Encrypt).map_err(Error::Encryption)?;

        let (ciphertext, iv) = match mode {
            CipherMode::AesCbc => {
                let iv = AesCbcSystem::generate_iv().map_err(|e| Error::Encryption(e.to_string()))?;
                (AesCbcSystem::encrypt(key.raw_bytes(), &iv, plaintext)?, iv)
            }
            CipherMode::AesGcm => {
                let iv = AesGcmSystem::generate_iv().map_err(|e| Error::Encryption(e.to_string()))?;
                (AesGcmSystem::encrypt(key.raw_bytes(), &iv, plaintext)?, iv)
            }
        };
        Ok(EncryptionResult { ciphertext, iv })
    }

    /// 解密路径，仅用于验证往返；链接生成流程本身只加密
    pub fn decrypt(
        result: &EncryptionResult,
        key: &SymmetricKey,
        mode: CipherMode,
    ) -> Result<Vec<u8>> {
        Self::check_key(key, mode, KeyUsage::Decrypt).map_err(Error::Decryption)?;
        if result.iv.len() != mode.iv_len() {
            return Err(Error::Decryption(format!(
                "{mode} requires a {}-byte IV, got {}",
                mode.iv_len(),
                result.iv.len()
            )));
        }

        let (iv, ciphertext) = (&result.iv, &result.ciphertext);
        let plaintext = match mode {
            CipherMode::AesCbc => AesCbcSystem::decrypt(key.raw_bytes(), iv, ciphertext)?,
            CipherMode::AesGcm => AesGcmSystem::decrypt(key.raw_bytes(), iv, ciphertext)?,
        };
        Ok(plaintext)
    }

    fn check_key(
        key: &SymmetricKey,
        mode: CipherMode,
        usage: KeyUsage,
    ) -> std::result::Result<(), String> {
        if key.mode() != mode {
            return Err(format!("{} key cannot be used with {mode}", key.mode()));
        }
        if !key.usages().contains(usage) {
            return Err(format!("key usages {:?} do not allow {usage:?}", key.usages()));
        }
        Ok(())
    }
}

//! 对称加密模块：会话密钥生成与单条消息的加解密

pub mod systems;
pub mod traits;

use crate::common::errors::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use self::systems::aes_cbc::AesCbcSystem;
pub use self::systems::aes_gcm::AesGcmSystem;
pub use self::traits::SymmetricCryptographicSystem;

/// 对称加密模式
///
/// IV 长度由模式决定，调用方不能单独指定，从而避免把 CBC 的 16 字节 IV
/// 用在 GCM 上（或反之）。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CipherMode {
    /// AES-256-CBC，16 字节 IV，PKCS#7 填充
    #[default]
    AesCbc,
    /// AES-256-GCM，12 字节 IV，密文末尾附带 16 字节认证标签
    AesGcm,
}

impl CipherMode {
    /// 该模式要求的 IV 长度（字节）
    pub fn iv_len(self) -> usize {
        match self {
            CipherMode::AesCbc => AesCbcSystem::IV_SIZE,
            CipherMode::AesGcm => AesGcmSystem::IV_SIZE,
        }
    }

    /// 该模式要求的密钥长度（字节）
    pub fn key_len(self) -> usize {
        match self {
            CipherMode::AesCbc => AesCbcSystem::KEY_SIZE,
            CipherMode::AesGcm => AesGcmSystem::KEY_SIZE,
        }
    }

    /// 算法标签，与 WebCrypto 的算法名一致
    pub fn algorithm_name(self) -> &'static str {
        match self {
            CipherMode::AesCbc => "AES-CBC",
            CipherMode::AesGcm => "AES-GCM",
        }
    }
}

impl fmt::Display for CipherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.algorithm_name())
    }
}

impl FromStr for CipherMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aes-cbc" | "cbc" => Ok(CipherMode::AesCbc),
            "aes-gcm" | "gcm" => Ok(CipherMode::AesGcm),
            other => Err(Error::Configuration(format!(
                "unsupported cipher mode `{other}` (expected `aes-cbc` or `aes-gcm`)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iv_length_follows_mode() {
        assert_eq!(CipherMode::AesCbc.iv_len(), 16);
        assert_eq!(CipherMode::AesGcm.iv_len(), 12);
        assert_eq!(CipherMode::AesCbc.key_len(), 32);
        assert_eq!(CipherMode::AesGcm.key_len(), 32);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("AES-GCM".parse::<CipherMode>().unwrap(), CipherMode::AesGcm);
        assert_eq!("cbc".parse::<CipherMode>().unwrap(), CipherMode::AesCbc);
        assert!("aes-ctr".parse::<CipherMode>().is_err());
        assert_eq!(CipherMode::AesCbc.to_string(), "AES-CBC");
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&CipherMode::AesGcm).unwrap();
        assert_eq!(json, "\"aes-gcm\"");
    }
}

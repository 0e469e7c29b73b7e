//! 使用 RSA-OAEP 公钥包装对称会话密钥

use crate::asymmetric::{KeyWrappingSystem, RsaOaepSystem};
use crate::common::codec::Base64Codec;
use crate::common::errors::{Error, Result};
use crate::keys::{AsymmetricPublicKey, KeyUsage, SymmetricKey};
use serde::{Deserialize, Serialize};

/// 被包装的会话密钥：原始密钥字节的 RSA-OAEP 密文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey(pub Vec<u8>);

impl WrappedKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        Base64Codec::encode(&self.0)
    }
}

/// 包装调用的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrapOutcome {
    /// 至少一把密钥尚未就绪，没有产生任何包装值
    Pending,
    Wrapped(WrappedKey),
}

impl WrapOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, WrapOutcome::Pending)
    }

    pub fn into_wrapped(self) -> Option<WrappedKey> {
        match self {
            WrapOutcome::Pending => None,
            WrapOutcome::Wrapped(key) => Some(key),
        }
    }
}

/// 会话密钥包装器
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyWrapper;

impl KeyWrapper {
    /// 就绪门：两把密钥都存在时才包装，否则返回 `Pending`
    pub fn wrap(
        symmetric_key: Option<&SymmetricKey>,
        public_key: Option<&AsymmetricPublicKey>,
    ) -> Result<WrapOutcome> {
        match (symmetric_key, public_key) {
            (Some(symmetric_key), Some(public_key)) => {
                Self::wrap_ready(symmetric_key, public_key).map(WrapOutcome::Wrapped)
            }
            _ => Ok(WrapOutcome::Pending),
        }
    }

    /// 包装一把已就绪的会话密钥
    ///
    /// OAEP 填充是随机化的，同一输入的两次包装结果不同，但都能还原为同一密钥。
    pub fn wrap_ready(
        symmetric_key: &SymmetricKey,
        public_key: &AsymmetricPublicKey,
    ) -> Result<WrappedKey> {
        if !public_key.usages().contains(KeyUsage::WrapKey) {
            return Err(Error::Wrapping(format!(
                "public key usages {:?} do not allow wrapKey",
                public_key.usages()
            )));
        }
        let wrapped = RsaOaepSystem::wrap_key(public_key.inner(), symmetric_key.raw_bytes())?;
        Ok(WrappedKey(wrapped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{AsymmetricPrivateKey, HashAlgorithm};
    use crate::provider::KeyProvider;
    use crate::symmetric::CipherMode;
    use std::sync::OnceLock;

    fn keypair() -> &'static (AsymmetricPublicKey, AsymmetricPrivateKey) {
        static KEYS: OnceLock<(AsymmetricPublicKey, AsymmetricPrivateKey)> = OnceLock::new();
        KEYS.get_or_init(|| {
            KeyProvider::generate_asymmetric_key_pair(2048, 65537, HashAlgorithm::Sha256).unwrap()
        })
    }

    #[test]
    fn test_pending_until_both_keys_present() {
        let (public_key, _) = keypair();
        let session_key = KeyProvider::generate_symmetric_key(CipherMode::AesCbc, 256).unwrap();

        assert!(KeyWrapper::wrap(None, None).unwrap().is_pending());
        assert!(KeyWrapper::wrap(Some(&session_key), None).unwrap().is_pending());
        assert!(KeyWrapper::wrap(None, Some(public_key)).unwrap().is_pending());

        let outcome = KeyWrapper::wrap(Some(&session_key), Some(public_key)).unwrap();
        assert!(outcome.into_wrapped().is_some());
    }

    #[test]
    fn test_wraps_are_distinct_but_unwrap_to_same_key() {
        let (public_key, private_key) = keypair();
        let session_key = KeyProvider::generate_symmetric_key(CipherMode::AesGcm, 256).unwrap();

        let first = KeyWrapper::wrap_ready(&session_key, public_key).unwrap();
        let second = KeyWrapper::wrap_ready(&session_key, public_key).unwrap();
        assert_ne!(first, second);

        let first_raw = private_key.unwrap_raw(first.as_bytes()).unwrap();
        let second_raw = private_key.unwrap_raw(second.as_bytes()).unwrap();
        assert_eq!(first_raw, second_raw);
        assert_eq!(first_raw.as_bytes(), session_key.raw_bytes());
    }

    #[test]
    fn test_wrapped_key_base64() {
        let wrapped = WrappedKey(b"B".to_vec());
        assert_eq!(wrapped.to_base64(), "Qg==");
    }
}

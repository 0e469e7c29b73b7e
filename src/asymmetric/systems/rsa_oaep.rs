//! `RsaOaepSystem` 提供基于 RSA-OAEP (SHA-256) 的密钥包装功能。
//! OAEP 的 MGF1 同样使用 SHA-256，与 WebCrypto 的 `RSA-OAEP` + `SHA-256` 参数一致。

use crate::asymmetric::traits::KeyWrappingSystem;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::rand_core::OsRng as RsaOsRng;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use thiserror::Error;

/// RSA-OAEP 系统的独立错误类型
#[derive(Error, Debug)]
pub enum RsaOaepSystemError {
    #[error("failed to import RSA public key: {0}")]
    Import(String),
    #[error("failed to generate RSA key pair: {0}")]
    Generation(String),
    #[error("RSA-OAEP wrap failed: {0}")]
    Wrap(String),
    #[error("RSA-OAEP unwrap failed: {0}")]
    Unwrap(String),
}

/// RSA-OAEP 密钥包装系统
pub struct RsaOaepSystem;

impl KeyWrappingSystem for RsaOaepSystem {
    type PublicKey = RsaPublicKey;
    type PrivateKey = RsaPrivateKey;
    type Error = RsaOaepSystemError;

    /// 依次尝试 SubjectPublicKeyInfo 与 PKCS#1 两种 DER 结构
    fn import_public_key(der: &[u8]) -> Result<Self::PublicKey, Self::Error> {
        RsaPublicKey::from_public_key_der(der).or_else(|spki_err| {
            RsaPublicKey::from_pkcs1_der(der).map_err(|pkcs1_err| {
                RsaOaepSystemError::Import(format!(
                    "not SubjectPublicKeyInfo ({spki_err}) nor PKCS#1 ({pkcs1_err})"
                ))
            })
        })
    }

    fn generate_keypair(
        modulus_bits: usize,
        public_exponent: u64,
    ) -> Result<(Self::PublicKey, Self::PrivateKey), Self::Error> {
        let mut rng = RsaOsRng;
        let exponent = BigUint::from(public_exponent);
        let private_key = RsaPrivateKey::new_with_exp(&mut rng, modulus_bits, &exponent)
            .map_err(|e| RsaOaepSystemError::Generation(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);
        Ok((public_key, private_key))
    }

    fn wrap_key(public_key: &Self::PublicKey, key_bytes: &[u8]) -> Result<Vec<u8>, Self::Error> {
        let mut rng = RsaOsRng;
        public_key
            .encrypt(&mut rng, Oaep::new::<Sha256>(), key_bytes)
            .map_err(|e| RsaOaepSystemError::Wrap(e.to_string()))
    }

    fn unwrap_key(private_key: &Self::PrivateKey, wrapped: &[u8]) -> Result<Vec<u8>, Self::Error> {
        private_key
            .decrypt(Oaep::new::<Sha256>(), wrapped)
            .map_err(|e| RsaOaepSystemError::Unwrap(e.to_string()))
    }

    fn modulus_bits(public_key: &Self::PublicKey) -> usize {
        public_key.size() * 8
    }
}

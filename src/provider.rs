//! 密钥获取：导入部署公钥、生成会话密钥，以及跟踪两者的就绪状态。
//!
//! 所有操作本身是同步的 CPU 密集型调用；在 `async-engine` 特性下，
//! 它们通过 `spawn_blocking` 包装成可并行执行的异步任务。

use crate::asymmetric::{KeyWrappingSystem, RsaOaepSystem};
use crate::common::config::KeySource;
use crate::common::errors::{Error, Result};
use crate::common::pem::PemKeyDecoder;
use crate::keys::{AsymmetricPrivateKey, AsymmetricPublicKey, HashAlgorithm, SymmetricKey};
use crate::symmetric::{AesCbcSystem, AesGcmSystem, CipherMode, SymmetricCryptographicSystem};
use std::sync::Arc;
use tracing::{debug, info};

/// 密钥提供者
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyProvider;

impl KeyProvider {
    /// 从 DER 字节导入 RSA-OAEP 公钥，用途限定为 `{encrypt, wrapKey}`
    pub fn import_public_key(der: &[u8], hash: HashAlgorithm) -> Result<AsymmetricPublicKey> {
        let inner = RsaOaepSystem::import_public_key(der)?;
        let key = AsymmetricPublicKey::new(inner, hash);
        debug!(
            modulus_bits = key.modulus_bits(),
            hash = hash.name(),
            "imported RSA-OAEP public key"
        );
        Ok(key)
    }

    /// 解码 PEM 文本后导入公钥
    pub fn import_public_key_pem(pem: &str, hash: HashAlgorithm) -> Result<AsymmetricPublicKey> {
        let der = PemKeyDecoder::decode(pem)?;
        Self::import_public_key(&der, hash)
    }

    /// 生成新的随机对称会话密钥
    pub fn generate_symmetric_key(mode: CipherMode, bit_length: usize) -> Result<SymmetricKey> {
        if bit_length != mode.key_len() * 8 {
            return Err(Error::KeyGeneration(format!(
                "{mode} does not support a {bit_length}-bit key (expected {})",
                mode.key_len() * 8
            )));
        }
        let bytes = match mode {
            CipherMode::AesCbc => AesCbcSystem::generate_key()?,
            CipherMode::AesGcm => AesGcmSystem::generate_key()?,
        };
        debug!(algorithm = mode.algorithm_name(), bit_length, "generated session key");
        SymmetricKey::from_raw(mode, bytes.as_bytes())
    }

    /// 生成 RSA-OAEP 密钥对。私钥不参与链接生成。
    pub fn generate_asymmetric_key_pair(
        modulus_bits: usize,
        public_exponent: u64,
        hash: HashAlgorithm,
    ) -> Result<(AsymmetricPublicKey, AsymmetricPrivateKey)> {
        let (public_key, private_key) =
            RsaOaepSystem::generate_keypair(modulus_bits, public_exponent)?;
        debug!(modulus_bits, public_exponent, "generated RSA-OAEP key pair");
        Ok((
            AsymmetricPublicKey::new(public_key, hash),
            AsymmetricPrivateKey::new(private_key),
        ))
    }

    /// 按配置获取公钥：导入 PEM，或生成密钥对并丢弃私钥
    pub fn acquire_public_key(source: &KeySource) -> Result<AsymmetricPublicKey> {
        match source {
            KeySource::Import { public_key_pem } => {
                Self::import_public_key_pem(public_key_pem, HashAlgorithm::Sha256)
            }
            KeySource::Generate {
                modulus_bits,
                public_exponent,
            } => {
                let (public_key, _private_key) = Self::generate_asymmetric_key_pair(
                    *modulus_bits,
                    *public_exponent,
                    HashAlgorithm::Sha256,
                )?;
                info!(modulus_bits, "using a freshly generated key pair; links cannot be opened by a deployment key");
                Ok(public_key)
            }
        }
    }
}

#[cfg(feature = "async-engine")]
impl KeyProvider {
    /// [异步] 在阻塞线程池中导入公钥
    pub async fn import_public_key_async(
        der: Vec<u8>,
        hash: HashAlgorithm,
    ) -> Result<AsymmetricPublicKey> {
        tokio::task::spawn_blocking(move || Self::import_public_key(&der, hash)).await?
    }

    /// [异步] 在阻塞线程池中生成会话密钥
    pub async fn generate_symmetric_key_async(
        mode: CipherMode,
        bit_length: usize,
    ) -> Result<SymmetricKey> {
        tokio::task::spawn_blocking(move || Self::generate_symmetric_key(mode, bit_length)).await?
    }

    /// [异步] 按配置获取公钥
    pub async fn acquire_public_key_async(source: KeySource) -> Result<AsymmetricPublicKey> {
        tokio::task::spawn_blocking(move || Self::acquire_public_key(&source)).await?
    }
}

/// 两个密钥槽位及其就绪状态
///
/// 公钥与会话密钥可以按任意顺序到达；两者都就绪时才允许包装。
/// 每次替换任一密钥都会递增 `generation`，用于识别过期的包装结果。
#[derive(Debug, Default, Clone)]
pub struct KeySlots {
    public_key: Option<Arc<AsymmetricPublicKey>>,
    symmetric_key: Option<Arc<SymmetricKey>>,
    generation: u64,
}

/// 两个完成标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    pub public_key: bool,
    pub symmetric_key: bool,
}

impl Readiness {
    pub fn is_ready(self) -> bool {
        self.public_key && self.symmetric_key
    }
}

/// 一对已就绪的密钥，以及它们所属的代次
#[derive(Debug, Clone)]
pub struct ReadyPair {
    pub public_key: Arc<AsymmetricPublicKey>,
    pub symmetric_key: Arc<SymmetricKey>,
    pub generation: u64,
}

impl KeySlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// 放入公钥；若此时两把密钥都已就绪，返回需要包装的一对
    pub fn set_public_key(&mut self, key: Arc<AsymmetricPublicKey>) -> Option<ReadyPair> {
        self.public_key = Some(key);
        self.generation += 1;
        self.ready_pair()
    }

    /// 放入会话密钥；若此时两把密钥都已就绪，返回需要包装的一对
    pub fn set_symmetric_key(&mut self, key: Arc<SymmetricKey>) -> Option<ReadyPair> {
        self.symmetric_key = Some(key);
        self.generation += 1;
        self.ready_pair()
    }

    pub fn readiness(&self) -> Readiness {
        Readiness {
            public_key: self.public_key.is_some(),
            symmetric_key: self.symmetric_key.is_some(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.readiness().is_ready()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn public_key(&self) -> Option<&Arc<AsymmetricPublicKey>> {
        self.public_key.as_ref()
    }

    pub fn symmetric_key(&self) -> Option<&Arc<SymmetricKey>> {
        self.symmetric_key.as_ref()
    }

    pub fn ready_pair(&self) -> Option<ReadyPair> {
        match (&self.public_key, &self.symmetric_key) {
            (Some(public_key), Some(symmetric_key)) => Some(ReadyPair {
                public_key: Arc::clone(public_key),
                symmetric_key: Arc::clone(symmetric_key),
                generation: self.generation,
            }),
            _ => None,
        }
    }
}

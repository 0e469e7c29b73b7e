//! 带算法标签的密钥句柄
//!
//! 每个句柄都记录算法、用途集合和不透明的密钥材料。把密钥交给错误的操作
//! （例如用公钥句柄做对称加密）在类型层面就无法编译；用途集合则在运行时
//! 再做一次校验。

use crate::asymmetric::{KeyWrappingSystem, RsaOaepSystem};
use crate::common::codec::Base64Codec;
use crate::common::errors::{Error, Result};
use crate::common::utils::SecretBytes;
use crate::symmetric::CipherMode;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 密钥用途
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyUsage {
    Encrypt,
    Decrypt,
    WrapKey,
    UnwrapKey,
}

impl KeyUsage {
    const fn bit(self) -> u8 {
        match self {
            KeyUsage::Encrypt => 0b0001,
            KeyUsage::Decrypt => 0b0010,
            KeyUsage::WrapKey => 0b0100,
            KeyUsage::UnwrapKey => 0b1000,
        }
    }
}

/// 一组密钥用途
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyUsages(u8);

impl KeyUsages {
    /// 导入的公钥：`{encrypt, wrapKey}`
    pub const PUBLIC_WRAPPING: KeyUsages =
        KeyUsages(KeyUsage::Encrypt.bit() | KeyUsage::WrapKey.bit());
    /// 生成的私钥：`{decrypt, unwrapKey}`
    pub const PRIVATE_UNWRAPPING: KeyUsages =
        KeyUsages(KeyUsage::Decrypt.bit() | KeyUsage::UnwrapKey.bit());
    /// 对称会话密钥：`{encrypt, decrypt}`
    pub const SYMMETRIC: KeyUsages = KeyUsages(KeyUsage::Encrypt.bit() | KeyUsage::Decrypt.bit());

    pub fn contains(self, usage: KeyUsage) -> bool {
        self.0 & usage.bit() != 0
    }
}

impl fmt::Debug for KeyUsages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let all = [
            KeyUsage::Encrypt,
            KeyUsage::Decrypt,
            KeyUsage::WrapKey,
            KeyUsage::UnwrapKey,
        ];
        f.debug_set()
            .entries(all.into_iter().filter(|u| self.contains(*u)))
            .finish()
    }
}

/// OAEP 使用的哈希算法
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "SHA-256")]
    Sha256,
}

impl HashAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
        }
    }
}

/// 非对称算法标签
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AsymmetricAlgorithm {
    RsaOaep,
}

impl AsymmetricAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            AsymmetricAlgorithm::RsaOaep => "RSA-OAEP",
        }
    }
}

/// 用于包装会话密钥的公钥句柄，创建后不可变
#[derive(Clone, Debug)]
pub struct AsymmetricPublicKey {
    algorithm: AsymmetricAlgorithm,
    hash: HashAlgorithm,
    usages: KeyUsages,
    inner: RsaPublicKey,
}

impl AsymmetricPublicKey {
    pub(crate) fn new(inner: RsaPublicKey, hash: HashAlgorithm) -> Self {
        Self {
            algorithm: AsymmetricAlgorithm::RsaOaep,
            hash,
            usages: KeyUsages::PUBLIC_WRAPPING,
            inner,
        }
    }

    pub fn algorithm(&self) -> AsymmetricAlgorithm {
        self.algorithm
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub fn usages(&self) -> KeyUsages {
        self.usages
    }

    pub fn modulus_bits(&self) -> usize {
        RsaOaepSystem::modulus_bits(&self.inner)
    }

    pub(crate) fn inner(&self) -> &RsaPublicKey {
        &self.inner
    }
}

/// 与生成的公钥配对的私钥句柄
///
/// 链接生成流程从不使用它；它只为校验包装结果而保留。
pub struct AsymmetricPrivateKey {
    usages: KeyUsages,
    inner: RsaPrivateKey,
}

impl AsymmetricPrivateKey {
    pub(crate) fn new(inner: RsaPrivateKey) -> Self {
        Self {
            usages: KeyUsages::PRIVATE_UNWRAPPING,
            inner,
        }
    }

    pub fn usages(&self) -> KeyUsages {
        self.usages
    }

    /// 还原被包装的原始密钥字节
    pub fn unwrap_raw(&self, wrapped: &[u8]) -> Result<SecretBytes> {
        let raw = RsaOaepSystem::unwrap_key(&self.inner, wrapped)?;
        Ok(SecretBytes::new(raw))
    }
}

impl fmt::Debug for AsymmetricPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsymmetricPrivateKey")
            .field("usages", &self.usages)
            .finish_non_exhaustive()
    }
}

/// 对称会话密钥句柄，一个会话生成一次
#[derive(Clone, Debug)]
pub struct SymmetricKey {
    mode: CipherMode,
    usages: KeyUsages,
    bytes: SecretBytes,
}

impl SymmetricKey {
    /// 由原始字节构造，长度必须与模式一致
    pub fn from_raw(mode: CipherMode, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = SecretBytes::new(bytes);
        if bytes.len() != mode.key_len() {
            return Err(Error::KeyImport(format!(
                "{mode} key must be {} bytes, got {}",
                mode.key_len(),
                bytes.len()
            )));
        }
        Ok(Self {
            mode,
            usages: KeyUsages::SYMMETRIC,
            bytes,
        })
    }

    /// 从 Base64 文本导入原始密钥
    pub fn import_base64(mode: CipherMode, encoded: &str) -> Result<Self> {
        Self::from_raw(mode, Base64Codec::decode(encoded)?)
    }

    /// 以 Base64 导出原始密钥字节（诊断视图）
    pub fn export_base64(&self) -> String {
        Base64Codec::encode(&self.bytes)
    }

    pub fn mode(&self) -> CipherMode {
        self.mode
    }

    pub fn bit_length(&self) -> usize {
        self.bytes.len() * 8
    }

    pub fn usages(&self) -> KeyUsages {
        self.usages
    }

    pub(crate) fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

//! 定义了非对称密钥包装系统的核心 Trait。
use std::fmt::Debug;

/// `KeyWrappingSystem` 定义了用于包装会话密钥的非对称算法必须实现的功能。
///
/// 在链接生成流程中，非对称加密只用来保护对称会话密钥（DEK），
/// 批量数据始终由对称算法加密。
pub trait KeyWrappingSystem: Sized {
    /// 公钥类型
    type PublicKey: Clone + Debug + Send + Sync;

    /// 私钥类型，仅用于生成密钥对与校验包装结果
    type PrivateKey: Send + Sync;

    /// 错误类型
    type Error: std::error::Error + Send + Sync + 'static;

    /// 从 DER 字节导入公钥
    fn import_public_key(der: &[u8]) -> Result<Self::PublicKey, Self::Error>;

    /// 生成密钥对
    fn generate_keypair(
        modulus_bits: usize,
        public_exponent: u64,
    ) -> Result<(Self::PublicKey, Self::PrivateKey), Self::Error>;

    /// 使用公钥包装原始密钥字节。输出带随机填充，同一输入每次结果都不同。
    fn wrap_key(public_key: &Self::PublicKey, key_bytes: &[u8]) -> Result<Vec<u8>, Self::Error>;

    /// 使用私钥还原被包装的密钥字节
    fn unwrap_key(private_key: &Self::PrivateKey, wrapped: &[u8]) -> Result<Vec<u8>, Self::Error>;

    /// 公钥模数长度（位）
    fn modulus_bits(public_key: &Self::PublicKey) -> usize;
}

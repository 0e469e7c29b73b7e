use crate::common::utils::SecretBytes;

/// 对称加密系统的公共特征
///
/// 与流式或带长度前缀的格式不同，这里的密文与 IV 分开传递：
/// IV 会以独立字段出现在链接中。
pub trait SymmetricCryptographicSystem: Sized {
    /// 密钥的期望长度（以字节为单位）。
    const KEY_SIZE: usize;

    /// IV 的期望长度（以字节为单位）。
    const IV_SIZE: usize;

    /// 该系统的错误类型。
    type Error: std::error::Error + Send + Sync + 'static;

    /// 生成一个新的随机密钥。
    fn generate_key() -> Result<SecretBytes, Self::Error>;

    /// 从随机源抽取一个新的 IV，每次加密调用都必须重新抽取。
    fn generate_iv() -> Result<Vec<u8>, Self::Error>;

    /// 使用密钥与给定 IV 加密数据。
    fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Self::Error>;

    /// 使用密钥与给定 IV 解密数据。
    fn decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Self::Error>;
}

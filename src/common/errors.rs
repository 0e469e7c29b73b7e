use crate::asymmetric::systems::rsa_oaep::RsaOaepSystemError;
use crate::symmetric::systems::aes_cbc::AesCbcSystemError;
use crate::symmetric::systems::aes_gcm::AesGcmSystemError;
use thiserror::Error;

/// 链接生成流程中可能遇到的错误类型
///
/// 解码与密钥获取类错误对会话启动是致命的；单条消息的加密错误只影响该次调用。
/// 密钥尚未就绪不是错误，而是由 `SessionState::KeysPending` 表达的等待状态。
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed PEM: {0}")]
    MalformedPem(String),

    #[error("Key import failed: {0}")]
    KeyImport(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Key wrapping failed: {0}")]
    Wrapping(String),

    #[error("Base64 decoding failed: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error (JSON)")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "async-engine")]
    #[error("Async task failed: {0}")]
    AsyncTask(#[from] tokio::task::JoinError),
}

impl From<AesCbcSystemError> for Error {
    fn from(err: AesCbcSystemError) -> Self {
        match err {
            AesCbcSystemError::KeyGeneration(e) => Error::KeyGeneration(e),
            AesCbcSystemError::Unpad | AesCbcSystemError::MalformedCiphertext(_) => {
                Error::Decryption(err.to_string())
            }
            other => Error::Encryption(other.to_string()),
        }
    }
}

impl From<AesGcmSystemError> for Error {
    fn from(err: AesGcmSystemError) -> Self {
        match err {
            AesGcmSystemError::KeyGeneration(e) => Error::KeyGeneration(e),
            AesGcmSystemError::DecryptionFailed | AesGcmSystemError::MalformedCiphertext(_) => {
                Error::Decryption(err.to_string())
            }
            other => Error::Encryption(other.to_string()),
        }
    }
}

impl From<RsaOaepSystemError> for Error {
    fn from(err: RsaOaepSystemError) -> Self {
        match err {
            RsaOaepSystemError::Import(_) => Error::KeyImport(err.to_string()),
            RsaOaepSystemError::Generation(_) => Error::KeyGeneration(err.to_string()),
            RsaOaepSystemError::Wrap(_) => Error::Wrapping(err.to_string()),
            RsaOaepSystemError::Unwrap(_) => Error::Decryption(err.to_string()),
        }
    }
}

/// 本 crate 统一使用的 `Result` 别名
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsa_errors_map_to_taxonomy() {
        let err: Error = RsaOaepSystemError::Import("bad der".to_string()).into();
        assert!(matches!(err, Error::KeyImport(_)));

        let err: Error = RsaOaepSystemError::Wrap("message too long".to_string()).into();
        assert!(matches!(err, Error::Wrapping(_)));
    }

    #[test]
    fn test_cipher_errors_map_to_taxonomy() {
        let err: Error = AesGcmSystemError::DecryptionFailed.into();
        assert!(matches!(err, Error::Decryption(_)));

        let err: Error = AesCbcSystemError::InvalidKeySize {
            expected: 32,
            actual: 16,
        }
        .into();
        assert!(matches!(err, Error::Encryption(_)));
    }
}

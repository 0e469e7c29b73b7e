//! # Seal-Link: 把敏感数据封装进可分享的链接
//!
//! `seal-link` 以混合加密的方式把结构化数据嵌入 URL：每个会话生成一把 AES-256
//! 会话密钥加密明文，再用部署方的 RSA-OAEP (SHA-256) 公钥包装这把会话密钥。
//! 链接中只包含密文、包装后的密钥与 IV，只有持有对应私钥的一方才能还原数据。
//!
//! ## Core Concepts
//!
//! - **`HybridSession`**: 同步会话，显式的 `KeysPending → KeysReady` 状态机。
//! - **`AsyncHybridSession`**: 异步会话，并行获取密钥，按版本丢弃过期的加密结果。
//! - **`KeyProvider`**: 导入 PEM 公钥、生成会话密钥或 RSA 密钥对。
//! - **`Encryptor` / `KeyWrapper` / `PayloadAssembler`**: 加密、包装与链接组装。
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use seal_link::{HybridSession, LinkConfig, ApplicantRecord};
//!
//! fn main() -> seal_link::Result<()> {
//!     let config = LinkConfig::from_env()?;
//!     let mut session = HybridSession::start(&config)?;
//!
//!     let record = ApplicantRecord {
//!         first_name: "Ana".to_string(),
//!         ..Default::default()
//!     };
//!     if let Some(payload) = session.on_plaintext_changed(record.to_plaintext()?)? {
//!         println!("{}", payload.url);
//!     }
//!     Ok(())
//! }
//! ```

pub mod asymmetric;
pub mod common;
pub mod encryptor;
pub mod engines;
pub mod keys;
pub mod payload;
pub mod provider;
pub mod session;
pub mod snapshot;
pub mod symmetric;
pub mod wrapper;

pub use common::{Base64Codec, Error, KeySource, LinkConfig, PemKeyDecoder, Result};
pub use encryptor::{EncryptionResult, Encryptor};
pub use keys::{AsymmetricPrivateKey, AsymmetricPublicKey, HashAlgorithm, KeyUsage, SymmetricKey};
pub use payload::{EncryptedPayload, PayloadAssembler, build_url};
pub use provider::{KeyProvider, Readiness};
pub use session::{HybridSession, SessionState};
pub use snapshot::{ApplicantRecord, Plaintext};
pub use symmetric::CipherMode;
pub use wrapper::{KeyWrapper, WrapOutcome, WrappedKey};

#[cfg(feature = "async-engine")]
pub use engines::{AsyncHybridSession, LinkSink, Publication, WatchSink};

/// The version of the `seal-link` crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

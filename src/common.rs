//! 通用模块，包含错误处理、配置、编解码与工具函数

pub mod codec;
pub mod config;
pub mod errors;
pub mod pem;
pub mod utils;

pub use self::codec::Base64Codec;
pub use self::config::{CryptoConfig, KeySource, LinkConfig, LinkSettings};
pub use self::errors::{Error, Result};
pub use self::pem::{PemBlock, PemKeyDecoder, PemLabel};
pub use self::utils::{SecretBytes, random_bytes};

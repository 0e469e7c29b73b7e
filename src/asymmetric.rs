//! 非对称加密模块：公钥导入、密钥对生成与会话密钥包装

pub mod systems;
pub mod traits;

pub use self::systems::rsa_oaep::RsaOaepSystem;
pub use self::traits::KeyWrappingSystem;

//!
//! # 通用配置模块
//!
//! 描述一次部署所需的全部固定参数：链接的基础地址与固定元数据，
//! 以及对称加密模式和非对称公钥的来源。
//! 这些参数在运行时不可由用户修改，只在会话启动前加载一次。
//!
use crate::common::errors::{Error, Result};
use crate::payload::validate_absolute_url;
use crate::symmetric::CipherMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "SEAL_LINK_";

const MIN_RSA_BITS: usize = 1024;

/// 链接配置：决定生成的 URL 的形状
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LinkSettings {
    /// 绝对基础地址，例如 `http://localhost:4200`
    pub base_url: String,
    /// 追加在基础地址后的路径
    #[serde(default = "default_path")]
    pub path: String,
    /// 固定的来源标签
    #[serde(default = "default_source")]
    pub source: String,
    /// 可选的固定外部标识
    #[serde(default)]
    pub external_id: Option<String>,
}

fn default_path() -> String {
    "/offer/new".to_string()
}

fn default_source() -> String {
    "zuerich-kzp".to_string()
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4200".to_string(),
            path: default_path(),
            source: default_source(),
            external_id: None,
        }
    }
}

/// 非对称公钥的来源
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum KeySource {
    /// 导入部署方提供的 PEM 公钥
    Import { public_key_pem: String },
    /// 会话自行生成密钥对（私钥不会被使用）
    Generate {
        #[serde(default = "default_modulus_bits")]
        modulus_bits: usize,
        #[serde(default = "default_public_exponent")]
        public_exponent: u64,
    },
}

fn default_modulus_bits() -> usize {
    2048
}

fn default_public_exponent() -> u64 {
    65537
}

impl Default for KeySource {
    fn default() -> Self {
        KeySource::Generate {
            modulus_bits: default_modulus_bits(),
            public_exponent: default_public_exponent(),
        }
    }
}

/// 加密参数配置
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CryptoConfig {
    /// 对称加密模式，一次部署只使用一种
    #[serde(default)]
    pub cipher_mode: CipherMode,
    /// 对称密钥长度（位），目前只支持 256
    #[serde(default = "default_symmetric_key_bits")]
    pub symmetric_key_bits: usize,
    #[serde(default)]
    pub key_source: KeySource,
}

fn default_symmetric_key_bits() -> usize {
    256
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            cipher_mode: CipherMode::default(),
            symmetric_key_bits: default_symmetric_key_bits(),
            key_source: KeySource::default(),
        }
    }
}

/// 完整配置文件
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct LinkConfig {
    #[serde(default)]
    pub link: LinkSettings,
    #[serde(default)]
    pub crypto: CryptoConfig,
}

impl LinkConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: LinkConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// 在默认值之上叠加 `SEAL_LINK_*` 环境变量
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// 在默认值之上叠加给定的变量集合
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();
        let mut rsa_bits = None;

        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.into();
            match name {
                "BASE_URL" => config.link.base_url = value,
                "PATH" => config.link.path = value,
                "SOURCE" => config.link.source = value,
                "EXTERNAL_ID" => config.link.external_id = Some(value),
                "CIPHER_MODE" => config.crypto.cipher_mode = value.parse()?,
                "PUBLIC_KEY_PEM" => {
                    config.crypto.key_source = KeySource::Import {
                        public_key_pem: value,
                    }
                }
                "RSA_BITS" => {
                    let bits = value.parse::<usize>().map_err(|e| {
                        Error::Configuration(format!("{ENV_PREFIX}RSA_BITS: {e}"))
                    })?;
                    rsa_bits = Some(bits);
                }
                _ => {}
            }
        }

        if let (Some(bits), KeySource::Generate { modulus_bits, .. }) =
            (rsa_bits, &mut config.crypto.key_source)
        {
            *modulus_bits = bits;
        }

        config.validate()?;
        Ok(config)
    }

    /// 校验配置的一致性
    pub fn validate(&self) -> Result<()> {
        if self.crypto.symmetric_key_bits != 256 {
            return Err(Error::Configuration(format!(
                "unsupported symmetric key length: {} bits (only 256 is supported)",
                self.crypto.symmetric_key_bits
            )));
        }

        if let KeySource::Generate {
            modulus_bits,
            public_exponent,
        } = &self.crypto.key_source
        {
            if *modulus_bits < MIN_RSA_BITS {
                return Err(Error::Configuration(format!(
                    "RSA modulus of {modulus_bits} bits is below the {MIN_RSA_BITS}-bit minimum"
                )));
            }
            if *public_exponent < 3 || public_exponent % 2 == 0 {
                return Err(Error::Configuration(format!(
                    "invalid RSA public exponent: {public_exponent}"
                )));
            }
        }

        validate_absolute_url(&self.link.base_url)?;
        if !self.link.path.is_empty() && !self.link.path.starts_with('/') {
            return Err(Error::Configuration(format!(
                "path `{}` must start with `/`",
                self.link.path
            )));
        }
        if self.link.source.is_empty() {
            return Err(Error::Configuration("source tag must not be empty".to_string()));
        }

        Ok(())
    }
}

//! 将密文、包装密钥、IV 与固定元数据组装为链接

use crate::common::config::LinkSettings;
use crate::common::errors::{Error, Result};
use crate::encryptor::EncryptionResult;
use crate::wrapper::WrappedKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::{Url, form_urlencoded};

/// 一次成功加密后构建的载荷，构造后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub ciphertext_base64: String,
    pub wrapped_key_base64: String,
    pub iv_base64: String,
    pub source: String,
    pub external_id: Option<String>,
    /// 产生该载荷的明文快照版本
    pub version: u64,
    pub issued_at: DateTime<Utc>,
    /// 完整链接
    pub url: String,
}

/// 组装链接
///
/// 查询参数顺序固定为 `data`、`key`、`iv`、`source`，然后是 `externalId`（如有）。
/// 参数值按 application/x-www-form-urlencoded 规则转义（空格为 `+`，`=` 为 `%3D`）。
/// 结果为 `base_url + path + '?' + 参数`，并且必须能解析为绝对 URL。
pub fn build_url(
    base_url: &str,
    path: &str,
    ciphertext_base64: &str,
    wrapped_key_base64: &str,
    iv_base64: &str,
    source: &str,
    external_id: Option<&str>,
) -> Result<String> {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("data", ciphertext_base64)
        .append_pair("key", wrapped_key_base64)
        .append_pair("iv", iv_base64)
        .append_pair("source", source);
    if let Some(external_id) = external_id {
        query.append_pair("externalId", external_id);
    }

    let url = format!("{base_url}{path}?{}", query.finish());
    validate_absolute_url(&url)?;
    Ok(url)
}

/// 校验文本是否为可作为基础地址的绝对 URL
pub fn validate_absolute_url(url: &str) -> Result<()> {
    if Url::parse(url)?.cannot_be_a_base() {
        return Err(Error::Configuration(format!(
            "`{url}` is not a hierarchical absolute URL"
        )));
    }
    Ok(())
}

/// 载荷组装器，携带一次部署的固定链接参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadAssembler {
    base_url: String,
    path: String,
    source: String,
    external_id: Option<String>,
}

impl PayloadAssembler {
    pub fn new(settings: &LinkSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            path: settings.path.clone(),
            source: settings.source.clone(),
            external_id: settings.external_id.clone(),
        }
    }

    /// 换用新的基础地址，其余参数保持不变
    pub fn with_base_url(&self, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        validate_absolute_url(&base_url)?;
        Ok(Self {
            base_url,
            ..self.clone()
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 由加密结果与最新的包装密钥构建载荷
    pub fn assemble(
        &self,
        encryption: &EncryptionResult,
        wrapped_key: &WrappedKey,
        version: u64,
    ) -> Result<EncryptedPayload> {
        let ciphertext_base64 = encryption.ciphertext_base64();
        let wrapped_key_base64 = wrapped_key.to_base64();
        let iv_base64 = encryption.iv_base64();
        let url = build_url(
            &self.base_url,
            &self.path,
            &ciphertext_base64,
            &wrapped_key_base64,
            &iv_base64,
            &self.source,
            self.external_id.as_deref(),
        )?;

        Ok(EncryptedPayload {
            ciphertext_base64,
            wrapped_key_base64,
            iv_base64,
            source: self.source.clone(),
            external_id: self.external_id.clone(),
            version,
            issued_at: Utc::now(),
            url,
        })
    }

    /// 用当前的基础地址重新组装已有载荷，不重新加密
    pub fn reassemble(&self, payload: &EncryptedPayload) -> Result<EncryptedPayload> {
        let url = build_url(
            &self.base_url,
            &self.path,
            &payload.ciphertext_base64,
            &payload.wrapped_key_base64,
            &payload.iv_base64,
            &self.source,
            self.external_id.as_deref(),
        )?;
        Ok(EncryptedPayload {
            source: self.source.clone(),
            external_id: self.external_id.clone(),
            url,
            ..payload.clone()
        })
    }
}

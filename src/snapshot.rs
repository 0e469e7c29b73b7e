//! 明文快照
//!
//! 外部的数据采集层在内容变化时提供一个字节缓冲区；这里提供把结构化记录
//! 序列化为该缓冲区的辅助类型。

use crate::common::codec::Base64Codec;
use crate::common::errors::Result;
use serde::{Deserialize, Serialize};

/// 单次加密调用使用的明文字节
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Plaintext(Vec<u8>);

impl Plaintext {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// 将任意可序列化的值编码为 JSON 明文
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self(serde_json::to_vec(value)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// 加密前的诊断信息
    pub fn stats(&self) -> PlaintextStats {
        PlaintextStats {
            raw_length: self.0.len(),
            base64_before_encryption: Base64Codec::encode(&self.0),
        }
    }
}

impl From<Vec<u8>> for Plaintext {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Plaintext {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for Plaintext {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl std::fmt::Debug for Plaintext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Plaintext({} bytes)", self.0.len())
    }
}

/// 明文在加密前的长度与 Base64 形式
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaintextStats {
    pub raw_length: usize,
    pub base64_before_encryption: String,
}

/// 申请人表单记录，字段名以 camelCase 序列化
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantRecord {
    pub salutation: String,
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub line2: String,
    pub line3: String,
    pub birth_date: String,
    pub nationality: String,
    pub phone_number: String,
    pub mobile_number: String,
    pub email_address: String,
    pub language: String,
    #[serde(rename = "externalId1")]
    pub external_id1: String,
}

impl ApplicantRecord {
    pub fn to_plaintext(&self) -> Result<Plaintext> {
        Plaintext::from_json(self)
    }
}

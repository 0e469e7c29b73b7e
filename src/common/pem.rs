//! PEM 公钥解码
//!
//! 只负责把 PEM 文本还原为 DER 字节，不解析 ASN.1 结构；
//! 结构校验在导入密钥时由 `RsaOaepSystem` 完成。

use crate::common::codec::Base64Codec;
use crate::common::errors::{Error, Result};

const PEM_BOUNDARY: &str = "-----";

/// PEM 块的标签，决定 DER 内容的结构
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PemLabel {
    /// `PUBLIC KEY`：X.509 SubjectPublicKeyInfo
    SubjectPublicKeyInfo,
    /// `RSA PUBLIC KEY`：PKCS#1 RSAPublicKey
    RsaPublicKey,
}

impl PemLabel {
    fn as_str(self) -> &'static str {
        match self {
            PemLabel::SubjectPublicKeyInfo => "PUBLIC KEY",
            PemLabel::RsaPublicKey => "RSA PUBLIC KEY",
        }
    }

    fn header(self) -> String {
        format!("{PEM_BOUNDARY}BEGIN {}{PEM_BOUNDARY}", self.as_str())
    }

    fn footer(self) -> String {
        format!("{PEM_BOUNDARY}END {}{PEM_BOUNDARY}", self.as_str())
    }
}

/// 解码后的 PEM 块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemBlock {
    pub label: PemLabel,
    pub der: Vec<u8>,
}

/// PEM 公钥解码器
#[derive(Debug, Clone, Copy, Default)]
pub struct PemKeyDecoder;

impl PemKeyDecoder {
    /// 将 PEM 编码的公钥转换为 DER 字节
    pub fn decode(pem: &str) -> Result<Vec<u8>> {
        Self::decode_block(pem).map(|block| block.der)
    }

    /// 解码 PEM 公钥并保留其标签
    ///
    /// 先去除所有换行符，再定位头尾标记，最后对两者之间的正文做 Base64 解码。
    pub fn decode_block(pem: &str) -> Result<PemBlock> {
        let flattened: String = pem.chars().filter(|c| *c != '\r' && *c != '\n').collect();

        for label in [PemLabel::SubjectPublicKeyInfo, PemLabel::RsaPublicKey] {
            let header = label.header();
            let Some(start) = flattened.find(&header) else {
                continue;
            };
            let body_start = start + header.len();
            let footer = label.footer();
            let body_len = flattened[body_start..].find(&footer).ok_or_else(|| {
                Error::MalformedPem(format!("missing footer `{footer}`"))
            })?;

            let body: String = flattened[body_start..body_start + body_len]
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            if body.is_empty() {
                return Err(Error::MalformedPem("empty PEM body".to_string()));
            }

            let der = Base64Codec::decode(&body)
                .map_err(|e| Error::MalformedPem(format!("invalid base64 body: {e}")))?;
            return Ok(PemBlock { label, der });
        }

        Err(Error::MalformedPem(
            "missing `-----BEGIN PUBLIC KEY-----` or `-----BEGIN RSA PUBLIC KEY-----` header"
                .to_string(),
        ))
    }
}

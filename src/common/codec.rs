//! Base64 编解码
//!
//! 链接中的三个二进制字段（密文、包装密钥、IV）都使用带 `=` 填充的标准字母表，
//! 而不是 URL 安全变体；URL 转义由查询串序列化器负责。

use crate::common::errors::Result;
use base64::{Engine, engine::general_purpose};

/// 标准 Base64 编解码器
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Codec;

impl Base64Codec {
    /// 将字节编码为标准 Base64 文本
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        general_purpose::STANDARD.encode(bytes)
    }

    /// 将标准 Base64 文本解码为字节
    ///
    /// 非法字符或非法填充长度会返回 `Error::Decode`。
    pub fn decode(text: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        Ok(general_purpose::STANDARD.decode(text)?)
    }
}

//!
//! 集成测试的通用辅助函数
//!

#![allow(dead_code)]

use seal_link::{AsymmetricPrivateKey, AsymmetricPublicKey, HashAlgorithm, KeyProvider};
use std::sync::OnceLock;

/// 部署方提供的 2048 位 RSA 公钥（SubjectPublicKeyInfo）
pub const DEPLOYMENT_PUBLIC_KEY_PEM: &str = "-----BEGIN PUBLIC KEY-----\n\
MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA4R9L578Mfy9QOKLY99pw\n\
gyy47tFzGWocbJvTLjoUMBfi2fU1H8WKzp5FQtppkLn8/6YnE5icYhzEmT3vN+Q2\n\
Pq+EkfC44n6Ja/x0SwvT69yxT42CPISthxEbwvgHNvmQEwP7B2zVsB950l/q2GjV\n\
WB+fGGN2ZO8YnYR13A8FJScZVCwnMybRUyzq/3zB+evuGpy3JnsPT+XgxMo8IIFW\n\
gwdKYmRPcApjyghSuk6QygkccoBAimw2eM8h6HqWJ4bWCeEbePWUuQK7Q2Wyfhsu\n\
XBNA4BB5kkBu1BSyIxnWIpYnHpIUV5raS2nAgM6rHQ9iAScMp6KX7LM/Xtl3t2py\n\
AQIDAQAB\n\
-----END PUBLIC KEY-----";

/// 进程内共享的 RSA 密钥对，避免每个测试都生成一次
pub fn rsa_keypair() -> &'static (AsymmetricPublicKey, AsymmetricPrivateKey) {
    static KEYS: OnceLock<(AsymmetricPublicKey, AsymmetricPrivateKey)> = OnceLock::new();
    KEYS.get_or_init(|| {
        KeyProvider::generate_asymmetric_key_pair(2048, 65537, HashAlgorithm::Sha256).unwrap()
    })
}

/// 按固定顺序取出链接的查询参数
pub fn query_pairs(url: &str) -> Vec<(String, String)> {
    url::Url::parse(url)
        .unwrap()
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

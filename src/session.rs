//! 同步会话：显式的会话状态对象
//!
//! 状态机只有两个状态：`KeysPending` 与 `KeysReady`。两把密钥都就绪时包装一次
//! 会话密钥并进入 `KeysReady`；此后每个新的明文快照都会触发一次加密和组装。
//! 在 `KeysPending` 期间到达的快照只保留最新的一个，进入 `KeysReady` 时立即处理。

use crate::common::config::LinkConfig;
use crate::common::errors::{Error, Result};
use crate::encryptor::Encryptor;
use crate::keys::{AsymmetricPublicKey, SymmetricKey};
use crate::payload::{EncryptedPayload, PayloadAssembler};
use crate::provider::{KeyProvider, KeySlots, ReadyPair, Readiness};
use crate::snapshot::Plaintext;
use crate::symmetric::CipherMode;
use crate::wrapper::{KeyWrapper, WrappedKey};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 至少一把密钥尚未就绪，或会话密钥尚未被包装
    KeysPending,
    /// 会话密钥已包装，可以处理明文快照
    KeysReady,
}

/// 由单一调用方持有的混合加密会话
#[derive(Debug)]
pub struct HybridSession {
    id: Uuid,
    mode: CipherMode,
    symmetric_key_bits: usize,
    assembler: PayloadAssembler,
    slots: KeySlots,
    wrapped_key: Option<WrappedKey>,
    wrap_count: u64,
    version: u64,
    pending: Option<Plaintext>,
    latest: Option<Arc<EncryptedPayload>>,
}

impl HybridSession {
    /// 创建一个处于 `KeysPending` 的会话，不获取任何密钥
    pub fn new(config: &LinkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            mode: config.crypto.cipher_mode,
            symmetric_key_bits: config.crypto.symmetric_key_bits,
            assembler: PayloadAssembler::new(&config.link),
            slots: KeySlots::new(),
            wrapped_key: None,
            wrap_count: 0,
            version: 0,
            pending: None,
            latest: None,
        })
    }

    /// 创建会话并按配置获取两把密钥
    ///
    /// 任何解码或密钥获取错误都会直接返回，配置错误不会自行恢复，因此不重试。
    pub fn start(config: &LinkConfig) -> Result<Self> {
        let mut session = Self::new(config)?;
        let public_key = KeyProvider::acquire_public_key(&config.crypto.key_source)?;
        let symmetric_key =
            KeyProvider::generate_symmetric_key(session.mode, session.symmetric_key_bits)?;
        session.install_public_key(public_key)?;
        session.install_symmetric_key(symmetric_key)?;
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> CipherMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        if self.slots.is_ready() && self.wrapped_key.is_some() {
            SessionState::KeysReady
        } else {
            SessionState::KeysPending
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.slots.readiness()
    }

    pub fn wrapped_key(&self) -> Option<&WrappedKey> {
        self.wrapped_key.as_ref()
    }

    /// 已执行的包装次数
    pub fn wrap_count(&self) -> u64 {
        self.wrap_count
    }

    pub fn symmetric_key(&self) -> Option<&Arc<SymmetricKey>> {
        self.slots.symmetric_key()
    }

    pub fn latest_payload(&self) -> Option<&Arc<EncryptedPayload>> {
        self.latest.as_ref()
    }

    pub fn latest_url(&self) -> Option<&str> {
        self.latest.as_deref().map(|payload| payload.url.as_str())
    }

    /// 放入公钥；替换已有公钥会触发重新包装
    pub fn install_public_key(&mut self, key: AsymmetricPublicKey) -> Result<SessionState> {
        let pair = self.slots.set_public_key(Arc::new(key));
        self.on_keys_changed(pair)
    }

    /// 放入会话密钥；其模式必须与会话一致
    pub fn install_symmetric_key(&mut self, key: SymmetricKey) -> Result<SessionState> {
        if key.mode() != self.mode {
            return Err(Error::KeyImport(format!(
                "session uses {}, got a {} key",
                self.mode,
                key.mode()
            )));
        }
        let pair = self.slots.set_symmetric_key(Arc::new(key));
        self.on_keys_changed(pair)
    }

    fn on_keys_changed(&mut self, pair: Option<ReadyPair>) -> Result<SessionState> {
        let Some(pair) = pair else {
            debug!(session = %self.id, readiness = ?self.slots.readiness(), "keys pending");
            return Ok(self.state());
        };

        self.wrapped_key = None;
        let wrapped = KeyWrapper::wrap_ready(&pair.symmetric_key, &pair.public_key)?;
        self.wrap_count += 1;
        info!(
            session = %self.id,
            generation = pair.generation,
            wrapped_len = wrapped.as_bytes().len(),
            "session key wrapped, keys ready"
        );
        self.wrapped_key = Some(wrapped);

        if let Some(plaintext) = self.pending.take() {
            debug!(session = %self.id, "processing snapshot deferred while keys were pending");
            // 密钥已经安装并包装；快照失败只影响该快照本身
            if let Err(e) = self.encrypt_and_assemble(&plaintext) {
                warn!(session = %self.id, error = %e, "deferred snapshot failed");
            }
        }
        Ok(self.state())
    }

    /// 新的明文快照到达
    ///
    /// 密钥未就绪时返回 `Ok(None)` 并暂存快照；加密失败只影响本次调用，
    /// 会话保持可用，调用方可以在下一个快照时重试。
    pub fn on_plaintext_changed(
        &mut self,
        plaintext: impl Into<Plaintext>,
    ) -> Result<Option<Arc<EncryptedPayload>>> {
        let plaintext = plaintext.into();
        if self.state() == SessionState::KeysPending {
            debug!(session = %self.id, len = plaintext.as_bytes().len(), "deferring snapshot");
            self.pending = Some(plaintext);
            return Ok(None);
        }
        self.encrypt_and_assemble(&plaintext).map(Some)
    }

    fn encrypt_and_assemble(&mut self, plaintext: &Plaintext) -> Result<Arc<EncryptedPayload>> {
        let (Some(symmetric_key), Some(wrapped_key)) =
            (self.slots.symmetric_key(), self.wrapped_key.as_ref())
        else {
            return Err(Error::Encryption("session keys are not ready".to_string()));
        };

        let version = self.version + 1;
        let result = Encryptor::encrypt(plaintext.as_bytes(), symmetric_key, self.mode)?;
        let payload = Arc::new(self.assembler.assemble(&result, wrapped_key, version)?);
        debug!(
            session = %self.id,
            version,
            ciphertext_len = result.ciphertext.len(),
            "payload assembled"
        );
        self.version = version;
        self.latest = Some(Arc::clone(&payload));
        Ok(payload)
    }

    /// 更换基础地址并重新组装最新链接，不重新加密
    pub fn rebase(
        &mut self,
        base_url: impl Into<String>,
    ) -> Result<Option<Arc<EncryptedPayload>>> {
        let assembler = self.assembler.with_base_url(base_url)?;
        let rebased = match &self.latest {
            Some(payload) => Some(Arc::new(assembler.reassemble(payload)?)),
            None => None,
        };
        self.assembler = assembler;
        if rebased.is_some() {
            self.latest = rebased.clone();
        }
        Ok(rebased)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::KeySource;
    use crate::keys::HashAlgorithm;

    fn config(mode: CipherMode) -> LinkConfig {
        let mut config = LinkConfig::default();
        config.crypto.cipher_mode = mode;
        config.crypto.key_source = KeySource::Generate {
            modulus_bits: 1024,
            public_exponent: 65537,
        };
        config
    }

    fn public_key() -> AsymmetricPublicKey {
        KeyProvider::generate_asymmetric_key_pair(1024, 65537, HashAlgorithm::Sha256)
            .unwrap()
            .0
    }

    #[test]
    fn test_pending_until_both_keys_then_single_wrap() {
        let mut session = HybridSession::new(&config(CipherMode::AesCbc)).unwrap();
        assert_eq!(session.state(), SessionState::KeysPending);

        let session_key = KeyProvider::generate_symmetric_key(CipherMode::AesCbc, 256).unwrap();
        let state = session.install_symmetric_key(session_key).unwrap();
        assert_eq!(state, SessionState::KeysPending);
        assert!(session.wrapped_key().is_none());
        assert_eq!(session.wrap_count(), 0);

        let state = session.install_public_key(public_key()).unwrap();
        assert_eq!(state, SessionState::KeysReady);
        assert!(session.wrapped_key().is_some());
        assert_eq!(session.wrap_count(), 1);
    }

    #[test]
    fn test_snapshot_before_ready_is_deferred() {
        let mut session = HybridSession::new(&config(CipherMode::AesGcm)).unwrap();
        assert!(session.on_plaintext_changed("first").unwrap().is_none());
        assert!(session.on_plaintext_changed("second").unwrap().is_none());

        let session_key = KeyProvider::generate_symmetric_key(CipherMode::AesGcm, 256).unwrap();
        session.install_public_key(public_key()).unwrap();
        session.install_symmetric_key(session_key).unwrap();

        let payload = session.latest_payload().unwrap();
        assert_eq!(payload.version, 1);
        let key = session.symmetric_key().unwrap();
        let result = crate::encryptor::EncryptionResult {
            ciphertext: crate::Base64Codec::decode(&payload.ciphertext_base64).unwrap(),
            iv: crate::Base64Codec::decode(&payload.iv_base64).unwrap(),
        };
        let decrypted = Encryptor::decrypt(&result, key, CipherMode::AesGcm).unwrap();
        assert_eq!(decrypted, b"second");
    }

    #[test]
    fn test_failed_deferred_snapshot_does_not_fail_key_install() {
        let mut session = HybridSession::new(&config(CipherMode::AesCbc)).unwrap();
        let session_key = KeyProvider::generate_symmetric_key(CipherMode::AesCbc, 256).unwrap();
        session.install_symmetric_key(session_key).unwrap();
        assert!(session.on_plaintext_changed("deferred").unwrap().is_none());

        // 会话模式与已安装的会话密钥不一致，暂存快照的加密必然失败
        session.mode = CipherMode::AesGcm;
        let state = session.install_public_key(public_key()).unwrap();
        assert_eq!(state, SessionState::KeysReady);
        assert_eq!(session.wrap_count(), 1);
        assert!(session.latest_payload().is_none());

        session.mode = CipherMode::AesCbc;
        let payload = session.on_plaintext_changed("next").unwrap().unwrap();
        assert_eq!(payload.version, 1);
    }

    #[test]
    fn test_mode_mismatch_rejected() {
        let mut session = HybridSession::new(&config(CipherMode::AesCbc)).unwrap();
        let gcm_key = KeyProvider::generate_symmetric_key(CipherMode::AesGcm, 256).unwrap();
        let result = session.install_symmetric_key(gcm_key);
        assert!(matches!(result, Err(Error::KeyImport(_))));
        assert_eq!(session.readiness(), Readiness::default());
    }

    #[test]
    fn test_each_snapshot_produces_new_payload_with_same_wrapped_key() {
        let mut session = HybridSession::start(&config(CipherMode::AesCbc)).unwrap();
        let first = session.on_plaintext_changed("same").unwrap().unwrap();
        let second = session.on_plaintext_changed("same").unwrap().unwrap();

        assert_eq!(first.wrapped_key_base64, second.wrapped_key_base64);
        assert_ne!(first.iv_base64, second.iv_base64);
        assert_eq!(second.version, first.version + 1);
        assert_eq!(session.wrap_count(), 1);
        assert_eq!(session.latest_url(), Some(second.url.as_str()));
    }

    #[test]
    fn test_rebase_keeps_ciphertext() {
        let mut session = HybridSession::start(&config(CipherMode::AesCbc)).unwrap();
        assert!(session.rebase("https://other.test").unwrap().is_none());

        let original = session.on_plaintext_changed("data").unwrap().unwrap();
        assert!(original.url.starts_with("https://other.test/offer/new?data="));

        let rebased = session.rebase("https://example.test").unwrap().unwrap();
        assert!(rebased.url.starts_with("https://example.test/offer/new?data="));
        assert_eq!(rebased.ciphertext_base64, original.ciphertext_base64);
        assert_eq!(session.latest_url(), Some(rebased.url.as_str()));

        assert!(matches!(session.rebase("relative"), Err(Error::InvalidUrl(_))));
    }
}

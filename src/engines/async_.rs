//! 异步会话引擎
//!
//! 密钥导入、密钥生成、包装与加密都作为可按任意顺序完成的异步任务执行。
//! 多个明文快照的加密可能同时在途：每个快照在开始时领取一个递增版本号，
//! 只有最新开始的那次加密可以发布结果，迟到的旧结果会被丢弃。
//! 密钥材料在就绪后只读共享，不需要加锁；只有"最新版本"指针与已发布的
//! 载荷需要串行化。

use crate::common::config::LinkConfig;
use crate::common::errors::{Error, Result};
use crate::encryptor::Encryptor;
use crate::keys::{AsymmetricPublicKey, SymmetricKey};
use crate::payload::{EncryptedPayload, PayloadAssembler};
use crate::provider::{KeyProvider, KeySlots, ReadyPair, Readiness};
use crate::session::SessionState;
use crate::snapshot::Plaintext;
use crate::symmetric::CipherMode;
use crate::wrapper::{KeyWrapper, WrappedKey};
use arc_swap::{ArcSwap, ArcSwapOption};
use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 链接的消费者（例如显示层）
///
/// 会话保证按版本递增的顺序调用 `publish`。
#[async_trait]
pub trait LinkSink: Send + Sync {
    async fn publish(&self, payload: Arc<EncryptedPayload>);
}

/// 基于 `tokio::sync::watch` 的消费者，始终持有最新链接
#[derive(Debug)]
pub struct WatchSink {
    sender: watch::Sender<Option<Arc<EncryptedPayload>>>,
}

impl WatchSink {
    pub fn channel() -> (Self, watch::Receiver<Option<Arc<EncryptedPayload>>>) {
        let (sender, receiver) = watch::channel(None);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl LinkSink for WatchSink {
    async fn publish(&self, payload: Arc<EncryptedPayload>) {
        self.sender.send_replace(Some(payload));
    }
}

/// 一次快照处理的结果
#[derive(Debug, Clone)]
pub enum Publication {
    /// 结果已成为最新链接
    Published(Arc<EncryptedPayload>),
    /// 密钥尚未就绪，快照已暂存，就绪后处理
    Deferred { version: u64 },
    /// 在本次加密完成前已有更新的快照开始，结果被丢弃
    Stale { version: u64 },
}

impl Publication {
    pub fn payload(&self) -> Option<&Arc<EncryptedPayload>> {
        match self {
            Publication::Published(payload) => Some(payload),
            _ => None,
        }
    }
}

/// 已包装好的一组只读密钥材料
#[derive(Debug)]
struct ReadyKeys {
    symmetric_key: Arc<SymmetricKey>,
    wrapped_key: WrappedKey,
    generation: u64,
}

struct Shared {
    id: Uuid,
    mode: CipherMode,
    symmetric_key_bits: usize,
    assembler: ArcSwap<PayloadAssembler>,
    slots: Mutex<KeySlots>,
    ready: ArcSwapOption<ReadyKeys>,
    wrap_count: AtomicU64,
    started: AtomicU64,
    pending: Mutex<Option<(u64, Plaintext)>>,
    published: AsyncMutex<Option<Arc<EncryptedPayload>>>,
    sink: Option<Arc<dyn LinkSink>>,
}

/// `AsyncHybridSession`：可在多个任务间克隆共享的异步会话句柄
#[derive(Clone)]
pub struct AsyncHybridSession {
    shared: Arc<Shared>,
}

impl AsyncHybridSession {
    /// 创建一个处于 `KeysPending` 的会话
    pub fn new(config: &LinkConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// 创建会话并注册链接消费者
    pub fn with_sink(config: &LinkConfig, sink: Arc<dyn LinkSink>) -> Result<Self> {
        Self::build(config, Some(sink))
    }

    fn build(config: &LinkConfig, sink: Option<Arc<dyn LinkSink>>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                mode: config.crypto.cipher_mode,
                symmetric_key_bits: config.crypto.symmetric_key_bits,
                assembler: ArcSwap::from_pointee(PayloadAssembler::new(&config.link)),
                slots: Mutex::new(KeySlots::new()),
                ready: ArcSwapOption::empty(),
                wrap_count: AtomicU64::new(0),
                started: AtomicU64::new(0),
                pending: Mutex::new(None),
                published: AsyncMutex::new(None),
                sink,
            }),
        })
    }

    /// 并行获取两把密钥；先完成的一方只填充槽位，后完成的一方触发包装
    pub async fn start(config: &LinkConfig) -> Result<Self> {
        Self::start_with(Self::new(config)?, config).await
    }

    /// 与 `start` 相同，但会话带有链接消费者
    pub async fn start_with_sink(config: &LinkConfig, sink: Arc<dyn LinkSink>) -> Result<Self> {
        Self::start_with(Self::with_sink(config, sink)?, config).await
    }

    async fn start_with(session: Self, config: &LinkConfig) -> Result<Self> {
        let source = config.crypto.key_source.clone();
        let (mode, bits) = (session.shared.mode, session.shared.symmetric_key_bits);

        let public_task = async {
            let key = KeyProvider::acquire_public_key_async(source).await?;
            session.install_public_key(key).await
        };
        let symmetric_task = async {
            let key = KeyProvider::generate_symmetric_key_async(mode, bits).await?;
            session.install_symmetric_key(key).await
        };
        let (public_result, symmetric_result) = tokio::join!(public_task, symmetric_task);
        public_result?;
        symmetric_result?;
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn mode(&self) -> CipherMode {
        self.shared.mode
    }

    pub fn state(&self) -> SessionState {
        if self.shared.ready.load().is_some() {
            SessionState::KeysReady
        } else {
            SessionState::KeysPending
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.shared.slots.lock().readiness()
    }

    pub fn wrap_count(&self) -> u64 {
        self.shared.wrap_count.load(Ordering::SeqCst)
    }

    /// 当前已包装密钥所属的代次；每次替换任一密钥代次都会递增
    pub fn key_generation(&self) -> Option<u64> {
        self.shared.ready.load().as_ref().map(|keys| keys.generation)
    }

    pub fn wrapped_key(&self) -> Option<WrappedKey> {
        self.shared.ready.load().as_ref().map(|keys| keys.wrapped_key.clone())
    }

    pub fn symmetric_key(&self) -> Option<Arc<SymmetricKey>> {
        self.shared
            .ready
            .load()
            .as_ref()
            .map(|keys| Arc::clone(&keys.symmetric_key))
    }

    /// 当前最新的已发布载荷
    pub async fn latest_payload(&self) -> Option<Arc<EncryptedPayload>> {
        self.shared.published.lock().await.clone()
    }

    pub async fn install_public_key(&self, key: AsymmetricPublicKey) -> Result<SessionState> {
        let pair = self.shared.slots.lock().set_public_key(Arc::new(key));
        self.on_keys_changed(pair).await
    }

    pub async fn install_symmetric_key(&self, key: SymmetricKey) -> Result<SessionState> {
        if key.mode() != self.shared.mode {
            return Err(Error::KeyImport(format!(
                "session uses {}, got a {} key",
                self.shared.mode,
                key.mode()
            )));
        }
        let pair = self.shared.slots.lock().set_symmetric_key(Arc::new(key));
        self.on_keys_changed(pair).await
    }

    async fn on_keys_changed(&self, pair: Option<ReadyPair>) -> Result<SessionState> {
        let Some(pair) = pair else {
            debug!(session = %self.shared.id, readiness = ?self.readiness(), "keys pending");
            return Ok(self.state());
        };

        let generation = pair.generation;
        let symmetric_key = Arc::clone(&pair.symmetric_key);
        let wrapped_key = tokio::task::spawn_blocking(move || {
            KeyWrapper::wrap_ready(&pair.symmetric_key, &pair.public_key)
        })
        .await??;
        self.shared.wrap_count.fetch_add(1, Ordering::SeqCst);

        let deferred = {
            // 包装期间若有密钥被替换，本次结果作废，由替换方的包装接管
            let slots = self.shared.slots.lock();
            if slots.generation() != generation {
                debug!(session = %self.shared.id, generation, "discarding wrap of replaced keys");
                return Ok(self.state());
            }
            let mut pending = self.shared.pending.lock();
            self.shared.ready.store(Some(Arc::new(ReadyKeys {
                symmetric_key,
                wrapped_key,
                generation,
            })));
            pending.take()
        };
        info!(session = %self.shared.id, generation, "session key wrapped, keys ready");

        if let Some((version, plaintext)) = deferred {
            debug!(session = %self.shared.id, version, "processing deferred snapshot");
            // 密钥已经安装并包装；快照失败只影响该快照本身
            if let Err(e) = self.encrypt_and_publish(version, plaintext).await {
                warn!(session = %self.shared.id, version, error = %e, "deferred snapshot failed");
            }
        }
        Ok(self.state())
    }

    /// 新的明文快照到达
    pub async fn on_plaintext_changed(
        &self,
        plaintext: impl Into<Plaintext>,
    ) -> Result<Publication> {
        let plaintext = plaintext.into();

        // 版本号在 pending 锁内领取，暂存的快照因此总是最新开始的那个
        let version = {
            let pending = self.shared.pending.lock();
            let version = self.shared.started.fetch_add(1, Ordering::SeqCst) + 1;
            if self.shared.ready.load().is_none() {
                debug!(session = %self.shared.id, version, "keys pending, deferring snapshot");
                Self::defer(pending, version, plaintext);
                return Ok(Publication::Deferred { version });
            }
            version
        };
        self.encrypt_and_publish(version, plaintext).await
    }

    /// 暂存快照；已暂存的快照版本更新时保留原快照
    fn defer(
        mut pending: MutexGuard<'_, Option<(u64, Plaintext)>>,
        version: u64,
        plaintext: Plaintext,
    ) {
        if pending.as_ref().is_some_and(|(existing, _)| *existing > version) {
            return;
        }
        *pending = Some((version, plaintext));
    }

    async fn encrypt_and_publish(&self, version: u64, plaintext: Plaintext) -> Result<Publication> {
        let keys = self
            .shared
            .ready
            .load_full()
            .ok_or_else(|| Error::Encryption("session keys are not ready".to_string()))?;
        let assembler = self.shared.assembler.load_full();
        let mode = self.shared.mode;

        let payload = tokio::task::spawn_blocking(move || {
            let result = Encryptor::encrypt(plaintext.as_bytes(), &keys.symmetric_key, mode)?;
            assembler.assemble(&result, &keys.wrapped_key, version)
        })
        .await??;

        let mut published = self.shared.published.lock().await;
        let latest_started = self.shared.started.load(Ordering::SeqCst);
        let newer_published = published.as_ref().is_some_and(|p| p.version > version);
        if version != latest_started || newer_published {
            warn!(
                session = %self.shared.id,
                version,
                latest_started,
                "discarding stale encryption result"
            );
            return Ok(Publication::Stale { version });
        }

        let payload = Arc::new(payload);
        *published = Some(Arc::clone(&payload));
        if let Some(sink) = &self.shared.sink {
            sink.publish(Arc::clone(&payload)).await;
        }
        debug!(session = %self.shared.id, version, "payload published");
        Ok(Publication::Published(payload))
    }

    /// 更换基础地址并重新组装最新链接，不重新加密
    pub async fn rebase(
        &self,
        base_url: impl Into<String>,
    ) -> Result<Option<Arc<EncryptedPayload>>> {
        let assembler = Arc::new(self.shared.assembler.load().with_base_url(base_url)?);
        let mut published = self.shared.published.lock().await;
        self.shared.assembler.store(Arc::clone(&assembler));

        let Some(current) = published.as_ref() else {
            return Ok(None);
        };
        let rebased = Arc::new(assembler.reassemble(current)?);
        *published = Some(Arc::clone(&rebased));
        if let Some(sink) = &self.shared.sink {
            sink.publish(Arc::clone(&rebased)).await;
        }
        Ok(Some(rebased))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::KeySource;

    fn config() -> LinkConfig {
        let mut config = LinkConfig::default();
        config.crypto.cipher_mode = CipherMode::AesGcm;
        config.crypto.key_source = KeySource::Generate {
            modulus_bits: 1024,
            public_exponent: 65537,
        };
        config
    }

    #[tokio::test]
    async fn test_start_reaches_ready_with_single_wrap() {
        let session = AsyncHybridSession::start(&config()).await.unwrap();
        assert_eq!(session.state(), SessionState::KeysReady);
        assert_eq!(session.wrap_count(), 1);
        assert_eq!(session.key_generation(), Some(2));
        assert!(session.readiness().is_ready());
    }

    #[tokio::test]
    async fn test_snapshot_before_ready_is_deferred_then_published() {
        let session = AsyncHybridSession::new(&config()).unwrap();
        let outcome = session.on_plaintext_changed("early").await.unwrap();
        assert!(matches!(outcome, Publication::Deferred { version: 1 }));
        assert!(session.latest_payload().await.is_none());

        let key = KeyProvider::generate_symmetric_key(CipherMode::AesGcm, 256).unwrap();
        session.install_symmetric_key(key).await.unwrap();
        let public_key = KeyProvider::acquire_public_key(&config().crypto.key_source).unwrap();
        session.install_public_key(public_key).await.unwrap();

        let payload = session.latest_payload().await.unwrap();
        assert_eq!(payload.version, 1);
    }

    #[tokio::test]
    async fn test_older_snapshot_never_replaces_newer_deferred() {
        let session = AsyncHybridSession::new(&config()).unwrap();

        // 版本 1 与 2 都在密钥就绪前开始，但版本 1 晚一步到达暂存区
        session.shared.started.fetch_add(2, Ordering::SeqCst);
        AsyncHybridSession::defer(session.shared.pending.lock(), 2, Plaintext::from("newer"));
        AsyncHybridSession::defer(session.shared.pending.lock(), 1, Plaintext::from("older"));

        let key = KeyProvider::generate_symmetric_key(CipherMode::AesGcm, 256).unwrap();
        session.install_symmetric_key(key).await.unwrap();
        let public_key = KeyProvider::acquire_public_key(&config().crypto.key_source).unwrap();
        session.install_public_key(public_key).await.unwrap();

        let payload = session.latest_payload().await.unwrap();
        assert_eq!(payload.version, 2);
        let result = crate::encryptor::EncryptionResult {
            ciphertext: crate::Base64Codec::decode(&payload.ciphertext_base64).unwrap(),
            iv: crate::Base64Codec::decode(&payload.iv_base64).unwrap(),
        };
        let key = session.symmetric_key().unwrap();
        let decrypted = Encryptor::decrypt(&result, &key, CipherMode::AesGcm).unwrap();
        assert_eq!(decrypted, b"newer");
    }

    #[tokio::test]
    async fn test_deferred_snapshots_keep_latest_version() {
        let session = AsyncHybridSession::new(&config()).unwrap();
        for text in ["a", "b", "c"] {
            session.on_plaintext_changed(text).await.unwrap();
        }
        let deferred = session.shared.pending.lock().as_ref().map(|(version, _)| *version);
        assert_eq!(deferred, Some(3));
    }

    #[tokio::test]
    async fn test_stale_result_is_discarded() {
        let session = AsyncHybridSession::start(&config()).await.unwrap();

        // 先领取版本 1，随后版本 2 开始并发布；版本 1 的结果随后到达时必须被丢弃
        let stale_version = session.shared.started.fetch_add(1, Ordering::SeqCst) + 1;
        let fresh = session.on_plaintext_changed("newer").await.unwrap();
        let fresh = fresh.payload().cloned().unwrap();

        let late = session
            .encrypt_and_publish(stale_version, Plaintext::from("older"))
            .await
            .unwrap();
        assert!(matches!(late, Publication::Stale { version } if version == stale_version));
        assert_eq!(session.latest_payload().await.unwrap().version, fresh.version);
    }

    #[tokio::test]
    async fn test_watch_sink_receives_latest() {
        let (sink, mut receiver) = WatchSink::channel();
        let session = AsyncHybridSession::start_with_sink(&config(), Arc::new(sink))
            .await
            .unwrap();

        let published = session.on_plaintext_changed("hello").await.unwrap();
        receiver.changed().await.unwrap();
        let seen = receiver.borrow().clone().unwrap();
        assert_eq!(seen.url, published.payload().unwrap().url);
    }
}

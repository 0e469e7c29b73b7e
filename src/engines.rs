//! 会话引擎

#[cfg(feature = "async-engine")]
pub mod async_;

#[cfg(feature = "async-engine")]
pub use self::async_::{AsyncHybridSession, LinkSink, Publication, WatchSink};

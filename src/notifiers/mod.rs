// src/notifiers/mod.rs
use crate::error::NotifyError;
use async_trait::async_trait;

pub mod noop;
pub mod sms;

/// Best-effort outbound messages about position changes. Failures are
/// logged by the caller and never block trading.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, message: &[u8]) -> Result<(), NotifyError>;
}

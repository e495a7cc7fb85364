use super::Notifier;
use crate::error::NotifyError;
use async_trait::async_trait;

pub const NAME: &str = "noop";

/// Discards every message.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    fn name(&self) -> &str {
        NAME
    }

    async fn notify(&self, _message: &[u8]) -> Result<(), NotifyError> {
        Ok(())
    }
}

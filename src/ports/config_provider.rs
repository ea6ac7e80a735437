use async_trait::async_trait;
use eyre::Result;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

/// Trait for configuration providers that can load and watch for configuration
/// changes. Generic over the config type so the same provider serves both the
/// gateway and the diagnostics backend.
#[async_trait]
pub trait ConfigProvider<C: DeserializeOwned>: Send + Sync {
    /// Load the current configuration.
    async fn load_config(&self) -> Result<C>;

    /// Return a channel that signals when the configuration has changed.
    /// The receiver should trigger a reload by calling `load_config`.
    fn watch(&self) -> mpsc::Receiver<()>;
}

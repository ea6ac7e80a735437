use std::{
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;
use eyre::{Context, Result};
use notify::{RecursiveMode, Watcher};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use crate::{config::loader::load_config, ports::config_provider::ConfigProvider};

/// Loads configuration from a local file and signals when it changes on disk.
///
/// Editors and orchestrators rewrite config files in different ways (truncate,
/// rename-over, delete-and-recreate), so the watcher listens on the parent
/// directory and filters events down to the configured file name.
pub struct FileConfigProvider<C> {
    path: PathBuf,
    // Dropping the watcher stops event delivery, so it lives here.
    _watcher: notify::RecommendedWatcher,
    // Handed out once via `watch()`.
    changes: Mutex<Option<mpsc::Receiver<()>>>,
    _marker: PhantomData<C>,
}

impl<C: DeserializeOwned> FileConfigProvider<C> {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file_name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("config path {} has no file name", path.display()))?
            .to_owned();
        let (tx, rx) = mpsc::channel(1);

        let mut watcher = notify::recommended_watcher(
            move |event: Result<notify::Event, notify::Error>| match event {
                Ok(event) => {
                    let relevant = event.kind.is_modify()
                        || event.kind.is_create()
                        || event.kind.is_remove();
                    if relevant
                        && event
                            .paths
                            .iter()
                            .any(|p| p.file_name() == Some(file_name.as_os_str()))
                    {
                        tracing::debug!(kind = ?event.kind, "config file changed");
                        // A full channel already carries a pending reload.
                        let _ = tx.try_send(());
                    }
                }
                Err(e) => tracing::error!("config watch error: {e}"),
            },
        )?;

        watcher
            .watch(
                path.parent().unwrap_or_else(|| Path::new(".")),
                RecursiveMode::NonRecursive,
            )
            .wrap_err_with(|| format!("failed to watch directory of {}", path.display()))?;

        Ok(Self {
            path,
            _watcher: watcher,
            changes: Mutex::new(Some(rx)),
            _marker: PhantomData,
        })
    }
}

#[async_trait]
impl<C: DeserializeOwned + Send + Sync> ConfigProvider<C> for FileConfigProvider<C> {
    async fn load_config(&self) -> Result<C> {
        let path = self
            .path
            .to_str()
            .ok_or_else(|| eyre::eyre!("config path is not valid UTF-8"))?;
        load_config(path).await
    }

    fn watch(&self) -> mpsc::Receiver<()> {
        self.changes
            .lock()
            .expect("change receiver mutex poisoned")
            .take()
            .expect("watch() may only be called once")
    }
}

//! File-backed registry of channels approved for generation.
//!
//! The whole set is read once at startup and rewritten in full on every
//! addition (one channel id per line, newline-terminated). The store is an
//! explicitly owned value injected into the bot, so tests run against a
//! registry in a temp directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read channel registry {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write channel registry {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The set of channels allowed to trigger generation.
#[derive(Debug)]
pub struct ChannelRegistry {
    path: PathBuf,
    // Guards the read-modify-persist sequence in `add`; two racing opt-ins
    // must not rewrite the file with each other's id missing.
    inner: Mutex<HashSet<String>>,
}

impl ChannelRegistry {
    /// Read the registry file in full. A missing file starts an empty
    /// registry; any other read failure is returned to the caller (fatal
    /// at startup, the bot cannot know where it is allowed to post).
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref().to_path_buf();
        let channels: HashSet<String> = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(source) => return Err(RegistryError::Read { path, source }),
        };

        info!(path = %path.display(), channels = channels.len(), "channel registry loaded");
        Ok(Self {
            path,
            inner: Mutex::new(channels),
        })
    }

    pub async fn contains(&self, channel_id: &str) -> bool {
        self.inner.lock().await.contains(channel_id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Register a channel and rewrite the backing file. Returns `false`
    /// without touching the file when the channel was already present.
    ///
    /// On a write failure the in-memory set keeps the new id; registration
    /// stays effective for the life of the process and the next successful
    /// write persists it.
    pub async fn add(&self, channel_id: &str) -> Result<bool, RegistryError> {
        let mut channels = self.inner.lock().await;
        if !channels.insert(channel_id.to_string()) {
            return Ok(false);
        }

        let mut contents = String::new();
        for id in channels.iter() {
            contents.push_str(id);
            contents.push('\n');
        }
        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|source| RegistryError::Write {
                path: self.path.clone(),
                source,
            })?;

        info!(channel = channel_id, total = channels.len(), "channel registered");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("channel_ids.txt")
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ChannelRegistry::load(registry_path(&dir)).await.unwrap();
        assert!(registry.is_empty().await);
        assert!(!registry.contains("123").await);
    }

    #[tokio::test]
    async fn add_then_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = registry_path(&dir);

        let registry = ChannelRegistry::load(&path).await.unwrap();
        assert!(registry.add("123").await.unwrap());

        let reloaded = ChannelRegistry::load(&path).await.unwrap();
        assert!(reloaded.contains("123").await);
        assert_eq!(reloaded.len().await, 1);
    }

    #[tokio::test]
    async fn file_holds_one_id_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = registry_path(&dir);

        let registry = ChannelRegistry::load(&path).await.unwrap();
        registry.add("a").await.unwrap();
        registry.add("b").await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let mut lines: Vec<&str> = contents.lines().collect();
        lines.sort_unstable();
        assert_eq!(lines, vec!["a", "b"]);
        assert!(contents.ends_with('\n'));
    }

    #[tokio::test]
    async fn double_add_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ChannelRegistry::load(registry_path(&dir)).await.unwrap();
        assert!(registry.add("123").await.unwrap());
        assert!(!registry.add("123").await.unwrap());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn racing_adds_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = registry_path(&dir);
        let registry = std::sync::Arc::new(ChannelRegistry::load(&path).await.unwrap());

        let mut tasks = Vec::new();
        for i in 0..8 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(
                async move { registry.add(&format!("chan-{i}")).await },
            ));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let reloaded = ChannelRegistry::load(&path).await.unwrap();
        assert_eq!(reloaded.len().await, 8);
        for i in 0..8 {
            assert!(reloaded.contains(&format!("chan-{i}")).await);
        }
    }

    #[tokio::test]
    async fn unreadable_path_is_an_error() {
        // A directory in place of the file fails the read without being
        // NotFound.
        let dir = tempfile::tempdir().unwrap();
        let err = ChannelRegistry::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, RegistryError::Read { .. }));
    }
}

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::api::middleware::AppError;
use crate::models::ConnectionDescriptor;

/// Top-level shape of the connection store document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConnectionsFile {
    #[serde(default)]
    connections: Vec<StoredDescriptor>,
}

/// A store entry before id validation. Entries that fail to carry a usable
/// id are skipped at load time instead of poisoning the whole document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredDescriptor {
    Valid(ConnectionDescriptor),
    Unreadable(serde_json::Value),
}

/// Durable store plus in-memory index of connection descriptors.
///
/// Mutations are serialized behind the write lock and persisted as a full
/// snapshot (write to a temp file, then rename over the store). The
/// in-memory index is only updated after the snapshot write succeeds, so a
/// failed write leaves both sides unchanged.
pub struct ConnectionRegistry {
    path: PathBuf,
    connections: RwLock<HashMap<String, ConnectionDescriptor>>,
}

impl ConnectionRegistry {
    /// Load the registry from the backing document. A malformed document
    /// degrades to an empty registry rather than failing startup.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut connections = HashMap::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<ConnectionsFile>(&contents) {
                Ok(file) => {
                    for entry in file.connections {
                        match entry {
                            StoredDescriptor::Valid(d) if !d.connection_id.is_empty() => {
                                connections.insert(d.connection_id.clone(), d);
                            }
                            StoredDescriptor::Valid(_) => {
                                warn!("Skipping connection with empty connection_id");
                            }
                            StoredDescriptor::Unreadable(v) => {
                                warn!("Skipping unreadable connection entry: {}", v);
                            }
                        }
                    }
                    info!(
                        "Loaded {} connections from {}",
                        connections.len(),
                        path.display()
                    );
                }
                Err(e) => {
                    error!(
                        "Error parsing connections file {}: {}; starting with an empty registry",
                        path.display(),
                        e
                    );
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Connections file not found: {}", path.display());
            }
            Err(e) => {
                error!(
                    "Error reading connections file {}: {}; starting with an empty registry",
                    path.display(),
                    e
                );
            }
        }

        Self {
            path,
            connections: RwLock::new(connections),
        }
    }

    pub async fn list(&self) -> Vec<ConnectionDescriptor> {
        let map = self.connections.read().await;
        let mut all: Vec<_> = map.values().cloned().collect();
        all.sort_by(|a, b| a.connection_id.cmp(&b.connection_id));
        all
    }

    pub async fn get(&self, connection_id: &str) -> Option<ConnectionDescriptor> {
        self.connections.read().await.get(connection_id).cloned()
    }

    pub async fn add(&self, descriptor: ConnectionDescriptor) -> Result<(), AppError> {
        let mut map = self.connections.write().await;
        if map.contains_key(&descriptor.connection_id) {
            return Err(AppError::AlreadyExists(format!(
                "Connection {} already exists",
                descriptor.connection_id
            )));
        }

        let mut next = map.clone();
        next.insert(descriptor.connection_id.clone(), descriptor);
        self.persist(&next).await?;
        *map = next;
        Ok(())
    }

    pub async fn update(&self, descriptor: ConnectionDescriptor) -> Result<(), AppError> {
        let mut map = self.connections.write().await;
        if !map.contains_key(&descriptor.connection_id) {
            return Err(AppError::NotFound(format!(
                "Connection {} not found",
                descriptor.connection_id
            )));
        }

        let mut next = map.clone();
        next.insert(descriptor.connection_id.clone(), descriptor);
        self.persist(&next).await?;
        *map = next;
        Ok(())
    }

    pub async fn delete(&self, connection_id: &str) -> Result<(), AppError> {
        let mut map = self.connections.write().await;
        if !map.contains_key(connection_id) {
            return Err(AppError::NotFound(format!(
                "Connection {} not found",
                connection_id
            )));
        }

        let mut next = map.clone();
        next.remove(connection_id);
        self.persist(&next).await?;
        *map = next;
        Ok(())
    }

    /// Write-replace the whole store document from the given snapshot.
    /// Called with the write lock held so concurrent mutations never
    /// interleave partial writes.
    async fn persist(&self, snapshot: &HashMap<String, ConnectionDescriptor>) -> Result<(), AppError> {
        let mut all: Vec<_> = snapshot.values().cloned().collect();
        all.sort_by(|a, b| a.connection_id.cmp(&b.connection_id));

        let file = ConnectionsFile {
            connections: all.into_iter().map(StoredDescriptor::Valid).collect(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| AppError::Persistence(format!("Failed to serialize connections: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json.as_bytes())
            .await
            .map_err(|e| {
                AppError::Persistence(format!("Failed to write {}: {}", tmp.display(), e))
            })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            AppError::Persistence(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EngineKind;
    use pretty_assertions::assert_eq;

    fn descriptor(id: &str) -> ConnectionDescriptor {
        ConnectionDescriptor::new(
            id.to_string(),
            EngineKind::Sqlite,
            format!("sqlite:{}.db", id),
        )
    }

    async fn registry_in(dir: &tempfile::TempDir) -> ConnectionRegistry {
        ConnectionRegistry::load(dir.path().join("connections.json")).await
    }

    #[tokio::test]
    async fn add_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir).await;

        let d = descriptor("sales");
        registry.add(d.clone()).await.unwrap();
        assert_eq!(registry.get("sales").await, Some(d));
    }

    #[tokio::test]
    async fn duplicate_add_fails_and_leaves_registry_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir).await;

        let original = descriptor("sales");
        registry.add(original.clone()).await.unwrap();

        let mut dup = descriptor("sales");
        dup.connection_name = Some("other".to_string());
        assert!(matches!(
            registry.add(dup).await,
            Err(AppError::AlreadyExists(_))
        ));
        assert_eq!(registry.get("sales").await, Some(original));
        assert_eq!(registry.list().await.len(), 1);
    }

    #[tokio::test]
    async fn update_missing_id_fails_without_changing_store() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir).await;
        registry.add(descriptor("sales")).await.unwrap();

        assert!(matches!(
            registry.update(descriptor("ghost")).await,
            Err(AppError::NotFound(_))
        ));

        // Reload from disk: only the original descriptor was persisted.
        let reloaded = registry_in(&dir).await;
        assert_eq!(reloaded.list().await.len(), 1);
        assert!(reloaded.get("sales").await.is_some());
    }

    #[tokio::test]
    async fn delete_then_get_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir).await;
        registry.add(descriptor("sales")).await.unwrap();

        registry.delete("sales").await.unwrap();
        assert_eq!(registry.get("sales").await, None);
        assert!(matches!(
            registry.delete("sales").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn reload_reproduces_persisted_descriptors() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir).await;
        registry.add(descriptor("a")).await.unwrap();
        registry.add(descriptor("b")).await.unwrap();
        registry.update(descriptor("a")).await.unwrap();
        registry.delete("b").await.unwrap();

        let before = registry.list().await;
        let reloaded = registry_in(&dir).await;
        assert_eq!(reloaded.list().await, before);
    }

    #[tokio::test]
    async fn malformed_document_degrades_to_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connections.json");
        std::fs::write(&path, "{ not json").unwrap();

        let registry = ConnectionRegistry::load(&path).await;
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn entries_without_id_are_skipped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connections.json");
        std::fs::write(
            &path,
            r#"{
                "connections": [
                    {
                        "connection_id": "",
                        "database_type": "sqlite",
                        "connection_string": "sqlite:a.db"
                    },
                    { "database_type": "sqlite" },
                    {
                        "connection_id": "kept",
                        "database_type": "sqlite",
                        "connection_string": "sqlite:b.db"
                    }
                ]
            }"#,
        )
        .unwrap();

        let registry = ConnectionRegistry::load(&path).await;
        let all = registry.list().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].connection_id, "kept");
    }
}

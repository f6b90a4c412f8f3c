//! Tool catalog owned by a single actor task.
//!
//! Registration and enable/disable requests are serialized through one
//! channel; readers take an immutable [`ToolSnapshot`] per execution.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::id::ToolId;
use super::schema::{ToolEntry, ToolError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate tool: {0}")]
    Duplicate(ToolId),
    #[error("tool not registered: {0}")]
    NotRegistered(ToolId),
    #[error("tool catalog stopped")]
    Stopped,
}

/// Point-in-time view of the catalog.
#[derive(Debug, Clone, Default)]
pub struct ToolSnapshot {
    entries: BTreeMap<ToolId, Arc<ToolEntry>>,
    disabled: BTreeSet<ToolId>,
}

impl ToolSnapshot {
    /// Resolve a plan's tool name to an enabled entry.
    pub fn lookup(&self, name: &str) -> Result<&Arc<ToolEntry>, ToolError> {
        let id: ToolId = name
            .parse()
            .map_err(|_| ToolError::UnknownTool(name.to_string()))?;
        let entry = self
            .entries
            .get(&id)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        if self.disabled.contains(&id) {
            return Err(ToolError::Disabled(name.to_string()));
        }
        Ok(entry)
    }

    pub fn get(&self, id: ToolId) -> Option<&Arc<ToolEntry>> {
        self.entries.get(&id)
    }

    pub fn is_enabled(&self, id: ToolId) -> bool {
        self.entries.contains_key(&id) && !self.disabled.contains(&id)
    }

    /// Enabled tool ids in stable order.
    pub fn enabled_ids(&self) -> Vec<ToolId> {
        self.entries
            .keys()
            .copied()
            .filter(|id| !self.disabled.contains(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

enum CatalogCommand {
    Register {
        entry: ToolEntry,
        reply: oneshot::Sender<Result<(), CatalogError>>,
    },
    SetEnabled {
        id: ToolId,
        enabled: bool,
        reply: oneshot::Sender<Result<(), CatalogError>>,
    },
    Snapshot {
        reply: oneshot::Sender<ToolSnapshot>,
    },
}

struct CatalogActor {
    rx: mpsc::UnboundedReceiver<CatalogCommand>,
    snapshot: ToolSnapshot,
}

impl CatalogActor {
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                CatalogCommand::Register { entry, reply } => {
                    let _ = reply.send(self.register(entry));
                }
                CatalogCommand::SetEnabled { id, enabled, reply } => {
                    let _ = reply.send(self.set_enabled(id, enabled));
                }
                CatalogCommand::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot.clone());
                }
            }
        }
    }

    fn register(&mut self, entry: ToolEntry) -> Result<(), CatalogError> {
        if self.snapshot.entries.contains_key(&entry.id) {
            return Err(CatalogError::Duplicate(entry.id));
        }
        tracing::debug!("registered tool {}", entry.id);
        self.snapshot.entries.insert(entry.id, Arc::new(entry));
        Ok(())
    }

    fn set_enabled(&mut self, id: ToolId, enabled: bool) -> Result<(), CatalogError> {
        if !self.snapshot.entries.contains_key(&id) {
            return Err(CatalogError::NotRegistered(id));
        }
        if enabled {
            self.snapshot.disabled.remove(&id);
        } else {
            self.snapshot.disabled.insert(id);
        }
        tracing::info!("tool {} enabled={}", id, enabled);
        Ok(())
    }
}

/// Cloneable handle to the catalog actor.
///
/// Must be created inside a tokio runtime; the actor stops once every handle
/// is dropped.
#[derive(Clone)]
pub struct ToolCatalog {
    tx: mpsc::UnboundedSender<CatalogCommand>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = CatalogActor {
            rx,
            snapshot: ToolSnapshot::default(),
        };
        tokio::spawn(async move {
            actor.run().await;
        });
        Self { tx }
    }

    pub async fn register(&self, entry: ToolEntry) -> Result<(), CatalogError> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(CatalogCommand::Register { entry, reply })
            .map_err(|_| CatalogError::Stopped)?;
        reply_rx.await.map_err(|_| CatalogError::Stopped)?
    }

    pub async fn set_enabled(&self, id: ToolId, enabled: bool) -> Result<(), CatalogError> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(CatalogCommand::SetEnabled { id, enabled, reply })
            .map_err(|_| CatalogError::Stopped)?;
        reply_rx.await.map_err(|_| CatalogError::Stopped)?
    }

    pub async fn snapshot(&self) -> Result<ToolSnapshot, CatalogError> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(CatalogCommand::Snapshot { reply })
            .map_err(|_| CatalogError::Stopped)?;
        reply_rx.await.map_err(|_| CatalogError::Stopped)
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::tool_fn;

    fn entry(id: ToolId) -> ToolEntry {
        ToolEntry::new(id, tool_fn(|_args| async { Ok("ok".to_string()) }))
    }

    #[tokio::test]
    async fn empty_catalog() {
        let catalog = ToolCatalog::new();
        let snapshot = catalog.snapshot().await.unwrap();
        assert!(snapshot.is_empty());
        assert!(snapshot.enabled_ids().is_empty());
        assert!(matches!(
            snapshot.lookup("send_sms"),
            Err(ToolError::UnknownTool(_))
        ));
    }

    #[tokio::test]
    async fn register_and_lookup() {
        let catalog = ToolCatalog::new();
        catalog.register(entry(ToolId::SendSms)).await.unwrap();

        let snapshot = catalog.snapshot().await.unwrap();
        let found = snapshot.lookup("send_sms").unwrap();
        assert_eq!(found.id, ToolId::SendSms);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let catalog = ToolCatalog::new();
        catalog.register(entry(ToolId::CreateNote)).await.unwrap();
        let err = catalog.register(entry(ToolId::CreateNote)).await.unwrap_err();
        assert_eq!(err, CatalogError::Duplicate(ToolId::CreateNote));
    }

    #[tokio::test]
    async fn unknown_name_is_a_typed_error() {
        let catalog = ToolCatalog::new();
        catalog.register(entry(ToolId::CreateNote)).await.unwrap();
        let snapshot = catalog.snapshot().await.unwrap();
        assert_eq!(
            snapshot.lookup("launch_rocket").unwrap_err(),
            ToolError::UnknownTool("launch_rocket".to_string())
        );
    }

    #[tokio::test]
    async fn disabled_tool_is_excluded_until_reenabled() {
        let catalog = ToolCatalog::new();
        catalog.register(entry(ToolId::SendSms)).await.unwrap();
        catalog.register(entry(ToolId::CreateNote)).await.unwrap();
        catalog.set_enabled(ToolId::SendSms, false).await.unwrap();

        let snapshot = catalog.snapshot().await.unwrap();
        assert_eq!(snapshot.enabled_ids(), vec![ToolId::CreateNote]);
        assert_eq!(
            snapshot.lookup("send_sms").unwrap_err(),
            ToolError::Disabled("send_sms".to_string())
        );

        catalog.set_enabled(ToolId::SendSms, true).await.unwrap();
        let snapshot = catalog.snapshot().await.unwrap();
        assert!(snapshot.is_enabled(ToolId::SendSms));
    }

    #[tokio::test]
    async fn snapshot_is_isolated_from_later_changes() {
        let catalog = ToolCatalog::new();
        catalog.register(entry(ToolId::SendSms)).await.unwrap();
        let before = catalog.snapshot().await.unwrap();
        catalog.set_enabled(ToolId::SendSms, false).await.unwrap();

        assert!(before.is_enabled(ToolId::SendSms));
    }

    #[tokio::test]
    async fn toggling_unregistered_tool_fails() {
        let catalog = ToolCatalog::new();
        let err = catalog.set_enabled(ToolId::OpenNote, false).await.unwrap_err();
        assert_eq!(err, CatalogError::NotRegistered(ToolId::OpenNote));
    }

    #[tokio::test]
    async fn concurrent_registrations_all_land() {
        let catalog = ToolCatalog::new();
        let mut handles = Vec::new();
        for id in ToolId::ALL {
            let catalog = catalog.clone();
            handles.push(tokio::spawn(async move { catalog.register(entry(id)).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let snapshot = catalog.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), ToolId::ALL.len());
    }
}

//! Bounded in-memory archive of finished runs, owned by one actor task.

use std::collections::VecDeque;

use tokio::sync::{mpsc, oneshot};

use crate::error::{CoreError, CoreResult};

use super::record::RunRecord;

enum HistoryCommand {
    Push {
        record: Box<RunRecord>,
        reply: oneshot::Sender<()>,
    },
    Recent {
        limit: usize,
        reply: oneshot::Sender<Vec<RunRecord>>,
    },
    Get {
        id: String,
        reply: oneshot::Sender<Option<RunRecord>>,
    },
    Len {
        reply: oneshot::Sender<usize>,
    },
}

struct HistoryActor {
    rx: mpsc::UnboundedReceiver<HistoryCommand>,
    records: VecDeque<RunRecord>,
    capacity: usize,
}

impl HistoryActor {
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                HistoryCommand::Push { record, reply } => {
                    if self.records.len() == self.capacity {
                        if let Some(evicted) = self.records.pop_front() {
                            tracing::debug!("evicted run {} from history", evicted.id);
                        }
                    }
                    self.records.push_back(*record);
                    let _ = reply.send(());
                }
                HistoryCommand::Recent { limit, reply } => {
                    let recent = self.records.iter().rev().take(limit).cloned().collect();
                    let _ = reply.send(recent);
                }
                HistoryCommand::Get { id, reply } => {
                    let found = self.records.iter().find(|record| record.id == id).cloned();
                    let _ = reply.send(found);
                }
                HistoryCommand::Len { reply } => {
                    let _ = reply.send(self.records.len());
                }
            }
        }
    }
}

/// Handle to the run history. Oldest records are evicted first once
/// `capacity` is reached.
#[derive(Clone)]
pub struct RunHistory {
    tx: mpsc::UnboundedSender<HistoryCommand>,
}

impl RunHistory {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = HistoryActor {
            rx,
            records: VecDeque::new(),
            capacity: capacity.max(1),
        };
        tokio::spawn(async move {
            actor.run().await;
        });
        Self { tx }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> HistoryCommand,
    ) -> CoreResult<T> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .map_err(|_| CoreError::Internal("run history stopped".to_string()))?;
        reply_rx
            .await
            .map_err(|_| CoreError::Internal("run history dropped response".to_string()))
    }

    pub async fn push(&self, record: RunRecord) -> CoreResult<()> {
        self.request(|reply| HistoryCommand::Push {
            record: Box::new(record),
            reply,
        })
        .await
    }

    /// Up to `limit` records, newest first.
    pub async fn recent(&self, limit: usize) -> CoreResult<Vec<RunRecord>> {
        self.request(|reply| HistoryCommand::Recent { limit, reply })
            .await
    }

    pub async fn get(&self, id: &str) -> CoreResult<Option<RunRecord>> {
        let id = id.to_string();
        self.request(|reply| HistoryCommand::Get { id, reply }).await
    }

    pub async fn len(&self) -> CoreResult<usize> {
        self.request(|reply| HistoryCommand::Len { reply }).await
    }
}

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{CoreError, CoreResult};

use super::record::RunRecord;

/// A run executing on its own task.
pub struct RunHandle {
    run_id: String,
    cancel_token: CancellationToken,
    join: JoinHandle<CoreResult<RunRecord>>,
}

impl RunHandle {
    pub(crate) fn new(
        run_id: String,
        cancel_token: CancellationToken,
        join: JoinHandle<CoreResult<RunRecord>>,
    ) -> Self {
        Self {
            run_id,
            cancel_token,
            join,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Stop the run at its next phase boundary. Tool calls already in
    /// flight finish first.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn wait(self) -> CoreResult<RunRecord> {
        self.join
            .await
            .map_err(|error| CoreError::Internal(format!("run task failed: {error}")))?
    }
}

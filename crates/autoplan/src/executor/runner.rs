use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bus::Bus;
use crate::event::RunEvent;
use crate::plan::{ArgValue, ParsedStep, StepId};
use crate::tools::{StepResult, ToolCatalog, ToolEntry, ToolError, ToolSnapshot};
use crate::utils::time::duration_ms;

use super::graph::execution_levels;
use super::result::PlanExecutionResult;

const DEFAULT_MAX_PARALLEL: usize = 8;

/// Runs parsed plans against the tool catalog.
///
/// Steps in the same level run concurrently on spawned tasks; a level starts
/// only after every step of the previous level has finished. A failed step
/// never cancels its siblings.
#[derive(Clone)]
pub struct TaskExecutor {
    catalog: ToolCatalog,
    max_parallel: usize,
    bus: Option<Bus>,
}

impl TaskExecutor {
    pub fn new(catalog: ToolCatalog) -> Self {
        Self {
            catalog,
            max_parallel: DEFAULT_MAX_PARALLEL,
            bus: None,
        }
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Publish a `StepFinished` event for every step of runs executed with
    /// [`TaskExecutor::execute_in_run`].
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub async fn execute(&self, steps: &[ParsedStep]) -> PlanExecutionResult {
        self.execute_in_run(None, steps, &CancellationToken::new())
            .await
    }

    /// Execute `steps`, tagging progress events with `run_id`.
    ///
    /// Terminal steps are skipped. Tool names are resolved against one
    /// catalog snapshot taken at the start. Once `cancel_token` fires no
    /// further level is dispatched; calls already running are awaited.
    pub async fn execute_in_run(
        &self,
        run_id: Option<&str>,
        steps: &[ParsedStep],
        cancel_token: &CancellationToken,
    ) -> PlanExecutionResult {
        let snapshot = match self.catalog.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!("tool catalog unavailable: {}", error);
                ToolSnapshot::default()
            }
        };

        let mut steps: Vec<ParsedStep> = steps
            .iter()
            .filter(|step| !step.is_terminal())
            .cloned()
            .collect();
        steps.sort_by_key(|step| step.id);
        if steps.is_empty() {
            return PlanExecutionResult::empty();
        }

        let started = Instant::now();
        let levels = execution_levels(&steps);
        let by_id: HashMap<StepId, &ParsedStep> =
            steps.iter().map(|step| (step.id, step)).collect();
        let mut outputs: HashMap<StepId, String> = HashMap::new();
        let mut finished: HashMap<StepId, StepResult> = HashMap::new();

        for level in &levels {
            if cancel_token.is_cancelled() {
                tracing::info!(
                    "execution cancelled before level {} of {}",
                    level.index,
                    levels.len()
                );
                break;
            }
            tracing::debug!(
                "executing level {} with {} step(s){}",
                level.index,
                level.len(),
                if level.fallback { " (fallback)" } else { "" }
            );
            let level_steps: Vec<&ParsedStep> = level
                .step_ids
                .iter()
                .filter_map(|id| by_id.get(id).copied())
                .collect();
            let results = self.run_level(&snapshot, &level_steps, &outputs).await;

            for result in results {
                if result.success {
                    outputs.insert(result.id, result.output.clone());
                } else {
                    tracing::warn!(
                        "step {} ({}) failed: {}",
                        result.id,
                        result.tool_name,
                        result.error.as_deref().unwrap_or_default()
                    );
                }
                if let (Some(bus), Some(run_id)) = (&self.bus, run_id) {
                    bus.publish(RunEvent::StepFinished {
                        run_id: run_id.to_string(),
                        step: result.clone(),
                    });
                }
                finished.insert(result.id, result);
            }
        }

        let results: Vec<StepResult> = steps
            .iter()
            .filter_map(|step| finished.remove(&step.id))
            .collect();
        let success =
            results.len() == steps.len() && results.iter().all(|result| result.success);
        let duration_ms = duration_ms(started.elapsed());
        tracing::info!(
            "executed {} step(s) in {} level(s), {}ms, success={}",
            results.len(),
            levels.len(),
            duration_ms,
            success
        );

        PlanExecutionResult {
            steps,
            results,
            outputs,
            levels,
            duration_ms,
            success,
        }
    }

    async fn run_level(
        &self,
        snapshot: &ToolSnapshot,
        steps: &[&ParsedStep],
        outputs: &HashMap<StepId, String>,
    ) -> Vec<StepResult> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let handles: Vec<(StepId, String, JoinHandle<StepResult>)> = steps
            .iter()
            .map(|step| {
                let args: Vec<ArgValue> = step.args.iter().map(|arg| arg.resolve(outputs)).collect();
                let entry = snapshot.lookup(&step.tool_name).cloned();
                let handle = spawn_step(
                    semaphore.clone(),
                    step.id,
                    step.tool_name.clone(),
                    entry,
                    args,
                );
                (step.id, step.tool_name.clone(), handle)
            })
            .collect();

        let (meta, handles): (Vec<(StepId, String)>, Vec<JoinHandle<StepResult>>) = handles
            .into_iter()
            .map(|(id, name, handle)| ((id, name), handle))
            .unzip();

        join_all(handles)
            .await
            .into_iter()
            .zip(meta)
            .map(|(joined, (id, tool_name))| match joined {
                Ok(result) => result,
                Err(error) => {
                    let now = SystemTime::now();
                    StepResult::failed(id, tool_name, format!("tool task aborted: {error}"), now, now)
                }
            })
            .collect()
    }
}

fn spawn_step(
    semaphore: Arc<Semaphore>,
    id: StepId,
    tool_name: String,
    entry: Result<Arc<ToolEntry>, ToolError>,
    args: Vec<ArgValue>,
) -> JoinHandle<StepResult> {
    tokio::spawn(async move {
        let _permit = match semaphore.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                let now = SystemTime::now();
                return StepResult::failed(id, tool_name, "tool semaphore closed".to_string(), now, now);
            }
        };

        let started_at = SystemTime::now();
        let outcome = match entry {
            Ok(entry) => entry.tool.call(args).await,
            Err(error) => Err(error),
        };
        let ended_at = SystemTime::now();

        match outcome {
            Ok(output) => StepResult::succeeded(id, tool_name, output, started_at, ended_at),
            Err(error) => StepResult::failed(id, tool_name, error.to_string(), started_at, ended_at),
        }
    })
}

#[cfg(test)]
mod tests;

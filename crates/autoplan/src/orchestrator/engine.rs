use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::bus::Bus;
use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult};
use crate::event::RunEvent;
use crate::executor::{PlanExecutionResult, TaskExecutor};
use crate::llm::{collect_text, LlmProvider};
use crate::plan::{parse, ParseResult, ParsedStep};
use crate::selector::ToolSelector;
use crate::tools::{ToolCatalog, ToolEntry, ToolId};
use crate::utils::time::{duration_ms, now_rfc3339};

use super::examples::matching_examples;
use super::handle::RunHandle;
use super::history::RunHistory;
use super::joinner::{parse_join_decision, JoinDecision};
use super::prompt::{
    invalid_plan_context, joinner_system_prompt, joinner_user_prompt, observation_context,
    planner_system_prompt, planner_user_prompt,
};
use super::record::{FinishReason, PlanAttempt, RunRecord, RunRequest};

const EXHAUSTED_ANSWER: &str = "Unable to complete the request.";

struct Inner {
    catalog: ToolCatalog,
    selector: ToolSelector,
    executor: TaskExecutor,
    planner: Arc<dyn LlmProvider>,
    joinner: Arc<dyn LlmProvider>,
    config: EngineConfig,
    history: RunHistory,
    bus: Bus,
}

/// Runs queries through select, plan, execute and join, replanning up to
/// `max_replans` times.
///
/// Cheap to clone; clones share the catalog, history and event bus. Each
/// run is an independent sequential state machine, so many runs may proceed
/// at once.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

/// Mutable state of one run between phases.
struct RunState {
    run_id: String,
    attempts: Vec<PlanAttempt>,
    replans: usize,
}

enum Step {
    Replan(String),
    Finish {
        answer: String,
        reason: FinishReason,
    },
}

impl Orchestrator {
    /// Build an orchestrator. Must be called inside a tokio runtime.
    pub fn new(
        catalog: ToolCatalog,
        planner: Arc<dyn LlmProvider>,
        joinner: Arc<dyn LlmProvider>,
        config: EngineConfig,
    ) -> CoreResult<Self> {
        config.validate()?;
        let bus = Bus::new(config.event_capacity);
        let executor = TaskExecutor::new(catalog.clone())
            .with_max_parallel(config.max_parallel_tools)
            .with_bus(bus.clone());
        Ok(Self {
            inner: Arc::new(Inner {
                selector: ToolSelector::new().with_threshold(config.selector_threshold),
                history: RunHistory::new(config.history_capacity),
                catalog,
                executor,
                planner,
                joinner,
                config,
                bus,
            }),
        })
    }

    /// Replace the selector. Its threshold is kept as given.
    pub fn with_selector(self, selector: ToolSelector) -> Self {
        let inner = Inner {
            catalog: self.inner.catalog.clone(),
            selector,
            executor: self.inner.executor.clone(),
            planner: self.inner.planner.clone(),
            joinner: self.inner.joinner.clone(),
            config: self.inner.config.clone(),
            history: self.inner.history.clone(),
            bus: self.inner.bus.clone(),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.inner.catalog
    }

    pub fn history(&self) -> &RunHistory {
        &self.inner.history
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RunEvent> {
        self.inner.bus.subscribe()
    }

    /// Run a query to completion. A run that exhausts its replans is still
    /// `Ok`, with `success == false`.
    pub async fn run(&self, request: RunRequest) -> CoreResult<RunRecord> {
        self.run_with_id(new_run_id(), request, CancellationToken::new())
            .await
    }

    /// Start a run on its own task.
    pub fn spawn_run(&self, request: RunRequest) -> RunHandle {
        let run_id = new_run_id();
        let cancel_token = CancellationToken::new();
        let orchestrator = self.clone();
        let token = cancel_token.clone();
        let id = run_id.clone();
        let join = tokio::spawn(async move { orchestrator.run_with_id(id, request, token).await });
        RunHandle::new(run_id, cancel_token, join)
    }

    async fn run_with_id(
        &self,
        run_id: String,
        request: RunRequest,
        cancel_token: CancellationToken,
    ) -> CoreResult<RunRecord> {
        let result = self.drive(run_id.clone(), request, &cancel_token).await;
        if let Err(CoreError::Cancelled) = &result {
            tracing::info!("run {} cancelled", run_id);
        }
        result
    }

    async fn drive(
        &self,
        run_id: String,
        request: RunRequest,
        cancel_token: &CancellationToken,
    ) -> CoreResult<RunRecord> {
        let query = request.query.trim().to_string();
        if query.is_empty() {
            return Err(CoreError::InvalidInput("query must not be empty".to_string()));
        }
        let started = Instant::now();
        let started_at = now_rfc3339();
        self.inner.bus.publish(RunEvent::Started {
            run_id: run_id.clone(),
            query: query.clone(),
        });

        ensure_active(cancel_token)?;
        let snapshot = self.inner.catalog.snapshot().await?;
        let enabled: BTreeSet<ToolId> = snapshot.enabled_ids().into_iter().collect();
        let selected: BTreeSet<ToolId> = self
            .inner
            .selector
            .select_tools(&query)
            .intersection(&enabled)
            .copied()
            .collect();
        let tools_fallback = selected.is_empty();
        let selected = if tools_fallback { enabled } else { selected };
        tracing::info!(
            "run {} selected {} tool(s){}",
            run_id,
            selected.len(),
            if tools_fallback { " (fallback to all enabled)" } else { "" }
        );
        self.inner.bus.publish(RunEvent::ToolsSelected {
            run_id: run_id.clone(),
            tools: selected.iter().copied().collect(),
            fallback: tools_fallback,
        });

        let entries: Vec<&ToolEntry> = selected
            .iter()
            .filter_map(|id| snapshot.get(*id))
            .map(Arc::as_ref)
            .collect();
        let examples = matching_examples(&selected, self.inner.config.max_examples);
        let system_prompt = planner_system_prompt(&entries, &examples);

        let request = RunRequest { query, ..request };
        let mut state = RunState {
            run_id,
            attempts: Vec::new(),
            replans: 0,
        };
        let mut replan_context: Option<String> = None;

        let (answer, finish_reason) = loop {
            let step = self
                .attempt(
                    &mut state,
                    &request,
                    &system_prompt,
                    replan_context.as_deref(),
                    cancel_token,
                )
                .await?;
            match step {
                Step::Finish { answer, reason } => break (answer, reason),
                Step::Replan(context) if state.replans < self.inner.config.max_replans => {
                    state.replans += 1;
                    tracing::info!(
                        "run {} replanning ({}/{})",
                        state.run_id,
                        state.replans,
                        self.inner.config.max_replans
                    );
                    replan_context = Some(context);
                }
                Step::Replan(_) => {
                    tracing::warn!(
                        "run {} exhausted {} replan(s)",
                        state.run_id,
                        self.inner.config.max_replans
                    );
                    break (exhausted_answer(&state.attempts), FinishReason::Exhausted);
                }
            }
        };

        let success = finish_reason == FinishReason::Answered;
        let record = RunRecord {
            id: state.run_id.clone(),
            query: request.query,
            selected_tools: selected.into_iter().collect(),
            tools_fallback,
            system_prompt,
            attempts: state.attempts,
            answer,
            success,
            finish_reason,
            replans: state.replans,
            duration_ms: duration_ms(started.elapsed()),
            started_at,
        };
        self.inner.history.push(record.clone()).await?;
        self.inner.bus.publish(RunEvent::Finished {
            run_id: record.id.clone(),
            success,
            replans: record.replans,
        });
        tracing::info!(
            "run {} finished success={} replans={} in {}ms",
            record.id,
            record.success,
            record.replans,
            record.duration_ms
        );
        Ok(record)
    }

    /// One plan, execute, join pass. Returns what the loop should do next.
    async fn attempt(
        &self,
        state: &mut RunState,
        request: &RunRequest,
        system_prompt: &str,
        replan_context: Option<&str>,
        cancel_token: &CancellationToken,
    ) -> CoreResult<Step> {
        let attempt = state.attempts.len() + 1;
        let user_prompt = planner_user_prompt(request, replan_context);

        ensure_active(cancel_token)?;
        tracing::debug!("run {} planning attempt {}", state.run_id, attempt);
        let (planner_output, parse_result) = match self
            .generate(&self.inner.planner, system_prompt, &user_prompt, cancel_token)
            .await
        {
            Ok(text) => {
                let parsed = parse(&text);
                (text, parsed)
            }
            Err(CoreError::Cancelled) => return Err(CoreError::Cancelled),
            Err(error) => {
                tracing::warn!("run {} planner call failed: {}", state.run_id, error);
                let parsed = ParseResult {
                    errors: vec![format!("planner call failed: {error}")],
                    ..ParseResult::default()
                };
                (String::new(), parsed)
            }
        };
        tracing::info!(
            "run {} attempt {} parsed {} step(s), valid={}",
            state.run_id,
            attempt,
            parse_result.steps.len(),
            parse_result.is_valid()
        );
        self.inner.bus.publish(RunEvent::PlanParsed {
            run_id: state.run_id.clone(),
            attempt,
            steps: parse_result.steps.len(),
            valid: parse_result.is_valid(),
        });

        if !parse_result.is_valid() {
            let context = invalid_plan_context(&planner_output, &parse_result.problems());
            state.attempts.push(PlanAttempt {
                attempt,
                user_prompt,
                planner_output,
                parse: parse_result,
                execution: None,
                joinner_output: None,
                decision: None,
            });
            return Ok(Step::Replan(context));
        }

        ensure_active(cancel_token)?;
        let steps: Vec<ParsedStep> = parse_result.executable_steps().cloned().collect();
        let execution = self
            .inner
            .executor
            .execute_in_run(Some(&state.run_id), &steps, cancel_token)
            .await;
        let observations = execution.observations();

        ensure_active(cancel_token)?;
        let (joinner_output, decision) = self
            .evaluate(&state.run_id, &request.query, &observations, cancel_token)
            .await?;
        tracing::info!(
            "run {} attempt {} decision: {}",
            state.run_id,
            attempt,
            if decision.is_finish() { "finish" } else { "replan" }
        );
        self.inner.bus.publish(RunEvent::Decision {
            run_id: state.run_id.clone(),
            attempt,
            decision: decision.clone(),
        });

        let next = match &decision {
            JoinDecision::Finish { answer, .. } => Step::Finish {
                answer: answer.clone(),
                reason: FinishReason::Answered,
            },
            JoinDecision::Replan { rationale } => {
                Step::Replan(observation_context(&observations, rationale.as_deref()))
            }
        };
        state.attempts.push(PlanAttempt {
            attempt,
            user_prompt,
            planner_output,
            parse: parse_result,
            execution: Some(execution),
            joinner_output: Some(joinner_output),
            decision: Some(decision),
        });
        Ok(next)
    }

    /// Ask the joinner for a decision. A failed joinner call becomes a
    /// replan carrying the failure as its rationale.
    async fn evaluate(
        &self,
        run_id: &str,
        query: &str,
        observations: &str,
        cancel_token: &CancellationToken,
    ) -> CoreResult<(String, JoinDecision)> {
        let user_prompt = joinner_user_prompt(query, observations);
        match self
            .generate(
                &self.inner.joinner,
                joinner_system_prompt(),
                &user_prompt,
                cancel_token,
            )
            .await
        {
            Ok(text) => {
                let decision = parse_join_decision(&text);
                Ok((text, decision))
            }
            Err(CoreError::Cancelled) => Err(CoreError::Cancelled),
            Err(error) => {
                tracing::warn!("run {} joinner call failed: {}", run_id, error);
                Ok((
                    String::new(),
                    JoinDecision::Replan {
                        rationale: Some(format!("joinner call failed: {error}")),
                    },
                ))
            }
        }
    }

    /// Collect one bounded completion, abandoning it if the run is cancelled.
    async fn generate(
        &self,
        provider: &Arc<dyn LlmProvider>,
        system: &str,
        user: &str,
        cancel_token: &CancellationToken,
    ) -> CoreResult<String> {
        let max_chars = self.inner.config.max_generation_chars;
        let completion = async {
            let stream = provider.complete(system, user).await?;
            collect_text(stream, max_chars).await
        };
        tokio::select! {
            _ = cancel_token.cancelled() => Err(CoreError::Cancelled),
            result = completion => result.map_err(CoreError::Llm),
        }
    }
}

fn new_run_id() -> String {
    Uuid::now_v7().to_string()
}

fn ensure_active(cancel_token: &CancellationToken) -> CoreResult<()> {
    if cancel_token.is_cancelled() {
        return Err(CoreError::Cancelled);
    }
    Ok(())
}

/// Best partial answer once replanning is exhausted: the last step output of
/// the most recent execution.
fn exhausted_answer(attempts: &[PlanAttempt]) -> String {
    attempts
        .iter()
        .rev()
        .find_map(|attempt| attempt.execution.as_ref())
        .and_then(PlanExecutionResult::last_output)
        .unwrap_or(EXHAUSTED_ANSWER)
        .to_string()
}

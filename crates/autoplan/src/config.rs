use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};

pub const ENGINE_CONFIG_FILENAME: &str = "autoplan.json";

const DEFAULT_MAX_REPLANS: usize = 2;
const DEFAULT_SELECTOR_THRESHOLD: f64 = 0.5;
const DEFAULT_MAX_EXAMPLES: usize = 3;
const DEFAULT_HISTORY_CAPACITY: usize = 50;
const DEFAULT_MAX_GENERATION_CHARS: usize = 16_000;
const DEFAULT_MAX_PARALLEL_TOOLS: usize = 8;
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Tunables for the orchestration engine.
///
/// Missing fields in a config file fall back to their defaults, so older files
/// keep loading after new knobs are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many times the joinner may send a run back to planning.
    pub max_replans: usize,
    /// Minimum selector confidence for a tool to be offered to the planner.
    pub selector_threshold: f64,
    /// Cap on worked examples injected into the planner prompt.
    pub max_examples: usize,
    /// Number of finished runs kept in memory.
    pub history_capacity: usize,
    /// Hard cap on characters collected from one model call.
    pub max_generation_chars: usize,
    /// Concurrent tool calls allowed within one execution level.
    pub max_parallel_tools: usize,
    /// Capacity of the run event bus.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_replans: DEFAULT_MAX_REPLANS,
            selector_threshold: DEFAULT_SELECTOR_THRESHOLD,
            max_examples: DEFAULT_MAX_EXAMPLES,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_generation_chars: DEFAULT_MAX_GENERATION_CHARS,
            max_parallel_tools: DEFAULT_MAX_PARALLEL_TOOLS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Overlay `AUTOPLAN_*` environment variables onto this config.
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup. Unparseable values are ignored.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = read("AUTOPLAN_MAX_REPLANS").and_then(|v| v.trim().parse().ok()) {
            self.max_replans = value;
        }
        if let Some(value) = read("AUTOPLAN_SELECTOR_THRESHOLD")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| (0.0..=1.0).contains(v))
        {
            self.selector_threshold = value;
        }
        if let Some(value) = read("AUTOPLAN_MAX_EXAMPLES").and_then(|v| v.trim().parse().ok()) {
            self.max_examples = value;
        }
        if let Some(value) = read("AUTOPLAN_HISTORY_CAPACITY").and_then(|v| v.trim().parse().ok())
        {
            self.history_capacity = value;
        }
        if let Some(value) =
            read("AUTOPLAN_MAX_GENERATION_CHARS").and_then(|v| v.trim().parse().ok())
        {
            self.max_generation_chars = value;
        }
        if let Some(value) =
            read("AUTOPLAN_MAX_PARALLEL_TOOLS").and_then(|v| v.trim().parse().ok())
        {
            self.max_parallel_tools = value;
        }
        self
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if !(0.0..=1.0).contains(&self.selector_threshold) {
            return Err(CoreError::Config(format!(
                "selector_threshold must be within [0, 1], got {}",
                self.selector_threshold
            )));
        }
        if self.max_parallel_tools == 0 {
            return Err(CoreError::Config(
                "max_parallel_tools must be at least 1".to_string(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(CoreError::Config(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_generation_chars == 0 {
            return Err(CoreError::Config(
                "max_generation_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn engine_config_path(dir: &Path) -> PathBuf {
    dir.join(ENGINE_CONFIG_FILENAME)
}

/// Load the engine config from `dir`, writing defaults first if none exists.
pub fn load_or_create_engine_config(dir: &Path) -> CoreResult<EngineConfig> {
    std::fs::create_dir_all(dir).map_err(|error| {
        CoreError::Config(format!(
            "failed to create config directory {}: {error}",
            dir.display()
        ))
    })?;

    let path = engine_config_path(dir);
    if !path.exists() {
        let config = EngineConfig::default();
        write_engine_config(&path, &config)?;
        tracing::info!("created default engine config at {}", path.display());
        return Ok(config);
    }

    let data = std::fs::read_to_string(&path).map_err(|error| {
        CoreError::Config(format!(
            "failed to read engine config {}: {error}",
            path.display()
        ))
    })?;
    let config: EngineConfig = serde_json::from_str(&data).map_err(|error| {
        CoreError::Config(format!(
            "failed to parse engine config {}: {error}",
            path.display()
        ))
    })?;
    config.validate()?;
    Ok(config)
}

fn write_engine_config(path: &Path, config: &EngineConfig) -> CoreResult<()> {
    let data = serde_json::to_string_pretty(config).map_err(|error| {
        CoreError::Config(format!(
            "failed to serialize engine config {}: {error}",
            path.display()
        ))
    })?;
    std::fs::write(path, data).map_err(|error| {
        CoreError::Config(format!(
            "failed to write engine config {}: {error}",
            path.display()
        ))
    })?;
    Ok(())
}

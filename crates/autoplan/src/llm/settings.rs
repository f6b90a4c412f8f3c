use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_output_tokens: 4096,
        }
    }
}

impl LlmSettings {
    pub fn from_env() -> Self {
        Self::default().apply_overrides(|key| std::env::var(key).ok())
    }

    /// `AUTOPLAN_LLM_*` keys win over their `OPENAI_*` counterparts.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        if let Some(base_url) = read(&["AUTOPLAN_LLM_BASE_URL", "OPENAI_BASE_URL"]) {
            self.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(api_key) = read(&["AUTOPLAN_LLM_API_KEY", "OPENAI_API_KEY"]) {
            self.api_key = Some(api_key);
        }
        if let Some(model) = read(&["AUTOPLAN_LLM_MODEL"]) {
            self.model = model;
        }
        if let Some(temperature) = read(&["AUTOPLAN_LLM_TEMPERATURE"])
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|value| (0.0..=2.0).contains(value))
        {
            self.temperature = temperature;
        }
        self
    }
}

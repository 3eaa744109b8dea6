use serde::Deserialize;

/// Connection settings for the external evaluator service that runs bulk
/// LLM evaluation and leaderboard generation.
#[derive(Debug, Deserialize, Clone)]
pub struct EvaluatorConfig {
    /// Base URL of the evaluator. Default: "http://localhost:8080".
    #[serde(default = "default_evaluator_url")]
    pub base_url: String,
    /// Request timeout in seconds. Default: 30.
    #[serde(default = "default_evaluator_timeout")]
    pub timeout_secs: u64,
}

fn default_evaluator_url() -> String {
    "http://localhost:8080".into()
}
fn default_evaluator_timeout() -> u64 {
    30
}

impl EvaluatorConfig {
    /// Join an endpoint path onto the base URL without doubling slashes.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            base_url: default_evaluator_url(),
            timeout_secs: default_evaluator_timeout(),
        }
    }
}

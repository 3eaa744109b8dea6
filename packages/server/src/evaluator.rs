//! Client for the external evaluator service.
//!
//! Bulk LLM evaluation and leaderboard ranking run outside this server; the
//! server only triggers them and later ingests their results.

use std::time::Duration;

use async_trait::async_trait;
use common::config::EvaluatorConfig;
use common::evaluator::{CompetitionJob, GENERATE_LEADERBOARD_PATH, START_EVALUATION_PATH};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("Evaluator request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Evaluator returned status {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait EvaluatorClient: Send + Sync {
    /// POST a competition job to an evaluator endpoint and return its JSON reply.
    async fn post_job(&self, path: &str, job: &CompetitionJob) -> Result<Value, EvaluatorError>;
}

/// Named evaluator operations.
/// Automatically implemented for any T that implements EvaluatorClient.
#[async_trait]
pub trait EvaluatorClientExt: EvaluatorClient {
    async fn start_evaluation(&self, job: &CompetitionJob) -> Result<Value, EvaluatorError> {
        self.post_job(START_EVALUATION_PATH, job).await
    }

    async fn generate_leaderboard(&self, job: &CompetitionJob) -> Result<Value, EvaluatorError> {
        self.post_job(GENERATE_LEADERBOARD_PATH, job).await
    }
}

impl<T: ?Sized + EvaluatorClient> EvaluatorClientExt for T {}

/// `EvaluatorClient` over HTTP.
pub struct HttpEvaluator {
    client: reqwest::Client,
    config: EvaluatorConfig,
}

impl HttpEvaluator {
    pub fn new(config: EvaluatorConfig) -> Result<Self, EvaluatorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl EvaluatorClient for HttpEvaluator {
    #[instrument(skip(self, job), fields(competition_id = job.competition_id))]
    async fn post_job(&self, path: &str, job: &CompetitionJob) -> Result<Value, EvaluatorError> {
        let url = self.config.endpoint(path);
        info!("Forwarding job to evaluator at {}", url);

        let res = self.client.post(&url).json(job).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(EvaluatorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Some evaluator endpoints reply with an empty body.
        let text = res.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

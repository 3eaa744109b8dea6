use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::evaluator::EvaluatorClient;
use crate::live::SubmissionFeed;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub evaluator: Arc<dyn EvaluatorClient>,
    pub feed: SubmissionFeed,
}

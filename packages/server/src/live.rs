use serde::Serialize;
use tokio::sync::broadcast;

/// Published after every accepted competition submission.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct SubmissionEvent {
    pub competition_id: i32,
    pub participant_id: String,
    pub challenge_id: i32,
    /// Submissions stored for the competition after this one.
    pub total_submissions: u64,
}

/// Fan-out of submission events to live listeners.
#[derive(Clone)]
pub struct SubmissionFeed {
    tx: broadcast::Sender<SubmissionEvent>,
}

impl SubmissionFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Having no listeners is not an error.
    pub fn publish(&self, event: SubmissionEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.tx.subscribe()
    }
}

impl Default for SubmissionFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

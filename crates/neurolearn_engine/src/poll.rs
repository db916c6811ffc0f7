use std::time::Duration;

use neurolearn_logging::{learn_debug, learn_info, learn_warn};
use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, EventSink, LearningApi, ProcessingState};

#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Delay between checks while the backend reports `processing`.
    pub processing_interval: Duration,
    /// Delay before retrying after a failed check.
    pub error_interval: Duration,
    /// Consecutive failures tolerated before giving up. `None` retries forever.
    pub max_consecutive_errors: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            processing_interval: Duration::from_secs(3),
            error_interval: Duration::from_secs(5),
            max_consecutive_errors: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Settled(ProcessingState),
    Cancelled,
    GaveUp { errors: u32 },
}

/// Polls the processing status of `filename` until it settles, is cancelled, or
/// exceeds the configured error budget. Every result is reported through `sink`.
pub async fn poll_processing_status(
    api: &dyn LearningApi,
    filename: &str,
    settings: &PollSettings,
    cancel: &CancellationToken,
    sink: &dyn EventSink,
) -> PollOutcome {
    let mut errors: u32 = 0;
    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            result = api.check_processing_status(filename) => result,
        };

        let delay = match result {
            Ok(status) => {
                errors = 0;
                let state = status.status;
                learn_debug!("Processing status for {}: {:?}", filename, state);
                sink.emit(EngineEvent::ProcessingStatus {
                    filename: filename.to_string(),
                    status,
                });
                if state.is_terminal() {
                    learn_info!("Processing settled for {}: {:?}", filename, state);
                    return PollOutcome::Settled(state);
                }
                settings.processing_interval
            }
            Err(error) => {
                errors = errors.saturating_add(1);
                let gave_up = settings
                    .max_consecutive_errors
                    .is_some_and(|max| errors >= max);
                learn_warn!(
                    "Failed to check processing status for {} (attempt {}): {}",
                    filename,
                    errors,
                    error
                );
                sink.emit(EngineEvent::StatusCheckFailed {
                    filename: filename.to_string(),
                    error,
                    gave_up,
                });
                if gave_up {
                    return PollOutcome::GaveUp { errors };
                }
                settings.error_interval
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

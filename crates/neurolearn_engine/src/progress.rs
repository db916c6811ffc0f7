use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, EventSink};

/// Client-side upload progress: fixed increments on a timer, held below 100
/// until the real upload call resolves.
#[derive(Debug, Clone)]
pub struct ProgressSettings {
    pub tick: Duration,
    pub step: u8,
    pub cap: u8,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(200),
            step: 10,
            cap: 90,
        }
    }
}

/// Emits `UploadProgress` ticks for `name` until the cap is reached or `cancel` fires.
pub async fn simulate_upload_progress(
    name: &str,
    settings: &ProgressSettings,
    cancel: &CancellationToken,
    sink: &dyn EventSink,
) {
    let mut percent: u8 = 0;
    while percent < settings.cap {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(settings.tick) => {}
        }
        percent = percent.saturating_add(settings.step).min(settings.cap);
        sink.emit(EngineEvent::UploadProgress {
            name: name.to_string(),
            percent,
        });
    }
}

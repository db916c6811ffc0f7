//! NeuroLearn core: pure state machine and view-model helpers.
mod assessment;
mod chat;
mod effect;
mod msg;
mod state;
mod update;
mod upload;
mod view_model;

pub use assessment::{AssessmentSession, AssessmentStage, EMPTY_ANSWER_ERROR};
pub use chat::{ChatMessage, ChatRole, Transcript};
pub use effect::{CacheEvent, Effect};
pub use msg::{Msg, UploadAccepted, VoiceExchange};
pub use state::{AppState, BackendStatus, Fetched, ReferenceLink, RequestId, Tab};
pub use update::update;
pub use upload::{
    ProcessingState, Rejection, SelectedFile, SelectionStats, UploadPhase, UploadedFile,
    MAX_UPLOAD_BYTES, SIMULATED_PROGRESS_CAP,
};
pub use view_model::{AppViewModel, AssessmentView, PanelView, UploadRowView};

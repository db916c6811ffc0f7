use crate::{
    AssessmentStage, BackendStatus, ChatMessage, ReferenceLink, SelectionStats, Tab, UploadPhase,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelView<T> {
    pub value: T,
    pub loading: bool,
    pub error: Option<String>,
    pub from_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRowView {
    pub name: String,
    pub size: u64,
    pub progress: u8,
    pub phase: UploadPhase,
    pub status_message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssessmentView {
    pub stage: AssessmentStage,
    pub question: String,
    pub answer: String,
    pub feedback: String,
    pub error: Option<String>,
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub tab: Tab,
    pub backend: BackendStatus,
    pub uploads: Vec<UploadRowView>,
    pub last_selection: Option<SelectionStats>,
    pub ready_for_learning: bool,
    pub summary: PanelView<String>,
    pub links: PanelView<Vec<ReferenceLink>>,
    pub files: PanelView<Vec<String>>,
    pub selected_file: Option<String>,
    pub chat: Vec<ChatMessage>,
    pub chat_pending: bool,
    pub chat_error: Option<String>,
    pub recording: bool,
    pub last_audio_url: Option<String>,
    pub speech_pending: bool,
    pub speech_error: Option<String>,
    pub assessment: AssessmentView,
    pub dirty: bool,
}

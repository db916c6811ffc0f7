use crate::assessment::AssessmentSession;
use crate::chat::Transcript;
use crate::upload::{SelectionStats, UploadPhase, UploadedFile};
use crate::view_model::{AppViewModel, AssessmentView, PanelView, UploadRowView};

/// Sequence number attached to every remote load; the latest one per resource wins.
pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Upload,
    Learning,
    Assessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendStatus {
    #[default]
    Unknown,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceLink {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
}

/// A loaded value and whether it was served without a network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched<T> {
    pub value: T,
    pub from_cache: bool,
}

/// Remotely loaded resource with stale-response protection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Remote<T> {
    value: T,
    loading: bool,
    latest: Option<RequestId>,
    error: Option<String>,
    from_cache: bool,
}

impl<T: Clone + Default> Remote<T> {
    pub(crate) fn value(&self) -> &T {
        &self.value
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn begin(&mut self, request_id: RequestId) {
        self.latest = Some(request_id);
        self.loading = true;
        self.error = None;
    }

    /// Applies a response. Returns false when `request_id` was superseded.
    pub(crate) fn settle(
        &mut self,
        request_id: RequestId,
        result: Result<Fetched<T>, String>,
    ) -> bool {
        if self.latest != Some(request_id) {
            return false;
        }
        self.loading = false;
        match result {
            Ok(fetched) => {
                self.value = fetched.value;
                self.from_cache = fetched.from_cache;
                self.error = None;
            }
            Err(message) => {
                self.value = T::default();
                self.from_cache = false;
                self.error = Some(message);
            }
        }
        true
    }

    pub(crate) fn view(&self) -> PanelView<T> {
        PanelView {
            value: self.value.clone(),
            loading: self.loading,
            error: self.error.clone(),
            from_cache: self.from_cache,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    pub(crate) tab: Tab,
    pub(crate) backend: BackendStatus,
    pub(crate) uploads: Vec<UploadedFile>,
    pub(crate) last_selection: Option<SelectionStats>,
    pub(crate) summary: Remote<String>,
    pub(crate) links: Remote<Vec<ReferenceLink>>,
    pub(crate) files: Remote<Vec<String>>,
    pub(crate) selected_file: Option<String>,
    pub(crate) chat: Transcript,
    pub(crate) chat_pending: Option<RequestId>,
    /// Time of an empty history load whose greeting waits for the file list.
    pub(crate) greeting_due_at: Option<u64>,
    pub(crate) chat_error: Option<String>,
    pub(crate) recording: bool,
    pub(crate) last_audio_url: Option<String>,
    pub(crate) speech_pending: bool,
    pub(crate) speech_error: Option<String>,
    pub(crate) assessment: AssessmentSession,
    next_request_id: RequestId,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn uploads(&self) -> &[UploadedFile] {
        &self.uploads
    }

    pub fn transcript(&self) -> &Transcript {
        &self.chat
    }

    pub fn assessment(&self) -> &AssessmentSession {
        &self.assessment
    }

    pub fn selected_file(&self) -> Option<&str> {
        self.selected_file.as_deref()
    }

    /// True once any upload finished backend processing.
    pub fn ready_for_learning(&self) -> bool {
        self.uploads
            .iter()
            .any(|file| file.phase == UploadPhase::Completed)
    }

    /// True while no upload is still being sent or processed.
    pub fn uploads_settled(&self) -> bool {
        self.uploads.iter().all(|file| file.phase.is_settled())
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            tab: self.tab,
            backend: self.backend,
            uploads: self
                .uploads
                .iter()
                .map(|file| UploadRowView {
                    name: file.name.clone(),
                    size: file.size,
                    progress: file.progress,
                    phase: file.phase,
                    status_message: file.status_message.clone(),
                    error: file.error.clone(),
                })
                .collect(),
            last_selection: self.last_selection,
            ready_for_learning: self.ready_for_learning(),
            summary: self.summary.view(),
            links: self.links.view(),
            files: self.files.view(),
            selected_file: self.selected_file.clone(),
            chat: self.chat.messages().to_vec(),
            chat_pending: self.chat_pending.is_some(),
            chat_error: self.chat_error.clone(),
            recording: self.recording,
            last_audio_url: self.last_audio_url.clone(),
            speech_pending: self.speech_pending,
            speech_error: self.speech_error.clone(),
            assessment: AssessmentView {
                stage: self.assessment.stage(),
                question: self.assessment.question().to_string(),
                answer: self.assessment.answer().to_string(),
                feedback: self.assessment.feedback().to_string(),
                error: self.assessment.error().map(ToOwned::to_owned),
                loading: self.assessment.is_loading(),
            },
            dirty: self.dirty,
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn next_request_id(&mut self) -> RequestId {
        self.next_request_id += 1;
        self.next_request_id
    }

    pub(crate) fn upload_mut(&mut self, name: &str) -> Option<&mut UploadedFile> {
        self.uploads.iter_mut().find(|file| file.name == name)
    }

    /// The upload whose backend document is `filename` and still being processed.
    pub(crate) fn polled_upload_mut(&mut self, filename: &str) -> Option<&mut UploadedFile> {
        self.uploads
            .iter_mut()
            .find(|file| file.is_polling() && file.server_name.as_deref() == Some(filename))
    }
}

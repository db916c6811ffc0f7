use crate::{ChatMessage, Fetched, ProcessingState, ReferenceLink, RequestId, SelectedFile, Tab};

/// What the backend said after accepting an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAccepted {
    /// Document name to poll; `None` when the backend did not name one.
    pub filename: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceExchange {
    pub transcript: String,
    pub response: String,
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Front end came up; check the backend once.
    SessionStarted,
    ConnectionChecked(bool),
    /// User picked or dropped files for upload.
    FilesSelected(Vec<SelectedFile>),
    UploadProgressed {
        name: String,
        percent: u8,
    },
    UploadFinished {
        name: String,
        result: Result<UploadAccepted, String>,
    },
    ProcessingStatusReported {
        filename: String,
        status: ProcessingState,
        message: String,
    },
    /// A status check failed; `gave_up` is set when the engine stopped polling.
    StatusCheckFailed {
        filename: String,
        message: String,
        gave_up: bool,
    },
    /// User removed a file from the upload list.
    FileRemoved(String),
    TabSelected(Tab),
    RefreshSummary,
    RefreshFiles,
    SummaryLoaded {
        request_id: RequestId,
        result: Result<Fetched<String>, String>,
    },
    LinksLoaded {
        request_id: RequestId,
        result: Result<Fetched<Vec<ReferenceLink>>, String>,
    },
    FilesLoaded {
        request_id: RequestId,
        result: Result<Fetched<Vec<String>>, String>,
    },
    ChatHistoryLoaded {
        messages: Vec<ChatMessage>,
        at_ms: u64,
    },
    /// User picked the document Q&A should refer to.
    FileChosen(String),
    ChatSubmitted {
        text: String,
        at_ms: u64,
    },
    AnswerReceived {
        request_id: RequestId,
        result: Result<String, String>,
        at_ms: u64,
    },
    /// The single record button was pressed.
    RecordToggled,
    RecordingFailed(String),
    VoiceAnswerReceived {
        request_id: RequestId,
        result: Result<VoiceExchange, String>,
        at_ms: u64,
    },
    SpeechReady(String),
    /// Text-to-speech was unavailable; playback is optional.
    SpeechFailed(String),
    ReadSummaryAloud,
    AssessmentGenerate,
    AssessmentGenerated {
        request_id: RequestId,
        result: Result<String, String>,
    },
    AssessmentBeginAnswer,
    AssessmentAnswerChanged(String),
    AssessmentSubmit,
    AssessmentFeedbackReceived {
        request_id: RequestId,
        result: Result<String, String>,
    },
    AssessmentBackToQuestion,
    AssessmentRetry,
    AssessmentReset,
    /// UI/render tick to coalesce rendering.
    Tick,
    NoOp,
}

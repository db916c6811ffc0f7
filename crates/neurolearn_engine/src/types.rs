use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sequence number attached to every remote load so stale responses can be discarded.
pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "fileId")]
    pub file_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Processing,
    Completed,
    NotFound,
}

impl ProcessingState {
    /// Polling stops once the backend reports a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessingState::Completed | ProcessingState::NotFound)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessingStatus {
    pub status: ProcessingState,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "hasExplanation")]
    pub has_explanation: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default, rename = "_id")]
    pub id: String,
    pub filename: String,
    #[serde(default, rename = "uploadDate")]
    pub upload_date: String,
    #[serde(default)]
    pub size: u64,
}

impl FileInfo {
    /// Entry for backends that list bare filenames instead of objects.
    pub fn from_name(filename: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            filename: filename.into(),
            upload_date: String::new(),
            size: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLink {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceAnswer {
    pub transcript: String,
    pub response: String,
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssessmentQuestion {
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssessmentFeedback {
    pub feedback: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Bot,
}

/// Persisted form of a chat transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: u64,
    pub role: ChatRole,
    pub content: String,
    pub timestamp_ms: u64,
}

/// A value produced by a cached load, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded<T> {
    pub value: T,
    pub from_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ConnectionChecked {
        connected: bool,
    },
    UploadProgress {
        name: String,
        percent: u8,
    },
    UploadFinished {
        name: String,
        result: Result<UploadReceipt, ApiError>,
    },
    ProcessingStatus {
        filename: String,
        status: ProcessingStatus,
    },
    StatusCheckFailed {
        filename: String,
        error: ApiError,
        gave_up: bool,
    },
    SummaryLoaded {
        request_id: RequestId,
        result: Result<Loaded<String>, ApiError>,
    },
    LinksLoaded {
        request_id: RequestId,
        result: Result<Loaded<Vec<ReferenceLink>>, ApiError>,
    },
    FilesLoaded {
        request_id: RequestId,
        result: Result<Loaded<Vec<FileInfo>>, ApiError>,
    },
    ChatHistoryLoaded {
        records: Vec<ChatRecord>,
    },
    AnswerReady {
        request_id: RequestId,
        result: Result<QaAnswer, ApiError>,
    },
    RecordingFailed {
        message: String,
    },
    VoiceAnswerReady {
        request_id: RequestId,
        result: Result<VoiceAnswer, ApiError>,
    },
    SpeechReady {
        audio_url: String,
    },
    SpeechUnavailable {
        message: String,
    },
    AssessmentGenerated {
        request_id: RequestId,
        result: Result<AssessmentQuestion, ApiError>,
    },
    AssessmentGraded {
        request_id: RequestId,
        result: Result<AssessmentFeedback, ApiError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Network,
    Timeout,
    HttpStatus(u16),
    InvalidResponse,
    Io,
    Recording,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::InvalidResponse => write!(f, "invalid response body"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Recording => write!(f, "recording error"),
        }
    }
}

use std::path::PathBuf;

use crate::{ChatMessage, RequestId};

/// Mutation that makes cached derived content untrustworthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    Upload,
    LearningTabOpened,
    ProcessingCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CheckConnection,
    StartUpload {
        name: String,
        location: PathBuf,
    },
    CancelUpload {
        name: String,
    },
    StartStatusPolling {
        filename: String,
    },
    StopStatusPolling {
        filename: String,
    },
    InvalidateCache(CacheEvent),
    LoadSummary {
        request_id: RequestId,
        force: bool,
    },
    LoadLinks {
        request_id: RequestId,
        force: bool,
    },
    LoadFiles {
        request_id: RequestId,
        force: bool,
    },
    LoadChatHistory,
    PersistChat(Vec<ChatMessage>),
    AskQuestion {
        request_id: RequestId,
        question: String,
        file_name: Option<String>,
    },
    StartRecording,
    FinishRecording {
        request_id: RequestId,
        file_name: Option<String>,
    },
    /// Best-effort speech for a chat reply.
    SpeakReply {
        text: String,
    },
    SpeakSummary {
        text: String,
    },
    GenerateAssessment {
        request_id: RequestId,
    },
    SubmitAssessment {
        request_id: RequestId,
        question: String,
        answer: String,
    },
}

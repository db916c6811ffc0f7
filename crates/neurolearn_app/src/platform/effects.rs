use std::time::Duration;

use chrono::Utc;
use neurolearn_core::{
    CacheEvent, ChatMessage, ChatRole, Effect, Fetched, Msg, ProcessingState, ReferenceLink,
    UploadAccepted, VoiceExchange,
};
use neurolearn_engine::{
    ApiError, ChatRecord, EngineEvent, EngineHandle, EngineStopped, InvalidationEvent, Loaded,
};
use neurolearn_logging::{learn_debug, learn_warn};

/// Executes core effects on the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            learn_debug!("Dispatching {}", effect_name(&effect));
            match effect {
                Effect::CheckConnection => self.engine.check_connection(),
                Effect::StartUpload { name, location } => self.engine.upload(name, location),
                Effect::CancelUpload { name } => self.engine.cancel_upload(name),
                Effect::StartStatusPolling { filename } => self.engine.poll_status(filename),
                Effect::StopStatusPolling { filename } => self.engine.cancel_polling(filename),
                Effect::InvalidateCache(event) => self.engine.invalidate(map_cache_event(event)),
                Effect::LoadSummary { request_id, force } => {
                    self.engine.load_summary(request_id, force)
                }
                Effect::LoadLinks { request_id, force } => self.engine.load_links(request_id, force),
                Effect::LoadFiles { request_id, force } => self.engine.load_files(request_id, force),
                Effect::LoadChatHistory => self.engine.load_chat_history(),
                Effect::PersistChat(messages) => self
                    .engine
                    .persist_chat(messages.into_iter().map(to_record).collect()),
                Effect::AskQuestion {
                    request_id,
                    question,
                    file_name,
                } => self.engine.ask(request_id, question, file_name),
                Effect::StartRecording => self.engine.start_recording(),
                Effect::FinishRecording {
                    request_id,
                    file_name,
                } => self.engine.finish_recording(request_id, file_name),
                Effect::SpeakReply { text } => self.engine.speak_reply(text),
                Effect::SpeakSummary { text } => self.engine.speak_summary(text),
                Effect::GenerateAssessment { request_id } => {
                    self.engine.generate_assessment(request_id)
                }
                Effect::SubmitAssessment {
                    request_id,
                    question,
                    answer,
                } => self.engine.submit_assessment(request_id, question, answer),
            }
        }
    }

    /// Waits up to `timeout` for the next engine event. Fails once the engine
    /// thread is gone, since no message can arrive after that.
    pub fn next_msg(&self, timeout: Duration) -> Result<Option<Msg>, EngineStopped> {
        Ok(self.engine.recv_timeout(timeout)?.map(map_event))
    }
}

/// Variant name only; chat payloads stay out of the log.
fn effect_name(effect: &Effect) -> &'static str {
    match effect {
        Effect::CheckConnection => "CheckConnection",
        Effect::StartUpload { .. } => "StartUpload",
        Effect::CancelUpload { .. } => "CancelUpload",
        Effect::StartStatusPolling { .. } => "StartStatusPolling",
        Effect::StopStatusPolling { .. } => "StopStatusPolling",
        Effect::InvalidateCache(_) => "InvalidateCache",
        Effect::LoadSummary { .. } => "LoadSummary",
        Effect::LoadLinks { .. } => "LoadLinks",
        Effect::LoadFiles { .. } => "LoadFiles",
        Effect::LoadChatHistory => "LoadChatHistory",
        Effect::PersistChat(_) => "PersistChat",
        Effect::AskQuestion { .. } => "AskQuestion",
        Effect::StartRecording => "StartRecording",
        Effect::FinishRecording { .. } => "FinishRecording",
        Effect::SpeakReply { .. } => "SpeakReply",
        Effect::SpeakSummary { .. } => "SpeakSummary",
        Effect::GenerateAssessment { .. } => "GenerateAssessment",
        Effect::SubmitAssessment { .. } => "SubmitAssessment",
    }
}

pub fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::ConnectionChecked { connected } => Msg::ConnectionChecked(connected),
        EngineEvent::UploadProgress { name, percent } => Msg::UploadProgressed { name, percent },
        EngineEvent::UploadFinished { name, result } => Msg::UploadFinished {
            result: result
                .map(|receipt| UploadAccepted {
                    filename: Some(receipt.filename).filter(|filename| !filename.is_empty()),
                    message: receipt.message,
                })
                .map_err(|err| failure_message(&name, err)),
            name,
        },
        EngineEvent::ProcessingStatus { filename, status } => Msg::ProcessingStatusReported {
            filename,
            status: map_state(status.status),
            message: status.message,
        },
        EngineEvent::StatusCheckFailed {
            filename,
            error,
            gave_up,
        } => Msg::StatusCheckFailed {
            filename,
            message: error.message,
            gave_up,
        },
        EngineEvent::SummaryLoaded { request_id, result } => Msg::SummaryLoaded {
            request_id,
            result: fetched(result, |text| text),
        },
        EngineEvent::LinksLoaded { request_id, result } => Msg::LinksLoaded {
            request_id,
            result: fetched(result, |links| {
                links
                    .into_iter()
                    .map(|link| ReferenceLink {
                        title: link.title,
                        url: link.url,
                        description: link.description,
                    })
                    .collect()
            }),
        },
        EngineEvent::FilesLoaded { request_id, result } => Msg::FilesLoaded {
            request_id,
            result: fetched(result, |files| {
                files.into_iter().map(|file| file.filename).collect()
            }),
        },
        EngineEvent::ChatHistoryLoaded { records } => Msg::ChatHistoryLoaded {
            messages: records.into_iter().map(from_record).collect(),
            at_ms: now_ms(),
        },
        EngineEvent::AnswerReady { request_id, result } => Msg::AnswerReceived {
            request_id,
            result: result
                .map(|answer| answer.answer)
                .map_err(|err| err.message),
            at_ms: now_ms(),
        },
        EngineEvent::RecordingFailed { message } => Msg::RecordingFailed(message),
        EngineEvent::VoiceAnswerReady { request_id, result } => Msg::VoiceAnswerReceived {
            request_id,
            result: result
                .map(|answer| VoiceExchange {
                    transcript: answer.transcript,
                    response: answer.response,
                    audio_url: answer.audio_url,
                })
                .map_err(|err| err.message),
            at_ms: now_ms(),
        },
        EngineEvent::SpeechReady { audio_url } => Msg::SpeechReady(audio_url),
        EngineEvent::SpeechUnavailable { message } => Msg::SpeechFailed(message),
        EngineEvent::AssessmentGenerated { request_id, result } => Msg::AssessmentGenerated {
            request_id,
            result: result
                .map(|question| question.question)
                .map_err(|err| err.message),
        },
        EngineEvent::AssessmentGraded { request_id, result } => {
            Msg::AssessmentFeedbackReceived {
                request_id,
                result: result
                    .map(|feedback| feedback.feedback)
                    .map_err(|err| err.message),
            }
        }
    }
}

fn failure_message(name: &str, err: ApiError) -> String {
    learn_warn!("Upload of {} failed ({}): {}", name, err.kind, err.message);
    err.message
}

fn fetched<T, U>(
    result: Result<Loaded<T>, ApiError>,
    convert: impl FnOnce(T) -> U,
) -> Result<Fetched<U>, String> {
    result
        .map(|loaded| Fetched {
            value: convert(loaded.value),
            from_cache: loaded.from_cache,
        })
        .map_err(|err| err.message)
}

fn map_state(state: neurolearn_engine::ProcessingState) -> ProcessingState {
    match state {
        neurolearn_engine::ProcessingState::Processing => ProcessingState::Processing,
        neurolearn_engine::ProcessingState::Completed => ProcessingState::Completed,
        neurolearn_engine::ProcessingState::NotFound => ProcessingState::NotFound,
    }
}

fn map_cache_event(event: CacheEvent) -> InvalidationEvent {
    match event {
        CacheEvent::Upload => InvalidationEvent::Upload,
        CacheEvent::LearningTabOpened => InvalidationEvent::LearningTabOpened,
        CacheEvent::ProcessingCompleted => InvalidationEvent::ProcessingCompleted,
    }
}

fn to_record(message: ChatMessage) -> ChatRecord {
    ChatRecord {
        id: message.id,
        role: match message.role {
            ChatRole::User => neurolearn_engine::ChatRole::User,
            ChatRole::Bot => neurolearn_engine::ChatRole::Bot,
        },
        content: message.content,
        timestamp_ms: message.timestamp_ms,
    }
}

fn from_record(record: ChatRecord) -> ChatMessage {
    ChatMessage {
        id: record.id,
        role: match record.role {
            neurolearn_engine::ChatRole::User => ChatRole::User,
            neurolearn_engine::ChatRole::Bot => ChatRole::Bot,
        },
        content: record.content,
        timestamp_ms: record.timestamp_ms,
    }
}

pub(crate) fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

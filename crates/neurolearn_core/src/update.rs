use crate::chat::{greeting, ChatRole};
use crate::upload::{SelectionStats, UploadPhase, UploadedFile};
use crate::{
    AppState, BackendStatus, CacheEvent, Effect, Msg, ProcessingState, SelectedFile, Tab,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    if !matches!(msg, Msg::Tick | Msg::NoOp) {
        state.mark_dirty();
    }

    let effects = match msg {
        Msg::SessionStarted => vec![Effect::CheckConnection],
        Msg::ConnectionChecked(connected) => {
            state.backend = if connected {
                BackendStatus::Connected
            } else {
                BackendStatus::Disconnected
            };
            Vec::new()
        }
        Msg::FilesSelected(selected) => select_files(&mut state, selected),
        Msg::UploadProgressed { name, percent } => {
            if let Some(file) = state.upload_mut(&name) {
                file.advance_progress(percent);
            }
            Vec::new()
        }
        Msg::UploadFinished { name, result } => {
            let Some(file) = state.upload_mut(&name) else {
                return (state, Vec::new());
            };
            if file.phase != UploadPhase::Uploading {
                return (state, Vec::new());
            }
            match result {
                Ok(accepted) => {
                    file.progress = 100;
                    file.status_message = Some(accepted.message);
                    let mut effects = vec![Effect::InvalidateCache(CacheEvent::Upload)];
                    match accepted.filename.filter(|name| !name.is_empty()) {
                        Some(filename) => {
                            file.phase = UploadPhase::Processing;
                            file.server_name = Some(filename.clone());
                            effects.push(Effect::StartStatusPolling { filename });
                        }
                        None => file.phase = UploadPhase::Uploaded,
                    }
                    effects
                }
                Err(message) => {
                    file.progress = 0;
                    file.phase = UploadPhase::Failed;
                    file.error = Some(message);
                    Vec::new()
                }
            }
        }
        Msg::ProcessingStatusReported {
            filename,
            status,
            message,
        } => {
            // Settled files no longer match, so completion is handled once.
            let Some(file) = state.polled_upload_mut(&filename) else {
                return (state, Vec::new());
            };
            file.error = None;
            if !message.is_empty() {
                file.status_message = Some(message);
            }
            match status {
                ProcessingState::Processing => Vec::new(),
                ProcessingState::Completed => {
                    file.phase = UploadPhase::Completed;
                    vec![Effect::InvalidateCache(CacheEvent::ProcessingCompleted)]
                }
                ProcessingState::NotFound => {
                    file.phase = UploadPhase::NotFound;
                    Vec::new()
                }
            }
        }
        Msg::StatusCheckFailed {
            filename,
            message,
            gave_up,
        } => {
            if let Some(file) = state.polled_upload_mut(&filename) {
                file.error = Some(message);
                if gave_up {
                    file.phase = UploadPhase::Failed;
                }
            }
            Vec::new()
        }
        Msg::FileRemoved(name) => {
            let Some(index) = state.uploads.iter().position(|file| file.name == name) else {
                return (state, Vec::new());
            };
            let removed = state.uploads.remove(index);
            stop_file_tasks(&removed)
        }
        Msg::TabSelected(tab) => {
            if state.tab == tab {
                return (state, Vec::new());
            }
            state.tab = tab;
            if tab == Tab::Learning {
                open_learning(&mut state)
            } else {
                Vec::new()
            }
        }
        Msg::RefreshSummary => {
            let request_id = state.next_request_id();
            state.summary.begin(request_id);
            vec![Effect::LoadSummary {
                request_id,
                force: true,
            }]
        }
        Msg::RefreshFiles => {
            let request_id = state.next_request_id();
            state.files.begin(request_id);
            vec![Effect::LoadFiles {
                request_id,
                force: true,
            }]
        }
        Msg::SummaryLoaded { request_id, result } => {
            state.summary.settle(request_id, result);
            Vec::new()
        }
        Msg::LinksLoaded { request_id, result } => {
            state.links.settle(request_id, result);
            Vec::new()
        }
        Msg::FilesLoaded { request_id, result } => {
            if state.files.settle(request_id, result) {
                let files = state.files.value();
                let still_listed = state
                    .selected_file
                    .as_ref()
                    .is_some_and(|selected| files.contains(selected));
                if !still_listed {
                    state.selected_file = files.first().cloned();
                }
                match state.greeting_due_at.take() {
                    Some(at_ms) if state.chat.is_empty() => greet(&mut state, at_ms),
                    _ => Vec::new(),
                }
            } else {
                Vec::new()
            }
        }
        Msg::ChatHistoryLoaded { messages, at_ms } => {
            if state.chat_pending.is_some() {
                return (state, Vec::new());
            }
            state.greeting_due_at = None;
            if !messages.is_empty() {
                state.chat.restore(messages);
                Vec::new()
            } else if state.files.is_loading() {
                // The greeting names the selected file, so it waits for the list.
                state.chat.restore(Vec::new());
                state.greeting_due_at = Some(at_ms);
                Vec::new()
            } else {
                state.chat.restore(Vec::new());
                greet(&mut state, at_ms)
            }
        }
        Msg::FileChosen(name) => {
            if state.files.value().contains(&name) {
                state.selected_file = Some(name);
            }
            Vec::new()
        }
        Msg::ChatSubmitted { text, at_ms } => {
            let question = text.trim();
            if question.is_empty() || state.chat_pending.is_some() || state.recording {
                return (state, Vec::new());
            }
            let question = question.to_string();
            state.chat.push(ChatRole::User, question.clone(), at_ms);
            state.chat_error = None;
            let request_id = state.next_request_id();
            state.chat_pending = Some(request_id);
            vec![
                Effect::PersistChat(state.chat.messages().to_vec()),
                Effect::AskQuestion {
                    request_id,
                    question,
                    file_name: state.selected_file.clone(),
                },
            ]
        }
        Msg::AnswerReceived {
            request_id,
            result,
            at_ms,
        } => {
            if state.chat_pending != Some(request_id) {
                return (state, Vec::new());
            }
            state.chat_pending = None;
            match result {
                Ok(answer) => {
                    state.chat.push(ChatRole::Bot, answer.clone(), at_ms);
                    state.speech_pending = true;
                    vec![
                        Effect::PersistChat(state.chat.messages().to_vec()),
                        Effect::SpeakReply { text: answer },
                    ]
                }
                Err(message) => {
                    state.chat_error = Some(message);
                    Vec::new()
                }
            }
        }
        Msg::RecordToggled => {
            if state.recording {
                state.recording = false;
                let request_id = state.next_request_id();
                state.chat_pending = Some(request_id);
                vec![Effect::FinishRecording {
                    request_id,
                    file_name: state.selected_file.clone(),
                }]
            } else if state.chat_pending.is_none() {
                state.recording = true;
                state.chat_error = None;
                vec![Effect::StartRecording]
            } else {
                Vec::new()
            }
        }
        Msg::RecordingFailed(message) => {
            state.recording = false;
            state.chat_pending = None;
            state.chat_error = Some(message);
            Vec::new()
        }
        Msg::VoiceAnswerReceived {
            request_id,
            result,
            at_ms,
        } => {
            if state.chat_pending != Some(request_id) {
                return (state, Vec::new());
            }
            state.chat_pending = None;
            match result {
                Ok(exchange) => {
                    state.chat.push(ChatRole::User, exchange.transcript, at_ms);
                    state.chat.push(ChatRole::Bot, exchange.response, at_ms);
                    if exchange.audio_url.is_some() {
                        state.last_audio_url = exchange.audio_url;
                    }
                    vec![Effect::PersistChat(state.chat.messages().to_vec())]
                }
                Err(message) => {
                    state.chat_error = Some(message);
                    Vec::new()
                }
            }
        }
        Msg::SpeechReady(url) => {
            state.speech_pending = false;
            state.speech_error = None;
            state.last_audio_url = Some(url);
            Vec::new()
        }
        Msg::SpeechFailed(message) => {
            state.speech_pending = false;
            state.speech_error = Some(message);
            Vec::new()
        }
        Msg::ReadSummaryAloud => {
            let text = state.summary.value().trim().to_string();
            if text.is_empty() {
                Vec::new()
            } else {
                state.speech_pending = true;
                vec![Effect::SpeakSummary { text }]
            }
        }
        Msg::AssessmentGenerate => {
            let request_id = state.next_request_id();
            if state.assessment.begin_generate(request_id) {
                vec![Effect::GenerateAssessment { request_id }]
            } else {
                Vec::new()
            }
        }
        Msg::AssessmentGenerated { request_id, result } => {
            state.assessment.apply_generated(request_id, result);
            Vec::new()
        }
        Msg::AssessmentBeginAnswer => {
            state.assessment.begin_answer();
            Vec::new()
        }
        Msg::AssessmentAnswerChanged(answer) => {
            state.assessment.set_answer(answer);
            Vec::new()
        }
        Msg::AssessmentSubmit => {
            let request_id = state.next_request_id();
            match state.assessment.begin_submit(request_id) {
                Some((question, answer)) => vec![Effect::SubmitAssessment {
                    request_id,
                    question,
                    answer,
                }],
                None => Vec::new(),
            }
        }
        Msg::AssessmentFeedbackReceived { request_id, result } => {
            state.assessment.apply_feedback(request_id, result);
            Vec::new()
        }
        Msg::AssessmentBackToQuestion => {
            state.assessment.back_to_question();
            Vec::new()
        }
        Msg::AssessmentRetry => {
            state.assessment.retry();
            Vec::new()
        }
        Msg::AssessmentReset => {
            state.assessment.reset();
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn select_files(state: &mut AppState, selected: Vec<SelectedFile>) -> Vec<Effect> {
    let mut stats = SelectionStats::default();
    let mut effects = Vec::new();
    for candidate in selected {
        if candidate.validate().is_err() {
            stats.rejected += 1;
            continue;
        }
        stats.accepted += 1;
        if let Some(index) = state
            .uploads
            .iter()
            .position(|file| file.name == candidate.name)
        {
            let previous = state.uploads.remove(index);
            if previous.is_polling() {
                effects.extend(stop_file_tasks(&previous));
            }
        }
        state.uploads.push(UploadedFile::new(&candidate));
        effects.push(Effect::StartUpload {
            name: candidate.name,
            location: candidate.location,
        });
    }
    state.last_selection = Some(stats);
    effects
}

fn stop_file_tasks(file: &UploadedFile) -> Vec<Effect> {
    let mut effects = Vec::with_capacity(2);
    if file.phase == UploadPhase::Uploading {
        effects.push(Effect::CancelUpload {
            name: file.name.clone(),
        });
    }
    if let Some(filename) = file.server_name.clone().filter(|_| file.is_polling()) {
        effects.push(Effect::StopStatusPolling { filename });
    }
    effects
}

fn greet(state: &mut AppState, at_ms: u64) -> Vec<Effect> {
    let text = greeting(state.selected_file.as_deref());
    state.chat.push(ChatRole::Bot, text, at_ms);
    vec![Effect::PersistChat(state.chat.messages().to_vec())]
}

fn open_learning(state: &mut AppState) -> Vec<Effect> {
    let summary = state.next_request_id();
    state.summary.begin(summary);
    let links = state.next_request_id();
    state.links.begin(links);
    let files = state.next_request_id();
    state.files.begin(files);
    vec![
        Effect::InvalidateCache(CacheEvent::LearningTabOpened),
        Effect::LoadSummary {
            request_id: summary,
            force: false,
        },
        Effect::LoadLinks {
            request_id: links,
            force: false,
        },
        Effect::LoadFiles {
            request_id: files,
            force: false,
        },
        Effect::LoadChatHistory,
    ]
}

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use neurolearn_logging::{learn_debug, learn_info, learn_warn};
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiSettings, LearningApi};
use crate::cache::{CacheKey, CachePolicy, ContentCache, InvalidationEvent};
use crate::poll::{poll_processing_status, PollSettings};
use crate::progress::{simulate_upload_progress, ProgressSettings};
use crate::recorder::AudioRecorder;
use crate::{ApiError, ChatRecord, EngineEvent, FailureKind, RequestId};

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub api: ApiSettings,
    pub poll: PollSettings,
    pub progress: ProgressSettings,
    pub cache_policy: CachePolicy,
    pub cache_dir: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            poll: PollSettings::default(),
            progress: ProgressSettings::default(),
            cache_policy: CachePolicy::default(),
            cache_dir: PathBuf::from(".neurolearn_cache"),
        }
    }
}

/// Collaborators the engine drives. Injected so tests can swap in fakes.
pub struct EngineParts {
    pub api: Arc<dyn LearningApi>,
    pub cache: Arc<ContentCache>,
    pub recorder: Arc<dyn AudioRecorder>,
}

enum EngineCommand {
    CheckConnection,
    Upload { name: String, path: PathBuf },
    CancelUpload { name: String },
    PollStatus { filename: String },
    CancelPolling { filename: String },
    CheckStatus { filename: String },
    Invalidate(InvalidationEvent),
    LoadSummary { request_id: RequestId, force: bool },
    LoadLinks { request_id: RequestId, force: bool },
    LoadFiles { request_id: RequestId, force: bool },
    LoadChatHistory,
    PersistChat(Vec<ChatRecord>),
    Ask {
        request_id: RequestId,
        question: String,
        file_name: Option<String>,
    },
    StartRecording,
    FinishRecording {
        request_id: RequestId,
        file_name: Option<String>,
    },
    SpeakReply { text: String },
    SpeakSummary { text: String },
    GenerateAssessment { request_id: RequestId },
    SubmitAssessment {
        request_id: RequestId,
        question: String,
        answer: String,
    },
    Shutdown,
}

/// The engine thread has exited; no further events will arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("engine stopped")]
pub struct EngineStopped;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    Upload,
    Poll,
}

/// Cancellation tokens of running uploads and polls, keyed by file name.
#[derive(Default)]
struct TaskRegistry {
    next_id: u64,
    uploads: HashMap<String, (u64, CancellationToken)>,
    polls: HashMap<String, (u64, CancellationToken)>,
}

impl TaskRegistry {
    fn tasks(&mut self, kind: TaskKind) -> &mut HashMap<String, (u64, CancellationToken)> {
        match kind {
            TaskKind::Upload => &mut self.uploads,
            TaskKind::Poll => &mut self.polls,
        }
    }

    /// Registers a task for `key`, cancelling any earlier task with the same key.
    fn start(
        &mut self,
        kind: TaskKind,
        key: &str,
        parent: &CancellationToken,
    ) -> (u64, CancellationToken) {
        self.next_id += 1;
        let id = self.next_id;
        let token = parent.child_token();
        let previous = self.tasks(kind).insert(key.to_string(), (id, token.clone()));
        if let Some((_, previous)) = previous {
            previous.cancel();
        }
        (id, token)
    }

    fn cancel(&mut self, kind: TaskKind, key: &str) -> bool {
        match self.tasks(kind).remove(key) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Forgets a task that ended, unless a newer task took over its key.
    fn finish(&mut self, kind: TaskKind, key: &str, id: u64) {
        let tasks = self.tasks(kind);
        if tasks.get(key).is_some_and(|(current, _)| *current == id) {
            tasks.remove(key);
        }
    }

    fn len(&self) -> usize {
        self.uploads.len() + self.polls.len()
    }
}

#[derive(Clone, Default)]
struct SharedTasks(Arc<Mutex<TaskRegistry>>);

impl SharedTasks {
    fn lock(&self) -> MutexGuard<'_, TaskRegistry> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start(&self, kind: TaskKind, key: &str, parent: &CancellationToken) -> TaskSlot {
        let (id, token) = self.lock().start(kind, key, parent);
        TaskSlot {
            tasks: self.clone(),
            kind,
            key: key.to_string(),
            id,
            token,
        }
    }
}

/// Held by a running task; drops its registry entry however the task ends.
struct TaskSlot {
    tasks: SharedTasks,
    kind: TaskKind,
    key: String,
    id: u64,
    token: CancellationToken,
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.tasks.lock().finish(self.kind, &self.key, self.id);
    }
}

/// Owns the engine thread. Commands are applied in the order they are sent;
/// remote work runs as tasks on the engine's tokio runtime and reports back
/// through [`EngineHandle::try_recv`].
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    tasks: SharedTasks,
}

impl EngineHandle {
    pub fn start(parts: EngineParts, settings: EngineSettings) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        let tasks = SharedTasks::default();
        let mut worker = Worker {
            api: parts.api,
            cache: parts.cache,
            recorder: parts.recorder,
            settings: Arc::new(settings),
            sink: Arc::new(ChannelEventSink::new(event_tx)),
            root: CancellationToken::new(),
            tasks: tasks.clone(),
        };

        thread::Builder::new()
            .name("neurolearn-engine".to_string())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    if !worker.handle(&runtime, command) {
                        break;
                    }
                }
                worker.root.cancel();
                runtime.shutdown_timeout(Duration::from_millis(500));
            })?;

        Ok(Self {
            cmd_tx,
            event_rx,
            tasks,
        })
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }

    pub fn check_connection(&self) {
        self.send(EngineCommand::CheckConnection);
    }

    pub fn upload(&self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.send(EngineCommand::Upload {
            name: name.into(),
            path: path.into(),
        });
    }

    pub fn cancel_upload(&self, name: impl Into<String>) {
        self.send(EngineCommand::CancelUpload { name: name.into() });
    }

    pub fn poll_status(&self, filename: impl Into<String>) {
        self.send(EngineCommand::PollStatus {
            filename: filename.into(),
        });
    }

    pub fn cancel_polling(&self, filename: impl Into<String>) {
        self.send(EngineCommand::CancelPolling {
            filename: filename.into(),
        });
    }

    /// One status check without polling.
    pub fn check_status(&self, filename: impl Into<String>) {
        self.send(EngineCommand::CheckStatus {
            filename: filename.into(),
        });
    }

    pub fn invalidate(&self, event: InvalidationEvent) {
        self.send(EngineCommand::Invalidate(event));
    }

    pub fn load_summary(&self, request_id: RequestId, force: bool) {
        self.send(EngineCommand::LoadSummary { request_id, force });
    }

    pub fn load_links(&self, request_id: RequestId, force: bool) {
        self.send(EngineCommand::LoadLinks { request_id, force });
    }

    pub fn load_files(&self, request_id: RequestId, force: bool) {
        self.send(EngineCommand::LoadFiles { request_id, force });
    }

    pub fn load_chat_history(&self) {
        self.send(EngineCommand::LoadChatHistory);
    }

    pub fn persist_chat(&self, records: Vec<ChatRecord>) {
        self.send(EngineCommand::PersistChat(records));
    }

    pub fn ask(&self, request_id: RequestId, question: impl Into<String>, file_name: Option<String>) {
        self.send(EngineCommand::Ask {
            request_id,
            question: question.into(),
            file_name,
        });
    }

    pub fn start_recording(&self) {
        self.send(EngineCommand::StartRecording);
    }

    pub fn finish_recording(&self, request_id: RequestId, file_name: Option<String>) {
        self.send(EngineCommand::FinishRecording {
            request_id,
            file_name,
        });
    }

    pub fn speak_reply(&self, text: impl Into<String>) {
        self.send(EngineCommand::SpeakReply { text: text.into() });
    }

    pub fn speak_summary(&self, text: impl Into<String>) {
        self.send(EngineCommand::SpeakSummary { text: text.into() });
    }

    pub fn generate_assessment(&self, request_id: RequestId) {
        self.send(EngineCommand::GenerateAssessment { request_id });
    }

    pub fn submit_assessment(
        &self,
        request_id: RequestId,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) {
        self.send(EngineCommand::SubmitAssessment {
            request_id,
            question: question.into(),
            answer: answer.into(),
        });
    }

    /// Cancels every polling loop and progress ticker and stops the engine thread.
    pub fn shutdown(&self) {
        self.send(EngineCommand::Shutdown);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// `Ok(None)` when nothing arrived within `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<EngineEvent>, EngineStopped> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(EngineStopped),
        }
    }

    /// Uploads and status polls that have not ended yet.
    pub fn running_tasks(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    api: Arc<dyn LearningApi>,
    cache: Arc<ContentCache>,
    recorder: Arc<dyn AudioRecorder>,
    settings: Arc<EngineSettings>,
    sink: Arc<ChannelEventSink>,
    root: CancellationToken,
    tasks: SharedTasks,
}

impl Worker {
    /// Applies one command. Returns false once the engine should stop.
    fn handle(&mut self, runtime: &Runtime, command: EngineCommand) -> bool {
        match command {
            EngineCommand::CheckConnection => {
                let api = self.api.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    let connected = api.test_connection().await;
                    learn_info!("Backend connected: {}", connected);
                    sink.emit(EngineEvent::ConnectionChecked { connected });
                });
            }
            EngineCommand::Upload { name, path } => {
                let slot = self.tasks.start(TaskKind::Upload, &name, &self.root);
                runtime.spawn(run_upload(
                    self.api.clone(),
                    self.sink.clone(),
                    self.settings.clone(),
                    slot,
                    name,
                    path,
                ));
            }
            EngineCommand::CancelUpload { name } => {
                if self.tasks.lock().cancel(TaskKind::Upload, &name) {
                    learn_debug!("Cancelled upload of {}", name);
                }
            }
            EngineCommand::PollStatus { filename } => {
                let slot = self.tasks.start(TaskKind::Poll, &filename, &self.root);
                let api = self.api.clone();
                let sink = self.sink.clone();
                let settings = self.settings.clone();
                runtime.spawn(async move {
                    let outcome = poll_processing_status(
                        api.as_ref(),
                        &filename,
                        &settings.poll,
                        &slot.token,
                        sink.as_ref(),
                    )
                    .await;
                    learn_debug!("Polling for {} ended: {:?}", filename, outcome);
                    drop(slot);
                });
            }
            EngineCommand::CancelPolling { filename } => {
                if self.tasks.lock().cancel(TaskKind::Poll, &filename) {
                    learn_debug!("Cancelled status polling for {}", filename);
                }
            }
            EngineCommand::CheckStatus { filename } => {
                let api = self.api.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    let event = match api.check_processing_status(&filename).await {
                        Ok(status) => EngineEvent::ProcessingStatus { filename, status },
                        Err(error) => EngineEvent::StatusCheckFailed {
                            filename,
                            error,
                            gave_up: true,
                        },
                    };
                    sink.emit(event);
                });
            }
            EngineCommand::Invalidate(event) => {
                // Applied inline so loads queued after it cannot read stale entries.
                self.cache.invalidate_for(event);
            }
            EngineCommand::LoadSummary { request_id, force } => {
                let api = self.api.clone();
                let cache = self.cache.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    let result = cache
                        .get_or_fetch(CacheKey::SummaryText, force, || api.get_text())
                        .await;
                    sink.emit(EngineEvent::SummaryLoaded { request_id, result });
                });
            }
            EngineCommand::LoadLinks { request_id, force } => {
                let api = self.api.clone();
                let cache = self.cache.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    let result = cache
                        .get_or_fetch(CacheKey::ReferenceLinks, force, || api.get_links())
                        .await;
                    sink.emit(EngineEvent::LinksLoaded { request_id, result });
                });
            }
            EngineCommand::LoadFiles { request_id, force } => {
                let api = self.api.clone();
                let cache = self.cache.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    let result = cache
                        .get_or_fetch(CacheKey::AvailableFiles, force, || api.list_files())
                        .await;
                    sink.emit(EngineEvent::FilesLoaded { request_id, result });
                });
            }
            EngineCommand::LoadChatHistory => {
                let records = self
                    .cache
                    .read::<Vec<ChatRecord>>(CacheKey::ChatHistory)
                    .unwrap_or_default();
                self.sink.emit(EngineEvent::ChatHistoryLoaded { records });
            }
            EngineCommand::PersistChat(records) => {
                self.cache.write(CacheKey::ChatHistory, &records);
            }
            EngineCommand::Ask {
                request_id,
                question,
                file_name,
            } => {
                let api = self.api.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    let result = api.ask_question(&question, file_name.as_deref()).await;
                    sink.emit(EngineEvent::AnswerReady { request_id, result });
                });
            }
            EngineCommand::StartRecording => {
                if let Err(err) = self.recorder.start() {
                    learn_warn!("Could not start recording: {}", err);
                    self.sink.emit(EngineEvent::RecordingFailed {
                        message: err.to_string(),
                    });
                }
            }
            EngineCommand::FinishRecording {
                request_id,
                file_name,
            } => match self.recorder.stop() {
                Ok(clip) => {
                    let api = self.api.clone();
                    let sink = self.sink.clone();
                    runtime.spawn(async move {
                        let result = api.qa_voice(clip, file_name.as_deref()).await;
                        sink.emit(EngineEvent::VoiceAnswerReady { request_id, result });
                    });
                }
                Err(err) => {
                    learn_warn!("Could not finish recording: {}", err);
                    self.sink.emit(EngineEvent::VoiceAnswerReady {
                        request_id,
                        result: Err(ApiError::new(FailureKind::Recording, err.to_string())),
                    });
                }
            },
            EngineCommand::SpeakReply { text } => {
                let api = self.api.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    emit_speech(sink.as_ref(), api.qa_tts(&text).await);
                });
            }
            EngineCommand::SpeakSummary { text } => {
                let api = self.api.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    emit_speech(sink.as_ref(), api.learning_tts(&text).await);
                });
            }
            EngineCommand::GenerateAssessment { request_id } => {
                let api = self.api.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    let result = api.generate_assessment().await;
                    sink.emit(EngineEvent::AssessmentGenerated { request_id, result });
                });
            }
            EngineCommand::SubmitAssessment {
                request_id,
                question,
                answer,
            } => {
                let api = self.api.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    let result = api.submit_assessment(&question, &answer).await;
                    sink.emit(EngineEvent::AssessmentGraded { request_id, result });
                });
            }
            EngineCommand::Shutdown => {
                learn_info!("Engine shutting down");
                return false;
            }
        }
        true
    }
}

async fn run_upload(
    api: Arc<dyn LearningApi>,
    sink: Arc<ChannelEventSink>,
    settings: Arc<EngineSettings>,
    slot: TaskSlot,
    name: String,
    path: PathBuf,
) {
    let token = slot.token.clone();
    let ticker = token.child_token();
    let progress = {
        let sink = sink.clone();
        let ticker = ticker.clone();
        let name = name.clone();
        let settings = settings.clone();
        tokio::spawn(async move {
            simulate_upload_progress(&name, &settings.progress, &ticker, sink.as_ref()).await;
        })
    };

    learn_info!("Uploading {} from {:?}", name, path);
    let result = tokio::select! {
        _ = token.cancelled() => {
            learn_debug!("Upload of {} cancelled", name);
            return;
        }
        result = upload_from_path(api.as_ref(), &name, &path) => result,
    };

    ticker.cancel();
    let _ = progress.await;

    match &result {
        Ok(receipt) => learn_info!("Upload of {} accepted as {:?}", name, receipt.filename),
        Err(err) => learn_warn!("Upload of {} failed: {}", name, err),
    }
    drop(slot);
    sink.emit(EngineEvent::UploadFinished { name, result });
}

async fn upload_from_path(
    api: &dyn LearningApi,
    name: &str,
    path: &Path,
) -> Result<crate::UploadReceipt, ApiError> {
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        ApiError::new(
            FailureKind::Io,
            format!("Could not read {}: {err}", path.display()),
        )
    })?;
    api.upload_file(name, bytes).await
}

/// Speech is best-effort: a failure is reported but never surfaces as an error.
fn emit_speech(sink: &dyn EventSink, result: Result<String, ApiError>) {
    match result {
        Ok(audio_url) => sink.emit(EngineEvent::SpeechReady { audio_url }),
        Err(err) => {
            learn_debug!("TTS not available: {}", err);
            sink.emit(EngineEvent::SpeechUnavailable {
                message: err.to_string(),
            });
        }
    }
}

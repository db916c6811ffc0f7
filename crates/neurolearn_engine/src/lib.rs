//! NeuroLearn engine: backend client, content cache and effect execution.
mod api;
mod cache;
mod engine;
mod links;
mod persist;
mod poll;
mod progress;
mod recorder;
mod types;

pub use api::{ApiSettings, LearningApi, ReqwestApiClient, DEFAULT_BASE_URL};
pub use cache::{
    CacheKey, CachePolicy, CacheStore, Clock, ContentCache, FileCacheStore, InvalidationEvent,
    ManualClock, MemoryCacheStore, SystemClock,
};
pub use engine::{
    ChannelEventSink, EngineHandle, EngineParts, EngineSettings, EngineStopped, EventSink,
};
pub use links::title_from_url;
pub use persist::{ensure_cache_dir, CacheDir, PersistError};
pub use poll::{poll_processing_status, PollOutcome, PollSettings};
pub use progress::{simulate_upload_progress, ProgressSettings};
pub use recorder::{AudioClip, AudioRecorder, ClipFileRecorder, RecorderError};
pub use types::{
    ApiError, AssessmentFeedback, AssessmentQuestion, ChatRecord, ChatRole, EngineEvent,
    FailureKind, FileInfo, Loaded, ProcessingState, ProcessingStatus, QaAnswer, ReferenceLink,
    RequestId, UploadReceipt, VoiceAnswer,
};

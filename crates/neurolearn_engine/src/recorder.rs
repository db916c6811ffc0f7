use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("a recording is already in progress")]
    AlreadyRecording,
    #[error("no recording in progress")]
    NotRecording,
    #[error("no audio input available")]
    NoInput,
    #[error("could not read audio: {0}")]
    Io(#[from] io::Error),
}

/// Captures one voice clip at a time: `start`, then `stop` to collect the clip.
pub trait AudioRecorder: Send + Sync {
    fn start(&self) -> Result<(), RecorderError>;
    fn stop(&self) -> Result<AudioClip, RecorderError>;
    fn is_recording(&self) -> bool;
}

#[derive(Debug, Default)]
struct ClipState {
    armed: Option<PathBuf>,
    recording: bool,
}

/// Recorder whose "microphone" is a pre-recorded clip on disk.
///
/// [`ClipFileRecorder::arm`] selects the clip delivered by the next `stop`.
#[derive(Debug, Default)]
pub struct ClipFileRecorder {
    state: Mutex<ClipState>,
}

impl ClipFileRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self, clip: impl Into<PathBuf>) {
        self.lock().armed = Some(clip.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClipState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl AudioRecorder for ClipFileRecorder {
    fn start(&self) -> Result<(), RecorderError> {
        let mut state = self.lock();
        if state.recording {
            return Err(RecorderError::AlreadyRecording);
        }
        if state.armed.is_none() {
            return Err(RecorderError::NoInput);
        }
        state.recording = true;
        Ok(())
    }

    fn stop(&self) -> Result<AudioClip, RecorderError> {
        let path = {
            let mut state = self.lock();
            if !state.recording {
                return Err(RecorderError::NotRecording);
            }
            state.recording = false;
            state.armed.take().ok_or(RecorderError::NoInput)?
        };

        let bytes = fs::read(&path)?;
        Ok(AudioClip {
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "recording.webm".to_string()),
            mime: mime_for(&path).to_string(),
            bytes,
        })
    }

    fn is_recording(&self) -> bool {
        self.lock().recording
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "webm" => "audio/webm",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" | "oga" => "audio/ogg",
        "m4a" => "audio/mp4",
        _ => "application/octet-stream",
    }
}

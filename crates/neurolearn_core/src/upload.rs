use std::path::PathBuf;

/// Largest document accepted for upload.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Progress shown while the upload call is still in flight.
pub const SIMULATED_PROGRESS_CAP: u8 = 90;

/// A file the user picked or dropped, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub mime: Option<String>,
    pub location: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotPdf,
    TooLarge,
}

impl SelectedFile {
    pub fn validate(&self) -> Result<(), Rejection> {
        let pdf_mime = self.mime.as_deref().is_some_and(|mime| mime.contains("pdf"));
        if !pdf_mime && !self.name.ends_with(".pdf") {
            return Err(Rejection::NotPdf);
        }
        if self.size > MAX_UPLOAD_BYTES {
            return Err(Rejection::TooLarge);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionStats {
    pub accepted: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState {
    Processing,
    Completed,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Uploading,
    /// Accepted, but the backend named no document to track.
    Uploaded,
    Processing,
    Completed,
    NotFound,
    Failed,
}

impl UploadPhase {
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            UploadPhase::Uploaded
                | UploadPhase::Completed
                | UploadPhase::NotFound
                | UploadPhase::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    pub progress: u8,
    pub phase: UploadPhase,
    /// Name the backend filed the document under; status polling uses it.
    pub server_name: Option<String>,
    pub status_message: Option<String>,
    pub error: Option<String>,
}

impl UploadedFile {
    pub(crate) fn new(selected: &SelectedFile) -> Self {
        Self {
            name: selected.name.clone(),
            size: selected.size,
            progress: 0,
            phase: UploadPhase::Uploading,
            server_name: None,
            status_message: None,
            error: None,
        }
    }

    /// Simulated progress only ever moves forward and stays under the cap.
    pub(crate) fn advance_progress(&mut self, percent: u8) -> bool {
        if self.phase != UploadPhase::Uploading {
            return false;
        }
        let next = percent.min(SIMULATED_PROGRESS_CAP).max(self.progress);
        let changed = next != self.progress;
        self.progress = next;
        changed
    }

    pub(crate) fn is_polling(&self) -> bool {
        self.phase == UploadPhase::Processing && self.server_name.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected(name: &str, size: u64, mime: Option<&str>) -> SelectedFile {
        SelectedFile {
            name: name.to_string(),
            size,
            mime: mime.map(ToOwned::to_owned),
            location: PathBuf::from(name),
        }
    }

    #[test]
    fn pdf_by_mime_or_extension() {
        assert_eq!(selected("notes.pdf", 10, None).validate(), Ok(()));
        assert_eq!(selected("scan", 10, Some("application/pdf")).validate(), Ok(()));
        assert_eq!(
            selected("notes.docx", 10, Some("application/msword")).validate(),
            Err(Rejection::NotPdf)
        );
    }

    #[test]
    fn size_limit_is_inclusive() {
        assert_eq!(selected("a.pdf", MAX_UPLOAD_BYTES, None).validate(), Ok(()));
        assert_eq!(
            selected("a.pdf", MAX_UPLOAD_BYTES + 1, None).validate(),
            Err(Rejection::TooLarge)
        );
    }

    #[test]
    fn progress_is_capped_and_monotonic() {
        let mut file = UploadedFile::new(&selected("a.pdf", 1, None));
        assert!(file.advance_progress(40));
        assert!(!file.advance_progress(30));
        assert_eq!(file.progress, 40);
        file.advance_progress(100);
        assert_eq!(file.progress, SIMULATED_PROGRESS_CAP);
    }
}

use std::time::Duration;

use neurolearn_logging::{learn_debug, learn_warn};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::links::{normalize_files, normalize_links, RawFileEntry, RawLink};
use crate::recorder::AudioClip;
use crate::{
    ApiError, AssessmentFeedback, AssessmentQuestion, FailureKind, FileInfo, ProcessingStatus,
    QaAnswer, ReferenceLink, UploadReceipt, VoiceAnswer,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// One operation per backend capability. No retries: callers decide re-invocation.
#[async_trait::async_trait]
pub trait LearningApi: Send + Sync {
    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>)
        -> Result<UploadReceipt, ApiError>;

    async fn list_files(&self) -> Result<Vec<FileInfo>, ApiError>;

    async fn ask_question(
        &self,
        question: &str,
        file_name: Option<&str>,
    ) -> Result<QaAnswer, ApiError>;

    async fn get_text(&self) -> Result<String, ApiError>;

    async fn get_links(&self) -> Result<Vec<ReferenceLink>, ApiError>;

    async fn generate_assessment(&self) -> Result<AssessmentQuestion, ApiError>;

    async fn submit_assessment(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<AssessmentFeedback, ApiError>;

    /// Returns the URL of the synthesized audio.
    async fn learning_tts(&self, text: &str) -> Result<String, ApiError>;

    /// Returns the URL of the synthesized audio.
    async fn qa_tts(&self, text: &str) -> Result<String, ApiError>;

    async fn qa_voice(
        &self,
        clip: AudioClip,
        file_name: Option<&str>,
    ) -> Result<VoiceAnswer, ApiError>;

    async fn check_processing_status(&self, filename: &str)
        -> Result<ProcessingStatus, ApiError>;

    /// True when the backend answers the file listing.
    async fn test_connection(&self) -> bool {
        match self.list_files().await {
            Ok(_) => true,
            Err(err) => {
                learn_warn!("Backend connection test failed: {}", err);
                false
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestApiClient {
    base: Url,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct TextBody {
    #[serde(default)]
    script_text: Option<String>,
}

#[derive(Deserialize)]
struct LinksBody {
    #[serde(default)]
    links: Option<Vec<RawLink>>,
}

#[derive(Deserialize)]
struct QaBody {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    sources: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct VoiceBody {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    response: String,
    #[serde(default, rename = "audioUrl")]
    audio_url: Option<String>,
}

#[derive(Deserialize)]
struct TtsBody {
    #[serde(default)]
    audio_url: Option<String>,
    #[serde(default, rename = "audioUrl")]
    audio_url_camel: Option<String>,
}

impl ReqwestApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot be used as a base url", settings.base_url),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was rejected in new().
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, fallback))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_body(status.as_u16(), &body, fallback));
        }

        let body = response
            .text()
            .await
            .map_err(|err| map_reqwest_error(err, fallback))?;
        serde_json::from_str(&body).map_err(|err| {
            learn_warn!("{}: could not decode response body: {}", fallback, err);
            ApiError::new(FailureKind::InvalidResponse, fallback)
        })
    }

    async fn speak(&self, route: &str, text: &str) -> Result<String, ApiError> {
        const FALLBACK: &str = "TTS failed";
        let body: TtsBody = self
            .send_json(
                self.client
                    .post(self.endpoint(&["api", route]))
                    .json(&json!({ "text": text })),
                FALLBACK,
            )
            .await?;
        body.audio_url
            .or(body.audio_url_camel)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ApiError::new(FailureKind::InvalidResponse, FALLBACK))
    }
}

#[async_trait::async_trait]
impl LearningApi for ReqwestApiClient {
    async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, ApiError> {
        const FALLBACK: &str = "Upload failed";
        learn_debug!("POST /api/upload file={} bytes={}", file_name, bytes.len());
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|err| map_reqwest_error(err, FALLBACK))?;
        let form = Form::new().part("pdf", part);
        self.send_json(
            self.client
                .post(self.endpoint(&["api", "upload"]))
                .multipart(form),
            FALLBACK,
        )
        .await
    }

    async fn list_files(&self) -> Result<Vec<FileInfo>, ApiError> {
        let raw: Vec<RawFileEntry> = self
            .send_json(
                self.client.get(self.endpoint(&["api", "files"])),
                "Failed to fetch files",
            )
            .await?;
        Ok(normalize_files(raw))
    }

    async fn ask_question(
        &self,
        question: &str,
        file_name: Option<&str>,
    ) -> Result<QaAnswer, ApiError> {
        let mut payload = json!({ "question": question });
        if let Some(name) = file_name {
            payload["fileName"] = json!(name);
        }
        let body: QaBody = self
            .send_json(
                self.client
                    .post(self.endpoint(&["api", "qa"]))
                    .json(&payload),
                "Failed to get answer",
            )
            .await?;
        Ok(QaAnswer {
            answer: body.answer.or(body.response).unwrap_or_default(),
            sources: body.sources.unwrap_or_default(),
        })
    }

    async fn get_text(&self) -> Result<String, ApiError> {
        let body: TextBody = self
            .send_json(
                self.client.get(self.endpoint(&["api", "get_text"])),
                "Failed to fetch text",
            )
            .await?;
        Ok(body.script_text.unwrap_or_default())
    }

    async fn get_links(&self) -> Result<Vec<ReferenceLink>, ApiError> {
        let body: LinksBody = self
            .send_json(
                self.client.get(self.endpoint(&["api", "get_links"])),
                "Failed to fetch links",
            )
            .await?;
        Ok(normalize_links(body.links.unwrap_or_default()))
    }

    async fn generate_assessment(&self) -> Result<AssessmentQuestion, ApiError> {
        self.send_json(
            self.client
                .get(self.endpoint(&["api", "assessment", "generate"])),
            "Failed to generate assessment",
        )
        .await
    }

    async fn submit_assessment(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<AssessmentFeedback, ApiError> {
        self.send_json(
            self.client
                .post(self.endpoint(&["api", "assessment", "submit"]))
                .json(&json!({ "question": question, "answer": answer })),
            "Failed to submit assessment",
        )
        .await
    }

    async fn learning_tts(&self, text: &str) -> Result<String, ApiError> {
        self.speak("learning-tts", text).await
    }

    async fn qa_tts(&self, text: &str) -> Result<String, ApiError> {
        self.speak("qa-tts", text).await
    }

    async fn qa_voice(
        &self,
        clip: AudioClip,
        file_name: Option<&str>,
    ) -> Result<VoiceAnswer, ApiError> {
        const FALLBACK: &str = "Voice processing failed";
        let part = Part::bytes(clip.bytes)
            .file_name(clip.file_name)
            .mime_str(&clip.mime)
            .map_err(|err| map_reqwest_error(err, FALLBACK))?;
        let mut form = Form::new().part("audio", part);
        if let Some(name) = file_name {
            form = form.text("fileName", name.to_string());
        }
        let body: VoiceBody = self
            .send_json(
                self.client
                    .post(self.endpoint(&["api", "qa-voice"]))
                    .multipart(form),
                FALLBACK,
            )
            .await?;
        Ok(VoiceAnswer {
            transcript: body.transcript,
            response: body.response,
            audio_url: body.audio_url,
        })
    }

    async fn check_processing_status(
        &self,
        filename: &str,
    ) -> Result<ProcessingStatus, ApiError> {
        self.send_json(
            self.client
                .get(self.endpoint(&["api", "processing-status", filename])),
            "Failed to check processing status",
        )
        .await
    }
}

/// Error bodies are expected as `{"error": "..."}`; anything else falls back.
fn error_from_body(status: u16, body: &str, fallback: &str) -> ApiError {
    let server_message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(serde_json::Value::as_str)
                .map(ToOwned::to_owned)
        })
        .filter(|message| !message.is_empty());

    ApiError::new(
        FailureKind::HttpStatus(status),
        server_message.unwrap_or_else(|| fallback.to_string()),
    )
}

fn map_reqwest_error(err: reqwest::Error, fallback: &str) -> ApiError {
    learn_warn!("{}: {}", fallback, err);
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, fallback);
    }
    ApiError::new(FailureKind::Network, fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_field_wins() {
        let err = error_from_body(400, r#"{"error": "No file part"}"#, "Upload failed");
        assert_eq!(err.kind, FailureKind::HttpStatus(400));
        assert_eq!(err.message, "No file part");
    }

    #[test]
    fn non_json_error_body_uses_fallback() {
        let err = error_from_body(502, "<html>Bad Gateway</html>", "Failed to fetch text");
        assert_eq!(err.message, "Failed to fetch text");
    }

    #[test]
    fn endpoint_encodes_filename_segment() {
        let client = ReqwestApiClient::new(&ApiSettings {
            base_url: "http://localhost:5000/".to_string(),
            ..ApiSettings::default()
        })
        .unwrap();
        let url = client.endpoint(&["api", "processing-status", "my notes#1.pdf"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/processing-status/my%20notes%231.pdf"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        let err = ReqwestApiClient::new(&ApiSettings {
            base_url: "mailto:someone@example.com".to_string(),
            ..ApiSettings::default()
        })
        .unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidUrl);
    }
}

use std::time::Duration;

use neurolearn_engine::{
    ApiSettings, AudioClip, FailureKind, LearningApi, ProcessingState, ReqwestApiClient,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ReqwestApiClient {
    neurolearn_logging::initialize_for_tests();
    ReqwestApiClient::new(&ApiSettings {
        base_url: server.uri(),
        ..ApiSettings::default()
    })
    .expect("client")
}

#[tokio::test]
async fn upload_sends_pdf_form_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(body_string_contains("name=\"pdf\""))
        .and(body_string_contains("filename=\"notes.pdf\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "File uploaded",
            "filename": "notes.pdf",
            "status": "ok"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = client_for(&server)
        .upload_file("notes.pdf", b"%PDF-1.7".to_vec())
        .await
        .expect("upload ok");
    assert_eq!(receipt.filename, "notes.pdf");
    assert_eq!(receipt.status, "ok");
    assert_eq!(receipt.file_id, None);
}

#[tokio::test]
async fn upload_surfaces_server_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "No file part" })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .upload_file("notes.pdf", Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(400));
    assert_eq!(err.message, "No file part");
}

#[tokio::test]
async fn error_without_json_body_uses_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_text"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_text().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
    assert_eq!(err.message, "Failed to fetch text");
}

#[tokio::test]
async fn list_files_accepts_names_and_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "_id": "a1", "filename": "keph101.pdf", "uploadDate": "2024-05-01", "size": 2048 },
            "notes.pdf"
        ])))
        .mount(&server)
        .await;

    let files = client_for(&server).list_files().await.expect("files");
    let names: Vec<_> = files.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["keph101.pdf", "notes.pdf"]);
    assert_eq!(files[0].size, 2048);
}

#[tokio::test]
async fn ask_question_sends_file_context_and_reads_response_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/qa"))
        .and(body_json(json!({ "question": "What is inertia?", "fileName": "keph101.pdf" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "Resistance to change in motion."
        })))
        .mount(&server)
        .await;

    let answer = client_for(&server)
        .ask_question("What is inertia?", Some("keph101.pdf"))
        .await
        .expect("answer");
    assert_eq!(answer.answer, "Resistance to change in motion.");
    assert!(answer.sources.is_empty());
}

#[tokio::test]
async fn ask_question_without_file_omits_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/qa"))
        .and(body_json(json!({ "question": "Why?" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "Because.",
            "sources": ["page 3"]
        })))
        .mount(&server)
        .await;

    let answer = client_for(&server)
        .ask_question("Why?", None)
        .await
        .expect("answer");
    assert_eq!(answer.answer, "Because.");
    assert_eq!(answer.sources, vec!["page 3".to_string()]);
}

#[tokio::test]
async fn get_text_defaults_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_text"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    assert_eq!(client_for(&server).get_text().await.unwrap(), "");
}

#[tokio::test]
async fn get_links_normalizes_bare_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_links"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "links": [
                "https://www.physicsclassroom.com/",
                "https://example.org/topics/laws_of-motion.html",
                { "title": "Friction", "url": "https://example.org/f" }
            ]
        })))
        .mount(&server)
        .await;

    let links = client_for(&server).get_links().await.expect("links");
    let titles: Vec<_> = links.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["physicsclassroom.com", "laws of motion", "Friction"]);
}

#[tokio::test]
async fn assessment_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/assessment/generate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "question": "Define velocity." })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/assessment/submit"))
        .and(body_json(json!({ "question": "Define velocity.", "answer": "Speed with direction." })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "feedback": "Correct." })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let question = client.generate_assessment().await.expect("question");
    let feedback = client
        .submit_assessment(&question.question, "Speed with direction.")
        .await
        .expect("feedback");
    assert_eq!(feedback.feedback, "Correct.");
}

#[tokio::test]
async fn tts_accepts_both_url_spellings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/learning-tts"))
        .and(body_json(json!({ "text": "summary" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "audio_url": "/audio/learn.mp3" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/qa-tts"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "audioUrl": "/audio/qa.mp3" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.learning_tts("summary").await.unwrap(), "/audio/learn.mp3");
    assert_eq!(client.qa_tts("reply").await.unwrap(), "/audio/qa.mp3");
}

#[tokio::test]
async fn tts_without_url_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/qa-tts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = client_for(&server).qa_tts("reply").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidResponse);
    assert_eq!(err.message, "TTS failed");
}

#[tokio::test]
async fn voice_question_uploads_audio_and_file_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/qa-voice"))
        .and(body_string_contains("name=\"audio\""))
        .and(body_string_contains("name=\"fileName\""))
        .and(body_string_contains("keph101.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transcript": "what is force",
            "response": "A push or a pull.",
            "audioUrl": "/audio/1.mp3"
        })))
        .mount(&server)
        .await;

    let clip = AudioClip {
        file_name: "question.webm".to_string(),
        mime: "audio/webm".to_string(),
        bytes: b"webm-bytes".to_vec(),
    };
    let answer = client_for(&server)
        .qa_voice(clip, Some("keph101.pdf"))
        .await
        .expect("voice answer");
    assert_eq!(answer.transcript, "what is force");
    assert_eq!(answer.response, "A push or a pull.");
    assert_eq!(answer.audio_url.as_deref(), Some("/audio/1.mp3"));
}

#[tokio::test]
async fn processing_status_escapes_filename() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/processing-status/chapter%201.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "not_found",
            "message": "No such document"
        })))
        .mount(&server)
        .await;

    let status = client_for(&server)
        .check_processing_status("chapter 1.pdf")
        .await
        .expect("status");
    assert_eq!(status.status, ProcessingState::NotFound);
    assert_eq!(status.message, "No such document");
    assert_eq!(status.has_explanation, None);
}

#[tokio::test]
async fn unknown_status_value_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/processing-status/a.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "queued" })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .check_processing_status("a.pdf")
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidResponse);
    assert_eq!(err.message, "Failed to check processing status");
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!([])),
        )
        .mount(&server)
        .await;

    neurolearn_logging::initialize_for_tests();
    let client = ReqwestApiClient::new(&ApiSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..ApiSettings::default()
    })
    .unwrap();

    let err = client.list_files().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
    assert!(!client.test_connection().await);
}

#[tokio::test]
async fn connection_test_succeeds_when_files_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(client_for(&server).test_connection().await);
}

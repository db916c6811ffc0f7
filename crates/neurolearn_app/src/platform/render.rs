//! Plain-text rendering of the view model.

use chrono::{DateTime, Utc};
use neurolearn_core::{
    AssessmentStage, AssessmentView, BackendStatus, ChatMessage, ChatRole, PanelView,
    ReferenceLink, SelectionStats, UploadPhase, UploadRowView,
};

const BAR_WIDTH: usize = 20;

pub fn backend_line(status: BackendStatus) -> &'static str {
    match status {
        BackendStatus::Unknown => "backend: checking...",
        BackendStatus::Connected => "backend: connected",
        BackendStatus::Disconnected => "backend: disconnected",
    }
}

pub fn selection_line(stats: SelectionStats) -> String {
    format!(
        "{} file(s) accepted, {} rejected",
        stats.accepted, stats.rejected
    )
}

pub fn upload_row(row: &UploadRowView) -> String {
    let filled = usize::from(row.progress.min(100)) * BAR_WIDTH / 100;
    let mut line = format!(
        "{:<32} {:>9} [{}{}] {:>3}% {}",
        row.name,
        format_size(row.size),
        "#".repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        row.progress,
        phase_label(row.phase),
    );
    if let Some(error) = &row.error {
        line.push_str(&format!(" ({error})"));
    } else if let Some(message) = row.status_message.as_deref().filter(|m| !m.is_empty()) {
        line.push_str(&format!(" - {message}"));
    }
    line
}

pub fn phase_label(phase: UploadPhase) -> &'static str {
    match phase {
        UploadPhase::Uploading => "uploading",
        UploadPhase::Uploaded => "uploaded",
        UploadPhase::Processing => "processing",
        UploadPhase::Completed => "ready",
        UploadPhase::NotFound => "not found",
        UploadPhase::Failed => "failed",
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f >= KB * KB {
        format!("{:.1} MB", bytes_f / (KB * KB))
    } else if bytes_f >= KB {
        format!("{:.1} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}

pub fn summary_block(panel: &PanelView<String>) -> String {
    if let Some(error) = &panel.error {
        return format!("error: {error}");
    }
    if panel.value.trim().is_empty() {
        return "No summary available yet. Upload a document first.".to_string();
    }
    panel.value.clone()
}

pub fn links_block(panel: &PanelView<Vec<ReferenceLink>>) -> String {
    if let Some(error) = &panel.error {
        return format!("error: {error}");
    }
    if panel.value.is_empty() {
        return "No reference links.".to_string();
    }
    panel
        .value
        .iter()
        .enumerate()
        .map(|(index, link)| {
            let mut entry = format!("{}. {}\n   {}", index + 1, link.title, link.url);
            if let Some(description) = link.description.as_deref().filter(|d| !d.is_empty()) {
                entry.push_str(&format!("\n   {description}"));
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn files_block(panel: &PanelView<Vec<String>>, selected: Option<&str>) -> String {
    if let Some(error) = &panel.error {
        return format!("error: {error}");
    }
    if panel.value.is_empty() {
        return "No documents uploaded.".to_string();
    }
    panel
        .value
        .iter()
        .map(|name| {
            let marker = if Some(name.as_str()) == selected { '*' } else { ' ' };
            format!("{marker} {name}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn chat_line(message: &ChatMessage) -> String {
    let speaker = match message.role {
        ChatRole::User => "you",
        ChatRole::Bot => "bot",
    };
    let time = i64::try_from(message.timestamp_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    format!("[{time}] {speaker}: {}", message.content)
}

pub fn assessment_block(view: &AssessmentView) -> String {
    let mut lines = Vec::new();
    match view.stage {
        AssessmentStage::Welcome => {
            lines.push("Test your understanding with a generated question.".to_string());
        }
        AssessmentStage::Question => {
            lines.push(format!("Question: {}", view.question));
        }
        AssessmentStage::Answer => {
            lines.push(format!("Question: {}", view.question));
            if !view.answer.is_empty() {
                lines.push(format!("Your answer: {}", view.answer));
            }
        }
        AssessmentStage::Feedback => {
            lines.push(format!("Question: {}", view.question));
            lines.push(format!("Your answer: {}", view.answer));
            lines.push(format!("Feedback: {}", view.feedback));
        }
    }
    if let Some(error) = &view.error {
        lines.push(format!("error: {error}"));
    }
    lines.join("\n")
}

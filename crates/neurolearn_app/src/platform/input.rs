use std::path::PathBuf;

/// One line typed into the interactive chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Empty,
    Quit,
    Files,
    Use(String),
    Voice(PathBuf),
    Ask(String),
    Unknown(String),
}

pub fn parse_chat_input(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ChatInput::Ask(line.to_string());
    };
    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, arg)| (name, arg.trim()));
    match (name, arg) {
        ("quit" | "exit", _) => ChatInput::Quit,
        ("files", _) => ChatInput::Files,
        ("use", file) if !file.is_empty() => ChatInput::Use(file.to_string()),
        ("voice", clip) if !clip.is_empty() => ChatInput::Voice(PathBuf::from(clip)),
        _ => ChatInput::Unknown(line.to_string()),
    }
}

/// MIME type sent with an upload; only PDFs are recognized.
pub fn guess_mime(name: &str) -> Option<String> {
    let (_, extension) = name.rsplit_once('.')?;
    extension
        .eq_ignore_ascii_case("pdf")
        .then(|| "application/pdf".to_string())
}

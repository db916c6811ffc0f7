#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: u64,
    pub role: ChatRole,
    pub content: String,
    pub timestamp_ms: u64,
}

/// Append-only conversation log. Entries keep insertion order and are never edited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl Transcript {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub(crate) fn push(&mut self, role: ChatRole, content: impl Into<String>, at_ms: u64) {
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id: self.next_id,
            role,
            content: content.into(),
            timestamp_ms: at_ms,
        });
    }

    /// Replaces the log with a persisted copy; ids continue after the highest restored id.
    pub(crate) fn restore(&mut self, messages: Vec<ChatMessage>) {
        self.next_id = messages.iter().map(|m| m.id).max().unwrap_or(0);
        self.messages = messages;
    }
}

pub(crate) fn greeting(selected_file: Option<&str>) -> String {
    match selected_file {
        Some(file) => format!("Heyy any doubts about {file}?"),
        None => "Heyy any doubts?".to_string(),
    }
}

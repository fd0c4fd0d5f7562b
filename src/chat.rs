use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::api::ChatMessage;

/// Number of recent turns sent with each provider request. Hard bound,
/// shared across providers so token cost stays uniform.
pub const HISTORY_WINDOW: usize = 10;

pub const SYSTEM_PROMPT_TEMPLATE: &str = "\
You are CodeMaster, a friendly terminal AI assistant. You chat naturally \
about any topic and help with programming when asked. When you produce \
code, emit complete working programs in fenced code blocks and mention \
that the user can ask you to save them to a file.\n\
Current date: {current_date}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl ConversationTurn {
    pub fn new(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            timestamp: Local::now(),
        }
    }
}

/// Builds the outgoing message sequence for one provider call: the system
/// prompt with today's date substituted, at most the last
/// [`HISTORY_WINDOW`] turns in original order, then the new user input.
pub fn assemble_context(
    system_template: &str,
    history: &[ConversationTurn],
    input: &str,
) -> Vec<ChatMessage> {
    let today = Local::now().format("%Y-%m-%d").to_string();
    let mut messages = Vec::with_capacity(history.len().min(HISTORY_WINDOW) + 2);

    messages.push(ChatMessage {
        role: "system".to_string(),
        content: system_template.replace("{current_date}", &today),
    });

    let start = history.len().saturating_sub(HISTORY_WINDOW);
    for turn in &history[start..] {
        messages.push(ChatMessage {
            role: turn.role.to_string(),
            content: turn.content.clone(),
        });
    }

    messages.push(ChatMessage {
        role: "user".to_string(),
        content: input.to_string(),
    });

    messages
}

/// Chat with the generative-AI assistant in the side panel
///
/// The model client itself is a collaborator behind `ChatService`; this module
/// keeps the conversation and turns replies into display HTML.
use std::sync::LazyLock;

use log::error;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

pub const CHAT_ERROR_MESSAGE: &str = "Sorry, the assistant could not answer. Please try again.";
pub const NO_API_KEY_MESSAGE: &str = "Add an API key in the settings to use the assistant.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

#[allow(async_fn_in_trait)]
pub trait ChatService {
    async fn send(&self, prompt: &str, history: &[ChatMessage]) -> Result<String, ChatError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    /// Blank prompt, nothing sent
    Ignored,
    Reply(String),
    /// Shown inline as an error bubble
    Failed(String),
}

pub struct ChatSession<C> {
    service: C,
    history: Vec<ChatMessage>,
}

impl<C: ChatService> ChatSession<C> {
    pub fn new(service: C) -> Self {
        ChatSession {
            service,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Send a prompt; the exchange is remembered only if the model answered
    pub async fn send(&mut self, prompt: &str) -> ChatOutcome {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return ChatOutcome::Ignored;
        }

        match self.service.send(prompt, &self.history).await {
            Ok(reply) => {
                self.history.push(ChatMessage {
                    role: ChatRole::User,
                    text: prompt.to_string(),
                });
                self.history.push(ChatMessage {
                    role: ChatRole::Model,
                    text: reply.clone(),
                });
                ChatOutcome::Reply(reply)
            }
            Err(ChatError::MissingApiKey) => ChatOutcome::Failed(NO_API_KEY_MESSAGE.to_string()),
            Err(e) => {
                error!("Assistant request failed: {}", e);
                ChatOutcome::Failed(CHAT_ERROR_MESSAGE.to_string())
            }
        }
    }
}

static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(\w+)?\n(.*?)```").expect("valid regex"));
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*]+)\*").expect("valid regex"));

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Minimal markdown for model replies: code, bold, italics, line breaks
pub fn format_reply(text: &str) -> String {
    let escaped = escape_html(text);
    let formatted = CODE_BLOCK.replace_all(&escaped, "<pre><code>$2</code></pre>");
    let formatted = INLINE_CODE.replace_all(&formatted, "<code>$1</code>");
    let formatted = BOLD.replace_all(&formatted, "<strong>$1</strong>");
    let formatted = ITALIC.replace_all(&formatted, "<em>$1</em>");
    format!("<div>{}</div>", formatted.replace('\n', "<br>"))
}

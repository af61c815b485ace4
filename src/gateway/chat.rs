//! Design consultation chat

use super::Gateway;
use crate::llm::Message;
use crate::session::{catalog, lenient, ChatMessage, ChatRole, ProjectParams};
use serde::{Deserialize, Serialize};

/// Reply used whenever the provider cannot answer
pub const CHAT_APOLOGY: &str =
    "I couldn't come up with an answer right now. Please try again in a moment.";

/// Style and parameters the consultant should take into account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignContext {
    #[serde(deserialize_with = "lenient::style")]
    pub style: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub params: ProjectParams,
}

impl Default for DesignContext {
    fn default() -> Self {
        Self {
            style: catalog::default_style(),
            params: ProjectParams::default(),
        }
    }
}

/// Transcript entry as sent by clients (extra fields such as ids are ignored)
///
/// Missing or unknown roles count as the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    #[serde(deserialize_with = "lenient::chat_role")]
    pub role: ChatRole,
    #[serde(deserialize_with = "lenient::or_default")]
    pub content: String,
}

impl From<&ChatMessage> for HistoryEntry {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatRequest {
    #[serde(deserialize_with = "lenient::list")]
    pub history: Vec<HistoryEntry>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub user_message: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub context: DesignContext,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatReply {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatReply {
    fn apology(error: &str) -> Self {
        Self {
            reply: CHAT_APOLOGY.to_string(),
            error: Some(error.to_string()),
        }
    }
}

fn system_prompt(context: &DesignContext) -> String {
    let params = &context.params;
    format!(
        "You are an interior design consultant. Answer briefly and practically.\n\
         Keep a collaborative tone and avoid long lists unless the user asks for them.\n\
         The project is a {room} of {area} m2 in the {style} style.\n\
         Budget: {budget}. Color palette: {palette}. Boldness: {boldness}.\n\
         Every recommendation must respect these constraints.",
        room = params.room_type,
        area = params.area_label(),
        style = context.style,
        budget = params.budget,
        palette = params.palette(", "),
        boldness = params.boldness,
    )
}

/// Provider messages for one chat turn
fn build_messages(request: &ChatRequest) -> Vec<Message> {
    let mut messages = vec![Message::system(system_prompt(&request.context))];

    // Transcripts must open with a user turn; the seeded greeting is dropped.
    let history = request
        .history
        .iter()
        .skip_while(|entry| entry.role == ChatRole::Assistant)
        .filter(|entry| !entry.content.trim().is_empty());
    for entry in history {
        messages.push(match entry.role {
            ChatRole::User => Message::user(&entry.content),
            ChatRole::Assistant => Message::assistant(&entry.content),
        });
    }

    messages.push(Message::user(&request.user_message));
    messages
}

impl Gateway {
    /// Answer one consultation turn; always yields a non-empty reply
    pub async fn chat(&self, request: &ChatRequest) -> ChatReply {
        let messages = build_messages(request);
        match self.provider.chat(&messages).await {
            Ok(response) if !response.text.trim().is_empty() => ChatReply {
                reply: response.text.trim().to_string(),
                error: None,
            },
            Ok(_) => {
                tracing::warn!("Chat provider returned an empty reply");
                ChatReply::apology("Empty response from provider")
            }
            Err(e) => {
                tracing::error!("Chat API error: {:#}", e);
                ChatReply::apology("Failed to generate response")
            }
        }
    }
}

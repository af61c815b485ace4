//! Simulation provider for offline runs and tests
//!
//! Registered as provider "sim". No API key required. Replies are scripted
//! per scenario, and every request is recorded so tests can assert what the
//! model would have received.

use super::{ImagePrompt, InlineImage, LlmError, LlmProvider, LlmResponse, Message, Role};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// 1x1 transparent PNG
pub const SIM_IMAGE_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

const SIM_SUGGESTIONS: &str = r#"[
  {"id": "s1", "title": "Anchor the seating", "description": "A low sofa grounds the room.",
   "items": ["Low linen sofa", "Wool rug", "Oak side table"], "tags": ["Furniture", "Layout"]},
  {"id": "s2", "title": "Layered light", "description": "Mix ambient and task lighting.",
   "items": ["Paper floor lamp", "2700K pendants", "Dimmers"], "tags": ["Lighting", "Mood"]},
  {"id": "s3", "title": "Texture play", "description": "Contrast matte and natural finishes.",
   "items": ["Raw oak", "Black steel", "Boucle cushions"], "tags": ["Materials", "Texture"]}
]"#;

/// Behaviour of the simulated model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimScenario {
    /// Well-formed answers for every call
    #[default]
    Normal,
    /// Every call fails with a service error
    Failure,
    /// Every call fails with quota exhaustion
    QuotaExceeded,
    /// Text answers are prose where JSON is expected; images come back empty
    Malformed,
}

impl SimScenario {
    /// Read the scenario from `DECOR_SIM_SCENARIO` (defaults to `Normal`)
    pub fn from_env() -> Self {
        match std::env::var("DECOR_SIM_SCENARIO")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "failure" | "error" => SimScenario::Failure,
            "quota" | "quota_exceeded" => SimScenario::QuotaExceeded,
            "malformed" => SimScenario::Malformed,
            _ => SimScenario::Normal,
        }
    }
}

#[derive(Default)]
pub struct SimProvider {
    scenario: SimScenario,
    /// Scripted text replies, consumed before the scenario defaults
    replies: Mutex<VecDeque<String>>,
    chat_log: Mutex<Vec<Vec<Message>>>,
    image_log: Mutex<Vec<ImagePrompt>>,
}

impl SimProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scenario(mut self, scenario: SimScenario) -> Self {
        self.scenario = scenario;
        self
    }

    /// Queue a text reply returned by the next chat call
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push_reply(reply);
        self
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.replies).push_back(reply.into());
    }

    /// Every chat request received so far
    pub fn chat_requests(&self) -> Vec<Vec<Message>> {
        lock(&self.chat_log).clone()
    }

    /// Every image request received so far
    pub fn image_requests(&self) -> Vec<ImagePrompt> {
        lock(&self.image_log).clone()
    }

    fn fail(&self) -> Option<anyhow::Error> {
        match self.scenario {
            SimScenario::Failure => {
                Some(LlmError::ServiceError("simulated outage".to_string()).into())
            }
            SimScenario::QuotaExceeded => {
                Some(LlmError::QuotaExceeded("simulated quota exhaustion".to_string()).into())
            }
            _ => None,
        }
    }

    fn respond(&self, messages: &[Message], json: bool) -> Result<LlmResponse> {
        lock(&self.chat_log).push(messages.to_vec());
        if let Some(err) = self.fail() {
            return Err(err);
        }
        if let Some(reply) = lock(&self.replies).pop_front() {
            return Ok(LlmResponse::text(reply));
        }
        if self.scenario == SimScenario::Malformed {
            return Ok(LlmResponse::text("Sure! Here are some ideas, no JSON today."));
        }
        if json {
            return Ok(LlmResponse::text(SIM_SUGGESTIONS));
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.lines().last().unwrap_or_default().trim())
            .unwrap_or_default();
        Ok(LlmResponse::text(format!("Design note: {}", last_user)))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LlmProvider for SimProvider {
    fn name(&self) -> &str {
        "sim"
    }

    async fn chat(&self, messages: &[Message]) -> Result<LlmResponse> {
        self.respond(messages, false)
    }

    async fn chat_json(&self, messages: &[Message]) -> Result<LlmResponse> {
        self.respond(messages, true)
    }

    async fn generate_image(&self, request: &ImagePrompt) -> Result<InlineImage> {
        lock(&self.image_log).push(request.clone());
        if let Some(err) = self.fail() {
            return Err(err);
        }
        if self.scenario == SimScenario::Malformed {
            return Err(LlmError::EmptyResponse("simulated empty image".to_string()).into());
        }
        Ok(InlineImage::new("image/png", SIM_IMAGE_PNG))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::is_quota_error;

    #[tokio::test]
    async fn test_scripted_reply_then_default() {
        let sim = SimProvider::new().with_reply("First");
        let first = sim.chat(&[Message::user("Hello")]).await.unwrap();
        assert_eq!(first.text, "First");

        let second = sim.chat(&[Message::user("Any tips?")]).await.unwrap();
        assert_eq!(second.text, "Design note: Any tips?");
        assert_eq!(sim.chat_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_json_reply_parses() {
        let sim = SimProvider::new();
        let reply = sim.chat_json(&[Message::user("JSON please")]).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&reply.text).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_quota_scenario() {
        let sim = SimProvider::new().with_scenario(SimScenario::QuotaExceeded);
        let err = sim
            .generate_image(&ImagePrompt::new("a room"))
            .await
            .unwrap_err();
        assert!(is_quota_error(&err));
        assert_eq!(sim.image_requests().len(), 1);
    }
}

//! Design session store
//!
//! A single state container per session, mutated only through [`Action`]s.
//! Every transition is a pure function of the previous state; no action can
//! fail.

pub mod catalog;
pub(crate) mod lenient;
mod types;

pub use types::*;

use serde::{Deserialize, Serialize};

pub const WELCOME_MESSAGE: &str = "Hi! Upload a photo and pick a style to get started. \
I'm here to help you picture the space of your dreams.";

/// The closed set of state transitions
///
/// On the wire an action is `{"type": "SET_STYLE", "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    SetStyle(String),
    /// Also clears the proposed image
    SetImage(String),
    SetProposedImage(String),
    UpdateParams(ParamsUpdate),
    AddMessage(ChatMessage),
    SetSuggestions(Vec<Suggestion>),
    SetGenerating(bool),
    ResetProject,
}

impl DesignState {
    /// Fresh session state with one seeded welcome message
    pub fn initial() -> Self {
        Self {
            style: catalog::default_style(),
            original_image: None,
            proposed_image: None,
            params: ProjectParams::default(),
            suggestions: Vec::new(),
            chat_history: vec![ChatMessage {
                id: "init".to_string(),
                role: ChatRole::Assistant,
                content: WELCOME_MESSAGE.to_string(),
                timestamp: now_millis(),
            }],
            is_generating: false,
        }
    }
}

/// Apply one action. `initial` is what `ResetProject` restores.
pub fn reduce(initial: &DesignState, state: DesignState, action: Action) -> DesignState {
    match action {
        Action::SetStyle(style) => DesignState { style, ..state },
        Action::SetImage(image) => DesignState {
            original_image: Some(image),
            proposed_image: None,
            ..state
        },
        Action::SetProposedImage(image) => DesignState {
            proposed_image: Some(image),
            ..state
        },
        Action::UpdateParams(update) => {
            let mut state = state;
            state.params.apply(update);
            state
        }
        Action::AddMessage(message) => {
            let mut state = state;
            state.chat_history.push(message);
            state
        }
        Action::SetSuggestions(suggestions) => DesignState {
            suggestions,
            ..state
        },
        Action::SetGenerating(is_generating) => DesignState {
            is_generating,
            ..state
        },
        Action::ResetProject => initial.clone(),
    }
}

/// Owner of one design session's state
///
/// Created once per session and handed to whoever drives the UI; there is
/// no process-wide instance.
#[derive(Debug, Clone)]
pub struct DesignSession {
    initial: DesignState,
    state: DesignState,
}

impl Default for DesignSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DesignSession {
    pub fn new() -> Self {
        Self::with_initial(DesignState::initial())
    }

    pub fn with_initial(initial: DesignState) -> Self {
        Self {
            state: initial.clone(),
            initial,
        }
    }

    pub fn state(&self) -> &DesignState {
        &self.state
    }

    pub fn dispatch(&mut self, action: Action) {
        tracing::trace!(?action, "dispatch");
        let state = std::mem::replace(&mut self.state, self.initial.clone());
        self.state = reduce(&self.initial, state, action);
    }

    /// Dispatch an action received as JSON
    ///
    /// Payloads that do not decode into a known action leave the state
    /// untouched. Returns whether the action was applied.
    pub fn dispatch_json(&mut self, value: serde_json::Value) -> bool {
        match serde_json::from_value::<Action>(value) {
            Ok(action) => {
                self.dispatch(action);
                true
            }
            Err(e) => {
                tracing::debug!("Ignoring unrecognized action: {}", e);
                false
            }
        }
    }
}

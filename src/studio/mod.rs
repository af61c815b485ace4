//! Studio workflow
//!
//! Drives one [`DesignSession`] the way the Home, Studio and Presentation
//! pages do: validates user input, calls the gateway through a
//! [`DesignBackend`] and commits the results as actions.
//!
//! A generation cycle is split into [`Studio::begin_generation`],
//! [`GenerationJob::run`] and [`Studio::commit_generation`]. Each cycle holds
//! a ticket; only the most recently issued ticket may commit results or
//! clear the generating flag, so a slow earlier cycle cannot overwrite a
//! newer one. Replacing the photo or resetting the project retires the open
//! ticket as well.

mod backend;

pub use backend::{DesignBackend, HttpBackend};

use crate::gateway::{
    ChatRequest, DesignContext, HistoryEntry, ImageReply, ImageRequest, SampleRoomRequest,
    SuggestionsReply, SuggestionsRequest, CHAT_APOLOGY,
};
use crate::presentation::PresentationView;
use crate::routing::{self, Navigation, Route};
use crate::session::{
    catalog, now_millis, Action, ChatMessage, ChatRole, DesignSession, DesignState,
    ParamsUpdate, ProjectParams, Suggestion,
};
use std::sync::Arc;
use thiserror::Error;

/// Posted when the chat backend cannot be reached
pub const CHAT_ERROR_MESSAGE: &str =
    "Technical error while processing. Please try again in a few seconds.";

/// Posted when a generation cycle fails outright
pub const GENERATION_ERROR_MESSAGE: &str =
    "Something went wrong while processing with the AI. Check your connection or try again.";

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Please upload or select an image first")]
    NoImage,

    #[error("Please upload an image file (got {0})")]
    NotAnImage(String),

    #[error("Unknown sample image: {0}")]
    UnknownSample(String),

    #[error("Could not generate a sample room: {0}")]
    SampleRoom(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// How a generation cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Proposal and suggestions committed
    Completed,
    /// Suggestions committed; the original photo stands in for the proposal
    QuotaExceeded,
    /// Nothing committed; an error message was posted to the chat
    Failed(String),
    /// A newer cycle was started; results were discarded
    Stale,
}

/// Inputs of one generation cycle, captured when it starts
#[derive(Debug, Clone)]
pub struct GenerationJob {
    ticket: u64,
    style: String,
    params: ProjectParams,
    original_image: String,
}

impl GenerationJob {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    fn image_request(&self) -> ImageRequest {
        ImageRequest {
            original_url: Some(self.original_image.clone()),
            style: self.style.clone(),
            params: Some(self.params.clone()),
        }
    }

    fn suggestions_request(&self) -> SuggestionsRequest {
        SuggestionsRequest {
            style: self.style.clone(),
            params: self.params.clone(),
        }
    }

    /// Request the proposal image and the suggestions concurrently
    pub async fn run(
        &self,
        backend: &dyn DesignBackend,
    ) -> anyhow::Result<(ImageReply, SuggestionsReply)> {
        let image_request = self.image_request();
        let suggestions_request = self.suggestions_request();
        let (image, suggestions) = futures::join!(
            backend.request_image(&image_request),
            backend.request_suggestions(&suggestions_request)
        );
        Ok((image?, suggestions?))
    }
}

pub struct Studio {
    session: DesignSession,
    backend: Arc<dyn DesignBackend>,
    route: Route,
    latest_ticket: u64,
}

impl Studio {
    pub fn new(backend: Arc<dyn DesignBackend>) -> Self {
        Self::with_session(backend, DesignSession::new())
    }

    pub fn with_session(backend: Arc<dyn DesignBackend>, session: DesignSession) -> Self {
        Self {
            session,
            backend,
            route: Route::Home,
            latest_ticket: 0,
        }
    }

    pub fn state(&self) -> &DesignState {
        self.session.state()
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn backend(&self) -> &dyn DesignBackend {
        self.backend.as_ref()
    }

    pub fn dispatch(&mut self, action: Action) {
        self.session.dispatch(action);
    }

    /// Select a style; known styles are stored with their catalog spelling
    pub fn select_style(&mut self, style: &str) {
        let style = catalog::find_style(style)
            .map(str::to_string)
            .unwrap_or_else(|| style.trim().to_string());
        self.dispatch(Action::SetStyle(style));
    }

    pub fn update_params(&mut self, update: ParamsUpdate) {
        self.dispatch(Action::UpdateParams(update));
    }

    /// Deselect a palette tag if selected, otherwise append it
    pub fn toggle_color(&mut self, color: &str) {
        let mut colors = self.state().params.colors.clone();
        match colors.iter().position(|c| c == color) {
            Some(index) => {
                colors.remove(index);
            }
            None => colors.push(color.to_string()),
        }
        self.update_params(ParamsUpdate::colors(colors));
    }

    /// Use a photo reference as the room to redesign
    ///
    /// `mime_type` is the type reported for an uploaded file; `data:` URIs
    /// carry their own.
    pub fn upload_image(
        &mut self,
        reference: &str,
        mime_type: Option<&str>,
    ) -> Result<(), StudioError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(StudioError::NoImage);
        }
        let declared = mime_type.map(str::to_string).or_else(|| {
            reference
                .strip_prefix("data:")
                .and_then(|rest| rest.split([';', ',']).next())
                .map(str::to_string)
        });
        if let Some(mime) = declared.filter(|m| !m.starts_with("image/")) {
            return Err(StudioError::NotAnImage(mime));
        }
        self.set_image(reference.to_string());
        Ok(())
    }

    pub fn use_sample(&mut self, label: &str) -> Result<(), StudioError> {
        let sample = catalog::sample_image(label)
            .ok_or_else(|| StudioError::UnknownSample(label.to_string()))?;
        self.set_image(sample.url.to_string());
        Ok(())
    }

    /// Replace the source photo; a cycle still running for the old photo
    /// can no longer commit
    fn set_image(&mut self, reference: String) {
        self.invalidate_generation();
        self.dispatch(Action::SetImage(reference));
    }

    /// Retire the open ticket and lower the generating flag it held
    fn invalidate_generation(&mut self) {
        self.latest_ticket += 1;
        if self.state().is_generating {
            tracing::debug!("Abandoning in-flight generation");
            self.dispatch(Action::SetGenerating(false));
        }
    }

    /// Generate an empty room of the selected type and use it as the photo
    pub async fn generate_sample_room(&mut self) -> Result<String, StudioError> {
        let request = SampleRoomRequest {
            room_type: self.state().params.room_type,
        };
        let reply = self.backend.request_sample_room(&request).await?;
        match reply.image_url.filter(|url| !url.is_empty()) {
            Some(url) => {
                self.set_image(url.clone());
                Ok(url)
            }
            None => Err(StudioError::SampleRoom(
                reply.error.unwrap_or_else(|| "no image returned".to_string()),
            )),
        }
    }

    /// Enter a route, subject to the image guard
    pub fn navigate(&mut self, path: &str) -> Navigation {
        let navigation = routing::guard(Route::from_path(path), self.state());
        self.route = navigation.route();
        navigation
    }

    /// Leave the landing page for the studio
    pub fn start(&mut self) -> Result<Route, StudioError> {
        if self.state().original_image.is_none() {
            return Err(StudioError::NoImage);
        }
        Ok(self.navigate(Route::Studio.path()).route())
    }

    pub fn reset(&mut self) {
        self.invalidate_generation();
        self.dispatch(Action::ResetProject);
        self.route = Route::Home;
    }

    /// Open a generation cycle and raise the generating flag
    pub fn begin_generation(&mut self) -> Result<GenerationJob, StudioError> {
        let state = self.state();
        let original_image = state.original_image.clone().ok_or(StudioError::NoImage)?;
        let job = GenerationJob {
            ticket: self.latest_ticket + 1,
            style: state.style.clone(),
            params: state.params.clone(),
            original_image,
        };
        self.latest_ticket = job.ticket;
        self.dispatch(Action::SetGenerating(true));
        tracing::debug!(ticket = job.ticket, style = %job.style, "Generation started");
        Ok(job)
    }

    /// Apply the results of a cycle, unless a newer cycle has started
    pub fn commit_generation(
        &mut self,
        job: GenerationJob,
        result: anyhow::Result<(ImageReply, SuggestionsReply)>,
    ) -> GenerationOutcome {
        if job.ticket != self.latest_ticket {
            tracing::debug!(
                ticket = job.ticket,
                latest = self.latest_ticket,
                "Discarding stale generation"
            );
            return GenerationOutcome::Stale;
        }

        let outcome = match result {
            Ok((image, suggestions)) => self.apply_generation(&job, image, suggestions.suggestions),
            Err(e) => {
                tracing::error!("Generation failed: {:#}", e);
                self.push_assistant(GENERATION_ERROR_MESSAGE);
                GenerationOutcome::Failed(format!("{:#}", e))
            }
        };
        self.dispatch(Action::SetGenerating(false));
        outcome
    }

    fn apply_generation(
        &mut self,
        job: &GenerationJob,
        image: ImageReply,
        suggestions: Vec<Suggestion>,
    ) -> GenerationOutcome {
        let specification = technical_specification(&job.style, &suggestions);
        self.dispatch(Action::SetSuggestions(suggestions));

        if image.quota_exceeded {
            self.dispatch(Action::SetProposedImage(job.original_image.clone()));
            self.push_assistant(specification);
            return GenerationOutcome::QuotaExceeded;
        }

        let proposed = if image.image_url.is_empty() {
            job.original_image.clone()
        } else {
            image.image_url
        };
        self.dispatch(Action::SetProposedImage(proposed));
        self.push_assistant(format!(
            "I analyzed your photo and applied the {} concept. I reorganized the space around \
             {} to match your preference. What do you think of the new look?",
            job.style,
            job.params.palette(" and ")
        ));
        GenerationOutcome::Completed
    }

    /// Run a full generation cycle
    pub async fn generate(&mut self) -> Result<GenerationOutcome, StudioError> {
        let job = self.begin_generation()?;
        let backend = Arc::clone(&self.backend);
        let result = job.run(backend.as_ref()).await;
        Ok(self.commit_generation(job, result))
    }

    /// Send one chat turn and append the consultant's answer
    ///
    /// Blank input is ignored. The transcript sent along is the history
    /// before the new user message.
    pub async fn send_message(&mut self, text: &str) -> Option<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let state = self.state();
        let request = ChatRequest {
            history: state.chat_history.iter().map(HistoryEntry::from).collect(),
            user_message: text.to_string(),
            context: DesignContext {
                style: state.style.clone(),
                params: state.params.clone(),
            },
        };
        let user = self.message(ChatRole::User, text);
        self.dispatch(Action::AddMessage(user));

        let content = match self.backend.request_chat(&request).await {
            Ok(reply) if !reply.reply.trim().is_empty() => reply.reply,
            Ok(_) => CHAT_APOLOGY.to_string(),
            Err(e) => {
                tracing::error!("Chat request failed: {:#}", e);
                CHAT_ERROR_MESSAGE.to_string()
            }
        };
        Some(self.push_assistant(content))
    }

    pub fn presentation(&self) -> PresentationView {
        PresentationView::from_state(self.state())
    }

    /// New message whose timestamp never precedes the transcript's last one
    fn message(&self, role: ChatRole, content: impl Into<String>) -> ChatMessage {
        let last = self
            .state()
            .chat_history
            .last()
            .map(|m| m.timestamp)
            .unwrap_or_default();
        ChatMessage::new(role, content, now_millis().max(last))
    }

    fn push_assistant(&mut self, content: impl Into<String>) -> ChatMessage {
        let message = self.message(ChatRole::Assistant, content);
        self.dispatch(Action::AddMessage(message.clone()));
        message
    }
}

/// Text-only rendition of the proposal, posted when no image can be made
fn technical_specification(style: &str, suggestions: &[Suggestion]) -> String {
    let mut text = format!(
        "The image generation quota is exhausted, so your original photo is shown instead. \
         Here is the technical specification of the {} proposal:",
        style
    );
    for (n, suggestion) in suggestions.iter().enumerate() {
        text.push_str(&format!("\n\n{}. {}", n + 1, suggestion.title));
        if !suggestion.description.is_empty() {
            text.push_str(&format!(": {}", suggestion.description));
        }
        if !suggestion.items.is_empty() {
            text.push_str(&format!("\n   Items: {}", suggestion.items.join(", ")));
        }
    }
    text
}

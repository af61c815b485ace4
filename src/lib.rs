//! decor-studio: AI-assisted interior redesign
//!
//! This library provides:
//! - A design session store driven by a closed set of actions
//! - A provider gateway for design chat, structured suggestions and redesign images
//! - Gemini, OpenAI and offline simulation providers
//! - Storage of generated images in a public bucket or a local directory
//! - The Studio workflow with routing guard and presentation view
//! - An HTTP server exposing the gateway API

pub mod config;
pub mod gateway;
pub mod llm;
pub mod presentation;
pub mod routing;
pub mod session;
pub mod storage;
pub mod studio;
pub mod transport;

pub use config::Config;
pub use gateway::Gateway;
pub use session::{Action, DesignSession, DesignState};
pub use studio::Studio;

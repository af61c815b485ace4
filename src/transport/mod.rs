//! Transport layer for CLI and HTTP communication

pub mod cli;
pub mod http;

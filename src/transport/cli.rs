//! CLI transport for driving a design session from the terminal

use crate::config::Config;
use crate::gateway::{Gateway, SuggestionsRequest};
use crate::llm::InlineImage;
use crate::session::{Boldness, Budget, ParamsUpdate, ProjectParams, RoomType, Suggestion};
use crate::studio::{DesignBackend, GenerationOutcome, HttpBackend, Studio};
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Session settings shared by every design command
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SessionOptions {
    /// Interior style (e.g. "Scandinavian")
    #[arg(short, long)]
    pub style: Option<String>,

    /// Room type (living-room, bedroom, kitchen, dining-room, office)
    #[arg(short, long)]
    pub room: Option<RoomType>,

    /// Area in square meters
    #[arg(short, long, value_parser = ProjectParams::parse_area)]
    pub area: Option<f64>,

    /// Budget (low, medium, high)
    #[arg(short, long)]
    pub budget: Option<Budget>,

    /// Color palettes, comma separated
    #[arg(long, value_delimiter = ',')]
    pub colors: Vec<String>,

    /// Boldness (discreet, balanced, bold)
    #[arg(long)]
    pub boldness: Option<Boldness>,

    /// Room photo: a local file, a URL or a data URI
    #[arg(short, long)]
    pub image: Option<String>,

    /// Start from a bundled sample photo (e.g. "Living Room")
    #[arg(long, conflicts_with = "image")]
    pub sample: Option<String>,

    /// Use a running `decor serve` instance instead of calling the AI provider directly
    #[arg(long)]
    pub remote: Option<String>,
}

impl SessionOptions {
    fn params_update(&self) -> ParamsUpdate {
        ParamsUpdate {
            room_type: self.room,
            area: self.area,
            budget: self.budget,
            colors: (!self.colors.is_empty()).then(|| self.colors.clone()),
            boldness: self.boldness,
        }
    }
}

/// Backend for the session: a remote server or the configured provider
fn build_backend(remote: Option<&str>) -> Result<Arc<dyn DesignBackend>> {
    if let Some(url) = remote {
        tracing::info!("Using remote gateway at {}", url);
        return Ok(Arc::new(HttpBackend::new(url)?));
    }

    let config = Config::load()?;
    let local_base = config
        .storage
        .local_dir
        .as_ref()
        .map(|dir| format!("file://{}", dir.display()))
        .unwrap_or_default();
    Ok(Arc::new(Gateway::from_config(&config, &local_base)?))
}

/// Read a local photo into a data URI, or pass URLs through untouched
fn load_image(reference: &str) -> Result<(String, Option<String>)> {
    let path = Path::new(reference);
    if !path.is_file() {
        return Ok((reference.to_string(), None));
    }

    let mime = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    };
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let image = InlineImage::new(mime, STANDARD.encode(bytes));
    Ok((image.to_data_uri(), Some(mime.to_string())))
}

/// Build a studio with the requested style, parameters and photo
fn prepare_studio(options: &SessionOptions) -> Result<Studio> {
    let backend = build_backend(options.remote.as_deref())?;
    let mut studio = Studio::new(backend);

    if let Some(style) = &options.style {
        studio.select_style(style);
    }
    studio.update_params(options.params_update());

    if let Some(image) = &options.image {
        let (reference, mime) = load_image(image)?;
        studio.upload_image(&reference, mime.as_deref())?;
    } else if let Some(sample) = &options.sample {
        studio.use_sample(sample)?;
    }
    Ok(studio)
}

/// Shorten data URIs for display
fn display_reference(reference: &str) -> String {
    match InlineImage::from_data_uri(reference) {
        Some(image) => format!(
            "<inline {} image, {} bytes base64>",
            image.mime_type,
            image.data.len()
        ),
        None => reference.to_string(),
    }
}

fn print_suggestions(suggestions: &[Suggestion]) {
    for suggestion in suggestions {
        println!("{} {}", "*".cyan(), suggestion.title.bold());
        if !suggestion.description.is_empty() {
            println!("  {}", suggestion.description);
        }
        for item in &suggestion.items {
            println!("  - {}", item);
        }
        if !suggestion.tags.is_empty() {
            println!("  {}", suggestion.tags.join(" | ").dimmed());
        }
        println!();
    }
}

/// Run interactive chat mode
pub async fn run_chat(initial_message: Option<String>, options: &SessionOptions) -> Result<()> {
    let mut studio = prepare_studio(options)?;

    if let Some(message) = initial_message {
        if let Some(reply) = studio.send_message(&message).await {
            println!("{}", reply.content);
        }
        return Ok(());
    }

    if let Some(welcome) = studio.state().chat_history.first() {
        println!("{}\n", welcome.content);
    }
    println!("{}", "Type 'exit' or 'quit' to exit, 'reset' to start over\n".dimmed());

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        match input.to_lowercase().as_str() {
            "" => continue,
            "exit" | "quit" => {
                println!("Goodbye!");
                break;
            }
            "reset" => {
                studio.reset();
                println!("Project reset.\n");
                continue;
            }
            _ => {}
        }

        if let Some(reply) = studio.send_message(input).await {
            println!("\n{}\n", reply.content);
        }
    }

    Ok(())
}

/// Print three design suggestions
pub async fn run_suggest(options: &SessionOptions, json: bool) -> Result<()> {
    let studio = prepare_studio(options)?;
    let state = studio.state();
    let reply = studio
        .backend()
        .request_suggestions(&SuggestionsRequest {
            style: state.style.clone(),
            params: state.params.clone(),
        })
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
        return Ok(());
    }
    if let Some(error) = &reply.error {
        eprintln!("{} {}", "warning:".yellow(), error);
    }
    println!(
        "{}\n",
        format!("{} ideas for your {}", state.style, state.params.room_type).bold()
    );
    print_suggestions(&reply.suggestions);
    Ok(())
}

/// Generate a redesign proposal; optionally print the presentation
pub async fn run_render(
    options: &SessionOptions,
    output: Option<PathBuf>,
    json: bool,
    present: bool,
) -> Result<()> {
    let mut studio = prepare_studio(options)?;
    let outcome = studio.generate().await?;
    let state = studio.state();

    if let (Some(path), Some(proposed)) = (&output, &state.proposed_image) {
        save_image(proposed, path)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
        return Ok(());
    }

    match &outcome {
        GenerationOutcome::Completed => println!("{}", "Proposal ready".green().bold()),
        GenerationOutcome::QuotaExceeded => {
            println!("{}", "Image quota exhausted, showing the original photo".yellow())
        }
        GenerationOutcome::Failed(detail) => {
            anyhow::bail!("Generation failed: {}", detail)
        }
        GenerationOutcome::Stale => {}
    }
    if let Some(original) = &state.original_image {
        println!("Before: {}", display_reference(original));
    }
    if let Some(proposed) = &state.proposed_image {
        println!("After:  {}", display_reference(proposed));
    }
    println!();

    if present {
        println!("{}", studio.presentation());
    } else {
        print_suggestions(&state.suggestions);
        if let Some(message) = state.chat_history.last() {
            println!("{}", message.content);
        }
    }
    Ok(())
}

/// Generate an empty room photo of the selected type
pub async fn run_sample_room(options: &SessionOptions, output: Option<PathBuf>) -> Result<()> {
    let mut studio = prepare_studio(options)?;
    let url = studio.generate_sample_room().await?;
    match output {
        Some(path) => save_image(&url, &path)?,
        None => println!("{}", display_reference(&url)),
    }
    Ok(())
}

/// Write a `data:` URI image to disk; URLs are only reported
fn save_image(reference: &str, path: &Path) -> Result<()> {
    match InlineImage::from_data_uri(reference) {
        Some(image) => {
            std::fs::write(path, image.decode()?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Saved image to {}", path.display());
        }
        None => eprintln!("Image is hosted at {}, nothing written", reference),
    }
    Ok(())
}

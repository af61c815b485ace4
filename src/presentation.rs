//! Client-facing summary of the generated design

use crate::routing::Route;
use crate::session::DesignState;
use chrono::NaiveDate;
use colored::Colorize;
use std::fmt;

/// Items listed in the curated selection
pub const MAX_ITEMS: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub enum PresentationView {
    /// Nothing has been generated yet
    Empty,
    Ready(Presentation),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Presentation {
    pub title: String,
    pub prepared_on: NaiveDate,
    pub before_image: Option<String>,
    pub after_image: String,
    pub concept: String,
    pub reasons: [String; 3],
    pub items: Vec<String>,
}

impl PresentationView {
    pub fn from_state(state: &DesignState) -> Self {
        Self::prepared_on(state, chrono::Local::now().date_naive())
    }

    pub fn prepared_on(state: &DesignState, date: NaiveDate) -> Self {
        let Some(after_image) = state.proposed_image.clone() else {
            return PresentationView::Empty;
        };
        let params = &state.params;
        let boldness = params.boldness.label().to_lowercase();

        let concept = format!(
            "This design embraces the core principles of the {} style, using a palette of {} \
             tones to create a space that feels curated and inviting. Given the {} m2 area, we \
             maximized spatial flow by choosing furniture with {} visual weight.",
            state.style,
            params.palette(" and ").to_lowercase(),
            params.area_label(),
            boldness,
        );
        let reasons = [
            format!(
                "Balances aesthetics with the {} budget constraint.",
                params.budget.label().to_lowercase()
            ),
            format!(
                "Makes the most of natural light for the specific layout of the {}.",
                params.room_type.label().to_lowercase()
            ),
            format!("Brings in {} elements to create a unique focal point.", boldness),
        ];
        let items = state
            .suggestions
            .iter()
            .flat_map(|s| s.items.iter().cloned())
            .take(MAX_ITEMS)
            .collect();

        PresentationView::Ready(Presentation {
            title: format!("{} {}", params.room_type, state.style),
            prepared_on: date,
            before_image: state.original_image.clone(),
            after_image,
            concept,
            reasons,
            items,
        })
    }
}

impl fmt::Display for PresentationView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresentationView::Empty => {
                writeln!(f, "{}", "No design generated yet.".dimmed())?;
                write!(f, "Back to the studio: {}", Route::Studio)
            }
            PresentationView::Ready(presentation) => fmt::Display::fmt(presentation, f),
        }
    }
}

impl fmt::Display for Presentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "DESIGN CONCEPT".cyan().bold())?;
        writeln!(f, "{}", self.title.bold())?;
        writeln!(
            f,
            "{}",
            format!("Prepared for the client - {}", self.prepared_on.format("%Y-%m-%d")).dimmed()
        )?;
        writeln!(f)?;
        if let Some(before) = &self.before_image {
            writeln!(f, "Before: {}", before)?;
        }
        writeln!(f, "After:  {}", self.after_image)?;
        writeln!(f)?;

        writeln!(f, "{}", "The concept".bold())?;
        writeln!(f, "{}", self.concept)?;
        writeln!(f)?;

        writeln!(f, "{}", "Why it works".bold())?;
        for (n, reason) in self.reasons.iter().enumerate() {
            writeln!(f, "  {}. {}", n + 1, reason)?;
        }

        if !self.items.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", "Curated selection".bold())?;
            for item in &self.items {
                writeln!(f, "  - {}", item)?;
            }
        }
        Ok(())
    }
}

//! Design session data model

use super::lenient;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while coercing user input into project parameters
#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("Area must be a positive number of square meters, got '{0}'")]
    InvalidArea(String),

    #[error("Unknown {kind}: '{value}'")]
    UnknownOption { kind: &'static str, value: String },
}

/// Implements display names, parsing and the option list for a parameter enum
macro_rules! labelled_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = ParamsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize_label(s);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|option| normalize_label(option.label()) == wanted)
                    .ok_or_else(|| ParamsError::UnknownOption {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

/// "living-room", "Living Room" and "living_room" all compare equal
fn normalize_label(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Room categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RoomType {
    #[default]
    #[serde(rename = "Living Room")]
    LivingRoom,
    Bedroom,
    Kitchen,
    #[serde(rename = "Dining Room")]
    DiningRoom,
    Office,
}

labelled_enum!(RoomType, "room type", {
    LivingRoom => "Living Room",
    Bedroom => "Bedroom",
    Kitchen => "Kitchen",
    DiningRoom => "Dining Room",
    Office => "Office",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Budget {
    Low,
    #[default]
    Medium,
    High,
}

labelled_enum!(Budget, "budget", {
    Low => "Low",
    Medium => "Medium",
    High => "High",
});

/// How visually daring the proposal may be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Boldness {
    Discreet,
    #[default]
    Balanced,
    Bold,
}

labelled_enum!(Boldness, "boldness", {
    Discreet => "Discreet",
    Balanced => "Balanced",
    Bold => "Bold",
});

/// Parameters of the room being redesigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectParams {
    #[serde(deserialize_with = "lenient::label")]
    pub room_type: RoomType,
    /// Square meters
    #[serde(deserialize_with = "lenient::area")]
    pub area: f64,
    #[serde(deserialize_with = "lenient::label")]
    pub budget: Budget,
    /// Palette tags in selection order
    #[serde(deserialize_with = "lenient::colors")]
    pub colors: Vec<String>,
    #[serde(deserialize_with = "lenient::label")]
    pub boldness: Boldness,
}

impl Default for ProjectParams {
    fn default() -> Self {
        Self {
            room_type: RoomType::default(),
            area: 25.0,
            budget: Budget::default(),
            colors: vec!["Neutral".to_string()],
            boldness: Boldness::default(),
        }
    }
}

impl ProjectParams {
    /// Coerce free-form user input ("25", "25,5", "30 m2") into an area
    pub fn parse_area(input: &str) -> Result<f64, ParamsError> {
        let cleaned: String = input
            .trim()
            .trim_end_matches("m²")
            .trim_end_matches("m2")
            .trim_end_matches('m')
            .trim()
            .replace(',', ".");
        match cleaned.parse::<f64>() {
            Ok(area) if area.is_finite() && area > 0.0 => Ok(area),
            _ => Err(ParamsError::InvalidArea(input.to_string())),
        }
    }

    /// Palette rendered for prompts and narratives
    pub fn palette(&self, separator: &str) -> String {
        if self.colors.is_empty() {
            "no preference".to_string()
        } else {
            self.colors.join(separator)
        }
    }

    /// Area without a trailing ".0"
    /// Area without a trailing ".0"; `f64` display never uses exponents
    pub fn area_label(&self) -> String {
        self.area.to_string()
    }

    pub fn apply(&mut self, update: ParamsUpdate) {
        if let Some(room_type) = update.room_type {
            self.room_type = room_type;
        }
        if let Some(area) = update.area {
            self.area = area;
        }
        if let Some(budget) = update.budget {
            self.budget = budget;
        }
        if let Some(colors) = update.colors {
            self.colors = colors;
        }
        if let Some(boldness) = update.boldness {
            self.boldness = boldness;
        }
    }
}

/// Partial update of [`ProjectParams`]; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParamsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_type: Option<RoomType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boldness: Option<Boldness>,
}

impl ParamsUpdate {
    pub fn room_type(room_type: RoomType) -> Self {
        Self {
            room_type: Some(room_type),
            ..Default::default()
        }
    }

    pub fn area(area: f64) -> Self {
        Self {
            area: Some(area),
            ..Default::default()
        }
    }

    pub fn budget(budget: Budget) -> Self {
        Self {
            budget: Some(budget),
            ..Default::default()
        }
    }

    pub fn colors<I, S>(colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            colors: Some(colors.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn boldness(boldness: Boldness) -> Self {
        Self {
            boldness: Some(boldness),
            ..Default::default()
        }
    }
}

/// Chat participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    #[default]
    User,
    Assistant,
}

/// One entry of the consultation transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content, now_millis())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content, now_millis())
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A structured design suggestion card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Root aggregate of a design session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignState {
    pub style: String,
    pub original_image: Option<String>,
    pub proposed_image: Option<String>,
    pub params: ProjectParams,
    pub suggestions: Vec<Suggestion>,
    pub chat_history: Vec<ChatMessage>,
    pub is_generating: bool,
}

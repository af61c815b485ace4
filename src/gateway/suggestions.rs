//! Structured design suggestions

use super::Gateway;
use crate::llm::Message;
use crate::session::{catalog, lenient, ProjectParams, Suggestion};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of cards every reply carries
pub const SUGGESTION_COUNT: usize = 3;

/// Title given to cards the model left untitled
pub const PLACEHOLDER_TITLE: &str = "Suggestion";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionsRequest {
    #[serde(deserialize_with = "lenient::style")]
    pub style: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub params: ProjectParams,
}

impl Default for SuggestionsRequest {
    fn default() -> Self {
        Self {
            style: catalog::default_style(),
            params: ProjectParams::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionsReply {
    pub suggestions: Vec<Suggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Static cards served when the model is unavailable or unintelligible
pub fn fallback_suggestions() -> Vec<Suggestion> {
    let card = |id: &str, title: &str, description: &str, items: &[&str], tags: &[&str]| {
        Suggestion {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            items: items.iter().map(|s| s.to_string()).collect(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
        }
    };
    vec![
        card(
            "1",
            "Furniture selection",
            "Pick a few pieces in natural wood and neutral fabrics that fit the scale of the room.",
            &["Fabric sofa", "Solid wood coffee table", "Accent armchair"],
            &["Furniture", "Comfort"],
        ),
        card(
            "2",
            "Lighting & mood",
            "Layer warm ambient light with focused lamps to make the space feel welcoming.",
            &["Warm pendant light", "Reading floor lamp", "Indirect LED strip"],
            &["Lighting", "Mood"],
        ),
        card(
            "3",
            "Materials & textures",
            "Combine natural textures so the room feels rich without visual clutter.",
            &["Natural fiber rug", "Linen curtains", "Ceramic accents"],
            &["Materials", "Texture"],
        ),
    ]
}

fn build_prompt(request: &SuggestionsRequest) -> String {
    let params = &request.params;
    format!(
        "Suggest exactly {count} interior design ideas for a {room} of {area} m2 \
         in the {style} style.\n\
         Budget: {budget}. Color palette: {palette}. Boldness: {boldness}.\n\
         Answer with a JSON array only, no markdown and no extra text. Each element \
         must have the fields \"id\" (string), \"title\" (string), \"description\" \
         (one or two sentences), \"items\" (array of 3 concrete products or \
         materials) and \"tags\" (array of 2 short labels).",
        count = SUGGESTION_COUNT,
        room = params.room_type,
        area = params.area_label(),
        style = request.style,
        budget = params.budget,
        palette = params.palette(", "),
        boldness = params.boldness,
    )
}

/// Decode the cards contained in untrusted model output
///
/// Accepts a bare JSON array, an object with a `suggestions` array, or either
/// of those wrapped in prose or markdown fences. Missing fields get defaults.
/// Returns `None` when no array can be found at all.
pub fn parse_suggestions(text: &str) -> Option<Vec<Suggestion>> {
    let elements = extract_array(text)?;
    Some(
        elements
            .iter()
            .enumerate()
            .filter_map(|(index, value)| value.as_object().map(|obj| decode_card(index, obj)))
            .collect(),
    )
}

/// Truncate or pad (from the fallback catalog) to exactly [`SUGGESTION_COUNT`]
pub fn normalize_suggestions(mut suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    suggestions.truncate(SUGGESTION_COUNT);
    let fallback = fallback_suggestions();
    let missing = fallback.into_iter().enumerate().skip(suggestions.len());
    for (index, mut card) in missing {
        card.id = (index + 1).to_string();
        suggestions.push(card);
    }
    suggestions
}

fn extract_array(text: &str) -> Option<Vec<Value>> {
    let trimmed = text.trim();
    if let Some(array) = serde_json::from_str(trimmed).ok().and_then(into_array) {
        return Some(array);
    }

    let start = trimmed.find('[')?;
    let end = trimmed.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end])
        .ok()
        .and_then(into_array)
}

fn into_array(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(array) => Some(array),
        Value::Object(mut obj) => match obj.remove("suggestions") {
            Some(Value::Array(array)) => Some(array),
            _ => None,
        },
        _ => None,
    }
}

fn decode_card(index: usize, obj: &Map<String, Value>) -> Suggestion {
    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => (index + 1).to_string(),
    };
    let title = text_field(obj, "title")
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string());

    Suggestion {
        id,
        title,
        description: text_field(obj, "description").unwrap_or_default(),
        items: string_list(obj.get("items")),
        tags: string_list(obj.get("tags")),
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl Gateway {
    /// Exactly [`SUGGESTION_COUNT`] cards for the given style and parameters
    pub async fn suggestions(&self, request: &SuggestionsRequest) -> SuggestionsReply {
        let messages = [Message::user(build_prompt(request))];
        match self.provider.chat_json(&messages).await {
            Ok(response) => {
                let suggestions = match parse_suggestions(&response.text) {
                    Some(parsed) if !parsed.is_empty() => normalize_suggestions(parsed),
                    _ => {
                        tracing::warn!("Suggestions reply was not a JSON array, using fallback");
                        fallback_suggestions()
                    }
                };
                SuggestionsReply {
                    suggestions,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!("Suggestions API error: {:#}", e);
                SuggestionsReply {
                    suggestions: fallback_suggestions(),
                    error: Some("Failed to generate suggestions".to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{SimProvider, SimScenario};
    use std::sync::Arc;

    #[test]
    fn test_parse_fenced_array() {
        let text = "Here you go:\n```json\n[{\"id\": \"a\", \"title\": \"Rug\", \
                    \"description\": \"Warm\", \"items\": [\"Jute rug\"], \"tags\": [\"Textile\"]}]\n```";
        let cards = parse_suggestions(text).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, "a");
        assert_eq!(cards[0].title, "Rug");
        assert_eq!(cards[0].items, vec!["Jute rug"]);
    }

    #[test]
    fn test_parse_object_wrapper() {
        let cards = parse_suggestions(r#"{"suggestions": [{"title": "Paint"}]}"#).unwrap();
        assert_eq!(cards[0].title, "Paint");
        assert_eq!(cards[0].id, "1");
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let cards = parse_suggestions(
            r#"[{"id": 7, "title": "  ", "items": ["Lamp", 3, null, "Rug"], "tags": "x"}, "junk", {}]"#,
        )
        .unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].id, "7");
        assert_eq!(cards[0].title, PLACEHOLDER_TITLE);
        assert_eq!(cards[0].description, "");
        assert_eq!(cards[0].items, vec!["Lamp", "Rug"]);
        assert!(cards[0].tags.is_empty());
        assert_eq!(cards[1].id, "3");
        assert_eq!(cards[1].title, PLACEHOLDER_TITLE);
    }

    #[test]
    fn test_unparseable_text() {
        assert!(parse_suggestions("no ideas today").is_none());
        assert!(parse_suggestions("] backwards [").is_none());
        assert!(parse_suggestions(r#"{"ideas": "none"}"#).is_none());
        assert_eq!(parse_suggestions("[]"), Some(vec![]));
    }

    #[test]
    fn test_normalize_pads_and_truncates() {
        let one = parse_suggestions(r#"[{"id": "x", "title": "Only"}]"#).unwrap();
        let padded = normalize_suggestions(one);
        assert_eq!(padded.len(), SUGGESTION_COUNT);
        assert_eq!(padded[0].title, "Only");
        assert_eq!(padded[1].title, "Lighting & mood");
        assert_eq!(padded[2].id, "3");

        let many = parse_suggestions(r#"[{}, {}, {}, {}, {}]"#).unwrap();
        assert_eq!(normalize_suggestions(many).len(), SUGGESTION_COUNT);
    }

    #[test]
    fn test_prompt_mentions_params() {
        let prompt = build_prompt(&SuggestionsRequest::default());
        assert!(prompt.contains("Living Room of 25 m2"));
        assert!(prompt.contains("Mid-Century Modern"));
        assert!(prompt.contains("JSON array"));
    }

    #[tokio::test]
    async fn test_gateway_always_returns_three() {
        for scenario in [
            SimScenario::Normal,
            SimScenario::Failure,
            SimScenario::QuotaExceeded,
            SimScenario::Malformed,
        ] {
            let gateway = Gateway::new(Arc::new(SimProvider::new().with_scenario(scenario)));
            let reply = gateway.suggestions(&SuggestionsRequest::default()).await;
            assert_eq!(reply.suggestions.len(), SUGGESTION_COUNT, "{scenario:?}");
            assert!(reply.suggestions.iter().all(|s| !s.title.is_empty()));
        }
    }

    #[tokio::test]
    async fn test_provider_error_is_flagged() {
        let gateway = Gateway::new(Arc::new(
            SimProvider::new().with_scenario(SimScenario::Failure),
        ));
        let reply = gateway.suggestions(&SuggestionsRequest::default()).await;
        assert_eq!(reply.suggestions, fallback_suggestions());
        assert!(reply.error.is_some());
    }
}

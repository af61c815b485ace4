//! Property tests for the session reducer and suggestion normalization

use decor_studio::gateway::{normalize_suggestions, parse_suggestions, SUGGESTION_COUNT};
use decor_studio::session::{
    catalog, Action, Budget, ChatMessage, DesignSession, DesignState, ParamsUpdate,
};
use proptest::prelude::*;

fn style() -> impl Strategy<Value = String> {
    prop::sample::select(catalog::INTERIOR_STYLES).prop_map(str::to_string)
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        style().prop_map(Action::SetStyle),
        "[a-z]{1,12}".prop_map(|s| Action::SetImage(format!("blob://{s}"))),
        "[a-z]{1,12}".prop_map(|s| Action::SetProposedImage(format!("https://cdn.test/{s}.png"))),
        (1.0f64..500.0).prop_map(|area| Action::UpdateParams(ParamsUpdate::area(area))),
        prop::sample::select(Budget::ALL)
            .prop_map(|budget| Action::UpdateParams(ParamsUpdate::budget(budget))),
        ".{0,40}".prop_map(|text| Action::AddMessage(ChatMessage::user(text))),
        any::<bool>().prop_map(Action::SetGenerating),
        Just(Action::ResetProject),
    ]
}

proptest! {
    #[test]
    fn set_image_always_clears_proposal(
        actions in prop::collection::vec(action(), 0..20),
        image in "[a-z]{1,10}",
    ) {
        let mut session = DesignSession::new();
        for action in actions {
            session.dispatch(action);
        }
        let before = session.state().clone();
        session.dispatch(Action::SetImage(image.clone()));

        let after = session.state();
        prop_assert_eq!(after.original_image.as_deref(), Some(image.as_str()));
        prop_assert!(after.proposed_image.is_none());
        prop_assert_eq!(&after.params, &before.params);
        prop_assert_eq!(&after.chat_history, &before.chat_history);
        prop_assert_eq!(&after.style, &before.style);
    }

    #[test]
    fn reset_is_idempotent(actions in prop::collection::vec(action(), 0..20)) {
        let mut session = DesignSession::new();
        let initial = session.state().clone();
        for action in actions {
            session.dispatch(action);
        }
        session.dispatch(Action::ResetProject);
        let once = session.state().clone();
        session.dispatch(Action::ResetProject);

        prop_assert_eq!(session.state(), &once);
        prop_assert_eq!(&once, &initial);
    }

    #[test]
    fn messages_are_appended_in_order(texts in prop::collection::vec(".{0,30}", 0..10)) {
        let mut session = DesignSession::new();
        for text in &texts {
            session.dispatch(Action::AddMessage(ChatMessage::user(text.clone())));
        }
        let history: Vec<&str> = session.state().chat_history[1..]
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        let expected: Vec<&str> = texts.iter().map(String::as_str).collect();
        prop_assert_eq!(history, expected);
    }

    #[test]
    fn colors_keep_order_and_duplicates(
        colors in prop::collection::vec(prop::sample::select(catalog::COLOR_PALETTES), 0..8),
    ) {
        let mut session = DesignSession::new();
        session.dispatch(Action::UpdateParams(ParamsUpdate::colors(colors.clone())));
        let stored: Vec<&str> = session.state().params.colors.iter().map(String::as_str).collect();
        prop_assert_eq!(stored, colors);
    }

    #[test]
    fn suggestions_always_normalize_to_three(text in ".{0,200}") {
        let cards = normalize_suggestions(parse_suggestions(&text).unwrap_or_default());
        prop_assert_eq!(cards.len(), SUGGESTION_COUNT);
        prop_assert!(cards.iter().all(|c| !c.title.is_empty()));
    }

    #[test]
    fn parsed_cards_keep_string_items(
        items in prop::collection::vec("[a-zA-Z ]{1,12}", 0..5),
        count in 1usize..6,
    ) {
        let card = serde_json::json!({"title": "Card", "items": items, "tags": [1, "tag"]});
        let text = serde_json::Value::Array(vec![card; count]).to_string();
        let cards = normalize_suggestions(parse_suggestions(&text).unwrap());

        prop_assert_eq!(cards.len(), SUGGESTION_COUNT);
        for card in cards.iter().take(count.min(SUGGESTION_COUNT)) {
            prop_assert_eq!(&card.items, &items);
            prop_assert_eq!(&card.tags, &vec!["tag".to_string()]);
        }
    }
}

#[test]
fn fresh_session_defaults() {
    let state = DesignState::initial();
    assert_eq!(state.style, catalog::INTERIOR_STYLES[0]);
    assert_eq!(state.params.area, 25.0);
    assert_eq!(state.params.budget, Budget::Medium);
    assert_eq!(state.params.colors, vec!["Neutral"]);
    assert_eq!(state.chat_history.len(), 1);
    assert!(state.suggestions.is_empty());
}

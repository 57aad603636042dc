use teloxide::types::MessageId;

use crate::callback::Action;
use crate::render::{self, Reply};
use crate::view::{DetailView, ToggleError};

pub const STALE_VIEW: &str = "This recipe is no longer open";

/// The detail view currently shown in a chat.
#[derive(Debug, Clone)]
pub struct OpenRecipe {
    pub view: DetailView,
    pub message_id: MessageId,
    /// Carried by the buttons of this view's message.
    pub token: u32,
}

/// Per-chat dialogue state.
#[derive(Debug, Clone, Default)]
pub struct State {
    /// Ids already proposed by /random.
    pub seen: Vec<String>,
    pub open: Option<OpenRecipe>,
    opened: u32,
}

impl State {
    /// Token for the next detail view sent to this chat.
    pub fn next_token(&mut self) -> u32 {
        self.opened = self.opened.wrapping_add(1);
        self.opened
    }

    /// Message for a /random that found nothing left to propose. History is
    /// reset when there was one, so the next /random starts over.
    pub fn nothing_to_propose(&mut self) -> &'static str {
        if self.seen.is_empty() {
            "There are no recipes to propose."
        } else {
            self.seen.clear();
            "You circled over all recipes. /random starts over."
        }
    }
}

/// What the chat should see after an event on the open view.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Not an event for the open view.
    Ignored,
    /// Short notice on the pressed button, the message stays as is.
    Notice(String),
    /// Handled, but the message would look the same.
    Unchanged,
    Edit { message_id: MessageId, reply: Reply },
}

fn edit_if_changed(open: &OpenRecipe, before: Reply) -> Outcome {
    let reply = render::view_reply(&open.view, open.token);
    if reply == before {
        Outcome::Unchanged
    } else {
        Outcome::Edit {
            message_id: open.message_id,
            reply,
        }
    }
}

/// Applies a button press to the open view. Opening a recipe is left to the
/// caller since it needs the store.
pub fn apply(state: &mut State, action: &Action) -> Outcome {
    let (token, dimension, step) = match *action {
        Action::Open(_) => return Outcome::Ignored,
        Action::Locked { dimension, .. } => {
            return Outcome::Notice(ToggleError::Locked(dimension).to_string())
        }
        Action::Toggle { view, dimension } => (view, Some(dimension), None),
        Action::StepServings { view, step } => (view, None, Some(step)),
    };

    let Some(open) = state.open.as_mut().filter(|open| open.token == token) else {
        return Outcome::Notice(STALE_VIEW.to_string());
    };
    let before = render::view_reply(&open.view, open.token);
    if let Some(dimension) = dimension {
        if let Err(e) = open.view.toggle(dimension) {
            return Outcome::Notice(e.to_string());
        }
    }
    if let Some(step) = step {
        open.view.step_servings(step);
    }
    edit_if_changed(open, before)
}

/// Plain text counts as a servings input while a view is open.
pub fn apply_text(state: &mut State, text: &str) -> Outcome {
    if text.starts_with('/') {
        return Outcome::Ignored;
    }
    let Some(open) = state.open.as_mut() else {
        return Outcome::Ignored;
    };
    let before = render::view_reply(&open.view, open.token);
    open.view.on_servings_input(text);
    edit_if_changed(open, before)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dietary::Dimension;
    use crate::recipe::Recipe;
    use pretty_assertions::assert_eq;

    fn milk_soup() -> Recipe {
        serde_json::from_value(serde_json::json!({
            "id": "1",
            "title": "Soup",
            "baseServings": 2,
            "ingredients": [
                {"name": "Water", "quantity": 4, "unit": "cup"},
                {"name": "Milk", "quantity": 1, "unit": "cup",
                 "alternatives": {"vegan": "Soy milk"}}
            ],
            "meta": {"inherentlyVegetarian": true},
            "instructions": "Boil."
        }))
        .unwrap()
    }

    fn open_soup() -> State {
        let mut state = State::default();
        let token = state.next_token();
        state.open = Some(OpenRecipe {
            view: DetailView::new(milk_soup()),
            message_id: MessageId(10),
            token,
        });
        state
    }

    fn shown(state: &State) -> Reply {
        let open = state.open.as_ref().unwrap();
        render::view_reply(&open.view, open.token)
    }

    fn edited_text(outcome: Outcome) -> String {
        match outcome {
            Outcome::Edit { message_id, reply } => {
                assert_eq!(message_id, MessageId(10));
                reply.text
            }
            other => panic!("expected an edit, got {:?}", other),
        }
    }

    #[test]
    fn test_locked_press_only_notifies() {
        let mut state = open_soup();
        let before = shown(&state);
        let outcome = apply(
            &mut state,
            &Action::Locked {
                view: 1,
                dimension: Dimension::Vegetarian,
            },
        );
        assert_eq!(
            outcome,
            Outcome::Notice(
                "Vegetarian is inherent to this recipe and cannot be changed".to_string()
            )
        );
        assert_eq!(shown(&state), before);
    }

    #[test]
    fn test_toggle_on_locked_checkbox_keeps_it_checked() {
        let mut state = open_soup();
        let before = shown(&state);
        let outcome = apply(
            &mut state,
            &Action::Toggle {
                view: 1,
                dimension: Dimension::Vegetarian,
            },
        );
        assert!(matches!(outcome, Outcome::Notice(_)));
        assert_eq!(shown(&state), before);
    }

    #[test]
    fn test_toggle_edits_open_message() {
        let mut state = open_soup();
        let outcome = apply(
            &mut state,
            &Action::Toggle {
                view: 1,
                dimension: Dimension::Vegan,
            },
        );
        assert!(edited_text(outcome).contains("• 1 cup Soy milk\n"));
    }

    #[test]
    fn test_hidden_dimension_is_refused() {
        let mut state = open_soup();
        let outcome = apply(
            &mut state,
            &Action::Toggle {
                view: 1,
                dimension: Dimension::GlutenFree,
            },
        );
        assert_eq!(
            outcome,
            Outcome::Notice("Gluten-free is not offered for this recipe".to_string())
        );
    }

    #[test]
    fn test_stale_press_is_refused() {
        let mut state = open_soup();
        let before = shown(&state);
        let step = Action::StepServings { view: 7, step: 1.0 };
        assert_eq!(apply(&mut state, &step), Outcome::Notice(STALE_VIEW.to_string()));
        assert_eq!(shown(&state), before);

        let mut closed = State::default();
        assert_eq!(apply(&mut closed, &step), Outcome::Notice(STALE_VIEW.to_string()));
    }

    #[test]
    fn test_reopening_invalidates_old_buttons() {
        let mut state = open_soup();
        let token = state.next_token();
        if let Some(open) = state.open.as_mut() {
            open.token = token;
        }
        let old = Action::StepServings { view: 1, step: 1.0 };
        assert_eq!(apply(&mut state, &old), Outcome::Notice(STALE_VIEW.to_string()));
        let new = Action::StepServings { view: token, step: 1.0 };
        assert!(edited_text(apply(&mut state, &new)).contains("Servings: 3\n"));
    }

    #[test]
    fn test_step_below_one_is_unchanged() {
        let mut state = open_soup();
        assert!(matches!(apply_text(&mut state, "1"), Outcome::Edit { .. }));
        let down = Action::StepServings { view: 1, step: -1.0 };
        assert_eq!(apply(&mut state, &down), Outcome::Unchanged);
    }

    #[test]
    fn test_same_servings_text_is_unchanged() {
        let mut state = open_soup();
        assert_eq!(apply_text(&mut state, "2"), Outcome::Unchanged);
    }

    #[test]
    fn test_text_is_servings_input_while_open() {
        let mut state = open_soup();
        let text = edited_text(apply_text(&mut state, "4"));
        assert!(text.contains("• 8 cup Water\n"));
        assert!(text.contains("• 2 cup Milk\n"));
    }

    #[test]
    fn test_text_is_ignored_without_open_view() {
        let mut state = State::default();
        assert_eq!(apply_text(&mut state, "4"), Outcome::Ignored);
        let mut state = open_soup();
        assert_eq!(apply_text(&mut state, "/recipes"), Outcome::Ignored);
        assert_eq!(
            apply(&mut state, &Action::Open("1".to_string())),
            Outcome::Ignored
        );
    }

    #[test]
    fn test_nothing_to_propose() {
        let mut state = State::default();
        assert_eq!(state.nothing_to_propose(), "There are no recipes to propose.");

        state.seen = vec!["1".to_string(), "2".to_string()];
        assert_eq!(
            state.nothing_to_propose(),
            "You circled over all recipes. /random starts over."
        );
        assert!(state.seen.is_empty());
    }
}

//! Payloads carried by inline-keyboard buttons, all shaped `path?key=value&...`.

use url::form_urlencoded;

use crate::dietary::Dimension;

const RECIPE: &str = "recipe";
const DIET: &str = "diet";
const LOCKED: &str = "locked";
const SERVINGS: &str = "servings";

/// A button press. Detail-view events carry the token of the view they were
/// rendered for, so presses on an older message can be told apart without
/// repeating the recipe id in every payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Open(String),
    Toggle { view: u32, dimension: Dimension },
    /// Press on a disabled checkbox.
    Locked { view: u32, dimension: Dimension },
    StepServings { view: u32, step: f64 },
}

fn with_query(path: &str, pairs: &[(&str, &str)]) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{}?{}", path, query)
}

fn query_param(query: &str, key: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Link to the detail view, the recipe id travels as the `id` query parameter.
pub fn detail_link(id: &str) -> String {
    with_query(RECIPE, &[("id", id)])
}

impl Action {
    pub fn encode(&self) -> String {
        match self {
            Action::Open(id) => detail_link(id),
            Action::Toggle { view, dimension } => {
                with_query(DIET, &[("v", view.to_string().as_str()), ("d", dimension.key())])
            }
            Action::Locked { view, dimension } => {
                with_query(LOCKED, &[("v", view.to_string().as_str()), ("d", dimension.key())])
            }
            Action::StepServings { view, step } => with_query(
                SERVINGS,
                &[
                    ("v", view.to_string().as_str()),
                    ("step", step.to_string().as_str()),
                ],
            ),
        }
    }

    pub fn decode(data: &str) -> Option<Action> {
        let (path, query) = data.split_once('?')?;
        if path == RECIPE {
            return query_param(query, "id").map(Action::Open);
        }

        let view = query_param(query, "v")?.parse().ok()?;
        let dimension = || Dimension::from_key(&query_param(query, "d")?);
        match path {
            DIET => Some(Action::Toggle {
                view,
                dimension: dimension()?,
            }),
            LOCKED => Some(Action::Locked {
                view,
                dimension: dimension()?,
            }),
            SERVINGS => {
                let step = query_param(query, "step")?.parse().ok()?;
                Some(Action::StepServings { view, step })
            }
            _ => None,
        }
    }
}

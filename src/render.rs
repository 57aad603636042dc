use std::path::Path;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile};
use teloxide::utils::html::escape;

use crate::callback::Action;
use crate::dietary::Checkbox;
use crate::view::{CatalogEntry, Detail, DetailView, NOT_FOUND};

/// Telegram's limit on callback payloads.
pub const MAX_CALLBACK_DATA: usize = 64;
/// Telegram's limit on message text, in UTF-16 code units.
pub const MAX_MESSAGE_LEN: usize = 4096;

const ELLIPSIS: char = '…';

/// An HTML message and its optional inline keyboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

pub fn catalog_reply(entries: &[CatalogEntry]) -> Reply {
    let rows = entries.iter().filter_map(|entry| {
        if entry.link.len() > MAX_CALLBACK_DATA {
            log::warn!("Link {:?} is too long for a button, skipping it", entry.link);
            return None;
        }
        Some(vec![InlineKeyboardButton::callback(
            entry.title.clone(),
            entry.link.clone(),
        )])
    });
    Reply {
        text: "<b>Recipes</b>".to_string(),
        keyboard: Some(InlineKeyboardMarkup::new(rows)),
    }
}

/// `token` identifies the view in the payloads of its buttons.
pub fn detail_reply(detail: &Detail, token: u32) -> Reply {
    match detail {
        Detail::NotFound => Reply {
            text: NOT_FOUND.to_string(),
            keyboard: None,
        },
        Detail::Found(view) => view_reply(view, token),
    }
}

pub fn view_reply(view: &DetailView, token: u32) -> Reply {
    Reply {
        text: detail_text(view),
        keyboard: Some(detail_keyboard(view, token)),
    }
}

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Escapes `raw` for HTML within `budget` UTF-16 units. Text that does not fit
/// is cut on a character boundary and ends with an ellipsis, so no entity is
/// ever split. The flag tells whether anything was cut.
fn escape_within(raw: &str, budget: usize) -> (String, bool) {
    let escaped = escape(raw);
    if utf16_len(&escaped) <= budget {
        return (escaped, false);
    }

    let mut out = String::new();
    let mut left = budget.saturating_sub(ELLIPSIS.len_utf16());
    let mut buf = [0; 4];
    for c in raw.chars() {
        let piece = escape(c.encode_utf8(&mut buf));
        let len = utf16_len(&piece);
        if len > left {
            break;
        }
        left -= len;
        out.push_str(&piece);
    }
    out.push(ELLIPSIS);
    (out, true)
}

/// Message text that stops growing once Telegram's limit is reached. Markup
/// counts against the limit too, which keeps the check conservative.
struct Bounded {
    text: String,
    left: usize,
    full: bool,
}

impl Bounded {
    fn new(limit: usize) -> Self {
        Bounded {
            text: String::new(),
            left: limit,
            full: false,
        }
    }

    fn take(&mut self, piece: &str) {
        self.left -= utf16_len(piece);
        self.text.push_str(piece);
    }

    /// Markup that is either sent whole or not at all.
    fn push_markup(&mut self, markup: &str) {
        if self.full {
            return;
        }
        if utf16_len(markup) > self.left {
            self.full = true;
            return;
        }
        self.take(markup);
    }

    /// Escaped text between `open` and `close`, shortened to what is left.
    fn push_text(&mut self, open: &str, raw: &str, close: &str) {
        if self.full {
            return;
        }
        let markup = utf16_len(open) + utf16_len(close);
        if markup + ELLIPSIS.len_utf16() > self.left {
            self.full = true;
            return;
        }
        let (escaped, cut) = escape_within(raw, self.left - markup);
        self.take(open);
        self.take(&escaped);
        self.take(close);
        self.full = cut;
    }
}

fn detail_text(view: &DetailView) -> String {
    let recipe = view.recipe();
    let mut text = Bounded::new(MAX_MESSAGE_LEN);
    text.push_text("<b>", &recipe.title, "</b>\n");
    if let Some(link) = recipe.link.as_deref().filter(|l| !l.is_empty()) {
        let link = escape(link);
        text.push_markup(&format!("Source: <a href=\"{}\">{}</a>\n", link, link));
    }
    text.push_text("\nServings: ", view.servings_input(), "\n");

    text.push_markup("\n<b>Ingredients</b>\n");
    for line in view.ingredient_lines() {
        text.push_text("• ", line, "\n");
    }

    text.push_markup("\n<b>Instructions</b>\n");
    text.push_text("", &recipe.instructions, "");
    if text.full {
        log::warn!("Detail of {:?} is too long for one message, cutting it", recipe.id);
    }
    text.text
}

fn checkbox_button(token: u32, checkbox: &Checkbox) -> InlineKeyboardButton {
    let mark = if checkbox.checked { "☑" } else { "☐" };
    let dimension = checkbox.dimension;
    let action = if checkbox.enabled {
        Action::Toggle {
            view: token,
            dimension,
        }
    } else {
        Action::Locked {
            view: token,
            dimension,
        }
    };
    InlineKeyboardButton::callback(format!("{} {}", mark, checkbox.label()), action.encode())
}

fn detail_keyboard(view: &DetailView, token: u32) -> InlineKeyboardMarkup {
    let step = |step: f64| Action::StepServings { view: token, step }.encode();
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    if !view.checkboxes().is_empty() {
        rows.push(
            view.checkboxes()
                .iter()
                .map(|checkbox| checkbox_button(token, checkbox))
                .collect(),
        );
    }
    rows.push(vec![
        InlineKeyboardButton::callback("−", step(-1.0)),
        InlineKeyboardButton::callback("+", step(1.0)),
    ]);
    InlineKeyboardMarkup::new(rows)
}

/// Absolute http(s) URLs are sent as is, anything else is a file under `assets_dir`.
pub fn image_file(image: &str, assets_dir: &Path) -> InputFile {
    match url::Url::parse(image) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => InputFile::url(url),
        _ => InputFile::file(assets_dir.join(image)),
    }
}

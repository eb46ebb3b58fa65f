use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use teloxide::types::Message;

use crate::messenger::Button;

pub const CANCEL: &str = "🚫 Скасувати";
pub const BACK: &str = "⬅️ Назад";
pub const PREVIOUS_STEP: &str = "↩️ Назад";

pub const NO_SUCH_OPTION: &str = "✖️ Немає такого варіанту вибору.";

lazy_static! {
    pub static ref PHONE_RE: Regex = Regex::new(r"^\+380\d{9}$").unwrap();
    pub static ref NON_DIGIT_RE: Regex = Regex::new(r"\D").unwrap();
}

/// Strips everything but digits, so `+380 50 111 22 33` becomes `380501112233`.
pub fn normalize_phone(raw: &str) -> String {
    NON_DIGIT_RE.replace_all(raw, "").into_owned()
}

/// Accepts only the `+380XXXXXXXXX` form typed by hand.
pub fn parse_phone(text: &str) -> Option<String> {
    PHONE_RE
        .is_match(text.trim())
        .then(|| normalize_phone(text))
}

#[derive(Clone, Debug, PartialEq)]
pub struct SharedContact {
    pub phone_number: String,
    pub user_id: Option<u64>,
}

/// The parts of an inbound message the screens care about.
#[derive(Clone, Debug, PartialEq)]
pub struct Input {
    pub user_id: u64,
    pub text: Option<String>,
    pub contact: Option<SharedContact>,
}

impl Input {
    pub fn from_message(msg: &Message) -> Option<Self> {
        let user = msg.from()?;

        Some(Self {
            user_id: user.id.0,
            text: msg.text().map(str::to_owned),
            contact: msg.contact().map(|c| SharedContact {
                phone_number: c.phone_number.clone(),
                user_id: c.user_id.map(|id| id.0),
            }),
        })
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is(&self, button: &str) -> bool {
        self.text() == Some(button)
    }
}

pub fn button_rows<I, S>(items: I, per_row: usize) -> Vec<Vec<Button>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let chunks = items.into_iter().chunks(per_row);
    chunks
        .into_iter()
        .map(|row| row.map(Button::new).collect())
        .collect()
}

pub fn button_column<I, S>(items: I) -> Vec<Vec<Button>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    button_rows(items, 1)
}

pub fn cancel_row() -> Vec<Button> {
    vec![Button::new(CANCEL)]
}

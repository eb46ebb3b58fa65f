use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{ButtonRequest, KeyboardButton, KeyboardMarkup, KeyboardRemove, ParseMode, ReplyMarkup},
};

use crate::Result;

#[derive(Clone, Debug, PartialEq)]
pub struct Button {
    pub text: String,
    pub request_contact: bool,
}

impl Button {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_contact: false,
        }
    }

    pub fn contact(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_contact: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Keyboard {
    Buttons(Vec<Vec<Button>>),
    Remove,
}

/// An outgoing chat message.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub html: bool,
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            html: false,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            html: true,
            ..Self::new(text)
        }
    }

    pub fn buttons(mut self, rows: Vec<Vec<Button>>) -> Self {
        self.keyboard = Some(Keyboard::Buttons(rows));
        self
    }

    pub fn remove_keyboard(mut self) -> Self {
        self.keyboard = Some(Keyboard::Remove);
        self
    }
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, chat_id: ChatId, reply: Reply) -> Result<()>;
}

#[async_trait]
impl Messenger for Bot {
    async fn send(&self, chat_id: ChatId, reply: Reply) -> Result<()> {
        let mut request = self.send_message(chat_id, reply.text);

        if reply.html {
            request = request.parse_mode(ParseMode::Html);
        }

        if let Some(keyboard) = reply.keyboard {
            request = request.reply_markup(reply_markup(keyboard));
        }

        request.await?;
        Ok(())
    }
}

fn reply_markup(keyboard: Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Remove => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
        Keyboard::Buttons(rows) => ReplyMarkup::Keyboard(KeyboardMarkup {
            keyboard: rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|b| {
                            let button = KeyboardButton::new(b.text);
                            if b.request_contact {
                                button.request(ButtonRequest::Contact)
                            } else {
                                button
                            }
                        })
                        .collect()
                })
                .collect(),
            resize_keyboard: Some(true),
            ..Default::default()
        }),
    }
}

#[cfg(test)]
pub mod testing {
    use tokio::sync::Mutex;

    use super::*;

    /// Keeps every message instead of sending it.
    #[derive(Default)]
    pub struct RecordingMessenger {
        sent: Mutex<Vec<(ChatId, Reply)>>,
    }

    impl RecordingMessenger {
        pub async fn take(&self) -> Vec<(ChatId, Reply)> {
            std::mem::take(&mut *self.sent.lock().await)
        }

        pub async fn texts(&self) -> Vec<String> {
            self.take().await.into_iter().map(|(_, r)| r.text).collect()
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send(&self, chat_id: ChatId, reply: Reply) -> Result<()> {
            self.sent.lock().await.push((chat_id, reply));
            Ok(())
        }
    }
}

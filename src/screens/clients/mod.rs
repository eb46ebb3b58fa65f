mod create;
mod delete;
mod edit;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use teloxide::utils::html;

use super::prelude::*;
use crate::entries::PaymentType;

pub use self::{create::CreateClientScreen, delete::DeleteClientScreen, edit::EditClientScreen};

const CREATE: &str = "➕ Створити";
const EDIT: &str = "✍️ Редагувати";
const DELETE: &str = "🗑 Видалити";

const CASH: &str = "💵 Готівка";
const CARD: &str = "💳 Карта";
const BOTH: &str = "💳 Карта або 💵 Готівка";

fn payment_label(payment_type: PaymentType) -> &'static str {
    match payment_type {
        PaymentType::Cash => CASH,
        PaymentType::Card => CARD,
        PaymentType::Both => BOTH,
    }
}

fn parse_payment(text: Option<&str>) -> Option<PaymentType> {
    match text? {
        CASH => Some(PaymentType::Cash),
        CARD => Some(PaymentType::Card),
        BOTH => Some(PaymentType::Both),
        _ => None,
    }
}

fn payment_keyboard() -> Vec<Vec<Button>> {
    vec![
        vec![Button::new(CASH), Button::new(CARD)],
        vec![Button::new(BOTH)],
        cancel_row(),
    ]
}

/// Non-empty trimmed text, if the message has any.
fn field(input: &Input) -> Option<String> {
    input
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

/// Existing phones as `+380...` buttons, one per row, followed by cancel.
async fn phone_keyboard(ctx: &Ctx<'_>) -> Result<Vec<Vec<Button>>> {
    let phones = ctx.registry.phone_numbers().await?;
    let mut keyboard = button_column(phones.into_iter().map(|p| format!("+{}", p)));
    keyboard.push(cancel_row());
    Ok(keyboard)
}

/// Lists clients and leads to the create, edit and delete forms.
#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct ClientsScreen;

#[async_trait]
impl Flow for ClientsScreen {
    async fn enter(&self, ctx: &Ctx<'_>) -> Result<()> {
        let clients = ctx
            .registry
            .clients()
            .await?
            .into_iter()
            .map(|c| format!("<code>+{}</code> ({})", c.phone_number, html::escape(&c.name)))
            .collect::<Vec<_>>()
            .join("\n");

        ctx.send(
            Reply::html(format!("<b>💼 Клієнти</b>\n{}\nОберіть:", clients)).buttons(vec![
                vec![Button::new(CREATE), Button::new(EDIT), Button::new(DELETE)],
                vec![Button::new(BACK)],
            ]),
        )
        .await
    }

    async fn handle(&mut self, ctx: &mut Ctx<'_>, input: &Input) -> Result<Transition> {
        Ok(match input.text() {
            Some(BACK) => Transition::Back,
            Some(CREATE) => Transition::Push(Screen::CreateClient(Default::default())),
            Some(EDIT) => Transition::Push(Screen::EditClient(Default::default())),
            Some(DELETE) => Transition::Push(Screen::DeleteClient(DeleteClientScreen)),
            _ => {
                ctx.say(NO_SUCH_OPTION).await?;
                Transition::Stay
            }
        })
    }
}

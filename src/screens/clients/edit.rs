use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{field, parse_payment, payment_keyboard, payment_label, phone_keyboard};
use crate::{entries::Client, registry::RegistryError, screens::prelude::*};

#[derive(Serialize, Deserialize, Clone, Copy, Default, Debug, PartialEq)]
pub enum EditStep {
    #[default]
    FindClient,
    PhoneNumber,
    Name,
    Address,
    PaymentType,
}

/// Walks through every field of an existing client, offering the current value as a button.
#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct EditClientScreen {
    pub step: EditStep,
    pub old_phone: Option<String>,
    pub client: Option<Client>,
}

fn current_value(value: String) -> Vec<Vec<Button>> {
    vec![vec![Button::new(value)], cancel_row()]
}

impl EditClientScreen {
    async fn next(&mut self, ctx: &Ctx<'_>, step: EditStep) -> Result<Transition> {
        self.step = step;
        self.enter(ctx).await?;
        Ok(Transition::Stay)
    }

    async fn find(&mut self, ctx: &Ctx<'_>, input: &Input) -> Result<Transition> {
        let phone = input.text().map(normalize_phone).unwrap_or_default();

        let Some(client) = ctx.registry.client(&phone).await? else {
            ctx.say("✖️ Клієнта за цим номером не знайдено.\nВведіть номер:")
                .await?;
            return Ok(Transition::Stay);
        };

        self.old_phone = Some(phone);
        self.client = Some(client);
        self.next(ctx, EditStep::PhoneNumber).await
    }

    async fn take_phone(&mut self, ctx: &Ctx<'_>, input: &Input) -> Result<Transition> {
        let phone = match (&input.contact, input.text().and_then(parse_phone)) {
            (Some(contact), _) => normalize_phone(&contact.phone_number),
            (None, Some(phone)) => phone,
            (None, None) => {
                ctx.say("✖️ Неправильний формат.").await?;
                return Ok(Transition::Stay);
            }
        };

        if self.old_phone.as_deref() != Some(phone.as_str()) {
            if let Some(other) = ctx.registry.client(&phone).await? {
                ctx.say(format!("✖️ Цей номер вже використаний клієнтом {}.", other.name))
                    .await?;
                return Ok(Transition::Stay);
            }
        }

        if let Some(client) = &mut self.client {
            client.phone_number = phone;
        }
        self.next(ctx, EditStep::Name).await
    }

    async fn save(&mut self, ctx: &Ctx<'_>, input: &Input) -> Result<Transition> {
        let Some(payment_type) = parse_payment(input.text()) else {
            ctx.say(NO_SUCH_OPTION).await?;
            return Ok(Transition::Stay);
        };

        let (Some(old_phone), Some(client)) = (&self.old_phone, &mut self.client) else {
            return Ok(Transition::Back);
        };
        client.payment_type = payment_type;

        let updated = ctx.registry.update_client(old_phone, client).await;
        match updated {
            Ok(()) => {
                ctx.say("Дані клієнта оновлено ✅.").await?;
                Ok(Transition::Back)
            }
            Err(RegistryError::ClientExists(phone)) => {
                ctx.say(format!("✖️ Номер +{} вже використаний іншим клієнтом.", phone))
                    .await?;
                self.next(ctx, EditStep::PhoneNumber).await
            }
            Err(RegistryError::ClientNotFound(_)) => {
                ctx.say("✖️ Клієнта вже видалено.").await?;
                Ok(Transition::Back)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Flow for EditClientScreen {
    async fn enter(&self, ctx: &Ctx<'_>) -> Result<()> {
        let reply = match (self.step, &self.client) {
            (EditStep::PhoneNumber, Some(client)) => Reply::new("Введіть новий номер:")
                .buttons(current_value(format!("+{}", client.phone_number))),
            (EditStep::Name, Some(client)) => Reply::new("Введіть назву підприємства:")
                .buttons(current_value(client.name.clone())),
            (EditStep::Address, Some(client)) => Reply::new("Введіть адресу підприємства:")
                .buttons(current_value(client.address.clone())),
            (EditStep::PaymentType, Some(client)) => Reply::new(format!(
                "Виберіть спосіб оплати ({}):",
                payment_label(client.payment_type)
            ))
            .buttons(payment_keyboard()),
            _ => Reply::html("<b>✍️ Редагування клієнта</b>\n\nВведіть номер клієнта:")
                .buttons(phone_keyboard(ctx).await?),
        };

        ctx.send(reply).await
    }

    async fn handle(&mut self, ctx: &mut Ctx<'_>, input: &Input) -> Result<Transition> {
        if input.is(CANCEL) {
            return Ok(Transition::Back);
        }

        match self.step {
            EditStep::FindClient => self.find(ctx, input).await,
            EditStep::PhoneNumber => self.take_phone(ctx, input).await,
            EditStep::Name | EditStep::Address => {
                let (Some(value), Some(client)) = (field(input), &mut self.client) else {
                    ctx.say("✖️ Неправильне значення.").await?;
                    return Ok(Transition::Stay);
                };

                if self.step == EditStep::Name {
                    client.name = value;
                    self.next(ctx, EditStep::Address).await
                } else {
                    client.address = value;
                    self.next(ctx, EditStep::PaymentType).await
                }
            }
            EditStep::PaymentType => self.save(ctx, input).await,
        }
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use teloxide::utils::html;

use super::{field, parse_payment, payment_keyboard};
use crate::{
    entries::Client,
    registry::RegistryError,
    screens::prelude::*,
};

#[derive(Serialize, Deserialize, Clone, Copy, Default, Debug, PartialEq)]
pub enum CreateStep {
    #[default]
    PhoneNumber,
    Name,
    Address,
    PaymentType,
}

#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct CreateClientScreen {
    pub step: CreateStep,
    pub phone_number: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
}

impl CreateClientScreen {
    async fn next(&mut self, ctx: &Ctx<'_>, step: CreateStep) -> Result<Transition> {
        self.step = step;
        self.enter(ctx).await?;
        Ok(Transition::Stay)
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

        if let Some(client) = ctx.registry.client(&phone).await? {
            ctx.say(format!("✖️ Цей номер вже використаний клієнтом {}.", client.name))
                .await?;
            return Ok(Transition::Stay);
        }

        self.phone_number = Some(phone);
        self.next(ctx, CreateStep::Name).await
    }

    async fn save(&mut self, ctx: &Ctx<'_>, input: &Input) -> Result<Transition> {
        let Some(payment_type) = parse_payment(input.text()) else {
            ctx.say(NO_SUCH_OPTION).await?;
            return Ok(Transition::Stay);
        };

        let client = Client {
            phone_number: self.phone_number.clone().unwrap_or_default(),
            name: self.name.clone().unwrap_or_default(),
            address: self.address.clone().unwrap_or_default(),
            payment_type,
        };

        match ctx.registry.create_client(&client).await {
            Ok(()) => {
                ctx.say("Клієнта додано ✅.").await?;
                Ok(Transition::Back)
            }
            Err(RegistryError::ClientExists(_)) => {
                ctx.say("✖️ Цей номер вже використаний іншим клієнтом.").await?;
                self.next(ctx, CreateStep::PhoneNumber).await
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Flow for CreateClientScreen {
    async fn enter(&self, ctx: &Ctx<'_>) -> Result<()> {
        let reply = match self.step {
            CreateStep::PhoneNumber => Reply::html(
                "<b>➕ Створення клієнта</b>\n\nВведіть номер (у форматі +380XXXXXXXXX):",
            )
            .buttons(vec![cancel_row()]),
            CreateStep::Name => {
                Reply::new("Введіть назву підприємства:").buttons(vec![cancel_row()])
            }
            CreateStep::Address => {
                Reply::new("Введіть адресу підприємства:").buttons(vec![cancel_row()])
            }
            CreateStep::PaymentType => {
                Reply::html(format!(
                    "Клієнт <b>{}</b>. Виберіть спосіб оплати:",
                    html::escape(self.name.as_deref().unwrap_or_default())
                ))
                .buttons(payment_keyboard())
            }
        };

        ctx.send(reply).await
    }

    async fn handle(&mut self, ctx: &mut Ctx<'_>, input: &Input) -> Result<Transition> {
        if input.is(CANCEL) {
            return Ok(Transition::Back);
        }

        match self.step {
            CreateStep::PhoneNumber => self.take_phone(ctx, input).await,
            CreateStep::Name | CreateStep::Address => {
                let Some(value) = field(input) else {
                    ctx.say("✖️ Неправильне значення.").await?;
                    return Ok(Transition::Stay);
                };

                if self.step == CreateStep::Name {
                    self.name = Some(value);
                    self.next(ctx, CreateStep::Address).await
                } else {
                    self.address = Some(value);
                    self.next(ctx, CreateStep::PaymentType).await
                }
            }
            CreateStep::PaymentType => self.save(ctx, input).await,
        }
    }
}

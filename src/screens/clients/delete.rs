use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::phone_keyboard;
use crate::{registry::RegistryError, screens::prelude::*};

#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct DeleteClientScreen;

#[async_trait]
impl Flow for DeleteClientScreen {
    async fn enter(&self, ctx: &Ctx<'_>) -> Result<()> {
        ctx.send(
            Reply::html("<b>🗑 Видалення клієнта</b>\n\nВведіть номер клієнта:")
                .buttons(phone_keyboard(ctx).await?),
        )
        .await
    }

    async fn handle(&mut self, ctx: &mut Ctx<'_>, input: &Input) -> Result<Transition> {
        if input.is(CANCEL) {
            return Ok(Transition::Back);
        }

        let phone = input.text().map(normalize_phone).unwrap_or_default();

        match ctx.registry.delete_client(&phone).await {
            Ok(()) => {
                ctx.say("Клієнта видалено ✅.").await?;
                Ok(Transition::Back)
            }
            Err(RegistryError::ClientNotFound(_)) => {
                ctx.say("✖️ Клієнта з таким номером не знайдено.\n\nВведіть номер клієнта:")
                    .await?;
                Ok(Transition::Stay)
            }
            Err(e) => Err(e.into()),
        }
    }
}

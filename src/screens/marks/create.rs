use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{registry::RegistryError, screens::prelude::*};

#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct CreateMarkScreen;

#[async_trait]
impl Flow for CreateMarkScreen {
    async fn enter(&self, ctx: &Ctx<'_>) -> Result<()> {
        ctx.send(Reply::new("Введіть марку:").buttons(vec![cancel_row()]))
            .await
    }

    async fn handle(&mut self, ctx: &mut Ctx<'_>, input: &Input) -> Result<Transition> {
        let Some(name) = input.text().map(str::trim).filter(|t| !t.is_empty()) else {
            ctx.say("✖️ Неправильне значення.").await?;
            self.enter(ctx).await?;
            return Ok(Transition::Stay);
        };

        if name == CANCEL {
            return Ok(Transition::Back);
        }

        match ctx.registry.create_mark(name).await {
            Ok(()) => {
                ctx.say("Марку створено ✅.").await?;
                Ok(Transition::Back)
            }
            Err(RegistryError::MarkExists(_)) => {
                ctx.say("❌ Марка вже існує.").await?;
                self.enter(ctx).await?;
                Ok(Transition::Stay)
            }
            Err(e) => Err(e.into()),
        }
    }
}

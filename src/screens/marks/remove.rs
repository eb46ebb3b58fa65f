use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{registry::RegistryError, screens::prelude::*};

#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct RemoveMarkScreen;

#[async_trait]
impl Flow for RemoveMarkScreen {
    async fn enter(&self, ctx: &Ctx<'_>) -> Result<()> {
        let mut keyboard = button_rows(ctx.registry.marks().await?, 2);
        keyboard.push(cancel_row());

        ctx.send(Reply::new("Введіть марку:").buttons(keyboard)).await
    }

    async fn handle(&mut self, ctx: &mut Ctx<'_>, input: &Input) -> Result<Transition> {
        let Some(name) = input.text() else {
            ctx.say(NO_SUCH_OPTION).await?;
            self.enter(ctx).await?;
            return Ok(Transition::Stay);
        };

        if name == CANCEL {
            return Ok(Transition::Back);
        }

        match ctx.registry.remove_mark(name).await {
            Ok(()) => {
                ctx.say("Марку видалено ✅.").await?;
                Ok(Transition::Back)
            }
            Err(RegistryError::MarkNotExist(_)) => {
                ctx.say("❌ Марка не існує.").await?;
                self.enter(ctx).await?;
                Ok(Transition::Stay)
            }
            Err(e) => Err(e.into()),
        }
    }
}

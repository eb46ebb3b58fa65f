use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{prelude::*, ClientsScreen, MarksScreen};

const CLIENTS: &str = "💼 Клієнти";
const MARKS: &str = "🔖 Марки";

/// Root menu for admins.
#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct AdminScreen;

#[async_trait]
impl Flow for AdminScreen {
    async fn enter(&self, ctx: &Ctx<'_>) -> Result<()> {
        ctx.send(
            Reply::html("<b>🏛 Головне меню</b>\nОберіть:")
                .buttons(button_column([CLIENTS, MARKS])),
        )
        .await
    }

    async fn handle(&mut self, ctx: &mut Ctx<'_>, input: &Input) -> Result<Transition> {
        match input.text() {
            Some(CLIENTS) => Ok(Transition::Push(Screen::Clients(ClientsScreen))),
            Some(MARKS) => Ok(Transition::Push(Screen::Marks(MarksScreen))),
            _ => {
                ctx.say(NO_SUCH_OPTION).await?;
                self.enter(ctx).await?;
                Ok(Transition::Stay)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screens::testing::Harness;

    #[tokio::test]
    async fn unknown_option_rerenders_menu() {
        let mut h = Harness::new();
        h.open(1, Screen::Admin(AdminScreen)).await;
        h.texts().await;

        h.say(1, "що?").await;

        let texts = h.texts().await;
        assert_eq!(texts[0], NO_SUCH_OPTION);
        assert!(texts[1].contains("Головне меню"));
        assert_eq!(h.top_name(1), Some("admin"));
    }
}

mod create;
mod remove;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use teloxide::utils::html;

use super::prelude::*;

pub use self::{create::CreateMarkScreen, remove::RemoveMarkScreen};

const CREATE: &str = "➕ Створити";
const DELETE: &str = "🗑 Видалити";

#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct MarksScreen;

#[async_trait]
impl Flow for MarksScreen {
    async fn enter(&self, ctx: &Ctx<'_>) -> Result<()> {
        let marks = ctx
            .registry
            .marks()
            .await?
            .iter()
            .map(|m| format!("<code>{}</code>", html::escape(m)))
            .collect::<Vec<_>>()
            .join(", ");

        ctx.send(
            Reply::html(format!("<b>🔖 Марки</b>\n\n{}\n\nОберіть:", marks)).buttons(vec![
                vec![Button::new(CREATE), Button::new(DELETE)],
                vec![Button::new(BACK)],
            ]),
        )
        .await
    }

    async fn handle(&mut self, ctx: &mut Ctx<'_>, input: &Input) -> Result<Transition> {
        Ok(match input.text() {
            Some(BACK) => Transition::Back,
            Some(CREATE) => Transition::Push(Screen::CreateMark(CreateMarkScreen)),
            Some(DELETE) => Transition::Push(Screen::RemoveMark(RemoveMarkScreen)),
            _ => {
                ctx.say(NO_SUCH_OPTION).await?;
                self.enter(ctx).await?;
                Transition::Stay
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screens::{testing::Harness, AdminScreen};

    #[tokio::test]
    async fn create_then_remove() {
        let mut h = Harness::new();
        h.open(1, Screen::Admin(AdminScreen)).await;
        h.say(1, "🔖 Марки").await;

        h.say(1, CREATE).await;
        h.say(1, "ПЦ-400").await;
        assert_eq!(h.top_name(1), Some("marks"));

        h.say(1, CREATE).await;
        h.say(1, "ПЦ-500").await;
        h.texts().await;

        h.say(1, DELETE).await;
        h.say(1, "ПЦ-400").await;

        assert_eq!(h.registry().marks().await.unwrap(), vec!["ПЦ-500"]);
        let texts = h.texts().await;
        assert!(texts.contains(&"Марку видалено ✅.".to_owned()));
        assert!(texts
            .last()
            .unwrap()
            .contains("<code>ПЦ-500</code>"));

        h.say(1, BACK).await;
        assert_eq!(h.top_name(1), Some("admin"));
    }
}

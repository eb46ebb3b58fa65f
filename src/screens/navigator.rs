use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use super::{Ctx, Flow, Screen, Transition};
use crate::{common::Input, Result};

/// A stack of screens per Telegram user. Only the top screen receives input.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct Navigator {
    stacks: HashMap<u64, Vec<Screen>>,
}

impl Navigator {
    pub fn top(&self, user_id: u64) -> Option<&Screen> {
        self.stacks.get(&user_id).and_then(|stack| stack.last())
    }

    pub fn depth(&self, user_id: u64) -> usize {
        self.stacks.get(&user_id).map(Vec::len).unwrap_or(0)
    }

    pub fn clear(&mut self, user_id: u64) {
        self.stacks.remove(&user_id);
    }

    pub async fn open(&mut self, ctx: &mut Ctx<'_>, screen: Screen) -> Result<()> {
        debug!("User {} opens {}", ctx.user_id, screen.name());
        self.stacks.entry(ctx.user_id).or_default().push(screen);
        self.render(ctx).await
    }

    /// Pops the top screen and re-renders the one below. Popping the last screen leaves the user with none.
    pub async fn go_back(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        let Some(stack) = self.stacks.get_mut(&ctx.user_id) else {
            return Ok(());
        };

        stack.pop();
        if stack.is_empty() {
            self.stacks.remove(&ctx.user_id);
            return Ok(());
        }

        self.render(ctx).await
    }

    pub async fn replace(&mut self, ctx: &mut Ctx<'_>, screen: Screen) -> Result<()> {
        let stack = self.stacks.entry(ctx.user_id).or_default();
        stack.pop();
        stack.push(screen);
        self.render(ctx).await
    }

    pub async fn reset(&mut self, ctx: &mut Ctx<'_>, screen: Screen) -> Result<()> {
        self.stacks.insert(ctx.user_id, vec![screen]);
        self.render(ctx).await
    }

    /// Hands the input to the top screen. Returns `false` when the user has no screen.
    pub async fn dispatch(&mut self, ctx: &mut Ctx<'_>, input: &Input) -> Result<bool> {
        let Some(screen) = self
            .stacks
            .get_mut(&ctx.user_id)
            .and_then(|stack| stack.last_mut())
        else {
            return Ok(false);
        };

        let transition = screen.handle(ctx, input).await?;
        self.apply(ctx, transition).await?;

        Ok(true)
    }

    async fn apply(&mut self, ctx: &mut Ctx<'_>, transition: Transition) -> Result<()> {
        match transition {
            Transition::Stay => Ok(()),
            Transition::Push(screen) => self.open(ctx, screen).await,
            Transition::Back => self.go_back(ctx).await,
            Transition::Replace(screen) => self.replace(ctx, screen).await,
            Transition::Reset(screen) => self.reset(ctx, screen).await,
        }
    }

    async fn render(&self, ctx: &Ctx<'_>) -> Result<()> {
        match self.top(ctx.user_id) {
            Some(screen) => screen.enter(ctx).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::BotState;
    use crate::screens::{testing::Harness, AdminScreen, ClientsScreen, MarksScreen};

    #[tokio::test]
    async fn push_back_and_reset() {
        let mut h = Harness::new();

        h.open(1, Screen::Admin(AdminScreen)).await;
        h.say(1, "💼 Клієнти").await;
        assert_eq!(h.top_name(1), Some("clients"));
        assert_eq!(h.state.navigator.depth(1), 2);

        h.texts().await;
        h.say(1, "⬅️ Назад").await;
        assert_eq!(h.top_name(1), Some("admin"));
        // The menu below is rendered again.
        assert_eq!(h.texts().await.len(), 1);

        h.say(1, "🔖 Марки").await;
        assert_eq!(h.state.navigator.depth(1), 2);

        let BotState { navigator, session } = &mut h.state;
        let mut ctx = Ctx::new(&h.services, session, 1, teloxide::types::ChatId(1));
        navigator
            .reset(&mut ctx, Screen::Clients(ClientsScreen))
            .await
            .unwrap();
        navigator
            .replace(&mut ctx, Screen::Marks(MarksScreen))
            .await
            .unwrap();

        assert_eq!(navigator.depth(1), 1);
        assert_eq!(navigator.top(1).map(Screen::name), Some("marks"));
    }

    #[tokio::test]
    async fn stacks_are_per_user() {
        let mut h = Harness::new();

        h.open(1, Screen::Admin(AdminScreen)).await;
        h.open(2, Screen::Admin(AdminScreen)).await;
        h.say(1, "💼 Клієнти").await;

        assert_eq!(h.top_name(1), Some("clients"));
        assert_eq!(h.top_name(2), Some("admin"));

        h.state.navigator.clear(1);
        assert_eq!(h.top(1), None);
        assert_eq!(h.top_name(2), Some("admin"));
    }

    #[tokio::test]
    async fn popping_last_screen_leaves_nothing() {
        let mut h = Harness::new();

        h.open(1, Screen::Clients(ClientsScreen)).await;
        h.texts().await;
        h.say(1, "⬅️ Назад").await;

        assert_eq!(h.top(1), None);
        assert!(h.texts().await.is_empty());
        assert!(!h.state.navigator.stacks.contains_key(&1));
    }

    #[tokio::test]
    async fn dispatch_without_screen() {
        let mut h = Harness::new();
        let BotState { navigator, session } = &mut h.state;
        let mut ctx = Ctx::new(&h.services, session, 5, teloxide::types::ChatId(5));

        let handled = navigator
            .dispatch(&mut ctx, &crate::common::testing::text(5, "hi"))
            .await
            .unwrap();

        assert!(!handled);
    }

    #[test]
    fn stacks_serialize_by_user() {
        let mut navigator = Navigator::default();
        navigator
            .stacks
            .insert(7, vec![Screen::Admin(AdminScreen), Screen::Marks(MarksScreen)]);

        let json = serde_json::to_string(&navigator).unwrap();
        let restored: Navigator = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, navigator);
        assert!(json.starts_with("{\"7\":"));
    }
}

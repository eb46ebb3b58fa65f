use std::sync::Arc;

use log::{debug, info};
use teloxide::{
    dispatching::UpdateHandler,
    prelude::*,
    types::Chat,
};
use tokio::sync::Mutex;

use crate::{
    common::Input,
    config::Config,
    entries::{Role, User},
    messenger::{Messenger, Reply},
    persistence::BotState,
    registry::Registry,
    screens::{AdminScreen, AuthorizationScreen, Ctx, OrderScreen, Screen},
    BoxedError, Result,
};

pub struct Services {
    pub registry: Registry,
    pub messenger: Arc<dyn Messenger>,
    pub config: Config,
}

pub type SharedServices = Arc<Services>;
pub type SharedState = Arc<Mutex<BotState>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Other,
}

impl ChatKind {
    pub fn of(chat: &Chat) -> Self {
        if chat.is_private() {
            ChatKind::Private
        } else if chat.is_group() || chat.is_supergroup() {
            ChatKind::Group
        } else {
            ChatKind::Other
        }
    }
}

pub fn schema() -> UpdateHandler<BoxedError> {
    Update::filter_message()
        .branch(
            dptree::filter(|msg: Message| ChatKind::of(&msg.chat) != ChatKind::Other)
                .endpoint(on_message),
        )
}

async fn on_message(msg: Message, services: SharedServices, state: SharedState) -> Result<()> {
    let Some(input) = Input::from_message(&msg) else {
        return Ok(());
    };

    let mut state = state.lock().await;
    handle_message(&services, &mut state, ChatKind::of(&msg.chat), msg.chat.id, input).await
}

/// Routes one message and saves the state, also when routing failed.
pub async fn handle_message(
    services: &Services,
    state: &mut BotState,
    kind: ChatKind,
    chat_id: ChatId,
    input: Input,
) -> Result<()> {
    let routed = route(services, state, kind, chat_id, input).await;
    state.save(&services.config.state.file).await?;

    routed
}

fn root_screen(user: Option<&User>) -> Screen {
    match user.map(|u| u.role) {
        None => Screen::Authorization(AuthorizationScreen::default()),
        Some(Role::Admin) => Screen::Admin(AdminScreen),
        Some(Role::Client) => Screen::Order(OrderScreen::default()),
    }
}

fn is_command(input: &Input, command: &str) -> bool {
    input.text().map_or(false, |text| {
        let word = text.split_whitespace().next().unwrap_or_default();
        word == command
            || word
                .strip_prefix(command)
                .map_or(false, |rest| rest.starts_with('@'))
    })
}

/// Handles one message from any chat.
pub async fn route(
    services: &Services,
    state: &mut BotState,
    kind: ChatKind,
    chat_id: ChatId,
    input: Input,
) -> Result<()> {
    match kind {
        ChatKind::Private => private(services, state, chat_id, input).await,
        ChatKind::Group => group(services, state, chat_id, input).await,
        ChatKind::Other => Ok(()),
    }
}

async fn group(
    services: &Services,
    state: &mut BotState,
    chat_id: ChatId,
    input: Input,
) -> Result<()> {
    if !is_command(&input, "/notify") {
        return Ok(());
    }

    let user = services.registry.user_by_telegram_id(input.user_id).await?;
    if user.map(|u| u.role) != Some(Role::Admin) {
        debug!("Ignoring /notify from {} in {}", input.user_id, chat_id.0);
        return Ok(());
    }

    state.session.group_id = Some(chat_id.0);
    services
        .messenger
        .send(chat_id, Reply::new("Групу встановлено ✅."))
        .await?;
    info!("Staff group set to {}", chat_id.0);

    Ok(())
}

async fn private(
    services: &Services,
    state: &mut BotState,
    chat_id: ChatId,
    input: Input,
) -> Result<()> {
    let user_id = input.user_id;
    let user = services.registry.user_by_telegram_id(user_id).await?;

    let BotState { navigator, session } = state;
    if let Some(user) = &user {
        session.set_phone(user_id, user.phone_number.clone());
    }
    let mut ctx = Ctx::new(services, session, user_id, chat_id);

    if is_command(&input, "/start") {
        debug!("User {} restarts", user_id);
        navigator.clear(user_id);
    } else if let Some(screen) = navigator.top(user_id) {
        if user.is_some() || matches!(screen, Screen::Authorization(_)) {
            navigator.dispatch(&mut ctx, &input).await?;
            return Ok(());
        }

        debug!("Unknown user {} left {}", user_id, screen.name());
        navigator.clear(user_id);
    }

    navigator.open(&mut ctx, root_screen(user.as_ref())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::testing::{contact, text},
        entries::{Client, PaymentType},
        screens::testing::Harness,
    };

    async fn send(h: &mut Harness, kind: ChatKind, chat: i64, input: Input) {
        route(&h.services, &mut h.state, kind, ChatId(chat), input)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_user_is_held_on_authorization() {
        let mut h = Harness::new();
        h.open(9, Screen::Admin(AdminScreen)).await;

        send(&mut h, ChatKind::Private, 9, text(9, "💼 Клієнти")).await;
        assert_eq!(h.top_name(9), Some("authorization"));
        assert_eq!(h.state.navigator.depth(9), 1);

        send(&mut h, ChatKind::Private, 9, text(9, "привіт")).await;
        assert_eq!(h.top_name(9), Some("authorization"));
    }

    #[tokio::test]
    async fn login_then_start_opens_root() {
        let mut h = Harness::new();
        h.registry()
            .create_client(&Client {
                phone_number: "380501112233".to_owned(),
                name: "Beton".to_owned(),
                address: "Kyiv".to_owned(),
                payment_type: PaymentType::Cash,
            })
            .await
            .unwrap();

        send(&mut h, ChatKind::Private, 4, text(4, "/start")).await;
        send(&mut h, ChatKind::Private, 4, contact(4, "+380501112233", Some(4))).await;
        assert_eq!(h.top_name(4), Some("order"));

        send(&mut h, ChatKind::Private, 4, text(4, "ПЦ-500")).await;
        assert_eq!(h.state.navigator.depth(4), 1);

        h.state.session.phones.clear();
        send(&mut h, ChatKind::Private, 4, text(4, "/start")).await;
        assert_eq!(h.top_name(4), Some("order"));
        assert_eq!(h.state.session.phone(4), Some("380501112233"));
    }

    #[tokio::test]
    async fn notify_from_admin_only() {
        let mut h = Harness::new();
        h.registry().ensure_admin("380500000001").await.unwrap();
        h.registry()
            .bind_telegram_user("380500000001", 1)
            .await
            .unwrap();

        send(&mut h, ChatKind::Group, -42, text(2, "/notify")).await;
        assert_eq!(h.state.session.group_id, None);

        send(&mut h, ChatKind::Group, -42, text(1, "/notify@ecocement_bot")).await;
        assert_eq!(h.state.session.group_id, Some(-42));

        let sent = h.recorder.take().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ChatId(-42));
        assert_eq!(sent[0].1.text, "Групу встановлено ✅.");
    }

    struct Offline;

    #[async_trait::async_trait]
    impl Messenger for Offline {
        async fn send(&self, _: ChatId, _: Reply) -> Result<()> {
            Err("telegram is unreachable".into())
        }
    }

    #[tokio::test]
    async fn state_is_saved_after_each_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut h = Harness::new();
        h.services.config.state.file = path.clone();

        handle_message(&h.services, &mut h.state, ChatKind::Private, ChatId(3), text(3, "/start"))
            .await
            .unwrap();

        let saved = BotState::load(&path).await;
        assert_eq!(saved, h.state);
        assert_eq!(saved.navigator.top(3).map(Screen::name), Some("authorization"));

        h.services.messenger = Arc::new(Offline);
        let result = handle_message(
            &h.services,
            &mut h.state,
            ChatKind::Private,
            ChatId(6),
            text(6, "привіт"),
        )
        .await;

        assert!(result.is_err());
        let saved = BotState::load(&path).await;
        assert_eq!(saved.navigator.top(6).map(Screen::name), Some("authorization"));
        assert_eq!(saved.navigator.depth(3), 1);
    }

    #[tokio::test]
    async fn other_chats_are_ignored() {
        let mut h = Harness::new();

        send(&mut h, ChatKind::Other, -7, text(1, "/notify")).await;
        send(&mut h, ChatKind::Group, -7, text(1, "/start")).await;

        assert!(h.recorder.take().await.is_empty());
        assert_eq!(h.state, BotState::default());
    }
}

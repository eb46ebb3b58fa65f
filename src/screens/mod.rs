pub mod admin;
pub mod auth;
pub mod clients;
pub mod marks;
pub mod navigator;
pub mod order;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use teloxide::types::ChatId;

use crate::{
    common::Input,
    config::Config,
    handlers::Services,
    messenger::{Messenger, Reply},
    persistence::Session,
    registry::Registry,
    Result,
};

pub use self::{
    admin::AdminScreen,
    auth::AuthorizationScreen,
    clients::{ClientsScreen, CreateClientScreen, DeleteClientScreen, EditClientScreen},
    marks::{CreateMarkScreen, MarksScreen, RemoveMarkScreen},
    navigator::Navigator,
    order::OrderScreen,
};

pub mod prelude {
    pub use super::{Ctx, Flow, Screen, Transition};
    pub use crate::{
        common::*,
        messenger::{Button, Reply},
        Result,
    };
}

/// Everything a screen may touch while handling one message.
pub struct Ctx<'a> {
    pub registry: &'a Registry,
    pub messenger: &'a dyn Messenger,
    pub config: &'a Config,
    pub session: &'a mut Session,
    pub user_id: u64,
    pub chat_id: ChatId,
}

impl<'a> Ctx<'a> {
    pub fn new(services: &'a Services, session: &'a mut Session, user_id: u64, chat_id: ChatId) -> Self {
        Self {
            registry: &services.registry,
            messenger: services.messenger.as_ref(),
            config: &services.config,
            session,
            user_id,
            chat_id,
        }
    }

    pub async fn send(&self, reply: Reply) -> Result<()> {
        self.messenger.send(self.chat_id, reply).await
    }

    pub async fn say(&self, text: impl Into<String> + Send) -> Result<()> {
        self.send(Reply::new(text)).await
    }
}

/// What the navigator does after a screen handled a message.
#[derive(Debug, PartialEq)]
pub enum Transition {
    Stay,
    Push(Screen),
    Back,
    Replace(Screen),
    Reset(Screen),
}

#[async_trait]
pub trait Flow {
    /// Renders the current step.
    async fn enter(&self, ctx: &Ctx<'_>) -> Result<()>;

    async fn handle(&mut self, ctx: &mut Ctx<'_>, input: &Input) -> Result<Transition>;
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Screen {
    Authorization(AuthorizationScreen),
    Admin(AdminScreen),
    Clients(ClientsScreen),
    CreateClient(CreateClientScreen),
    EditClient(EditClientScreen),
    DeleteClient(DeleteClientScreen),
    Marks(MarksScreen),
    CreateMark(CreateMarkScreen),
    RemoveMark(RemoveMarkScreen),
    Order(OrderScreen),
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::Authorization(_) => "authorization",
            Screen::Admin(_) => "admin",
            Screen::Clients(_) => "clients",
            Screen::CreateClient(_) => "create_client",
            Screen::EditClient(_) => "edit_client",
            Screen::DeleteClient(_) => "delete_client",
            Screen::Marks(_) => "marks",
            Screen::CreateMark(_) => "create_mark",
            Screen::RemoveMark(_) => "remove_mark",
            Screen::Order(_) => "order",
        }
    }

    fn flow(&self) -> &(dyn Flow + Send + Sync) {
        match self {
            Screen::Authorization(s) => s,
            Screen::Admin(s) => s,
            Screen::Clients(s) => s,
            Screen::CreateClient(s) => s,
            Screen::EditClient(s) => s,
            Screen::DeleteClient(s) => s,
            Screen::Marks(s) => s,
            Screen::CreateMark(s) => s,
            Screen::RemoveMark(s) => s,
            Screen::Order(s) => s,
        }
    }

    fn flow_mut(&mut self) -> &mut (dyn Flow + Send + Sync) {
        match self {
            Screen::Authorization(s) => s,
            Screen::Admin(s) => s,
            Screen::Clients(s) => s,
            Screen::CreateClient(s) => s,
            Screen::EditClient(s) => s,
            Screen::DeleteClient(s) => s,
            Screen::Marks(s) => s,
            Screen::CreateMark(s) => s,
            Screen::RemoveMark(s) => s,
            Screen::Order(s) => s,
        }
    }
}

#[async_trait]
impl Flow for Screen {
    async fn enter(&self, ctx: &Ctx<'_>) -> Result<()> {
        self.flow().enter(ctx).await
    }

    async fn handle(&mut self, ctx: &mut Ctx<'_>, input: &Input) -> Result<Transition> {
        self.flow_mut().handle(ctx, input).await
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Arc;

    use teloxide::types::ChatId;

    use super::*;
    use crate::{
        common::testing::text, config, messenger::testing::RecordingMessenger,
        persistence::BotState,
    };

    pub struct Harness {
        pub services: Services,
        pub recorder: Arc<RecordingMessenger>,
        pub state: BotState,
    }

    impl Harness {
        pub fn new() -> Self {
            let recorder = Arc::new(RecordingMessenger::default());

            Self {
                services: Services {
                    registry: Registry::in_memory(),
                    messenger: recorder.clone(),
                    config: config::sample(),
                },
                recorder,
                state: BotState::default(),
            }
        }

        pub fn registry(&self) -> &Registry {
            &self.services.registry
        }

        pub async fn open(&mut self, user_id: u64, screen: Screen) {
            let BotState { navigator, session } = &mut self.state;
            let mut ctx = Ctx::new(&self.services, session, user_id, ChatId(user_id as i64));
            navigator.open(&mut ctx, screen).await.unwrap();
        }

        pub async fn input(&mut self, input: Input) {
            let BotState { navigator, session } = &mut self.state;
            let mut ctx = Ctx::new(&self.services, session, input.user_id, ChatId(input.user_id as i64));
            navigator.dispatch(&mut ctx, &input).await.unwrap();
        }

        pub async fn say(&mut self, user_id: u64, message: &str) {
            self.input(text(user_id, message)).await
        }

        pub async fn replies(&self) -> Vec<Reply> {
            self.recorder.take().await.into_iter().map(|(_, r)| r).collect()
        }

        pub async fn texts(&self) -> Vec<String> {
            self.recorder.texts().await
        }

        pub fn top(&self, user_id: u64) -> Option<&Screen> {
            self.state.navigator.top(user_id)
        }

        pub fn top_name(&self, user_id: u64) -> Option<&'static str> {
            self.top(user_id).map(Screen::name)
        }
    }
}

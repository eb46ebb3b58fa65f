extern crate tables;

mod common;
mod config;
mod entries;
mod handlers;
mod messenger;
mod orders;
mod persistence;
mod registry;
mod screens;

use std::error::Error as StdError;
use std::fmt::Display;
use std::sync::Arc;

use futures::future::BoxFuture;
use log::{debug, info};
use teloxide::{error_handlers::ErrorHandler, prelude::*};
use tokio::sync::Mutex;

use crate::{
    common::normalize_phone,
    config::Config,
    handlers::{Services, SharedState},
    persistence::BotState,
    registry::Registry,
};

pub type BoxedError = Box<dyn StdError + Send + Sync>;
pub type Result<T> = std::result::Result<T, BoxedError>;

#[derive(Debug)]
pub enum BotError {
    Config(String),
    Delivery(String),
}

impl Display for BotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotError::Config(s) => write!(f, "config error: {}", s),
            BotError::Delivery(s) => write!(f, "order delivery error: {}", s),
        }
    }
}

impl StdError for BotError {}

struct DisplayErrorHandler;

impl<E> ErrorHandler<E> for DisplayErrorHandler
where
    E: Display,
{
    fn handle_error(self: Arc<Self>, error: E) -> BoxFuture<'static, ()> {
        log::error!("An error occurred: {}", error);
        Box::pin(async {})
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let config = Config::read()?;
    let registry = Registry::open(&config.database.file)?;

    for admin in &config.admins {
        registry.ensure_admin(&normalize_phone(admin)).await?;
    }

    let state: SharedState = Arc::new(Mutex::new(BotState::load(&config.state.file).await));
    let state_file = config.state.file.clone();

    let bot = Bot::new(&config.telegram.bot_token);
    let services = Arc::new(Services {
        registry,
        messenger: Arc::new(bot.clone()),
        config,
    });

    info!("Starting the bot");

    let mut deps = DependencyMap::default();
    deps.insert(services);
    deps.insert(state.clone());

    Dispatcher::builder(bot, handlers::schema())
        .dependencies(deps)
        .enable_ctrlc_handler()
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd);
        })
        .error_handler(Arc::new(DisplayErrorHandler))
        .build()
        .dispatch()
        .await;

    state.lock().await.save(&state_file).await?;
    info!("State saved to {}", state_file.display());

    Ok(())
}

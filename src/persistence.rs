use std::{collections::HashMap, io::ErrorKind, path::Path};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{screens::Navigator, Result};

/// Per-user data that outlives a single screen.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct Session {
    /// Phone each Telegram user authorized with.
    #[serde(default)]
    pub phones: HashMap<u64, String>,
    /// Staff group set with `/notify`.
    #[serde(default)]
    pub group_id: Option<i64>,
}

impl Session {
    pub fn set_phone(&mut self, user_id: u64, phone: impl Into<String>) {
        self.phones.insert(user_id, phone.into());
    }

    pub fn phone(&self, user_id: u64) -> Option<&str> {
        self.phones.get(&user_id).map(String::as_str)
    }
}

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct BotState {
    #[serde(default)]
    pub navigator: Navigator,
    #[serde(default)]
    pub session: Session,
}

impl BotState {
    /// Never fails: a missing or broken file gives an empty state.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No state at {}, starting fresh", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("Can't read state from {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_slice(&data) {
            Ok(state) => {
                info!("State loaded from {}", path.display());
                state
            }
            Err(e) => {
                warn!("Discarding state at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");

        let data = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, path).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screens::{order::OrderStep, AdminScreen, OrderScreen, Screen};

    #[tokio::test]
    async fn missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        assert_eq!(BotState::load(&path).await, BotState::default());

        tokio::fs::write(&path, b"{\"navigator\": 42").await.unwrap();
        assert_eq!(BotState::load(&path).await, BotState::default());
    }

    #[tokio::test]
    async fn stacks_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut order = OrderScreen::default();
        order.step = OrderStep::EnterCarsCount;
        order.form.mark = Some("ПЦ-500".to_owned());

        let mut state = BotState::default();
        let json = serde_json::json!({
            "1": [{ "Admin": null }],
            "2": [serde_json::to_value(Screen::Order(order.clone())).unwrap()],
        });
        state.navigator = serde_json::from_value(json).unwrap();
        state.session.set_phone(2, "380501112233");
        state.session.group_id = Some(-100);

        state.save(&path).await.unwrap();
        assert!(!dir.path().join("state.tmp").exists());

        let loaded = BotState::load(&path).await;
        assert_eq!(loaded, state);
        assert_eq!(loaded.navigator.top(1), Some(&Screen::Admin(AdminScreen)));
        assert_eq!(loaded.navigator.top(2), Some(&Screen::Order(order)));
        assert_eq!(loaded.session.phone(2), Some("380501112233"));
    }
}

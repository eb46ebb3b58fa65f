use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

use log::info;
use serde::Deserialize;

use crate::{BotError, Result};

pub const CONFIG_ENV: &str = "ECOCEMENT_CONFIG";
pub const KEY_ENV: &str = "AGE_PRIVATE_KEY";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Deserialize, Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub manager_contact: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub file: PathBuf,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StateConfig {
    #[serde(default = "default_state_file")]
    pub file: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            file: default_state_file(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct OrdersConfig {
    /// Staff chat used until an admin sends `/notify` in a group.
    pub group_id: Option<i64>,
    #[serde(default = "default_cutoff_hour")]
    pub cutoff_hour: u32,
    #[serde(default = "default_days_ahead")]
    pub days_ahead: u32,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            group_id: None,
            cutoff_hour: default_cutoff_hour(),
            days_ahead: default_days_ahead(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    /// Phone numbers seeded as admins on startup.
    #[serde(default)]
    pub admins: Vec<String>,
    pub telegram: TelegramConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub orders: OrdersConfig,
}

fn default_state_file() -> PathBuf {
    "state.json".into()
}

fn default_cutoff_hour() -> u32 {
    16
}

fn default_days_ahead() -> u32 {
    6
}

impl Config {
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| BotError::Config(e.to_string()).into())
    }

    /// Reads the plain file, or `<path>.enc` when a private key is in the environment.
    pub fn read() -> Result<Self> {
        let path: PathBuf = std::env::var(CONFIG_ENV)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned())
            .into();

        let raw = match std::env::var(KEY_ENV) {
            Ok(key) => {
                let encrypted = encrypted_path(&path);
                info!("Reading encrypted config from {}", encrypted.display());
                decrypt(File::open(&encrypted)?, &read_key(&key)?)?
            }
            Err(_) => {
                info!("Reading config from {}", path.display());
                std::fs::read_to_string(&path)?
            }
        };

        Self::parse(&raw)
    }
}

pub fn encrypted_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".enc");
    name.into()
}

pub fn read_key(key: &str) -> Result<age::x25519::Identity> {
    age::x25519::Identity::from_str(key.trim())
        .map_err(|e| BotError::Config(format!("unable to parse key: {}", e)).into())
}

pub fn decrypt(encrypted: impl Read, key: &age::x25519::Identity) -> Result<String> {
    let decryptor = match age::Decryptor::new(encrypted)? {
        age::Decryptor::Recipients(d) => d,
        age::Decryptor::Passphrase(_) => {
            return Err(BotError::Config("passphrase encryption is not supported".to_owned()).into())
        }
    };

    let mut reader = decryptor.decrypt(std::iter::once(key as &dyn age::Identity))?;

    let mut data = String::new();
    reader.read_to_string(&mut data)?;

    Ok(data)
}

#[cfg(test)]
pub fn sample() -> Config {
    Config::parse(
        r#"
        admins = ["380500000001"]

        [telegram]
        bot_token = "token"
        manager_contact = "@manager"

        [database]
        file = "test.sqlite"

        [orders]
        group_id = -100200300
        "#,
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        let config = Config::parse(
            r#"
            [telegram]
            bot_token = "token"
            manager_contact = "@manager"

            [database]
            file = "ecocement.sqlite"
            "#,
        )
        .unwrap();

        assert!(config.admins.is_empty());
        assert_eq!(config.state.file, PathBuf::from("state.json"));
        assert_eq!(config.orders.group_id, None);
        assert_eq!(config.orders.cutoff_hour, 16);
        assert_eq!(config.orders.days_ahead, 6);
    }

    #[test]
    fn missing_section_is_an_error() {
        assert!(Config::parse("[telegram]\nbot_token = \"x\"").is_err());
    }

    #[test]
    fn encrypted_config() {
        let key = age::x25519::Identity::generate();
        let encryptor =
            age::Encryptor::with_recipients(vec![Box::new(key.to_public())]).unwrap();

        let mut encrypted = vec![];
        let mut writer = encryptor.wrap_output(&mut encrypted).unwrap();
        writer.write_all(b"admins = []").unwrap();
        writer.finish().unwrap();

        assert_eq!(decrypt(&encrypted[..], &key).unwrap(), "admins = []");
        assert_eq!(
            encrypted_path(Path::new("conf/config.toml")),
            PathBuf::from("conf/config.toml.enc")
        );
    }
}

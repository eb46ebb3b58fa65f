//! Encrypts the bot config for deployment.
//!
//! Reads `config.toml` (or the path in `ECOCEMENT_CONFIG`), writes `<path>.enc` and keeps the
//! private key in `private_key`, generating one on first use. Run the bot with
//! `AGE_PRIVATE_KEY` set to that key to read the encrypted file.

use std::{fs, io::Write, path::PathBuf, str::FromStr};

use age::secrecy::ExposeSecret;
use log::info;

type Result = std::result::Result<(), Box<dyn std::error::Error>>;

const KEY_FILE_PATH: &str = "private_key";
const CONFIG_ENV: &str = "ECOCEMENT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

fn main() -> Result {
    pretty_env_logger::init();

    let private_key_path: PathBuf = KEY_FILE_PATH.into();

    let private_key = if private_key_path.exists() {
        let key_str = fs::read_to_string(&private_key_path)?;
        age::x25519::Identity::from_str(key_str.trim())?
    } else {
        let key = age::x25519::Identity::generate();
        fs::write(&private_key_path, key.to_string().expose_secret())?;
        info!("New key written to {}", private_key_path.display());
        key
    };

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    let config = fs::read_to_string(&path)?;

    let encryptor = age::Encryptor::with_recipients(vec![Box::new(private_key.to_public())])
        .ok_or("no recipients to encrypt for")?;

    let mut encrypted = vec![];
    let mut writer = encryptor.wrap_output(&mut encrypted)?;
    writer.write_all(config.as_bytes())?;
    writer.finish()?;

    let output = format!("{}.enc", path);
    fs::write(&output, encrypted)?;
    info!("{} sealed into {}", path, output);

    Ok(())
}

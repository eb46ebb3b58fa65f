use std::{fmt::Display, path::Path};

use log::info;
use tables::{
    prelude::*,
    sqlite::{self, SqliteTable},
};

use crate::entries::{Client, Mark, Role, User, SCHEMA};

#[derive(Debug)]
pub enum RegistryError {
    ClientNotFound(String),
    ClientExists(String),
    UserNotFound(String),
    MarkExists(String),
    MarkNotExist(String),
    Table(tables::Error),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::ClientNotFound(p) => write!(f, "client {} not found", p),
            RegistryError::ClientExists(p) => write!(f, "client {} already exists", p),
            RegistryError::UserNotFound(p) => write!(f, "user {} not found", p),
            RegistryError::MarkExists(m) => write!(f, "mark {} already exists", m),
            RegistryError::MarkNotExist(m) => write!(f, "mark {} does not exist", m),
            RegistryError::Table(e) => write!(f, "table error: {}", e),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<tables::Error> for RegistryError {
    fn from(e: tables::Error) -> Self {
        RegistryError::Table(e)
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Clients, login users and cement marks.
pub struct Registry {
    clients: Box<dyn Table<Client>>,
    users: Box<dyn Table<User>>,
    marks: Box<dyn Table<Mark>>,
}

impl Registry {
    pub fn open(path: impl AsRef<Path>) -> tables::Result<Self> {
        let pool = sqlite::open(path.as_ref(), SCHEMA)?;
        info!("Opened database at {}", path.as_ref().display());

        Ok(Self {
            clients: Box::new(SqliteTable::<Client>::new(pool.clone())),
            users: Box::new(SqliteTable::<User>::new(pool.clone())),
            marks: Box::new(SqliteTable::<Mark>::new(pool)),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        use tables::in_mem::InMemTable;

        Self {
            clients: Box::new(InMemTable::<Client>::default()),
            users: Box::new(InMemTable::<User>::default()),
            marks: Box::new(InMemTable::<Mark>::default()),
        }
    }

    pub async fn clients(&self) -> Result<Vec<Client>> {
        Ok(self.clients.fetch().await?)
    }

    pub async fn client(&self, phone_number: &str) -> Result<Option<Client>> {
        Ok(self.clients.get(&phone_number.to_owned()).await?)
    }

    pub async fn phone_numbers(&self) -> Result<Vec<String>> {
        Ok(self
            .clients()
            .await?
            .into_iter()
            .map(|c| c.phone_number)
            .collect())
    }

    /// Stores the client and gives it a login user unless the phone already has one.
    pub async fn create_client(&self, client: &Client) -> Result<()> {
        if self.client(&client.phone_number).await?.is_some() {
            return Err(RegistryError::ClientExists(client.phone_number.clone()));
        }

        self.clients.extend_one(client).await?;

        if self.user_by_phone(&client.phone_number).await?.is_none() {
            self.create_user(&client.phone_number, Role::Client).await?;
        }

        info!("Client {} created", client.phone_number);
        Ok(())
    }

    /// Replaces the client stored under `old_phone`. A changed phone renames the login user too.
    pub async fn update_client(&self, old_phone: &str, client: &Client) -> Result<()> {
        if client.phone_number != old_phone && self.client(&client.phone_number).await?.is_some() {
            return Err(RegistryError::ClientExists(client.phone_number.clone()));
        }

        if !self.clients.update(&old_phone.to_owned(), client).await? {
            return Err(RegistryError::ClientNotFound(old_phone.to_owned()));
        }

        if client.phone_number != old_phone {
            self.rename_user(old_phone, &client.phone_number).await?;
        }

        info!("Client {} updated", client.phone_number);
        Ok(())
    }

    pub async fn delete_client(&self, phone_number: &str) -> Result<()> {
        if !self.clients.remove(&phone_number.to_owned()).await? {
            return Err(RegistryError::ClientNotFound(phone_number.to_owned()));
        }

        if let Some(user) = self.user_by_phone(phone_number).await? {
            if user.role == Role::Client {
                self.delete_user(phone_number).await?;
            }
        }

        info!("Client {} deleted", phone_number);
        Ok(())
    }

    pub async fn user_by_phone(&self, phone_number: &str) -> Result<Option<User>> {
        Ok(self.users.get(&phone_number.to_owned()).await?)
    }

    pub async fn user_by_telegram_id(&self, telegram_user_id: u64) -> Result<Option<User>> {
        Ok(self
            .users
            .fetch()
            .await?
            .into_iter()
            .find(|u| u.telegram_user_id == Some(telegram_user_id)))
    }

    pub async fn create_user(&self, phone_number: &str, role: Role) -> Result<()> {
        self.users
            .extend_one(&User::new(phone_number, role))
            .await?;
        Ok(())
    }

    /// Moves a login user to a new phone. When the new phone already has a user the old one is dropped.
    pub async fn rename_user(&self, old_phone: &str, new_phone: &str) -> Result<()> {
        let Some(mut user) = self.user_by_phone(old_phone).await? else {
            return Ok(());
        };

        if self.user_by_phone(new_phone).await?.is_some() {
            self.delete_user(old_phone).await?;
            return Ok(());
        }

        user.phone_number = new_phone.to_owned();
        self.users.update(&old_phone.to_owned(), &user).await?;
        Ok(())
    }

    pub async fn delete_user(&self, phone_number: &str) -> Result<bool> {
        Ok(self.users.remove(&phone_number.to_owned()).await?)
    }

    /// Binds a Telegram account to the user. Any other user bound to the same account is unbound.
    pub async fn bind_telegram_user(&self, phone_number: &str, telegram_user_id: u64) -> Result<User> {
        let Some(mut user) = self.user_by_phone(phone_number).await? else {
            return Err(RegistryError::UserNotFound(phone_number.to_owned()));
        };

        for mut other in self.users.fetch().await? {
            if other.telegram_user_id == Some(telegram_user_id) && other.phone_number != phone_number
            {
                other.telegram_user_id = None;
                self.users.update(&other.key(), &other).await?;
            }
        }

        user.telegram_user_id = Some(telegram_user_id);
        self.users.update(&user.key(), &user).await?;

        Ok(user)
    }

    pub async fn ensure_admin(&self, phone_number: &str) -> Result<()> {
        match self.user_by_phone(phone_number).await? {
            Some(user) if user.role == Role::Admin => {}
            Some(mut user) => {
                user.role = Role::Admin;
                self.users.update(&user.key(), &user).await?;
                info!("User {} promoted to admin", phone_number);
            }
            None => {
                self.create_user(phone_number, Role::Admin).await?;
                info!("Admin {} created", phone_number);
            }
        }

        Ok(())
    }

    pub async fn marks(&self) -> Result<Vec<String>> {
        Ok(self
            .marks
            .fetch()
            .await?
            .into_iter()
            .map(|m| m.name)
            .collect())
    }

    pub async fn create_mark(&self, name: &str) -> Result<()> {
        if self.marks.get(&name.to_owned()).await?.is_some() {
            return Err(RegistryError::MarkExists(name.to_owned()));
        }

        self.marks
            .extend_one(&Mark {
                name: name.to_owned(),
            })
            .await?;
        Ok(())
    }

    pub async fn remove_mark(&self, name: &str) -> Result<()> {
        if !self.marks.remove(&name.to_owned()).await? {
            return Err(RegistryError::MarkNotExist(name.to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::PaymentType;

    fn client(phone: &str, name: &str) -> Client {
        Client {
            phone_number: phone.to_owned(),
            name: name.to_owned(),
            address: "Kyiv".to_owned(),
            payment_type: PaymentType::Cash,
        }
    }

    #[tokio::test]
    async fn create_client_adds_login_user() {
        let registry = Registry::in_memory();

        registry.create_client(&client("380501112233", "Beton")).await.unwrap();

        let user = registry.user_by_phone("380501112233").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Client);
        assert!(matches!(
            registry.create_client(&client("380501112233", "Other")).await,
            Err(RegistryError::ClientExists(_))
        ));
        assert_eq!(registry.phone_numbers().await.unwrap(), vec!["380501112233"]);
    }

    #[tokio::test]
    async fn update_client_renames_user() {
        let registry = Registry::in_memory();
        registry.create_client(&client("380501112233", "Beton")).await.unwrap();
        registry.create_client(&client("380509998877", "Taken")).await.unwrap();

        assert!(matches!(
            registry
                .update_client("380501112233", &client("380509998877", "Beton"))
                .await,
            Err(RegistryError::ClientExists(_))
        ));

        registry
            .update_client("380501112233", &client("380501110000", "Beton 2"))
            .await
            .unwrap();

        assert!(registry.client("380501112233").await.unwrap().is_none());
        assert_eq!(
            registry.client("380501110000").await.unwrap().unwrap().name,
            "Beton 2"
        );
        assert!(registry.user_by_phone("380501112233").await.unwrap().is_none());
        assert!(registry.user_by_phone("380501110000").await.unwrap().is_some());

        registry
            .update_client("380501110000", &client("380501110000", "Same phone"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_client_keeps_admins() {
        let registry = Registry::in_memory();
        registry.ensure_admin("380500000001").await.unwrap();
        registry.create_client(&client("380500000001", "Boss")).await.unwrap();
        registry.create_client(&client("380501112233", "Beton")).await.unwrap();

        registry.delete_client("380500000001").await.unwrap();
        registry.delete_client("380501112233").await.unwrap();

        assert!(registry.user_by_phone("380500000001").await.unwrap().is_some());
        assert!(registry.user_by_phone("380501112233").await.unwrap().is_none());
        assert!(matches!(
            registry.delete_client("380501112233").await,
            Err(RegistryError::ClientNotFound(_))
        ));
    }

    #[tokio::test]
    async fn telegram_id_is_bound_once() {
        let registry = Registry::in_memory();
        registry.create_user("380501112233", Role::Client).await.unwrap();
        registry.create_user("380504445566", Role::Client).await.unwrap();

        registry.bind_telegram_user("380501112233", 42).await.unwrap();
        registry.bind_telegram_user("380504445566", 42).await.unwrap();

        let bound = registry.user_by_telegram_id(42).await.unwrap().unwrap();
        assert_eq!(bound.phone_number, "380504445566");
        assert_eq!(
            registry
                .user_by_phone("380501112233")
                .await
                .unwrap()
                .unwrap()
                .telegram_user_id,
            None
        );
        assert!(matches!(
            registry.bind_telegram_user("380000000000", 42).await,
            Err(RegistryError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn ensure_admin_promotes() {
        let registry = Registry::in_memory();
        registry.create_user("380501112233", Role::Client).await.unwrap();

        registry.ensure_admin("380501112233").await.unwrap();
        registry.ensure_admin("380501112233").await.unwrap();

        assert_eq!(
            registry.user_by_phone("380501112233").await.unwrap().unwrap().role,
            Role::Admin
        );
    }

    #[tokio::test]
    async fn marks() {
        let registry = Registry::in_memory();

        registry.create_mark("M400").await.unwrap();
        registry.create_mark("M500").await.unwrap();

        assert!(matches!(
            registry.create_mark("M400").await,
            Err(RegistryError::MarkExists(_))
        ));
        registry.remove_mark("M400").await.unwrap();
        assert!(matches!(
            registry.remove_mark("M400").await,
            Err(RegistryError::MarkNotExist(_))
        ));
        assert_eq!(registry.marks().await.unwrap(), vec!["M500"]);
    }

    #[tokio::test]
    async fn sqlite_registry_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecocement.sqlite");

        {
            let registry = Registry::open(&path).unwrap();
            registry.create_client(&client("380501112233", "Beton")).await.unwrap();
            registry.create_mark("M500").await.unwrap();
            registry.bind_telegram_user("380501112233", 7).await.unwrap();
        }

        let registry = Registry::open(&path).unwrap();
        assert_eq!(
            registry.client("380501112233").await.unwrap(),
            Some(client("380501112233", "Beton"))
        );
        assert_eq!(registry.marks().await.unwrap(), vec!["M500"]);
        assert_eq!(
            registry.user_by_telegram_id(7).await.unwrap().unwrap().phone_number,
            "380501112233"
        );
    }
}

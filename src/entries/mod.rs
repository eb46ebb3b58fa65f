mod order;

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tables::{
    rusqlite::{
        self,
        types::{Type, Value},
        Row,
    },
    sqlite::SqlEntry,
    Entry,
};

pub use order::*;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS clients (
    phone_number TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    payment_type TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS users (
    phone_number TEXT PRIMARY KEY NOT NULL,
    role TEXT NOT NULL,
    telegram_user_id INTEGER
);
CREATE TABLE IF NOT EXISTS marks (
    name TEXT PRIMARY KEY NOT NULL
);
";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Client {
    /// Digits only, e.g. `380501234567`.
    pub phone_number: String,
    pub name: String,
    pub address: String,
    pub payment_type: PaymentType,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentType {
    Cash,
    Card,
    Both,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "cash",
            PaymentType::Card => "card",
            PaymentType::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentType::Cash),
            "card" => Some(PaymentType::Card),
            "both" => Some(PaymentType::Both),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub phone_number: String,
    pub role: Role,
    pub telegram_user_id: Option<u64>,
}

impl User {
    pub fn new(phone_number: impl Into<String>, role: Role) -> Self {
        Self {
            phone_number: phone_number.into(),
            role,
            telegram_user_id: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Client,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client" => Some(Role::Client),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Mark {
    pub name: String,
}

impl Entry for Client {
    type Key = String;

    fn key(&self) -> String {
        self.phone_number.clone()
    }
}

impl Entry for User {
    type Key = String;

    fn key(&self) -> String {
        self.phone_number.clone()
    }
}

impl Entry for Mark {
    type Key = String;

    fn key(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug)]
struct UnknownVariant(String);

impl Display for UnknownVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown variant: {}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

fn enum_column<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(UnknownVariant(raw)))
    })
}

impl SqlEntry for Client {
    const TABLE: &'static str = "clients";
    const COLUMNS: &'static [&'static str] = &["phone_number", "name", "address", "payment_type"];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.phone_number.clone()),
            Value::Text(self.name.clone()),
            Value::Text(self.address.clone()),
            Value::Text(self.payment_type.as_str().to_owned()),
        ]
    }

    fn key_value(key: &String) -> Value {
        Value::Text(key.clone())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Client {
            phone_number: row.get(0)?,
            name: row.get(1)?,
            address: row.get(2)?,
            payment_type: enum_column(row, 3, PaymentType::parse)?,
        })
    }
}

impl SqlEntry for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["phone_number", "role", "telegram_user_id"];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.phone_number.clone()),
            Value::Text(self.role.as_str().to_owned()),
            self.telegram_user_id
                .map(|id| Value::Integer(id as i64))
                .unwrap_or(Value::Null),
        ]
    }

    fn key_value(key: &String) -> Value {
        Value::Text(key.clone())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let telegram_user_id: Option<i64> = row.get(2)?;

        Ok(User {
            phone_number: row.get(0)?,
            role: enum_column(row, 1, Role::parse)?,
            telegram_user_id: telegram_user_id.map(|id| id as u64),
        })
    }
}

impl SqlEntry for Mark {
    const TABLE: &'static str = "marks";
    const COLUMNS: &'static [&'static str] = &["name"];

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone())]
    }

    fn key_value(key: &String) -> Value {
        Value::Text(key.clone())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Mark { name: row.get(0)? })
    }
}

use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Initial admin credentials, read once at startup. Used only to seed the
/// admin_users table the first time a workspace is opened.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl AdminSeed {
    pub fn from_env() -> Self {
        Self {
            email: std::env::var("SCHOOLD_ADMIN_EMAIL").ok(),
            password: std::env::var("SCHOOLD_ADMIN_PASSWORD").ok(),
        }
    }
}

/// In-memory admin session. A failed login clears this, which is the
/// forced-sign-out behavior of the admin gate.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub email: String,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub admin_seed: AdminSeed,
    pub session: Option<Session>,
}

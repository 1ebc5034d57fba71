//! Application settings loaded from `settings.toml`.

use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    /// Log level for the env filter (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
}

/// Database backend for the server task.
///
/// `database = "memory"` or `database = { sqlite = "./romana.db" }`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Option<Server>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("settings"))
            .build()?
            .try_deserialize()
    }
}

//! Layered settings.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. the file named by `PLAYDIR_CONFIG` (required when set)
//! 4. `PLAYDIR__SECTION__KEY` environment variables, e.g. `PLAYDIR__SERVER__PORT=9000`

use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::SettingsError;

pub const CONFIG_PATH_VAR: &str = "PLAYDIR_CONFIG";

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
    Firestore,
}

#[derive(Debug, Deserialize)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// JSON array of playgrounds loaded into the memory or SQLite store at startup.
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
    pub sqlite_url: String,
    #[serde(default)]
    pub firestore: Option<FirestoreSettings>,
}

#[derive(Debug, Deserialize)]
pub struct FirestoreSettings {
    pub project_id: String,
    #[serde(default = "default_firestore_database")]
    pub database: String,
    #[serde(default = "default_firestore_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default)]
    pub bearer_token: Option<SecretString>,
}

fn default_firestore_database() -> String {
    "(default)".to_string()
}

fn default_firestore_base_url() -> String {
    "https://firestore.googleapis.com".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub format: LogFormat,
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set.
    pub filter: String,
}

impl Settings {
    /// Loads `.env`, then every configured source.
    pub fn load() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        let explicit = std::env::var(CONFIG_PATH_VAR).ok();

        let mut builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false));
        if let Some(path) = explicit {
            builder = builder.add_source(File::with_name(&path).required(true));
        }
        builder = builder.add_source(Environment::with_prefix("PLAYDIR").separator("__"));

        Self::from_builder(builder)
    }

    /// The built-in defaults, ready for more sources to be layered on top.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, SettingsError> {
        Ok(Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("store.backend", "memory")?
            .set_default("store.sqlite_url", "sqlite://playdir.db?mode=rwc")?
            .set_default("log.format", "pretty")?
            .set_default("log.filter", "info,playdir=debug")?)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.store.backend == StoreBackend::Firestore {
            match &self.store.firestore {
                Some(firestore) if !firestore.project_id.trim().is_empty() => {}
                _ => {
                    return Err(SettingsError::Invalid(
                        "store.backend = \"firestore\" requires store.firestore.project_id".into(),
                    ))
                }
            }
        }
        Ok(())
    }
}

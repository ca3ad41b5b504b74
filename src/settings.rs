use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    pub listen: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
    pub backend: StorageBackend,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Auth {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Assistant {
    pub huggingface_url: String,
    #[serde(default)]
    pub huggingface_api_key: Option<String>,
    pub openai_url: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub storage: Storage,
    pub postgres: Postgres,
    pub auth: Auth,
    pub assistant: Assistant,
}

impl Settings {
    /// Loads `path` (optional) on top of built-in defaults, then applies
    /// `FINSAVVY__SECTION__KEY` environment overrides.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.listen", "0.0.0.0:5000")?
            .set_default("storage.backend", "postgres")?
            .set_default("postgres.url", "postgres://localhost:5432/finsavvy")?
            .set_default("postgres.max_connections", 5)?
            .set_default("postgres.run_migrations", true)?
            .set_default("auth.token_ttl_hours", 24)?
            .set_default(
                "assistant.huggingface_url",
                "https://api-inference.huggingface.co/models",
            )?
            .set_default(
                "assistant.openai_url",
                "https://api.openai.com/v1/chat/completions",
            )?
            .set_default("assistant.openai_model", "gpt-3.5-turbo")?
            .set_default("assistant.timeout_secs", 30)?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("FINSAVVY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

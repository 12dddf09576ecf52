use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub stripe: StripeConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub functions: FunctionsConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// How long a connection waits for another writer's lock.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

fn default_busy_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub enabled: bool,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            currency: default_currency(),
            enabled: false,
        }
    }
}

fn default_currency() -> String {
    "eur".to_string()
}

/// Operator provisioning. Only addresses listed here may be made admin/staff.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdminConfig {
    #[serde(default)]
    pub allowed_emails: Vec<String>,
}

impl AdminConfig {
    pub fn is_allowed(&self, email: &str) -> bool {
        let email = email.trim();
        self.allowed_emails
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(email))
    }
}

/// Endpoints used by the charge orchestrator.
#[derive(Debug, Deserialize, Clone)]
pub struct FunctionsConfig {
    /// Base URL of the hosted functions, e.g. `https://<project>.functions.example/v1`.
    pub base_url: Option<String>,
    pub anon_key: Option<String>,
    /// Full URL of the secondary charge endpoint.
    pub fallback_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            anon_key: None,
            fallback_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EmailConfig {
    pub api_key: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite://reservas.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("database.busy_timeout_secs", 5)?
            .set_default("stripe.enabled", false)?
            .set_default("stripe.currency", "eur")?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with RESERVAS__ prefix, double underscore separates levels)
            .add_source(
                Environment::with_prefix("RESERVAS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("admin.allowed_emails")
                    .try_parsing(true),
            )

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "sqlite://reservas.db?mode=rwc".to_string(),
                max_connections: 10,
                busy_timeout_secs: default_busy_timeout_secs(),
            },
            stripe: StripeConfig::default(),
            admin: AdminConfig::default(),
            functions: FunctionsConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

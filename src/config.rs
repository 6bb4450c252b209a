use clap::Parser;
use database::{
    identity::normalize::MatchPolicy,
    store::options::{EngineKind, StoreEngine, StoreOptions},
};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("--postgres-url (or DATABASE_URL) is required for the postgres engine")]
    MissingPostgresUrl,

    #[error("--dynamodb-table (or CRM_DYNAMODB_TABLE) is required for the dynamodb engine")]
    MissingDynamoDBTable,
}

/// 📇 Leadline, a small CRM backend for leads, callers and pipeline reports
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// Address the HTTP server will bind to
    #[clap(short, long, default_value = "0.0.0.0")]
    pub address: String,

    /// Port the HTTP server will run on
    #[clap(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Where leads and callers are kept: memory, postgres or dynamodb
    #[clap(short, long, env = "CRM_ENGINE", default_value = "memory")]
    pub engine: EngineKind,

    /// Connection string for the postgres engine
    #[clap(long, env = "DATABASE_URL")]
    pub postgres_url: Option<String>,

    /// Table name for the dynamodb engine
    #[clap(long, env = "CRM_DYNAMODB_TABLE")]
    pub dynamodb_table: Option<String>,

    #[clap(long, env = "ADMIN_USER", default_value = "admin")]
    pub admin_user: String,

    #[clap(long, env = "ADMIN_PASS", default_value = "admin123", hide_env_values = true)]
    pub admin_pass: String,

    /// How long a login stays valid
    #[clap(long, default_value_t = 86400)]
    pub session_ttl_secs: i64,

    /// Creates caller1 / caller123 on startup when it does not exist
    #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub seed_test_caller: bool,

    /// Trailing digits compared when matching phones
    #[clap(long, default_value_t = 10)]
    pub phone_suffix_digits: usize,

    /// Normalized phones keep at most this many trailing digits
    #[clap(long, default_value_t = 12)]
    pub max_phone_digits: usize,

    /// Phones with fewer digits are matched by email only
    #[clap(long, default_value_t = 0)]
    pub min_match_digits: usize,

    #[clap(long, default_value_t = 2)]
    pub http_workers: usize,

    /// Logs every HTTP request
    #[clap(long)]
    pub log_http: bool,
}

impl Cli {
    pub fn match_policy(&self) -> MatchPolicy {
        MatchPolicy::default()
            .set_phone_suffix_digits(self.phone_suffix_digits)
            .set_max_phone_digits(self.max_phone_digits)
            .set_min_match_digits(self.min_match_digits)
    }

    pub fn store_options(&self) -> Result<StoreOptions, ConfigError> {
        let engine = match self.engine {
            EngineKind::Memory => StoreEngine::Memory,
            EngineKind::Postgres => StoreEngine::Postgres(
                self.postgres_url
                    .clone()
                    .ok_or(ConfigError::MissingPostgresUrl)?,
            ),
            EngineKind::DynamoDb => StoreEngine::DynamoDB(
                self.dynamodb_table
                    .clone()
                    .ok_or(ConfigError::MissingDynamoDBTable)?,
            ),
        };

        Ok(StoreOptions::default()
            .set_engine(engine)
            .set_policy(self.match_policy()))
    }

    pub fn admin(&self) -> AdminCredentials {
        AdminCredentials {
            username: self.admin_user.clone(),
            password: self.admin_pass.clone(),
        }
    }
}

/// Configured administrator login, never stored
#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &mask(&self.password))
            .finish()
    }
}

/// Keeps the first and last character, for startup banners
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();

    match chars.len() {
        0..=2 => secret.to_string(),
        len => format!("{}{}{}", chars[0], "*".repeat(len - 2), chars[len - 1]),
    }
}

use std::sync::Arc;

use strum::{Display, EnumString};

use crate::identity::normalize::MatchPolicy;

use super::{dynamodb::DynamoDBStore, memory::MemoryStore, postgres::PgStore, LeadStore};

/// Engine names as accepted on the command line
#[derive(EnumString, Display, Clone, Copy, Debug, PartialEq, Eq)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EngineKind {
    Memory,
    Postgres,
    DynamoDb,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEngine {
    Memory,
    /// Connection string, e.g. `host=localhost user=postgres`
    Postgres(String),
    /// Table name
    DynamoDB(String),
}

impl StoreEngine {
    pub fn kind(&self) -> EngineKind {
        match self {
            StoreEngine::Memory => EngineKind::Memory,
            StoreEngine::Postgres(_) => EngineKind::Postgres,
            StoreEngine::DynamoDB(_) => EngineKind::DynamoDb,
        }
    }

    pub fn get_store(options: &StoreOptions) -> Arc<dyn LeadStore> {
        let policy = options.policy;

        log::info!("Using {} store", options.engine.kind());

        match &options.engine {
            StoreEngine::Memory => Arc::new(MemoryStore::new(policy)),
            StoreEngine::Postgres(connection) => Arc::new(PgStore::new(connection.clone(), policy)),
            StoreEngine::DynamoDB(table) => Arc::new(DynamoDBStore::new(table.clone(), policy)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub engine: StoreEngine,
    pub policy: MatchPolicy,
}

// Implements: https://rust-unofficial.github.io/patterns/patterns/creational/builder.html
impl StoreOptions {
    pub fn set_engine(mut self, engine: StoreEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Also handed to the resolver, both sides must derive phones the same way
    pub fn set_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            engine: StoreEngine::Memory,
            policy: MatchPolicy::default(),
        }
    }
}

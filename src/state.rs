use std::sync::Arc;

use chrono::Duration;
use database::{
    identity::{normalize::MatchPolicy, resolver::LeadResolver},
    model::caller::Caller,
    store::{LeadStore, StoreError},
};

use crate::{auth::hash_password, config::AdminCredentials, errors::ApiError, session::SessionStore};

pub const TEST_CALLER_USERNAME: &str = "caller1";
pub const TEST_CALLER_PASSWORD: &str = "caller123";

/// Shared by every worker. The store is handed in, there is no global handle.
pub struct AppState {
    pub store: Arc<dyn LeadStore>,
    pub resolver: Arc<LeadResolver>,
    pub sessions: SessionStore,
    pub admin: AdminCredentials,
}

impl AppState {
    pub fn new(
        store: Arc<dyn LeadStore>,
        policy: MatchPolicy,
        admin: AdminCredentials,
        session_ttl: Duration,
    ) -> Self {
        Self {
            resolver: Arc::new(LeadResolver::new(store.clone(), policy)),
            store,
            sessions: SessionStore::new(session_ttl),
            admin,
        }
    }
}

/// Creates tables and indexes, then seeds the test caller when asked. Blocks.
pub fn prepare_store(store: &dyn LeadStore, seed_test_caller: bool) -> Result<(), ApiError> {
    store.init()?;

    if !seed_test_caller {
        return Ok(());
    }

    if store.find_caller(TEST_CALLER_USERNAME)?.is_some() {
        log::debug!("Test caller {} already present", TEST_CALLER_USERNAME);
        return Ok(());
    }

    let caller = Caller::new(
        TEST_CALLER_USERNAME.to_string(),
        hash_password(TEST_CALLER_PASSWORD)?,
    );

    match store.insert_caller(caller) {
        Ok(()) => {
            log::info!("Inserted default test caller: {}", TEST_CALLER_USERNAME);
            Ok(())
        }
        // Another instance seeded it first
        Err(StoreError::Duplicate(_)) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

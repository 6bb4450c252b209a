use std::sync::Mutex;

use crate::{
    identity::normalize::MatchPolicy,
    model::statement::{Statement, StatementResult},
};

use super::{table::table::LeadTable, LeadStore, StoreError, StoreResult};

/// Lead table living in the server process. Data is lost on restart.
pub struct MemoryStore {
    table: Mutex<LeadTable>,
}

impl MemoryStore {
    pub fn new(policy: MatchPolicy) -> Self {
        Self {
            table: Mutex::new(LeadTable::new(policy)),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new(MatchPolicy::default())
    }
}

impl LeadStore for MemoryStore {
    fn execute(&self, statement: Statement) -> StoreResult<StatementResult> {
        log::debug!("Memory store: {}", statement.log_format());

        let mut table = self
            .table
            .lock()
            .map_err(|_| StoreError::Unavailable("lead table lock poisoned".to_string()))?;

        table.apply(statement)
    }
}

use thiserror::Error;

use crate::{
    consts::consts::LeadId,
    model::{
        caller::Caller,
        customer::Customer,
        lead::{Lead, LeadFields, LeadPatch, UpdateOutcome},
        statement::{Statement, StatementResult},
    },
};

use self::table::filter::LeadQuery;

pub mod dynamodb;
pub mod memory;
pub mod network;
pub mod options;
pub mod postgres;
pub mod table;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Cannot create, record already exists: {0}")]
    Duplicate(String),

    #[error("Store is unavailable: {0}")]
    Unavailable(String),

    #[error("Store query failed: {0}")]
    Query(String),

    #[error("Unable to decode stored record: {0}")]
    Decode(String),

    #[error("Store answered with an unexpected result: {0}")]
    UnexpectedResult(String),

    #[error("Store worker stopped before answering")]
    WorkerStopped,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence collaborator shared by the resolver and the web layer.
///
/// Engines implement `execute`, the typed methods are built on top of it. Calls block,
/// async callers must run them off their executor.
pub trait LeadStore: Send + Sync {
    fn execute(&self, statement: Statement) -> StoreResult<StatementResult>;

    fn init(&self) -> StoreResult<()> {
        self.execute(Statement::Init)?.done()
    }

    fn find_by_phone_suffix(&self, digits: &str) -> StoreResult<Option<Lead>> {
        self.execute(Statement::FindByPhoneSuffix(digits.to_string()))?
            .single()
    }

    fn find_by_email(&self, email: &str) -> StoreResult<Option<Lead>> {
        self.execute(Statement::FindByEmail(email.to_string()))?
            .single()
    }

    fn insert(&self, lead: Lead) -> StoreResult<LeadId> {
        self.execute(Statement::Insert(lead))?.inserted()
    }

    fn update(&self, id: &LeadId, fields: LeadFields) -> StoreResult<UpdateOutcome> {
        self.execute(Statement::Update(id.clone(), fields))?
            .updated()
    }

    fn get(&self, id: &LeadId) -> StoreResult<Option<Lead>> {
        self.execute(Statement::Get(id.clone()))?.single()
    }

    fn list(&self, query: LeadQuery) -> StoreResult<Vec<Lead>> {
        self.execute(Statement::List(query))?.list()
    }

    /// Read, apply, write. Not atomic, a concurrent writer in between is overwritten.
    fn patch(&self, id: &LeadId, patch: LeadPatch) -> StoreResult<UpdateOutcome> {
        let mut lead = match self.get(id)? {
            Some(lead) => lead,
            None => return Ok(UpdateOutcome::NotFound),
        };

        patch.apply(&mut lead.fields);

        self.update(id, lead.fields)
    }

    fn delete(&self, id: &LeadId) -> StoreResult<bool> {
        Ok(self.execute(Statement::Delete(id.clone()))?.deleted()? > 0)
    }

    fn delete_many(&self, ids: Vec<LeadId>) -> StoreResult<usize> {
        self.execute(Statement::DeleteMany(ids))?.deleted()
    }

    fn find_caller(&self, username: &str) -> StoreResult<Option<Caller>> {
        self.execute(Statement::FindCaller(username.to_string()))?
            .caller()
    }

    fn insert_caller(&self, caller: Caller) -> StoreResult<()> {
        self.execute(Statement::InsertCaller(caller))?.done()
    }

    fn list_callers(&self) -> StoreResult<Vec<Caller>> {
        self.execute(Statement::ListCallers)?.callers()
    }

    fn insert_customer(&self, customer: Customer) -> StoreResult<()> {
        self.execute(Statement::InsertCustomer(customer))?.done()
    }

    fn list_customers(&self) -> StoreResult<Vec<Customer>> {
        self.execute(Statement::ListCustomers)?.customers()
    }
}

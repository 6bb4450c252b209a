use serde::{Deserialize, Serialize};

use crate::{
    consts::consts::LeadId,
    store::{table::filter::LeadQuery, StoreError, StoreResult},
};

use super::{
    caller::Caller,
    customer::Customer,
    lead::{Lead, LeadFields, UpdateOutcome},
};

/// Everything a store can be asked to do. Every engine answers the same statements,
/// the in-memory table applies them directly, network engines translate them.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum Statement {
    /// Idempotent set-up (tables, indexes)
    Init,
    /// Lead whose normalized phone ends with these digits
    FindByPhoneSuffix(String),
    /// Lead with exactly this normalized email
    FindByEmail(String),
    Insert(Lead),
    /// Overwrites every mutable field
    Update(LeadId, LeadFields),
    Get(LeadId),
    /// Returns leads newest first
    List(LeadQuery),
    Delete(LeadId),
    DeleteMany(Vec<LeadId>),
    FindCaller(String),
    InsertCaller(Caller),
    ListCallers,
    /// Fails with `Duplicate` when a customer already exists for the lead
    InsertCustomer(Customer),
    /// Returns customers newest first
    ListCustomers,
}

impl Statement {
    /// Short form for logs, avoids dumping whole lead documents
    pub fn log_format(&self) -> String {
        match self {
            Statement::Insert(lead) => format!("Insert({})", lead.id),
            Statement::Update(id, _) => format!("Update({})", id),
            Statement::DeleteMany(ids) => format!("DeleteMany({} ids)", ids.len()),
            Statement::InsertCaller(caller) => format!("InsertCaller({})", caller.username),
            Statement::InsertCustomer(customer) => format!("InsertCustomer({})", customer.lead_id),
            _ => format!("{:?}", self),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum StatementResult {
    Done,
    Single(Option<Lead>),
    List(Vec<Lead>),
    Inserted(LeadId),
    Updated(UpdateOutcome),
    Deleted(usize),
    Caller(Option<Caller>),
    Callers(Vec<Caller>),
    Customers(Vec<Customer>),
}

impl StatementResult {
    fn unexpected(&self, expected: &str) -> StoreError {
        StoreError::UnexpectedResult(format!("expected {}, got {:?}", expected, self))
    }

    pub fn done(self) -> StoreResult<()> {
        match self {
            StatementResult::Done => Ok(()),
            other => Err(other.unexpected("Done")),
        }
    }

    pub fn single(self) -> StoreResult<Option<Lead>> {
        match self {
            StatementResult::Single(lead) => Ok(lead),
            other => Err(other.unexpected("Single")),
        }
    }

    pub fn list(self) -> StoreResult<Vec<Lead>> {
        match self {
            StatementResult::List(leads) => Ok(leads),
            other => Err(other.unexpected("List")),
        }
    }

    pub fn inserted(self) -> StoreResult<LeadId> {
        match self {
            StatementResult::Inserted(id) => Ok(id),
            other => Err(other.unexpected("Inserted")),
        }
    }

    pub fn updated(self) -> StoreResult<UpdateOutcome> {
        match self {
            StatementResult::Updated(outcome) => Ok(outcome),
            other => Err(other.unexpected("Updated")),
        }
    }

    pub fn deleted(self) -> StoreResult<usize> {
        match self {
            StatementResult::Deleted(count) => Ok(count),
            other => Err(other.unexpected("Deleted")),
        }
    }

    pub fn caller(self) -> StoreResult<Option<Caller>> {
        match self {
            StatementResult::Caller(caller) => Ok(caller),
            other => Err(other.unexpected("Caller")),
        }
    }

    pub fn callers(self) -> StoreResult<Vec<Caller>> {
        match self {
            StatementResult::Callers(callers) => Ok(callers),
            other => Err(other.unexpected("Callers")),
        }
    }

    pub fn customers(self) -> StoreResult<Vec<Customer>> {
        match self {
            StatementResult::Customers(customers) => Ok(customers),
            other => Err(other.unexpected("Customers")),
        }
    }
}

use std::collections::{BTreeSet, HashMap};

use crate::{
    consts::consts::LeadId,
    identity::normalize::MatchPolicy,
    model::{
        caller::Caller,
        customer::Customer,
        lead::{Lead, UpdateOutcome},
        statement::{Statement, StatementResult},
    },
    store::{StoreError, StoreResult},
};

use super::filter::{earliest, filter};

type RowPrimaryKey = String;

/// In-process lead table with secondary indexes on normalized phone and email.
///
/// Indexes are not unique: the resolver tries to keep one lead per phone, the table
/// does not enforce it.
pub struct LeadTable {
    pub lead_rows: HashMap<RowPrimaryKey, Lead>,
    pub phone_index: HashMap<String, BTreeSet<RowPrimaryKey>>,
    pub email_index: HashMap<String, BTreeSet<RowPrimaryKey>>,
    pub callers: HashMap<String, Caller>,
    /// Keyed by lead id
    pub customers: HashMap<RowPrimaryKey, Customer>,
    policy: MatchPolicy,
}

impl LeadTable {
    pub fn new(policy: MatchPolicy) -> Self {
        Self {
            lead_rows: HashMap::new(),
            phone_index: HashMap::new(),
            email_index: HashMap::new(),
            callers: HashMap::new(),
            customers: HashMap::new(),
            policy,
        }
    }

    // Each mutation can be broken up into 3 steps
    //  - Verifying validity / constraints (primary key)
    //  - Applying the statement
    //  - Maintaining the indexes
    pub fn apply(&mut self, statement: Statement) -> StoreResult<StatementResult> {
        let statement_result = match statement {
            Statement::Init => StatementResult::Done,
            Statement::FindByPhoneSuffix(digits) => {
                let candidates = self
                    .phone_index
                    .iter()
                    .filter(|(phone, _)| phone.ends_with(digits.as_str()))
                    .flat_map(|(_, ids)| ids.iter());

                StatementResult::Single(earliest(self.rows_for(candidates)))
            }
            Statement::FindByEmail(email) => {
                let candidates = self.email_index.get(&email).into_iter().flatten();

                StatementResult::Single(earliest(self.rows_for(candidates)))
            }
            Statement::Insert(lead) => {
                let id = lead.id.clone();

                if self.lead_rows.contains_key(id.as_str()) {
                    return Err(StoreError::Duplicate(id.to_string()));
                }

                self.index(&lead);
                self.lead_rows.insert(id.to_string(), lead);

                StatementResult::Inserted(id)
            }
            Statement::Update(id, fields) => {
                let previous = match self.lead_rows.remove(id.as_str()) {
                    Some(previous) => previous,
                    None => return Ok(StatementResult::Updated(UpdateOutcome::NotFound)),
                };

                self.unindex(&previous);

                let current = Lead::new(id.clone(), fields);
                self.index(&current);
                self.lead_rows.insert(id.to_string(), current);

                StatementResult::Updated(UpdateOutcome::Updated)
            }
            Statement::Get(id) => StatementResult::Single(self.lead_rows.get(id.as_str()).cloned()),
            Statement::List(query) => {
                let leads = self.lead_rows.values().cloned().collect();

                StatementResult::List(filter(leads, &query))
            }
            Statement::Delete(id) => StatementResult::Deleted(self.remove(&id)),
            Statement::DeleteMany(ids) => {
                let deleted = ids.iter().map(|id| self.remove(id)).sum();

                StatementResult::Deleted(deleted)
            }
            Statement::FindCaller(username) => {
                StatementResult::Caller(self.callers.get(&username).cloned())
            }
            Statement::InsertCaller(caller) => {
                if self.callers.contains_key(&caller.username) {
                    return Err(StoreError::Duplicate(caller.username));
                }

                self.callers.insert(caller.username.clone(), caller);

                StatementResult::Done
            }
            Statement::ListCallers => {
                let mut callers: Vec<Caller> = self.callers.values().cloned().collect();
                callers.sort_by(|a, b| b.created_at.cmp(&a.created_at));

                StatementResult::Callers(callers)
            }
            Statement::InsertCustomer(customer) => {
                let lead_id = customer.lead_id.to_string();

                if self.customers.contains_key(&lead_id) {
                    return Err(StoreError::Duplicate(lead_id));
                }

                self.customers.insert(lead_id, customer);

                StatementResult::Done
            }
            Statement::ListCustomers => {
                let mut customers: Vec<Customer> = self.customers.values().cloned().collect();
                customers.sort_by(|a, b| {
                    b.created_at
                        .cmp(&a.created_at)
                        .then_with(|| a.lead_id.cmp(&b.lead_id))
                });

                StatementResult::Customers(customers)
            }
        };

        Ok(statement_result)
    }

    fn rows_for<'a>(&'a self, ids: impl Iterator<Item = &'a RowPrimaryKey>) -> Vec<Lead> {
        ids.filter_map(|id| self.lead_rows.get(id)).cloned().collect()
    }

    fn remove(&mut self, id: &LeadId) -> usize {
        match self.lead_rows.remove(id.as_str()) {
            Some(previous) => {
                self.unindex(&previous);
                1
            }
            None => 0,
        }
    }

    fn index(&mut self, lead: &Lead) {
        if let Some(phone) = lead.phone_normalized(&self.policy) {
            self.phone_index
                .entry(phone)
                .or_default()
                .insert(lead.id.to_string());
        }

        if let Some(email) = &lead.fields.email {
            self.email_index
                .entry(email.clone())
                .or_default()
                .insert(lead.id.to_string());
        }
    }

    fn unindex(&mut self, lead: &Lead) {
        let id = lead.id.to_string();

        if let Some(phone) = lead.phone_normalized(&self.policy) {
            remove_from_index(&mut self.phone_index, &phone, &id);
        }

        if let Some(email) = &lead.fields.email {
            remove_from_index(&mut self.email_index, email, &id);
        }
    }
}

fn remove_from_index(index: &mut HashMap<String, BTreeSet<RowPrimaryKey>>, key: &str, id: &str) {
    if let Some(ids) = index.get_mut(key) {
        ids.remove(id);

        if ids.is_empty() {
            index.remove(key);
        }
    }
}

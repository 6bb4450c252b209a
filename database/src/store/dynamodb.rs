use std::{collections::HashMap, fmt::Debug, sync::Arc};

use aws_sdk_dynamodb::{
    error::{DisplayErrorContext, SdkError},
    types::{AttributeValue, ReturnValue},
    Client,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    consts::consts::LeadId,
    identity::normalize::MatchPolicy,
    model::{
        caller::Caller,
        customer::Customer,
        lead::{Lead, LeadFields, UpdateOutcome},
        statement::{Statement, StatementResult},
    },
};

use super::{
    network::{NetworkStore, StoreFuture},
    table::filter::{earliest, filter},
    LeadStore, StoreError, StoreResult,
};

const HASH_KEY: &str = "Hash";
const SORT_KEY: &str = "Sort";
const DATA_KEY: &str = "Data";
const PHONE_KEY: &str = "PhoneNormalized";
const EMAIL_KEY: &str = "Email";
const STAGE_KEY: &str = "Stage";

const LEAD_PARTITION: &str = "Lead";
const CALLER_PARTITION: &str = "Caller";
const CUSTOMER_PARTITION: &str = "Customer";

type Item = HashMap<String, AttributeValue>;

/// Document engine. One table keyed by `Hash`/`Sort`: leads under the `Lead` partition
/// sorted by id, callers under `Caller` sorted by username, customers under `Customer`
/// sorted by lead id. The document itself is JSON
/// in `Data`, the lookup keys are copied next to it so they can be filtered on.
///
/// Limitations:
/// 1. Lookups query the whole partition with a filter, cost grows with the lead count
/// 2. The table must already exist, it is not created here
pub struct DynamoDBStore {
    network_store: NetworkStore,
}

impl DynamoDBStore {
    pub fn new(table: String, policy: MatchPolicy) -> Self {
        let env = DynamoDBEnv { table, policy };

        Self {
            network_store: NetworkStore::start("DynamoDB", env, client_fn, task_fn),
        }
    }
}

impl LeadStore for DynamoDBStore {
    fn execute(&self, statement: Statement) -> StoreResult<StatementResult> {
        self.network_store.execute(statement)
    }
}

#[derive(Clone)]
struct DynamoDBEnv {
    table: String,
    policy: MatchPolicy,
}

fn client_fn(_env: DynamoDBEnv) -> StoreFuture<Client> {
    Box::pin(async {
        let sdk = aws_config::load_from_env().await;

        Ok(Client::new(&sdk))
    })
}

fn task_fn(
    env: DynamoDBEnv,
    client: Arc<Client>,
    statement: Statement,
) -> StoreFuture<StatementResult> {
    Box::pin(async move { run(&env, &client, statement).await })
}

/// Optional filter applied on top of the partition query
struct PartitionFilter {
    expression: &'static str,
    name: (&'static str, &'static str),
    value: (&'static str, String),
}

async fn run(
    env: &DynamoDBEnv,
    client: &Client,
    statement: Statement,
) -> StoreResult<StatementResult> {
    let table = env.table.as_str();

    let result = match statement {
        Statement::Init => {
            client
                .describe_table()
                .table_name(table)
                .send()
                .await
                .map_err(|e| StoreError::Unavailable(sdk_error(e)))?;

            StatementResult::Done
        }
        Statement::FindByPhoneSuffix(digits) => {
            // DynamoDB has no ends_with, narrow with contains and finish here
            let items = query_partition(
                client,
                table,
                LEAD_PARTITION,
                Some(PartitionFilter {
                    expression: "contains(#phone, :digits)",
                    name: ("#phone", PHONE_KEY),
                    value: (":digits", digits.clone()),
                }),
            )
            .await?;

            let leads = decode_all::<Lead>(&items)?
                .into_iter()
                .filter(|lead| {
                    lead.phone_normalized(&env.policy)
                        .is_some_and(|phone| phone.ends_with(&digits))
                });

            StatementResult::Single(earliest(leads))
        }
        Statement::FindByEmail(email) => {
            let items = query_partition(
                client,
                table,
                LEAD_PARTITION,
                Some(PartitionFilter {
                    expression: "#email = :email",
                    name: ("#email", EMAIL_KEY),
                    value: (":email", email),
                }),
            )
            .await?;

            StatementResult::Single(earliest(decode_all::<Lead>(&items)?))
        }
        Statement::Insert(lead) => {
            let id = lead.id.clone();

            put_lead(env, client, lead, "attribute_not_exists(#sort)")
                .await
                .map_err(|e| match e {
                    PutError::ConditionFailed => StoreError::Duplicate(id.to_string()),
                    PutError::Store(e) => e,
                })?;

            StatementResult::Inserted(id)
        }
        Statement::Update(id, fields) => {
            let outcome = match put_lead(
                env,
                client,
                Lead::new(id, fields),
                "attribute_exists(#sort)",
            )
            .await
            {
                Ok(()) => UpdateOutcome::Updated,
                Err(PutError::ConditionFailed) => UpdateOutcome::NotFound,
                Err(PutError::Store(e)) => return Err(e),
            };

            StatementResult::Updated(outcome)
        }
        Statement::Get(id) => {
            let output = client
                .get_item()
                .table_name(table)
                .key(HASH_KEY, AttributeValue::S(LEAD_PARTITION.to_string()))
                .key(SORT_KEY, AttributeValue::S(id.to_string()))
                .send()
                .await
                .map_err(|e| StoreError::Query(sdk_error(e)))?;

            StatementResult::Single(output.item().map(decode::<Lead>).transpose()?)
        }
        Statement::List(query) => {
            let items = query_partition(client, table, LEAD_PARTITION, None).await?;

            StatementResult::List(filter(decode_all::<Lead>(&items)?, &query))
        }
        Statement::Delete(id) => StatementResult::Deleted(delete_lead(client, table, &id).await?),
        Statement::DeleteMany(ids) => {
            let mut deleted = 0;

            for id in ids {
                deleted += delete_lead(client, table, &id).await?;
            }

            StatementResult::Deleted(deleted)
        }
        Statement::FindCaller(username) => {
            let output = client
                .get_item()
                .table_name(table)
                .key(HASH_KEY, AttributeValue::S(CALLER_PARTITION.to_string()))
                .key(SORT_KEY, AttributeValue::S(username))
                .send()
                .await
                .map_err(|e| StoreError::Query(sdk_error(e)))?;

            StatementResult::Caller(output.item().map(decode::<Caller>).transpose()?)
        }
        Statement::InsertCaller(caller) => {
            put_new_document(client, table, CALLER_PARTITION, &caller.username, &caller).await?;

            StatementResult::Done
        }
        Statement::ListCallers => {
            let items = query_partition(client, table, CALLER_PARTITION, None).await?;

            let mut callers = decode_all::<Caller>(&items)?;
            callers.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            StatementResult::Callers(callers)
        }
        Statement::InsertCustomer(customer) => {
            let lead_id = customer.lead_id.to_string();

            put_new_document(client, table, CUSTOMER_PARTITION, &lead_id, &customer).await?;

            StatementResult::Done
        }
        Statement::ListCustomers => {
            let items = query_partition(client, table, CUSTOMER_PARTITION, None).await?;

            let mut customers = decode_all::<Customer>(&items)?;
            customers.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| a.lead_id.cmp(&b.lead_id))
            });

            StatementResult::Customers(customers)
        }
    };

    Ok(result)
}

enum PutError {
    ConditionFailed,
    Store(StoreError),
}

async fn put_lead(
    env: &DynamoDBEnv,
    client: &Client,
    lead: Lead,
    condition: &str,
) -> Result<(), PutError> {
    let mut request = client
        .put_item()
        .table_name(&env.table)
        .item(HASH_KEY, AttributeValue::S(LEAD_PARTITION.to_string()))
        .item(SORT_KEY, AttributeValue::S(lead.id.to_string()))
        .item(STAGE_KEY, AttributeValue::S(lead.fields.stage.clone()))
        .item(
            DATA_KEY,
            AttributeValue::S(encode(&lead).map_err(PutError::Store)?),
        )
        .condition_expression(condition)
        .expression_attribute_names("#sort", SORT_KEY);

    // Absent keys are left out entirely so filters never match them
    if let Some(phone) = lead.phone_normalized(&env.policy) {
        request = request.item(PHONE_KEY, AttributeValue::S(phone));
    }

    if let Some(email) = &lead.fields.email {
        request = request.item(EMAIL_KEY, AttributeValue::S(email.clone()));
    }

    match request.send().await {
        Ok(_) => Ok(()),
        Err(err) => {
            let condition_failed = err
                .as_service_error()
                .is_some_and(|e| e.is_conditional_check_failed_exception());

            match condition_failed {
                true => Err(PutError::ConditionFailed),
                false => Err(PutError::Store(StoreError::Query(sdk_error(err)))),
            }
        }
    }
}

/// Writes a JSON document under `partition`, `Duplicate` when the sort key is taken
async fn put_new_document<T: Serialize>(
    client: &Client,
    table: &str,
    partition: &str,
    sort: &str,
    document: &T,
) -> StoreResult<()> {
    let result = client
        .put_item()
        .table_name(table)
        .item(HASH_KEY, AttributeValue::S(partition.to_string()))
        .item(SORT_KEY, AttributeValue::S(sort.to_string()))
        .item(DATA_KEY, AttributeValue::S(encode(document)?))
        .condition_expression("attribute_not_exists(#sort)")
        .expression_attribute_names("#sort", SORT_KEY)
        .send()
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(err) => {
            let condition_failed = err
                .as_service_error()
                .is_some_and(|e| e.is_conditional_check_failed_exception());

            Err(match condition_failed {
                true => StoreError::Duplicate(sort.to_string()),
                false => StoreError::Query(sdk_error(err)),
            })
        }
    }
}

async fn delete_lead(client: &Client, table: &str, id: &LeadId) -> StoreResult<usize> {
    let output = client
        .delete_item()
        .table_name(table)
        .key(HASH_KEY, AttributeValue::S(LEAD_PARTITION.to_string()))
        .key(SORT_KEY, AttributeValue::S(id.to_string()))
        .return_values(ReturnValue::AllOld)
        .send()
        .await
        .map_err(|e| StoreError::Query(sdk_error(e)))?;

    Ok(match output.attributes() {
        Some(attributes) if !attributes.is_empty() => 1,
        _ => 0,
    })
}

async fn query_partition(
    client: &Client,
    table: &str,
    partition: &str,
    partition_filter: Option<PartitionFilter>,
) -> StoreResult<Vec<Item>> {
    let mut request = client
        .query()
        .table_name(table)
        .key_condition_expression("#hash = :hash")
        .expression_attribute_names("#hash", HASH_KEY)
        .expression_attribute_values(":hash", AttributeValue::S(partition.to_string()));

    if let Some(PartitionFilter {
        expression,
        name,
        value,
    }) = partition_filter
    {
        request = request
            .filter_expression(expression)
            .expression_attribute_names(name.0, name.1)
            .expression_attribute_values(value.0, AttributeValue::S(value.1));
    }

    let mut response = request.into_paginator().send();

    let mut items: Vec<Item> = vec![];

    while let Some(result) = response.next().await {
        let output = result.map_err(|e| StoreError::Query(sdk_error(e)))?;

        items.extend(output.items().iter().cloned());
    }

    Ok(items)
}

fn encode<T: Serialize>(document: &T) -> StoreResult<String> {
    serde_json::to_string(document).map_err(|e| StoreError::Decode(e.to_string()))
}

fn decode<T: DeserializeOwned>(item: &Item) -> StoreResult<T> {
    let data = item
        .get(DATA_KEY)
        .and_then(|value| value.as_s().ok())
        .ok_or_else(|| StoreError::Decode(format!("item without a {} attribute", DATA_KEY)))?;

    serde_json::from_str(data).map_err(|e| StoreError::Decode(e.to_string()))
}

fn decode_all<T: DeserializeOwned>(items: &[Item]) -> StoreResult<Vec<T>> {
    items.iter().map(decode::<T>).collect()
}

fn sdk_error<E, R>(err: SdkError<E, R>) -> String
where
    E: std::error::Error + 'static,
    R: Debug,
{
    format!("{}", DisplayErrorContext(&err))
}

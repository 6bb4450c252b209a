use std::sync::Arc;

use tokio_postgres::{error::SqlState, Client, NoTls, Row};

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
    table::filter::{LeadQuery, QueryMatch},
    LeadStore, StoreError, StoreResult,
};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS leads (
        id text NOT NULL,
        name text,
        company text,
        contact text,
        job_title text,
        email text,
        phone text,
        phone_normalized text,
        website text,
        linkedin text,
        value double precision NOT NULL DEFAULT 0,
        stage text NOT NULL,
        source text,
        priority text NOT NULL,
        industry text,
        notes text,
        city text,
        created_at timestamptz NOT NULL,
        PRIMARY KEY (id)
    );

    CREATE INDEX IF NOT EXISTS leads_phone_normalized_idx ON leads (phone_normalized);
    CREATE INDEX IF NOT EXISTS leads_email_idx ON leads (email);
    CREATE INDEX IF NOT EXISTS leads_stage_created_at_idx ON leads (stage, created_at DESC);

    CREATE TABLE IF NOT EXISTS callers (
        username text NOT NULL,
        password_hash text NOT NULL,
        role text NOT NULL,
        status text NOT NULL,
        created_at timestamptz NOT NULL,
        PRIMARY KEY (username)
    );

    CREATE TABLE IF NOT EXISTS customers (
        lead_id text NOT NULL,
        name text,
        phone text,
        email text,
        company text,
        city text,
        value double precision NOT NULL DEFAULT 0,
        lifetime_value double precision NOT NULL DEFAULT 0,
        source text,
        priority text NOT NULL,
        notes text,
        created_at timestamptz NOT NULL,
        PRIMARY KEY (lead_id)
    );
"#;

const LEAD_COLUMNS: &str = "id, name, company, contact, job_title, email, phone, website, \
     linkedin, value, stage, source, priority, industry, notes, city, created_at";

const CALLER_COLUMNS: &str = "username, password_hash, role, status, created_at";

const CUSTOMER_COLUMNS: &str = "lead_id, name, phone, email, company, city, value, \
     lifetime_value, source, priority, notes, created_at";

/// Relational engine, leads live in a plain `leads` table
pub struct PgStore {
    network_store: NetworkStore,
}

impl PgStore {
    pub fn new(connection: String, policy: MatchPolicy) -> Self {
        let env = PgEnv { connection, policy };

        Self {
            network_store: NetworkStore::start("Postgres", env, client_fn, task_fn),
        }
    }
}

impl LeadStore for PgStore {
    fn execute(&self, statement: Statement) -> StoreResult<StatementResult> {
        self.network_store.execute(statement)
    }
}

#[derive(Clone)]
struct PgEnv {
    connection: String,
    policy: MatchPolicy,
}

fn client_fn(env: PgEnv) -> StoreFuture<Client> {
    Box::pin(async move {
        let (client, connection) = tokio_postgres::connect(&env.connection, NoTls)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::error!("Postgres connection error: {}", e);
            }
        });

        Ok(client)
    })
}

fn task_fn(env: PgEnv, client: Arc<Client>, statement: Statement) -> StoreFuture<StatementResult> {
    Box::pin(async move { run(&env, &client, statement).await })
}

async fn run(env: &PgEnv, client: &Client, statement: Statement) -> StoreResult<StatementResult> {
    let result = match statement {
        Statement::Init => {
            client.batch_execute(SCHEMA).await.map_err(query_error)?;

            StatementResult::Done
        }
        Statement::FindByPhoneSuffix(digits) => {
            // Digits only, no LIKE wildcards can sneak in
            let sql = format!(
                "SELECT {} FROM leads WHERE phone_normalized LIKE '%' || $1 \
                 ORDER BY created_at ASC, id ASC LIMIT 1",
                LEAD_COLUMNS
            );

            let row = client.query_opt(sql.as_str(), &[&digits]).await.map_err(query_error)?;

            StatementResult::Single(row.as_ref().map(lead_from_row).transpose()?)
        }
        Statement::FindByEmail(email) => {
            let sql = format!(
                "SELECT {} FROM leads WHERE email = $1 ORDER BY created_at ASC, id ASC LIMIT 1",
                LEAD_COLUMNS
            );

            let row = client.query_opt(sql.as_str(), &[&email]).await.map_err(query_error)?;

            StatementResult::Single(row.as_ref().map(lead_from_row).transpose()?)
        }
        Statement::Insert(lead) => {
            let sql = r#"
                INSERT INTO leads (id, name, company, contact, job_title, email, phone, phone_normalized,
                    website, linkedin, value, stage, source, priority, industry, notes, city, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#;

            let f = &lead.fields;
            let phone_normalized = f.phone_normalized(&env.policy);

            client
                .execute(
                    sql,
                    &[
                        &lead.id.0,
                        &f.name,
                        &f.company,
                        &f.contact,
                        &f.job_title,
                        &f.email,
                        &f.phone,
                        &phone_normalized,
                        &f.website,
                        &f.linkedin,
                        &f.value,
                        &f.stage,
                        &f.source,
                        &f.priority,
                        &f.industry,
                        &f.notes,
                        &f.city,
                        &f.created_at,
                    ],
                )
                .await
                .map_err(|e| match is_unique_violation(&e) {
                    true => StoreError::Duplicate(lead.id.to_string()),
                    false => query_error(e),
                })?;

            StatementResult::Inserted(lead.id)
        }
        Statement::Update(id, fields) => {
            let sql = r#"
                UPDATE leads
                SET name = $2, company = $3, contact = $4, job_title = $5, email = $6, phone = $7,
                    phone_normalized = $8, website = $9, linkedin = $10, value = $11, stage = $12,
                    source = $13, priority = $14, industry = $15, notes = $16, city = $17, created_at = $18
                WHERE id = $1
            "#;

            let f = &fields;
            let phone_normalized = f.phone_normalized(&env.policy);

            let updated = client
                .execute(
                    sql,
                    &[
                        &id.0,
                        &f.name,
                        &f.company,
                        &f.contact,
                        &f.job_title,
                        &f.email,
                        &f.phone,
                        &phone_normalized,
                        &f.website,
                        &f.linkedin,
                        &f.value,
                        &f.stage,
                        &f.source,
                        &f.priority,
                        &f.industry,
                        &f.notes,
                        &f.city,
                        &f.created_at,
                    ],
                )
                .await
                .map_err(query_error)?;

            StatementResult::Updated(match updated {
                0 => UpdateOutcome::NotFound,
                _ => UpdateOutcome::Updated,
            })
        }
        Statement::Get(id) => {
            let sql = format!("SELECT {} FROM leads WHERE id = $1", LEAD_COLUMNS);

            let row = client.query_opt(sql.as_str(), &[&id.0]).await.map_err(query_error)?;

            StatementResult::Single(row.as_ref().map(lead_from_row).transpose()?)
        }
        Statement::List(LeadQuery { stage }) => {
            let stage = match stage {
                QueryMatch::Any => None,
                QueryMatch::Value(stage) => Some(stage),
            };

            let sql = format!(
                "SELECT {} FROM leads {} ORDER BY created_at DESC, id ASC",
                LEAD_COLUMNS,
                if stage.is_some() { "WHERE stage = $1" } else { "" }
            );

            let rows = match &stage {
                Some(stage) => client.query(sql.as_str(), &[stage]).await,
                None => client.query(sql.as_str(), &[]).await,
            }
            .map_err(query_error)?;

            StatementResult::List(rows.iter().map(lead_from_row).collect::<StoreResult<_>>()?)
        }
        Statement::Delete(id) => {
            let deleted = client
                .execute("DELETE FROM leads WHERE id = $1", &[&id.0])
                .await
                .map_err(query_error)?;

            StatementResult::Deleted(deleted as usize)
        }
        Statement::DeleteMany(ids) => {
            let ids: Vec<String> = ids.into_iter().map(|id| id.0).collect();

            let deleted = client
                .execute("DELETE FROM leads WHERE id = ANY($1)", &[&ids])
                .await
                .map_err(query_error)?;

            StatementResult::Deleted(deleted as usize)
        }
        Statement::FindCaller(username) => {
            let sql = format!("SELECT {} FROM callers WHERE username = $1", CALLER_COLUMNS);

            let row = client.query_opt(sql.as_str(), &[&username]).await.map_err(query_error)?;

            StatementResult::Caller(row.as_ref().map(caller_from_row).transpose()?)
        }
        Statement::InsertCaller(caller) => {
            let sql = format!(
                "INSERT INTO callers ({}) VALUES ($1, $2, $3, $4, $5)",
                CALLER_COLUMNS
            );

            client
                .execute(
                    sql.as_str(),
                    &[
                        &caller.username,
                        &caller.password_hash,
                        &caller.role,
                        &caller.status,
                        &caller.created_at,
                    ],
                )
                .await
                .map_err(|e| match is_unique_violation(&e) {
                    true => StoreError::Duplicate(caller.username.clone()),
                    false => query_error(e),
                })?;

            StatementResult::Done
        }
        Statement::ListCallers => {
            let sql = format!("SELECT {} FROM callers ORDER BY created_at DESC", CALLER_COLUMNS);

            let rows = client.query(sql.as_str(), &[]).await.map_err(query_error)?;

            StatementResult::Callers(
                rows.iter()
                    .map(caller_from_row)
                    .collect::<StoreResult<_>>()?,
            )
        }
        Statement::InsertCustomer(customer) => {
            let sql = format!(
                "INSERT INTO customers ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
                CUSTOMER_COLUMNS
            );

            client
                .execute(
                    sql.as_str(),
                    &[
                        &customer.lead_id.0,
                        &customer.name,
                        &customer.phone,
                        &customer.email,
                        &customer.company,
                        &customer.city,
                        &customer.value,
                        &customer.lifetime_value,
                        &customer.source,
                        &customer.priority,
                        &customer.notes,
                        &customer.created_at,
                    ],
                )
                .await
                .map_err(|e| match is_unique_violation(&e) {
                    true => StoreError::Duplicate(customer.lead_id.to_string()),
                    false => query_error(e),
                })?;

            StatementResult::Done
        }
        Statement::ListCustomers => {
            let sql = format!(
                "SELECT {} FROM customers ORDER BY created_at DESC, lead_id ASC",
                CUSTOMER_COLUMNS
            );

            let rows = client.query(sql.as_str(), &[]).await.map_err(query_error)?;

            StatementResult::Customers(
                rows.iter()
                    .map(customer_from_row)
                    .collect::<StoreResult<_>>()?,
            )
        }
    };

    Ok(result)
}

fn lead_from_row(row: &Row) -> StoreResult<Lead> {
    let text = |column: &str| -> StoreResult<Option<String>> {
        row.try_get(column).map_err(decode_error)
    };

    let mut fields = LeadFields::new(row.try_get("created_at").map_err(decode_error)?);

    fields.name = text("name")?;
    fields.company = text("company")?;
    fields.contact = text("contact")?;
    fields.job_title = text("job_title")?;
    fields.email = text("email")?;
    fields.phone = text("phone")?;
    fields.website = text("website")?;
    fields.linkedin = text("linkedin")?;
    fields.value = row.try_get("value").map_err(decode_error)?;
    fields.stage = row.try_get("stage").map_err(decode_error)?;
    fields.source = text("source")?;
    fields.priority = row.try_get("priority").map_err(decode_error)?;
    fields.industry = text("industry")?;
    fields.notes = text("notes")?;
    fields.city = text("city")?;

    let id: String = row.try_get("id").map_err(decode_error)?;

    Ok(Lead::new(LeadId(id), fields))
}

fn caller_from_row(row: &Row) -> StoreResult<Caller> {
    Ok(Caller {
        username: row.try_get("username").map_err(decode_error)?,
        password_hash: row.try_get("password_hash").map_err(decode_error)?,
        role: row.try_get("role").map_err(decode_error)?,
        status: row.try_get("status").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn customer_from_row(row: &Row) -> StoreResult<Customer> {
    let lead_id: String = row.try_get("lead_id").map_err(decode_error)?;

    Ok(Customer {
        lead_id: LeadId(lead_id),
        name: row.try_get("name").map_err(decode_error)?,
        phone: row.try_get("phone").map_err(decode_error)?,
        email: row.try_get("email").map_err(decode_error)?,
        company: row.try_get("company").map_err(decode_error)?,
        city: row.try_get("city").map_err(decode_error)?,
        value: row.try_get("value").map_err(decode_error)?,
        lifetime_value: row.try_get("lifetime_value").map_err(decode_error)?,
        source: row.try_get("source").map_err(decode_error)?,
        priority: row.try_get("priority").map_err(decode_error)?,
        notes: row.try_get("notes").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn is_unique_violation(err: &tokio_postgres::Error) -> bool {
    err.code() == Some(&SqlState::UNIQUE_VIOLATION)
}

fn query_error(err: tokio_postgres::Error) -> StoreError {
    StoreError::Query(err.to_string())
}

fn decode_error(err: tokio_postgres::Error) -> StoreError {
    StoreError::Decode(err.to_string())
}

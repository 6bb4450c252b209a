use std::{future::Future, pin::Pin, sync::Arc, thread};

use tokio::{
    runtime::Builder,
    sync::mpsc::{self, Receiver, Sender},
};

use crate::model::statement::{Statement, StatementResult};

use super::{LeadStore, StoreError, StoreResult};

pub type StoreFuture<T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'static>>;

/// Connects the engine's client, runs once on the runtime thread
pub type ClientFn<T, C> = fn(T) -> StoreFuture<C>;

/// Runs one statement against the engine
pub type TaskFn<T, C> = fn(T, Arc<C>, Statement) -> StoreFuture<StatementResult>;

pub struct StoreRequest {
    pub statement: Statement,
    pub resolver: oneshot::Sender<StoreResult<StatementResult>>,
}

/// Synchronous front for engines whose clients are async. Statements are shipped to a
/// dedicated runtime thread and the caller blocks until the answer comes back.
///
/// Must not be called from inside a tokio runtime, `blocking_send` panics there.
pub struct NetworkStore {
    request_sender: Sender<StoreRequest>,
}

impl NetworkStore {
    pub fn start<T, C>(name: &str, context: T, client: ClientFn<T, C>, task: TaskFn<T, C>) -> Self
    where
        T: Clone + Send + 'static,
        C: Send + Sync + 'static,
    {
        let (request_sender, request_receiver) = mpsc::channel::<StoreRequest>(16);

        start_runtime(name, request_receiver, context, client, task);

        Self { request_sender }
    }
}

impl LeadStore for NetworkStore {
    fn execute(&self, statement: Statement) -> StoreResult<StatementResult> {
        let (resolver, receiver) = oneshot::channel::<StoreResult<StatementResult>>();

        log::debug!("Network store: {}", statement.log_format());

        self.request_sender
            .blocking_send(StoreRequest {
                statement,
                resolver,
            })
            .map_err(|_| StoreError::WorkerStopped)?;

        receiver.recv().map_err(|_| StoreError::WorkerStopped)?
    }
}

fn start_runtime<T, C>(
    name: &str,
    mut request_receiver: Receiver<StoreRequest>,
    context: T,
    client: ClientFn<T, C>,
    task: TaskFn<T, C>,
) where
    T: Clone + Send + 'static,
    C: Send + Sync + 'static,
{
    let thread_name = format!("{} store", name);

    let spawned = thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let rt = match Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(err) => {
                    log::error!("[{}] Unable to build runtime: {}", thread_name, err);
                    return;
                }
            };

            rt.block_on(async move {
                let client = match client(context.clone()).await {
                    Ok(client) => Arc::new(client),
                    Err(err) => {
                        log::error!("[{}] Unable to connect: {}", thread_name, err);

                        // Keep answering so callers see the reason instead of a dropped channel
                        while let Some(request) = request_receiver.recv().await {
                            let _ = request
                                .resolver
                                .send(Err(StoreError::Unavailable(err.to_string())));
                        }

                        return;
                    }
                };

                log::info!("[{}] Connected", thread_name);

                while let Some(StoreRequest {
                    statement,
                    resolver,
                }) = request_receiver.recv().await
                {
                    let task_future = task(context.clone(), client.clone(), statement);

                    tokio::spawn(async move {
                        // Requester may have gone away, nothing to do then
                        let _ = resolver.send(task_future.await);
                    });
                }
            });
        });

    if let Err(err) = spawned {
        log::error!("Unable to spawn store thread: {}", err);
    }
}

//! Warehouse access.
//!
//! The [`Warehouse`] trait abstracts over where rewritten SQL runs. The
//! primary implementation, [`WorkerWarehouse`], forwards queries to the
//! worker process that holds the Snowflake connection.
//!
//! # Example
//!
//! ```ignore
//! use snowmock::warehouse::{Warehouse, WorkerWarehouse};
//!
//! let warehouse = WorkerWarehouse::connect("./snowflake-worker", &[], None, connection).await?;
//! let table = warehouse.execute("select 1 as one").await?;
//! warehouse.close().await?;
//! ```

mod result;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::worker::protocol::ConnectionParams;
use crate::worker::{WorkerClient, WorkerResult};

pub use result::ResultTable;

/// Something that can execute SQL and return rows.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Execute one statement and collect its result set.
    async fn execute(&self, sql: &str) -> WorkerResult<ResultTable>;

    /// Release the connection. Calling this more than once is a no-op.
    async fn close(&self) -> WorkerResult<()>;
}

#[async_trait]
impl<W: Warehouse + ?Sized> Warehouse for Arc<W> {
    async fn execute(&self, sql: &str) -> WorkerResult<ResultTable> {
        (**self).execute(sql).await
    }

    async fn close(&self) -> WorkerResult<()> {
        (**self).close().await
    }
}

/// [`Warehouse`] backed by a [`WorkerClient`].
pub struct WorkerWarehouse {
    client: Arc<WorkerClient>,
    connection: ConnectionParams,
    closed: AtomicBool,
}

impl WorkerWarehouse {
    /// Wrap a running worker. The connection must already be open.
    pub fn new(client: Arc<WorkerClient>, connection: ConnectionParams) -> Self {
        Self {
            client,
            connection,
            closed: AtomicBool::new(false),
        }
    }

    /// Spawn the worker and open the warehouse connection.
    ///
    /// The worker is stopped again if the connection cannot be opened.
    pub async fn connect<P: AsRef<Path>>(
        worker_path: P,
        args: &[String],
        timeout: Option<Duration>,
        connection: ConnectionParams,
    ) -> WorkerResult<Self> {
        let client = WorkerClient::spawn(worker_path, args, timeout).await?;
        if let Err(e) = client.open_connection(&connection).await {
            if let Err(shutdown) = client.shutdown().await {
                warn!(error = %shutdown, "failed to stop worker after connection error");
            }
            return Err(e);
        }
        debug!(driver = %connection.driver, "warehouse connection opened");
        Ok(Self::new(Arc::new(client), connection))
    }
}

#[async_trait]
impl Warehouse for WorkerWarehouse {
    async fn execute(&self, sql: &str) -> WorkerResult<ResultTable> {
        let response = self.client.execute_query(&self.connection, sql).await?;
        Ok(response.into())
    }

    async fn close(&self) -> WorkerResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = self.client.close_connection(&self.connection).await {
            warn!(error = %e, "failed to close warehouse connection");
        }
        self.client.shutdown().await
    }
}

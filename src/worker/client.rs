//! Async client for communicating with the warehouse worker process.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use super::error::{WorkerError, WorkerResult};
use super::protocol::{
    methods, ConnectionParams, ConnectionRequestParams, ConnectionResponse, ErrorInfo,
    ExecuteQueryParams, ExecuteQueryResponse, RequestEnvelope, ResponseEnvelope,
};

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<ResponseEnvelope>>>>;

/// Async client for the warehouse worker.
///
/// The client spawns the worker as a child process and communicates via
/// NDJSON (newline-delimited JSON) over stdin/stdout. Each request has a
/// unique ID for correlation with responses.
///
/// The child is killed when the client is dropped.
pub struct WorkerClient {
    /// Writer for sending requests to worker stdin.
    stdin: Arc<Mutex<BufWriter<ChildStdin>>>,

    /// Map of pending request IDs to response channels.
    pending: PendingMap,

    /// Handle to the worker child process.
    child: Mutex<Child>,

    /// Handle to the background reader task.
    _reader_task: tokio::task::JoinHandle<()>,

    /// Request timeout. `None` waits indefinitely.
    timeout: Option<Duration>,
}

impl WorkerClient {
    /// Spawn a worker process.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker process cannot be spawned.
    pub async fn spawn<P: AsRef<Path>>(
        worker_path: P,
        args: &[String],
        timeout: Option<Duration>,
    ) -> WorkerResult<Self> {
        let mut child = Command::new(worker_path.as_ref())
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(WorkerError::SpawnFailed)?;

        let stdin = child.stdin.take().ok_or_else(|| not_captured("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| not_captured("stdout"))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_task = Self::spawn_reader_task(stdout, pending.clone());

        Ok(Self {
            stdin: Arc::new(Mutex::new(BufWriter::new(stdin))),
            pending,
            child: Mutex::new(child),
            _reader_task: reader_task,
            timeout,
        })
    }

    /// Spawn the background task that reads responses from the worker.
    fn spawn_reader_task(stdout: ChildStdout, pending: PendingMap) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => match serde_json::from_str::<ResponseEnvelope>(&line) {
                        Ok(resp) => {
                            if let Some(tx) = pending.lock().await.remove(&resp.id) {
                                let _ = tx.send(resp);
                            }
                        }
                        Err(e) => warn!(error = %e, "worker: failed to parse response"),
                    },
                    Err(e) => {
                        warn!(error = %e, "worker: read error");
                        break;
                    }
                }
            }

            // Worker exited - fail every request still waiting
            let mut pending = pending.lock().await;
            for (id, tx) in pending.drain() {
                let _ = tx.send(ResponseEnvelope {
                    id,
                    success: false,
                    result: None,
                    error: Some(ErrorInfo {
                        code: "WORKER_EXITED".to_string(),
                        message: "Worker process exited unexpectedly".to_string(),
                    }),
                });
            }
        })
    }

    /// Send a request to the worker and wait for its response.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Serialization fails
    /// - Writing to the worker fails
    /// - The request times out
    /// - The worker returns an error response
    /// - Deserialization of the response fails
    pub async fn request<P, R>(&self, method: &str, params: P) -> WorkerResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = uuid::Uuid::new_v4().to_string();

        let request = RequestEnvelope {
            id: id.clone(),
            method: method.to_string(),
            params: serde_json::to_value(params).map_err(WorkerError::SerializeFailed)?,
        };
        let line = serde_json::to_string(&request).map_err(WorkerError::SerializeFailed)? + "\n";

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);
        debug!(%id, method, "worker request");

        if let Err(e) = self.write_line(&line).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let response = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(resp) => resp?,
                Err(_) => {
                    self.pending.lock().await.remove(&id);
                    return Err(WorkerError::Timeout(limit.as_secs()));
                }
            },
            None => rx.await?,
        };

        if response.success {
            let result = response.result.unwrap_or(serde_json::Value::Null);
            serde_json::from_value(result).map_err(WorkerError::DeserializeFailed)
        } else {
            let error = response.error.unwrap_or_else(|| ErrorInfo {
                code: "UNKNOWN".to_string(),
                message: "Unknown error".to_string(),
            });
            Err(WorkerError::classify(&error.code, &error.message))
        }
    }

    async fn write_line(&self, line: &str) -> WorkerResult<()> {
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(WorkerError::WriteFailed)?;
        stdin.flush().await.map_err(WorkerError::WriteFailed)
    }

    /// Ask the worker to open the warehouse connection.
    pub async fn open_connection(&self, connection: &ConnectionParams) -> WorkerResult<ConnectionResponse> {
        self.request(
            methods::OPEN_CONNECTION,
            ConnectionRequestParams {
                connection: connection.clone(),
            },
        )
        .await
    }

    /// Ask the worker to close the warehouse connection.
    pub async fn close_connection(&self, connection: &ConnectionParams) -> WorkerResult<ConnectionResponse> {
        self.request(
            methods::CLOSE_CONNECTION,
            ConnectionRequestParams {
                connection: connection.clone(),
            },
        )
        .await
    }

    /// Execute a SQL query.
    pub async fn execute_query(
        &self,
        connection: &ConnectionParams,
        sql: &str,
    ) -> WorkerResult<ExecuteQueryResponse> {
        self.request(
            methods::EXECUTE_QUERY,
            ExecuteQueryParams {
                connection: connection.clone(),
                sql: sql.to_string(),
            },
        )
        .await
    }

    /// Stop the worker process and wait for it to exit.
    pub async fn shutdown(&self) -> WorkerResult<()> {
        let mut child = self.child.lock().await;
        if child.try_wait().map_err(WorkerError::ShutdownFailed)?.is_none() {
            child.start_kill().map_err(WorkerError::ShutdownFailed)?;
            child.wait().await.map_err(WorkerError::ShutdownFailed)?;
        }
        Ok(())
    }
}

fn not_captured(stream: &str) -> WorkerError {
    WorkerError::SpawnFailed(io::Error::new(
        io::ErrorKind::BrokenPipe,
        format!("worker {} not captured", stream),
    ))
}

//! The PostgreSQL batch-flush transport and the interface a host logging
//! framework drives it through.
use crate::buffer::LevelBuffers;
use crate::config::TransportConfig;
use crate::schema;
use crate::types::{BufferedRecord, Severity};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

/// The contract between a host logging framework and a transport.
///
/// A transport registers under a name, is connected once during host
/// startup, receives every emitted event through [`Transport::on_event`],
/// and is closed during host shutdown.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The transport's registration name within the host.
    fn name(&self) -> &str;

    /// Establishes whatever resources the transport needs.
    ///
    /// # Errors
    ///
    /// Returns an error if the resources cannot be established; the caller
    /// decides whether to retry or abort startup.
    async fn connect(&self) -> Result<()>;

    /// Releases the transport's resources.
    ///
    /// # Errors
    ///
    /// Returns an error if teardown fails.
    async fn close(&self) -> Result<()>;

    /// Hands one leveled event to the transport.
    ///
    /// Called synchronously from the host's emit path, so implementations
    /// must not block on I/O and must not fail observably.
    fn on_event(&self, severity: Severity, payload: Value);
}

/// Everything that only exists while the transport is connected.
struct Connection {
    pool: PgPool,
    shutdown_tx: mpsc::Sender<()>,
    flusher: JoinHandle<()>,
}

/// A [`Transport`] that buffers events per severity and periodically writes
/// each level's batch into its own PostgreSQL table.
///
/// On [`connect`](Transport::connect) the configured schema and six
/// `<prefix><level>` tables are created if missing, and a flush task is
/// started. Each cycle drains the six queues concurrently, one transaction
/// per level, then re-arms the timer. A batch that fails to commit is
/// dropped; buffering and flushing of the other levels continue unaffected.
///
/// Records buffered but not yet flushed when [`close`](Transport::close) is
/// called are lost.
pub struct PgTransport {
    name: String,
    config: TransportConfig,
    buffers: Arc<LevelBuffers>,
    connection: Mutex<Option<Connection>>,
}

impl PgTransport {
    /// Creates a transport with the given registration name and settings.
    ///
    /// Events can be ingested immediately; they accumulate in memory and are
    /// only persisted while the transport is connected.
    pub fn new(name: impl Into<String>, config: TransportConfig) -> Self {
        let buffers = Arc::new(LevelBuffers::new(config.batch_capacity));
        Self {
            name: name.into(),
            config,
            buffers,
            connection: Mutex::new(None),
        }
    }

    /// Buffers a debug-level event.
    pub fn debug(&self, payload: Value) {
        self.on_event(Severity::Debug, payload);
    }

    /// Buffers an info-level event.
    pub fn info(&self, payload: Value) {
        self.on_event(Severity::Info, payload);
    }

    /// Buffers a warn-level event.
    pub fn warn(&self, payload: Value) {
        self.on_event(Severity::Warn, payload);
    }

    /// Buffers a severe-level event.
    pub fn severe(&self, payload: Value) {
        self.on_event(Severity::Severe, payload);
    }

    /// Buffers an error-level event.
    pub fn error(&self, payload: Value) {
        self.on_event(Severity::Error, payload);
    }

    /// Buffers a fatal-level event.
    pub fn fatal(&self, payload: Value) {
        self.on_event(Severity::Fatal, payload);
    }

    /// Number of records currently buffered for `severity`, i.e. ingested
    /// but not yet drained by a flush cycle.
    pub fn buffered(&self, severity: Severity) -> usize {
        self.buffers.len(severity)
    }

    /// Ensures the schema and the six per-level tables exist.
    async fn bootstrap(pool: &PgPool, config: &TransportConfig) -> Result<()> {
        sqlx::query(&schema::create_schema_sql(config))
            .execute(pool)
            .await?;

        for severity in Severity::ALL {
            sqlx::query(&schema::create_table_sql(config, severity))
                .execute(pool)
                .await?;
        }

        Ok(())
    }

    /// Starts the flush task: sleep, flush all levels, re-arm, until told to
    /// stop. The timer is re-armed even after a cycle with failures.
    fn spawn_flusher(&self, pool: PgPool) -> (mpsc::Sender<()>, JoinHandle<()>) {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let buffers = self.buffers.clone();
        let config = self.config.clone();

        let flusher = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(config.flush_interval) => {
                        flush_cycle(&pool, &buffers, &config).await;
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Flush task stopping");
                        break;
                    }
                }
            }
        });

        (shutdown_tx, flusher)
    }
}

#[async_trait]
impl Transport for PgTransport {
    fn name(&self) -> &str {
        &self.name
    }

    /// Connects the pool, bootstraps the log tables, and arms the flush
    /// timer.
    ///
    /// Safe to call against an already-initialized database: all DDL uses
    /// `IF NOT EXISTS`. Calling it on an already-connected transport only
    /// re-runs the DDL; the existing pool and flush task are kept.
    async fn connect(&self) -> Result<()> {
        let mut connection = self.connection.lock().await;

        if let Some(ref existing) = *connection {
            Self::bootstrap(&existing.pool, &self.config).await?;
            return Ok(());
        }

        let pool = PgPoolOptions::new()
            .connect_with(self.config.connect_options())
            .await?;

        if let Err(e) = Self::bootstrap(&pool, &self.config).await {
            pool.close().await;
            return Err(e);
        }

        let (shutdown_tx, flusher) = self.spawn_flusher(pool.clone());
        *connection = Some(Connection {
            pool,
            shutdown_tx,
            flusher,
        });

        info!(
            "Transport '{}' connected, flushing every {:?}",
            self.name, self.config.flush_interval
        );
        Ok(())
    }

    /// Stops the flush timer and closes the pool.
    ///
    /// An in-flight flush is allowed to finish or fail naturally before the
    /// task exits. Records still buffered at this point are lost; there is
    /// no final flush. A no-op if the transport never connected.
    async fn close(&self) -> Result<()> {
        let Some(connection) = self.connection.lock().await.take() else {
            return Ok(());
        };

        let _ = connection.shutdown_tx.send(()).await;
        let _ = connection.flusher.await;
        connection.pool.close().await;

        info!("Transport '{}' closed", self.name);
        Ok(())
    }

    fn on_event(&self, severity: Severity, payload: Value) {
        self.buffers.push(severity, BufferedRecord::from_event(payload));
    }
}

/// Drains and persists all six severity queues concurrently, each as an
/// independent unit of failure, then returns so the timer can be re-armed.
async fn flush_cycle(pool: &PgPool, buffers: &LevelBuffers, config: &TransportConfig) {
    trace!("Starting flush cycle");

    join_all(
        Severity::ALL
            .iter()
            .map(|&severity| flush_level(pool, buffers, config, severity)),
    )
    .await;

    trace!("Flush cycle completed");
}

/// Takes one level's batch and writes it in a single transaction.
///
/// A batch that fails is dropped, not re-queued: there is no idempotency
/// key, so retrying could duplicate rows from a commit that half-landed.
async fn flush_level(
    pool: &PgPool,
    buffers: &LevelBuffers,
    config: &TransportConfig,
    severity: Severity,
) {
    let batch = buffers.take(severity);
    if batch.is_empty() {
        return;
    }

    match write_batch(pool, config, severity, &batch).await {
        Ok(()) => debug!("Flushed {} {} records", batch.len(), severity),
        Err(e) => error!(
            "Failed to flush {} batch, dropping {} records: {}",
            severity,
            batch.len(),
            e
        ),
    }
}

/// Inserts every record of `batch` in order inside one transaction, on one
/// connection checked out for the duration.
async fn write_batch(
    pool: &PgPool,
    config: &TransportConfig,
    severity: Severity,
    batch: &[BufferedRecord],
) -> Result<()> {
    let mut tx = pool.begin().await?;
    let sql = schema::insert_sql(config, severity);

    for record in batch {
        sqlx::query(&sql)
            .bind(record.timestamp)
            .bind(&record.module)
            .bind(&record.payload)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn ingestion_buffers_before_connect() {
        let transport = PgTransport::new("test", TransportConfig::default());

        transport.debug(json!({ "name": "svc", "text": "one" }));
        transport.debug(json!({ "name": "svc", "text": "two" }));
        transport.fatal(json!({ "name": "svc", "text": "boom" }));

        assert_eq!(transport.buffered(Severity::Debug), 2);
        assert_eq!(transport.buffered(Severity::Fatal), 1);
        assert_eq!(transport.buffered(Severity::Info), 0);
    }

    #[tokio::test]
    async fn each_entry_point_targets_its_own_queue() {
        let transport = PgTransport::new("test", TransportConfig::default());

        transport.debug(json!({ "name": "m" }));
        transport.info(json!({ "name": "m" }));
        transport.warn(json!({ "name": "m" }));
        transport.severe(json!({ "name": "m" }));
        transport.error(json!({ "name": "m" }));
        transport.fatal(json!({ "name": "m" }));

        for severity in Severity::ALL {
            assert_eq!(transport.buffered(severity), 1);
        }
    }

    #[tokio::test]
    async fn close_without_connect_is_a_no_op() {
        let transport = PgTransport::new("test", TransportConfig::default());
        transport.close().await.unwrap();
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn transport_is_usable_as_a_trait_object() {
        let transport: Arc<dyn Transport> =
            Arc::new(PgTransport::new("pg", TransportConfig::default()));

        assert_eq!(transport.name(), "pg");
        transport.on_event(Severity::Warn, json!({ "name": "svc", "text": "careful" }));
        transport.close().await.unwrap();
    }
}

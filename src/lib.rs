//! Buffered PostgreSQL transport for leveled log events.
//!
//! Events handed to the transport are grouped into per-severity in-memory
//! queues and periodically written out, one table per level, inside a
//! configurable schema. The schema and tables are created on first connect;
//! each flush cycle writes every level's batch in its own transaction so one
//! bad batch cannot hold back the other levels.
//!
//! ```no_run
//! use pglog::{PgTransport, Transport, TransportConfig};
//! use serde_json::json;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let transport = PgTransport::new(
//!     "pg",
//!     TransportConfig {
//!         database: "logs".to_string(),
//!         ..TransportConfig::default()
//!     },
//! );
//!
//! transport.connect().await?;
//! transport.debug(json!({ "name": "svc", "text": "started" }));
//! // ... events flush in the background every `flush_interval` ...
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```
pub mod buffer;
pub mod config;
mod schema;
pub mod transport;
pub mod types;

pub use buffer::LevelBuffers;
pub use config::TransportConfig;
pub use transport::{PgTransport, Transport};
pub use types::{BufferedRecord, Severity, MODULE_NAME_MAX};

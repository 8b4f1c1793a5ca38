//! Connection and flush settings for the transport.
use crate::types::Severity;
use sqlx::postgres::PgConnectOptions;
use std::time::Duration;

/// Settings for [`PgTransport`](crate::PgTransport), immutable once the
/// transport is constructed.
///
/// Every field has a default, so hosts typically fill in only what differs:
///
/// ```
/// use pglog::TransportConfig;
///
/// let config = TransportConfig {
///     database: "logs".to_string(),
///     ..TransportConfig::default()
/// };
/// assert_eq!(config.port, 5432);
/// ```
#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Schema the per-level tables are created under.
    pub schema: String,
    /// Prefix prepended to each level's table name.
    pub table_prefix: String,
    /// How long the flush task sleeps between cycles. The timer is re-armed
    /// after each cycle completes, so a slow flush stretches the period.
    pub flush_interval: Duration,
    /// Preallocation hint for each fresh level queue. Queues still grow
    /// unbounded between flushes; this is not a cap.
    pub batch_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "simple".to_string(),
            username: None,
            password: None,
            schema: "logs".to_string(),
            table_prefix: "log_".to_string(),
            flush_interval: Duration::from_millis(10_000),
            batch_capacity: 1,
        }
    }
}

impl TransportConfig {
    /// Fully qualified table name for one severity level.
    pub fn table_name(&self, severity: Severity) -> String {
        format!("{}.{}{}", self.schema, self.table_prefix, severity.as_str())
    }

    pub(crate) fn connect_options(&self) -> PgConnectOptions {
        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database);

        if let Some(ref username) = self.username {
            options = options.username(username);
        }
        if let Some(ref password) = self.password {
            options = options.password(password);
        }

        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = TransportConfig::default();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "simple");
        assert_eq!(config.username, None);
        assert_eq!(config.password, None);
        assert_eq!(config.schema, "logs");
        assert_eq!(config.table_prefix, "log_");
        assert_eq!(config.flush_interval, Duration::from_millis(10_000));
        assert_eq!(config.batch_capacity, 1);
    }

    #[test]
    fn table_names_combine_schema_prefix_and_level() {
        let config = TransportConfig::default();
        assert_eq!(config.table_name(Severity::Debug), "logs.log_debug");

        let custom = TransportConfig {
            schema: "audit".to_string(),
            table_prefix: "evt_".to_string(),
            ..TransportConfig::default()
        };
        assert_eq!(custom.table_name(Severity::Fatal), "audit.evt_fatal");
    }
}

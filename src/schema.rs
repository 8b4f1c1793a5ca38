//! SQL text for schema bootstrap and per-level inserts.
//!
//! Schema and table names come from the transport configuration and cannot
//! be bound as statement parameters, so they are interpolated into the SQL
//! here; record values are always bound.
use crate::config::TransportConfig;
use crate::types::Severity;

pub(crate) fn create_schema_sql(config: &TransportConfig) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", config.schema)
}

pub(crate) fn create_table_sql(config: &TransportConfig, severity: Severity) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         event_time timestamp with time zone NOT NULL DEFAULT now(), \
         module_name character varying(50) NOT NULL, \
         payload jsonb)",
        config.table_name(severity)
    )
}

pub(crate) fn insert_sql(config: &TransportConfig, severity: Severity) -> String {
    format!(
        "INSERT INTO {} (event_time, module_name, payload) VALUES ($1, $2, $3)",
        config.table_name(severity)
    )
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Maximum stored module-name length. Matches the `varchar(50)` column the
/// per-level tables are created with, so a flush can never fail on an
/// oversized name.
pub const MODULE_NAME_MAX: usize = 50;

/// The six log levels the transport understands.
///
/// The lowercase form doubles as the table-name suffix for the level.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Severe,
    Error,
    Fatal,
}

impl Severity {
    /// All levels, in queue order.
    pub const ALL: [Severity; 6] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Severe,
        Severity::Error,
        Severity::Fatal,
    ];

    /// The lowercase name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Severe => "severe",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" => Ok(Severity::Warn),
            "severe" => Ok(Severity::Severe),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            other => Err(anyhow::anyhow!("Unknown severity level: {}", other)),
        }
    }
}

/// A single log record, owned by the transport from ingestion until it is
/// flushed (or dropped with its batch on a failed flush).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BufferedRecord {
    /// Wall-clock time the event was received, not the time it was flushed.
    pub timestamp: DateTime<Utc>,
    /// Module name split off the event payload.
    pub module: String,
    /// The rest of the event payload, stored as-is.
    pub payload: Value,
}

impl BufferedRecord {
    /// Builds a record from a raw host event.
    ///
    /// The reserved `"name"` key is removed from the payload and becomes the
    /// module name; the remainder is kept untouched. Taking the payload by
    /// value means the transport holds no references into caller-owned data.
    ///
    /// This path never fails: a missing `"name"` coerces to an empty module
    /// name, a non-string one is stringified, and the result is truncated to
    /// [`MODULE_NAME_MAX`] characters.
    pub fn from_event(mut payload: Value) -> Self {
        let mut module = match payload.as_object_mut().and_then(|fields| fields.remove("name")) {
            Some(Value::String(name)) => name,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        if let Some((cut, _)) = module.char_indices().nth(MODULE_NAME_MAX) {
            module.truncate(cut);
        }

        Self {
            timestamp: Utc::now(),
            module,
            payload,
        }
    }
}

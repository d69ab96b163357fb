use crate::error::{Result, StoreError};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A request log row before it has been persisted.
///
/// String fields are empty when the inbound request did not carry them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLogEntry {
    pub timestamp: Timestamp,
    pub remote_addr: String,
    pub method: String,
    pub request_uri: String,
    pub protocol: String,
    pub status_code: u16,
    pub user_agent: String,
    pub referer: String,
}

/// A persisted, immutable request log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Sequential identity assigned by the store.
    pub id: i64,
    pub timestamp: Timestamp,
    pub remote_addr: String,
    pub method: String,
    pub request_uri: String,
    pub protocol: String,
    pub status_code: u16,
    pub user_agent: String,
    pub referer: String,
}

impl LogEntry {
    pub fn from_new(id: i64, entry: NewLogEntry) -> Self {
        Self {
            id,
            timestamp: entry.timestamp,
            remote_addr: entry.remote_addr,
            method: entry.method,
            request_uri: entry.request_uri,
            protocol: entry.protocol,
            status_code: entry.status_code,
            user_agent: entry.user_agent,
            referer: entry.referer,
        }
    }
}

/// 1-based page selector for listing log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Result<Self> {
        if number == 0 {
            return Err(StoreError::InvalidArgument(
                "page number starts at 1".to_string(),
            ));
        }
        if size == 0 {
            return Err(StoreError::InvalidArgument(
                "page size must be positive".to_string(),
            ));
        }
        Ok(Self { number, size })
    }

    /// Number of rows to skip before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }
}

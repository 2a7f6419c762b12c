//! Remote ServerQuery control protocol.
//!
//! # Data Flow
//! ```text
//! reload / http handlers
//!     → ServerQuery trait (injectable; faked in tests)
//!     → session.rs (single actor task owning the TCP connection)
//!     → codec.rs (escape values, render commands, parse replies)
//!     → voice server query port
//! ```
//!
//! # Design Decisions
//! - The live connection is an explicitly owned handle, never a global
//! - The client list is fetched fresh on every call, never cached
//! - Commands are serialized by the actor; callers never share a lock

pub mod codec;
pub mod session;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use self::codec::Record;

pub use session::QuerySession;

/// Connection id of a client on the virtual server (`clid`).
pub type ClientId = u32;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("query connection closed")]
    Closed,

    #[error("query server error {id}: {message}")]
    Server { id: u32, message: String },

    #[error("malformed query reply: {0}")]
    Malformed(String),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),
}

impl QueryError {
    /// Errors after which the connection can no longer be trusted.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, QueryError::Io(_) | QueryError::Closed | QueryError::Timeout(_))
    }
}

pub type QueryResult<T> = Result<T, QueryError>;

/// `client_type` as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientKind {
    /// A regular voice client.
    Voice,
    /// A query connection (bots and controllers).
    Query,
}

impl ClientKind {
    fn from_code(code: u8) -> Self {
        match code {
            1 => ClientKind::Query,
            _ => ClientKind::Voice,
        }
    }
}

/// `targetmode` of a text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTarget {
    Client = 1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEntry {
    pub clid: ClientId,
    pub cid: u32,
    pub database_id: u64,
    pub nickname: String,
    pub kind: ClientKind,
}

impl TryFrom<&Record> for ClientEntry {
    type Error = QueryError;

    fn try_from(record: &Record) -> QueryResult<Self> {
        Ok(Self {
            clid: record.parse("clid")?,
            cid: record.parse_or("cid", 0)?,
            database_id: record.parse_or("client_database_id", 0)?,
            nickname: record.get("client_nickname").unwrap_or_default().to_string(),
            kind: ClientKind::from_code(record.parse_or("client_type", 0)?),
        })
    }
}

/// Identity of the query session itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoAmI {
    pub client_id: ClientId,
    pub channel_id: u32,
    pub nickname: String,
}

impl TryFrom<&Record> for WhoAmI {
    type Error = QueryError;

    fn try_from(record: &Record) -> QueryResult<Self> {
        Ok(Self {
            client_id: record.parse("client_id")?,
            channel_id: record.parse_or("client_channel_id", 0)?,
            nickname: record.get("client_nickname").unwrap_or_default().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelEntry {
    pub cid: u32,
    pub pid: u32,
    pub name: String,
}

impl TryFrom<&Record> for ChannelEntry {
    type Error = QueryError;

    fn try_from(record: &Record) -> QueryResult<Self> {
        Ok(Self {
            cid: record.parse("cid")?,
            pid: record.parse_or("pid", 0)?,
            name: record.get("channel_name").unwrap_or_default().to_string(),
        })
    }
}

/// A server group or channel group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub id: u32,
    pub name: String,
    pub icon_id: i64,
    pub group_type: u8,
    pub sort_id: i64,
}

impl GroupEntry {
    fn from_record(record: &Record, id_key: &str) -> QueryResult<Self> {
        Ok(Self {
            id: record.parse(id_key)?,
            name: record.get("name").unwrap_or_default().to_string(),
            icon_id: record.parse_or("iconid", 0)?,
            group_type: record.parse_or("type", 0)?,
            sort_id: record.parse_or("sortid", 0)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMatch {
    pub clid: ClientId,
    pub nickname: String,
}

impl TryFrom<&Record> for ClientMatch {
    type Error = QueryError;

    fn try_from(record: &Record) -> QueryResult<Self> {
        Ok(Self {
            clid: record.parse("clid")?,
            nickname: record.get("client_nickname").unwrap_or_default().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub unique_identifier: String,
    pub database_id: u64,
    pub nickname: String,
}

impl TryFrom<&Record> for ClientInfo {
    type Error = QueryError;

    fn try_from(record: &Record) -> QueryResult<Self> {
        Ok(Self {
            unique_identifier: record.require("client_unique_identifier")?.to_string(),
            database_id: record.parse("client_database_id")?,
            nickname: record.get("client_nickname").unwrap_or_default().to_string(),
        })
    }
}

/// Operations the control surface needs from the remote query session.
#[async_trait]
pub trait ServerQuery: Send + Sync {
    /// Currently connected clients of the given kind.
    async fn client_list(&self, kind: ClientKind) -> QueryResult<Vec<ClientEntry>>;

    async fn whoami(&self) -> QueryResult<WhoAmI>;

    /// Fire-and-forget text message. Success means the server accepted it.
    async fn send_text_message(&self, mode: TextTarget, target: u32, message: &str) -> QueryResult<()>;

    async fn channel_list(&self) -> QueryResult<Vec<ChannelEntry>>;

    async fn server_group_list(&self) -> QueryResult<Vec<GroupEntry>>;

    async fn channel_group_list(&self) -> QueryResult<Vec<GroupEntry>>;

    /// Clients whose nickname matches `pattern`.
    async fn client_find(&self, pattern: &str) -> QueryResult<Vec<ClientMatch>>;

    /// Details for one connected client, `None` if it is gone.
    async fn client_info(&self, clid: ClientId) -> QueryResult<Option<ClientInfo>>;
}

pub(crate) fn decode_all<'a, T>(records: &'a [Record]) -> QueryResult<Vec<T>>
where
    T: TryFrom<&'a Record, Error = QueryError>,
{
    records.iter().map(T::try_from).collect()
}

pub(crate) fn decode_groups(records: &[Record], id_key: &str) -> QueryResult<Vec<GroupEntry>> {
    records
        .iter()
        .map(|record| GroupEntry::from_record(record, id_key))
        .collect()
}

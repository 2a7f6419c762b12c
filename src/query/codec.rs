//! ServerQuery line codec.
//!
//! # Wire Format
//! ```text
//! request:  command key=value key=value -flag\n
//! reply:    key=value key=value|key=value ...\n\r     (zero or more data lines)
//!           error id=0 msg=ok\n\r                   (status, always last)
//! ```
//! Values are escaped so they never contain a space, `|` or a control
//! character.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::query::{QueryError, QueryResult};

/// Status id for "database empty result set".
pub const EMPTY_RESULT_SET: u32 = 1281;

/// Status id for "invalid clientID".
pub const INVALID_CLIENT_ID: u32 = 512;

pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            ' ' => out.push_str("\\s"),
            '|' => out.push_str("\\p"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0c' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0b' => out.push_str("\\v"),
            c => out.push(c),
        }
    }
    out
}

pub fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('s') => out.push(' '),
            Some('p') => out.push('|'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\x0b'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// A command line ready to be written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    params: Vec<(String, String)>,
}

impl Command {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Vec::new(),
        }
    }

    pub fn arg(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (key, value) in &self.params {
            write!(f, " {}={}", key, escape(value))?;
        }
        Ok(())
    }
}

/// One `key=value` group from a reply line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record(HashMap<String, String>);

impl Record {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> QueryResult<&str> {
        self.get(key)
            .ok_or_else(|| QueryError::Malformed(format!("missing field '{}'", key)))
    }

    pub fn parse<T: FromStr>(&self, key: &str) -> QueryResult<T> {
        let raw = self.require(key)?;
        raw.parse()
            .map_err(|_| QueryError::Malformed(format!("field '{}' has invalid value '{}'", key, raw)))
    }

    /// Parse an optional numeric field, falling back when absent.
    pub fn parse_or<T: FromStr>(&self, key: &str, default: T) -> QueryResult<T> {
        match self.get(key) {
            Some(_) => self.parse(key),
            None => Ok(default),
        }
    }
}

impl FromIterator<(String, String)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Record(iter.into_iter().collect())
    }
}

/// Split a data line into records.
pub fn parse_records(line: &str) -> Vec<Record> {
    line.split('|').map(parse_record).collect()
}

fn parse_record(chunk: &str) -> Record {
    chunk
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(|token| match token.split_once('=') {
            Some((key, value)) => (key.to_string(), unescape(value)),
            None => (token.to_string(), String::new()),
        })
        .collect()
}

/// The terminating `error id=.. msg=..` line of a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub id: u32,
    pub message: String,
}

impl Status {
    /// Returns `Ok(None)` when `line` is a data line rather than a status.
    pub fn parse(line: &str) -> QueryResult<Option<Status>> {
        let Some(rest) = line.strip_prefix("error ") else {
            return Ok(None);
        };
        let record = parse_record(rest);
        Ok(Some(Status {
            id: record.parse("id")?,
            message: record.get("msg").unwrap_or_default().to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_special_characters() {
        assert_eq!(escape("!reload command_help"), "!reload\\scommand_help");
        assert_eq!(escape("a|b/c\\d"), "a\\pb\\/c\\\\d");
        assert_eq!(escape("line\nbreak\ttab"), "line\\nbreak\\ttab");
    }

    #[test]
    fn test_unescape_inverts_escape() {
        let original = "Server Admin | group/sub \\ path";
        assert_eq!(unescape(&escape(original)), original);
        assert_eq!(unescape("trailing\\"), "trailing\\");
        assert_eq!(unescape("unknown\\q"), "unknown\\q");
    }

    #[test]
    fn test_command_rendering() {
        let command = Command::new("sendtextmessage")
            .arg("targetmode", 1)
            .arg("target", 5)
            .arg("msg", "!reload do_task");
        assert_eq!(
            command.to_string(),
            "sendtextmessage targetmode=1 target=5 msg=!reload\\sdo_task"
        );
    }

    #[test]
    fn test_parse_client_list_line() {
        let line = "clid=1 cid=1 client_database_id=1 client_nickname=Control\\sBot client_type=1\
                    |clid=7 cid=3 client_database_id=9 client_nickname=Alice client_type=0";
        let records = parse_records(line);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("client_nickname"), Some("Control Bot"));
        assert_eq!(records[1].parse::<u32>("clid").unwrap(), 7);
        assert!(records[1].parse::<u32>("client_nickname").is_err());
        assert!(records[1].require("missing").is_err());
    }

    #[test]
    fn test_value_less_token() {
        let records = parse_records("virtualserver_id=1 -flag");
        assert_eq!(records[0].get("-flag"), Some(""));
    }

    #[test]
    fn test_status_line() {
        let status = Status::parse("error id=0 msg=ok").unwrap().unwrap();
        assert_eq!(status.id, 0);

        let status = Status::parse("error id=1281 msg=database\\sempty\\sresult\\sset")
            .unwrap()
            .unwrap();
        assert_eq!(status.id, EMPTY_RESULT_SET);
        assert_eq!(status.message, "database empty result set");

        assert_eq!(Status::parse("clid=1 cid=2").unwrap(), None);
        assert!(Status::parse("error msg=nope").is_err());
    }
}

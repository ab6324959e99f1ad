//! src/sql.rs
//!
//! Typed access to SQL statement parameters and the row projections the
//! exporters work from. The backup stores each database row as an
//! `INSERT INTO <table> VALUES (?, ...)` statement with positional
//! parameters; the projections here pick fields out by column index.

use std::fmt;

use crate::proto::{SqlParameter, SqlStatement};

/// A bound parameter value. `Null` both for explicit null markers and for
/// parameters with no field set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValue<'a> {
    String(&'a str),
    Integer(u64),
    Double(f64),
    Blob(&'a [u8]),
    Null,
}

impl SqlParameter {
    pub fn value(&self) -> ParameterValue<'_> {
        if let Some(s) = &self.string_parameter {
            ParameterValue::String(s)
        } else if let Some(i) = self.integer_parameter {
            ParameterValue::Integer(i)
        } else if let Some(d) = self.double_parameter {
            ParameterValue::Double(d)
        } else if let Some(b) = &self.blob_parameter {
            ParameterValue::Blob(b)
        } else {
            ParameterValue::Null
        }
    }
}

impl fmt::Display for ParameterValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            ParameterValue::Integer(i) => write!(f, "{i}"),
            ParameterValue::Double(d) => write!(f, "{d}"),
            ParameterValue::Blob(b) => {
                write!(f, "X'")?;
                for byte in *b {
                    write!(f, "{byte:02x}")?;
                }
                write!(f, "'")
            }
            ParameterValue::Null => write!(f, "NULL"),
        }
    }
}

impl SqlStatement {
    /// Statement text, empty if absent.
    pub fn sql(&self) -> &str {
        self.statement.as_deref().unwrap_or_default()
    }

    /// True if this statement inserts into `table`.
    pub fn inserts_into(&self, table: &str) -> bool {
        let sql = self.sql();
        sql.strip_prefix("INSERT INTO ")
            .map(|rest| {
                rest.starts_with(table)
                    && rest[table.len()..]
                        .chars()
                        .next()
                        .map_or(true, |c| !c.is_alphanumeric() && c != '_')
            })
            .unwrap_or(false)
    }

    fn int_at(&self, index: usize) -> Option<u64> {
        self.parameters.get(index)?.integer_parameter
    }

    fn string_at(&self, index: usize) -> Option<&str> {
        self.parameters.get(index)?.string_parameter.as_deref()
    }

    /// String view of a parameter that may be stored as text or integer
    /// depending on the schema generation (e.g. recipient addresses).
    fn text_at(&self, index: usize) -> Option<String> {
        let p = self.parameters.get(index)?;
        match p.value() {
            ParameterValue::String(s) => Some(s.to_owned()),
            ParameterValue::Integer(i) => Some(i.to_string()),
            _ => None,
        }
    }
}

/// Flattens a statement's parameters fairly literally into strings.
/// Null, double and blob parameters are left empty, like the columns of a
/// spreadsheet export.
pub fn statement_to_string_array(statement: &SqlStatement) -> Vec<String> {
    statement
        .parameters
        .iter()
        .map(|p| match p.value() {
            ParameterValue::Integer(i) => i.to_string(),
            ParameterValue::String(s) => s.to_owned(),
            _ => String::new(),
        })
        .collect()
}

/// Row of the `sms` table, by column position.
#[derive(Debug, Clone, Default)]
pub struct SmsRow {
    pub id: u64,
    pub thread_id: Option<u64>,
    pub address: Option<String>,
    pub person: Option<u64>,
    pub date_received: Option<u64>,
    pub date_sent: Option<u64>,
    pub protocol: u64,
    pub read: u64,
    pub status: u64,
    pub kind: Option<u64>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub service_center: Option<String>,
}

impl SmsRow {
    /// Columns 0..22 are stable across the schema generations this tool
    /// supports; statements with fewer parameters are not sms rows.
    pub fn from_statement(statement: &SqlStatement) -> Option<Self> {
        if statement.parameters.len() < 22 {
            return None;
        }
        Some(Self {
            id: statement.int_at(0).unwrap_or(0),
            thread_id: statement.int_at(1),
            address: statement.text_at(2),
            person: statement.int_at(4),
            date_received: statement.int_at(5),
            date_sent: statement.int_at(6),
            protocol: statement.int_at(7).unwrap_or(0),
            read: statement.int_at(8).unwrap_or(0),
            status: statement.int_at(9).unwrap_or(0),
            kind: statement.int_at(10),
            subject: statement.string_at(13).map(str::to_owned),
            body: statement.string_at(14).map(str::to_owned),
            service_center: statement.string_at(16).map(str::to_owned),
        })
    }
}

/// Row of the `mms` table, by column position.
#[derive(Debug, Clone, Default)]
pub struct MmsRow {
    pub id: u64,
    pub thread_id: Option<u64>,
    pub date_sent: Option<u64>,
    pub date_received: Option<u64>,
    pub msg_box: Option<u64>,
    pub read: u64,
    pub message_id: Option<String>,
    pub subject: Option<String>,
    pub subject_charset: Option<u64>,
    pub body: Option<String>,
    pub content_type: Option<String>,
    pub content_location: Option<String>,
    pub address: Option<String>,
    pub message_class: Option<String>,
    pub message_type: Option<u64>,
    pub version: Option<u64>,
    pub message_size: Option<u64>,
    pub priority: Option<u64>,
    pub read_report: Option<u64>,
    pub report_allowed: Option<u64>,
    pub response_status: Option<u64>,
    pub retrieve_status: Option<u64>,
    pub retrieve_text: Option<String>,
    pub retrieve_text_charset: Option<u64>,
    pub read_status: Option<u64>,
    pub content_class: Option<u64>,
    pub response_text: Option<String>,
    pub delivery_time: Option<u64>,
    pub delivery_report: Option<u64>,
}

impl MmsRow {
    pub fn from_statement(statement: &SqlStatement) -> Option<Self> {
        if statement.parameters.len() < 42 {
            return None;
        }
        Some(Self {
            id: statement.int_at(0).unwrap_or(0),
            thread_id: statement.int_at(1),
            date_sent: statement.int_at(2),
            date_received: statement.int_at(3),
            msg_box: statement.int_at(4),
            read: statement.int_at(5).unwrap_or(0),
            message_id: statement.string_at(6).map(str::to_owned),
            subject: statement.string_at(7).map(str::to_owned),
            subject_charset: statement.int_at(8),
            body: statement.string_at(9).map(str::to_owned),
            content_type: statement.string_at(11).map(str::to_owned),
            content_location: statement.string_at(12).map(str::to_owned),
            address: statement.text_at(13),
            message_class: statement.string_at(16).map(str::to_owned),
            message_type: statement.int_at(17),
            version: statement.int_at(18),
            message_size: statement.int_at(19),
            priority: statement.int_at(20),
            read_report: statement.int_at(21),
            report_allowed: statement.int_at(22),
            response_status: statement.int_at(23),
            retrieve_status: statement.int_at(26),
            retrieve_text: statement.string_at(27).map(str::to_owned),
            retrieve_text_charset: statement.int_at(28),
            read_status: statement.int_at(29),
            content_class: statement.int_at(30),
            response_text: statement.string_at(31).map(str::to_owned),
            delivery_time: statement.int_at(32),
            delivery_report: statement.int_at(36),
        })
    }
}

/// Row of the `part` table: one MMS body part, usually pointing at an
/// attachment blob via `unique_id`.
#[derive(Debug, Clone, Default)]
pub struct PartRow {
    pub row_id: u64,
    pub mms_id: Option<u64>,
    pub seq: u64,
    pub content_type: Option<String>,
    pub name: Option<String>,
    pub charset: Option<u64>,
    pub content_disposition: Option<String>,
    pub file_name: Option<String>,
    pub content_id: Option<String>,
    pub content_location: Option<String>,
    pub size: Option<u64>,
    pub unique_id: u64,
}

impl PartRow {
    pub fn from_statement(statement: &SqlStatement) -> Option<Self> {
        if statement.parameters.len() < 25 {
            return None;
        }
        Some(Self {
            row_id: statement.int_at(0).unwrap_or(0),
            mms_id: statement.int_at(1),
            seq: statement.int_at(2).unwrap_or(0),
            content_type: statement.string_at(3).map(str::to_owned),
            name: statement.string_at(4).map(str::to_owned),
            charset: statement.int_at(5),
            content_disposition: statement.string_at(6).map(str::to_owned),
            file_name: statement.string_at(7).map(str::to_owned),
            content_id: statement.string_at(8).map(str::to_owned),
            content_location: statement.string_at(9).map(str::to_owned),
            size: statement.int_at(15),
            unique_id: statement.int_at(19).unwrap_or(0),
        })
    }
}

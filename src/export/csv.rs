//! src/export/csv.rs
//!
//! Flattens the insert statements of one table into comma-separated
//! values. Canonical header rows are emitted for the `sms` and `mms`
//! tables; any other table gets its bare values.

use std::io::{Read, Write};

use crate::proto::SqlStatement;
use crate::reader::walk::{Consumer, ConsumerResult};
use crate::sql::statement_to_string_array;

/// Column headers of the `sms` table.
pub const SMS_CSV_HEADERS: &[&str] = &[
    "ID",
    "THREAD_ID",
    "ADDRESS",
    "ADDRESS_DEVICE_ID",
    "PERSON",
    "DATE_RECEIVED",
    "DATE_SENT",
    "PROTOCOL",
    "READ",
    "STATUS",
    "TYPE",
    "REPLY_PATH_PRESENT",
    "DELIVERY_RECEIPT_COUNT",
    "SUBJECT",
    "BODY",
    "MISMATCHED_IDENTITIES",
    "SERVICE_CENTER",
    "SUBSCRIPTION_ID",
    "EXPIRES_IN",
    "EXPIRE_STARTED",
    "NOTIFIED",
    "READ_RECEIPT_COUNT",
    "UNIDENTIFIED",
];

/// Column headers of the `mms` table.
pub const MMS_CSV_HEADERS: &[&str] = &[
    "ID",
    "THREAD_ID",
    "DATE_SENT",
    "DATE_RECEIVED",
    "MESSAGE_BOX",
    "READ",
    "m_id",
    "sub",
    "sub_cs",
    "BODY",
    "PART_COUNT",
    "ct_t",
    "CONTENT_LOCATION",
    "ADDRESS",
    "ADDRESS_DEVICE_ID",
    "EXPIRY",
    "m_cls",
    "MESSAGE_TYPE",
    "v",
    "MESSAGE_SIZE",
    "pri",
    "rr",
    "rpt_a",
    "resp_st",
    "STATUS",
    "TRANSACTION_ID",
    "retr_st",
    "retr_txt",
    "retr_txt_cs",
    "read_status",
    "ct_cls",
    "resp_txt",
    "d_tm",
    "DELIVERY_RECEIPT_COUNT",
    "MISMATCHED_IDENTITIES",
    "NETWORK_FAILURE",
    "d_rpt",
    "SUBSCRIPTION_ID",
    "EXPIRES_IN",
    "EXPIRE_STARTED",
    "NOTIFIED",
    "READ_RECEIPT_COUNT",
    "QUOTE_ID",
    "QUOTE_AUTHOR",
    "QUOTE_BODY",
    "QUOTE_ATTACHMENT",
    "QUOTE_MISSING",
    "SHARED_CONTACTS",
    "UNIDENTIFIED",
    "LINK_PREVIEWS",
    "VIEW_ONCE",
];

pub struct CsvExporter<W: Write> {
    table: String,
    writer: csv::Writer<W>,
}

impl<W: Write> CsvExporter<W> {
    /// Create an exporter for `table`, writing the canonical header row if
    /// one is known for it.
    pub fn new(table: &str, out: W) -> csv::Result<Self> {
        let mut writer = csv::Writer::from_writer(out);
        let headers = match table {
            "sms" => Some(SMS_CSV_HEADERS),
            "mms" => Some(MMS_CSV_HEADERS),
            _ => None,
        };
        if let Some(headers) = headers {
            writer.write_record(headers)?;
        }
        Ok(Self {
            table: table.to_owned(),
            writer,
        })
    }

    pub fn finish(mut self) -> csv::Result<W> {
        self.writer.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}

impl<R: Read, W: Write> Consumer<R> for CsvExporter<W> {
    fn on_statement(&mut self, statement: &SqlStatement) -> ConsumerResult {
        if statement.inserts_into(&self.table) {
            self.writer
                .write_record(statement_to_string_array(statement))?;
        }
        Ok(())
    }
}

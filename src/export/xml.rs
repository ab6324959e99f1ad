//! src/export/xml.rs
//!
//! SMS Backup & Restore compatible XML report. The document layout is
//! described at <http://synctech.com.au/fields-in-xml-backup-files/>:
//! a `<smses>` root holding `<sms/>` records and `<mms>` records whose
//! `<part/>` children carry base64-encoded attachment bodies.
//!
//! Assembly is two-phase, because parts and attachment blobs arrive in the
//! stream long before (or after) the mms rows that own them: the walk
//! collects rows and bodies, `finish` joins and writes them.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use tracing::debug;

use crate::error::ConsumerError;
use crate::proto::{Attachment, SqlStatement};
use crate::reader::walk::{Blob, Consumer, ConsumerResult};
use crate::sql::{MmsRow, PartRow, SmsRow};

/// MIB enum value for UTF-8, used in part `chset` attributes.
const CHARSET_UTF8: u64 = 106;

/// `m_type` of an MMS delivered to this device (retrieve-conf).
const MMS_RETRIEVE_CONF: u64 = 132;

struct AttachmentBody {
    size: u64,
    base64: String,
}

/// One `<part/>` element: the projected row plus whichever body it ends up
/// with (base64 `data` for attachments, inline `text` for the message
/// body).
struct XmlPart {
    row: PartRow,
    data: Option<String>,
    text: Option<String>,
}

#[derive(Default)]
pub struct XmlExporter {
    smses: Vec<SmsRow>,
    mmses: BTreeMap<u64, MmsRow>,
    parts: BTreeMap<u64, Vec<PartRow>>,
    attachments: BTreeMap<u64, AttachmentBody>,
}

impl XmlExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the assembled document. Consumes the exporter; call after the
    /// walk has completed.
    pub fn finish<W: Write>(mut self, out: &mut W) -> Result<(), ConsumerError> {
        out.write_all(b"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>\n")?;
        out.write_all(b"<?xml-stylesheet type=\"text/xsl\" href=\"sms.xsl\" ?>\n")?;

        let mut writer = Writer::new_with_indent(&mut *out, b' ', 2);

        let mut root = BytesStart::new("smses");
        root.push_attribute(("count", self.smses.len().to_string().as_str()));
        writer.write_event(Event::Start(root))?;

        for sms in &self.smses {
            writer.write_event(Event::Empty(sms_element(sms)))?;
        }

        let mmses = std::mem::take(&mut self.mmses);
        for (id, mms) in &mmses {
            let mut message_size: u64 = 0;
            let mut parts: Vec<XmlPart> = self
                .parts
                .remove(id)
                .unwrap_or_default()
                .into_iter()
                .map(|row| {
                    let data = self.attachments.get(&row.unique_id).map(|body| {
                        message_size += body.size;
                        body.base64.clone()
                    });
                    XmlPart {
                        row,
                        data,
                        text: None,
                    }
                })
                .collect();

            if let Some(body) = mms.body.as_deref().filter(|b| !b.is_empty()) {
                message_size += body.len() as u64;
                parts.push(text_part(*id, body));
            }
            if parts.is_empty() {
                continue;
            }
            let text_only = parts.len() == 1 && parts[0].text.is_some();

            writer.write_event(Event::Start(mms_element(mms, message_size, text_only)))?;
            writer.write_event(Event::Start(BytesStart::new("parts")))?;
            for part in &parts {
                writer.write_event(Event::Empty(part_element(part)))?;
            }
            writer.write_event(Event::End(BytesEnd::new("parts")))?;
            writer.write_event(Event::End(BytesEnd::new("mms")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("smses")))?;
        out.write_all(b"\n")?;
        Ok(())
    }
}

fn opt_attr(element: &mut BytesStart<'_>, name: &str, value: Option<&str>) {
    element.push_attribute((name, value.unwrap_or("null")));
}

/// Integer columns the document schema types as strings render "null"
/// when the row holds no value.
fn opt_num_attr(element: &mut BytesStart<'_>, name: &str, value: Option<u64>) {
    match value {
        Some(v) => element.push_attribute((name, v.to_string().as_str())),
        None => element.push_attribute((name, "null")),
    }
}

fn sms_element(sms: &SmsRow) -> BytesStart<'static> {
    let mut e = BytesStart::new("sms");
    e.push_attribute(("protocol", sms.protocol.to_string().as_str()));
    e.push_attribute(("address", sms.address.as_deref().unwrap_or_default()));
    e.push_attribute(("date", sms.date_received.unwrap_or(0).to_string().as_str()));
    e.push_attribute(("type", sms.kind.unwrap_or(1).to_string().as_str()));
    opt_attr(&mut e, "subject", sms.subject.as_deref());
    e.push_attribute(("body", sms.body.as_deref().unwrap_or_default()));
    e.push_attribute(("toa", "null"));
    e.push_attribute(("sc_toa", "null"));
    opt_attr(&mut e, "service_center", sms.service_center.as_deref());
    e.push_attribute(("read", sms.read.to_string().as_str()));
    e.push_attribute(("status", sms.status.to_string().as_str()));
    e.push_attribute(("locked", "0"));
    e.push_attribute(("date_sent", sms.date_sent.unwrap_or(0).to_string().as_str()));
    e
}

fn mms_element(mms: &MmsRow, message_size: u64, text_only: bool) -> BytesStart<'static> {
    let mut e = BytesStart::new("mms");
    if text_only {
        e.push_attribute(("text_only", "1"));
    }
    opt_attr(&mut e, "sub", mms.subject.as_deref());
    opt_num_attr(&mut e, "retr_st", mms.retrieve_status);
    e.push_attribute(("date", mms.date_received.unwrap_or(0).to_string().as_str()));
    opt_num_attr(&mut e, "ct_cls", mms.content_class);
    opt_num_attr(&mut e, "sub_cs", mms.subject_charset);
    e.push_attribute(("read", mms.read.to_string().as_str()));
    opt_attr(&mut e, "ct_l", mms.content_location.as_deref());
    e.push_attribute(("msg_box", mms.msg_box.unwrap_or(1).to_string().as_str()));
    e.push_attribute(("address", mms.address.as_deref().unwrap_or_default()));
    opt_attr(&mut e, "m_cls", mms.message_class.as_deref());
    opt_num_attr(&mut e, "d_tm", mms.delivery_time);
    opt_num_attr(&mut e, "read_status", mms.read_status);
    opt_attr(&mut e, "ct_t", mms.content_type.as_deref());
    opt_num_attr(&mut e, "retr_txt_cs", mms.retrieve_text_charset);
    e.push_attribute(("d_rpt", mms.delivery_report.unwrap_or(0).to_string().as_str()));
    opt_attr(&mut e, "m_id", mms.message_id.as_deref());
    e.push_attribute(("date_sent", mms.date_sent.unwrap_or(0).to_string().as_str()));
    e.push_attribute((
        "m_type",
        mms.message_type.unwrap_or(MMS_RETRIEVE_CONF).to_string().as_str(),
    ));
    e.push_attribute(("v", mms.version.unwrap_or(0).to_string().as_str()));
    e.push_attribute(("pri", mms.priority.unwrap_or(0).to_string().as_str()));
    e.push_attribute(("rr", mms.read_report.unwrap_or(0).to_string().as_str()));
    opt_attr(&mut e, "resp_txt", mms.response_text.as_deref());
    opt_num_attr(&mut e, "rpt_a", mms.report_allowed);
    opt_attr(&mut e, "retr_txt", mms.retrieve_text.as_deref());
    opt_num_attr(&mut e, "resp_st", mms.response_status);
    e.push_attribute(("m_size", message_size.to_string().as_str()));
    e
}

fn part_element(part: &XmlPart) -> BytesStart<'static> {
    let row = &part.row;
    let mut e = BytesStart::new("part");
    e.push_attribute(("seq", row.seq.to_string().as_str()));
    opt_attr(&mut e, "ct", row.content_type.as_deref());
    opt_attr(&mut e, "name", row.name.as_deref());
    e.push_attribute((
        "chset",
        row.charset.unwrap_or(CHARSET_UTF8).to_string().as_str(),
    ));
    opt_attr(&mut e, "cd", row.content_disposition.as_deref());
    opt_attr(&mut e, "fn", row.file_name.as_deref());
    opt_attr(&mut e, "cid", row.content_id.as_deref());
    opt_attr(&mut e, "cl", row.content_location.as_deref());
    if let Some(text) = &part.text {
        e.push_attribute(("text", text.as_str()));
    }
    if let Some(data) = &part.data {
        e.push_attribute(("data", data.as_str()));
    }
    e
}

/// The mms body, rendered as the text/plain part restore tools expect.
fn text_part(mms_id: u64, body: &str) -> XmlPart {
    XmlPart {
        row: PartRow {
            seq: 0,
            content_type: Some("text/plain".to_owned()),
            content_location: Some(format!("txt{mms_id:06}.txt")),
            charset: Some(CHARSET_UTF8),
            ..Default::default()
        },
        data: None,
        text: Some(body.to_owned()),
    }
}

impl<R: Read> Consumer<R> for XmlExporter {
    fn on_statement(&mut self, statement: &SqlStatement) -> ConsumerResult {
        if statement.inserts_into("sms") {
            if let Some(row) = SmsRow::from_statement(statement) {
                self.smses.push(row);
            }
        } else if statement.inserts_into("mms") {
            if let Some(row) = MmsRow::from_statement(statement) {
                self.mmses.insert(row.id, row);
            }
        } else if statement.inserts_into("part") {
            if let Some(row) = PartRow::from_statement(statement) {
                self.parts.entry(row.mms_id.unwrap_or(0)).or_default().push(row);
            }
        }
        Ok(())
    }

    fn on_attachment(&mut self, attachment: &Attachment, blob: &mut Blob<'_, R>) -> ConsumerResult {
        let id = attachment.attachment_id.or(attachment.row_id).unwrap_or(0);
        let mut plaintext = Vec::with_capacity(blob.len() as usize);
        blob.write_to(&mut plaintext)?;
        debug!(id, len = plaintext.len(), "embedding attachment");
        self.attachments.insert(
            id,
            AttachmentBody {
                size: plaintext.len() as u64,
                base64: BASE64.encode(&plaintext),
            },
        );
        Ok(())
    }
}

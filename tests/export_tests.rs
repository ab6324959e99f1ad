//! tests/export_tests.rs
//!
//! The projection consumers, driven end-to-end over encoder fixtures.

mod harness;

use harness::{int_param, string_param, Encoder, PASSWORD};
use msgback_rs::export::{AttachmentExtractor, CsvExporter, RawDumper, XmlExporter};
use msgback_rs::proto::SqlParameter;
use msgback_rs::BackupReader;
use std::io::Cursor;

fn open_fixture(bytes: Vec<u8>) -> BackupReader<Cursor<Vec<u8>>> {
    let size = bytes.len() as u64;
    BackupReader::from_source(Cursor::new(bytes), size, PASSWORD).unwrap()
}

fn null_param() -> SqlParameter {
    SqlParameter {
        null_parameter: Some(true),
        ..Default::default()
    }
}

/// sms row with the columns the exporters read populated.
fn sms_statement(id: u64, address: &str, body: &str) -> (String, Vec<SqlParameter>) {
    let mut parameters = vec![null_param(); 23];
    parameters[0] = int_param(id);
    parameters[1] = int_param(1); // thread
    parameters[2] = string_param(address);
    parameters[5] = int_param(1_500_000_000_000); // date received
    parameters[8] = int_param(1); // read
    parameters[10] = int_param(1); // type: received
    parameters[14] = string_param(body);
    ("INSERT INTO sms VALUES (?)".to_owned(), parameters)
}

#[test]
fn csv_export_flattens_matching_inserts() {
    let mut encoder = Encoder::new();
    let (sql, params) = sms_statement(1, "+61400000000", "hello");
    encoder.push_statement(&sql, params);
    encoder.push_statement("INSERT INTO part VALUES (?)", vec![int_param(9)]);
    encoder.push_end();

    let mut out = Vec::new();
    let mut reader = open_fixture(encoder.into_bytes());
    let mut exporter = CsvExporter::new("sms", &mut out).unwrap();
    reader.walk(&mut exporter).unwrap();
    exporter.finish().unwrap();

    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("ID,THREAD_ID,ADDRESS"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("1,1,+61400000000"));
    assert!(row.contains("hello"));
    assert_eq!(lines.next(), None, "part inserts must be filtered out");
}

#[test]
fn raw_dump_renders_statements_with_parameters() {
    let mut encoder = Encoder::new();
    encoder.push_statement(
        "INSERT INTO sms VALUES(?,?)",
        vec![int_param(1), string_param("it's")],
    );
    encoder.push_end();

    let mut out = Vec::new();
    let mut reader = open_fixture(encoder.into_bytes());
    let mut dumper = RawDumper::new(&mut out);
    reader.walk(&mut dumper).unwrap();

    let text = String::from_utf8(out).unwrap();
    assert_eq!(text, "INSERT INTO sms VALUES(?,?) -- 1, 'it''s'\n");
}

#[test]
fn xml_export_contains_sms_attributes() {
    let mut encoder = Encoder::new();
    let (sql, params) = sms_statement(1, "+61400000000", "hi <there> & \"friends\"");
    encoder.push_statement(&sql, params);
    encoder.push_end();

    let mut reader = open_fixture(encoder.into_bytes());
    let mut exporter = XmlExporter::new();
    reader.walk(&mut exporter).unwrap();

    let mut out = Vec::new();
    exporter.finish(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.starts_with("<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>"));
    assert!(text.contains("<smses count=\"1\""));
    assert!(text.contains("address=\"+61400000000\""));
    assert!(text.contains("type=\"1\""));
    // markup characters in bodies must be escaped
    assert!(!text.contains("body=\"hi <there>"));
    assert!(text.contains("&lt;there&gt;"));
}

#[test]
fn xml_export_embeds_attachment_parts_as_base64() {
    let attachment_unique_id = 77u64;
    let payload = b"binary attachment body";

    let mut encoder = Encoder::new();
    // mms row 5 with an empty body
    let mut mms_params = vec![null_param(); 42];
    mms_params[0] = int_param(5);
    mms_params[3] = int_param(1_500_000_000_000);
    mms_params[4] = int_param(1);
    mms_params[8] = int_param(106); // sub_cs
    mms_params[13] = string_param("+61400000000");
    mms_params[16] = string_param("personal"); // m_cls
    mms_params[18] = int_param(18); // v
    encoder.push_statement("INSERT INTO mms VALUES (?)", mms_params);

    // part row pointing at the attachment via unique_id (column 19)
    let mut part_params = vec![null_param(); 25];
    part_params[0] = int_param(1);
    part_params[1] = int_param(5); // mms id
    part_params[3] = string_param("image/png");
    part_params[19] = int_param(attachment_unique_id);
    encoder.push_statement("INSERT INTO part VALUES (?)", part_params);

    encoder.push_attachment(attachment_unique_id, payload);
    encoder.push_end();

    let mut reader = open_fixture(encoder.into_bytes());
    let mut exporter = XmlExporter::new();
    reader.walk(&mut exporter).unwrap();

    let mut out = Vec::new();
    exporter.finish(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    let expected = STANDARD.encode(payload);
    assert!(text.contains("<mms"));
    assert!(text.contains("ct=\"image/png\""));
    assert!(text.contains(&format!("data=\"{expected}\"")));
    assert!(text.contains(&format!("m_size=\"{}\"", payload.len())));
    // row columns carried through to the record attributes
    assert!(text.contains("sub_cs=\"106\""));
    assert!(text.contains("m_cls=\"personal\""));
    assert!(text.contains("v=\"18\""));
    // columns the row leaves NULL render the schema's "null" marker
    assert!(text.contains("retr_st=\"null\""));
    assert!(text.contains("resp_st=\"null\""));
}

#[test]
fn extractor_writes_files_with_learned_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let mut encoder = Encoder::new();

    // part row teaching the content type of attachment 11
    let mut part_params = vec![null_param(); 25];
    part_params[0] = int_param(1);
    part_params[3] = string_param("image/jpeg");
    part_params[19] = int_param(11);
    encoder.push_statement("INSERT INTO part VALUES (?)", part_params);

    encoder.push_attachment(11, b"\xff\xd8\xff\xe0 not really a jpeg");
    // PNG magic so sniffing has something to find for the unknown one
    encoder.push_attachment(12, b"\x89PNG\r\n\x1a\n rest of a png");
    encoder.push_avatar("alice", b"avatar-bytes");
    encoder.push_end();

    let mut reader = open_fixture(encoder.into_bytes());
    let mut extractor = AttachmentExtractor::new(dir.path());
    reader.walk(&mut extractor).unwrap();

    assert_eq!(extractor.written(), 3);
    assert!(dir.path().join("11.jpg").exists(), "extension from part row");
    assert!(dir.path().join("12.png").exists(), "extension from sniffing");
    let avatar = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.file_name().to_string_lossy().starts_with("avatar-alice"));
    assert!(avatar.is_some());
}

// src/export/mod.rs

//! Projection consumers over the decoded record stream: file extraction,
//! XML report, CSV flattening and the raw statement dump. Each is a
//! [`Consumer`](crate::reader::walk::Consumer) driven by
//! [`BackupReader::walk`](crate::reader::BackupReader::walk).

pub mod csv;
pub mod extract;
pub mod raw;
pub mod xml;

pub use csv::CsvExporter;
pub use extract::AttachmentExtractor;
pub use raw::RawDumper;
pub use xml::XmlExporter;

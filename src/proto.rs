//! src/proto.rs
//!
//! On-wire record schema of the backup container. Field tags are normative;
//! the structs are annotated by hand so no protobuf toolchain is needed at
//! build time.

/// First record of every backup, stored in plaintext. Carries the CTR seed
/// and the KDF salt.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Header {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub iv: ::core::option::Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub salt: ::core::option::Option<Vec<u8>>,
}

/// One SQL statement with its bound parameters.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SqlStatement {
    #[prost(string, optional, tag = "1")]
    pub statement: ::core::option::Option<String>,
    #[prost(message, repeated, tag = "2")]
    pub parameters: Vec<SqlParameter>,
}

/// A single bound parameter; exactly one field is set per value, `null`
/// values set none.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SqlParameter {
    #[prost(string, optional, tag = "1")]
    pub string_parameter: ::core::option::Option<String>,
    #[prost(uint64, optional, tag = "2")]
    pub integer_parameter: ::core::option::Option<u64>,
    #[prost(double, optional, tag = "3")]
    pub double_parameter: ::core::option::Option<f64>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub blob_parameter: ::core::option::Option<Vec<u8>>,
    #[prost(bool, optional, tag = "5")]
    pub null_parameter: ::core::option::Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SharedPreference {
    #[prost(string, optional, tag = "1")]
    pub file: ::core::option::Option<String>,
    #[prost(string, optional, tag = "2")]
    pub key: ::core::option::Option<String>,
    #[prost(string, optional, tag = "3")]
    pub value: ::core::option::Option<String>,
}

/// Describes an attachment whose ciphertext blob follows this frame.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Attachment {
    #[prost(uint64, optional, tag = "1")]
    pub row_id: ::core::option::Option<u64>,
    #[prost(uint64, optional, tag = "2")]
    pub attachment_id: ::core::option::Option<u64>,
    #[prost(uint32, optional, tag = "3")]
    pub length: ::core::option::Option<u32>,
}

/// Describes an avatar whose ciphertext blob follows this frame.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Avatar {
    #[prost(string, optional, tag = "1")]
    pub name: ::core::option::Option<String>,
    #[prost(uint32, optional, tag = "2")]
    pub length: ::core::option::Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DatabaseVersion {
    #[prost(uint32, optional, tag = "1")]
    pub version: ::core::option::Option<u32>,
}

/// The backup container record: a sum type encoded as a message with at
/// most one populated field. Use [`BackupFrame::record`] to match on it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BackupFrame {
    #[prost(message, optional, tag = "1")]
    pub header: ::core::option::Option<Header>,
    #[prost(message, optional, tag = "2")]
    pub statement: ::core::option::Option<SqlStatement>,
    #[prost(message, optional, tag = "3")]
    pub preference: ::core::option::Option<SharedPreference>,
    #[prost(message, optional, tag = "4")]
    pub attachment: ::core::option::Option<Attachment>,
    #[prost(message, optional, tag = "5")]
    pub version: ::core::option::Option<DatabaseVersion>,
    #[prost(bool, optional, tag = "6")]
    pub end: ::core::option::Option<bool>,
    #[prost(message, optional, tag = "7")]
    pub avatar: ::core::option::Option<Avatar>,
}

/// Borrowed view of a [`BackupFrame`] as a proper tagged union.
#[derive(Debug, Clone, Copy)]
pub enum Record<'a> {
    Header(&'a Header),
    Statement(&'a SqlStatement),
    Preference(&'a SharedPreference),
    Attachment(&'a Attachment),
    Version(&'a DatabaseVersion),
    Avatar(&'a Avatar),
    /// Terminating marker record; carries no payload.
    End,
    /// A frame with no recognised field set. Passed through untouched.
    Empty,
}

impl BackupFrame {
    /// Projects the message onto its record variant. Field order follows
    /// the tag order, so a (malformed) frame with several fields set
    /// resolves to the lowest tag.
    pub fn record(&self) -> Record<'_> {
        if let Some(h) = &self.header {
            Record::Header(h)
        } else if let Some(s) = &self.statement {
            Record::Statement(s)
        } else if let Some(p) = &self.preference {
            Record::Preference(p)
        } else if let Some(a) = &self.attachment {
            Record::Attachment(a)
        } else if let Some(v) = &self.version {
            Record::Version(v)
        } else if self.end.unwrap_or(false) {
            Record::End
        } else if let Some(a) = &self.avatar {
            Record::Avatar(a)
        } else {
            Record::Empty
        }
    }
}

impl Record<'_> {
    /// Short name of the variant, used in logs and consumer errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Header(_) => "header",
            Record::Statement(_) => "statement",
            Record::Preference(_) => "preference",
            Record::Attachment(_) => "attachment",
            Record::Version(_) => "version",
            Record::Avatar(_) => "avatar",
            Record::End => "end",
            Record::Empty => "empty",
        }
    }
}

impl Attachment {
    /// Declared length of the ciphertext blob following this frame.
    pub fn blob_len(&self) -> u32 {
        self.length.unwrap_or(0)
    }
}

impl Avatar {
    /// Declared length of the ciphertext blob following this frame.
    pub fn blob_len(&self) -> u32 {
        self.length.unwrap_or(0)
    }
}

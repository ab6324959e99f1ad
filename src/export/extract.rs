//! src/export/extract.rs
//!
//! Writes attachment and avatar blobs out as files. Content types are
//! learned from the `part` table rows seen during the walk; blobs whose
//! rows never name a type are sniffed from their decrypted bytes instead.

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::proto::{Attachment, Avatar, SqlStatement};
use crate::reader::walk::{Blob, Consumer, ConsumerResult};
use crate::sql::PartRow;

pub struct AttachmentExtractor {
    dir: PathBuf,
    content_types: HashMap<u64, String>,
    written: u64,
}

impl AttachmentExtractor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            content_types: HashMap::new(),
            written: 0,
        }
    }

    /// Number of files written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn write_file(&mut self, stem: &str, mime: Option<&str>, plaintext: &[u8]) -> ConsumerResult {
        let extension = mime
            .and_then(extension_for_mime)
            .or_else(|| infer::get(plaintext).map(|kind| kind.extension()));

        let file_name = match extension {
            Some(ext) => format!("{stem}.{ext}"),
            None => {
                warn!(stem, mime, "no known content type; writing without extension");
                stem.to_owned()
            }
        };
        std::fs::write(self.dir.join(&file_name), plaintext)?;
        debug!(file = file_name, len = plaintext.len(), "wrote blob");
        self.written += 1;
        Ok(())
    }
}

impl<R: Read> Consumer<R> for AttachmentExtractor {
    fn on_statement(&mut self, statement: &SqlStatement) -> ConsumerResult {
        if statement.inserts_into("part") {
            if let Some(row) = PartRow::from_statement(statement) {
                if let Some(content_type) = row.content_type {
                    self.content_types.insert(row.unique_id, content_type);
                }
            }
        }
        Ok(())
    }

    fn on_attachment(&mut self, attachment: &Attachment, blob: &mut Blob<'_, R>) -> ConsumerResult {
        let id = attachment.attachment_id.or(attachment.row_id).unwrap_or(0);
        let mut plaintext = Vec::with_capacity(blob.len() as usize);
        blob.write_to(&mut plaintext)?;

        let mime = self.content_types.get(&id).cloned();
        self.write_file(&id.to_string(), mime.as_deref(), &plaintext)
    }

    fn on_avatar(&mut self, avatar: &Avatar, blob: &mut Blob<'_, R>) -> ConsumerResult {
        let mut plaintext = Vec::with_capacity(blob.len() as usize);
        blob.write_to(&mut plaintext)?;

        let stem = format!("avatar-{}", sanitize(avatar.name.as_deref().unwrap_or("unnamed")));
        self.write_file(&stem, None, &plaintext)
    }
}

/// Avatar names are recipient identifiers (phone numbers, UUIDs); anything
/// that is not filesystem-safe becomes an underscore.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_owned()
    } else {
        cleaned
    }
}

/// File extension for the content types the messenger actually records.
fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let ext = match mime {
        // images
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/tiff" => "tif",
        "image/bmp" => "bmp",
        "image/x-icon" => "ico",
        "image/vnd.adobe.photoshop" => "psd",
        // video
        "video/mp4" => "mp4",
        "video/x-m4v" => "m4v",
        "video/x-matroska" => "mkv",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "video/x-msvideo" => "avi",
        "video/mpeg" => "mpg",
        "video/3gpp" => "3gp",
        // audio
        "audio/midi" => "mid",
        "audio/mpeg" => "mp3",
        "audio/mp4" | "audio/m4a" => "m4a",
        "audio/aac" => "aac",
        "audio/ogg" => "ogg",
        "audio/x-flac" | "audio/flac" => "flac",
        "audio/x-wav" => "wav",
        "audio/amr" => "amr",
        // documents and archives
        "application/pdf" => "pdf",
        "application/zip" => "zip",
        "application/gzip" => "gz",
        "application/x-tar" => "tar",
        "application/x-7z-compressed" => "7z",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/vnd.ms-excel" => "xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
        "application/x-sqlite3" => "sqlite",
        "text/plain" => "txt",
        "text/x-vcard" | "text/vcard" => "vcf",
        _ => return None,
    };
    Some(ext)
}

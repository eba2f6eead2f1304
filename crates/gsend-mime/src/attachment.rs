//! File attachments.

use crate::content_type::{ContentType, MediaCategory, SPREADSHEET_SUBTYPE};
use crate::encoding::{encode_base64_wrapped, encode_rfc2231};
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::message::Part;
use std::path::Path;

/// Extensions that denote a compression wrapper rather than a media type,
/// including the shorthand tarball forms.
const COMPRESSION_EXTENSIONS: &[&str] = &["gz", "Z", "bz2", "xz", "br", "tgz", "taz", "tz", "tbz2", "txz", "svgz"];

/// A file to attach, read fully into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    filename: String,
    content_type: ContentType,
    data: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment from in-memory data.
    #[must_use]
    pub fn new(filename: impl Into<String>, content_type: ContentType, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            data,
        }
    }

    /// Reads `path` synchronously and infers its content type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Attachment`] if the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| Error::Attachment {
            path: path.to_path_buf(),
            source,
        })?;

        let filename = path
            .file_name()
            .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy())
            .into_owned();

        Ok(Self::new(filename, guess_content_type(path), data))
    }

    /// File name placed in `Content-Disposition`.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Resolved content type.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Raw file bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Builds the MIME part.
    ///
    /// Every category goes out as Base64. The category only shapes the
    /// `Content-Type`: UTF-8 text gains `charset=utf-8`, everything else
    /// (including the spreadsheet override) keeps its type unchanged.
    pub(crate) fn to_part(&self) -> Result<Part> {
        let is_utf8_text = self.content_type.category() == MediaCategory::Text
            && std::str::from_utf8(&self.data).is_ok();
        let content_type = if is_utf8_text {
            self.content_type.clone().with_parameter("charset", "utf-8")
        } else {
            self.content_type.clone()
        };

        let mut headers = Headers::new();
        headers.set("Content-Type", content_type.to_string())?;
        headers.set("Content-Transfer-Encoding", "base64")?;
        headers.set("Content-Disposition", disposition(&self.filename))?;

        Ok(Part::new(headers, encode_base64_wrapped(&self.data)))
    }
}

/// Infers the content type of `path` from its extension.
///
/// `.xlsx` always resolves to `application/vnd-xls`. Compressed files and
/// unknown extensions resolve to `application/octet-stream`.
#[must_use]
pub fn guess_content_type(path: &Path) -> ContentType {
    let name = path.to_string_lossy();
    if name.ends_with(".xlsx") {
        return ContentType::new("application", SPREADSHEET_SUBTYPE);
    }

    let compressed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| COMPRESSION_EXTENSIONS.contains(&ext));
    if compressed {
        return ContentType::octet_stream();
    }

    mime_guess::from_path(path)
        .first()
        .and_then(|mime| ContentType::parse(mime.essence_str()).ok())
        .unwrap_or_else(ContentType::octet_stream)
}

/// `attachment` disposition naming `filename`. ASCII names are quoted;
/// anything else uses the RFC 2231 `filename*` form.
fn disposition(filename: &str) -> String {
    if filename.is_ascii() {
        let quoted = filename.replace('\\', "\\\\").replace('"', "\\\"");
        format!("attachment; filename=\"{quoted}\"")
    } else {
        format!("attachment; filename*={}", encode_rfc2231(filename))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn guess(name: &str) -> ContentType {
        guess_content_type(Path::new(name))
    }

    #[test]
    fn test_xlsx_override() {
        let ct = guess("/tmp/reports/report.xlsx");
        assert_eq!(ct.essence(), "application/vnd-xls");
        assert_eq!(ct.category(), MediaCategory::Spreadsheet);
    }

    #[test]
    fn test_png_is_image() {
        let ct = guess("photo.png");
        assert_eq!(ct.essence(), "image/png");
        assert_eq!(ct.category(), MediaCategory::Image);
    }

    #[test]
    fn test_common_types() {
        assert_eq!(guess("notes.txt").category(), MediaCategory::Text);
        assert_eq!(guess("song.mp3").category(), MediaCategory::Audio);
        assert_eq!(guess("doc.pdf").essence(), "application/pdf");
        assert_eq!(guess("doc.pdf").category(), MediaCategory::Binary);
    }

    #[test]
    fn test_compressed_and_unknown_fall_back_to_octet_stream() {
        assert_eq!(guess("logs.txt.gz").essence(), "application/octet-stream");
        assert_eq!(guess("backup.tgz").essence(), "application/octet-stream");
        assert_eq!(guess("blob.zzzunknown").essence(), "application/octet-stream");
        assert_eq!(guess("Makefile").essence(), "application/octet-stream");
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&[0x89, b'P', b'N', b'G'])
            .unwrap();

        let attachment = Attachment::from_path(&path).unwrap();
        assert_eq!(attachment.filename(), "photo.png");
        assert_eq!(attachment.data(), &[0x89, b'P', b'N', b'G']);
        assert_eq!(attachment.content_type().essence(), "image/png");
    }

    #[test]
    fn test_missing_file_is_an_error_naming_the_path() {
        let err = Attachment::from_path("/nonexistent/report.xlsx").unwrap_err();
        assert!(matches!(err, Error::Attachment { .. }));
        assert!(err.to_string().contains("/nonexistent/report.xlsx"));
    }

    #[test]
    fn test_text_part_gets_charset() {
        let attachment = Attachment::new("a.txt", ContentType::new("text", "plain"), b"hi".to_vec());
        let part = attachment.to_part().unwrap();
        assert_eq!(
            part.headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(part.headers.get("Content-Transfer-Encoding"), Some("base64"));
        assert_eq!(
            part.headers.get("Content-Disposition"),
            Some("attachment; filename=\"a.txt\"")
        );
        assert_eq!(part.body, "aGk=\r\n");
    }

    #[test]
    fn test_non_utf8_text_has_no_charset() {
        let attachment =
            Attachment::new("latin1.txt", ContentType::new("text", "plain"), vec![0xe9, 0x0a]);
        let part = attachment.to_part().unwrap();
        assert_eq!(part.headers.get("Content-Type"), Some("text/plain"));
    }

    #[test]
    fn test_filename_is_escaped() {
        let attachment = Attachment::new("say \"hi\".bin", ContentType::octet_stream(), vec![]);
        let part = attachment.to_part().unwrap();
        assert_eq!(
            part.headers.get("Content-Disposition"),
            Some("attachment; filename=\"say \\\"hi\\\".bin\"")
        );
    }

    #[test]
    fn test_non_ascii_filename_uses_extended_parameter() {
        let attachment = Attachment::new("résumé.pdf", ContentType::new("application", "pdf"), vec![1]);
        let part = attachment.to_part().unwrap();
        assert_eq!(
            part.headers.get("Content-Disposition"),
            Some("attachment; filename*=utf-8''r%C3%A9sum%C3%A9.pdf")
        );
    }

    #[test]
    fn test_spreadsheet_part_keeps_override_type() {
        let attachment = Attachment::new(
            "report.xlsx",
            guess_content_type(Path::new("report.xlsx")),
            b"PK".to_vec(),
        );
        let part = attachment.to_part().unwrap();
        assert_eq!(part.headers.get("Content-Type"), Some("application/vnd-xls"));
        assert_eq!(part.headers.get("Content-Transfer-Encoding"), Some("base64"));
        assert_eq!(part.body, "UEs=\r\n");
    }
}

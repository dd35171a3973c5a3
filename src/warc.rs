//! WARC record reader
//!
//! Reads records one at a time from a decompressed WARC stream. Each record is
//! a version line, a block of `Name: value` headers, an empty line, a body of
//! exactly `Content-Length` bytes and a two line-break trailer.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::ArchiveError;
use crate::http;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// WARC record type (`WARC-Type` header)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordType {
    Warcinfo,
    Response,
    Resource,
    Request,
    Metadata,
    Revisit,
    Conversion,
    Continuation,
    Other(String),
}

impl RecordType {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "warcinfo" => RecordType::Warcinfo,
            "response" => RecordType::Response,
            "resource" => RecordType::Resource,
            "request" => RecordType::Request,
            "metadata" => RecordType::Metadata,
            "revisit" => RecordType::Revisit,
            "conversion" => RecordType::Conversion,
            "continuation" => RecordType::Continuation,
            _ => RecordType::Other(value.trim().to_string()),
        }
    }

    /// Record types whose block is an HTTP message when typed `application/http`
    fn carries_http(&self) -> bool {
        matches!(
            self,
            RecordType::Response | RecordType::Request | RecordType::Revisit
        )
    }
}

/// Single record read from the archive
#[derive(Debug, Clone)]
pub struct WarcRecord {
    pub version: String,
    /// Byte offset of the version line in the decompressed stream
    pub offset: u64,
    headers: Vec<(String, String)>,
    block: Vec<u8>,
}

impl WarcRecord {
    /// Case-insensitive header lookup, first match wins
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn record_type(&self) -> RecordType {
        match self.header("WARC-Type") {
            Some(value) => RecordType::parse(value),
            None => RecordType::Other(String::new()),
        }
    }

    pub fn is_response(&self) -> bool {
        self.record_type() == RecordType::Response
    }

    pub fn record_id(&self) -> Option<&str> {
        self.header("WARC-Record-ID")
    }

    pub fn target_uri(&self) -> Option<&str> {
        self.header("WARC-Target-URI")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Raw record block, exactly `Content-Length` bytes
    pub fn block(&self) -> &[u8] {
        &self.block
    }

    /// Record payload. HTTP records yield the decoded entity body, anything
    /// else yields the block unchanged.
    pub fn payload(&self) -> Vec<u8> {
        if self.holds_http_message() {
            http::decode_payload(&self.block)
        } else {
            self.block.clone()
        }
    }

    /// Media type the HTTP message declares for its payload, e.g. `text/html`
    pub fn payload_media_type(&self) -> Option<String> {
        if self.holds_http_message() {
            http::media_type(&self.block)
        } else {
            None
        }
    }

    fn holds_http_message(&self) -> bool {
        let is_http = self
            .content_type()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("application/http"))
            .unwrap_or(false);
        is_http && self.record_type().carries_http()
    }
}

/// Forward-only reader over the records of one archive
pub struct ArchiveReader<R> {
    inner: R,
    position: u64,
    done: bool,
}

impl<R: BufRead> ArchiveReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            position: 0,
            done: false,
        }
    }

    /// Bytes consumed from the decompressed stream so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the next record, `Ok(None)` at a clean end of stream
    pub fn next_record(&mut self) -> Result<Option<WarcRecord>, ArchiveError> {
        // Skip stray line breaks between records
        let (offset, version_line) = loop {
            let offset = self.position;
            let line = match self.read_line()? {
                Some(line) => line,
                None => return Ok(None),
            };
            if !is_blank(&line) {
                break (offset, line);
            }
        };

        let version = String::from_utf8_lossy(trim_line_end(&version_line)).to_string();
        if !version.starts_with("WARC/") {
            return Err(ArchiveError::InvalidVersion {
                offset,
                line: version,
            });
        }

        let headers = self.read_headers(offset)?;

        let length_value = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
            .map(|(_, v)| v.clone())
            .ok_or(ArchiveError::MissingContentLength { offset })?;
        let length: u64 = length_value
            .trim()
            .parse()
            .map_err(|_| ArchiveError::InvalidContentLength {
                offset,
                value: length_value.clone(),
            })?;

        let mut block = Vec::new();
        let read = (&mut self.inner).take(length).read_to_end(&mut block)? as u64;
        self.position += read;
        if read < length {
            return Err(ArchiveError::Truncated {
                offset,
                expected: length,
                actual: read,
            });
        }

        self.read_trailer(offset)?;

        Ok(Some(WarcRecord {
            version,
            offset,
            headers,
            block,
        }))
    }

    fn read_headers(&mut self, offset: u64) -> Result<Vec<(String, String)>, ArchiveError> {
        let mut headers: Vec<(String, String)> = Vec::new();

        loop {
            let line = match self.read_line()? {
                Some(line) => line,
                None => return Err(ArchiveError::UnexpectedEof { offset }),
            };
            if is_blank(&line) {
                return Ok(headers);
            }

            let text = String::from_utf8_lossy(trim_line_end(&line)).to_string();

            if text.starts_with(' ') || text.starts_with('\t') {
                // Folded continuation of the previous header value
                match headers.last_mut() {
                    Some((_, value)) => {
                        value.push(' ');
                        value.push_str(text.trim());
                        continue;
                    }
                    None => return Err(ArchiveError::InvalidHeader { offset, line: text }),
                }
            }

            match text.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => {
                    headers.push((name.trim().to_string(), value.trim().to_string()));
                }
                _ => return Err(ArchiveError::InvalidHeader { offset, line: text }),
            }
        }
    }

    fn read_trailer(&mut self, offset: u64) -> Result<(), ArchiveError> {
        for _ in 0..2 {
            let next = self.inner.fill_buf()?.first().copied();
            match next {
                // End of stream right after the block is tolerated
                None => return Ok(()),
                Some(b'\r' | b'\n') => {
                    let line = self.read_line()?.unwrap_or_default();
                    if !is_blank(&line) {
                        return Err(ArchiveError::MissingTrailer { offset });
                    }
                }
                Some(_) => return Err(ArchiveError::MissingTrailer { offset }),
            }
        }
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>, ArchiveError> {
        let mut line = Vec::new();
        let read = self.inner.read_until(b'\n', &mut line)?;
        self.position += read as u64;
        if read == 0 {
            Ok(None)
        } else {
            Ok(Some(line))
        }
    }
}

impl<R: BufRead> Iterator for ArchiveReader<R> {
    type Item = Result<WarcRecord, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Open a WARC file, transparently decompressing gzip input
pub fn open_archive(path: &Path) -> Result<ArchiveReader<Box<dyn BufRead>>, ArchiveError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

    let inner: Box<dyn BufRead> = if is_gzip {
        Box::new(BufReader::new(MultiGzDecoder::new(reader)))
    } else {
        Box::new(reader)
    };

    Ok(ArchiveReader::new(inner))
}

fn is_blank(line: &[u8]) -> bool {
    trim_line_end(line).is_empty()
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
        end -= 1;
    }
    &line[..end]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    /// Build one framed WARC record
    pub(crate) fn warc_record(warc_type: &str, id: &str, uri: &str, block: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"WARC/1.0\r\n");
        out.extend_from_slice(format!("WARC-Type: {}\r\n", warc_type).as_bytes());
        out.extend_from_slice(format!("WARC-Record-ID: {}\r\n", id).as_bytes());
        out.extend_from_slice(format!("WARC-Target-URI: {}\r\n", uri).as_bytes());
        out.extend_from_slice(b"Content-Type: application/http; msgtype=response\r\n");
        out.extend_from_slice(format!("Content-Length: {}\r\n", block.len()).as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(block);
        out.extend_from_slice(b"\r\n\r\n");
        out
    }

    pub(crate) fn http_response(body: &str) -> Vec<u8> {
        typed_http_response("text/html", body.as_bytes())
    }

    pub(crate) fn typed_http_response(content_type: &str, body: &[u8]) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
            content_type,
            body.len()
        )
        .into_bytes();
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn test_reads_records_in_order() {
        let mut data = warc_record(
            "request",
            "<urn:uuid:1>",
            "https://example.com/",
            b"GET / HTTP/1.1\r\n\r\n",
        );
        data.extend(warc_record(
            "response",
            "<urn:uuid:2>",
            "https://example.com/",
            &http_response("<p>hi</p>"),
        ));

        let records: Vec<WarcRecord> = ArchiveReader::new(Cursor::new(data))
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_type(), RecordType::Request);
        assert_eq!(records[1].record_type(), RecordType::Response);
        assert_eq!(records[1].record_id(), Some("<urn:uuid:2>"));
        assert_eq!(records[1].target_uri(), Some("https://example.com/"));
        assert_eq!(records[1].payload(), b"<p>hi</p>");
        assert_eq!(records[1].payload_media_type().as_deref(), Some("text/html"));
        assert_eq!(records[0].payload_media_type(), None);
        assert_eq!(records[0].offset, 0);
    }

    #[test]
    fn test_empty_stream_has_no_records() {
        let mut reader = ArchiveReader::new(Cursor::new(Vec::new()));
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive_and_folds_continuations() {
        let data = b"WARC/1.1\r\nwarc-type: metadata\r\nX-Note: first\r\n  second\r\n\
            Content-Length: 3\r\n\r\nabc\r\n\r\n";
        let record = ArchiveReader::new(Cursor::new(data.to_vec()))
            .next_record()
            .unwrap()
            .unwrap();

        assert_eq!(record.record_type(), RecordType::Metadata);
        assert_eq!(record.header("x-note"), Some("first second"));
        assert_eq!(record.payload(), b"abc");
        assert_eq!(record.version, "WARC/1.1");
    }

    #[test]
    fn test_unknown_record_type() {
        assert_eq!(RecordType::parse("Response"), RecordType::Response);
        assert_eq!(
            RecordType::parse("x-custom"),
            RecordType::Other("x-custom".to_string())
        );
    }

    #[test]
    fn test_invalid_version_line() {
        let data = b"HTTP/1.1 200 OK\r\n\r\n".to_vec();
        let err = ArchiveReader::new(Cursor::new(data)).next_record().unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidVersion { offset: 0, .. }));
    }

    #[test]
    fn test_missing_content_length() {
        let data = b"WARC/1.0\r\nWARC-Type: response\r\n\r\n".to_vec();
        let err = ArchiveReader::new(Cursor::new(data)).next_record().unwrap_err();
        assert!(matches!(err, ArchiveError::MissingContentLength { .. }));
    }

    #[test]
    fn test_invalid_content_length() {
        let data = b"WARC/1.0\r\nContent-Length: lots\r\n\r\n".to_vec();
        let err = ArchiveReader::new(Cursor::new(data)).next_record().unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidContentLength { .. }));
    }

    #[test]
    fn test_truncated_block() {
        let data = b"WARC/1.0\r\nContent-Length: 100\r\n\r\nshort".to_vec();
        let err = ArchiveReader::new(Cursor::new(data)).next_record().unwrap_err();
        match err {
            ArchiveError::Truncated {
                expected, actual, ..
            } => {
                assert_eq!(expected, 100);
                assert_eq!(actual, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_header_without_colon() {
        let data = b"WARC/1.0\r\nnot a header\r\n\r\n".to_vec();
        let err = ArchiveReader::new(Cursor::new(data)).next_record().unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidHeader { .. }));
    }

    #[test]
    fn test_garbage_after_block() {
        let data = b"WARC/1.0\r\nContent-Length: 3\r\n\r\nabcXYZ".to_vec();
        let err = ArchiveReader::new(Cursor::new(data)).next_record().unwrap_err();
        assert!(matches!(err, ArchiveError::MissingTrailer { .. }));
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let mut data = warc_record("response", "<urn:uuid:1>", "https://a/", b"");
        data.extend_from_slice(b"garbage\r\n");
        data.extend(warc_record("response", "<urn:uuid:2>", "https://b/", b""));

        let mut reader = ArchiveReader::new(Cursor::new(data));
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_open_gzip_archive() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        // One gzip member per record
        for (i, uri) in ["https://a/", "https://b/"].iter().enumerate() {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            let id = format!("<urn:uuid:{}>", i);
            encoder
                .write_all(&warc_record("response", &id, uri, &http_response("x")))
                .unwrap();
            file.write_all(&encoder.finish().unwrap()).unwrap();
        }
        file.flush().unwrap();

        let uris: Vec<String> = open_archive(file.path())
            .unwrap()
            .map(|r| r.unwrap().target_uri().unwrap_or_default().to_string())
            .collect();
        assert_eq!(uris, vec!["https://a/", "https://b/"]);
    }

    #[test]
    fn test_open_plain_archive() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&warc_record("warcinfo", "<urn:uuid:0>", "", b"software: test"))
            .unwrap();
        file.flush().unwrap();

        let mut reader = open_archive(file.path()).unwrap();
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.record_type(), RecordType::Warcinfo);
        assert!(reader.next_record().unwrap().is_none());
    }
}

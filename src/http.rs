//! HTTP message payload decoding
//!
//! Response records store the raw HTTP message. The payload handed to the
//! extractor is the entity body with transfer and content encodings removed.

use std::io::Read;

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};

/// Split an HTTP message into its header lines and body.
/// Returns `None` when the block does not start with an HTTP status line.
pub fn split_message(block: &[u8]) -> Option<(Vec<(String, String)>, &[u8])> {
    if !block.starts_with(b"HTTP/") {
        return None;
    }

    let (head, body) = match find_header_end(block) {
        Some((head_end, body_start)) => (&block[..head_end], &block[body_start..]),
        None => (block, &block[block.len()..]),
    };

    let head = String::from_utf8_lossy(head);
    let headers = head
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();

    Some((headers, body))
}

/// Entity body of an HTTP message, decoded where possible.
/// Blocks that are not HTTP messages are returned unchanged.
pub fn decode_payload(block: &[u8]) -> Vec<u8> {
    let (headers, body) = match split_message(block) {
        Some(parts) => parts,
        None => return block.to_vec(),
    };

    let header = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.to_ascii_lowercase())
    };

    let mut payload = body.to_vec();

    if header("Transfer-Encoding").is_some_and(|te| te.contains("chunked")) {
        if let Some(dechunked) = dechunk(&payload) {
            payload = dechunked;
        }
    }

    if let Some(encoding) = header("Content-Encoding") {
        if let Some(decoded) = decompress(&payload, encoding.trim()) {
            payload = decoded;
        }
    }

    payload
}

/// Media type from the message's `Content-Type`, lowercased and without
/// parameters. `None` for non-HTTP blocks or when the header is absent.
pub fn media_type(block: &[u8]) -> Option<String> {
    let (headers, _) = split_message(block)?;
    let (_, value) = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("Content-Type"))?;
    let essence = value.split(';').next().unwrap_or_default().trim();
    Some(essence.to_ascii_lowercase())
}

/// Whether a payload should go to the HTML extractor. Declared HTML is
/// accepted, missing or generic types fall back to sniffing the bytes,
/// anything else (images, stylesheets, scripts, ...) is rejected.
pub fn is_markup(media_type: Option<&str>, payload: &[u8]) -> bool {
    match media_type {
        Some("text/html") | Some("application/xhtml+xml") => true,
        None
        | Some("")
        | Some("text/plain")
        | Some("application/octet-stream")
        | Some("unknown/unknown") => looks_like_markup(payload),
        Some(_) => false,
    }
}

/// First non-whitespace byte, after an optional UTF-8 BOM, opens a tag
pub fn looks_like_markup(payload: &[u8]) -> bool {
    let payload = payload.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(payload);
    payload.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'<')
}

fn find_header_end(block: &[u8]) -> Option<(usize, usize)> {
    let crlf = block.windows(4).position(|w| w == b"\r\n\r\n");
    let lf = block.windows(2).position(|w| w == b"\n\n");
    match (crlf, lf) {
        (Some(c), Some(l)) if l < c => Some((l, l + 2)),
        (Some(c), _) => Some((c, c + 4)),
        (None, Some(l)) => Some((l, l + 2)),
        (None, None) => None,
    }
}

/// Remove chunked transfer framing, `None` if the framing is broken
fn dechunk(body: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len());
    let mut rest = body;

    loop {
        let line_end = rest.iter().position(|&b| b == b'\n')?;
        let size_line = String::from_utf8_lossy(&rest[..line_end]);
        let size_field = size_line.split(';').next()?.trim();
        let size = usize::from_str_radix(size_field, 16).ok()?;
        rest = &rest[line_end + 1..];

        if size == 0 {
            return Some(out);
        }
        if rest.len() < size {
            return None;
        }
        out.extend_from_slice(&rest[..size]);
        rest = &rest[size..];

        // Chunk data is followed by a line break
        if rest.starts_with(b"\r\n") {
            rest = &rest[2..];
        } else if rest.starts_with(b"\n") {
            rest = &rest[1..];
        } else {
            return None;
        }
    }
}

fn decompress(body: &[u8], encoding: &str) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    match encoding {
        "gzip" | "x-gzip" => GzDecoder::new(body).read_to_end(&mut out).ok()?,
        "deflate" => match ZlibDecoder::new(body).read_to_end(&mut out) {
            Ok(n) => n,
            Err(_) => {
                // Some servers send raw deflate without the zlib wrapper
                out.clear();
                DeflateDecoder::new(body).read_to_end(&mut out).ok()?
            }
        },
        _ => return None,
    };
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_strips_http_headers() {
        let block = b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<html></html>";
        assert_eq!(decode_payload(block), b"<html></html>");

        let (headers, _) = split_message(block).unwrap();
        assert_eq!(
            headers,
            vec![("Content-Type".to_string(), "text/html".to_string())]
        );
    }

    #[test]
    fn test_non_http_block_is_unchanged() {
        assert_eq!(decode_payload(b"plain bytes"), b"plain bytes");
    }

    #[test]
    fn test_headers_only_message_has_empty_body() {
        let block = b"HTTP/1.1 304 Not Modified\r\nETag: x\r\n";
        assert!(decode_payload(block).is_empty());
    }

    #[test]
    fn test_chunked_body() {
        let block = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
            5\r\nhello\r\n6;ext=1\r\n world\r\n0\r\n\r\n";
        assert_eq!(decode_payload(block), b"hello world");
    }

    #[test]
    fn test_broken_chunking_falls_back_to_raw_body() {
        let block = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nnot chunked";
        assert_eq!(decode_payload(block), b"not chunked");
    }

    #[test]
    fn test_gzip_content_encoding() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<p>compressed</p>").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut block = b"HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\n\r\n".to_vec();
        block.extend_from_slice(&compressed);

        assert_eq!(decode_payload(&block), b"<p>compressed</p>");
    }

    #[test]
    fn test_media_type() {
        let block = b"HTTP/1.1 200 OK\r\nContent-Type: Text/HTML; charset=utf-8\r\n\r\n<p/>";
        assert_eq!(media_type(block).as_deref(), Some("text/html"));
        assert_eq!(media_type(b"HTTP/1.1 204 No Content\r\n\r\n"), None);
        assert_eq!(media_type(b"<p>not http</p>"), None);
    }

    #[test]
    fn test_markup_detection() {
        assert!(is_markup(Some("text/html"), b"anything"));
        assert!(is_markup(Some("application/xhtml+xml"), b"<html/>"));
        assert!(!is_markup(Some("image/png"), b"\x89PNG\r\n\x1a\n"));
        assert!(!is_markup(Some("text/css"), b"body { color: red }"));
        assert!(!is_markup(Some("application/javascript"), b"var x = 1;"));

        // Missing or generic types are sniffed
        assert!(is_markup(None, b"\xEF\xBB\xBF\n  <!DOCTYPE html><html></html>"));
        assert!(is_markup(Some("application/octet-stream"), b"<p>hi</p>"));
        assert!(!is_markup(None, b"\x89PNG\r\n\x1a\n"));
        assert!(!is_markup(Some("text/plain"), b"plain words"));
    }

    #[test]
    fn test_unknown_content_encoding_is_left_alone() {
        let block = b"HTTP/1.1 200 OK\r\nContent-Encoding: br\r\n\r\nbytes";
        assert_eq!(decode_payload(block), b"bytes");
    }
}

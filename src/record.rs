//! Output record assembly

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Prefix for document attributes copied from the tree root
pub const DOC_ATTR_PREFIX: &str = "doc_";

/// Provenance of an output record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// `WARC-Record-ID` of the originating response
    pub source: String,
}

/// One line of output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub uri: String,
    pub html: String,
    pub meta: RecordMeta,
    /// `doc_<key>` entries, one per root attribute
    #[serde(flatten)]
    pub doc_attributes: BTreeMap<String, String>,
}

impl OutputRecord {
    /// Value of root attribute `key` as carried on this record
    pub fn doc_attr(&self, key: &str) -> Option<&str> {
        self.doc_attributes
            .get(&format!("{}{}", DOC_ATTR_PREFIX, key))
            .map(String::as_str)
    }

    /// Serialize as a single JSON line without the trailing newline
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Combine the rendered document with its provenance and root attributes
pub fn assemble(
    uri: &str,
    html: String,
    source_id: &str,
    root_attributes: &[(String, String)],
) -> Result<OutputRecord, RecordError> {
    if html.trim().is_empty() {
        return Err(RecordError::EmptyHtml);
    }

    let doc_attributes = root_attributes
        .iter()
        .map(|(key, value)| (format!("{}{}", DOC_ATTR_PREFIX, key), value.clone()))
        .collect();

    Ok(OutputRecord {
        uri: uri.to_string(),
        html,
        meta: RecordMeta {
            source: source_id.to_string(),
        },
        doc_attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_assemble() {
        let record = assemble(
            "https://example.com/",
            "<doc />".to_string(),
            "<urn:uuid:1>",
            &attrs(&[("lang", "en"), ("fingerprint", "0042")]),
        )
        .unwrap();

        assert_eq!(record.meta.source, "<urn:uuid:1>");
        assert_eq!(record.doc_attr("lang"), Some("en"));
        // Values are copied verbatim, no numeric coercion
        assert_eq!(record.doc_attr("fingerprint"), Some("0042"));
    }

    #[test]
    fn test_empty_html_is_rejected() {
        let err = assemble("u", "  ".to_string(), "id", &[]).unwrap_err();
        assert_eq!(err, RecordError::EmptyHtml);
    }

    #[test]
    fn test_json_line_shape() {
        let record = assemble(
            "https://example.com/a",
            "<doc lang=\"en\" />".to_string(),
            "<urn:uuid:7>",
            &attrs(&[("lang", "en")]),
        )
        .unwrap();

        let line = record.to_json_line().unwrap();
        assert!(!line.contains('\n'));
        assert_eq!(
            line,
            concat!(
                r#"{"uri":"https://example.com/a","html":"<doc lang=\"en\" />","#,
                r#""meta":{"source":"<urn:uuid:7>"},"doc_lang":"en"}"#
            )
        );

        let parsed: OutputRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, record);
    }
}

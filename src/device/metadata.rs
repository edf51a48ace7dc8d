//! Parsing of the device's per-item `.metadata` and `.content` JSON files.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{parse_modified, RemoteItem};

const COLLECTION_TYPE: &str = "CollectionType";
const NOTEBOOK_FILE_TYPE: &str = "notebook";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataFile {
    #[serde(default)]
    deleted: bool,
    last_modified: String,
    #[serde(default)]
    parent: String,
    #[serde(rename = "type")]
    item_type: String,
    visible_name: String,
}

/// Parse one `<id>.metadata` file.
///
/// Returns `Ok(None)` for soft-deleted records.
pub fn parse_metadata(id: &str, json: &[u8]) -> Result<Option<RemoteItem>> {
    let raw: MetadataFile = serde_json::from_slice(json).map_err(|e| Error::InvalidMetadata {
        id: id.to_string(),
        message: e.to_string(),
    })?;
    if raw.deleted {
        return Ok(None);
    }

    let modified = parse_modified(&raw.last_modified).map_err(|message| Error::InvalidMetadata {
        id: id.to_string(),
        message,
    })?;

    Ok(Some(RemoteItem::new(
        id,
        &raw.visible_name,
        modified,
        raw.parent,
        raw.item_type == COLLECTION_TYPE,
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentFile {
    #[serde(default)]
    file_type: String,
    #[serde(default)]
    format_version: Option<u32>,
    #[serde(default)]
    pages: Vec<String>,
    #[serde(default)]
    c_pages: Option<PageContainer>,
}

#[derive(Debug, Deserialize)]
struct PageContainer {
    #[serde(default)]
    pages: Vec<PageEntry>,
}

#[derive(Debug, Deserialize)]
struct PageEntry {
    id: String,
    #[serde(default)]
    deleted: Option<serde_json::Value>,
}

/// Parse one `<id>.content` file into the ordered, live page ids.
///
/// Format version 1 lists page ids directly; version 2 nests them under
/// `cPages` where removed pages carry a `deleted` marker.
pub fn parse_content(id: &str, json: &[u8]) -> Result<Vec<String>> {
    let raw: ContentFile = serde_json::from_slice(json).map_err(|e| Error::InvalidMetadata {
        id: id.to_string(),
        message: e.to_string(),
    })?;

    if raw.file_type != NOTEBOOK_FILE_TYPE {
        return Err(Error::NotANotebook {
            id: id.to_string(),
            file_type: raw.file_type,
        });
    }

    match raw.format_version {
        Some(1) => Ok(raw.pages),
        Some(2) => Ok(raw
            .c_pages
            .map(|c| {
                c.pages
                    .into_iter()
                    .filter(|p| p.deleted.is_none())
                    .map(|p| p.id)
                    .collect()
            })
            .unwrap_or_default()),
        other => Err(Error::InvalidMetadata {
            id: id.to_string(),
            message: format!("unsupported content format version {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(parent: &str, kind: &str, name: &str, deleted: bool) -> Vec<u8> {
        serde_json::json!({
            "deleted": deleted,
            "lastModified": "1700000000123",
            "parent": parent,
            "type": kind,
            "visibleName": name,
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_parse_document_metadata() {
        let item = parse_metadata("d1", &metadata("f1", "DocumentType", "Notes", false))
            .unwrap()
            .unwrap();
        assert_eq!(item.name, "Notes.pdf");
        assert_eq!(item.modified, 1_700_000_000_123);
        assert_eq!(item.parent_id, "f1");
        assert!(!item.is_collection);
    }

    #[test]
    fn test_soft_deleted_is_skipped() {
        let item = parse_metadata("d1", &metadata("", "DocumentType", "Gone", true)).unwrap();
        assert!(item.is_none());
    }

    #[test]
    fn test_short_timestamp_is_rejected() {
        let json = br#"{"lastModified":"1700000000","parent":"","type":"DocumentType","visibleName":"x"}"#;
        let err = parse_metadata("d1", json).unwrap_err();
        assert!(matches!(err, Error::InvalidMetadata { .. }));
    }

    #[test]
    fn test_content_v1_pages() {
        let json = br#"{"fileType":"notebook","formatVersion":1,"pages":["p1","p2"]}"#;
        assert_eq!(parse_content("n", json).unwrap(), vec!["p1", "p2"]);
    }

    #[test]
    fn test_content_v2_skips_deleted_pages() {
        let json = br#"{"fileType":"notebook","formatVersion":2,"cPages":{"pages":[
            {"id":"p1","idx":{"value":"ba"}},
            {"id":"p2","deleted":{"timestamp":"1:1","value":1}},
            {"id":"p3"}
        ]}}"#;
        assert_eq!(parse_content("n", json).unwrap(), vec!["p1", "p3"]);
    }

    #[test]
    fn test_content_rejects_pdf_and_unknown_versions() {
        let pdf = br#"{"fileType":"pdf","formatVersion":1,"pages":[]}"#;
        assert!(matches!(
            parse_content("n", pdf),
            Err(Error::NotANotebook { file_type, .. }) if file_type == "pdf"
        ));

        let v3 = br#"{"fileType":"notebook","formatVersion":3}"#;
        assert!(matches!(parse_content("n", v3), Err(Error::InvalidMetadata { .. })));
    }
}

//! Remote items as listed from the device.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Parent id the device uses for items in the trash.
pub const TRASH_PARENT: &str = "trash";

/// One document or folder from the device listing.
///
/// `trashed` is derived when the listing is assembled: it is true when the
/// item's own parent chain reaches [`TRASH_PARENT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Device-assigned identity.
    pub id: String,
    /// Filesystem-safe display name (`.pdf` enforced for documents).
    pub name: String,
    /// Last modification (Unix milliseconds).
    pub modified: i64,
    /// Parent id, empty for top-level items.
    pub parent_id: String,
    pub is_collection: bool,
    pub trashed: bool,
}

impl RemoteItem {
    /// Build an item from raw metadata fields, sanitizing the display name.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        visible_name: &str,
        modified: i64,
        parent_id: impl Into<String>,
        is_collection: bool,
    ) -> Self {
        let parent_id = parent_id.into();
        let trashed = parent_id == TRASH_PARENT;
        Self {
            id: id.into(),
            name: display_name(visible_name, is_collection),
            modified,
            parent_id,
            is_collection,
            trashed,
        }
    }

    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_empty()
    }
}

/// Sanitize a visible name for use as a file or directory name.
///
/// Characters invalid in a filename on any desktop platform are dropped,
/// trailing dots and spaces are trimmed, and documents get a `.pdf` suffix.
#[must_use]
pub fn display_name(visible_name: &str, is_collection: bool) -> String {
    let mut name: String = visible_name
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();
    name = name.trim().trim_end_matches('.').to_string();
    if name.is_empty() {
        name = "Untitled".to_string();
    }

    if !is_collection && !name.to_lowercase().ends_with(".pdf") {
        name.push_str(".pdf");
    }
    name
}

/// Parse a device `lastModified` string into Unix milliseconds.
///
/// The device writes milliseconds as a decimal string; only the first 13
/// characters are significant. Shorter values (seconds precision) are
/// rejected rather than misread.
pub fn parse_modified(raw: &str) -> Result<i64, String> {
    let raw = raw.trim();
    let digits = raw
        .get(..13)
        .ok_or_else(|| format!("lastModified {raw:?} is shorter than 13 digits"))?;
    digits
        .parse::<i64>()
        .map_err(|e| format!("lastModified {raw:?} is not a millisecond timestamp: {e}"))
}

/// Mark every item whose ancestor chain reaches the trash as trashed.
///
/// Parent cycles are tolerated: an item is trashed only if the walk hits a
/// trashed ancestor before revisiting a node.
pub fn inherit_trash(items: &mut [RemoteItem]) {
    let index: HashMap<&str, usize> = items
        .iter()
        .enumerate()
        .map(|(i, item)| (item.id.as_str(), i))
        .collect();

    let trashed: Vec<bool> = (0..items.len())
        .map(|start| {
            let mut current = start;
            for _ in 0..items.len() {
                let item = &items[current];
                if item.trashed || item.parent_id == TRASH_PARENT {
                    return true;
                }
                match index.get(item.parent_id.as_str()) {
                    Some(&parent) => current = parent,
                    None => return false,
                }
            }
            false
        })
        .collect();

    for (item, trashed) in items.iter_mut().zip(trashed) {
        item.trashed = trashed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_strips_invalid_characters() {
        assert_eq!(display_name("a/b:c*?", true), "abc");
        assert_eq!(display_name("Notes <draft>", false), "Notes draft.pdf");
        assert_eq!(display_name("tab\there", true), "tabhere");
    }

    #[test]
    fn test_display_name_enforces_pdf_suffix_for_documents() {
        assert_eq!(display_name("Report", false), "Report.pdf");
        assert_eq!(display_name("Report.PDF", false), "Report.PDF");
        assert_eq!(display_name("Folder", true), "Folder");
    }

    #[test]
    fn test_display_name_never_empty() {
        assert_eq!(display_name("???", true), "Untitled");
        assert_eq!(display_name("...", false), "Untitled.pdf");
    }

    #[test]
    fn test_parse_modified_truncates_to_13_chars() {
        assert_eq!(parse_modified("1700000000123").unwrap(), 1_700_000_000_123);
        assert_eq!(parse_modified("1700000000123456").unwrap(), 1_700_000_000_123);
    }

    #[test]
    fn test_parse_modified_rejects_short_values() {
        assert!(parse_modified("1700000000").is_err());
        assert!(parse_modified("").is_err());
        assert!(parse_modified("17000000001xx").is_err());
    }

    #[test]
    fn test_new_marks_direct_trash_children() {
        let item = RemoteItem::new("a", "Doc", 1, TRASH_PARENT, false);
        assert!(item.trashed);
        let item = RemoteItem::new("b", "Doc", 1, "", false);
        assert!(!item.trashed);
        assert!(item.is_top_level());
    }

    #[test]
    fn test_trash_inherited_regardless_of_own_parent() {
        let mut items = vec![
            RemoteItem::new("f", "Folder", 1, TRASH_PARENT, true),
            RemoteItem::new("sub", "Sub", 1, "f", true),
            RemoteItem::new("doc", "Doc", 1, "sub", false),
            RemoteItem::new("live", "Live", 1, "", false),
            // parent cycle with no trash
            RemoteItem::new("a", "A", 1, "b", true),
            RemoteItem::new("b", "B", 1, "a", true),
        ];
        inherit_trash(&mut items);
        let trashed: Vec<bool> = items.iter().map(|i| i.trashed).collect();
        assert_eq!(trashed, vec![true, true, true, false, false, false]);
    }
}

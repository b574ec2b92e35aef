//! By-file view of the aggregate store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::store::{LogFlag, LogRef, RefKind, XrefStore};

/// A log occurrence grouped under its origin file, so the file itself is
/// dropped from the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLogRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ec: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<LogFlag>,
    pub fmtstring: String,
    pub func: String,
    pub line: i64,
    pub priority: u8,
    #[serde(rename = "type")]
    pub kind: RefKind,
}

impl From<&LogRef> for FileLogRef {
    fn from(occurrence: &LogRef) -> Self {
        Self {
            ec: occurrence.ec,
            flags: occurrence.flags.clone(),
            fmtstring: occurrence.fmtstring.clone(),
            func: occurrence.func.clone(),
            line: occurrence.line,
            priority: occurrence.priority,
            kind: occurrence.kind,
        }
    }
}

/// Regroup every occurrence by origin file, sorted ascending by line.
///
/// Pure function of the store; rebuild it after a merge instead of
/// patching it in place.
pub fn by_file(store: &XrefStore) -> BTreeMap<String, Vec<FileLogRef>> {
    let mut out: BTreeMap<String, Vec<FileLogRef>> = BTreeMap::new();
    for occurrences in store.refs.values() {
        for occurrence in occurrences {
            out.entry(occurrence.file.clone())
                .or_default()
                .push(FileLogRef::from(occurrence));
        }
    }
    for list in out.values_mut() {
        // stable, ties keep store iteration order
        list.sort_by_key(|r| r.line);
    }
    out
}

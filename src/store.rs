//! Aggregate store for extracted xrefs.
//!
//! Two mappings: `refs` groups log occurrences by content-derived
//! identity, `cli` groups command definitions and installations by
//! command name. Merging is an append-only union with explicit
//! insert-if-absent semantics; occurrence lists deduplicate by full
//! content equality, so applying the same source twice is a no-op.
//!
//! All maps are `BTreeMap` and struct fields are declared in key order,
//! which keeps serialized documents deterministically sorted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Origin of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub func: String,
    pub line: i64,
}

/// Decoration flags carried by a log occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFlag {
    Errno,
    Getaddrinfo,
}

/// Kind tag serialized with each occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Logmsg,
}

/// One log occurrence recorded under an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ec: Option<u32>,
    pub file: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<LogFlag>,
    pub fmtstring: String,
    pub func: String,
    pub line: i64,
    pub priority: u8,
    #[serde(rename = "type")]
    pub kind: RefKind,
}

/// Command attribute, serialized by name when the value is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CmdAttr {
    Named(String),
    Raw(u32),
}

impl CmdAttr {
    /// Map the packed attribute enumeration; zero means unset.
    pub fn from_raw(attr: u32) -> Option<CmdAttr> {
        match attr {
            0 => None,
            1 => Some(CmdAttr::Named("deprecated".to_string())),
            2 => Some(CmdAttr::Named("hidden".to_string())),
            other => Some(CmdAttr::Raw(other)),
        }
    }
}

/// One installation of a command into a CLI node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInstall {
    pub install: Location,
    pub node: i64,
}

/// Aggregated descriptor for one CLI command. Contributions arrive in any
/// order, so every field is optional until its side has been seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmdEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<CmdAttr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defun: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeInstall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
}

/// Policy for repeated installation nodes during merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodePolicy {
    /// Drop nodes already present by content
    #[default]
    Dedup,
    /// Keep every contributed node
    Accumulate,
}

/// The aggregate store: identity-keyed occurrences plus CLI descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XrefStore {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cli: BTreeMap<String, CmdEntry>,
    pub refs: BTreeMap<String, Vec<LogRef>>,
}

impl XrefStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an occurrence under an identity unless an identical one is
    /// already recorded.
    pub fn add_ref(&mut self, uid: String, occurrence: LogRef) {
        let list = self.refs.entry(uid).or_default();
        if !list.contains(&occurrence) {
            list.push(occurrence);
        }
    }

    /// Create or update a command descriptor from its definition site.
    /// Installation nodes recorded earlier are preserved.
    pub fn define_command(
        &mut self,
        name: &str,
        string: Option<String>,
        doc: Option<String>,
        attr: Option<CmdAttr>,
        defun: Location,
    ) {
        let entry = self.cli.entry(name.to_string()).or_default();
        entry.string = string;
        entry.doc = doc;
        entry.attr = attr;
        entry.defun = Some(defun);
    }

    /// Record one installation of a command into a node.
    pub fn install_command(&mut self, name: &str, node: i64, install: Location) {
        let entry = self.cli.entry(name.to_string()).or_default();
        entry.nodes.push(NodeInstall { install, node });
    }

    /// Fold another store into this one.
    ///
    /// `refs` union by content. A `cli` entry carrying a definition
    /// overwrites the scalar descriptor fields; nodes append subject to
    /// `policy`.
    pub fn merge(&mut self, source: XrefStore, policy: NodePolicy) {
        for (uid, occurrences) in source.refs {
            let list = self.refs.entry(uid).or_default();
            for occurrence in occurrences {
                if !list.contains(&occurrence) {
                    list.push(occurrence);
                }
            }
        }
        for (name, entry) in source.cli {
            let target = self.cli.entry(name).or_default();
            if entry.defun.is_some() {
                target.string = entry.string;
                target.doc = entry.doc;
                target.attr = entry.attr;
                target.defun = entry.defun;
            }
            for node in entry.nodes {
                if policy == NodePolicy::Accumulate || !target.nodes.contains(&node) {
                    target.nodes.push(node);
                }
            }
        }
    }

    /// Identities whose occurrences disagree on the canonical format
    /// string. Diagnostic only, the store is left as-is.
    pub fn inconsistent_identities(&self) -> Vec<&str> {
        self.refs
            .iter()
            .filter(|(_, occurrences)| {
                occurrences
                    .iter()
                    .skip(1)
                    .any(|o| o.fmtstring != occurrences[0].fmtstring)
            })
            .map(|(uid, _)| uid.as_str())
            .collect()
    }

    /// Total number of recorded occurrences.
    pub fn ref_count(&self) -> usize {
        self.refs.values().map(Vec::len).sum()
    }
}

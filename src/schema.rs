//! Struct layout catalog.
//!
//! Record shapes are not fixed at build time. Each target build supplies a
//! JSON document mapping struct names to ordered field layouts (offset,
//! width, decode kind), produced by an external tool from debug
//! information. A catalog for LP64 targets is embedded as the default.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, XrefError};

/// Default layout catalog for LP64 targets, shipped with the crate.
const BUILTIN_CATALOG: &str = include_str!("../data/xrefstructs.json");

/// Structs the classifier decodes. A catalog missing any of these cannot
/// drive an extraction pass.
pub const REQUIRED_STRUCTS: &[&str] = &[
    "xref",
    "xrefdata",
    "xref_logmsg",
    "xref_threadsched",
    "cmd_element",
    "xref_install_element",
];

/// How a field's bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Unsigned integer of the declared width
    Uint,
    /// Signed integer of the declared width
    Int,
    /// Pointer-sized address
    Ptr,
    /// Pointer to null-terminated text
    Str,
    /// Embedded struct
    Struct,
}

/// One field of a struct layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub offset: u64,
    pub size: u64,
    pub kind: FieldKind,
}

/// Layout of a single struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDef {
    pub fields: Vec<FieldDef>,
}

impl StructDef {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Catalog of struct layouts for one target build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructCatalog {
    structs: BTreeMap<String, StructDef>,
}

impl StructCatalog {
    /// Parse a catalog from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| XrefError::SchemaMissing(e.to_string()))
    }

    /// Load a catalog from a file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| XrefError::SchemaMissing(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// The catalog embedded with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Look up a struct layout.
    pub fn get(&self, name: &str) -> Result<&StructDef> {
        self.structs
            .get(name)
            .ok_or_else(|| XrefError::UnknownStruct(name.to_string()))
    }

    /// Verify that every struct the classifier needs is present.
    pub fn validate(&self) -> Result<()> {
        for &name in REQUIRED_STRUCTS {
            self.get(name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_complete() {
        let catalog = StructCatalog::builtin().unwrap();
        catalog.validate().unwrap();

        let xref = catalog.get("xref").unwrap();
        assert_eq!(xref.field("type").unwrap().offset, 8);
        assert_eq!(xref.field("file").unwrap().kind, FieldKind::Str);
        assert!(xref.field("uid").is_none());
    }

    #[test]
    fn test_parse_minimal_catalog() {
        let catalog = StructCatalog::from_json(
            r#"{ "xref": { "fields": [
                { "name": "type", "offset": 8, "size": 4, "kind": "uint" }
            ] } }"#,
        )
        .unwrap();

        let def = catalog.get("xref").unwrap();
        assert_eq!(def.fields.len(), 1);
        assert_eq!(def.field("type").unwrap().size, 4);
        assert!(catalog.get("xrefdata").is_err());
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_invalid_json_is_schema_missing() {
        let err = StructCatalog::from_json("not json").unwrap_err();
        assert!(matches!(err, XrefError::SchemaMissing(_)));
    }
}

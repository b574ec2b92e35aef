//! Schema-driven struct field decoding.
//!
//! A `StructView` binds one layout from the catalog to a concrete address
//! inside an image. Accessors are checked against the declared decode
//! kind of each field; this is ordinary table-driven parsing, the layout
//! table plays the role the original record definitions play at compile
//! time.

use crate::error::{Result, XrefError};
use crate::image::ElfImage;
use crate::schema::{FieldDef, FieldKind, StructCatalog, StructDef};

/// One struct layout bound to a base address.
pub struct StructView<'a, 'd> {
    image: &'a ElfImage<'d>,
    name: &'a str,
    def: &'a StructDef,
    base: u64,
}

impl<'a, 'd> StructView<'a, 'd> {
    /// Bind the named layout to a base address.
    pub fn new(
        image: &'a ElfImage<'d>,
        catalog: &'a StructCatalog,
        name: &'a str,
        base: u64,
    ) -> Result<Self> {
        let def = catalog.get(name)?;
        Ok(Self {
            image,
            name,
            def,
            base,
        })
    }

    fn field(&self, field: &str, kind: FieldKind, expected: &'static str) -> Result<&FieldDef> {
        let def = self
            .def
            .field(field)
            .ok_or_else(|| XrefError::UnknownField {
                name: self.name.to_string(),
                field: field.to_string(),
            })?;
        if def.kind != kind {
            return Err(XrefError::FieldKind {
                name: self.name.to_string(),
                field: field.to_string(),
                expected,
            });
        }
        Ok(def)
    }

    fn addr_of(&self, def: &FieldDef) -> u64 {
        self.base.wrapping_add(def.offset)
    }

    /// Unsigned integer field.
    pub fn uint(&self, field: &str) -> Result<u64> {
        let def = self.field(field, FieldKind::Uint, "an unsigned integer")?;
        let addr = self.addr_of(def);
        Ok(match def.size {
            1 => u64::from(self.image.read_at(addr, 1)?[0]),
            2 => u64::from(self.image.read_u16_at(addr)?),
            4 => u64::from(self.image.read_u32_at(addr)?),
            8 => self.image.read_u64_at(addr)?,
            size => {
                return Err(XrefError::FieldWidth {
                    name: self.name.to_string(),
                    field: field.to_string(),
                    size,
                })
            }
        })
    }

    /// Signed integer field.
    pub fn int(&self, field: &str) -> Result<i64> {
        let def = self.field(field, FieldKind::Int, "a signed integer")?;
        let addr = self.addr_of(def);
        Ok(match def.size {
            4 => i64::from(self.image.read_i32_at(addr)?),
            8 => self.image.read_u64_at(addr)? as i64,
            size => {
                return Err(XrefError::FieldWidth {
                    name: self.name.to_string(),
                    field: field.to_string(),
                    size,
                })
            }
        })
    }

    /// Pointer field. Width follows the image's word size.
    pub fn ptr(&self, field: &str) -> Result<u64> {
        let def = self.field(field, FieldKind::Ptr, "a pointer")?;
        Ok(self.image.read_word_at(self.addr_of(def))?)
    }

    /// String field: a pointer to null-terminated text. A null pointer
    /// yields `None`.
    pub fn cstr(&self, field: &str) -> Result<Option<String>> {
        let def = self.field(field, FieldKind::Str, "a string pointer")?;
        let target = self.image.read_word_at(self.addr_of(def))?;
        if target == 0 {
            return Ok(None);
        }
        Ok(Some(self.image.read_cstr_at(target)?.to_string()))
    }
}

/// Offset of the embedded generic record inside a container layout.
pub fn embedded_xref_offset(catalog: &StructCatalog, container: &str) -> Result<u64> {
    let def = catalog.get(container)?;
    let field = def.field("xref").ok_or_else(|| XrefError::UnknownField {
        name: container.to_string(),
        field: "xref".to_string(),
    })?;
    if field.kind != FieldKind::Struct {
        return Err(XrefError::FieldKind {
            name: container.to_string(),
            field: "xref".to_string(),
            expected: "an embedded struct",
        });
    }
    Ok(field.offset)
}

//! Read-only ELF image accessor
//!
//! Exposes exactly what xref extraction needs: word size and endianness,
//! named section lookup, note lookup by (owner, type), and bounds-checked
//! reads at virtual addresses. Addresses come out of the binary being
//! inspected and are untrusted; a garbage pointer surfaces as
//! `UnmappedAddress`, never a panic.

pub mod headers;
pub mod notes;
pub mod sections;
pub mod types;
pub mod utils;

use sections::SectionTable;
pub use types::{ElfClass, ElfData, ImageError};
use types::{Result, SHT_NOBITS, SHT_NOTE};
use utils::EndianRead;

/// An addressed byte range inside the image
#[derive(Debug, Clone, Copy)]
pub struct ByteRange {
    pub addr: u64,
    pub size: u64,
}

/// Parsed ELF image with section-based address resolution
pub struct ElfImage<'d> {
    header: types::ElfHeader,
    sections: SectionTable<'d>,
}

impl<'d> ElfImage<'d> {
    /// Parse an ELF image from raw bytes
    pub fn parse(data: &'d [u8]) -> Result<Self> {
        let header = headers::parse_header(data)?;
        let sections = SectionTable::parse(data, &header)?;
        Ok(Self { header, sections })
    }

    /// ELF class of the image
    pub fn class(&self) -> ElfClass {
        self.header.ident.class
    }

    /// Byte order of the image
    pub fn endianness(&self) -> ElfData {
        self.header.ident.data
    }

    /// Pointer width in bytes
    pub fn word_size(&self) -> usize {
        self.class().word_size()
    }

    /// Locate a named section
    pub fn find_section(&self, name: &str) -> Option<ByteRange> {
        self.sections.by_name(name).map(|s| ByteRange {
            addr: s.header.sh_addr,
            size: s.header.sh_size,
        })
    }

    /// Locate a note descriptor by owner name and type
    pub fn find_note(&self, owner: &str, n_type: u32) -> Result<Option<ByteRange>> {
        for section in self
            .sections
            .sections()
            .filter(|s| s.header.sh_type == SHT_NOTE)
        {
            for note in notes::parse_notes(section.data, self.endianness())? {
                if note.name == owner && note.n_type == n_type {
                    return Ok(Some(ByteRange {
                        addr: section.header.sh_addr + note.desc_offset as u64,
                        size: note.desc.len() as u64,
                    }));
                }
            }
        }
        Ok(None)
    }

    /// Read `len` bytes at a virtual address
    pub fn read_at(&self, addr: u64, len: usize) -> Result<&'d [u8]> {
        let section = self
            .sections
            .containing_addr(addr, len)
            .filter(|s| s.header.sh_type != SHT_NOBITS)
            .ok_or(ImageError::UnmappedAddress { addr, len })?;

        let start = (addr - section.header.sh_addr) as usize;
        start
            .checked_add(len)
            .and_then(|end| section.data.get(start..end))
            .ok_or(ImageError::UnmappedAddress { addr, len })
    }

    /// Read a pointer-sized value at a virtual address
    pub fn read_word_at(&self, addr: u64) -> Result<u64> {
        let bytes = self.read_at(addr, self.word_size())?;
        utils::read_addr(bytes, 0, self.class(), self.endianness())
    }

    /// Read a u16 at a virtual address
    pub fn read_u16_at(&self, addr: u64) -> Result<u16> {
        self.read_at(addr, 2)?.read_u16(0, self.endianness())
    }

    /// Read a u32 at a virtual address
    pub fn read_u32_at(&self, addr: u64) -> Result<u32> {
        self.read_at(addr, 4)?.read_u32(0, self.endianness())
    }

    /// Read a u64 at a virtual address
    pub fn read_u64_at(&self, addr: u64) -> Result<u64> {
        self.read_at(addr, 8)?.read_u64(0, self.endianness())
    }

    /// Read an i32 at a virtual address
    pub fn read_i32_at(&self, addr: u64) -> Result<i32> {
        self.read_at(addr, 4)?.read_i32(0, self.endianness())
    }

    /// Read a null-terminated string at a virtual address. The string may
    /// run up to the end of its section.
    pub fn read_cstr_at(&self, addr: u64) -> Result<&'d str> {
        let section = self
            .sections
            .containing_addr(addr, 1)
            .filter(|s| s.header.sh_type != SHT_NOBITS)
            .ok_or(ImageError::UnmappedAddress { addr, len: 1 })?;

        let start = (addr - section.header.sh_addr) as usize;
        utils::read_cstring(section.data, start)
    }
}

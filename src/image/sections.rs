//! Section table with name and address lookup

use std::collections::HashMap;

use crate::image::types::*;
use crate::image::utils::{read_cstring, EndianRead};

/// Section table for efficient section lookup
pub struct SectionTable<'a> {
    headers: Vec<SectionHeader>,
    strings: &'a [u8],
    data: &'a [u8],
    by_name: HashMap<String, usize>,
}

/// One section with its resolved name and file bytes
pub struct Section<'a> {
    pub header: SectionHeader,
    pub name: &'a str,
    pub data: &'a [u8],
}

impl<'a> SectionTable<'a> {
    /// Parse the section table from ELF data
    pub fn parse(data: &'a [u8], header: &ElfHeader) -> Result<Self> {
        let sh_offset = header.e_shoff as usize;
        let sh_entsize = header.e_shentsize as usize;
        let sh_num = header.e_shnum as usize;

        if sh_num == 0 || sh_offset == 0 {
            return Ok(Self {
                headers: Vec::new(),
                strings: &[],
                data,
                by_name: HashMap::new(),
            });
        }

        let total_size = sh_num * sh_entsize;
        if sh_offset + total_size > data.len() {
            return Err(ImageError::Truncated {
                offset: sh_offset,
                needed: total_size,
            });
        }

        let mut headers = Vec::with_capacity(sh_num);
        for i in 0..sh_num {
            let offset = sh_offset + i * sh_entsize;
            headers.push(parse_section_header(
                data,
                offset,
                header.ident.class,
                header.ident.data,
            )?);
        }

        // string table for section names
        let shstrndx = header.e_shstrndx as usize;
        let strings = match headers.get(shstrndx) {
            Some(h) => {
                let offset = h.sh_offset as usize;
                let size = h.sh_size as usize;
                offset
                    .checked_add(size)
                    .and_then(|end| data.get(offset..end))
                    .unwrap_or(&[])
            }
            None => &[],
        };

        let mut by_name = HashMap::new();
        for (i, sh) in headers.iter().enumerate() {
            if let Ok(name) = read_cstring(strings, sh.sh_name as usize) {
                by_name.insert(name.to_string(), i);
            }
        }

        Ok(Self {
            headers,
            strings,
            data,
            by_name,
        })
    }

    /// Get a section by name
    pub fn by_name(&self, name: &str) -> Option<Section<'a>> {
        self.by_name.get(name).and_then(|&idx| self.by_index(idx))
    }

    /// Get a section by index
    pub fn by_index(&self, index: usize) -> Option<Section<'a>> {
        self.headers.get(index).map(|header| {
            let name = read_cstring(self.strings, header.sh_name as usize).unwrap_or("");
            let offset = header.sh_offset as usize;
            let size = header.sh_size as usize;
            let data = offset
                .checked_add(size)
                .and_then(|end| self.data.get(offset..end))
                .unwrap_or(&[]);
            Section {
                header: *header,
                name,
                data,
            }
        })
    }

    /// Find the allocated section whose address range covers
    /// `[addr, addr + len)` entirely.
    pub fn containing_addr(&self, addr: u64, len: usize) -> Option<Section<'a>> {
        let end = addr.checked_add(len as u64)?;
        for (i, h) in self.headers.iter().enumerate() {
            if h.sh_addr == 0 {
                continue;
            }
            let sh_end = match h.sh_addr.checked_add(h.sh_size) {
                Some(e) => e,
                None => continue,
            };
            if h.sh_addr <= addr && end <= sh_end {
                return self.by_index(i);
            }
        }
        None
    }

    /// Iterate over all sections
    pub fn sections(&self) -> impl Iterator<Item = Section<'a>> + '_ {
        (0..self.headers.len()).filter_map(move |i| self.by_index(i))
    }

    /// Number of sections
    pub fn count(&self) -> usize {
        self.headers.len()
    }
}

/// Parse a single section header
fn parse_section_header(
    data: &[u8],
    offset: usize,
    class: ElfClass,
    endian: ElfData,
) -> Result<SectionHeader> {
    match class {
        ElfClass::Elf32 => Ok(SectionHeader {
            sh_name: data.read_u32(offset, endian)?,
            sh_type: data.read_u32(offset + 4, endian)?,
            sh_flags: data.read_u32(offset + 8, endian)? as u64,
            sh_addr: data.read_u32(offset + 12, endian)? as u64,
            sh_offset: data.read_u32(offset + 16, endian)? as u64,
            sh_size: data.read_u32(offset + 20, endian)? as u64,
            sh_link: data.read_u32(offset + 24, endian)?,
            sh_info: data.read_u32(offset + 28, endian)?,
            sh_addralign: data.read_u32(offset + 32, endian)? as u64,
            sh_entsize: data.read_u32(offset + 36, endian)? as u64,
        }),
        ElfClass::Elf64 => Ok(SectionHeader {
            sh_name: data.read_u32(offset, endian)?,
            sh_type: data.read_u32(offset + 4, endian)?,
            sh_flags: data.read_u64(offset + 8, endian)?,
            sh_addr: data.read_u64(offset + 16, endian)?,
            sh_offset: data.read_u64(offset + 24, endian)?,
            sh_size: data.read_u64(offset + 32, endian)?,
            sh_link: data.read_u32(offset + 40, endian)?,
            sh_info: data.read_u32(offset + 44, endian)?,
            sh_addralign: data.read_u64(offset + 48, endian)?,
            sh_entsize: data.read_u64(offset + 56, endian)?,
        }),
    }
}

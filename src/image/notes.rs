//! Note section walking
//!
//! Xref discovery needs the location of a note's descriptor, not just its
//! bytes, so each entry carries its descriptor offset within the section.

use crate::image::types::{ElfData, Result};
use crate::image::utils::{align_up, EndianRead};

/// One note entry
pub struct Note<'a> {
    pub n_type: u32,
    pub name: &'a str,
    pub desc: &'a [u8],
    /// Offset of the descriptor from the start of the section
    pub desc_offset: usize,
}

/// Parse all note entries from a note section's bytes
pub fn parse_notes(data: &[u8], endian: ElfData) -> Result<Vec<Note<'_>>> {
    let mut notes = Vec::new();
    let mut offset = 0;

    while offset + 12 <= data.len() {
        let n_namesz = data.read_u32(offset, endian)? as usize;
        let n_descsz = data.read_u32(offset + 4, endian)? as usize;
        let n_type = data.read_u32(offset + 8, endian)?;

        offset += 12;

        // name, padded to 4 bytes
        let name_end = match offset.checked_add(n_namesz) {
            Some(e) if e <= data.len() => e,
            _ => break,
        };
        let name_bytes = &data[offset..name_end];
        let len = name_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(name_bytes.len());
        let name = std::str::from_utf8(&name_bytes[..len]).unwrap_or("");

        offset = align_up(name_end, 4);

        // descriptor, padded to 4 bytes
        let desc_end = match offset.checked_add(n_descsz) {
            Some(e) if e <= data.len() => e,
            _ => break,
        };
        let desc = &data[offset..desc_end];
        let desc_offset = offset;

        offset = align_up(desc_end, 4);

        notes.push(Note {
            n_type,
            name,
            desc,
            desc_offset,
        });
    }

    Ok(notes)
}

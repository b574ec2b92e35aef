//! ELF header parsing

use crate::image::types::*;
use crate::image::utils::EndianRead;

/// Parse ELF identification bytes
pub fn parse_ident(data: &[u8]) -> Result<ElfIdent> {
    if data.len() < 16 {
        return Err(ImageError::Truncated {
            offset: 0,
            needed: 16,
        });
    }

    if &data[0..4] != ELF_MAGIC {
        return Err(ImageError::InvalidMagic);
    }

    let class = ElfClass::from_u8(data[4])?;
    let data_encoding = ElfData::from_u8(data[5])?;

    Ok(ElfIdent {
        class,
        data: data_encoding,
        version: data[6],
        osabi: data[7],
        abiversion: data[8],
    })
}

/// Parse the ELF file header
pub fn parse_header(data: &[u8]) -> Result<ElfHeader> {
    let ident = parse_ident(data)?;

    let header_size = match ident.class {
        ElfClass::Elf32 => 52,
        ElfClass::Elf64 => 64,
    };
    if data.len() < header_size {
        return Err(ImageError::Truncated {
            offset: 0,
            needed: header_size,
        });
    }

    let endian = ident.data;

    let e_type = data.read_u16(16, endian)?;
    let e_machine = data.read_u16(18, endian)?;
    let e_version = data.read_u32(20, endian)?;

    let header = match ident.class {
        ElfClass::Elf32 => ElfHeader {
            ident,
            e_type,
            e_machine,
            e_version,
            e_entry: data.read_u32(24, endian)? as u64,
            e_phoff: data.read_u32(28, endian)? as u64,
            e_shoff: data.read_u32(32, endian)? as u64,
            e_flags: data.read_u32(36, endian)?,
            e_ehsize: data.read_u16(40, endian)?,
            e_phentsize: data.read_u16(42, endian)?,
            e_phnum: data.read_u16(44, endian)?,
            e_shentsize: data.read_u16(46, endian)?,
            e_shnum: data.read_u16(48, endian)?,
            e_shstrndx: data.read_u16(50, endian)?,
        },
        ElfClass::Elf64 => ElfHeader {
            ident,
            e_type,
            e_machine,
            e_version,
            e_entry: data.read_u64(24, endian)?,
            e_phoff: data.read_u64(32, endian)?,
            e_shoff: data.read_u64(40, endian)?,
            e_flags: data.read_u32(48, endian)?,
            e_ehsize: data.read_u16(52, endian)?,
            e_phentsize: data.read_u16(54, endian)?,
            e_phnum: data.read_u16(56, endian)?,
            e_shentsize: data.read_u16(58, endian)?,
            e_shnum: data.read_u16(60, endian)?,
            e_shstrndx: data.read_u16(62, endian)?,
        },
    };

    let expected_shentsize = match ident.class {
        ElfClass::Elf32 => 40,
        ElfClass::Elf64 => 64,
    };
    if header.e_shnum > 0 && header.e_shentsize as usize != expected_shentsize {
        return Err(ImageError::MalformedHeader(format!(
            "Invalid e_shentsize: expected {}, got {}",
            expected_shentsize, header.e_shentsize
        )));
    }

    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_elf64_header() -> Vec<u8> {
        let mut data = vec![0u8; 64];
        data[0..4].copy_from_slice(b"\x7fELF");
        data[4] = 2; // ELFCLASS64
        data[5] = 1; // ELFDATA2LSB
        data[6] = 1; // EV_CURRENT

        // e_type = ET_DYN
        data[16] = 3;
        // e_machine = EM_X86_64
        data[18] = 62;
        // e_version = 1
        data[20] = 1;
        // e_ehsize = 64
        data[52] = 64;
        // e_shentsize = 64
        data[58] = 64;

        data
    }

    #[test]
    fn test_parse_ident() {
        let data = minimal_elf64_header();
        let ident = parse_ident(&data).unwrap();
        assert_eq!(ident.class, ElfClass::Elf64);
        assert_eq!(ident.data, ElfData::Little);
        assert_eq!(ident.version, 1);
    }

    #[test]
    fn test_parse_elf64_header() {
        let data = minimal_elf64_header();
        let header = parse_header(&data).unwrap();
        assert_eq!(header.e_type, 3);
        assert_eq!(header.e_machine, 62);
        assert_eq!(header.e_shnum, 0);
    }

    #[test]
    fn test_invalid_magic() {
        let mut data = minimal_elf64_header();
        data[0] = 0xFF;
        assert!(matches!(parse_header(&data), Err(ImageError::InvalidMagic)));
    }

    #[test]
    fn test_truncated_header() {
        let data = vec![0x7f, b'E', b'L', b'F'];
        assert!(matches!(
            parse_ident(&data),
            Err(ImageError::Truncated { .. })
        ));
    }

    #[test]
    fn test_bad_shentsize() {
        let mut data = minimal_elf64_header();
        // one section claimed with a bogus entry size
        data[60] = 1;
        data[58] = 32;
        assert!(matches!(
            parse_header(&data),
            Err(ImageError::MalformedHeader(_))
        ));
    }
}

//! Per-file extraction: sniffing, discovery, and the table walk.
//!
//! Inputs may be ELF binaries, libtool artifacts pointing at a real
//! shared object under `.libs/`, or previously serialized snapshots.
//! Discovery probes the xref note first and falls back to the named
//! section; the pointer table is then walked slot by slot through the
//! classifier.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use crate::error::{Result, XrefError};
use crate::image::ElfImage;
use crate::lint::LintSource;
use crate::record::{Classified, Classifier};
use crate::schema::StructCatalog;
use crate::store::XrefStore;

/// Note owner marking the xref pointer table.
pub const XREF_NOTE_OWNER: &str = "FRRouting";
/// Note type marking the xref pointer table ("XREF" as a type word).
pub const XREF_NOTE_TYPE: u32 = 0x4645_5258;

/// Everything one input contributes: a partial store plus the occurrences
/// eligible for linting. Snapshot inputs contribute no lint candidates.
#[derive(Debug, Default)]
pub struct ExtractOutcome {
    pub store: XrefStore,
    pub lintable: Vec<LintSource>,
}

/// Load one input file, following libtool indirections, and extract its
/// contribution.
pub fn load_file(path: &Path, catalog: &StructCatalog) -> Result<ExtractOutcome> {
    let mut filename = libtool_redirect(path);

    loop {
        let mut fd = File::open(&filename)?;
        let mut magic = [0u8; 4];
        let got = fd.read(&mut magic)?;

        if got == 4 && &magic == b"\x7fELF" {
            let map = unsafe { Mmap::map(&fd)? };
            return extract_elf(&map, catalog);
        }
        if got >= 2 && &magic[..2] == b"#!" {
            // libtool wrapper script, the real object sits in .libs
            filename = libs_sibling(&filename, None);
            continue;
        }
        if got >= 1 && magic[0] == b'{' {
            drop(fd);
            let text = std::fs::read(&filename)?;
            let snapshot: XrefStore = serde_json::from_slice(&text)?;
            return Ok(ExtractOutcome {
                store: snapshot,
                lintable: Vec::new(),
            });
        }
        return Err(XrefError::UnrecognizedFileType { path: filename });
    }
}

/// Map `libfoo.la` to `.libs/libfoo.so` next to it.
fn libtool_redirect(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == "la" => libs_sibling(path, Some("so")),
        _ => path.to_path_buf(),
    }
}

/// Sibling path under `.libs/`, optionally swapping the extension.
fn libs_sibling(path: &Path, replace_ext: Option<&str>) -> PathBuf {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let name = match replace_ext {
        Some(ext) => {
            let mut stem = path.file_stem().unwrap_or_default().to_os_string();
            stem.push(".");
            stem.push(ext);
            stem
        }
        None => path.file_name().unwrap_or_default().to_os_string(),
    };
    dir.join(".libs").join(name)
}

/// Extract every record from an ELF image.
pub fn extract_elf(data: &[u8], catalog: &StructCatalog) -> Result<ExtractOutcome> {
    let image = ElfImage::parse(data)?;
    let (start, end) = discover_table(&image)?;
    debug!(start, end, "xref table");

    let word = image.word_size() as u64;
    let classifier = Classifier::new(&image, catalog);
    let mut out = ExtractOutcome::default();

    let mut slot = start;
    while slot < end && end - slot >= word {
        let classified = classifier.classify_slot(slot)?;
        if let Classified::Log(msg) = &classified {
            out.lintable.push(LintSource {
                file: msg.xref.file.clone(),
                line: msg.xref.line,
                func: msg.xref.func.clone(),
                fmtstring: msg.fmtstring.clone(),
            });
        }
        classified.contribute(&mut out.store);
        slot += word;
    }
    Ok(out)
}

/// Locate the pointer table: the note is authoritative, the named section
/// is the fallback for older emitters.
fn discover_table(image: &ElfImage) -> Result<(u64, u64)> {
    let word = image.word_size() as u64;

    if let Some(note) = image.find_note(XREF_NOTE_OWNER, XREF_NOTE_TYPE)? {
        // the descriptor holds two words positioning the table relative
        // to the descriptor itself; the end word is anchored one word
        // further in
        let rel_start = image.read_word_at(note.addr)?;
        let rel_end = image.read_word_at(note.addr + word)?;
        let start = note.addr.wrapping_add(rel_start);
        let end = note.addr.wrapping_add(rel_end).wrapping_add(word);
        return Ok((start, end));
    }

    if let Some(section) = image.find_section("xref_array") {
        return Ok((section.addr, section.addr + section.size));
    }

    Err(XrefError::NoXrefTable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_libtool_redirect() {
        assert_eq!(
            libtool_redirect(Path::new("lib/libfrr.la")),
            Path::new("lib/.libs/libfrr.so")
        );
        assert_eq!(
            libtool_redirect(Path::new("lib/zebra")),
            Path::new("lib/zebra")
        );
    }

    #[test]
    fn test_libs_sibling_keeps_name() {
        assert_eq!(
            libs_sibling(Path::new("tools/frr-reload"), None),
            Path::new("tools/.libs/frr-reload")
        );
        assert_eq!(libs_sibling(Path::new("bare"), None), Path::new(".libs/bare"));
    }
}

//! Output rendering and atomic writes.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::record::SEVERITY;
use crate::store::XrefStore;

/// Serialize `value` as pretty JSON to `path`, going through a temporary
/// sibling so concurrent readers never observe a partial document.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let fd = fs::File::create(&tmp)?;
    let mut writer = BufWriter::new(fd);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// One line per aggregated log occurrence, in identity order.
pub fn render_dump(store: &XrefStore) -> String {
    let mut out = String::new();
    for (uid, occurrences) in &store.refs {
        for occurrence in occurrences {
            let site = format!(
                "{}:{} {}()",
                occurrence.file, occurrence.line, occurrence.func
            );
            let severity = SEVERITY[(occurrence.priority & 7) as usize];
            out.push_str(&format!(
                "{:<60} {}  {:<25} [EC {}] {}\n",
                site,
                severity,
                uid,
                occurrence.ec.unwrap_or(0),
                occurrence.fmtstring
            ));
        }
    }
    out
}

/// Report identities whose occurrences disagree on the format string.
pub fn render_inconsistent(uids: &[&str], color: bool) -> String {
    let mut out = String::new();
    for uid in uids {
        if color {
            out.push_str(&format!("\x1b[31;1m{uid}\x1b[m\n"));
        } else {
            out.push_str(&format!("{uid}\n"));
        }
    }
    out
}

//! Xref record model, classification, and store contribution.
//!
//! A table slot points at a generic record; the record's discriminant
//! selects the container struct it is embedded in. The variant set is
//! fixed and versioned, so dispatch is an exhaustive match and unknown
//! discriminants fall through to `Unclassified`.

use tracing::trace;

use crate::decode::{embedded_xref_offset, StructView};
use crate::error::Result;
use crate::image::ElfImage;
use crate::schema::StructCatalog;
use crate::store::{CmdAttr, Location, LogFlag, LogRef, RefKind, XrefStore};
use crate::uid::uidhash;

/// Discriminant values for the known record kinds.
pub const XREFT_THREADSCHED: u32 = 0x100;
pub const XREFT_LOGMSG: u32 = 0x200;
pub const XREFT_DEFUN: u32 = 0x300;
pub const XREFT_INSTALL_ELEMENT: u32 = 0x301;

/// Severity display table indexed by the low three priority bits.
pub const SEVERITY: [char; 8] = ['0', '1', '2', 'E', 'W', 'N', 'I', 'D'];

/// Generic record shared by every kind.
#[derive(Debug, Clone)]
pub struct Xref {
    pub typ: u32,
    pub file: String,
    pub line: i64,
    pub func: String,
    pub data: Option<Xrefdata>,
}

/// Deduplication payload attached to hashable records.
///
/// The identity slot inside the binary is always zero at rest; the real
/// identity is derived from the owning record's origin and this payload.
#[derive(Debug, Clone)]
pub struct Xrefdata {
    pub hashstr: Option<String>,
    pub hashu32: (u32, u32),
}

impl Xref {
    /// Content-derived identity, when the record carries hash input.
    pub fn uid(&self) -> Option<String> {
        let data = self.data.as_ref()?;
        let hashstr = data.hashstr.as_deref()?;
        Some(uidhash(&self.file, hashstr, data.hashu32.0, data.hashu32.1))
    }

    /// Origin of this record as a store location.
    pub fn location(&self) -> Location {
        Location {
            file: self.file.clone(),
            func: self.func.clone(),
            line: self.line,
        }
    }
}

/// A record resolved to its concrete kind.
#[derive(Debug, Clone)]
pub enum Classified {
    Log(LogMsg),
    ThreadSched(ThreadSched),
    CmdDef(CmdDef),
    CmdInstall(CmdInstall),
    /// Unknown discriminant, ignored for forward compatibility
    Unclassified,
}

impl Classified {
    /// Fold this occurrence into the aggregate store.
    pub fn contribute(&self, store: &mut XrefStore) {
        match self {
            Classified::Log(m) => m.contribute(store),
            Classified::CmdDef(d) => d.contribute(store),
            Classified::CmdInstall(i) => i.contribute(store),
            // scheduling records carry no aggregate payload
            Classified::ThreadSched(_) | Classified::Unclassified => {}
        }
    }
}

/// Log message call site.
#[derive(Debug, Clone)]
pub struct LogMsg {
    pub xref: Xref,
    pub fmtstring: String,
    pub priority: u32,
    pub ec: u32,
}

impl LogMsg {
    /// Occurrence descriptor for the aggregate store. The packed priority
    /// byte splits into the severity level (low three bits) and the
    /// decoration flags (0x10 errno, 0x20 getaddrinfo).
    pub fn occurrence(&self) -> LogRef {
        let mut flags = Vec::new();
        if self.priority & 0x10 != 0 {
            flags.push(LogFlag::Errno);
        }
        if self.priority & 0x20 != 0 {
            flags.push(LogFlag::Getaddrinfo);
        }
        LogRef {
            ec: (self.ec != 0).then_some(self.ec),
            file: self.xref.file.clone(),
            flags,
            fmtstring: self.fmtstring.clone(),
            func: self.xref.func.clone(),
            line: self.xref.line,
            priority: (self.priority & 7) as u8,
            kind: RefKind::Logmsg,
        }
    }

    fn contribute(&self, store: &mut XrefStore) {
        match self.xref.uid() {
            Some(uid) => store.add_ref(uid, self.occurrence()),
            None => trace!(
                file = %self.xref.file,
                line = self.xref.line,
                "log xref without hash input, skipped"
            ),
        }
    }
}

/// Background task scheduling site. Decoded for trace logging only.
#[derive(Debug, Clone)]
pub struct ThreadSched {
    pub xref: Xref,
    pub funcname: Option<String>,
}

/// CLI command definition.
#[derive(Debug, Clone)]
pub struct CmdDef {
    pub xref: Xref,
    pub name: String,
    pub string: Option<String>,
    pub doc: Option<String>,
    pub attr: u32,
}

impl CmdDef {
    fn contribute(&self, store: &mut XrefStore) {
        store.define_command(
            &self.name,
            self.string.clone(),
            self.doc.clone(),
            CmdAttr::from_raw(self.attr),
            self.xref.location(),
        );
    }
}

/// CLI command installation into a node.
#[derive(Debug, Clone)]
pub struct CmdInstall {
    pub xref: Xref,
    pub cmd_name: String,
    pub node_type: i64,
}

impl CmdInstall {
    fn contribute(&self, store: &mut XrefStore) {
        store.install_command(&self.cmd_name, self.node_type, self.xref.location());
    }
}

/// Resolves raw pointer slots into classified records.
pub struct Classifier<'a, 'd> {
    image: &'a ElfImage<'d>,
    catalog: &'a StructCatalog,
}

impl<'a, 'd> Classifier<'a, 'd> {
    pub fn new(image: &'a ElfImage<'d>, catalog: &'a StructCatalog) -> Self {
        Self { image, catalog }
    }

    /// Classify the record behind one pointer-sized table slot.
    pub fn classify_slot(&self, slot_addr: u64) -> Result<Classified> {
        let xref_addr = self.image.read_word_at(slot_addr)?;
        self.classify(xref_addr)
    }

    /// Classify the generic record at `xref_addr`.
    pub fn classify(&self, xref_addr: u64) -> Result<Classified> {
        let v = StructView::new(self.image, self.catalog, "xref", xref_addr)?;
        let typ = v.uint("type")? as u32;
        let line = v.int("line")?;
        let file = v.cstr("file")?.unwrap_or_default();
        let func = v.cstr("func")?.unwrap_or_default();

        let data_ptr = v.ptr("xrefdata")?;
        let data = if data_ptr != 0 {
            Some(self.read_xrefdata(data_ptr)?)
        } else {
            None
        };

        let xref = Xref {
            typ,
            file,
            line,
            func,
            data,
        };
        match typ {
            XREFT_LOGMSG => self.read_logmsg(xref_addr, xref).map(Classified::Log),
            XREFT_THREADSCHED => self
                .read_threadsched(xref_addr, xref)
                .map(Classified::ThreadSched),
            XREFT_DEFUN => self.read_cmddef(xref_addr, xref).map(Classified::CmdDef),
            XREFT_INSTALL_ELEMENT => self
                .read_install(xref_addr, xref)
                .map(Classified::CmdInstall),
            _ => Ok(Classified::Unclassified),
        }
    }

    /// View of the container struct holding the record at `xref_addr`.
    fn container_view(&self, name: &'a str, xref_addr: u64) -> Result<StructView<'a, 'd>> {
        let base = xref_addr.wrapping_sub(embedded_xref_offset(self.catalog, name)?);
        StructView::new(self.image, self.catalog, name, base)
    }

    fn read_xrefdata(&self, addr: u64) -> Result<Xrefdata> {
        let v = StructView::new(self.image, self.catalog, "xrefdata", addr)?;
        Ok(Xrefdata {
            hashstr: v.cstr("hashstr")?,
            hashu32: (v.uint("hashu32_0")? as u32, v.uint("hashu32_1")? as u32),
        })
    }

    fn read_logmsg(&self, xref_addr: u64, xref: Xref) -> Result<LogMsg> {
        let v = self.container_view("xref_logmsg", xref_addr)?;
        Ok(LogMsg {
            fmtstring: v.cstr("fmtstring")?.unwrap_or_default(),
            priority: v.uint("priority")? as u32,
            ec: v.uint("ec")? as u32,
            xref,
        })
    }

    fn read_threadsched(&self, xref_addr: u64, xref: Xref) -> Result<ThreadSched> {
        let v = self.container_view("xref_threadsched", xref_addr)?;
        let funcname = v.cstr("funcname")?;
        if let Some(name) = &funcname {
            trace!(
                callback = %name,
                file = %xref.file,
                line = xref.line,
                "thread scheduling xref"
            );
        }
        Ok(ThreadSched { xref, funcname })
    }

    fn read_cmddef(&self, xref_addr: u64, xref: Xref) -> Result<CmdDef> {
        let v = self.container_view("cmd_element", xref_addr)?;
        Ok(CmdDef {
            name: v.cstr("name")?.unwrap_or_default(),
            string: v.cstr("string")?,
            doc: v.cstr("doc")?,
            attr: v.uint("attr")? as u32,
            xref,
        })
    }

    fn read_install(&self, xref_addr: u64, xref: Xref) -> Result<CmdInstall> {
        let v = self.container_view("xref_install_element", xref_addr)?;
        let cmd_addr = v.ptr("cmd_element")?;
        // the command name lives in the linked definition struct
        let cmd = StructView::new(self.image, self.catalog, "cmd_element", cmd_addr)?;
        Ok(CmdInstall {
            cmd_name: cmd.cstr("name")?.unwrap_or_default(),
            node_type: v.uint("node_type")? as i64,
            xref,
        })
    }
}

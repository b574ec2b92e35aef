//! Synthetic ELF fixtures for extraction tests.
//!
//! Builds minimal ELF images byte by byte, parameterized over class and
//! byte order, with an arena that lays out xref records the way the
//! toolchain emits them.

#![allow(dead_code)]

pub const SHT_PROGBITS: u32 = 1;
pub const SHT_NOTE: u32 = 7;

/// One section to place into a synthetic image.
pub struct SectionSpec {
    pub name: &'static str,
    pub sh_type: u32,
    pub addr: u64,
    pub data: Vec<u8>,
}

fn set_u16(buf: &mut [u8], at: usize, v: u16, big: bool) {
    let bytes = if big { v.to_be_bytes() } else { v.to_le_bytes() };
    buf[at..at + 2].copy_from_slice(&bytes);
}

fn set_u32(buf: &mut [u8], at: usize, v: u32, big: bool) {
    let bytes = if big { v.to_be_bytes() } else { v.to_le_bytes() };
    buf[at..at + 4].copy_from_slice(&bytes);
}

fn set_u64(buf: &mut [u8], at: usize, v: u64, big: bool) {
    let bytes = if big { v.to_be_bytes() } else { v.to_le_bytes() };
    buf[at..at + 8].copy_from_slice(&bytes);
}

fn push_u32(buf: &mut Vec<u8>, v: u32, big: bool) {
    buf.extend_from_slice(&if big { v.to_be_bytes() } else { v.to_le_bytes() });
}

fn push_u64(buf: &mut Vec<u8>, v: u64, big: bool) {
    buf.extend_from_slice(&if big { v.to_be_bytes() } else { v.to_le_bytes() });
}

#[allow(clippy::too_many_arguments)]
fn push_shdr(
    buf: &mut Vec<u8>,
    class64: bool,
    big: bool,
    name: u32,
    sh_type: u32,
    flags: u64,
    addr: u64,
    offset: u64,
    size: u64,
) {
    if class64 {
        push_u32(buf, name, big);
        push_u32(buf, sh_type, big);
        push_u64(buf, flags, big);
        push_u64(buf, addr, big);
        push_u64(buf, offset, big);
        push_u64(buf, size, big);
        push_u32(buf, 0, big); // sh_link
        push_u32(buf, 0, big); // sh_info
        push_u64(buf, 0, big); // sh_addralign
        push_u64(buf, 0, big); // sh_entsize
    } else {
        push_u32(buf, name, big);
        push_u32(buf, sh_type, big);
        push_u32(buf, flags as u32, big);
        push_u32(buf, addr as u32, big);
        push_u32(buf, offset as u32, big);
        push_u32(buf, size as u32, big);
        push_u32(buf, 0, big);
        push_u32(buf, 0, big);
        push_u32(buf, 0, big);
        push_u32(buf, 0, big);
    }
}

/// Assemble an ELF image containing the given sections plus the implied
/// null section and section name string table.
pub fn build_elf(class64: bool, big: bool, sections: &[SectionSpec]) -> Vec<u8> {
    let ehsize = if class64 { 64usize } else { 52 };
    let shentsize = if class64 { 64u16 } else { 40 };

    let mut strtab = vec![0u8];
    let mut name_offs = Vec::new();
    for s in sections {
        name_offs.push(strtab.len() as u32);
        strtab.extend_from_slice(s.name.as_bytes());
        strtab.push(0);
    }
    let shstrtab_name = strtab.len() as u32;
    strtab.extend_from_slice(b".shstrtab\0");

    let mut buf = vec![0u8; ehsize];

    let mut data_locs = Vec::new();
    for s in sections {
        while buf.len() % 8 != 0 {
            buf.push(0);
        }
        data_locs.push((buf.len() as u64, s.data.len() as u64));
        buf.extend_from_slice(&s.data);
    }
    while buf.len() % 8 != 0 {
        buf.push(0);
    }
    let strtab_off = buf.len() as u64;
    buf.extend_from_slice(&strtab);
    while buf.len() % 8 != 0 {
        buf.push(0);
    }
    let shoff = buf.len() as u64;

    let shnum = sections.len() as u16 + 2;
    push_shdr(&mut buf, class64, big, 0, 0, 0, 0, 0, 0);
    for (i, s) in sections.iter().enumerate() {
        push_shdr(
            &mut buf,
            class64,
            big,
            name_offs[i],
            s.sh_type,
            2, // SHF_ALLOC
            s.addr,
            data_locs[i].0,
            data_locs[i].1,
        );
    }
    push_shdr(
        &mut buf,
        class64,
        big,
        shstrtab_name,
        3, // SHT_STRTAB
        0,
        0,
        strtab_off,
        strtab.len() as u64,
    );

    buf[0..4].copy_from_slice(b"\x7fELF");
    buf[4] = if class64 { 2 } else { 1 };
    buf[5] = if big { 2 } else { 1 };
    buf[6] = 1;
    set_u16(&mut buf, 16, 3, big); // ET_DYN
    set_u32(&mut buf, 20, 1, big);
    if class64 {
        set_u64(&mut buf, 40, shoff, big);
        set_u16(&mut buf, 52, 64, big);
        set_u16(&mut buf, 58, shentsize, big);
        set_u16(&mut buf, 60, shnum, big);
        set_u16(&mut buf, 62, shnum - 1, big);
    } else {
        set_u32(&mut buf, 32, shoff as u32, big);
        set_u16(&mut buf, 40, 52, big);
        set_u16(&mut buf, 46, shentsize, big);
        set_u16(&mut buf, 48, shnum, big);
        set_u16(&mut buf, 50, shnum - 1, big);
    }

    buf
}

/// Bytes of a note section holding the xref table note. The descriptor
/// positions the table relative to the descriptor's own address.
pub fn xref_note(class64: bool, big: bool, note_addr: u64, table_start: u64, table_end: u64) -> Vec<u8> {
    let word = if class64 { 8u64 } else { 4 };
    let mut buf = Vec::new();
    push_u32(&mut buf, 10, big); // namesz, "FRRouting\0"
    push_u32(&mut buf, 2 * word as u32, big); // descsz
    push_u32(&mut buf, 0x4645_5258, big); // "XREF"
    buf.extend_from_slice(b"FRRouting\0\0\0");

    // header and padded name take 24 bytes
    let desc_addr = note_addr + buf.len() as u64;
    let rel_start = table_start.wrapping_sub(desc_addr);
    let rel_end = table_end.wrapping_sub(desc_addr).wrapping_sub(word);
    if class64 {
        push_u64(&mut buf, rel_start, big);
        push_u64(&mut buf, rel_end, big);
    } else {
        push_u32(&mut buf, rel_start as u32, big);
        push_u32(&mut buf, rel_end as u32, big);
    }
    buf
}

/// Record arena: appends xref records and their strings the way the
/// toolchain lays them out, collecting the table slot for each record.
pub struct Arena {
    pub base: u64,
    pub bytes: Vec<u8>,
    pub ptrs: Vec<u64>,
    class64: bool,
    big: bool,
}

impl Arena {
    pub fn new(base: u64, class64: bool, big: bool) -> Self {
        Self {
            base,
            bytes: Vec::new(),
            ptrs: Vec::new(),
            class64,
            big,
        }
    }

    fn word(&self) -> u64 {
        if self.class64 {
            8
        } else {
            4
        }
    }

    pub fn here(&self) -> u64 {
        self.base + self.bytes.len() as u64
    }

    fn put_u32(&mut self, v: u32) {
        push_u32(&mut self.bytes, v, self.big);
    }

    fn put_i32(&mut self, v: i32) {
        self.put_u32(v as u32);
    }

    fn put_word(&mut self, v: u64) {
        if self.class64 {
            push_u64(&mut self.bytes, v, self.big);
        } else {
            self.put_u32(v as u32);
        }
    }

    fn put_zeros(&mut self, n: usize) {
        self.bytes.resize(self.bytes.len() + n, 0);
    }

    pub fn put_str(&mut self, s: &str) -> u64 {
        let at = self.here();
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        at
    }

    /// Generic record fields, shared prefix of every container.
    fn put_xref(&mut self, data_ptr: u64, typ: u32, line: i32, file: u64, func: u64) {
        self.put_word(data_ptr);
        self.put_u32(typ);
        self.put_i32(line);
        self.put_word(file);
        self.put_word(func);
    }

    /// Detail record; the identity slot is zeroed as it is at rest.
    fn put_xrefdata(&mut self, hashstr: u64, h0: u32, h1: u32) -> u64 {
        let at = self.here();
        self.put_word(0); // back pointer, unused in the image
        self.put_zeros(16); // uid, always zero
        self.put_word(hashstr);
        self.put_u32(h0);
        self.put_u32(h1);
        at
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_logmsg(
        &mut self,
        file: &str,
        line: i32,
        func: &str,
        fmt: &str,
        priority: u32,
        ec: u32,
        hash: Option<(&str, u32, u32)>,
    ) {
        let file_p = self.put_str(file);
        let func_p = self.put_str(func);
        let fmt_p = self.put_str(fmt);
        let data_p = match hash {
            Some((text, h0, h1)) => {
                let text_p = self.put_str(text);
                self.put_xrefdata(text_p, h0, h1)
            }
            None => 0,
        };

        let at = self.here();
        self.put_xref(data_p, 0x200, line, file_p, func_p);
        self.put_word(fmt_p);
        self.put_u32(priority);
        self.put_u32(ec);
        self.put_word(0); // args
        self.ptrs.push(at);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_cmddef(
        &mut self,
        name: &str,
        string: &str,
        doc: &str,
        attr: u32,
        file: &str,
        line: i32,
        func: &str,
    ) -> u64 {
        let name_p = self.put_str(name);
        let string_p = self.put_str(string);
        let doc_p = self.put_str(doc);
        let file_p = self.put_str(file);
        let func_p = self.put_str(func);

        let at = self.here();
        self.put_word(name_p);
        self.put_word(string_p);
        self.put_word(doc_p);
        self.put_i32(0); // daemon
        self.put_u32(attr);
        self.put_word(0); // handler pointer
        self.put_xref(0, 0x300, line, file_p, func_p);
        self.ptrs.push(at + 3 * self.word() + 8 + self.word());
        at
    }

    pub fn add_install(&mut self, cmd_addr: u64, node: u32, file: &str, line: i32, func: &str) {
        let file_p = self.put_str(file);
        let func_p = self.put_str(func);

        let at = self.here();
        self.put_xref(0, 0x301, line, file_p, func_p);
        self.put_word(cmd_addr);
        self.put_u32(node);
        self.ptrs.push(at);
    }

    pub fn add_threadsched(&mut self, file: &str, line: i32, func: &str, callback: &str) {
        let file_p = self.put_str(file);
        let func_p = self.put_str(func);
        let cb_p = self.put_str(callback);

        let at = self.here();
        self.put_xref(0, 0x100, line, file_p, func_p);
        self.put_word(cb_p);
        self.put_u32(0); // dest
        self.put_u32(0); // thread_type
        self.ptrs.push(at);
    }

    pub fn add_unknown(&mut self, file: &str, line: i32, func: &str) {
        let file_p = self.put_str(file);
        let func_p = self.put_str(func);

        let at = self.here();
        self.put_xref(0, 0x999, line, file_p, func_p);
        self.ptrs.push(at);
    }

    /// The packed pointer table for every record added so far.
    pub fn ptr_table(&self) -> Vec<u8> {
        let mut table = Vec::new();
        for &p in &self.ptrs {
            if self.class64 {
                push_u64(&mut table, p, self.big);
            } else {
                push_u32(&mut table, p as u32, self.big);
            }
        }
        table
    }
}

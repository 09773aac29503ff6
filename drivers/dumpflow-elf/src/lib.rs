/*!
ELF core dump driver.

Parses 64 bit big-endian s390 ELF core images: `PT_LOAD` program
headers become memory chunks backed by their file offsets, `PT_NOTE`
segments carry the per-CPU register records assembled in
[`note`](note/index.html). ELF cores always provide the complete
register set, so the CPU store content level is `All`.
*/

pub mod note;

use dumpflow_core::*;

use byteorder::{BigEndian, ByteOrder};
use log::{debug, info};

const EI_CLASS: usize = 4;
const EI_DATA: usize = 5;
const EI_VERSION: usize = 6;

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const ELFCLASS64: u8 = 2;
const ELFDATA2MSB: u8 = 2;

const ET_CORE: u16 = 4;
const EM_S390: u16 = 22;

const EHDR_SIZE: usize = 64;
const PHDR_SIZE: usize = 56;

const PT_LOAD: u32 = 1;
const PT_NOTE: u32 = 4;

/// Decoded ELF64 file header fields the driver consumes.
struct Ehdr {
    version_ident: u8,
    e_phoff: u64,
    e_phentsize: u16,
    e_phnum: u16,
}

impl Ehdr {
    /// Reads and validates the file header at the start of the source.
    ///
    /// Anything that is not a 64 bit big-endian s390 core image makes
    /// the driver decline.
    fn read(src: &mut dyn Source) -> Result<Self> {
        let mut raw = [0u8; EHDR_SIZE];
        src.read_at(0, &mut raw)
            .map_err(|_| Error::FormatMismatch("unable to read elf header"))?;

        if raw[..4] != ELF_MAGIC {
            return Err(Error::FormatMismatch("no elf signature"));
        }
        if raw[EI_CLASS] != ELFCLASS64 || raw[EI_DATA] != ELFDATA2MSB {
            return Err(Error::UnsupportedArchitecture);
        }
        if BigEndian::read_u16(&raw[18..]) != EM_S390 {
            return Err(Error::UnsupportedArchitecture);
        }
        if BigEndian::read_u16(&raw[16..]) != ET_CORE {
            return Err(Error::FormatMismatch("not a core file"));
        }

        Ok(Self {
            version_ident: raw[EI_VERSION],
            e_phoff: BigEndian::read_u64(&raw[32..]),
            e_phentsize: BigEndian::read_u16(&raw[54..]),
            e_phnum: BigEndian::read_u16(&raw[56..]),
        })
    }
}

/// Decoded ELF64 program header entry.
struct Phdr {
    p_type: u32,
    p_offset: u64,
    p_paddr: u64,
    p_filesz: u64,
    p_memsz: u64,
}

/// Reads the program header table using the geometry the file header
/// declares, not an assumed entry size.
fn read_phdrs(src: &mut dyn Source, ehdr: &Ehdr) -> Result<Vec<Phdr>> {
    if (ehdr.e_phentsize as usize) < PHDR_SIZE {
        return Err(Error::MalformedDump("program header entries too small"));
    }

    let mut phdrs = Vec::with_capacity(ehdr.e_phnum as usize);
    for i in 0..ehdr.e_phnum as u64 {
        let mut raw = [0u8; PHDR_SIZE];
        src.read_at(ehdr.e_phoff + i * ehdr.e_phentsize as u64, &mut raw)
            .map_err(|_| Error::MalformedDump("truncated program header table"))?;
        phdrs.push(Phdr {
            p_type: BigEndian::read_u32(&raw[0..]),
            p_offset: BigEndian::read_u64(&raw[8..]),
            p_paddr: BigEndian::read_u64(&raw[24..]),
            p_filesz: BigEndian::read_u64(&raw[32..]),
            p_memsz: BigEndian::read_u64(&raw[40..]),
        });
    }
    Ok(phdrs)
}

/// The ELF core dump format driver.
#[derive(Debug)]
pub struct ElfCore;

impl ElfCore {
    pub fn new() -> Self {
        ElfCore
    }
}

impl Default for ElfCore {
    fn default() -> Self {
        Self::new()
    }
}

impl DumpFormat for ElfCore {
    fn name(&self) -> &'static str {
        "elf"
    }

    fn features(&self) -> Features {
        Features::SEEK | Features::COPY
    }

    fn init(&mut self, src: &mut dyn Source) -> Result<Dump> {
        let ehdr = Ehdr::read(src)?;
        info!("s390x ELF core dump verified");

        let mut dump = Dump::new(DumpArch::S390x);
        dump.cpus.set_content(CpuContent::All);

        let phdrs = read_phdrs(src, &ehdr)?;
        debug!("elf: {} program headers", phdrs.len());
        for phdr in &phdrs {
            match phdr.p_type {
                PT_LOAD => {
                    if phdr.p_memsz == 0 {
                        continue;
                    }
                    let load_off = phdr.p_offset;
                    dump.mem.add(
                        Address::from(phdr.p_paddr),
                        phdr.p_memsz,
                        Box::new(move |src, off, buf| src.read_at(load_off + off, buf)),
                    );
                }
                PT_NOTE => note::parse_segment(src, phdr.p_offset, phdr.p_filesz, &mut dump)?,
                _ => {}
            }
        }

        dump.attrs.set_version(u32::from(ehdr.version_ident));
        Ok(dump)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use byteorder::WriteBytesExt;

    /// Builds an ELF64 big-endian core image from program segments.
    /// Each segment is (p_type, p_paddr, contents).
    fn build_core(machine: u16, class: u8, segments: &[(u32, u64, Vec<u8>)]) -> Vec<u8> {
        let phoff = EHDR_SIZE as u64;
        let mut data_off = phoff + segments.len() as u64 * PHDR_SIZE as u64;

        let mut image = Vec::new();
        image.extend_from_slice(&ELF_MAGIC);
        image.push(class);
        image.push(ELFDATA2MSB);
        image.push(1); // EI_VERSION
        image.resize(16, 0); // rest of e_ident
        image.write_u16::<BigEndian>(ET_CORE).unwrap();
        image.write_u16::<BigEndian>(machine).unwrap();
        image.write_u32::<BigEndian>(1).unwrap(); // e_version
        image.write_u64::<BigEndian>(0).unwrap(); // e_entry
        image.write_u64::<BigEndian>(phoff).unwrap();
        image.write_u64::<BigEndian>(0).unwrap(); // e_shoff
        image.write_u32::<BigEndian>(0).unwrap(); // e_flags
        image.write_u16::<BigEndian>(EHDR_SIZE as u16).unwrap();
        image.write_u16::<BigEndian>(PHDR_SIZE as u16).unwrap();
        image.write_u16::<BigEndian>(segments.len() as u16).unwrap();
        image.write_u16::<BigEndian>(0).unwrap(); // e_shentsize
        image.write_u16::<BigEndian>(0).unwrap(); // e_shnum
        image.write_u16::<BigEndian>(0).unwrap(); // e_shstrndx

        for (p_type, p_paddr, contents) in segments {
            image.write_u32::<BigEndian>(*p_type).unwrap();
            image.write_u32::<BigEndian>(0).unwrap(); // p_flags
            image.write_u64::<BigEndian>(data_off).unwrap();
            image.write_u64::<BigEndian>(*p_paddr).unwrap(); // p_vaddr
            image.write_u64::<BigEndian>(*p_paddr).unwrap();
            image.write_u64::<BigEndian>(contents.len() as u64).unwrap();
            image.write_u64::<BigEndian>(contents.len() as u64).unwrap();
            image.write_u64::<BigEndian>(0x1000).unwrap(); // p_align
            data_off += contents.len() as u64;
        }
        for (_, _, contents) in segments {
            image.extend_from_slice(contents);
        }
        image
    }

    fn make_note(name: &[u8], n_type: u32, desc: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_u32::<BigEndian>(name.len() as u32).unwrap();
        out.write_u32::<BigEndian>(desc.len() as u32).unwrap();
        out.write_u32::<BigEndian>(n_type).unwrap();
        out.extend_from_slice(name);
        out.resize((out.len() + 3) & !3, 0);
        out.extend_from_slice(desc);
        out.resize((out.len() + 3) & !3, 0);
        out
    }

    fn prstatus_desc(gpr0: u64) -> Vec<u8> {
        let mut desc = vec![0u8; note::NT_PRSTATUS_SIZE];
        BigEndian::write_u64(&mut desc[note::PRSTATUS_GPRS_OFF..], gpr0);
        desc
    }

    fn load_segment() -> (u32, u64, Vec<u8>) {
        let bytes: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        (PT_LOAD, 0, bytes)
    }

    fn init_core(image: Vec<u8>) -> Result<(Dump, Cursor<Vec<u8>>)> {
        let mut src = Cursor::new(image);
        let dump = ElfCore::new().init(&mut src)?;
        Ok((dump, src))
    }

    #[test]
    fn minimal_core() {
        let notes = make_note(b"CORE\0", note::NT_PRSTATUS, &vec![0u8; note::NT_PRSTATUS_SIZE]);
        let image = build_core(
            EM_S390,
            ELFCLASS64,
            &[load_segment(), (PT_NOTE, 0, notes)],
        );
        let (dump, mut src) = init_core(image.clone()).unwrap();

        assert_eq!(dump.cpus.len(), 1);
        assert_eq!(dump.cpus.content(), CpuContent::All);
        assert_eq!(dump.cpus.facs(), Facilities::empty());
        assert_eq!(dump.mem.len(), 1);
        let chunk = dump.mem.iter().next().unwrap();
        assert_eq!(chunk.start(), Address::NULL);
        assert_eq!(chunk.size(), 4096);
        assert_eq!(dump.attrs.version(), Some(1));

        // every physical address reads back the file bytes of the
        // segment, translated through the chunk's file offset
        let seg_off = EHDR_SIZE + 2 * PHDR_SIZE;
        for &(addr, len) in &[(0u64, 16usize), (100, 251), (4000, 96), (4095, 1)] {
            let mut buf = vec![0u8; len];
            dump.read_mem(&mut src, Address::from(addr), &mut buf).unwrap();
            assert_eq!(buf[..], image[seg_off + addr as usize..seg_off + addr as usize + len]);
        }

        let mut buf = [0u8; 1];
        assert_eq!(
            dump.read_mem(&mut src, Address::from(4096u64), &mut buf),
            Err(Error::AddressNotMapped(Address::from(4096u64)))
        );
    }

    #[test]
    fn wrong_machine_is_declined() {
        let image = build_core(62, ELFCLASS64, &[load_segment()]);
        assert_eq!(
            init_core(image).unwrap_err(),
            Error::UnsupportedArchitecture
        );
    }

    #[test]
    fn wrong_class_is_declined() {
        let image = build_core(EM_S390, 1, &[load_segment()]);
        assert_eq!(
            init_core(image).unwrap_err(),
            Error::UnsupportedArchitecture
        );
    }

    #[test]
    fn no_signature_is_declined() {
        let mut image = build_core(EM_S390, ELFCLASS64, &[load_segment()]);
        image[0] = 0x7e;
        assert_eq!(
            init_core(image).unwrap_err(),
            Error::FormatMismatch("no elf signature")
        );
    }

    #[test]
    fn truncated_header_is_declined() {
        assert_eq!(
            init_core(vec![0x7f, b'E', b'L', b'F']).unwrap_err(),
            Error::FormatMismatch("unable to read elf header")
        );
    }

    #[test]
    fn truncated_phdr_table_is_malformed() {
        let mut image = build_core(EM_S390, ELFCLASS64, &[load_segment()]);
        image.truncate(EHDR_SIZE + PHDR_SIZE / 2);
        assert_eq!(
            init_core(image).unwrap_err(),
            Error::MalformedDump("truncated program header table")
        );
    }

    #[test]
    fn cpus_appear_in_note_order() {
        let mut notes = Vec::new();
        for gpr0 in 1..=3u64 {
            notes.extend(make_note(b"CORE\0", note::NT_PRSTATUS, &prstatus_desc(gpr0)));
            let mut timer = vec![0u8; 8];
            BigEndian::write_u64(&mut timer, gpr0 * 0x10);
            notes.extend(make_note(b"LINUX\0", note::NT_S390_TIMER, &timer));
        }
        let image = build_core(EM_S390, ELFCLASS64, &[(PT_NOTE, 0, notes)]);
        let (dump, _) = init_core(image).unwrap();

        assert_eq!(dump.cpus.len(), 3);
        let regs: Vec<(u64, u64)> = dump.cpus.iter().map(|c| (c.gprs[0], c.timer)).collect();
        assert_eq!(regs, [(1, 0x10), (2, 0x20), (3, 0x30)]);
    }

    #[test]
    fn fpregset_before_prstatus_is_malformed() {
        let notes = make_note(b"CORE\0", note::NT_FPREGSET, &vec![0u8; note::NT_FPREGSET_SIZE]);
        let image = build_core(EM_S390, ELFCLASS64, &[(PT_NOTE, 0, notes)]);
        assert_eq!(
            init_core(image).unwrap_err(),
            Error::MalformedDump("FPREGSET before PRSTATUS")
        );
    }

    #[test]
    fn unknown_note_is_skipped() {
        let mut fpregset = vec![0u8; note::NT_FPREGSET_SIZE];
        BigEndian::write_u32(&mut fpregset, 0xdead_beef); // fpc
        BigEndian::write_u64(&mut fpregset[8..], 0x42); // fpr 0

        let with_unknown = {
            let mut notes = Vec::new();
            notes.extend(make_note(b"CORE\0", note::NT_PRSTATUS, &prstatus_desc(7)));
            // unknown type with an unaligned payload length
            notes.extend(make_note(b"GNU\0", 0x999, &[1, 2, 3, 4, 5]));
            notes.extend(make_note(b"CORE\0", note::NT_FPREGSET, &fpregset));
            notes
        };
        let without_unknown = {
            let mut notes = Vec::new();
            notes.extend(make_note(b"CORE\0", note::NT_PRSTATUS, &prstatus_desc(7)));
            notes.extend(make_note(b"CORE\0", note::NT_FPREGSET, &fpregset));
            notes
        };

        let (dump_a, _) =
            init_core(build_core(EM_S390, ELFCLASS64, &[(PT_NOTE, 0, with_unknown)])).unwrap();
        let (dump_b, _) =
            init_core(build_core(EM_S390, ELFCLASS64, &[(PT_NOTE, 0, without_unknown)])).unwrap();

        assert_eq!(dump_a.cpus.len(), 1);
        let cpu_a = dump_a.cpus.get(0).unwrap();
        let cpu_b = dump_b.cpus.get(0).unwrap();
        assert_eq!(cpu_a.gprs[0], 7);
        assert_eq!(cpu_a.fpc, 0xdead_beef);
        assert_eq!(cpu_a.fprs[0], cpu_b.fprs[0]);
        assert_eq!(cpu_a.fpc, cpu_b.fpc);
    }

    #[test]
    fn undersized_note_is_malformed() {
        let mut notes = Vec::new();
        notes.extend(make_note(b"CORE\0", note::NT_PRSTATUS, &prstatus_desc(0)));
        notes.extend(make_note(b"CORE\0", note::NT_FPREGSET, &[0u8; 16]));
        let image = build_core(EM_S390, ELFCLASS64, &[(PT_NOTE, 0, notes)]);
        assert_eq!(
            init_core(image).unwrap_err(),
            Error::MalformedDump("undersized FPREGSET note")
        );
    }

    #[test]
    fn vector_and_guarded_storage_notes_set_facilities() {
        let mut vxrs_low = vec![0u8; 128];
        BigEndian::write_u64(&mut vxrs_low[15 * 8..], 0x15);
        let mut vxrs_high = vec![0u8; 256];
        BigEndian::write_u64(&mut vxrs_high, 0xaa);
        BigEndian::write_u64(&mut vxrs_high[8..], 0xbb);
        let mut gs_cb = vec![0u8; 32];
        BigEndian::write_u64(&mut gs_cb[8..], 0x1234);

        let mut notes = Vec::new();
        notes.extend(make_note(b"CORE\0", note::NT_PRSTATUS, &prstatus_desc(0)));
        notes.extend(make_note(b"LINUX\0", note::NT_S390_VXRS_LOW, &vxrs_low));
        notes.extend(make_note(b"LINUX\0", note::NT_S390_VXRS_HIGH, &vxrs_high));
        notes.extend(make_note(b"LINUX\0", note::NT_S390_GS_CB, &gs_cb));
        let image = build_core(EM_S390, ELFCLASS64, &[(PT_NOTE, 0, notes)]);
        let (dump, _) = init_core(image).unwrap();

        assert!(dump.cpus.has_fac(Facilities::VX | Facilities::GS));
        let cpu = dump.cpus.get(0).unwrap();
        assert_eq!(cpu.vxrs_low[15], 0x15);
        assert_eq!(cpu.vxrs_high[0], Vxrs { low: 0xaa, high: 0xbb });
        assert_eq!(cpu.gsd(), 0x1234);
    }

    #[test]
    fn register_notes_fill_current_cpu() {
        let mut ctrs = vec![0u8; 128];
        for i in 0..16 {
            BigEndian::write_u64(&mut ctrs[i * 8..], 0xc0 + i as u64);
        }
        let mut prefix = vec![0u8; 4];
        BigEndian::write_u32(&mut prefix, 0x2000);
        let mut todcmp = vec![0u8; 8];
        BigEndian::write_u64(&mut todcmp, 0x11);
        let mut todpreg = vec![0u8; 4];
        BigEndian::write_u32(&mut todpreg, 0x22);

        let mut notes = Vec::new();
        notes.extend(make_note(b"CORE\0", note::NT_PRSTATUS, &prstatus_desc(0)));
        notes.extend(make_note(b"LINUX\0", note::NT_S390_CTRS, &ctrs));
        notes.extend(make_note(b"LINUX\0", note::NT_S390_PREFIX, &prefix));
        notes.extend(make_note(b"LINUX\0", note::NT_S390_TODCMP, &todcmp));
        notes.extend(make_note(b"LINUX\0", note::NT_S390_TODPREG, &todpreg));
        let image = build_core(EM_S390, ELFCLASS64, &[(PT_NOTE, 0, notes)]);
        let (dump, _) = init_core(image).unwrap();

        let cpu = dump.cpus.get(0).unwrap();
        assert_eq!(cpu.ctrs[0], 0xc0);
        assert_eq!(cpu.ctrs[15], 0xcf);
        assert_eq!(cpu.prefix, 0x2000);
        assert_eq!(cpu.todcmp, 0x11);
        assert_eq!(cpu.todpreg, 0x22);
    }

    #[test]
    fn vmcoreinfo_note_is_captured() {
        let mut notes = Vec::new();
        notes.extend(make_note(b"CORE\0", note::NT_PRSTATUS, &prstatus_desc(0)));
        notes.extend(make_note(
            b"VMCOREINFO\0",
            0,
            b"OSRELEASE=5.14.0\nSYMBOL(lowcore_ptr)=1c6b2000\n",
        ));
        let image = build_core(EM_S390, ELFCLASS64, &[(PT_NOTE, 0, notes)]);
        let (dump, _) = init_core(image).unwrap();

        let info = dump.vmcoreinfo.unwrap();
        assert_eq!(info.osrelease(), Some("5.14.0"));
        assert_eq!(info.symbol("lowcore_ptr"), Some(0x1c6b_2000));
    }

    #[test]
    fn prstatus_registers_are_decoded() {
        let mut desc = vec![0u8; note::NT_PRSTATUS_SIZE];
        BigEndian::write_u64(&mut desc[note::PRSTATUS_PSW_OFF..], 0x0706_0000_8000_0000);
        BigEndian::write_u64(&mut desc[note::PRSTATUS_PSW_OFF + 8..], 0x1_0000);
        for i in 0..16 {
            BigEndian::write_u64(&mut desc[note::PRSTATUS_GPRS_OFF + i * 8..], i as u64);
            BigEndian::write_u32(&mut desc[note::PRSTATUS_ACRS_OFF + i * 4..], 0xa0 + i as u32);
        }
        let notes = make_note(b"CORE\0", note::NT_PRSTATUS, &desc);
        let image = build_core(EM_S390, ELFCLASS64, &[(PT_NOTE, 0, notes)]);
        let (dump, _) = init_core(image).unwrap();

        let cpu = dump.cpus.get(0).unwrap();
        assert_eq!(cpu.psw, [0x0706_0000_8000_0000, 0x1_0000]);
        assert_eq!(cpu.gprs[15], 15);
        assert_eq!(cpu.acrs[0], 0xa0);
        assert_eq!(cpu.acrs[15], 0xaf);
    }
}

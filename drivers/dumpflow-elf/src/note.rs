/*!
Note segment parsing.

A note segment is a stream of typed sub-records. The only state the
stream carries is the "current CPU": a process status note opens a new
snapshot and every other register note fills a field of it. A register
note arriving before any process status note has no owner and makes
the dump malformed.
*/

use dumpflow_core::*;

use byteorder::{BigEndian, ByteOrder};
use log::debug;

pub const NT_PRSTATUS: u32 = 1;
pub const NT_FPREGSET: u32 = 2;
pub const NT_S390_TIMER: u32 = 0x301;
pub const NT_S390_TODCMP: u32 = 0x302;
pub const NT_S390_TODPREG: u32 = 0x303;
pub const NT_S390_CTRS: u32 = 0x304;
pub const NT_S390_PREFIX: u32 = 0x305;
pub const NT_S390_VXRS_LOW: u32 = 0x309;
pub const NT_S390_VXRS_HIGH: u32 = 0x30a;
pub const NT_S390_GS_CB: u32 = 0x30b;

/// Expected payload sizes, checked before any copy.
pub const NT_PRSTATUS_SIZE: usize = 332;
pub const NT_FPREGSET_SIZE: usize = 136;
const NT_TIMER_SIZE: usize = 8;
const NT_TODCMP_SIZE: usize = 8;
const NT_TODPREG_SIZE: usize = 4;
const NT_CTRS_SIZE: usize = 128;
const NT_PREFIX_SIZE: usize = 4;
const NT_VXRS_LOW_SIZE: usize = 128;
const NT_VXRS_HIGH_SIZE: usize = 256;
const NT_GS_CB_SIZE: usize = 32;

/// Register offsets within the process status payload.
pub const PRSTATUS_PSW_OFF: usize = 112;
pub const PRSTATUS_GPRS_OFF: usize = 128;
pub const PRSTATUS_ACRS_OFF: usize = 256;

const NHDR_SIZE: u64 = 12;
const VMCOREINFO_NAME: &[u8] = b"VMCOREINFO";

fn align4(len: u64) -> u64 {
    (len + 3) & !3
}

/// Compares a note name field (NUL terminated) against `expected`.
fn name_is(name: &[u8], expected: &[u8]) -> bool {
    name.split(|&b| b == 0).next() == Some(expected)
}

fn require_cpu<'a>(current: &'a mut Option<Cpu>, msg: &'static str) -> Result<&'a mut Cpu> {
    current.as_mut().ok_or(Error::MalformedDump(msg))
}

fn read_desc(
    src: &mut dyn Source,
    desc_off: u64,
    descsz: u64,
    need: usize,
    undersized: &'static str,
) -> Result<Vec<u8>> {
    if (descsz as usize) < need {
        return Err(Error::MalformedDump(undersized));
    }
    src.read_vec_at(desc_off, need)
        .map_err(|_| Error::MalformedDump("truncated note"))
}

/// Parses all notes of one note segment into the dump model.
pub fn parse_segment(
    src: &mut dyn Source,
    offset: u64,
    size: u64,
    dump: &mut Dump,
) -> Result<()> {
    let end = offset + size;
    let mut off = offset;
    let mut current: Option<Cpu> = None;

    while off < end {
        let mut hdr = [0u8; NHDR_SIZE as usize];
        src.read_at(off, &mut hdr)
            .map_err(|_| Error::MalformedDump("truncated note header"))?;
        let namesz = u64::from(BigEndian::read_u32(&hdr[0..]));
        let descsz = u64::from(BigEndian::read_u32(&hdr[4..]));
        let n_type = BigEndian::read_u32(&hdr[8..]);

        let name_off = off + NHDR_SIZE;
        let desc_off = name_off + align4(namesz);
        let next = desc_off + align4(descsz);
        if next > end {
            return Err(Error::MalformedDump("truncated note"));
        }
        debug!("elf note type {:#x} desc size {}", n_type, descsz);

        let name = src
            .read_vec_at(name_off, namesz as usize)
            .map_err(|_| Error::MalformedDump("truncated note"))?;
        if name_is(&name, VMCOREINFO_NAME) {
            let desc = src
                .read_vec_at(desc_off, descsz as usize)
                .map_err(|_| Error::MalformedDump("truncated note"))?;
            match VmCoreInfo::from_bytes(&desc) {
                Ok(info) => dump.vmcoreinfo = Some(info),
                Err(_) => debug!("elf: ignoring malformed VMCOREINFO note"),
            }
            off = next;
            continue;
        }

        match n_type {
            NT_PRSTATUS => {
                let desc = read_desc(
                    src,
                    desc_off,
                    descsz,
                    NT_PRSTATUS_SIZE,
                    "undersized PRSTATUS note",
                )?;
                if let Some(done) = current.take() {
                    dump.cpus.add(done);
                }
                let mut cpu = Cpu::new();
                BigEndian::read_u64_into(
                    &desc[PRSTATUS_PSW_OFF..PRSTATUS_PSW_OFF + 16],
                    &mut cpu.psw,
                );
                BigEndian::read_u64_into(
                    &desc[PRSTATUS_GPRS_OFF..PRSTATUS_GPRS_OFF + 128],
                    &mut cpu.gprs,
                );
                BigEndian::read_u32_into(
                    &desc[PRSTATUS_ACRS_OFF..PRSTATUS_ACRS_OFF + 64],
                    &mut cpu.acrs,
                );
                current = Some(cpu);
            }
            NT_FPREGSET => {
                let desc = read_desc(
                    src,
                    desc_off,
                    descsz,
                    NT_FPREGSET_SIZE,
                    "undersized FPREGSET note",
                )?;
                let cpu = require_cpu(&mut current, "FPREGSET before PRSTATUS")?;
                cpu.fpc = BigEndian::read_u32(&desc[0..]);
                BigEndian::read_u64_into(&desc[8..8 + 128], &mut cpu.fprs);
            }
            NT_S390_TIMER => {
                let desc =
                    read_desc(src, desc_off, descsz, NT_TIMER_SIZE, "undersized TIMER note")?;
                let cpu = require_cpu(&mut current, "TIMER before PRSTATUS")?;
                cpu.timer = BigEndian::read_u64(&desc);
            }
            NT_S390_TODCMP => {
                let desc = read_desc(
                    src,
                    desc_off,
                    descsz,
                    NT_TODCMP_SIZE,
                    "undersized TODCMP note",
                )?;
                let cpu = require_cpu(&mut current, "TODCMP before PRSTATUS")?;
                cpu.todcmp = BigEndian::read_u64(&desc);
            }
            NT_S390_TODPREG => {
                let desc = read_desc(
                    src,
                    desc_off,
                    descsz,
                    NT_TODPREG_SIZE,
                    "undersized TODPREG note",
                )?;
                let cpu = require_cpu(&mut current, "TODPREG before PRSTATUS")?;
                cpu.todpreg = BigEndian::read_u32(&desc);
            }
            NT_S390_CTRS => {
                let desc =
                    read_desc(src, desc_off, descsz, NT_CTRS_SIZE, "undersized CTRS note")?;
                let cpu = require_cpu(&mut current, "CTRS before PRSTATUS")?;
                BigEndian::read_u64_into(&desc, &mut cpu.ctrs);
            }
            NT_S390_PREFIX => {
                let desc = read_desc(
                    src,
                    desc_off,
                    descsz,
                    NT_PREFIX_SIZE,
                    "undersized PREFIX note",
                )?;
                let cpu = require_cpu(&mut current, "PREFIX before PRSTATUS")?;
                cpu.prefix = BigEndian::read_u32(&desc);
            }
            NT_S390_VXRS_LOW => {
                let desc = read_desc(
                    src,
                    desc_off,
                    descsz,
                    NT_VXRS_LOW_SIZE,
                    "undersized VXRS_LOW note",
                )?;
                let cpu = require_cpu(&mut current, "VXRS_LOW before PRSTATUS")?;
                BigEndian::read_u64_into(&desc, &mut cpu.vxrs_low);
                dump.cpus.add_fac(Facilities::VX);
            }
            NT_S390_VXRS_HIGH => {
                let desc = read_desc(
                    src,
                    desc_off,
                    descsz,
                    NT_VXRS_HIGH_SIZE,
                    "undersized VXRS_HIGH note",
                )?;
                let cpu = require_cpu(&mut current, "VXRS_HIGH before PRSTATUS")?;
                for i in 0..16 {
                    cpu.vxrs_high[i] = Vxrs {
                        low: BigEndian::read_u64(&desc[i * 16..]),
                        high: BigEndian::read_u64(&desc[i * 16 + 8..]),
                    };
                }
                dump.cpus.add_fac(Facilities::VX);
            }
            NT_S390_GS_CB => {
                let desc =
                    read_desc(src, desc_off, descsz, NT_GS_CB_SIZE, "undersized GSCB note")?;
                let cpu = require_cpu(&mut current, "GSCB before PRSTATUS")?;
                BigEndian::read_u64_into(&desc, &mut cpu.gscb);
                dump.cpus.add_fac(Facilities::GS);
            }
            _ => {
                // unknown note kinds are skipped by their declared length
            }
        }

        off = next;
    }

    if let Some(done) = current.take() {
        dump.cpus.add(done);
    }
    Ok(())
}

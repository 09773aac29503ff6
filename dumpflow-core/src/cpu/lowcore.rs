/*!
Minimal register recovery from the lowcore save areas.

When a capture mechanism stores no dedicated register records, the
architecture still deposits the register state of each CPU into fixed
save areas inside that CPU's 8 KiB lowcore (prefix) page. This module
rebuilds a [`Cpu`](../struct.Cpu.html) snapshot from such a page, read
through the memory chunk registry.
*/

use crate::error::Result;
use crate::mem::MemChunks;
use crate::source::Source;
use crate::types::Address;

use super::{Cpu, Vxrs};

use byteorder::{BigEndian, ByteOrder};

/// Size of the 64 bit lowcore page.
pub const LOWCORE_SIZE: usize = 0x2000;

/// Size of the vector register save area: 32 registers of 16 bytes.
pub const VX_SA_SIZE: usize = 32 * 16;

// Save area offsets within the 64 bit lowcore.
const CPU_ADDR: usize = 0x0084;
const VX_SA_ADDR: usize = 0x11b0;
const FP_SA: usize = 0x1200;
const GP_SA: usize = 0x1280;
const PSW_SA: usize = 0x1300;
const PREFIX_SA: usize = 0x1318;
const FP_CREG_SA: usize = 0x131c;
const TOD_PROGREG_SA: usize = 0x1324;
const TIMER_SA: usize = 0x1328;
const CLOCK_COMP_SA: usize = 0x1330;
const ACCESS_REGS_SA: usize = 0x1340;
const CREGS_SA: usize = 0x1380;

/// Returns whether a lowcore page points at a usable vector save area.
///
/// The pointer must be non zero and 1 KiB aligned.
pub fn has_vx_sa(lowcore: &[u8]) -> bool {
    let addr = BigEndian::read_u64(&lowcore[VX_SA_ADDR..]);
    addr != 0 && addr % 1024 == 0
}

/// Rebuilds a CPU snapshot from the lowcore page at `lc_addr`.
///
/// Returns the snapshot and whether vector registers were recovered
/// from the save area the page points at.
pub fn cpu_from_lowcore(
    mem: &MemChunks,
    src: &mut dyn Source,
    lc_addr: Address,
) -> Result<(Cpu, bool)> {
    let mut lowcore = vec![0u8; LOWCORE_SIZE];
    mem.read(src, lc_addr, &mut lowcore)?;

    let mut cpu = Cpu::new();
    BigEndian::read_u64_into(&lowcore[GP_SA..GP_SA + 128], &mut cpu.gprs);
    BigEndian::read_u64_into(&lowcore[CREGS_SA..CREGS_SA + 128], &mut cpu.ctrs);
    BigEndian::read_u32_into(
        &lowcore[ACCESS_REGS_SA..ACCESS_REGS_SA + 64],
        &mut cpu.acrs,
    );
    BigEndian::read_u64_into(&lowcore[FP_SA..FP_SA + 128], &mut cpu.fprs);
    cpu.fpc = BigEndian::read_u32(&lowcore[FP_CREG_SA..]);
    BigEndian::read_u64_into(&lowcore[PSW_SA..PSW_SA + 16], &mut cpu.psw);
    cpu.prefix = BigEndian::read_u32(&lowcore[PREFIX_SA..]);
    cpu.timer = BigEndian::read_u64(&lowcore[TIMER_SA..]);
    cpu.todcmp = BigEndian::read_u64(&lowcore[CLOCK_COMP_SA..]);
    cpu.todpreg = BigEndian::read_u32(&lowcore[TOD_PROGREG_SA..]);
    cpu.cpu_id = BigEndian::read_u16(&lowcore[CPU_ADDR..]);

    if !has_vx_sa(&lowcore) {
        return Ok((cpu, false));
    }

    let vx_sa_addr = BigEndian::read_u64(&lowcore[VX_SA_ADDR..]);
    let mut vx_sa = vec![0u8; VX_SA_SIZE];
    mem.read(src, Address::from(vx_sa_addr), &mut vx_sa)?;

    // V0-V15: the left lane doubles as the floating point register,
    // which the floating point save area already supplied.
    for i in 0..16 {
        cpu.vxrs_low[i] = BigEndian::read_u64(&vx_sa[i * 16 + 8..]);
    }
    for i in 0..16 {
        cpu.vxrs_high[i] = Vxrs {
            low: BigEndian::read_u64(&vx_sa[256 + i * 16..]),
            high: BigEndian::read_u64(&vx_sa[256 + i * 16 + 8..]),
        };
    }

    Ok((cpu, true))
}

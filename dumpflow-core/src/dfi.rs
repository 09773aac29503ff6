/*!
Dump format input.

Every capture format is a driver implementing
[`DumpFormat`](trait.DumpFormat.html). Drivers are statically
enumerated in a priority ordered table and probed sequentially against
the byte source until one of them recognizes the input and returns the
populated [`Dump`](struct.Dump.html) model. All later tooling reads
only through that model, never re-parsing the original bytes.
*/

use crate::attrs::Attrs;
use crate::cpu::{lowcore, CpuStore, DumpArch, Facilities};
use crate::error::{Error, Result};
use crate::mem::MemChunks;
use crate::source::Source;
use crate::types::Address;
use crate::vmcoreinfo::VmCoreInfo;

use std::io::{Seek, SeekFrom};

use log::{debug, info};

bitflags! {
    /// Structural capabilities of a dump format.
    pub struct Features: u32 {
        /// The format supports seeking, necessary for random access.
        const SEEK = 0x1;
        /// The format supports sequential copying, necessary for streaming.
        const COPY = 0x2;
    }
}

/// The normalized model of one dump: what the machine looked like when
/// it stopped.
#[derive(Debug)]
pub struct Dump {
    pub arch: DumpArch,
    pub cpus: CpuStore,
    pub mem: MemChunks,
    pub attrs: Attrs,
    pub vmcoreinfo: Option<VmCoreInfo>,
}

impl Dump {
    pub fn new(arch: DumpArch) -> Self {
        Self {
            arch,
            cpus: CpuStore::new(),
            mem: MemChunks::new(),
            attrs: Attrs::new(),
            vmcoreinfo: None,
        }
    }

    /// Reads physical memory of the captured machine.
    pub fn read_mem(&self, src: &mut dyn Source, addr: Address, buf: &mut [u8]) -> Result<()> {
        self.mem.read(src, addr, buf)
    }

    /// Recovers a CPU snapshot from the lowcore page at `lc_addr` and
    /// appends it to the CPU store.
    pub fn add_cpu_from_lowcore(&mut self, src: &mut dyn Source, lc_addr: Address) -> Result<()> {
        let (cpu, has_vx) = lowcore::cpu_from_lowcore(&self.mem, src, lc_addr)?;
        if has_vx {
            self.cpus.add_fac(Facilities::VX);
        }
        self.cpus.add(cpu);
        Ok(())
    }
}

/// A dump format driver.
///
/// `init` validates the source fully and returns a complete `Dump`
/// model; a failed probe therefore leaves no partial state behind.
/// Driver state collected during `init` (geometry, superblocks) stays
/// inside the driver value for later `info` calls.
pub trait DumpFormat: std::fmt::Debug {
    /// Short format name, e.g. `"elf"`.
    fn name(&self) -> &'static str;

    /// Structural capabilities of this format.
    fn features(&self) -> Features;

    /// Probes the source and builds the dump model.
    ///
    /// Declines with a [`FormatMismatch`](../error/enum.Error.html)
    /// class error if the source is not this format; any other error
    /// is fatal to the session.
    fn init(&mut self, src: &mut dyn Source) -> Result<Dump>;

    /// Format specific information for display, available after a
    /// successful `init`.
    fn info(&self) -> Option<String> {
        None
    }
}

/// Probes `formats` in table order against `src`.
///
/// The first driver whose `init` succeeds wins and stays active for
/// the rest of the session. Mismatches move on to the next candidate;
/// malformed dumps abort immediately; exhausting the table fails with
/// `NoValidFormat`.
pub fn select_format(
    formats: Vec<Box<dyn DumpFormat>>,
    src: &mut dyn Source,
) -> Result<(Box<dyn DumpFormat>, Dump)> {
    for mut format in formats {
        src.seek(SeekFrom::Start(0))
            .map_err(|_| Error::Io("seek failed"))?;
        match format.init(src) {
            Ok(dump) => {
                info!("dump format: {}", format.name());
                return Ok((format, dump));
            }
            Err(err) if err.is_format_mismatch() => {
                debug!("{}: {}", format.name(), err);
            }
            Err(err) => return Err(err),
        }
    }
    Err(Error::NoValidFormat)
}

/*!
dumpflow reads a crash dump of unknown format and normalizes it into
one in-memory model: per-CPU register snapshots plus a sparse map of
physical memory ranges.

Opening a dump probes the closed, priority ordered driver table
against the source until one driver recognizes the input. Structured
device formats probe before the generic ELF reader so that a dump
device carrying an ELF payload is still attributed to its device
format. The winning driver stays active for the whole session; all
later access goes through the [`DumpSession`](struct.DumpSession.html)
and never re-parses the original bytes.

# Examples

```no_run
let session = dumpflow::DumpSession::open("dump.elf").unwrap();
println!("format: {}", session.format_name());
println!("cpus..: {}", session.dump().cpus.len());
```
*/

pub use dumpflow_core::*;
pub use dumpflow_elf::ElfCore;
pub use dumpflow_scsi::ScsiDump;

use std::path::Path;

use log::debug;

/// The driver table, most specific format first.
///
/// The set of formats is closed and known at build time; dispatch
/// never constructs drivers dynamically.
pub fn default_formats() -> Vec<Box<dyn DumpFormat>> {
    vec![Box::new(ScsiDump::new()), Box::new(ElfCore::new())]
}

/// One dump analysis session: the byte source, the active format
/// driver and the normalized model it produced.
pub struct DumpSession {
    src: Box<dyn Source>,
    format: Box<dyn DumpFormat>,
    dump: Dump,
}

impl std::fmt::Debug for DumpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpSession")
            .field("format", &self.format.name())
            .field("dump", &self.dump)
            .finish()
    }
}

impl DumpSession {
    /// Opens the dump at `path` with the default driver table.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::probe(Box::new(FileSource::open(path)?), default_formats())
    }

    /// Probes `formats` in order against an already opened source.
    pub fn probe(mut src: Box<dyn Source>, formats: Vec<Box<dyn DumpFormat>>) -> Result<Self> {
        let file_size = src.size()?;
        let (format, mut dump) = select_format(formats, &mut *src)?;
        debug!("session: active format {}", format.name());
        dump.attrs.set_file_size(file_size);
        Ok(Self { src, format, dump })
    }

    /// Name of the active format driver.
    pub fn format_name(&self) -> &'static str {
        self.format.name()
    }

    /// Structural capabilities of the active format.
    pub fn features(&self) -> Features {
        self.format.features()
    }

    /// The normalized dump model.
    pub fn dump(&self) -> &Dump {
        &self.dump
    }

    /// Format specific information for display.
    pub fn info(&self) -> Option<String> {
        self.format.info()
    }

    /// Reads physical memory of the captured machine.
    pub fn read_mem(&mut self, addr: Address, buf: &mut [u8]) -> Result<()> {
        self.dump.read_mem(&mut *self.src, addr, buf)
    }
}

/*!
Dump header attribute store.

A flat set of scalar and opaque header attributes describing the
capture. Every attribute is independently optional; "unset" is a
distinct state from zero or empty, and consumers must treat it as such.
*/

use std::time::SystemTime;

/// Identity of the system the dump was taken from.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Utsname {
    pub sysname: String,
    pub nodename: String,
    pub release: String,
    pub version: String,
    pub machine: String,
}

/// Compression parameters of a zlib compressed dump.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ZlibInfo {
    pub version: u8,
    pub entry_size: u32,
}

/// The normalized dump header.
///
/// Drivers set whatever their format carries; everything else stays
/// unset.
#[derive(Debug, Default)]
pub struct Attrs {
    time: Option<SystemTime>,
    time_end: Option<SystemTime>,
    cpu_id: Option<u64>,
    utsname: Option<Utsname>,
    dump_method: Option<String>,
    mem_size_real: Option<u64>,
    file_size: Option<u64>,
    zlib_info: Option<ZlibInfo>,
    vol_nr: Option<u32>,
    version: Option<u32>,
    real_cpu_cnt: Option<u32>,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dump capture start time.
    pub fn time(&self) -> Option<SystemTime> {
        self.time
    }

    pub fn set_time(&mut self, time: SystemTime) {
        self.time = Some(time);
    }

    /// Dump capture end time.
    pub fn time_end(&self) -> Option<SystemTime> {
        self.time_end
    }

    pub fn set_time_end(&mut self, time_end: SystemTime) {
        self.time_end = Some(time_end);
    }

    /// CPU identifier of the capturing processor.
    pub fn cpu_id(&self) -> Option<u64> {
        self.cpu_id
    }

    pub fn set_cpu_id(&mut self, cpu_id: u64) {
        self.cpu_id = Some(cpu_id);
    }

    /// Identity of the dumped system.
    pub fn utsname(&self) -> Option<&Utsname> {
        self.utsname.as_ref()
    }

    pub fn set_utsname(&mut self, utsname: Utsname) {
        self.utsname = Some(utsname);
    }

    /// Label of the mechanism that captured the dump.
    pub fn dump_method(&self) -> Option<&str> {
        self.dump_method.as_deref()
    }

    pub fn set_dump_method(&mut self, dump_method: &str) {
        self.dump_method = Some(dump_method.to_string());
    }

    /// Physical memory size of the dumped system in bytes.
    pub fn mem_size_real(&self) -> Option<u64> {
        self.mem_size_real
    }

    pub fn set_mem_size_real(&mut self, mem_size_real: u64) {
        self.mem_size_real = Some(mem_size_real);
    }

    /// Size of the dump file itself in bytes.
    pub fn file_size(&self) -> Option<u64> {
        self.file_size
    }

    pub fn set_file_size(&mut self, file_size: u64) {
        self.file_size = Some(file_size);
    }

    /// Compression parameters, if the dump is zlib compressed.
    pub fn zlib_info(&self) -> Option<ZlibInfo> {
        self.zlib_info
    }

    pub fn set_zlib_info(&mut self, version: u8, entry_size: u32) {
        self.zlib_info = Some(ZlibInfo {
            version,
            entry_size,
        });
    }

    /// Volume number for multi-volume captures.
    pub fn vol_nr(&self) -> Option<u32> {
        self.vol_nr
    }

    pub fn set_vol_nr(&mut self, vol_nr: u32) {
        self.vol_nr = Some(vol_nr);
    }

    /// Version of the capture format.
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    pub fn set_version(&mut self, version: u32) {
        self.version = Some(version);
    }

    /// Number of real CPUs of the dumped system, which can exceed the
    /// number of register snapshots the dump carries.
    pub fn real_cpu_cnt(&self) -> Option<u32> {
        self.real_cpu_cnt
    }

    pub fn set_real_cpu_cnt(&mut self, real_cpu_cnt: u32) {
        self.real_cpu_cnt = Some(real_cpu_cnt);
    }
}

/*!
SCSI embedded dump driver.

Detects a device-resident dump by walking the boot loader chain the
dump tool writes onto the volume: magic tagged boot record, program
table, dump typed component, and finally the dump superblock, which is
accepted only after its seeded checksum verifies. Any mismatch along
the chain declines the device and dispatch moves on.

Detection exposes the dump format version and the partition geometry;
the memory and register content of the device is recovered by later
stages once the device is accepted.
*/

pub mod layout;

use layout::*;

use dumpflow_core::*;

use log::{debug, info};

/// The SCSI embedded dump format driver.
#[derive(Debug)]
pub struct ScsiDump {
    state: Option<(DumpSb, u32)>,
}

impl ScsiDump {
    pub fn new() -> Self {
        Self { state: None }
    }
}

impl Default for ScsiDump {
    fn default() -> Self {
        Self::new()
    }
}

/// Looks for a dump typed component behind one program table entry.
fn check_dump_component(src: &mut dyn Source, ptr: &BlockPtr, blk_size: u32) -> Result<()> {
    let header = src
        .read_vec_at(ptr.blockno * u64::from(blk_size), COMPONENT_HEADER_SIZE)
        .map_err(|_| Error::FormatMismatch("unable to read component header"))?;
    if header[..4] != ZIPL_MAGIC {
        return Err(Error::FormatMismatch("no component header signature"));
    }
    if header[4] != COMPONENT_TYPE_DUMP {
        return Err(Error::FormatMismatch("component is not a dump program"));
    }
    Ok(())
}

/// Walks the program table: a magic tagged first entry followed by
/// block pointers terminated by a zero block number. At least one
/// entry must lead to a dump typed component.
fn check_program_table(src: &mut dyn Source, blockno: u64, blk_size: u32) -> Result<()> {
    let table = src
        .read_vec_at(blockno * u64::from(blk_size), blk_size as usize)
        .map_err(|_| Error::FormatMismatch("unable to read program table"))?;
    if table[..4] != ZIPL_MAGIC {
        return Err(Error::FormatMismatch("no program table signature"));
    }
    for entry in table.chunks_exact(BlockPtr::LEN).skip(1) {
        let ptr = BlockPtr::read(entry);
        if ptr.blockno == 0 {
            break;
        }
        if check_dump_component(src, &ptr, blk_size).is_ok() {
            return Ok(());
        }
    }
    Err(Error::FormatMismatch("no dump program found"))
}

/// Validates the superblock magic and recomputes the checksum over
/// the region the superblock declares.
fn check_sb(src: &mut dyn Source, sb: &DumpSb) -> Result<()> {
    if sb.magic != DUMP_SB_MAGIC {
        return Err(Error::FormatMismatch("no dump superblock signature"));
    }
    let region = src
        .read_vec_at(sb.part_start + sb.csum_offset, sb.csum_size as usize)
        .map_err(|_| Error::FormatMismatch("unable to read checksum region"))?;
    if u64::from(csum_partial(&region, DUMP_SB_CSUM_SEED)) != sb.csum {
        return Err(Error::FormatMismatch("superblock checksum mismatch"));
    }
    Ok(())
}

/// Validates the boot info record and follows it to the superblock.
fn check_boot_info(src: &mut dyn Source, info: &BootInfo) -> Result<DumpSb> {
    if info.magic != ZIPL_MAGIC {
        return Err(Error::FormatMismatch("no boot info signature"));
    }
    if info.dev_type != BOOT_INFO_DEV_TYPE_SCSI {
        return Err(Error::FormatMismatch("boot info device type is not scsi"));
    }
    if info.bp_type != BOOT_INFO_BP_TYPE_DUMP {
        return Err(Error::FormatMismatch("boot info purpose is not dump"));
    }
    let raw = src
        .read_vec_at(info.dump_sb_ptr, DUMP_SB_SIZE)
        .map_err(|_| Error::FormatMismatch("unable to read dump superblock"))?;
    let sb = DumpSb::read(&raw);
    check_sb(src, &sb)?;
    Ok(sb)
}

impl DumpFormat for ScsiDump {
    fn name(&self) -> &'static str {
        "scsi"
    }

    fn features(&self) -> Features {
        Features::SEEK
    }

    fn init(&mut self, src: &mut dyn Source) -> Result<Dump> {
        let mut mbr = [0u8; MBR_SIZE];
        src.read_at(0, &mut mbr)
            .map_err(|_| Error::FormatMismatch("unable to read boot record"))?;
        let blk_size = src
            .block_size()
            .map_err(|_| Error::FormatMismatch("unable to query block size"))?;
        debug!("scsi: block size {}", blk_size);

        if mbr[..4] != ZIPL_MAGIC {
            return Err(Error::FormatMismatch("no boot record signature"));
        }
        let table_ptr = BlockPtr::read(&mbr[MBR_PROGRAM_TABLE_PTR_OFF..]);
        check_program_table(src, table_ptr.blockno, blk_size)?;
        let boot_info = BootInfo::read(&mbr[MBR_BOOT_INFO_OFF..]);
        let sb = check_boot_info(src, &boot_info)?;
        info!("SCSI embedded dump verified");

        self.state = Some((sb, blk_size));

        let mut dump = Dump::new(DumpArch::S390x);
        dump.attrs.set_version(sb.version as u32);
        Ok(dump)
    }

    fn info(&self) -> Option<String> {
        let (sb, blk_size) = self.state.as_ref()?;
        let blk = u64::from(*blk_size);
        Some(format!(
            "Partition info:\n  Partition start...: {} blocks\n  Partition size....: {} blocks\n  Maximum dump size.: {} MB",
            sb.part_start / blk,
            sb.part_size / blk,
            sb.dump_size / size::mb(1) as u64,
        ))
    }
}

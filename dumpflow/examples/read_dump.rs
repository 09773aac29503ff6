use clap::{App, Arg};
use log::Level;

use dumpflow::*;

fn main() {
    simple_logger::init_with_level(Level::Debug).unwrap();

    let matches = App::new("read_dump")
        .about("prints the normalized model of a crash dump")
        .arg(Arg::with_name("dump").required(true))
        .get_matches();

    let session = DumpSession::open(matches.value_of("dump").unwrap()).unwrap();
    let dump = session.dump();

    println!("format......: {}", session.format_name());
    println!("arch........: {}", dump.arch);
    println!("cpus........: {}", dump.cpus.len());
    println!("facilities..: {:?}", dump.cpus.facs());
    println!("memory......: {:#x} bytes in {} chunks", dump.mem.total_size(), dump.mem.len());
    for chunk in dump.mem.iter() {
        println!("  {:016x} - {:016x}", chunk.start(), chunk.end());
    }
    if let Some(version) = dump.attrs.version() {
        println!("version.....: {}", version);
    }
    if let Some(file_size) = dump.attrs.file_size() {
        println!("file size...: {} bytes", file_size);
    }
    if let Some(info) = session.info() {
        println!("{}", info);
    }
}

//! Headless runner: load a raw ROM image, run it for a number of cycles and
//! print the resulting machine state.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use hc05_core::debugger::WatchKind;
use hc05_core::savestate::state_path;
use hc05_core::{Hc05, Variant};

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    #[value(name = "c4")]
    C4,
    #[value(name = "c8")]
    C8,
    #[value(name = "705c8a")]
    C705c8a,
}

impl From<VariantArg> for Variant {
    fn from(v: VariantArg) -> Variant {
        match v {
            VariantArg::C4 => Variant::Mc68hc05c4,
            VariantArg::C8 => Variant::Mc68hc05c8,
            VariantArg::C705c8a => Variant::Mc68hc705c8a,
        }
    }
}

fn parse_addr(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches('$');
    u16::from_str_radix(digits, 16).map_err(|e| format!("bad address '{}': {}", s, e))
}

#[derive(Parser)]
#[command(version, about = "Run an M68HC05 ROM image without a front-end", long_about = None)]
struct Args {
    /// Raw binary image
    rom: PathBuf,

    #[arg(long, value_enum, default_value = "c4")]
    variant: VariantArg,

    /// Load address of the image (hex)
    #[arg(long, value_parser = parse_addr, default_value = "0")]
    offset: u16,

    /// Oscillator frequency in Hz
    #[arg(long, default_value_t = 4_000_000)]
    clock: u32,

    /// Machine cycles to run
    #[arg(long, default_value_t = 100_000)]
    cycles: u64,

    /// Stop at this PC (hex, repeatable)
    #[arg(long = "break", value_parser = parse_addr)]
    breakpoints: Vec<u16>,

    /// Stop on a program write to this address (hex, repeatable)
    #[arg(long = "watch", value_parser = parse_addr)]
    watchpoints: Vec<u16>,

    /// Restore this save state before running
    #[arg(long)]
    load_state: Option<PathBuf>,

    /// Write a save state next to the ROM when done
    #[arg(long)]
    save_state: bool,

    /// Debug logging, plus I/O register and RAM dumps
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut builder = colog::default_builder();
    builder.filter_level(if args.debug { log::LevelFilter::Debug } else { log::LevelFilter::Info });
    builder.init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let image = std::fs::read(&args.rom)?;
    let mut dev = Hc05::new(args.variant.into(), args.clock);
    let loaded = dev.load_rom(args.offset, &image)?;
    log::info!("{}: loaded {} bytes at 0x{:04X}", dev.config().name, loaded, args.offset);

    for port in 0..4 {
        let name = (b'A' + port as u8) as char;
        dev.set_port_write(port, Box::new(move |value, ddr| {
            log::info!("PORT{} <- {:02X} (DDR {:02X})", name, value, ddr);
        }));
    }
    dev.set_tcmp_write(Box::new(|level| log::info!("TCMP <- {}", level as u8)));

    dev.start();
    if let Some(path) = &args.load_state {
        dev.load_state_file(path)?;
    }

    dev.breakpoints.extend(args.breakpoints.iter().copied());
    for &addr in &args.watchpoints {
        dev.debugger.add_watchpoint(addr, WatchKind::Write);
    }

    let used = dev.execute(args.cycles);
    if dev.breakpoint_hit {
        match dev.debugger.take_hit() {
            Some(hit) => println!("*** Watchpoint #{} at 0x{:04X}: {:?} {:02X} ***",
                hit.index, hit.addr, hit.access, hit.value),
            None => println!("*** Breakpoint at 0x{:04X} ***", dev.cpu.pc),
        }
    }
    println!("Ran {} cycles.", used);
    println!("{}", dev.dump_regs());
    print!("{}", dev.format_state());

    if args.debug {
        println!("\nI/O registers:");
        print!("{}", dev.dump_io());
        println!("\nRAM:");
        for (start, end) in dev.config().ram_ranges() {
            print!("{}", dev.dump_ram(start, end - start + 1));
        }
    }

    if args.save_state {
        let rom = args.rom.to_string_lossy();
        let path = PathBuf::from(state_path(&rom));
        dev.save_state_file(&path)?;
        log::info!("state saved to {}", path.display());
    }
    Ok(())
}

//! Save state for an M68HC05 device.
//!
//! Captures the CPU registers, the memory image and every peripheral
//! register using bincode serialization with deflate compression. Host
//! callbacks and debugger settings are not part of the state.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "HC05"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Variant          |  u8 (see Variant::id)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cpu::RunState;
use crate::error::Error;
use crate::peripherals::PORT_COUNT;
use crate::variant::Variant;
use crate::Hc05;

/// Magic bytes identifying an hc05 save state.
const MAGIC: &[u8; 4] = b"HC05";
/// Current save state format version.
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 9;

// ─── Per-component state structs ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortsState {
    pub input: [u8; PORT_COUNT],
    pub latch: [u8; PORT_COUNT],
    pub ddr: [u8; PORT_COUNT],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    pub tcap_state: bool,
    pub tcr: u8,
    pub tsr: u8,
    pub tsr_seen: u8,
    pub prescaler: u8,
    pub counter: u16,
    pub icr: u16,
    pub ocr: u16,
    pub inhibit_cap: bool,
    pub inhibit_cmp: bool,
    pub trl_buf: [u8; 2],
    pub trl_latched: [bool; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopState {
    pub pcop_cnt: u32,
    pub ncop_cnt: u32,
    pub coprst: u8,
    pub copcr: u8,
    pub ncope: bool,
}

// ─── Top-level save state ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    // CPU
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub cc: u8,
    pub sp: u16,
    pub run_state: RunState,
    pub tick: u64,

    // Interrupt lines
    pub pending: u16,
    pub irq_state: bool,
    pub icount: i64,

    pub data: Vec<u8>,

    pub ports: PortsState,
    pub timer: TimerState,
    pub cop: CopState,
}

impl Hc05 {
    /// Snapshot the device.
    pub fn save_state(&self) -> SaveState {
        let t = &self.timer;
        let c = &self.cop;
        SaveState {
            pc: self.cpu.pc,
            a: self.cpu.a,
            x: self.cpu.x,
            cc: self.cpu.cc,
            sp: self.cpu.sp,
            run_state: self.cpu.state,
            tick: self.cpu.tick,
            pending: self.pending,
            irq_state: self.irq_state,
            icount: self.icount,
            data: self.mem.data.clone(),
            ports: PortsState {
                input: std::array::from_fn(|n| self.ports.input(n)),
                latch: std::array::from_fn(|n| self.ports.latch(n)),
                ddr: std::array::from_fn(|n| self.ports.read_ddr(n)),
            },
            timer: TimerState {
                tcap_state: t.tcap_state(),
                tcr: t.read_tcr(),
                tsr: t.tsr(),
                tsr_seen: t.tsr_seen(),
                prescaler: t.prescaler(),
                counter: t.counter(),
                icr: t.icr(),
                ocr: t.ocr(),
                inhibit_cap: t.inhibit_cap(),
                inhibit_cmp: t.inhibit_cmp(),
                trl_buf: t.trl_buf(),
                trl_latched: t.trl_latched(),
            },
            cop: CopState {
                pcop_cnt: c.pcop_cnt(),
                ncop_cnt: c.ncop_cnt(),
                coprst: c.coprst(),
                copcr: c.copcr(),
                ncope: c.ncope(),
            },
        }
    }

    /// Restore a snapshot taken from a device of the same variant.
    pub fn restore_state(&mut self, s: SaveState) {
        self.cpu.pc = s.pc;
        self.cpu.a = s.a;
        self.cpu.x = s.x;
        self.cpu.cc = s.cc;
        self.cpu.sp = s.sp;
        self.cpu.state = s.run_state;
        self.cpu.tick = s.tick;
        self.pending = s.pending;
        self.irq_state = s.irq_state;
        self.icount = s.icount;
        self.reset_pending = false;

        let n = s.data.len().min(self.mem.data.len());
        self.mem.data[..n].copy_from_slice(&s.data[..n]);

        for port in 0..PORT_COUNT {
            self.ports.set_input_raw(port, s.ports.input[port]);
            self.ports.set_latch_raw(port, s.ports.latch[port]);
            self.ports.set_ddr_raw(port, s.ports.ddr[port]);
        }

        let t = s.timer;
        self.timer.set_tcap_state_raw(t.tcap_state);
        self.timer.set_tcr_raw(t.tcr);
        self.timer.set_tsr_raw(t.tsr);
        self.timer.set_tsr_seen_raw(t.tsr_seen);
        self.timer.set_prescaler_raw(t.prescaler);
        self.timer.set_counter_raw(t.counter);
        self.timer.set_icr_raw(t.icr);
        self.timer.set_ocr_raw(t.ocr);
        self.timer.set_inhibit_raw(t.inhibit_cap, t.inhibit_cmp);
        self.timer.set_trl_raw(t.trl_buf, t.trl_latched);

        self.cop.set_pcop_raw(s.cop.pcop_cnt);
        self.cop.set_ncop_raw(s.cop.ncop_cnt);
        self.cop.set_coprst_raw(s.cop.coprst);
        self.cop.set_copcr_raw(s.cop.copcr);
        self.cop.set_ncope(s.cop.ncope);

        self.started = true;
        self.update_timer_irq();
    }

    /// Save the device state to `path`.
    pub fn save_state_file(&self, path: &Path) -> Result<(), Error> {
        save_to_file(&self.save_state(), self.variant(), path)
    }

    /// Load and restore the device state from `path`.
    pub fn load_state_file(&mut self, path: &Path) -> Result<(), Error> {
        let state = load_from_file(path, self.variant())?;
        self.restore_state(state);
        log::info!("state loaded from {}", path.display());
        Ok(())
    }
}

// ─── Encoding ───────────────────────────────────────────────────────────────

/// Encode a state with header and deflate compression.
pub fn save_to_bytes(state: &SaveState, variant: Variant) -> Result<Vec<u8>, Error> {
    let payload = bincode::serialize(state)?;
    let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.push(variant.id());
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Decode a state, verifying magic, version and variant.
pub fn load_from_bytes(data: &[u8], expected: Variant) -> Result<SaveState, Error> {
    if data.len() < HEADER_LEN {
        return Err(Error::Truncated);
    }
    if &data[0..4] != MAGIC {
        return Err(Error::BadMagic);
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(Error::Version { found: version, expected: FORMAT_VERSION });
    }
    if data[8] != expected.id() {
        return Err(Error::VariantMismatch {
            saved: Variant::from_id(data[8]).map(Variant::name).unwrap_or("?"),
            current: expected.name(),
        });
    }

    let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[HEADER_LEN..])
        .map_err(|e| Error::Decompress(format!("{:?}", e)))?;

    Ok(bincode::deserialize(&decompressed)?)
}

pub fn save_to_file(state: &SaveState, variant: Variant, path: &Path) -> Result<(), Error> {
    let out = save_to_bytes(state, variant)?;
    std::fs::write(path, out)?;
    Ok(())
}

pub fn load_from_file(path: &Path, expected: Variant) -> Result<SaveState, Error> {
    let data = std::fs::read(path)?;
    load_from_bytes(&data, expected)
}

/// Derive save state file path from a ROM path.
/// `prog.bin` → `prog.state`
pub fn state_path(rom_path: &str) -> String {
    let p = Path::new(rom_path);
    let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or("rom");
    let dir = p.parent().unwrap_or(Path::new("."));
    dir.join(format!("{}.state", stem)).to_string_lossy().into_owned()
}

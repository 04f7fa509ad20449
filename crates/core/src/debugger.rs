//! Debugging facilities.
//!
//! - **Memory Viewer**: Hex + ASCII dump of any region of the address space
//! - **I/O Register Viewer**: Named register display using the variant's symbol table
//! - **Watchpoints**: Pause on program reads/writes of an address
//!
//! The device reports every program access to [`Debugger::observe`];
//! debugger accesses are never observed. The register viewer reads with
//! [`Access::Debugger`], so looking at TSR or ICRH never disturbs the
//! timer's flag-clearing sequence.

use crate::bus::{Access, Bus};
use crate::variant::VariantConfig;
use crate::{Hc05, ADDRESS_MASK};

/// Which program accesses a watchpoint reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Read,
    Write,
    /// Reads and writes
    Access,
}

impl WatchKind {
    fn covers(self, access: WatchKind) -> bool {
        self == WatchKind::Access || self == access
    }

    fn tag(self) -> &'static str {
        match self {
            WatchKind::Read => "r",
            WatchKind::Write => "w",
            WatchKind::Access => "rw",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Watchpoint {
    pub addr: u16,
    pub kind: WatchKind,
    /// Only trigger when the transferred byte equals this
    pub value: Option<u8>,
    pub enabled: bool,
    pub hits: u64,
}

impl Watchpoint {
    fn triggers(&self, addr: u16, access: WatchKind, value: u8) -> bool {
        self.enabled
            && self.addr == addr
            && self.kind.covers(access)
            && self.value.map_or(true, |v| v == value)
    }
}

/// First watchpoint that fired since the last [`Debugger::take_hit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchHit {
    pub index: usize,
    pub addr: u16,
    pub access: WatchKind,
    /// Byte read or written
    pub value: u8,
    /// Stored byte before a write
    pub previous: Option<u8>,
}

#[derive(Default)]
pub struct Debugger {
    watchpoints: Vec<Watchpoint>,
    hit: Option<WatchHit>,
}

impl Debugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch `addr` for the given kind of access. Returns the watchpoint index.
    pub fn add_watchpoint(&mut self, addr: u16, kind: WatchKind) -> usize {
        self.watchpoints.push(Watchpoint {
            addr: addr & ADDRESS_MASK,
            kind,
            value: None,
            enabled: true,
            hits: 0,
        });
        self.watchpoints.len() - 1
    }

    /// Watch for writes of one particular value.
    pub fn add_value_watchpoint(&mut self, addr: u16, value: u8) -> usize {
        let idx = self.add_watchpoint(addr, WatchKind::Write);
        self.watchpoints[idx].value = Some(value);
        idx
    }

    pub fn remove_watchpoint(&mut self, idx: usize) -> Option<Watchpoint> {
        (idx < self.watchpoints.len()).then(|| self.watchpoints.remove(idx))
    }

    pub fn set_enabled(&mut self, idx: usize, enabled: bool) {
        if let Some(wp) = self.watchpoints.get_mut(idx) {
            wp.enabled = enabled;
        }
    }

    pub fn watchpoints(&self) -> &[Watchpoint] {
        &self.watchpoints
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.watchpoints.is_empty()
    }

    pub fn has_hit(&self) -> bool {
        self.hit.is_some()
    }

    pub fn take_hit(&mut self) -> Option<WatchHit> {
        self.hit.take()
    }

    /// Record a program access. Every matching watchpoint counts a hit; the
    /// first one is kept until taken.
    pub fn observe(&mut self, addr: u16, access: WatchKind, value: u8, previous: Option<u8>) {
        for (index, wp) in self.watchpoints.iter_mut().enumerate() {
            if !wp.triggers(addr, access, value) {
                continue;
            }
            wp.hits += 1;
            if self.hit.is_none() {
                log::debug!("watchpoint {} at {:04X} ({})", index, addr, access.tag());
                self.hit = Some(WatchHit { index, addr, access, value, previous });
            }
        }
    }

    pub fn format_watchpoints(&self) -> String {
        self.watchpoints
            .iter()
            .enumerate()
            .map(|(i, wp)| {
                let value = wp.value.map(|v| format!(" =={:02X}", v)).unwrap_or_default();
                format!("  #{} {:04X} {:<2}{}{} hits={}\n",
                    i, wp.addr, wp.kind.tag(), value,
                    if wp.enabled { "" } else { " (off)" }, wp.hits)
            })
            .collect()
    }
}

// ─── Memory Viewer ──────────────────────────────────────────────────────────

/// Hex + ASCII dump of `data[start..start + length]`, 16 bytes per row.
pub fn dump_ram(data: &[u8], start: u16, length: u16) -> String {
    let begin = (start as usize).min(data.len());
    let end = (begin + length as usize).min(data.len());
    let mut s = String::new();
    for (row, chunk) in data[begin..end].chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&c| if c.is_ascii_graphic() || c == b' ' { c as char } else { '.' })
            .collect();
        s.push_str(&format!("{:04X}: {:<47}  {}\n", begin + row * 16, hex.join(" "), ascii));
    }
    s
}

// ─── I/O Register Viewer ────────────────────────────────────────────────────

/// Named I/O registers of the device's variant with their current values.
/// Registers without a read side show `--`.
pub fn dump_io_regs(dev: &mut Hc05) -> String {
    let config = dev.config();
    let mut s = String::new();
    for &(addr, name) in config.symbols {
        let line = match config.read_handler(addr) {
            Some(_) => {
                let val = dev.read8(addr, Access::Debugger);
                format!("{:>8} (0x{:02X}) = 0x{:02X}  {:08b}\n", name, addr, val, val)
            }
            None => format!("{:>8} (0x{:02X}) = --\n", name, addr),
        };
        s.push_str(&line);
    }
    s
}

pub fn io_name(config: &VariantConfig, addr: u16) -> Option<&'static str> {
    config.symbol(addr)
}

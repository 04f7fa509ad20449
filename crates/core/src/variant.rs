//! Device variants and their internal address maps.
//!
//! Every variant shares the same execution core, timer and port logic. What
//! differs is captured in a [`VariantConfig`]: the address decode table,
//! which port bits are physically bonded out, which watchdogs exist, and
//! the register names shown by the debugger.

/// Target device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// MC68HC05C4: 4 KB mask ROM.
    Mc68hc05c4,
    /// MC68HC05C8: 8 KB mask ROM.
    Mc68hc05c8,
    /// MC68HC705C8A: EPROM with programmable and non-programmable COP.
    Mc68hc705c8a,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Mc68hc05c4, Variant::Mc68hc05c8, Variant::Mc68hc705c8a];

    pub fn config(self) -> &'static VariantConfig {
        match self {
            Variant::Mc68hc05c4 => &C4_CONFIG,
            Variant::Mc68hc05c8 => &C8_CONFIG,
            Variant::Mc68hc705c8a => &C8A_CONFIG,
        }
    }

    /// Stable identifier stored in save-state headers.
    pub fn id(self) -> u8 {
        match self {
            Variant::Mc68hc05c4 => 0,
            Variant::Mc68hc05c8 => 1,
            Variant::Mc68hc705c8a => 2,
        }
    }

    pub fn from_id(id: u8) -> Option<Variant> {
        Variant::ALL.iter().copied().find(|v| v.id() == id)
    }

    pub fn name(self) -> &'static str {
        self.config().name
    }
}

/// What a mapped address range is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// PORTA–PORTD data registers.
    Port,
    /// DDRA–DDRC.
    Ddr,
    Tcr,
    Tsr,
    /// ICRH/ICRL.
    Icr,
    /// OCRH/OCRL.
    Ocr,
    /// TRH/TRL/ATRH/ATRL.
    Timer,
    Coprst,
    Copcr,
    /// COP reset register in the vector area (write side only).
    Copr,
    Rom,
    Ram,
}

/// One row of an address map. A direction with `None` falls through to the
/// next matching row; an address with no row at all is unmapped.
#[derive(Debug, Clone, Copy)]
pub struct MapEntry {
    pub start: u16,
    pub end: u16,
    pub read: Option<Handler>,
    pub write: Option<Handler>,
}

const fn rw(start: u16, end: u16, h: Handler) -> MapEntry {
    MapEntry { start, end, read: Some(h), write: Some(h) }
}

const fn ro(start: u16, end: u16, h: Handler) -> MapEntry {
    MapEntry { start, end, read: Some(h), write: None }
}

/// ROM: the program can only read it, a debugger may also patch it.
const fn rom(start: u16, end: u16) -> MapEntry {
    rw(start, end, Handler::Rom)
}

const fn wo(start: u16, end: u16, h: Handler) -> MapEntry {
    MapEntry { start, end, read: None, write: Some(h) }
}

/// Per-variant configuration record.
#[derive(Debug)]
pub struct VariantConfig {
    pub name: &'static str,
    pub short_name: &'static str,
    /// Physically present bits of ports A–D.
    pub port_bits: [u8; 4],
    pub map: &'static [MapEntry],
    /// Programmable COP watchdog (COPRST/COPCR).
    pub has_pcop: bool,
    /// Non-programmable COP watchdog (COPR, enabled by the NCOPE mask option).
    pub has_ncop: bool,
    /// Vector the external /IRQ line through 0x1FFA ahead of the timer.
    pub external_irq: bool,
    /// I/O register names for diagnostics.
    pub symbols: &'static [(u16, &'static str)],
}

impl VariantConfig {
    /// Find the handler for a read of `addr` (already masked to 13 bits).
    pub fn read_handler(&self, addr: u16) -> Option<(Handler, u16)> {
        self.map.iter()
            .filter(|e| addr >= e.start && addr <= e.end)
            .find_map(|e| e.read.map(|h| (h, addr - e.start)))
    }

    pub fn write_handler(&self, addr: u16) -> Option<(Handler, u16)> {
        self.map.iter()
            .filter(|e| addr >= e.start && addr <= e.end)
            .find_map(|e| e.write.map(|h| (h, addr - e.start)))
    }

    /// Iterate over every address range decoded as RAM.
    pub fn ram_ranges(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.map.iter()
            .filter(|e| e.read == Some(Handler::Ram))
            .map(|e| (e.start, e.end))
    }

    pub fn symbol(&self, addr: u16) -> Option<&'static str> {
        self.symbols.iter().find(|(a, _)| *a == addr).map(|(_, n)| *n)
    }
}

// 0x000A–0x0011 (SPI, SCI) are named but not emulated.
const C4_SYMS: &[(u16, &str)] = &[
    (0x0000, "PORTA"), (0x0001, "PORTB"), (0x0002, "PORTC"), (0x0003, "PORTD"),
    (0x0004, "DDRA"), (0x0005, "DDRB"), (0x0006, "DDRC"),
    (0x000A, "SPCR"), (0x000B, "SPSR"), (0x000C, "SPDR"),
    (0x000D, "BAUD"), (0x000E, "SCCR1"), (0x000F, "SCCR2"), (0x0010, "SCSR"), (0x0011, "SCDR"),
    (0x0012, "TCR"), (0x0013, "TSR"),
    (0x0014, "ICRH"), (0x0015, "ICRL"), (0x0016, "OCRH"), (0x0017, "OCRL"),
    (0x0018, "TRH"), (0x0019, "TRL"), (0x001A, "ATRH"), (0x001B, "ATRL"),
];

const C8A_SYMS: &[(u16, &str)] = &[
    (0x0000, "PORTA"), (0x0001, "PORTB"), (0x0002, "PORTC"), (0x0003, "PORTD"),
    (0x0004, "DDRA"), (0x0005, "DDRB"), (0x0006, "DDRC"),
    (0x000A, "SPCR"), (0x000B, "SPSR"), (0x000C, "SPDR"),
    (0x000D, "BAUD"), (0x000E, "SCCR1"), (0x000F, "SCCR2"), (0x0010, "SCSR"), (0x0011, "SCDR"),
    (0x0012, "TCR"), (0x0013, "TSR"),
    (0x0014, "ICRH"), (0x0015, "ICRL"), (0x0016, "OCRH"), (0x0017, "OCRL"),
    (0x0018, "TRH"), (0x0019, "TRL"), (0x001A, "ATRH"), (0x001B, "ATRL"),
    (0x001C, "PROG"),
    (0x001D, "COPRST"), (0x001E, "COPCR"),
];

const C4_MAP: &[MapEntry] = &[
    rw(0x0000, 0x0003, Handler::Port),
    rw(0x0004, 0x0006, Handler::Ddr),
    rw(0x0012, 0x0012, Handler::Tcr),
    ro(0x0013, 0x0013, Handler::Tsr),
    ro(0x0014, 0x0015, Handler::Icr),
    rw(0x0016, 0x0017, Handler::Ocr),
    ro(0x0018, 0x001B, Handler::Timer),
    rom(0x0020, 0x004F),
    rw(0x0050, 0x00FF, Handler::Ram),
    rom(0x0100, 0x10FF),
    rom(0x1F00, 0x1FEF), // self-check
    rom(0x1FF4, 0x1FFF), // user vectors
];

const C8_MAP: &[MapEntry] = &[
    rw(0x0000, 0x0003, Handler::Port),
    rw(0x0004, 0x0006, Handler::Ddr),
    rw(0x0012, 0x0012, Handler::Tcr),
    ro(0x0013, 0x0013, Handler::Tsr),
    ro(0x0014, 0x0015, Handler::Icr),
    rw(0x0016, 0x0017, Handler::Ocr),
    ro(0x0018, 0x001B, Handler::Timer),
    rom(0x0020, 0x004F),
    rw(0x0050, 0x00FF, Handler::Ram),
    rom(0x0100, 0x1EFF),
    rom(0x1F00, 0x1FEF),
    rom(0x1FF4, 0x1FFF),
];

// PROG (0x001C) and the option register (0x1FDF) are not emulated.
const C8A_MAP: &[MapEntry] = &[
    rw(0x0000, 0x0003, Handler::Port),
    rw(0x0004, 0x0006, Handler::Ddr),
    rw(0x0012, 0x0012, Handler::Tcr),
    ro(0x0013, 0x0013, Handler::Tsr),
    ro(0x0014, 0x0015, Handler::Icr),
    rw(0x0016, 0x0017, Handler::Ocr),
    ro(0x0018, 0x001B, Handler::Timer),
    wo(0x001D, 0x001D, Handler::Coprst),
    rw(0x001E, 0x001E, Handler::Copcr),
    rom(0x0020, 0x004F),
    rw(0x0050, 0x00FF, Handler::Ram),
    rom(0x0100, 0x015F),
    rom(0x0160, 0x1EFF),
    rom(0x1F00, 0x1FDE), // bootloader
    rom(0x1FE0, 0x1FEF), // boot ROM vectors
    wo(0x1FF0, 0x1FF0, Handler::Copr),
    rom(0x1FF0, 0x1FFF),
];

pub static C4_CONFIG: VariantConfig = VariantConfig {
    name: "MC68HC05C4",
    short_name: "m68hc05c4",
    port_bits: [0xFF, 0xFF, 0xFF, 0xBF],
    map: C4_MAP,
    has_pcop: false,
    has_ncop: false,
    external_irq: true,
    symbols: C4_SYMS,
};

pub static C8_CONFIG: VariantConfig = VariantConfig {
    name: "MC68HC05C8",
    short_name: "m68hc05c8",
    port_bits: [0xFF, 0xFF, 0xFF, 0xBF],
    map: C8_MAP,
    has_pcop: false,
    has_ncop: false,
    external_irq: true,
    // same I/O registers as the C4
    symbols: C4_SYMS,
};

pub static C8A_CONFIG: VariantConfig = VariantConfig {
    name: "MC68HC705C8A",
    short_name: "m68hc705c8a",
    port_bits: [0xFF, 0xFF, 0xFF, 0xBF],
    map: C8A_MAP,
    has_pcop: true,
    has_ncop: true,
    external_irq: true,
    symbols: C8A_SYMS,
};

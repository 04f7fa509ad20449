//! # hc05-core
//!
//! Cycle-accurate emulation core for the Motorola M68HC05 microcontroller
//! family.
//!
//! Emulates the M6805 instruction set with the HC05 `MUL` extension, a 13-bit
//! address space with 64 bytes of hardware stack, four parallel ports, the
//! 16-bit capture/compare timer and the COP watchdogs found on the EPROM
//! parts. Three variants are covered: MC68HC05C4, MC68HC05C8 and
//! MC68HC705C8A.
//!
//! ## Architecture
//!
//! - [`Hc05`]: Top-level device that wires together CPU, memory and peripherals
//! - [`Variant`] / [`VariantConfig`]: Per-device address map, port width and capabilities
//! - [`Cpu`]: Processor registers (PC, A, X, CC, SP, run state, tick counter)
//! - [`Memory`]: Flat 8 KB backing store for ROM and RAM
//! - [`Bus`]: Byte access with a program/debugger side channel
//! - [`peripherals`]: Ports A–D, timer, COP watchdogs
//! - [`state`]: Named, side-effect-free register access for debuggers
//! - [`savestate`]: Save/load complete device state
//! - [`debugger`]: RAM viewer, I/O register viewer, watchpoints
//!
//! ## Lifecycle
//!
//! Construct with [`Hc05::new`], wire callbacks and load ROM, then call
//! [`Hc05::start`] once. After that the host drives the device with
//! [`Hc05::execute`] and delivers line changes with [`Hc05::set_irq_line`],
//! [`Hc05::set_tcap_line`] and [`Hc05::pulse_reset`].

pub mod bus;
pub mod cpu;
pub mod debugger;
pub mod error;
pub mod memory;
pub mod opcodes;
pub mod peripherals;
pub mod savestate;
pub mod state;
pub mod variant;

pub use bus::{Access, Bus};
pub use cpu::{Cpu, RunState};
pub use error::Error;
pub use memory::Memory;
pub use state::StateReg;
pub use variant::{Variant, VariantConfig};

use opcodes::{CYCLES, ILLEGAL_CYCLES};
use peripherals::{Cop, PortReadFn, PortWriteFn, Ports, TcmpWriteFn, Timer, PORT_COUNT, VEC_RESET};
use debugger::WatchKind;
use variant::Handler;

/// Size of the address space: 8 KB
pub const ADDRESS_SPACE: usize = 0x2000;
/// Every address is truncated to 13 bits
pub const ADDRESS_MASK: u16 = 0x1FFF;

// Condition code bits
pub const CC_H: u8 = 0x10;
pub const CC_I: u8 = 0x08;
pub const CC_N: u8 = 0x04;
pub const CC_Z: u8 = 0x02;
pub const CC_C: u8 = 0x01;
pub const CC_MASK: u8 = 0x1F;

// Interrupt lines, as bit numbers in the pending mask
pub const IRQ_LINE: usize = 0;
pub const TCAP_LINE: usize = 1;
pub const INT_MASK: u16 = (1 << IRQ_LINE) | (1 << TCAP_LINE);

/// Mask option byte holding the NCOPE bit on parts with a non-programmable COP.
pub const NCOPE_ADDR: u16 = 0x1FF1;

/// Cycles consumed per step while waiting or stopped.
pub const IDLE_CYCLES: u32 = 2;

/// Input lines a board can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    /// External /IRQ, asserted = true
    Irq,
    /// Timer input capture
    Tcap,
    /// /RESET, asserting it resets the device
    Reset,
}

/// Interrupt acknowledge sink, receives the serviced line number.
pub type IrqAckFn = Box<dyn FnMut(usize)>;

/// M68HC05 device combining CPU, memory and on-chip peripherals
pub struct Hc05 {
    pub cpu: Cpu,
    pub mem: Memory,
    pub ports: Ports,
    pub timer: Timer,
    pub cop: Cop,
    variant: Variant,
    pub(crate) config: &'static VariantConfig,
    clock_hz: u32,
    /// Pending interrupt lines (bit per line)
    pub(crate) pending: u16,
    /// Current /IRQ level, tested by BIL/BIH
    irq_state: bool,
    started: bool,
    /// Cycle budget carried between `execute` calls
    icount: i64,
    /// Watchdog timeout seen, reset after the current instruction
    reset_pending: bool,
    pub(crate) irq_ack_cb: Option<IrqAckFn>,
    /// Breakpoint addresses
    pub breakpoints: Vec<u16>,
    /// True if execution stopped at a breakpoint or watchpoint
    pub breakpoint_hit: bool,
    /// Watchpoints
    pub debugger: debugger::Debugger,
}

impl Hc05 {
    /// Create a device of the given variant. `clock_hz` is the oscillator
    /// frequency; the internal bus runs at half of it.
    pub fn new(variant: Variant, clock_hz: u32) -> Self {
        let config = variant.config();
        Hc05 {
            cpu: Cpu::new(),
            mem: Memory::new(),
            ports: Ports::new(config.port_bits),
            timer: Timer::new(),
            cop: Cop::new(config.has_pcop, config.has_ncop),
            variant,
            config,
            clock_hz,
            pending: 0,
            irq_state: false,
            started: false,
            icount: 0,
            reset_pending: false,
            irq_ack_cb: None,
            breakpoints: Vec::new(),
            breakpoint_hit: false,
            debugger: debugger::Debugger::new(),
        }
    }

    pub fn variant(&self) -> Variant { self.variant }
    pub fn config(&self) -> &'static VariantConfig { self.config }
    pub fn clock_hz(&self) -> u32 { self.clock_hz }
    pub fn is_started(&self) -> bool { self.started }
    pub fn pending(&self) -> u16 { self.pending }
    pub fn irq_line(&self) -> bool { self.irq_state }

    /// Override the physically present bits of ports A–D.
    ///
    /// Only allowed before [`start`](Self::start).
    pub fn set_port_bits(&mut self, bits: [u8; PORT_COUNT]) -> Result<(), Error> {
        if self.started {
            return Err(Error::AlreadyConfigured);
        }
        self.ports.set_bits(bits);
        Ok(())
    }

    pub fn set_port_read(&mut self, port: usize, cb: PortReadFn) {
        self.ports.set_read_callback(port, cb);
    }

    pub fn set_port_write(&mut self, port: usize, cb: PortWriteFn) {
        self.ports.set_write_callback(port, cb);
    }

    pub fn set_tcmp_write(&mut self, cb: TcmpWriteFn) {
        self.timer.set_tcmp_callback(cb);
    }

    pub fn set_irq_acknowledge(&mut self, cb: IrqAckFn) {
        self.irq_ack_cb = Some(cb);
    }

    /// Copy a ROM/EPROM image into the address space at `offset`.
    pub fn load_rom(&mut self, offset: u16, image: &[u8]) -> Result<usize, Error> {
        self.mem.load(offset, image)
    }

    /// Power the device on: initialise the state reset leaves alone, then reset.
    pub fn start(&mut self) {
        self.started = true;
        self.ports.power_on();
        self.timer.power_on();
        self.cop.power_on();
        self.reset();
    }

    /// Reset the CPU and the reset-affected peripheral state.
    ///
    /// ROM and RAM contents, port latches, timer registers, COPF and the
    /// PCOP counter survive.
    pub fn reset(&mut self) {
        log::debug!("{} reset", self.config.name);
        self.cpu.a = 0;
        self.cpu.x = 0;
        self.cpu.cc = CC_I;
        self.cpu.sp = cpu::SP_RESET;
        self.cpu.state = RunState::Running;
        self.pending = 0;
        self.reset_pending = false;

        self.ports.reset();
        self.timer.reset();
        self.cop.reset();
        if self.cop.has_ncop() {
            let ncope = self.mem.read_raw(NCOPE_ADDR) & 0x01 != 0;
            self.cop.set_ncope(ncope);
        }
        self.update_timer_irq();

        self.cpu.pc = self.read16(VEC_RESET, Access::Program) & ADDRESS_MASK;
    }

    /// Reset line pulse from the board.
    pub fn pulse_reset(&mut self) {
        self.reset();
    }

    pub fn clocks_to_cycles(clocks: u64) -> u64 {
        (clocks + 1) / 2
    }

    pub fn cycles_to_clocks(cycles: u64) -> u64 {
        cycles * 2
    }

    /// Run for `cycles` machine cycles and return the cycles actually used.
    ///
    /// Instructions are never split, so a call may overrun its budget; the
    /// overrun is deducted from the next call. Execution stops early at a
    /// breakpoint (other than the one at the starting PC) or a watchpoint
    /// hit, setting [`breakpoint_hit`](Self::breakpoint_hit) and dropping
    /// the rest of the budget.
    pub fn execute(&mut self, cycles: u64) -> u64 {
        let start = self.cpu.tick;
        let mut first = true;
        self.breakpoint_hit = false;
        self.icount = self.icount.saturating_add(i64::try_from(cycles).unwrap_or(i64::MAX));

        while self.icount > 0 {
            if !first && !self.breakpoints.is_empty() && self.breakpoints.contains(&self.cpu.pc) {
                self.breakpoint_hit = true;
                self.icount = 0;
                break;
            }
            first = false;

            let used = self.step();
            self.icount -= used as i64;

            if self.debugger.has_hit() {
                self.breakpoint_hit = true;
                self.icount = 0;
                break;
            }
        }
        self.cpu.tick - start
    }

    /// Run for a number of oscillator clocks.
    pub fn execute_clocks(&mut self, clocks: u64) -> u64 {
        Self::cycles_to_clocks(self.execute(Self::clocks_to_cycles(clocks)))
    }

    /// Execute one instruction boundary: take a pending interrupt if allowed,
    /// then run one instruction (or idle if waiting/stopped). Returns the
    /// cycles consumed.
    pub fn step(&mut self) -> u32 {
        let mut used = self.service_interrupt();

        match self.cpu.state {
            RunState::Wait => {
                self.burn_cycles(IDLE_CYCLES);
                used += IDLE_CYCLES;
            }
            RunState::Stop => {
                // no clock to the timer or watchdogs
                self.cpu.tick += IDLE_CYCLES as u64;
                used += IDLE_CYCLES;
            }
            RunState::Running => {
                let op = self.fetch();
                let inst = opcodes::decode(op);
                self.execute_inst(inst);
                let cycles = if inst.is_illegal() { ILLEGAL_CYCLES } else { CYCLES[op as usize] } as u32;
                self.burn_cycles(cycles);
                used += cycles;
            }
        }

        if self.reset_pending {
            self.reset();
        }
        used
    }

    /// Charge cycles to the tick counter, timer and watchdogs.
    pub(crate) fn burn_cycles(&mut self, count: u32) {
        self.cpu.tick += count as u64;
        self.timer.advance(count);
        self.update_timer_irq();
        if self.cop.advance(count) {
            self.reset_pending = true;
        }
    }

    /// Mirror the timer interrupt request into the pending mask.
    fn update_timer_irq(&mut self) {
        if self.timer.irq() {
            self.pending |= 1 << TCAP_LINE;
        } else {
            self.pending &= !(1 << TCAP_LINE);
        }
    }

    /// Drive the external /IRQ line. Assertion latches a pending interrupt.
    pub fn set_irq_line(&mut self, state: bool) {
        if state && !self.irq_state {
            log::trace!(target: "hc05::int", "/IRQ asserted");
            self.pending |= 1 << IRQ_LINE;
        }
        self.irq_state = state;
    }

    /// Drive the timer input capture pin.
    pub fn set_tcap_line(&mut self, state: bool) {
        self.timer.set_tcap(state);
        self.update_timer_irq();
    }

    pub fn set_input_line(&mut self, line: Line, state: bool) {
        match line {
            Line::Irq => self.set_irq_line(state),
            Line::Tcap => self.set_tcap_line(state),
            Line::Reset => {
                if state {
                    self.pulse_reset();
                }
            }
        }
    }

    fn read_handler(&mut self, handler: Handler, offset: u16, addr: u16, access: Access) -> u8 {
        let port = offset as usize;
        let low = offset & 1 != 0;
        match handler {
            Handler::Port => self.ports.read(port, access),
            Handler::Ddr => self.ports.read_ddr(port),
            Handler::Tcr => self.timer.read_tcr(),
            Handler::Tsr => self.timer.read_tsr(access),
            Handler::Icr => {
                let v = self.timer.read_icr(low, access);
                self.update_timer_irq();
                v
            }
            Handler::Ocr => {
                let v = self.timer.read_ocr(low, access);
                self.update_timer_irq();
                v
            }
            Handler::Timer => {
                let v = self.timer.read_counter(offset, access);
                self.update_timer_irq();
                v
            }
            Handler::Copcr => self.cop.read_copcr(access),
            Handler::Rom | Handler::Ram => self.mem.read_raw(addr),
            Handler::Coprst | Handler::Copr => 0xFF,
        }
    }

    fn write_handler(&mut self, handler: Handler, offset: u16, addr: u16, value: u8, access: Access) {
        let port = offset as usize;
        match handler {
            Handler::Port => self.ports.write_latch(port, value),
            Handler::Ddr => self.ports.write_ddr(port, value),
            Handler::Tcr => {
                self.timer.write_tcr(value);
                self.update_timer_irq();
            }
            Handler::Ocr => {
                self.timer.write_ocr(offset & 1 != 0, value, access);
                self.update_timer_irq();
            }
            Handler::Coprst => {
                if access.is_debugger() {
                    self.cop.set_coprst_raw(value);
                } else {
                    self.cop.write_coprst(value);
                }
            }
            Handler::Copcr => self.cop.write_copcr(value),
            Handler::Copr => {
                if !access.is_debugger() {
                    self.cop.write_copr(value);
                }
            }
            Handler::Ram => self.mem.write_raw(addr, value),
            // debuggers may patch ROM
            Handler::Rom => {
                if access.is_debugger() {
                    self.mem.write_raw(addr, value);
                }
            }
            Handler::Tsr | Handler::Icr | Handler::Timer => {}
        }
    }

    /// Format a register dump string.
    pub fn dump_regs(&self) -> String {
        let c = &self.cpu;
        let flag = |m: u8, ch: char| if c.cc & m != 0 { ch } else { '-' };
        format!(
            "PC={:04X} A={:02X} X={:02X} SP={:04X} CC={}{}{}{}{} ({:02X}) {:?} tick={}",
            c.pc, c.a, c.x, c.sp,
            flag(CC_H, 'H'), flag(CC_I, 'I'), flag(CC_N, 'N'), flag(CC_Z, 'Z'), flag(CC_C, 'C'),
            c.cc, c.state, c.tick)
    }

    /// Dump a memory region as hex + ASCII.
    pub fn dump_ram(&self, start: u16, length: u16) -> String {
        debugger::dump_ram(&self.mem.data, start, length)
    }

    /// Dump the variant's named I/O registers.
    pub fn dump_io(&mut self) -> String {
        debugger::dump_io_regs(self)
    }
}

impl Bus for Hc05 {
    fn read8(&mut self, addr: u16, access: Access) -> u8 {
        let addr = addr & ADDRESS_MASK;
        let value = match self.config.read_handler(addr) {
            Some((handler, offset)) => self.read_handler(handler, offset, addr, access),
            None => 0xFF,
        };
        if !access.is_debugger() && !self.debugger.is_empty() {
            self.debugger.observe(addr, WatchKind::Read, value, None);
        }
        value
    }

    fn write8(&mut self, addr: u16, value: u8, access: Access) {
        let addr = addr & ADDRESS_MASK;
        if !access.is_debugger() && !self.debugger.is_empty() {
            let old = self.mem.read_raw(addr);
            self.debugger.observe(addr, WatchKind::Write, value, Some(old));
        }
        if let Some((handler, offset)) = self.config.write_handler(addr) {
            self.write_handler(handler, offset, addr, value, access);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripherals::{TCR_TOIE, TSR_TOF};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// `program` at 0x0100, reset vector to it, timer vector to 0x0200,
    /// /IRQ vector to 0x0300. Both handlers are NOPs.
    fn device(variant: Variant, program: &[u8]) -> Hc05 {
        let mut m = Hc05::new(variant, 4_000_000);
        m.load_rom(0x0100, program).unwrap();
        m.load_rom(0x0200, &[0x9D]).unwrap();
        m.load_rom(0x0300, &[0x9D]).unwrap();
        m.load_rom(0x1FF8, &[0x02, 0x00, 0x03, 0x00]).unwrap();
        m.load_rom(0x1FFE, &[0x01, 0x00]).unwrap();
        m.start();
        m
    }

    #[test]
    fn test_device_creation() {
        let m = Hc05::new(Variant::Mc68hc05c8, 4_000_000);
        assert_eq!(m.variant(), Variant::Mc68hc05c8);
        assert_eq!(m.config().name, "MC68HC05C8");
        assert!(!m.is_started());
        assert_eq!(m.ports.bits(3), 0xBF);
    }

    #[test]
    fn test_port_bits_locked_after_start() {
        let mut m = Hc05::new(Variant::Mc68hc05c4, 4_000_000);
        assert!(m.set_port_bits([0xFF, 0x0F, 0xFF, 0xFF]).is_ok());
        assert_eq!(m.ports.bits(1), 0x0F);
        m.start();
        assert!(matches!(m.set_port_bits([0xFF; 4]), Err(Error::AlreadyConfigured)));
    }

    #[test]
    fn test_clock_conversion() {
        assert_eq!(Hc05::clocks_to_cycles(0), 0);
        assert_eq!(Hc05::clocks_to_cycles(1), 1);
        assert_eq!(Hc05::clocks_to_cycles(4), 2);
        assert_eq!(Hc05::cycles_to_clocks(3), 6);
    }

    #[test]
    fn test_execute_carries_overrun() {
        // BRA * (3 cycles)
        let mut m = device(Variant::Mc68hc05c4, &[0x20, 0xFE]);
        assert_eq!(m.execute(4), 6);
        // 2 cycles of overrun are owed, so 2 more does nothing
        assert_eq!(m.execute(2), 0);
        assert_eq!(m.execute(1), 3);
    }

    #[test]
    fn test_execute_huge_budget_runs() {
        // NOP ; NOP ; BRA *
        let mut m = device(Variant::Mc68hc05c4, &[0x9D, 0x9D, 0x20, 0xFE]);
        m.breakpoints.push(0x0102);
        assert_eq!(m.execute(u64::MAX), 4);
        assert!(m.breakpoint_hit);
        assert_eq!(m.cpu.pc, 0x0102);
    }

    #[test]
    fn test_unmapped_and_rom_access() {
        let mut m = device(Variant::Mc68hc05c4, &[0x9D]);
        assert_eq!(m.read8(0x1200, Access::Program), 0xFF);
        m.write8(0x0100, 0x00, Access::Program);
        assert_eq!(m.read8(0x0100, Access::Program), 0x9D);
        m.write8(0x0100, 0x00, Access::Debugger);
        assert_eq!(m.read8(0x0100, Access::Program), 0x00);
        // 13-bit decode
        m.write8(0x2050, 0x5A, Access::Program);
        assert_eq!(m.mem.read_raw(0x0050), 0x5A);
    }

    #[test]
    fn test_external_irq_before_timer() {
        // CLI ; NOP ; NOP
        let mut m = device(Variant::Mc68hc05c4, &[0x9A, 0x9D, 0x9D]);
        let acks = Rc::new(RefCell::new(Vec::new()));
        let sink = acks.clone();
        m.set_irq_acknowledge(Box::new(move |line| sink.borrow_mut().push(line)));

        m.timer.set_tsr_raw(TSR_TOF);
        m.write8(0x0012, TCR_TOIE, Access::Program);
        m.set_irq_line(true);
        assert_eq!(m.pending(), INT_MASK);

        m.step(); // CLI, I was set so nothing taken yet
        assert_eq!(m.cpu.pc, 0x0101);
        m.step(); // /IRQ taken, handler NOP runs
        assert_eq!(m.cpu.pc, 0x0301);
        assert_eq!(*acks.borrow(), vec![IRQ_LINE]);
        assert_eq!(m.pending(), 1 << TCAP_LINE);
        // I is set inside the handler, so the timer has to wait
        m.step();
        assert_eq!(*acks.borrow(), vec![IRQ_LINE]);
        assert!(m.cpu.flag(CC_I));
    }

    #[test]
    fn test_timer_interrupt_is_level_held() {
        // CLI ; NOP
        let mut m = device(Variant::Mc68hc05c4, &[0x9A, 0x9D]);
        m.timer.set_tsr_raw(TSR_TOF);
        m.write8(0x0012, TCR_TOIE, Access::Program);
        m.step();
        let used = m.step();
        assert_eq!(used, 10 + 2);
        assert_eq!(m.cpu.pc, 0x0201);
        assert_eq!(m.pending(), 1 << TCAP_LINE);

        // clearing TOF through TSR + TRL drops the request
        m.read8(0x0013, Access::Program);
        m.read8(0x0019, Access::Program);
        assert_eq!(m.pending(), 0);
    }

    static NO_EXT_IRQ: VariantConfig = VariantConfig {
        name: "TEST",
        short_name: "test",
        port_bits: [0xFF; 4],
        map: &[],
        has_pcop: false,
        has_ncop: false,
        external_irq: false,
        symbols: &[],
    };

    #[test]
    #[should_panic(expected = "Unknown pending interrupt")]
    fn test_unknown_pending_interrupt_is_fatal() {
        let mut m = Hc05::new(Variant::Mc68hc05c4, 4_000_000);
        m.config = &NO_EXT_IRQ;
        m.start();
        m.cpu.cc = 0;
        m.set_irq_line(true);
        m.step();
    }

    #[test]
    fn test_pcop_timeout_resets_device() {
        // LDA #$04 ; STA COPCR ; BRA *
        let mut m = device(Variant::Mc68hc705c8a, &[0xA6, 0x04, 0xB7, 0x1E, 0x20, 0xFE]);
        m.execute(1 << 15);
        assert_eq!(m.cop.copcr() & peripherals::COPCR_COPF, peripherals::COPCR_COPF);
        // back at the reset vector with fresh registers
        assert_eq!(m.cpu.pc, 0x0100);
        assert_eq!(m.cpu.a, 0x00);
        assert!(m.cpu.flag(CC_I));
    }

    #[test]
    fn test_ncop_enable_from_mask_option() {
        let mut m = Hc05::new(Variant::Mc68hc705c8a, 4_000_000);
        m.load_rom(0x1FF1, &[0x01]).unwrap();
        m.start();
        assert!(m.cop.ncope());

        let mut m = Hc05::new(Variant::Mc68hc05c8, 4_000_000);
        m.load_rom(0x1FF1, &[0x01]).unwrap();
        m.start();
        assert!(!m.cop.ncope());
    }

    #[test]
    fn test_copr_write_clears_ncop() {
        let mut m = Hc05::new(Variant::Mc68hc705c8a, 4_000_000);
        m.load_rom(0x1FF1, &[0x01]).unwrap();
        m.start();
        m.burn_cycles(1000);
        assert_eq!(m.cop.ncop_cnt(), 1000);
        m.write8(0x1FF0, 0x00, Access::Program);
        assert_eq!(m.cop.ncop_cnt(), 0);
    }

    #[test]
    fn test_breakpoint_stops_execution() {
        // NOP ; NOP ; NOP ; BRA *
        let mut m = device(Variant::Mc68hc05c4, &[0x9D, 0x9D, 0x9D, 0x20, 0xFE]);
        m.breakpoints.push(0x0102);
        m.execute(100);
        assert!(m.breakpoint_hit);
        assert_eq!(m.cpu.pc, 0x0102);
        // resuming steps past the breakpoint
        m.execute(4);
        assert!(!m.breakpoint_hit);
        assert_eq!(m.cpu.pc, 0x0103);
    }

    #[test]
    fn test_stop_freezes_timer() {
        // STOP
        let mut m = device(Variant::Mc68hc05c4, &[0x8E]);
        m.step();
        let counter = m.timer.counter();
        m.execute(64);
        assert_eq!(m.cpu.state, RunState::Stop);
        assert_eq!(m.timer.counter(), counter);
    }

    #[test]
    fn test_reset_line() {
        let mut m = device(Variant::Mc68hc05c4, &[0x9D, 0x9D]);
        m.step();
        m.set_input_line(Line::Reset, true);
        assert_eq!(m.cpu.pc, 0x0100);
    }
}

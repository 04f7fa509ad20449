//! M68HC05 CPU core.
//!
//! Holds the processor registers and implements instruction execution and
//! interrupt entry. Execution runs on [`Hc05`] so that every memory access
//! goes through the device's [`Bus`] decode and reaches the peripherals.
//!
//! The stack lives in the top 64 bytes of page zero. SP is 13 bits wide in
//! the state interface but only its low six bits move; pushing below 0xC0
//! wraps to 0xFF and pulling past 0xFF wraps to 0xC0.

use serde::{Deserialize, Serialize};

use crate::bus::{Access, Bus};
use crate::opcodes::{AluOp, Cond, Instruction, Mode, RmwMode, RmwOp};
use crate::peripherals::{VEC_INT, VEC_SWI, VEC_TIMER};
use crate::{Hc05, ADDRESS_MASK, INT_MASK, IRQ_LINE, TCAP_LINE};
use crate::{CC_C, CC_H, CC_I, CC_MASK, CC_N, CC_Z};

/// Stack pointer bits that actually count.
pub const SP_MASK: u16 = 0x003F;
/// Fixed upper bits of the stack pointer.
pub const SP_FLOOR: u16 = 0x00C0;
/// Stack pointer after reset or RSP.
pub const SP_RESET: u16 = 0x00FF;

/// Cycles charged for taking an interrupt.
pub const INTERRUPT_CYCLES: u32 = 10;

/// Low-power state entered by WAIT / STOP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Running,
    /// CPU halted, timer and watchdogs keep running.
    Wait,
    /// Oscillator stopped.
    Stop,
}

/// Processor registers.
pub struct Cpu {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    /// Condition codes: H I N Z C (bits 4..0)
    pub cc: u8,
    pub sp: u16,
    pub state: RunState,
    /// Monotonic cycle counter
    pub tick: u64,
}

impl Cpu {
    pub fn new() -> Self {
        Cpu { pc: 0, a: 0, x: 0, cc: CC_I, sp: SP_RESET, state: RunState::Running, tick: 0 }
    }

    #[inline(always)]
    pub fn flag(&self, mask: u8) -> bool {
        self.cc & mask != 0
    }

    #[inline(always)]
    pub fn set_flag(&mut self, mask: u8, v: bool) {
        if v { self.cc |= mask; } else { self.cc &= !mask; }
    }

    #[inline(always)]
    fn set_nz(&mut self, r: u8) {
        self.set_flag(CC_N, r & 0x80 != 0);
        self.set_flag(CC_Z, r == 0);
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

// --- Flag helpers ---

/// Flags for ADD/ADC: H N Z C.
pub fn flags_add(cpu: &mut Cpu, a: u8, m: u8, r: u8) {
    let carries = (a & m) | (m & !r) | (!r & a);
    cpu.set_flag(CC_H, carries & 0x08 != 0);
    cpu.set_flag(CC_C, carries & 0x80 != 0);
    cpu.set_nz(r);
}

/// Flags for SUB/SBC/CMP/CPX: N Z C. H is left alone.
pub fn flags_sub(cpu: &mut Cpu, a: u8, m: u8, r: u8) {
    let borrows = (!a & m) | (m & r) | (r & !a);
    cpu.set_flag(CC_C, borrows & 0x80 != 0);
    cpu.set_nz(r);
}

#[inline(always)]
fn rel(pc: u16, offset: u8) -> u16 {
    pc.wrapping_add(offset as i8 as u16) & ADDRESS_MASK
}

// ---- Instruction execution on Hc05 ----

impl Hc05 {
    #[inline]
    pub(crate) fn fetch(&mut self) -> u8 {
        let v = self.read8(self.cpu.pc, Access::Program);
        self.cpu.pc = (self.cpu.pc + 1) & ADDRESS_MASK;
        v
    }

    fn fetch16(&mut self) -> u16 {
        let hi = self.fetch();
        let lo = self.fetch();
        (hi as u16) << 8 | lo as u16
    }

    /// Resolve the operand address for a register/memory instruction.
    /// Immediate operands are addressed in place.
    fn effective_addr(&mut self, mode: Mode) -> u16 {
        let x = self.cpu.x as u16;
        match mode {
            Mode::Imm => {
                let ea = self.cpu.pc;
                self.cpu.pc = (self.cpu.pc + 1) & ADDRESS_MASK;
                ea
            }
            Mode::Dir => self.fetch() as u16,
            Mode::Ext => self.fetch16() & ADDRESS_MASK,
            Mode::Ix2 => self.fetch16().wrapping_add(x) & ADDRESS_MASK,
            Mode::Ix1 => self.fetch() as u16 + x,
            Mode::Ix => x,
        }
    }

    fn push8(&mut self, v: u8) {
        self.write8(self.cpu.sp, v, Access::Program);
        self.cpu.sp = (self.cpu.sp.wrapping_sub(1) & SP_MASK) | SP_FLOOR;
    }

    fn pull8(&mut self) -> u8 {
        self.cpu.sp = (self.cpu.sp.wrapping_add(1) & SP_MASK) | SP_FLOOR;
        self.read8(self.cpu.sp, Access::Program)
    }

    fn push_pc(&mut self) {
        let pc = self.cpu.pc;
        self.push8(pc as u8);
        self.push8((pc >> 8) as u8);
    }

    fn pull_pc(&mut self) {
        let hi = self.pull8();
        let lo = self.pull8();
        self.cpu.pc = ((hi as u16) << 8 | lo as u16) & ADDRESS_MASK;
    }

    /// Stack the full machine state, as for SWI and interrupts.
    fn push_frame(&mut self) {
        self.push_pc();
        self.push8(self.cpu.x);
        self.push8(self.cpu.a);
        self.push8(self.cpu.cc | !CC_MASK);
    }

    fn condition(&self, cond: Cond) -> bool {
        let c = &self.cpu;
        match cond {
            Cond::Always => true,
            Cond::Never => false,
            Cond::Hi => !c.flag(CC_C) && !c.flag(CC_Z),
            Cond::Ls => c.flag(CC_C) || c.flag(CC_Z),
            Cond::Cc => !c.flag(CC_C),
            Cond::Cs => c.flag(CC_C),
            Cond::Ne => !c.flag(CC_Z),
            Cond::Eq => c.flag(CC_Z),
            Cond::Hcc => !c.flag(CC_H),
            Cond::Hcs => c.flag(CC_H),
            Cond::Pl => !c.flag(CC_N),
            Cond::Mi => c.flag(CC_N),
            Cond::Mc => !c.flag(CC_I),
            Cond::Ms => c.flag(CC_I),
            Cond::Il => self.irq_line(),
            Cond::Ih => !self.irq_line(),
        }
    }

    fn rmw(&mut self, op: RmwOp, m: u8) -> u8 {
        let cpu = &mut self.cpu;
        let r = match op {
            RmwOp::Neg => {
                let r = 0u8.wrapping_sub(m);
                cpu.set_flag(CC_C, r != 0);
                r
            }
            RmwOp::Com => {
                cpu.set_flag(CC_C, true);
                !m
            }
            RmwOp::Lsr => {
                cpu.set_flag(CC_C, m & 0x01 != 0);
                m >> 1
            }
            RmwOp::Ror => {
                let r = (m >> 1) | if cpu.flag(CC_C) { 0x80 } else { 0 };
                cpu.set_flag(CC_C, m & 0x01 != 0);
                r
            }
            RmwOp::Asr => {
                cpu.set_flag(CC_C, m & 0x01 != 0);
                (m >> 1) | (m & 0x80)
            }
            RmwOp::Lsl => {
                cpu.set_flag(CC_C, m & 0x80 != 0);
                m << 1
            }
            RmwOp::Rol => {
                let r = (m << 1) | cpu.flag(CC_C) as u8;
                cpu.set_flag(CC_C, m & 0x80 != 0);
                r
            }
            RmwOp::Dec => m.wrapping_sub(1),
            RmwOp::Inc => m.wrapping_add(1),
            RmwOp::Tst => m,
            RmwOp::Clr => 0,
        };
        cpu.set_nz(r);
        r
    }

    fn alu(&mut self, op: AluOp, m: u8) {
        let a = self.cpu.a;
        let x = self.cpu.x;
        let carry = self.cpu.flag(CC_C) as u8;
        let cpu = &mut self.cpu;
        match op {
            AluOp::Sub => {
                let r = a.wrapping_sub(m);
                flags_sub(cpu, a, m, r);
                cpu.a = r;
            }
            AluOp::Cmp => {
                let r = a.wrapping_sub(m);
                flags_sub(cpu, a, m, r);
            }
            AluOp::Sbc => {
                let r = a.wrapping_sub(m).wrapping_sub(carry);
                flags_sub(cpu, a, m, r);
                cpu.a = r;
            }
            AluOp::Cpx => {
                let r = x.wrapping_sub(m);
                flags_sub(cpu, x, m, r);
            }
            AluOp::And => {
                cpu.a = a & m;
                cpu.set_nz(cpu.a);
            }
            AluOp::Bit => cpu.set_nz(a & m),
            AluOp::Lda => {
                cpu.a = m;
                cpu.set_nz(m);
            }
            AluOp::Eor => {
                cpu.a = a ^ m;
                cpu.set_nz(cpu.a);
            }
            AluOp::Adc => {
                let r = a.wrapping_add(m).wrapping_add(carry);
                flags_add(cpu, a, m, r);
                cpu.a = r;
            }
            AluOp::Ora => {
                cpu.a = a | m;
                cpu.set_nz(cpu.a);
            }
            AluOp::Add => {
                let r = a.wrapping_add(m);
                flags_add(cpu, a, m, r);
                cpu.a = r;
            }
            AluOp::Ldx => {
                cpu.x = m;
                cpu.set_nz(m);
            }
        }
    }

    /// Execute one decoded instruction whose opcode byte has already been
    /// fetched. Cycle accounting is left to the caller.
    pub fn execute_inst(&mut self, inst: Instruction) {
        match inst {
            // -- Bit manipulation --
            Instruction::Brset { bit } | Instruction::Brclr { bit } => {
                let addr = self.fetch() as u16;
                let offset = self.fetch();
                let set = self.read8(addr, Access::Program) & (1 << bit) != 0;
                self.cpu.set_flag(CC_C, set);
                if set == matches!(inst, Instruction::Brset { .. }) {
                    self.cpu.pc = rel(self.cpu.pc, offset);
                }
            }
            Instruction::Bset { bit } => {
                let addr = self.fetch() as u16;
                let v = self.read8(addr, Access::Program);
                self.write8(addr, v | (1 << bit), Access::Program);
            }
            Instruction::Bclr { bit } => {
                let addr = self.fetch() as u16;
                let v = self.read8(addr, Access::Program);
                self.write8(addr, v & !(1 << bit), Access::Program);
            }

            // -- Branch --
            Instruction::Branch(cond) => {
                let offset = self.fetch();
                if self.condition(cond) {
                    self.cpu.pc = rel(self.cpu.pc, offset);
                }
            }
            Instruction::Bsr => {
                let offset = self.fetch();
                self.push_pc();
                self.cpu.pc = rel(self.cpu.pc, offset);
            }

            // -- Read-modify-write --
            Instruction::Rmw { op, mode } => {
                let addr = match mode {
                    RmwMode::Dir => self.fetch() as u16,
                    RmwMode::Ix1 => self.fetch() as u16 + self.cpu.x as u16,
                    RmwMode::Ix => self.cpu.x as u16,
                    RmwMode::Acc | RmwMode::Idx => 0,
                };
                let m = match mode {
                    RmwMode::Acc => self.cpu.a,
                    RmwMode::Idx => self.cpu.x,
                    _ => self.read8(addr, Access::Program),
                };
                let r = self.rmw(op, m);
                if op != RmwOp::Tst {
                    match mode {
                        RmwMode::Acc => self.cpu.a = r,
                        RmwMode::Idx => self.cpu.x = r,
                        _ => self.write8(addr, r, Access::Program),
                    }
                }
            }
            Instruction::Mul => {
                let p = self.cpu.x as u16 * self.cpu.a as u16;
                self.cpu.x = (p >> 8) as u8;
                self.cpu.a = p as u8;
                self.cpu.cc &= !(CC_H | CC_C);
            }

            // -- Register/memory --
            Instruction::Alu { op, mode } => {
                let ea = self.effective_addr(mode);
                let m = self.read8(ea, Access::Program);
                self.alu(op, m);
            }
            Instruction::Sta { mode } => {
                let ea = self.effective_addr(mode);
                let a = self.cpu.a;
                self.write8(ea, a, Access::Program);
                self.cpu.set_nz(a);
            }
            Instruction::Stx { mode } => {
                let ea = self.effective_addr(mode);
                let x = self.cpu.x;
                self.write8(ea, x, Access::Program);
                self.cpu.set_nz(x);
            }
            Instruction::Jmp { mode } => {
                self.cpu.pc = self.effective_addr(mode);
            }
            Instruction::Jsr { mode } => {
                let ea = self.effective_addr(mode);
                self.push_pc();
                self.cpu.pc = ea;
            }

            // -- Control --
            Instruction::Rti => {
                self.cpu.cc = self.pull8() & CC_MASK;
                self.cpu.a = self.pull8();
                self.cpu.x = self.pull8();
                self.pull_pc();
            }
            Instruction::Rts => self.pull_pc(),
            Instruction::Swi => {
                self.push_frame();
                self.cpu.cc |= CC_I;
                self.cpu.pc = self.read16(VEC_SWI, Access::Program) & ADDRESS_MASK;
            }
            Instruction::Stop => {
                self.cpu.cc &= !CC_I;
                self.cpu.state = RunState::Stop;
            }
            Instruction::Wait => {
                self.cpu.cc &= !CC_I;
                self.cpu.state = RunState::Wait;
            }
            Instruction::Tax => self.cpu.x = self.cpu.a,
            Instruction::Txa => self.cpu.a = self.cpu.x,
            Instruction::Clc => self.cpu.cc &= !CC_C,
            Instruction::Sec => self.cpu.cc |= CC_C,
            Instruction::Cli => self.cpu.cc &= !CC_I,
            Instruction::Sei => self.cpu.cc |= CC_I,
            Instruction::Rsp => self.cpu.sp = SP_RESET,
            Instruction::Nop => {}
            Instruction::Illegal(op) => {
                log::warn!("illegal opcode {:02X} at {:04X}",
                    op, self.cpu.pc.wrapping_sub(1) & ADDRESS_MASK);
            }
        }
    }

    /// Take the highest-priority pending interrupt if the I mask allows it.
    /// Returns the cycles charged.
    ///
    /// # Panics
    ///
    /// Panics if an unmasked interrupt is pending that no enabled source
    /// accounts for. That can only happen if the pending mask was corrupted.
    pub(crate) fn service_interrupt(&mut self) -> u32 {
        if self.pending & INT_MASK == 0 || self.cpu.flag(CC_I) {
            return 0;
        }

        self.push_frame();
        self.cpu.cc |= CC_I;

        let (line, vector) = if self.config.external_irq && self.pending & (1 << IRQ_LINE) != 0 {
            // edge-triggered, consumed by servicing
            self.pending &= !(1 << IRQ_LINE);
            (IRQ_LINE, VEC_INT)
        } else if self.pending & (1 << TCAP_LINE) != 0 {
            (TCAP_LINE, VEC_TIMER)
        } else {
            panic!("Unknown pending interrupt {:04X}", self.pending);
        };
        log::debug!(target: "hc05::int", "take {} interrupt",
            if line == IRQ_LINE { "IRQ" } else { "timer" });

        if let Some(cb) = self.irq_ack_cb.as_mut() {
            cb(line);
        }
        self.cpu.pc = self.read16(vector, Access::Program) & ADDRESS_MASK;
        self.cpu.state = RunState::Running;

        self.burn_cycles(INTERRUPT_CYCLES);
        INTERRUPT_CYCLES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::{decode, CYCLES};
    use crate::variant::Variant;

    /// C4 with `program` at 0x0100 and the reset vector pointing at it.
    fn machine(program: &[u8]) -> Hc05 {
        let mut m = Hc05::new(Variant::Mc68hc05c4, 4_000_000);
        m.load_rom(0x0100, program).unwrap();
        m.load_rom(0x1FFE, &[0x01, 0x00]).unwrap();
        m.start();
        m
    }

    #[test]
    fn test_reset_state() {
        let m = machine(&[0x9D]);
        assert_eq!(m.cpu.pc, 0x0100);
        assert_eq!(m.cpu.sp, 0x00FF);
        assert_eq!(m.cpu.cc, CC_I);
        assert_eq!((m.cpu.a, m.cpu.x), (0, 0));
    }

    #[test]
    fn test_lda_sta() {
        // LDA #$80 ; STA $50
        let mut m = machine(&[0xA6, 0x80, 0xB7, 0x50]);
        assert_eq!(m.step(), 2);
        assert_eq!(m.cpu.a, 0x80);
        assert!(m.cpu.flag(CC_N));
        assert_eq!(m.step(), 4);
        assert_eq!(m.mem.read_raw(0x0050), 0x80);
        assert_eq!(m.cpu.pc, 0x0104);
    }

    #[test]
    fn test_add_half_carry_and_carry() {
        // LDA #$0F ; ADD #$01 ; ADD #$F0
        let mut m = machine(&[0xA6, 0x0F, 0xAB, 0x01, 0xAB, 0xF0]);
        m.step();
        m.step();
        assert_eq!(m.cpu.a, 0x10);
        assert!(m.cpu.flag(CC_H));
        assert!(!m.cpu.flag(CC_C));
        m.step();
        assert_eq!(m.cpu.a, 0x00);
        assert!(m.cpu.flag(CC_C));
        assert!(m.cpu.flag(CC_Z));
        assert!(!m.cpu.flag(CC_H));
    }

    #[test]
    fn test_sub_borrow_and_sbc() {
        // CLR A ; SUB #$01 ; SBC #$00
        let mut m = machine(&[0x4F, 0xA0, 0x01, 0xA2, 0x00]);
        m.step();
        assert!(m.cpu.flag(CC_Z));
        m.step();
        assert_eq!(m.cpu.a, 0xFF);
        assert!(m.cpu.flag(CC_C));
        assert!(m.cpu.flag(CC_N));
        m.step();
        assert_eq!(m.cpu.a, 0xFE);
        assert!(!m.cpu.flag(CC_C));
    }

    #[test]
    fn test_cpx_does_not_modify() {
        // LDX #$10 ; CPX #$20
        let mut m = machine(&[0xAE, 0x10, 0xA3, 0x20]);
        m.step();
        m.step();
        assert_eq!(m.cpu.x, 0x10);
        assert!(m.cpu.flag(CC_C));
        assert!(m.cpu.flag(CC_N));
    }

    #[test]
    fn test_mul() {
        // LDA #$20 ; LDX #$10 ; SEC ; MUL
        let mut m = machine(&[0xA6, 0x20, 0xAE, 0x10, 0x99, 0x42]);
        m.step();
        m.step();
        m.step();
        assert_eq!(m.step(), 11);
        assert_eq!(m.cpu.x, 0x02);
        assert_eq!(m.cpu.a, 0x00);
        assert!(!m.cpu.flag(CC_C));
    }

    #[test]
    fn test_rmw_flags() {
        // LDA #$01 ; NEGA ; COMA ; LSRA
        let mut m = machine(&[0xA6, 0x01, 0x40, 0x43, 0x44]);
        m.step();
        m.step();
        assert_eq!(m.cpu.a, 0xFF);
        assert!(m.cpu.flag(CC_C));
        m.step();
        assert_eq!(m.cpu.a, 0x00);
        assert!(m.cpu.flag(CC_C));
        assert!(m.cpu.flag(CC_Z));
        m.step();
        assert!(!m.cpu.flag(CC_C));
        assert!(!m.cpu.flag(CC_N));
    }

    #[test]
    fn test_rmw_memory_and_tst() {
        // INC $60 ; INC $60 ; TST $60 ; CLR $60
        let mut m = machine(&[0x3C, 0x60, 0x3C, 0x60, 0x3D, 0x60, 0x3F, 0x60]);
        m.step();
        m.step();
        assert_eq!(m.mem.read_raw(0x0060), 0x02);
        assert_eq!(m.step(), 4);
        assert_eq!(m.mem.read_raw(0x0060), 0x02);
        assert!(!m.cpu.flag(CC_Z));
        m.step();
        assert_eq!(m.mem.read_raw(0x0060), 0x00);
        assert!(m.cpu.flag(CC_Z));
    }

    #[test]
    fn test_indexed_modes() {
        // LDX #$04 ; LDA $5C,X ; LDA $0100,X
        let mut m = machine(&[0xAE, 0x04, 0xE6, 0x5C, 0xD6, 0x01, 0x00]);
        m.mem.write_raw(0x0060, 0x42);
        m.step();
        m.step();
        assert_eq!(m.cpu.a, 0x42);
        m.step();
        // 0x0104 holds the opcode of the last LDA
        assert_eq!(m.cpu.a, 0xD6);
    }

    #[test]
    fn test_stack_window_wraps() {
        let mut m = machine(&[0x9D]);
        m.cpu.sp = 0x00C0;
        m.push8(0xAA);
        assert_eq!(m.cpu.sp, 0x00FF);
        assert_eq!(m.mem.read_raw(0x00C0), 0xAA);
        assert_eq!(m.pull8(), 0xAA);
        assert_eq!(m.cpu.sp, 0x00C0);
        m.cpu.sp = 0x00FF;
        m.pull8();
        assert_eq!(m.cpu.sp, 0x00C0);
    }

    #[test]
    fn test_swi_rti_frame() {
        // LDA #$11 ; LDX #$22 ; SWI ; ... handler at 0x0200: RTI
        let mut m = machine(&[0xA6, 0x11, 0xAE, 0x22, 0x83, 0x9D]);
        m.load_rom(0x0200, &[0x80]).unwrap();
        m.load_rom(0x1FFC, &[0x02, 0x00]).unwrap();
        m.step();
        m.step();
        let cc = m.cpu.cc;
        assert_eq!(m.step(), 10);
        assert_eq!(m.cpu.pc, 0x0200);
        assert_eq!(m.cpu.sp, 0x00FA);
        assert_eq!(m.mem.read_raw(0x00FF), 0x05);
        assert_eq!(m.mem.read_raw(0x00FE), 0x01);
        assert_eq!(m.mem.read_raw(0x00FD), 0x22);
        assert_eq!(m.mem.read_raw(0x00FC), 0x11);
        assert_eq!(m.mem.read_raw(0x00FB), cc | 0xE0);
        m.cpu.a = 0;
        m.cpu.x = 0;
        assert_eq!(m.step(), 9);
        assert_eq!(m.cpu.pc, 0x0105);
        assert_eq!((m.cpu.a, m.cpu.x, m.cpu.cc), (0x11, 0x22, cc));
        assert_eq!(m.cpu.sp, 0x00FF);
    }

    #[test]
    fn test_jsr_rts_and_bsr() {
        // JSR $0110 ; BSR +0x0B ; ... 0x0110: RTS
        let mut m = machine(&[0xCD, 0x01, 0x10, 0xAD, 0x0B]);
        m.load_rom(0x0110, &[0x81]).unwrap();
        assert_eq!(m.step(), 6);
        assert_eq!(m.cpu.pc, 0x0110);
        m.step();
        assert_eq!(m.cpu.pc, 0x0103);
        m.step();
        assert_eq!(m.cpu.pc, 0x0110);
        m.step();
        assert_eq!(m.cpu.pc, 0x0105);
    }

    #[test]
    fn test_brset_brclr() {
        // BSET 3,$50 ; BRSET 3,$50,+2 ; NOP ; NOP ; BRCLR 3,$50,-2
        let mut m = machine(&[0x16, 0x50, 0x06, 0x50, 0x02, 0x9D, 0x9D, 0x07, 0x50, 0xFE]);
        m.step();
        assert_eq!(m.mem.read_raw(0x0050), 0x08);
        m.step();
        assert!(m.cpu.flag(CC_C));
        assert_eq!(m.cpu.pc, 0x0107);
        m.step();
        assert!(m.cpu.flag(CC_C));
        assert_eq!(m.cpu.pc, 0x010A);
    }

    #[test]
    fn test_branch_conditions() {
        // SEC ; BCS +2 ; NOP ; NOP ; BHI -4
        let mut m = machine(&[0x99, 0x25, 0x02, 0x9D, 0x9D, 0x22, 0xFC]);
        m.step();
        m.step();
        assert_eq!(m.cpu.pc, 0x0105);
        m.step();
        assert_eq!(m.cpu.pc, 0x0107);
    }

    #[test]
    fn test_bil_bih_follow_irq_line() {
        // BIL +1 ; BIH +1
        let mut m = machine(&[0x2E, 0x01, 0x9D, 0x2F, 0x01]);
        m.set_irq_line(true);
        m.step();
        assert_eq!(m.cpu.pc, 0x0103);
        m.step();
        assert_eq!(m.cpu.pc, 0x0105);
    }

    #[test]
    fn test_illegal_opcode_is_two_cycle_nop() {
        let mut m = machine(&[0x31, 0x9D]);
        let a = m.cpu.a;
        assert_eq!(m.step(), 2);
        assert_eq!(m.cpu.pc, 0x0101);
        assert_eq!(m.cpu.a, a);
    }

    #[test]
    fn test_wait_idles_until_interrupt() {
        // CLI ; WAIT
        let mut m = machine(&[0x9A, 0x8F, 0x9D]);
        m.load_rom(0x0300, &[0x9D]).unwrap();
        m.load_rom(0x1FFA, &[0x03, 0x00]).unwrap();
        m.step();
        m.step();
        assert_eq!(m.cpu.state, RunState::Wait);
        let tick = m.cpu.tick;
        assert_eq!(m.step(), 2);
        assert_eq!(m.cpu.tick, tick + 2);
        assert_eq!(m.cpu.pc, 0x0102);
        m.set_irq_line(true);
        m.step();
        assert_eq!(m.cpu.state, RunState::Running);
        assert_eq!(m.cpu.pc, 0x0301);
    }

    #[test]
    fn test_execute_inst_cycles_table() {
        let mut m = machine(&[0x9D]);
        for op in [0x9Du8, 0x97, 0x9F, 0x98] {
            m.execute_inst(decode(op));
            assert_eq!(CYCLES[op as usize], 2);
        }
    }
}

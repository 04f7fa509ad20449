//! Named register access for debuggers and front-ends.
//!
//! Every piece of architectural and peripheral state is reachable through a
//! [`StateReg`] with a display name and a value mask. Reads and writes here
//! go straight to the stored values and never run register side effects.

use crate::cpu::{SP_FLOOR, SP_MASK};
use crate::peripherals::{NCOP_MASK, PCOP_MASK};
use crate::{Hc05, ADDRESS_MASK, CC_MASK};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateReg {
    Pc,
    Sp,
    A,
    X,
    Cc,
    /// Output latch of port 0–3
    Latch(usize),
    /// Last sampled pin levels of port 0–3
    Input(usize),
    /// Data direction of port 0–2; port D has none
    Ddr(usize),
    Tcr,
    Tsr,
    /// TSR flags seen by a program read, armed for clearing
    TsrSeen,
    /// Capture held off between ICRH and ICRL reads
    IcrInhibit,
    /// Compare held off between OCRH and OCRL writes
    OcrInhibit,
    /// Low-byte buffer of TRL (0) or ATRL (1)
    TrlBuf(usize),
    /// Low byte of TRL (0) or ATRL (1) latched by a high-byte read
    TrlLatched(usize),
    /// TCAP pin level
    Tcap,
    Icr,
    Ocr,
    /// Prescaler sub-tick count
    Ps,
    /// Free-running counter
    Tr,
    Coprst,
    Copcr,
    Pcop,
    Ncope,
    Ncop,
}

const LATCH_NAMES: [&str; 4] = ["LATCHA", "LATCHB", "LATCHC", "LATCHD"];
const INPUT_NAMES: [&str; 4] = ["INPUTA", "INPUTB", "INPUTC", "INPUTD"];
const DDR_NAMES: [&str; DDR_COUNT] = ["DDRA", "DDRB", "DDRC"];
const TRL_BUF_NAMES: [&str; 2] = ["TRLBUF", "ATRLBUF"];
const TRL_LATCHED_NAMES: [&str; 2] = ["TRLLAT", "ATRLLAT"];

/// Ports with a data direction register.
pub const DDR_COUNT: usize = 3;

impl StateReg {
    pub fn name(self) -> &'static str {
        match self {
            StateReg::Pc => "PC",
            StateReg::Sp => "SP",
            StateReg::A => "A",
            StateReg::X => "X",
            StateReg::Cc => "CC",
            StateReg::Latch(n) => LATCH_NAMES[n & 3],
            StateReg::Input(n) => INPUT_NAMES[n & 3],
            StateReg::Ddr(n) => DDR_NAMES.get(n).copied().unwrap_or("DDR?"),
            StateReg::Tcr => "TCR",
            StateReg::Tsr => "TSR",
            StateReg::TsrSeen => "TSRSEEN",
            StateReg::IcrInhibit => "ICRINH",
            StateReg::OcrInhibit => "OCRINH",
            StateReg::TrlBuf(n) => TRL_BUF_NAMES[n & 1],
            StateReg::TrlLatched(n) => TRL_LATCHED_NAMES[n & 1],
            StateReg::Tcap => "TCAP",
            StateReg::Icr => "ICR",
            StateReg::Ocr => "OCR",
            StateReg::Ps => "PS",
            StateReg::Tr => "TR",
            StateReg::Coprst => "COPRST",
            StateReg::Copcr => "COPCR",
            StateReg::Pcop => "PCOP",
            StateReg::Ncope => "NCOPE",
            StateReg::Ncop => "NCOP",
        }
    }

    pub fn mask(self) -> u32 {
        match self {
            StateReg::Pc => ADDRESS_MASK as u32,
            StateReg::Sp => 0xFF,
            StateReg::A | StateReg::X => 0xFF,
            StateReg::Cc => CC_MASK as u32,
            StateReg::Latch(_) | StateReg::Input(_) | StateReg::Ddr(_) => 0xFF,
            StateReg::Tcr => 0xE3,
            StateReg::Tsr | StateReg::TsrSeen => 0xE0,
            StateReg::TrlBuf(_) => 0xFF,
            StateReg::IcrInhibit | StateReg::OcrInhibit | StateReg::TrlLatched(_) | StateReg::Tcap => 0x01,
            StateReg::Icr | StateReg::Ocr | StateReg::Tr => 0xFFFF,
            StateReg::Ps => 0x0F,
            StateReg::Coprst => 0xFF,
            StateReg::Copcr => 0x1F,
            StateReg::Pcop => PCOP_MASK,
            StateReg::Ncope => 0x01,
            StateReg::Ncop => NCOP_MASK,
        }
    }

    /// Look a register up by (case-insensitive) name.
    pub fn from_name(name: &str) -> Option<StateReg> {
        let all = [
            StateReg::Pc, StateReg::Sp, StateReg::A, StateReg::X, StateReg::Cc,
            StateReg::Tcr, StateReg::Tsr, StateReg::Icr, StateReg::Ocr, StateReg::Ps, StateReg::Tr,
            StateReg::Coprst, StateReg::Copcr, StateReg::Pcop, StateReg::Ncope, StateReg::Ncop,
            StateReg::TsrSeen, StateReg::IcrInhibit, StateReg::OcrInhibit, StateReg::Tcap,
        ];
        all.into_iter()
            .chain((0..4).map(StateReg::Latch))
            .chain((0..4).map(StateReg::Input))
            .chain((0..DDR_COUNT).map(StateReg::Ddr))
            .chain((0..2).map(StateReg::TrlBuf))
            .chain((0..2).map(StateReg::TrlLatched))
            .find(|r| r.name().eq_ignore_ascii_case(name))
    }
}

impl Hc05 {
    /// Registers present on this variant, in display order.
    pub fn state_entries(&self) -> Vec<StateReg> {
        let mut regs = vec![StateReg::Pc, StateReg::Sp, StateReg::A, StateReg::X, StateReg::Cc];
        regs.extend((0..4).map(StateReg::Latch));
        regs.extend((0..4).map(StateReg::Input));
        regs.extend((0..DDR_COUNT).map(StateReg::Ddr));
        regs.extend([StateReg::Tcr, StateReg::Tsr, StateReg::Icr, StateReg::Ocr, StateReg::Ps, StateReg::Tr]);
        regs.extend([StateReg::TsrSeen, StateReg::IcrInhibit, StateReg::OcrInhibit]);
        regs.extend((0..2).map(StateReg::TrlBuf));
        regs.extend((0..2).map(StateReg::TrlLatched));
        regs.push(StateReg::Tcap);
        if self.config.has_pcop {
            regs.extend([StateReg::Coprst, StateReg::Copcr, StateReg::Pcop]);
        }
        if self.config.has_ncop {
            regs.extend([StateReg::Ncope, StateReg::Ncop]);
        }
        regs
    }

    pub fn state(&self, reg: StateReg) -> u32 {
        let v = match reg {
            StateReg::Pc => self.cpu.pc as u32,
            StateReg::Sp => self.cpu.sp as u32,
            StateReg::A => self.cpu.a as u32,
            StateReg::X => self.cpu.x as u32,
            StateReg::Cc => self.cpu.cc as u32,
            StateReg::Latch(n) => self.ports.latch(n) as u32,
            StateReg::Input(n) => self.ports.input(n) as u32,
            StateReg::Ddr(n) if n < DDR_COUNT => self.ports.read_ddr(n) as u32,
            StateReg::Ddr(_) => 0,
            StateReg::Tcr => self.timer.read_tcr() as u32,
            StateReg::Tsr => self.timer.tsr() as u32,
            StateReg::TsrSeen => self.timer.tsr_seen() as u32,
            StateReg::IcrInhibit => self.timer.inhibit_cap() as u32,
            StateReg::OcrInhibit => self.timer.inhibit_cmp() as u32,
            StateReg::TrlBuf(n) => self.timer.trl_buf()[n & 1] as u32,
            StateReg::TrlLatched(n) => self.timer.trl_latched()[n & 1] as u32,
            StateReg::Tcap => self.timer.tcap_state() as u32,
            StateReg::Icr => self.timer.icr() as u32,
            StateReg::Ocr => self.timer.ocr() as u32,
            StateReg::Ps => self.timer.prescaler() as u32,
            StateReg::Tr => self.timer.counter() as u32,
            StateReg::Coprst => self.cop.coprst() as u32,
            StateReg::Copcr => self.cop.copcr() as u32,
            StateReg::Pcop => self.cop.pcop_cnt(),
            StateReg::Ncope => self.cop.ncope() as u32,
            StateReg::Ncop => self.cop.ncop_cnt(),
        };
        v & reg.mask()
    }

    /// Store a register value. The value is masked; SP stays inside the
    /// stack window. Registers the device does not have are ignored.
    pub fn set_state(&mut self, reg: StateReg, value: u32) {
        let v = value & reg.mask();
        let t = &mut self.timer;
        match reg {
            StateReg::Pc => self.cpu.pc = v as u16,
            StateReg::Sp => self.cpu.sp = (v as u16 & SP_MASK) | SP_FLOOR,
            StateReg::A => self.cpu.a = v as u8,
            StateReg::X => self.cpu.x = v as u8,
            StateReg::Cc => self.cpu.cc = v as u8,
            StateReg::Latch(n) => self.ports.set_latch_raw(n, v as u8),
            StateReg::Input(n) => self.ports.set_input_raw(n, v as u8),
            StateReg::Ddr(n) if n < DDR_COUNT => self.ports.set_ddr_raw(n, v as u8),
            StateReg::Ddr(n) => log::warn!("no DDR on port {}", n),
            StateReg::Tcr => t.set_tcr_raw(v as u8),
            StateReg::Tsr => t.set_tsr_raw(v as u8),
            StateReg::TsrSeen => t.set_tsr_seen_raw(v as u8),
            StateReg::IcrInhibit => t.set_inhibit_raw(v != 0, t.inhibit_cmp()),
            StateReg::OcrInhibit => t.set_inhibit_raw(t.inhibit_cap(), v != 0),
            StateReg::TrlBuf(n) => {
                let mut buf = t.trl_buf();
                buf[n & 1] = v as u8;
                t.set_trl_raw(buf, t.trl_latched());
            }
            StateReg::TrlLatched(n) => {
                let mut latched = t.trl_latched();
                latched[n & 1] = v != 0;
                t.set_trl_raw(t.trl_buf(), latched);
            }
            StateReg::Tcap => t.set_tcap_state_raw(v != 0),
            StateReg::Icr => t.set_icr_raw(v as u16),
            StateReg::Ocr => t.set_ocr_raw(v as u16),
            StateReg::Ps => t.set_prescaler_raw(v as u8),
            StateReg::Tr => t.set_counter_raw(v as u16),
            StateReg::Coprst => self.cop.set_coprst_raw(v as u8),
            StateReg::Copcr => self.cop.set_copcr_raw(v as u8),
            StateReg::Pcop => self.cop.set_pcop_raw(v),
            StateReg::Ncope => self.cop.set_ncope(v != 0),
            StateReg::Ncop => self.cop.set_ncop_raw(v),
        }
        if matches!(reg, StateReg::Tcr | StateReg::Tsr) {
            self.update_timer_irq();
        }
    }

    /// One `NAME=value` line per register.
    pub fn format_state(&self) -> String {
        let mut s = String::new();
        for reg in self.state_entries() {
            let digits = match reg.mask() {
                m if m > 0xFFFF => 6,
                m if m > 0xFF => 4,
                _ => 2,
            };
            s.push_str(&format!("{:>7}={:0width$X}\n", reg.name(), self.state(reg), width = digits));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripherals::{TCR_OCIE, TSR_OCF};
    use crate::variant::Variant;
    use crate::TCAP_LINE;

    #[test]
    fn test_entries_follow_capabilities() {
        let c4 = Hc05::new(Variant::Mc68hc05c4, 4_000_000);
        let regs = c4.state_entries();
        assert!(regs.contains(&StateReg::Tr));
        assert!(!regs.contains(&StateReg::Pcop));
        assert!(!regs.contains(&StateReg::Ncop));

        let c8a = Hc05::new(Variant::Mc68hc705c8a, 4_000_000);
        let regs = c8a.state_entries();
        assert!(regs.contains(&StateReg::Copcr));
        assert!(regs.contains(&StateReg::Ncope));
    }

    #[test]
    fn test_sp_stays_in_window() {
        let mut m = Hc05::new(Variant::Mc68hc05c4, 4_000_000);
        m.set_state(StateReg::Sp, 0x10);
        assert_eq!(m.state(StateReg::Sp), 0xD0);
        m.set_state(StateReg::Sp, 0x1234);
        assert_eq!(m.state(StateReg::Sp), 0xF4);
    }

    #[test]
    fn test_values_are_masked() {
        let mut m = Hc05::new(Variant::Mc68hc705c8a, 4_000_000);
        m.set_state(StateReg::Pc, 0xFFFF);
        assert_eq!(m.state(StateReg::Pc), 0x1FFF);
        m.set_state(StateReg::Pcop, 0xFFFF_FFFF);
        assert_eq!(m.state(StateReg::Pcop), 0x1F_FFFF);
        m.set_state(StateReg::Tcr, 0xFF);
        assert_eq!(m.state(StateReg::Tcr), 0xE3);
    }

    #[test]
    fn test_set_tsr_has_no_protocol_side_effects() {
        let mut m = Hc05::new(Variant::Mc68hc05c4, 4_000_000);
        m.start();
        m.set_state(StateReg::Tcr, TCR_OCIE as u32);
        m.set_state(StateReg::Tsr, TSR_OCF as u32);
        assert_eq!(m.timer.tsr_seen(), 0);
        assert_eq!(m.pending() & (1 << TCAP_LINE), 1 << TCAP_LINE);
        assert_eq!(m.state(StateReg::Tsr), TSR_OCF as u32);
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(StateReg::from_name("pc"), Some(StateReg::Pc));
        assert_eq!(StateReg::from_name("DDRB"), Some(StateReg::Ddr(1)));
        assert_eq!(StateReg::from_name("nope"), None);
        let m = Hc05::new(Variant::Mc68hc05c8, 4_000_000);
        assert!(m.format_state().contains("     TR=FFFC"));
    }

    #[test]
    fn test_port_d_has_no_ddr() {
        assert_eq!(StateReg::from_name("DDRD"), None);
        let mut m = Hc05::new(Variant::Mc68hc05c4, 4_000_000);
        m.set_state(StateReg::Ddr(3), 0xFF);
        assert_eq!(m.ports.read_ddr(3), 0);
        assert_eq!(m.state(StateReg::Ddr(3)), 0);
        assert!(!m.state_entries().contains(&StateReg::Ddr(3)));
    }

    #[test]
    fn test_hidden_timer_and_port_state() {
        let mut m = Hc05::new(Variant::Mc68hc05c8, 4_000_000);
        m.start();
        let regs = m.state_entries();
        for name in ["INPUTB", "TSRSEEN", "ICRINH", "OCRINH", "TRLBUF", "ATRLLAT", "TCAP"] {
            let reg = StateReg::from_name(name).unwrap();
            assert!(regs.contains(&reg), "{} missing", name);
        }

        m.set_state(StateReg::Input(1), 0x5A);
        m.set_state(StateReg::TsrSeen, 0xFF);
        m.set_state(StateReg::IcrInhibit, 1);
        m.set_state(StateReg::OcrInhibit, 1);
        m.set_state(StateReg::TrlBuf(1), 0x34);
        m.set_state(StateReg::TrlLatched(1), 1);
        m.set_state(StateReg::Tcap, 1);

        assert_eq!(m.state(StateReg::Input(1)), 0x5A);
        assert_eq!(m.ports.input(1), 0x5A);
        assert_eq!(m.state(StateReg::TsrSeen), 0xE0);
        assert_eq!(m.state(StateReg::IcrInhibit), 1);
        assert_eq!(m.state(StateReg::OcrInhibit), 1);
        assert_eq!(m.timer.trl_buf(), [0xFC, 0x34]);
        assert_eq!(m.timer.trl_latched(), [false, true]);
        assert_eq!(m.state(StateReg::Tcap), 1);

        // Neighbouring halves are untouched.
        m.set_state(StateReg::IcrInhibit, 0);
        assert!(m.timer.inhibit_cmp());
        m.set_state(StateReg::TrlLatched(0), 1);
        assert_eq!(m.timer.trl_latched(), [true, true]);
        assert_eq!(m.state(StateReg::Tsr), 0);
        assert!(m.format_state().contains("ATRLBUF=34"));
    }
}

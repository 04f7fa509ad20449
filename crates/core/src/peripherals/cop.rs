//! Computer Operating Properly watchdogs.
//!
//! The programmable COP (PCOP) is enabled through COPCR and cleared by
//! writing 0x55 then 0xAA to COPRST. The non-programmable COP (NCOP) is
//! enabled by a mask-option bit latched at reset and cleared through COPR.
//! Either one timing out asks the device for a reset pulse.

use crate::bus::Access;

pub const COPCR_COPF: u8 = 0x10;
pub const COPCR_CME: u8 = 0x08;
pub const COPCR_PCOPE: u8 = 0x04;
pub const COPCR_CM: u8 = 0x03;
pub const COPCR_MASK: u8 = 0x1F;

pub const PCOP_BITS: u32 = 21;
pub const NCOP_BITS: u32 = 17;
pub const PCOP_MASK: u32 = (1 << PCOP_BITS) - 1;
pub const NCOP_MASK: u32 = (1 << NCOP_BITS) - 1;

const ARM_FIRST: u8 = 0x55;
const ARM_SECOND: u8 = 0xAA;
/// Bits cleared by a completed arm sequence.
const PCOP_CLEAR: u32 = 0x7FFF;

pub struct Cop {
    has_pcop: bool,
    has_ncop: bool,
    pcop_cnt: u32,
    ncop_cnt: u32,
    coprst: u8,
    copcr: u8,
    ncope: bool,
}

impl Cop {
    pub fn new(has_pcop: bool, has_ncop: bool) -> Self {
        Cop {
            has_pcop,
            has_ncop,
            pcop_cnt: 0,
            ncop_cnt: 0,
            coprst: 0x00,
            copcr: 0x00,
            ncope: false,
        }
    }

    pub fn has_pcop(&self) -> bool { self.has_pcop }
    pub fn has_ncop(&self) -> bool { self.has_ncop }

    /// State not affected by reset.
    pub fn power_on(&mut self) {
        self.pcop_cnt = 0;
        self.coprst = 0x00;
        self.copcr = 0x00;
        self.ncope = false;
    }

    /// COPF survives reset so software can tell why it restarted.
    pub fn reset(&mut self) {
        self.ncop_cnt = 0;
        self.copcr &= COPCR_COPF;
    }

    /// Timeout period of the programmable COP in cycles.
    pub fn pcop_timeout(&self) -> u32 {
        1 << (((self.copcr & COPCR_CM) as u32) * 2 + 15)
    }

    pub fn write_coprst(&mut self, data: u8) {
        let arm = data == ARM_SECOND && self.coprst == ARM_FIRST;
        log::trace!(target: "hc05::cop", "write COPRST={:02X}{}",
            data, if arm { ", clear" } else { "" });
        if arm {
            self.pcop_cnt &= !PCOP_CLEAR & PCOP_MASK;
        }
        self.coprst = data;
    }

    pub fn read_copcr(&mut self, access: Access) -> u8 {
        let result = self.copcr;
        if !access.is_debugger() {
            if self.copcr & COPCR_COPF != 0 {
                log::trace!(target: "hc05::cop", "read COPCR, clear COPF");
            }
            self.copcr &= !COPCR_COPF;
        }
        result
    }

    pub fn write_copcr(&mut self, data: u8) {
        log::trace!(target: "hc05::cop",
            "write COPCR: CME={} PCOPE={} ({}) CM={}",
            (data >> 3) & 1, (data >> 2) & 1,
            if self.copcr & COPCR_PCOPE == 0 && data & COPCR_PCOPE != 0 { "set" } else { "ignored" },
            data & COPCR_CM);
        // PCOPE can be set but not cleared by software
        self.copcr = (self.copcr & 0xF4) | (data & 0x0F);
    }

    pub fn write_copr(&mut self, data: u8) {
        log::trace!(target: "hc05::cop", "write COPR: COPC={}", data & 1);
        if data & 0x01 == 0 {
            self.ncop_cnt = 0;
        }
    }

    pub fn set_ncope(&mut self, enable: bool) {
        log::debug!(target: "hc05::cop", "NCOP {}", if enable { "enabled" } else { "disabled" });
        self.ncope = enable;
    }

    /// Charge `count` cycles to both watchdogs. Returns true if either one
    /// timed out and the device must be reset.
    pub fn advance(&mut self, count: u32) -> bool {
        let mut fired = false;

        if self.has_pcop {
            let timeout = self.pcop_timeout();
            if self.copcr & COPCR_PCOPE != 0
                && timeout <= (self.pcop_cnt & (timeout - 1)) + count
            {
                log::debug!(target: "hc05::cop", "PCOP reset");
                self.copcr |= COPCR_COPF;
                fired = true;
            }
            self.pcop_cnt = (self.pcop_cnt + count) & PCOP_MASK;
        }

        if self.has_ncop && self.ncope {
            self.ncop_cnt += count;
            if self.ncop_cnt > NCOP_MASK {
                log::debug!(target: "hc05::cop", "NCOP reset");
                fired = true;
            }
            self.ncop_cnt &= NCOP_MASK;
        }

        fired
    }

    // Raw accessors for state inspection and save states.

    pub fn pcop_cnt(&self) -> u32 { self.pcop_cnt }
    pub fn ncop_cnt(&self) -> u32 { self.ncop_cnt }
    pub fn coprst(&self) -> u8 { self.coprst }
    pub fn copcr(&self) -> u8 { self.copcr }
    pub fn ncope(&self) -> bool { self.ncope }

    pub fn set_pcop_raw(&mut self, v: u32) { self.pcop_cnt = v & PCOP_MASK; }
    pub fn set_ncop_raw(&mut self, v: u32) { self.ncop_cnt = v & NCOP_MASK; }
    pub fn set_coprst_raw(&mut self, v: u8) { self.coprst = v; }
    pub fn set_copcr_raw(&mut self, v: u8) { self.copcr = v & COPCR_MASK; }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcop() -> Cop {
        let mut cop = Cop::new(true, true);
        cop.power_on();
        cop.reset();
        cop
    }

    #[test]
    fn test_pcop_fires_at_timeout() {
        let mut cop = pcop();
        cop.write_copcr(COPCR_PCOPE);
        assert_eq!(cop.pcop_timeout(), 1 << 15);
        assert!(!cop.advance((1 << 15) - 1));
        assert_eq!(cop.copcr() & COPCR_COPF, 0);
        assert!(cop.advance(1));
        assert_eq!(cop.copcr() & COPCR_COPF, COPCR_COPF);
    }

    #[test]
    fn test_pcop_disabled_never_fires() {
        let mut cop = pcop();
        for _ in 0..64 {
            assert!(!cop.advance(1 << 15));
        }
    }

    #[test]
    fn test_timeout_select() {
        let mut cop = pcop();
        cop.write_copcr(COPCR_PCOPE | 0x02);
        assert_eq!(cop.pcop_timeout(), 1 << 19);
        assert!(!cop.advance(1 << 18));
        assert!(cop.advance(1 << 18));
    }

    #[test]
    fn test_arm_sequence_clears_counter() {
        let mut cop = pcop();
        cop.write_copcr(COPCR_PCOPE);
        cop.advance(0x7000);
        cop.write_coprst(0x55);
        cop.write_coprst(0xAA);
        assert_eq!(cop.pcop_cnt(), 0);
        assert!(!cop.advance(0x7FFF));
    }

    #[test]
    fn test_arm_sequence_must_be_consecutive() {
        let mut cop = pcop();
        cop.advance(0x1234);
        cop.write_coprst(0x55);
        cop.write_coprst(0x00);
        cop.write_coprst(0xAA);
        assert_eq!(cop.pcop_cnt(), 0x1234);
        cop.write_coprst(0xAA);
        assert_eq!(cop.pcop_cnt(), 0x1234);
        // only the low 15 bits are cleared
        cop.set_pcop_raw(0x1F_FFFF);
        cop.write_coprst(0x55);
        cop.write_coprst(0xAA);
        assert_eq!(cop.pcop_cnt(), 0x1F_8000);
    }

    #[test]
    fn test_copf_read_to_clear() {
        let mut cop = pcop();
        cop.write_copcr(COPCR_PCOPE);
        assert!(cop.advance(1 << 15));
        assert_eq!(cop.read_copcr(Access::Debugger) & COPCR_COPF, COPCR_COPF);
        assert_eq!(cop.read_copcr(Access::Program) & COPCR_COPF, COPCR_COPF);
        assert_eq!(cop.read_copcr(Access::Program) & COPCR_COPF, 0);
    }

    #[test]
    fn test_pcope_is_set_only() {
        let mut cop = pcop();
        cop.write_copcr(COPCR_PCOPE | COPCR_CME | 0x03);
        assert_eq!(cop.copcr(), 0x0F);
        cop.write_copcr(0x00);
        assert_eq!(cop.copcr(), COPCR_PCOPE);
        // reset keeps only COPF
        cop.reset();
        assert_eq!(cop.copcr(), 0x00);
    }

    #[test]
    fn test_ncop_requires_enable_latch() {
        let mut cop = pcop();
        assert!(!cop.advance(1 << 17));
        assert_eq!(cop.ncop_cnt(), 0);
        cop.set_ncope(true);
        assert!(!cop.advance((1 << 17) - 1));
        cop.write_copr(0x00);
        assert_eq!(cop.ncop_cnt(), 0);
        assert!(!cop.advance((1 << 17) - 1));
        cop.write_copr(0x01);
        assert!(cop.advance(1));
        assert_eq!(cop.ncop_cnt(), 0);
        assert_eq!(cop.copcr() & COPCR_COPF, 0);
    }

    #[test]
    fn test_absent_watchdogs_do_nothing() {
        let mut cop = Cop::new(false, false);
        cop.power_on();
        cop.write_copcr(COPCR_PCOPE);
        cop.set_ncope(true);
        assert!(!cop.advance(1 << 20));
        assert_eq!(cop.pcop_cnt(), 0);
    }
}

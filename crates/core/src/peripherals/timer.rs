//! 16-bit free-running timer with input capture and output compare.
//!
//! The counter is fed from the internal cycle clock through a fixed
//! divide-by-16 prescaler. Three status flags live in TSR:
//!
//! | Bit | Flag | Set by                          | Cleared by                       |
//! |-----|------|---------------------------------|----------------------------------|
//! | 7   | ICF  | qualifying edge on TCAP         | TSR read, then ICRL read         |
//! | 6   | OCF  | counter reaching OCR            | TSR read, then OCRL read/write   |
//! | 5   | TOF  | counter rolling over to 0x0000  | TSR read, then TRL read          |
//!
//! A flag is only cleared if it was already set when TSR was read ("seen").
//! Reading ICRH inhibits capture until ICRL is read, and writing OCRH
//! inhibits compare until OCRL is written. Reading TRH/ATRH latches the low
//! byte so a high/low pair cannot be torn.
//!
//! Debugger accesses return the same data but leave all of this protocol
//! state untouched.

use crate::bus::Access;

pub const TCR_ICIE: u8 = 0x80;
pub const TCR_OCIE: u8 = 0x40;
pub const TCR_TOIE: u8 = 0x20;
pub const TCR_IEDG: u8 = 0x02;
pub const TCR_OLVL: u8 = 0x01;
const TCR_MASK: u8 = 0xE3;

pub const TSR_ICF: u8 = 0x80;
pub const TSR_OCF: u8 = 0x40;
pub const TSR_TOF: u8 = 0x20;
const TSR_EVENTS: u8 = 0xE0;

/// log2 of the prescaler ratio.
const PS_SHIFT: u32 = 4;
const PS_MASK: u32 = (1 << PS_SHIFT) - 1;

/// Counter value after reset.
pub const COUNTER_RESET: u16 = 0xFFFC;

/// Compare output sink, receives the OLVL level on each unmasked match.
pub type TcmpWriteFn = Box<dyn FnMut(bool)>;

pub struct Timer {
    tcap_state: bool,
    tcr: u8,
    tsr: u8,
    tsr_seen: u8,
    prescaler: u8,
    counter: u16,
    icr: u16,
    ocr: u16,
    inhibit_cap: bool,
    inhibit_cmp: bool,
    /// Latched low bytes for TRL (0) and ATRL (1)
    trl_buf: [u8; 2],
    trl_latched: [bool; 2],
    tcmp_cb: Option<TcmpWriteFn>,
}

impl Timer {
    pub fn new() -> Self {
        Timer {
            tcap_state: false,
            tcr: 0x00,
            tsr: 0x00,
            tsr_seen: 0x00,
            prescaler: 0,
            counter: COUNTER_RESET,
            icr: 0x0000,
            ocr: 0x0000,
            inhibit_cap: false,
            inhibit_cmp: false,
            trl_buf: [COUNTER_RESET as u8; 2],
            trl_latched: [false; 2],
            tcmp_cb: None,
        }
    }

    pub fn set_tcmp_callback(&mut self, cb: TcmpWriteFn) {
        self.tcmp_cb = Some(cb);
    }

    /// State not affected by reset.
    pub fn power_on(&mut self) {
        self.tcap_state = false;
        self.tcr = 0x00;
        self.tsr = 0x00;
        self.icr = 0x0000;
        self.ocr = 0x0000;
    }

    pub fn reset(&mut self) {
        self.tcr &= TCR_IEDG;
        self.tsr_seen = 0x00;
        self.prescaler = 0;
        self.counter = COUNTER_RESET;
        self.inhibit_cap = false;
        self.inhibit_cmp = false;
        self.trl_buf = [self.counter as u8; 2];
        self.trl_latched = [false; 2];
    }

    /// Level of the timer interrupt request.
    #[inline]
    pub fn irq(&self) -> bool {
        self.tcr & self.tsr & TSR_EVENTS != 0
    }

    fn tcr_iedg(&self) -> bool { self.tcr & TCR_IEDG != 0 }
    fn tcr_olvl(&self) -> bool { self.tcr & TCR_OLVL != 0 }

    pub fn read_tcr(&self) -> u8 {
        self.tcr
    }

    pub fn write_tcr(&mut self, data: u8) {
        let data = data & TCR_MASK;
        log::trace!(target: "hc05::timer",
            "write TCR: ICIE={} OCIE={} TOIE={} IEDG={} OLVL={}",
            (data >> 7) & 1, (data >> 6) & 1, (data >> 5) & 1, (data >> 1) & 1, data & 1);
        self.tcr = data;
    }

    pub fn read_tsr(&mut self, access: Access) -> u8 {
        if !access.is_debugger() {
            let events = self.tsr & !self.tsr_seen;
            if events != 0 {
                log::trace!(target: "hc05::timer", "read TSR: seen{}{}{}",
                    if events & TSR_ICF != 0 { " ICF" } else { "" },
                    if events & TSR_OCF != 0 { " OCF" } else { "" },
                    if events & TSR_TOF != 0 { " TOF" } else { "" });
            }
            self.tsr_seen = self.tsr;
        }
        self.tsr
    }

    /// Clear `flag` if a TSR read has already reported it.
    fn clear_seen(&mut self, flag: u8, what: &str) {
        if self.tsr_seen & flag != 0 {
            log::trace!(target: "hc05::timer", "{}, clear flag {:02X}", what, flag);
            self.tsr &= !flag;
            self.tsr_seen &= !flag;
        }
    }

    /// ICRH (`low == false`) / ICRL (`low == true`) read.
    pub fn read_icr(&mut self, low: bool, access: Access) -> u8 {
        if !access.is_debugger() {
            if low {
                self.clear_seen(TSR_ICF, "read ICRL");
                if self.inhibit_cap {
                    log::trace!(target: "hc05::timer", "read ICRL, enable capture");
                }
                self.inhibit_cap = false;
            } else {
                if !self.inhibit_cap {
                    log::trace!(target: "hc05::timer", "read ICRH, inhibit capture");
                }
                self.inhibit_cap = true;
            }
        }
        if low { self.icr as u8 } else { (self.icr >> 8) as u8 }
    }

    pub fn read_ocr(&mut self, low: bool, access: Access) -> u8 {
        if !access.is_debugger() && low {
            self.clear_seen(TSR_OCF, "read OCRL");
        }
        if low { self.ocr as u8 } else { (self.ocr >> 8) as u8 }
    }

    pub fn write_ocr(&mut self, low: bool, data: u8, access: Access) {
        if !access.is_debugger() {
            if low {
                self.clear_seen(TSR_OCF, "write OCRL");
                if self.inhibit_cmp {
                    log::trace!(target: "hc05::timer", "write OCRL, enable compare");
                }
                self.inhibit_cmp = false;
            } else {
                if !self.inhibit_cmp {
                    log::trace!(target: "hc05::timer", "write OCRH, inhibit compare");
                }
                self.inhibit_cmp = true;
            }
        }
        self.ocr = if low {
            (self.ocr & 0xFF00) | data as u16
        } else {
            (self.ocr & 0x00FF) | (data as u16) << 8
        };
    }

    /// TRH/TRL/ATRH/ATRL read. `offset` is 0–3 from TRH.
    pub fn read_counter(&mut self, offset: u16, access: Access) -> u8 {
        let low = offset & 1 != 0;
        let alt = ((offset >> 1) & 1) as usize;
        if low {
            if !access.is_debugger() {
                if self.trl_latched[alt] {
                    log::trace!(target: "hc05::timer", "read {}TRL, read sequence complete",
                        if alt == 1 { "A" } else { "" });
                }
                self.trl_latched[alt] = false;
                // ATRL never clears TOF
                if alt == 0 {
                    self.clear_seen(TSR_TOF, "read TRL");
                }
            }
            self.trl_buf[alt]
        } else {
            if !access.is_debugger() && !self.trl_latched[alt] {
                self.trl_latched[alt] = true;
                self.trl_buf[alt] = self.counter as u8;
            }
            (self.counter >> 8) as u8
        }
    }

    /// TCAP line change. Captures on the edge selected by IEDG.
    pub fn set_tcap(&mut self, state: bool) {
        if state != self.tcap_state && state == self.tcr_iedg() {
            log::trace!(target: "hc05::timer", "input capture {:04X}{}",
                self.counter, if self.inhibit_cap { " [inhibited]" } else { "" });
            if !self.inhibit_cap {
                self.tsr |= TSR_ICF;
                self.icr = self.counter;
            }
        }
        self.tcap_state = state;
    }

    /// Advance the counter by `count` machine cycles.
    pub fn advance(&mut self, count: u32) {
        let increments = (count + (self.prescaler as u32 & PS_MASK)) >> PS_SHIFT;
        let old = self.counter as u32;
        let new_counter = old + increments;
        let rollover = old < 0x1_0000 && new_counter >= 0x1_0000;
        let compare_match = (self.ocr as u32) > old && (self.ocr as u32) <= new_counter;
        self.prescaler = ((count + self.prescaler as u32) & PS_MASK) as u8;
        self.counter = new_counter as u16;

        if rollover {
            log::trace!(target: "hc05::timer", "timer rollover");
            self.tsr |= TSR_TOF;
        }
        if compare_match {
            log::trace!(target: "hc05::timer", "output compare match{}",
                if self.inhibit_cmp { " [inhibited]" } else { "" });
            if !self.inhibit_cmp {
                self.tsr |= TSR_OCF;
                let level = self.tcr_olvl();
                if let Some(cb) = self.tcmp_cb.as_mut() {
                    cb(level);
                }
            }
        }
    }

    // Raw accessors for state inspection and save states.

    pub fn tsr(&self) -> u8 { self.tsr }
    pub fn tsr_seen(&self) -> u8 { self.tsr_seen }
    pub fn counter(&self) -> u16 { self.counter }
    pub fn icr(&self) -> u16 { self.icr }
    pub fn ocr(&self) -> u16 { self.ocr }
    pub fn prescaler(&self) -> u8 { self.prescaler }
    pub fn inhibit_cap(&self) -> bool { self.inhibit_cap }
    pub fn inhibit_cmp(&self) -> bool { self.inhibit_cmp }
    pub fn tcap_state(&self) -> bool { self.tcap_state }
    pub fn trl_buf(&self) -> [u8; 2] { self.trl_buf }
    pub fn trl_latched(&self) -> [bool; 2] { self.trl_latched }

    pub fn set_tcr_raw(&mut self, v: u8) { self.tcr = v & TCR_MASK; }
    pub fn set_tsr_raw(&mut self, v: u8) { self.tsr = v & TSR_EVENTS; }
    pub fn set_tsr_seen_raw(&mut self, v: u8) { self.tsr_seen = v & TSR_EVENTS; }
    pub fn set_counter_raw(&mut self, v: u16) { self.counter = v; }
    pub fn set_icr_raw(&mut self, v: u16) { self.icr = v; }
    pub fn set_ocr_raw(&mut self, v: u16) { self.ocr = v; }
    pub fn set_prescaler_raw(&mut self, v: u8) { self.prescaler = v & PS_MASK as u8; }
    pub fn set_inhibit_raw(&mut self, cap: bool, cmp: bool) {
        self.inhibit_cap = cap;
        self.inhibit_cmp = cmp;
    }
    pub fn set_tcap_state_raw(&mut self, v: bool) { self.tcap_state = v; }
    pub fn set_trl_raw(&mut self, buf: [u8; 2], latched: [bool; 2]) {
        self.trl_buf = buf;
        self.trl_latched = latched;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

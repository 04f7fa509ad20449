//! Parallel I/O ports A–D.
//!
//! Each port has an output latch, a data direction register (1 = output)
//! and an input latch holding the last value sampled from the board. Only
//! bits present in the port's physical mask are ever stored. The value the
//! program reads is `(input & !ddr) | (latch & ddr)`; the board sees the
//! same composition through the write callback whenever an output-driven
//! bit changes.

use crate::bus::Access;

pub const PORT_COUNT: usize = 4;

/// Board-side input sampler. Receives the mask of bits currently configured
/// as inputs and returns the pin levels.
pub type PortReadFn = Box<dyn FnMut(u8) -> u8>;
/// Board-side output sink. Receives the visible port value and the DDR.
pub type PortWriteFn = Box<dyn FnMut(u8, u8)>;

pub struct Ports {
    bits: [u8; PORT_COUNT],
    input: [u8; PORT_COUNT],
    latch: [u8; PORT_COUNT],
    ddr: [u8; PORT_COUNT],
    read_cb: [Option<PortReadFn>; PORT_COUNT],
    write_cb: [Option<PortWriteFn>; PORT_COUNT],
}

#[inline(always)]
fn port_name(port: usize) -> char {
    (b'A' + port as u8) as char
}

impl Ports {
    pub fn new(bits: [u8; PORT_COUNT]) -> Self {
        Ports {
            bits,
            input: [0xFF; PORT_COUNT],
            latch: [0xFF; PORT_COUNT],
            ddr: [0x00; PORT_COUNT],
            read_cb: [None, None, None, None],
            write_cb: [None, None, None, None],
        }
    }

    /// State not affected by reset.
    pub fn power_on(&mut self) {
        self.input = [0xFF; PORT_COUNT];
        self.latch = [0xFF; PORT_COUNT];
    }

    /// Reset makes every pin an input again.
    pub fn reset(&mut self) {
        self.ddr = [0x00; PORT_COUNT];
    }

    pub(crate) fn set_bits(&mut self, bits: [u8; PORT_COUNT]) {
        self.bits = bits;
    }

    pub fn bits(&self, port: usize) -> u8 {
        self.bits[port & (PORT_COUNT - 1)]
    }

    pub fn set_read_callback(&mut self, port: usize, cb: PortReadFn) {
        self.read_cb[port & (PORT_COUNT - 1)] = Some(cb);
    }

    pub fn set_write_callback(&mut self, port: usize, cb: PortWriteFn) {
        self.write_cb[port & (PORT_COUNT - 1)] = Some(cb);
    }

    /// Externally visible value of a port.
    #[inline]
    pub fn value(&self, port: usize) -> u8 {
        let p = port & (PORT_COUNT - 1);
        (self.latch[p] & self.ddr[p]) | (self.input[p] & !self.ddr[p])
    }

    /// Data register read. A program read samples the board first; a
    /// debugger read returns the cached composition.
    pub fn read(&mut self, port: usize, access: Access) -> u8 {
        let p = port & (PORT_COUNT - 1);
        if !access.is_debugger() {
            if let Some(cb) = self.read_cb[p].as_mut() {
                let mask = !self.ddr[p] & self.bits[p];
                let newval = cb(mask) & self.bits[p];
                if newval != self.input[p] {
                    log::trace!(target: "hc05::ioport",
                        "read PORT{}: new input = {:02X} & {:02X} (was {:02X})",
                        port_name(p), newval, mask, self.input[p]);
                }
                self.input[p] = newval;
            }
        }
        self.value(p)
    }

    pub fn write_latch(&mut self, port: usize, data: u8) {
        let p = port & (PORT_COUNT - 1);
        let data = data & self.bits[p];
        let diff = self.latch[p] ^ data;
        if diff != 0 {
            log::trace!(target: "hc05::ioport",
                "write PORT{} latch: {:02X} & {:02X} (was {:02X})",
                port_name(p), data, self.ddr[p], self.latch[p]);
        }
        self.latch[p] = data;
        if diff & self.ddr[p] != 0 {
            self.notify(p);
        }
    }

    pub fn read_ddr(&self, port: usize) -> u8 {
        self.ddr[port & (PORT_COUNT - 1)]
    }

    pub fn write_ddr(&mut self, port: usize, data: u8) {
        let p = port & (PORT_COUNT - 1);
        let data = data & self.bits[p];
        if data != self.ddr[p] {
            log::trace!(target: "hc05::ioport",
                "write DDR{}: {:02X} (was {:02X})", port_name(p), data, self.ddr[p]);
            self.ddr[p] = data;
            self.notify(p);
        }
    }

    fn notify(&mut self, p: usize) {
        let value = self.value(p);
        let ddr = self.ddr[p];
        if let Some(cb) = self.write_cb[p].as_mut() {
            cb(value, ddr);
        }
    }

    // Raw accessors for state inspection and save states.

    pub fn input(&self, port: usize) -> u8 { self.input[port & (PORT_COUNT - 1)] }
    pub fn latch(&self, port: usize) -> u8 { self.latch[port & (PORT_COUNT - 1)] }

    // Input and latch are stored as given, like the power-on 0xFF fill;
    // only DDR is kept inside the bonded-out bits.

    pub fn set_input_raw(&mut self, port: usize, v: u8) {
        self.input[port & (PORT_COUNT - 1)] = v;
    }

    pub fn set_latch_raw(&mut self, port: usize, v: u8) {
        self.latch[port & (PORT_COUNT - 1)] = v;
    }

    pub fn set_ddr_raw(&mut self, port: usize, v: u8) {
        let p = port & (PORT_COUNT - 1);
        self.ddr[p] = v & self.bits[p];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording_port(bits: u8) -> (Ports, Rc<RefCell<Vec<(u8, u8)>>>) {
        let mut ports = Ports::new([bits; PORT_COUNT]);
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        ports.set_write_callback(0, Box::new(move |v, ddr| sink.borrow_mut().push((v, ddr))));
        (ports, log)
    }

    #[test]
    fn test_latch_write_on_input_pins_is_silent() {
        let (mut ports, log) = recording_port(0xFF);
        ports.write_latch(0, 0x12);
        assert!(log.borrow().is_empty());
        assert_eq!(ports.latch(0), 0x12);
        assert_eq!(ports.value(0), 0xFF); // all inputs, pulled high
    }

    #[test]
    fn test_ddr_exposes_latch() {
        let (mut ports, log) = recording_port(0xFF);
        ports.write_latch(0, 0x00);
        ports.write_ddr(0, 0x0F);
        assert_eq!(*log.borrow(), vec![(0xF0, 0x0F)]);
        // same DDR again does not fire
        ports.write_ddr(0, 0x0F);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_physical_bits_mask_writes() {
        let (mut ports, log) = recording_port(0xBF);
        ports.write_ddr(0, 0xFF);
        assert_eq!(ports.read_ddr(0), 0xBF);
        // bit 6 is not bonded out, so only it "changes" and nothing is driven
        ports.write_latch(0, 0xFF);
        assert_eq!(ports.latch(0), 0xBF);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_read_samples_only_input_bits() {
        let mut ports = Ports::new([0xFF; PORT_COUNT]);
        let seen_mask = Rc::new(RefCell::new(0u8));
        let m = seen_mask.clone();
        ports.set_read_callback(1, Box::new(move |mask| { *m.borrow_mut() = mask; 0x5A }));
        ports.write_latch(1, 0xF0);
        ports.write_ddr(1, 0xF0);
        assert_eq!(ports.read(1, Access::Program), 0xFA);
        assert_eq!(*seen_mask.borrow(), 0x0F);
        assert_eq!(ports.input(1), 0x5A);
    }

    #[test]
    fn test_debugger_read_does_not_sample() {
        let mut ports = Ports::new([0xFF; PORT_COUNT]);
        let calls = Rc::new(RefCell::new(0));
        let c = calls.clone();
        ports.set_read_callback(2, Box::new(move |_| { *c.borrow_mut() += 1; 0x00 }));
        assert_eq!(ports.read(2, Access::Debugger), 0xFF);
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(ports.read(2, Access::Program), 0x00);
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_raw_setters_match_power_on() {
        let mut ports = Ports::new([0xFF, 0xFF, 0xFF, 0xBF]);
        ports.power_on();
        let (input, latch) = (ports.input(3), ports.latch(3));
        assert_eq!((input, latch), (0xFF, 0xFF));

        let mut restored = Ports::new([0xFF, 0xFF, 0xFF, 0xBF]);
        restored.set_input_raw(3, input);
        restored.set_latch_raw(3, latch);
        restored.set_ddr_raw(3, 0xFF);
        assert_eq!(restored.read_ddr(3), 0xBF);
        restored.set_ddr_raw(3, 0x00);
        assert_eq!(restored.read(3, Access::Program), ports.read(3, Access::Program));
        assert_eq!(restored.read(3, Access::Program), 0xFF);
    }
}

//! Memory bus interface.
//!
//! Every access to the 13-bit address space goes through [`Bus`], tagged
//! with an [`Access`] kind. Debugger accesses see the same values as the
//! program would but never advance register read/write protocols (timer
//! status seen-state, capture/compare inhibits, TRL latches, COPF).

/// Who is performing a bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Access made by the executing program.
    Program,
    /// Inspection by a debugger or save-state tool. Must be side-effect free.
    Debugger,
}

impl Access {
    #[inline(always)]
    pub fn is_debugger(self) -> bool {
        self == Access::Debugger
    }
}

/// Byte-wide read/write over a 16-bit address.
pub trait Bus {
    fn read8(&mut self, addr: u16, access: Access) -> u8;
    fn write8(&mut self, addr: u16, value: u8, access: Access);

    /// Big-endian 16-bit read, as used for vectors and extended operands.
    fn read16(&mut self, addr: u16, access: Access) -> u16 {
        let hi = self.read8(addr, access);
        let lo = self.read8(addr.wrapping_add(1), access);
        (hi as u16) << 8 | lo as u16
    }
}

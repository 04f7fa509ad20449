//! M68HC05 on-chip peripherals.
//!
//! - [`Ports`]: parallel ports A–D with data direction registers
//! - [`Timer`]: 16-bit free-running timer with input capture and output compare
//! - [`Cop`]: programmable and non-programmable COP watchdogs

mod ports;
mod timer;
mod cop;

pub use ports::{Ports, PortReadFn, PortWriteFn, PORT_COUNT};
pub use timer::{Timer, TcmpWriteFn};
pub use timer::{TCR_ICIE, TCR_OCIE, TCR_TOIE, TCR_IEDG, TCR_OLVL, TSR_ICF, TSR_OCF, TSR_TOF};
pub use cop::Cop;
pub use cop::{COPCR_COPF, COPCR_CME, COPCR_PCOPE, COPCR_CM, PCOP_MASK, NCOP_MASK};

// Interrupt vector addresses (masked to the 13-bit space)
pub const VEC_SPI: u16 = 0x1FF4;
pub const VEC_SCI: u16 = 0x1FF6;
pub const VEC_TIMER: u16 = 0x1FF8;
pub const VEC_INT: u16 = 0x1FFA;
pub const VEC_SWI: u16 = 0x1FFC;
pub const VEC_RESET: u16 = 0x1FFE;

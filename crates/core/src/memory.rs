//! M68HC05 on-chip memory.
//!
//! The whole 13-bit address space is backed by one flat 8 KB image. Which
//! parts of it behave as ROM, RAM or registers is decided by the variant's
//! address map ([`crate::variant::VariantConfig::map`]); this module only
//! stores bytes.
//!
//! | Address Range | Content (all variants)   |
//! |---------------|--------------------------|
//! | 0x0000–0x001F | I/O registers            |
//! | 0x0020–0x004F | User ROM / PROM          |
//! | 0x0050–0x00FF | RAM, stack at 0xC0–0xFF  |
//! | 0x0100–0x1EFF | User ROM (size varies)   |
//! | 0x1F00–0x1FEF | Self-check / bootstrap   |
//! | 0x1FF0–0x1FFF | Vectors                  |

use crate::error::Error;
use crate::ADDRESS_SPACE;

/// Flat backing store for ROM and RAM.
pub struct Memory {
    pub data: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Memory { data: vec![0u8; ADDRESS_SPACE] }
    }

    #[inline(always)]
    pub fn read_raw(&self, addr: u16) -> u8 {
        let a = addr as usize;
        if a < self.data.len() { self.data[a] } else { 0xFF }
    }

    #[inline(always)]
    pub fn write_raw(&mut self, addr: u16, v: u8) {
        let a = addr as usize;
        if a < self.data.len() { self.data[a] = v; }
    }

    /// Copy an image into the backing store at `offset`.
    pub fn load(&mut self, offset: u16, image: &[u8]) -> Result<usize, Error> {
        let start = offset as usize;
        let end = start + image.len();
        if end > self.data.len() {
            return Err(Error::RomOverflow { offset, len: image.len() });
        }
        self.data[start..end].copy_from_slice(image);
        Ok(image.len())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_image() {
        let mut mem = Memory::new();
        assert_eq!(mem.load(0x1FFE, &[0x01, 0x00]).unwrap(), 2);
        assert_eq!(mem.read_raw(0x1FFE), 0x01);
        assert_eq!(mem.read_raw(0x1FFF), 0x00);
    }

    #[test]
    fn test_load_overflow() {
        let mut mem = Memory::new();
        let err = mem.load(0x1FFF, &[0, 0]).unwrap_err();
        assert!(matches!(err, Error::RomOverflow { offset: 0x1FFF, len: 2 }));
    }
}

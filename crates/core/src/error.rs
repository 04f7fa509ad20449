use thiserror::Error;

/// Errors raised while configuring a device or moving its state in and out.
///
/// Guest-program behaviour never produces one of these: out-of-range
/// accesses and malformed register writes are masked the way the silicon
/// masks them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("attempt to set physical port bits after configuration")]
    AlreadyConfigured,
    #[error("image of {len} bytes at 0x{offset:04X} exceeds the address space")]
    RomOverflow { offset: u16, len: usize },
    #[error("save state too small")]
    Truncated,
    #[error("invalid save state (bad magic)")]
    BadMagic,
    #[error("unsupported save state version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("variant mismatch: save={saved} current={current}")]
    VariantMismatch { saved: &'static str, current: &'static str },
    #[error("decompress error: {0}")]
    Decompress(String),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

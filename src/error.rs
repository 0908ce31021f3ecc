use thiserror::Error;

/// Failures while reading or parsing an iNES image.
#[derive(Debug, Error)]
pub enum RomError {
    #[error("could not read ROM: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid iNES signature {0:02X?} (expected 4E 45 53 1A)")]
    BadSignature([u8; 4]),

    #[error("ROM is truncated: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("mapper {0} is not supported (only NROM / mapper 0)")]
    UnsupportedMapper(u8),

    #[error("ROM declares no PRG-ROM banks")]
    EmptyProgram,
}

impl RomError {
    /// True for "read but invalid", false for "couldn't read".
    pub fn is_malformed(&self) -> bool {
        !matches!(self, RomError::Io(_))
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Rom(#[from] RomError),

    #[error("save state encoding failed: {0}")]
    SaveState(#[from] bincode::Error),

    #[error("save state I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("incompatible save state: {0}")]
    IncompatibleSaveState(String),
}

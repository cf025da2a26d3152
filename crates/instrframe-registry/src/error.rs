/// Errors that can occur while building an error registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The table file could not be read.
    #[error("failed to load error table: {0}")]
    LoadFailed(String),

    /// The table JSON is malformed.
    #[error("error table is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The same code appears twice.
    #[error("duplicate code 0x{0:04X} in error table")]
    DuplicateCode(u16),

    /// A code does not fit the table's declared width.
    #[error("code 0x{code:04X} does not fit a {width}-bit table")]
    CodeTooWide { code: u16, width: u8 },

    /// An entry cannot be registered as written.
    #[error("invalid entry 0x{code:04X}: {reason}")]
    InvalidEntry { code: u16, reason: String },

    /// The table exceeds the configured entry limit.
    #[error("error table has {count} entries (max {max})")]
    TooManyEntries { count: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Limits applied when loading error tables from outside the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Maximum bytes accepted from a table file.
    pub max_table_file_size: usize,
    /// Maximum number of entries in one table.
    pub max_entries: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_table_file_size: 64 * 1024,
            max_entries: 1024,
        }
    }
}

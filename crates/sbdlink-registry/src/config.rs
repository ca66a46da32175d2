/// Controls how registry files are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Maximum bytes accepted from a registry file.
    pub max_file_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_file_size: 64 * 1024,
        }
    }
}

/// Errors that can occur while building or loading a descriptor registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registry file could not be loaded.
    #[error("failed to load registry: {0}")]
    LoadFailed(String),

    /// The registry document is not valid JSON.
    #[error("registry is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A descriptor name is empty.
    #[error("descriptor for code {0} is empty")]
    EmptyDescriptor(usize),

    /// A descriptor name appears more than once (or shadows the filler).
    #[error("duplicate descriptor '{0}'")]
    Duplicate(String),

    /// More descriptors than a one-byte code can address.
    #[error("too many descriptors ({count}, max {max})")]
    TooMany { count: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, RegistryError>;

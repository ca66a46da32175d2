use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};

/// Descriptor reserved for code 0.
pub const FILLER: &str = "filler";

/// Wire code of the filler descriptor.
pub const FILLER_CODE: u8 = 0;

/// Number of codes addressable by the one-byte descriptor field.
pub const MAX_CODES: usize = 256;

/// On-disk registry document.
///
/// ```json
/// { "version": "2024-03", "descriptors": ["battery", "attitude", "ping"] }
/// ```
///
/// Descriptors receive codes 1, 2, 3, ... in document order.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryDocument {
    #[serde(default)]
    version: Option<String>,
    descriptors: Vec<String>,
}

/// Bidirectional mapping between wire codes and descriptor strings.
///
/// Immutable once built. Share it behind an `Arc` between the encoder and
/// decoder of a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorRegistry {
    names: Vec<String>,
    codes: HashMap<String, u8>,
    version: Option<String>,
}

impl DescriptorRegistry {
    /// Create a registry holding only the filler descriptor.
    pub fn new() -> Self {
        let mut codes = HashMap::new();
        codes.insert(FILLER.to_string(), FILLER_CODE);
        Self {
            names: vec![FILLER.to_string()],
            codes,
            version: None,
        }
    }

    /// Build a registry from descriptor names, assigning codes 1.. in order.
    pub fn from_descriptors<S: AsRef<str>>(descriptors: &[S]) -> Result<Self> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.push(descriptor.as_ref())?;
        }
        Ok(registry)
    }

    /// Parse a registry document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: RegistryDocument = serde_json::from_str(json)?;
        let mut registry = Self::from_descriptors(&doc.descriptors)?;
        registry.version = doc.version;
        Ok(registry)
    }

    /// Load a registry document from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_file_with_config(path, RegistryConfig::default())
    }

    /// Load a registry document from a file with explicit config.
    pub fn from_file_with_config(path: &Path, config: RegistryConfig) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|err| RegistryError::LoadFailed(format!("{}: {err}", path.display())))?;
        let metadata = file
            .metadata()
            .map_err(|err| RegistryError::LoadFailed(err.to_string()))?;
        if !metadata.is_file() {
            return Err(RegistryError::LoadFailed(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
        if metadata.len() > config.max_file_size as u64 {
            return Err(RegistryError::LoadFailed(format!(
                "registry file too large ({} bytes): {}",
                metadata.len(),
                path.display()
            )));
        }

        let read_limit = u64::try_from(config.max_file_size.saturating_add(1)).unwrap_or(u64::MAX);
        let mut content = String::new();
        file.take(read_limit)
            .read_to_string(&mut content)
            .map_err(|err| {
                RegistryError::LoadFailed(format!("failed reading {}: {err}", path.display()))
            })?;
        if content.len() > config.max_file_size {
            return Err(RegistryError::LoadFailed(format!(
                "registry file too large while reading: {}",
                path.display()
            )));
        }

        let registry = Self::from_json(&content)?;
        debug!(
            path = %path.display(),
            descriptors = registry.len(),
            fingerprint = %format!("{:08x}", registry.fingerprint()),
            "loaded descriptor registry"
        );
        Ok(registry)
    }

    fn push(&mut self, descriptor: &str) -> Result<()> {
        if descriptor.is_empty() {
            return Err(RegistryError::EmptyDescriptor(self.names.len()));
        }
        if self.codes.contains_key(descriptor) {
            return Err(RegistryError::Duplicate(descriptor.to_string()));
        }
        if self.names.len() >= MAX_CODES {
            return Err(RegistryError::TooMany {
                count: self.names.len() + 1,
                max: MAX_CODES,
            });
        }

        let code = self.names.len() as u8;
        self.names.push(descriptor.to_string());
        self.codes.insert(descriptor.to_string(), code);
        Ok(())
    }

    /// Wire code for a descriptor, if registered.
    pub fn code(&self, descriptor: &str) -> Option<u8> {
        self.codes.get(descriptor).copied()
    }

    /// Descriptor for a wire code, if in range.
    pub fn descriptor(&self, code: u8) -> Option<&str> {
        self.names.get(code as usize).map(String::as_str)
    }

    /// Whether a descriptor is registered.
    pub fn contains(&self, descriptor: &str) -> bool {
        self.codes.contains_key(descriptor)
    }

    /// Number of codes in use, filler included.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false: the filler descriptor is present in every registry.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate `(code, descriptor)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(code, name)| (code as u8, name.as_str()))
    }

    /// Version label from the registry document, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// 32-bit FNV-1a digest over the version label and descriptor names.
    pub fn fingerprint(&self) -> u32 {
        const OFFSET: u32 = 0x811c_9dc5;
        const PRIME: u32 = 0x0100_0193;

        let mut hash = OFFSET;
        let mut feed = |bytes: &[u8]| {
            for byte in bytes {
                hash ^= u32::from(*byte);
                hash = hash.wrapping_mul(PRIME);
            }
        };

        feed(self.version.as_deref().unwrap_or("").as_bytes());
        for name in &self.names {
            feed(&[0]);
            feed(name.as_bytes());
        }
        hash
    }
}

impl Default for DescriptorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

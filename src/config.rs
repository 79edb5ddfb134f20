use crate::properties::Properties;
use serde_derive::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// The default CHIP-8 program start address within memory.
const DEFAULT_PROGRAM_ADDRESS: u16 = 0x200;
/// The default processor speed in hertz, used only by embedders that want a fixed-Hertz
/// scheduler rather than driving [Processor::execute_frame](crate::processor::Processor::execute_frame)
/// directly.
pub const DEFAULT_PROCESSOR_SPEED_HERTZ: u64 = 720;

/// Startup parameters an embedder passes when launching a ROM, independent of the persisted
/// [SessionConfiguration]: which preset to start from and at what address to load the image.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Options {
    pub processor_speed_hertz: u64,
    pub program_start_address: u16,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            processor_speed_hertz: DEFAULT_PROCESSOR_SPEED_HERTZ,
            program_start_address: DEFAULT_PROGRAM_ADDRESS,
        }
    }
}

/// A ROM-specific override: the effective [Properties] an embedder has chosen for one
/// particular ROM image, looked up by that ROM's SHA-1 digest rather than its file path so
/// the override survives the file being renamed or moved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RomConfiguration {
    pub properties: Properties,
}

/// Computes the SHA-1 digest of a ROM image, hex-encoded, for use as a [SessionConfiguration]
/// `rom_configs` key.
pub fn digest_rom(rom_data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(rom_data);
    let result = hasher.finalize();
    result.iter().map(|b| format!("{:02x}", b)).collect()
}

/// The persisted state of a Cadmium session: the selected [Properties], a ROM-keyed override
/// map, the processor speed, and the last directory a ROM was loaded from.
///
/// Grounded in the upstream project's `CadmiumConfiguration::load`/`save` (a ROM-keyed SHA-1
/// override map round-tripped through a JSON file) and this crate's own `Options`
/// start-up-parameter precedent; serialized via `serde_json` rather than the upstream's
/// `nlohmann::json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfiguration {
    pub properties: Properties,
    pub processor_speed_hertz: u64,
    pub rom_configs: HashMap<String, RomConfiguration>,
    pub last_rom_directory: String,
}

impl SessionConfiguration {
    pub fn new(properties: Properties) -> Self {
        SessionConfiguration {
            properties,
            processor_speed_hertz: DEFAULT_PROCESSOR_SPEED_HERTZ,
            rom_configs: HashMap::new(),
            last_rom_directory: String::new(),
        }
    }

    /// Records (or replaces) the override `Properties` for the ROM whose digest is `rom_digest`.
    pub fn set_rom_override(&mut self, rom_digest: String, properties: Properties) {
        self.rom_configs.insert(rom_digest, RomConfiguration { properties });
    }

    /// Returns the override `Properties` for `rom_digest`, if one has been recorded.
    pub fn rom_override(&self, rom_digest: &str) -> Option<&Properties> {
        self.rom_configs.get(rom_digest).map(|c| &c.properties)
    }

    /// Loads a [SessionConfiguration] from a JSON file at `path`.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path).map_err(|_| ConfigError::FileError {
            file_path: path.as_ref().display().to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|_| ConfigError::FileError {
            file_path: path.as_ref().display().to_string(),
        })
    }

    /// Saves this [SessionConfiguration] to a JSON file at `path`, pretty-printed for
    /// human-editable on-disk config.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self).map_err(|_| ConfigError::FileError {
            file_path: path.as_ref().display().to_string(),
        })?;
        fs::write(&path, contents).map_err(|_| ConfigError::FileError {
            file_path: path.as_ref().display().to_string(),
        })
    }
}

/// Errors arising from [SessionConfiguration] persistence.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    FileError { file_path: String },
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileError { file_path } => {
                write!(f, "could not read or write configuration file {}", file_path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants::preset;
    use crate::properties::Variant;

    #[test]
    fn test_digest_rom_is_stable() {
        let rom = vec![0x12, 0x34, 0x56];
        assert_eq!(digest_rom(&rom), digest_rom(&rom));
    }

    #[test]
    fn test_digest_rom_differs_for_different_data() {
        assert_ne!(digest_rom(&[0x1]), digest_rom(&[0x2]));
    }

    #[test]
    fn test_rom_override_roundtrip() {
        let mut config = SessionConfiguration::new(preset(Variant::Chip8));
        let digest = digest_rom(&[0xAA, 0xBB]);
        config.set_rom_override(digest.clone(), preset(Variant::SChip11));
        assert_eq!(
            config.rom_override(&digest),
            Some(&preset(Variant::SChip11))
        );
    }

    #[test]
    fn test_rom_override_missing_returns_none() {
        let config = SessionConfiguration::new(preset(Variant::Chip8));
        assert_eq!(config.rom_override("nonexistent"), None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("cadmium-config-test-{:?}", std::thread::current().id()));
        let mut config = SessionConfiguration::new(preset(Variant::XoChip));
        config.last_rom_directory = "/roms".to_string();
        config.save_to_file(&dir).unwrap();
        let loaded = SessionConfiguration::load_from_file(&dir).unwrap();
        assert_eq!(loaded, config);
        let _ = fs::remove_file(&dir);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = SessionConfiguration::load_from_file("/nonexistent/path/cadmium.json");
        assert!(result.is_err());
    }
}

//! Tally configuration file handling
//!
//! Provides default configuration generation and loading for the `tally`
//! operator CLI. Configuration files are TOML format and live next to the
//! poll ledger.
//!
//! ## Sections
//!
//! - `[ledger]`: where poll records are stored between runs
//! - `[access]`: administrators (poll owners) and whether anyone may create polls
//! - `[logging]`: default log level when `RUST_LOG` is unset

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tally::poll::{AccessPolicy, VoterId};

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Tally operator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyConfig {
    /// Poll ledger configuration
    pub ledger: LedgerConfig,

    /// Who may create and close polls
    #[serde(default)]
    pub access: AccessConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ledger location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Path to the JSON poll ledger
    pub path: PathBuf,
}

/// Access control configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccessConfig {
    /// Identities allowed to create polls and close them early
    #[serde(default)]
    pub administrators: Vec<String>,

    /// Allow any identity to create polls
    #[serde(default)]
    pub open_creation: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AccessConfig {
    pub fn policy(&self) -> AccessPolicy {
        AccessPolicy::new(self.administrators.iter().map(|a| VoterId::new(a.trim())))
            .with_open_creation(self.open_creation)
    }
}

impl TallyConfig {
    /// Create a new configuration with the given ledger path
    pub fn new(ledger_path: PathBuf) -> Self {
        Self {
            ledger: LedgerConfig { path: ledger_path },
            access: AccessConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: TallyConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Load the config at `path`, generating a default one first if missing.
    ///
    /// The flag reports whether the file was generated by this call.
    pub fn load_or_create(path: &Path) -> Result<(Self, bool), Box<dyn std::error::Error>> {
        let created = !path.exists();
        if created {
            let ledger_path = default_ledger_path(path);
            Self::create_default(path, &ledger_path)?;
        }
        Ok((Self::load(path)?, created))
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(ledger_path: &Path) -> String {
        format!(
            r#"# Tally Configuration
#
# Operator settings for the poll lifecycle CLI.

[ledger]
# JSON file holding every poll record
path = "{ledger_path}"

[access]
# Identities that may create polls and close them before their deadline.
# Anyone may close a poll once its deadline has passed.
administrators = []

# Let any identity create polls (administrators still close early)
open_creation = false

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "info"
"#,
            ledger_path = ledger_path.display()
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(
        config_path: &Path,
        ledger_path: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml(ledger_path);

        // Create parent directory if needed
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

/// Get the default data directory (~/.local/share/tally on Linux)
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

/// Get the default ledger path for a config file
///
/// The ledger is stored adjacent to the config:
/// - Config: ~/.local/share/tally/config.toml
/// - Ledger: ~/.local/share/tally/polls.json
pub fn default_ledger_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("polls.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let ledger_path = PathBuf::from("/data/tally/polls.json");
        let config = TallyConfig::new(ledger_path.clone());

        assert_eq!(config.ledger.path, ledger_path);
        assert!(config.access.administrators.is_empty());
        assert!(!config.access.open_creation);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = TallyConfig::new(PathBuf::from("/data/tally/polls.json"));
        config.access.administrators = vec!["owner".to_string()];
        config.save(&config_path).unwrap();

        let loaded = TallyConfig::load(&config_path).unwrap();
        assert_eq!(loaded.ledger.path, PathBuf::from("/data/tally/polls.json"));
        assert_eq!(loaded.access.administrators, vec!["owner".to_string()]);
    }

    #[test]
    fn test_load_or_create_generates_default() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sub").join("config.toml");

        let (config, created) = TallyConfig::load_or_create(&config_path).unwrap();

        assert!(created);
        assert!(config_path.exists());
        assert_eq!(config.ledger.path, temp_dir.path().join("sub").join("polls.json"));

        let (_, created) = TallyConfig::load_or_create(&config_path).unwrap();
        assert!(!created);
    }

    #[test]
    fn test_default_ledger_path() {
        let config_path = PathBuf::from("/data/tally/config.toml");
        assert_eq!(
            default_ledger_path(&config_path),
            PathBuf::from("/data/tally/polls.json")
        );
    }

    #[test]
    fn test_load_config_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        // Write minimal config (only required fields)
        let minimal_config = r#"
[ledger]
path = "/tmp/polls.json"
"#;
        fs::write(&config_path, minimal_config).unwrap();

        let config = TallyConfig::load(&config_path).unwrap();

        assert!(config.access.administrators.is_empty());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_access_policy_from_config() {
        let access = AccessConfig {
            administrators: vec![" owner ".to_string()],
            open_creation: false,
        };
        let policy = access.policy();

        assert!(policy.is_administrator(&VoterId::from("owner")));
        assert!(!policy.can_create(&VoterId::from("voter1")));
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[ledger\npath = 3").unwrap();

        let err = TallyConfig::load(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}

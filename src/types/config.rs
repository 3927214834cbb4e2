//! Configuration for the electoral core.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::candidacy::MemberRole;
use crate::EleitoralResult;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Procedural deadlines.
    #[serde(default)]
    pub deadlines: DeadlinesConfig,

    /// Candidacy slate rules.
    #[serde(default)]
    pub candidacy: CandidacyConfig,

    /// Judgment session defaults.
    #[serde(default)]
    pub adjudication: AdjudicationConfig,

    /// Tally settings.
    #[serde(default)]
    pub tally: TallyConfig,

    /// Persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Aggregation cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Deadlines, in days, opened by the adversarial workflows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlinesConfig {
    /// Defense window for complaints.
    #[serde(default = "default_round_days")]
    pub defense_days: i64,

    /// Allegations window for challenges.
    #[serde(default = "default_round_days")]
    pub allegations_days: i64,

    /// Counter-allegations window for challenges.
    #[serde(default = "default_round_days")]
    pub counter_allegations_days: i64,

    /// Appeal window after a first-instance judgment.
    #[serde(default = "default_appeal_days")]
    pub appeal_days: i64,
}

impl Default for DeadlinesConfig {
    fn default() -> Self {
        Self {
            defense_days: default_round_days(),
            allegations_days: default_round_days(),
            counter_allegations_days: default_round_days(),
            appeal_days: default_appeal_days(),
        }
    }
}

fn default_round_days() -> i64 {
    5
}

fn default_appeal_days() -> i64 {
    5
}

/// Candidacy slate rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidacyConfig {
    /// Roles that must be held by an approved titular member.
    #[serde(default = "default_mandatory_roles")]
    pub mandatory_roles: Vec<MemberRole>,
}

impl Default for CandidacyConfig {
    fn default() -> Self {
        Self {
            mandatory_roles: default_mandatory_roles(),
        }
    }
}

fn default_mandatory_roles() -> Vec<MemberRole> {
    vec![MemberRole::President, MemberRole::VicePresident]
}

/// Judgment session defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjudicationConfig {
    /// Quorum used when a session is scheduled without an explicit one.
    #[serde(default = "default_quorum")]
    pub default_quorum: usize,
}

impl Default for AdjudicationConfig {
    fn default() -> Self {
        Self {
            default_quorum: default_quorum(),
        }
    }
}

fn default_quorum() -> usize {
    3
}

/// Tally settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyConfig {
    /// Decimal places kept in percentages.
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            decimal_places: default_decimal_places(),
        }
    }
}

fn default_decimal_places() -> u32 {
    2
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Use the SQLite store (otherwise everything stays in memory).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// SQLite database path.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: default_db_path(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".eleitoral/eleitoral.db")
}

/// Aggregation cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum cache capacity (number of aggregations).
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> usize {
    64
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> EleitoralResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> EleitoralResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Creates default configuration.
    pub fn default_config() -> Self {
        Self {
            general: GeneralConfig::default(),
            deadlines: DeadlinesConfig::default(),
            candidacy: CandidacyConfig::default(),
            adjudication: AdjudicationConfig::default(),
            tally: TallyConfig::default(),
            storage: StorageConfig::default(),
            cache: CacheConfig::default(),
        }
    }

    /// Tries to load configuration from current directory or uses default.
    pub fn load_or_default() -> Self {
        Self::load("eleitoral.toml").unwrap_or_else(|_| Self::default_config())
    }

    /// Rejects values the workflows cannot operate with.
    pub fn validate(&self) -> EleitoralResult<()> {
        let d = &self.deadlines;
        for (name, days) in [
            ("defense_days", d.defense_days),
            ("allegations_days", d.allegations_days),
            ("counter_allegations_days", d.counter_allegations_days),
            ("appeal_days", d.appeal_days),
        ] {
            if days <= 0 {
                return Err(crate::EleitoralError::config(format!(
                    "deadlines.{} must be positive, got {}",
                    name, days
                )));
            }
        }
        if self.adjudication.default_quorum == 0 {
            return Err(crate::EleitoralError::config(
                "adjudication.default_quorum must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.deadlines.defense_days, 5);
        assert_eq!(config.deadlines.appeal_days, 5);
        assert_eq!(config.adjudication.default_quorum, 3);
        assert!(config
            .candidacy
            .mandatory_roles
            .contains(&MemberRole::President));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("eleitoral.toml");

        let mut config = Config::default();
        config.deadlines.defense_days = 10;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.deadlines.defense_days, 10);
        assert_eq!(loaded.candidacy.mandatory_roles.len(), 2);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[deadlines]\nappeal_days = 3\n").unwrap();
        assert_eq!(config.deadlines.appeal_days, 3);
        assert_eq!(config.deadlines.defense_days, 5);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_validate_rejects_zero_quorum() {
        let mut config = Config::default();
        config.adjudication.default_quorum = 0;
        assert!(config.validate().is_err());
    }
}

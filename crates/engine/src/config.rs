//! Engine configuration from the environment.
//!
//! `.env.local` and then `.env` at the repository root are loaded first;
//! variables already set in the process win.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use sheetsmith_domain::{compendium::MAX_LEVEL, UnverifiablePolicy};

pub const DATABASE_PATH_VAR: &str = "SHEETSMITH_DATABASE_PATH";
pub const MAX_LEVEL_VAR: &str = "SHEETSMITH_MAX_LEVEL";
pub const UNVERIFIABLE_POLICY_VAR: &str = "SHEETSMITH_UNVERIFIABLE_POLICY";
pub const HP_METHOD_VAR: &str = "SHEETSMITH_HP_METHOD";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Default hit-point gain when a level-up does not say how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HpMethod {
    /// Fixed average of the hit die
    #[default]
    Average,
    /// Roll the hit die
    Roll,
}

impl FromStr for HpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "average" | "fixed" => Ok(Self::Average),
            "roll" | "random" => Ok(Self::Roll),
            other => Err(format!("expected 'average' or 'roll', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// SQLite file; the in-memory store is used when unset
    pub database_path: Option<PathBuf>,
    pub max_level: u8,
    pub unverifiable_policy: UnverifiablePolicy,
    pub hp_method: HpMethod,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            max_level: MAX_LEVEL,
            unverifiable_policy: UnverifiablePolicy::Block,
            hp_method: HpMethod::Average,
        }
    }
}

impl EngineConfig {
    /// Load dotenv files from the repository root, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv_from(&repo_root());
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let read = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let max_level = match read(MAX_LEVEL_VAR) {
            Some(value) => match value.trim().parse::<u8>() {
                Ok(level) if (1..=MAX_LEVEL).contains(&level) => level,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: MAX_LEVEL_VAR,
                        value,
                        reason: format!("expected a level between 1 and {}", MAX_LEVEL),
                    })
                }
            },
            None => defaults.max_level,
        };

        let unverifiable_policy = match read(UNVERIFIABLE_POLICY_VAR) {
            Some(value) => {
                UnverifiablePolicy::from_str(&value).map_err(|e| ConfigError::Invalid {
                    var: UNVERIFIABLE_POLICY_VAR,
                    reason: e.to_string(),
                    value,
                })?
            }
            None => defaults.unverifiable_policy,
        };

        let hp_method = match read(HP_METHOD_VAR) {
            Some(value) => HpMethod::from_str(&value).map_err(|reason| ConfigError::Invalid {
                var: HP_METHOD_VAR,
                value,
                reason,
            })?,
            None => defaults.hp_method,
        };

        Ok(Self {
            database_path: read(DATABASE_PATH_VAR).map(PathBuf::from),
            max_level,
            unverifiable_policy,
            hp_method,
        })
    }
}

fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

fn load_dotenv_from(root: &Path) {
    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = root.join(filename);
        if path.exists() {
            if let Err(e) = dotenvy::from_path(&path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to load env file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = EngineConfig::from_lookup(lookup(&[
            (DATABASE_PATH_VAR, "/tmp/sheets.db"),
            (MAX_LEVEL_VAR, "10"),
            (UNVERIFIABLE_POLICY_VAR, "Allow"),
            (HP_METHOD_VAR, "roll"),
        ]))
        .unwrap();
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/sheets.db")));
        assert_eq!(config.max_level, 10);
        assert_eq!(config.unverifiable_policy, UnverifiablePolicy::Allow);
        assert_eq!(config.hp_method, HpMethod::Roll);
    }

    #[test]
    fn rejects_bad_values() {
        let err = EngineConfig::from_lookup(lookup(&[(MAX_LEVEL_VAR, "21")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: MAX_LEVEL_VAR, .. }));

        let err =
            EngineConfig::from_lookup(lookup(&[(UNVERIFIABLE_POLICY_VAR, "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: UNVERIFIABLE_POLICY_VAR, .. }));
    }

    #[test]
    fn dotenv_files_fill_missing_variables() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "SHEETSMITH_TEST_ONLY_VAR=from-dotenv\n",
        )
        .unwrap();
        load_dotenv_from(dir.path());
        assert_eq!(
            std::env::var("SHEETSMITH_TEST_ONLY_VAR").as_deref(),
            Ok("from-dotenv")
        );
    }
}

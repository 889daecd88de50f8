//! Frozen configuration, loaded once at startup (spec §3 "Configuration",
//! §6.4 "Configuration surface"). Nothing in this module is mutated after
//! [`Config::load_with_path`] returns; components hold it by `Arc` or shared
//! reference.

use crate::error::VibeCraftError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// WorldEdit emission policy (spec §4.2, §6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorldEditMode {
    Auto,
    Force,
    Off,
}

impl Default for WorldEditMode {
    fn default() -> Self {
        WorldEditMode::Auto
    }
}

impl std::str::FromStr for WorldEditMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(WorldEditMode::Auto),
            "force" => Ok(WorldEditMode::Force),
            "off" => Ok(WorldEditMode::Off),
            other => Err(format!("unknown worldedit mode '{other}' (expected auto|force|off)")),
        }
    }
}

/// Axis-aligned inclusive bounding box of permitted build coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildBox {
    pub min_x: i64,
    pub min_y: i64,
    pub min_z: i64,
    pub max_x: i64,
    pub max_y: i64,
    pub max_z: i64,
}

impl BuildBox {
    pub fn contains(&self, x: i64, y: i64, z: i64) -> bool {
        (self.min_x..=self.max_x).contains(&x)
            && (self.min_y..=self.max_y).contains(&y)
            && (self.min_z..=self.max_z).contains(&z)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8766,
            path: "/vibecraft".to_string(),
            token: None,
            request_timeout_secs: 30,
        }
    }
}

impl BridgeConfig {
    pub fn url(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, self.path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub safety_checks_on: bool,
    pub dangerous_allowed: bool,
    pub max_command_length: usize,
    pub build_box: Option<BuildBox>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            safety_checks_on: true,
            dangerous_allowed: false,
            max_command_length: 1500,
            build_box: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FeatureFlags {
    pub command_logging: bool,
    pub version_detection: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub sse_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { sse_port: 8787 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub directory: Option<String>,
    pub retention_days: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub bridge: BridgeConfig,
    pub worldedit_mode: WorldEditMode,
    pub safety: SafetyConfig,
    pub features: FeatureFlags,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load `vibecraft.toml` from the current directory if present, then
    /// apply environment variable overrides (spec §6.4), then validate.
    /// Returns the config plus the path it was loaded from, if any.
    pub fn load_with_path() -> anyhow::Result<(Self, Option<PathBuf>)> {
        let path = Path::new("vibecraft.toml");
        let (mut config, loaded_path) = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            (config, Some(path.to_path_buf()))
        } else {
            (Config::default(), None)
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok((config, loaded_path))
    }

    fn apply_env_overrides(&mut self) {
        use std::env::var;

        if let Ok(v) = var("VIBECRAFT_BRIDGE_HOST") {
            self.bridge.host = v;
        }
        if let Ok(v) = var("VIBECRAFT_BRIDGE_PORT") {
            if let Ok(p) = v.parse() {
                self.bridge.port = p;
            }
        }
        if let Ok(v) = var("VIBECRAFT_BRIDGE_PATH") {
            self.bridge.path = v;
        }
        if let Ok(v) = var("VIBECRAFT_BRIDGE_TOKEN") {
            self.bridge.token = Some(v);
        }
        if let Ok(v) = var("VIBECRAFT_REQUEST_TIMEOUT_SECS") {
            if let Ok(t) = v.parse() {
                self.bridge.request_timeout_secs = t;
            }
        }
        if let Ok(v) = var("VIBECRAFT_WORLDEDIT_MODE") {
            if let Ok(mode) = v.parse() {
                self.worldedit_mode = mode;
            }
        }
        if let Ok(v) = var("VIBECRAFT_SAFETY_CHECKS") {
            self.safety.safety_checks_on = parse_bool(&v);
        }
        if let Ok(v) = var("VIBECRAFT_DANGEROUS_ALLOWED") {
            self.safety.dangerous_allowed = parse_bool(&v);
        }
        if let Ok(v) = var("VIBECRAFT_MAX_COMMAND_LENGTH") {
            if let Ok(n) = v.parse() {
                self.safety.max_command_length = n;
            }
        }
        if let Ok(v) = var("VIBECRAFT_COMMAND_LOGGING") {
            self.features.command_logging = parse_bool(&v);
        }
        if let Ok(v) = var("VIBECRAFT_VERSION_DETECTION") {
            self.features.version_detection = parse_bool(&v);
        }

        let bounds = [
            var("VIBECRAFT_BUILD_MIN_X"),
            var("VIBECRAFT_BUILD_MIN_Y"),
            var("VIBECRAFT_BUILD_MIN_Z"),
            var("VIBECRAFT_BUILD_MAX_X"),
            var("VIBECRAFT_BUILD_MAX_Y"),
            var("VIBECRAFT_BUILD_MAX_Z"),
        ];
        if bounds.iter().all(|v| v.is_ok()) {
            let parsed: Result<Vec<i64>, _> =
                bounds.into_iter().map(|v| v.unwrap().parse::<i64>()).collect();
            if let Ok(v) = parsed {
                self.safety.build_box = Some(BuildBox {
                    min_x: v[0],
                    min_y: v[1],
                    min_z: v[2],
                    max_x: v[3],
                    max_y: v[4],
                    max_z: v[5],
                });
            }
        }
    }

    /// Exit-code-1-class validation: unparseable numerics or conflicting
    /// bounds (spec §6.4).
    pub fn validate(&self) -> Result<(), VibeCraftError> {
        if self.safety.max_command_length == 0 {
            return Err(VibeCraftError::ConfigInvalid {
                field: "safety.max_command_length".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if let Some(b) = &self.safety.build_box {
            if b.min_x > b.max_x || b.min_y > b.max_y || b.min_z > b.max_z {
                return Err(VibeCraftError::ConfigInvalid {
                    field: "safety.build_box".to_string(),
                    message: "min bound exceeds max bound on at least one axis".to_string(),
                });
            }
        }
        if self.bridge.request_timeout_secs == 0 {
            return Err(VibeCraftError::ConfigInvalid {
                field: "bridge.request_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bridge.url(), "ws://127.0.0.1:8766/vibecraft");
    }

    #[test]
    fn rejects_inverted_build_box() {
        let mut config = Config::default();
        config.safety.build_box = Some(BuildBox {
            min_x: 10,
            min_y: 0,
            min_z: 0,
            max_x: -10,
            max_y: 10,
            max_z: 10,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_max_command_length() {
        let mut config = Config::default();
        config.safety.max_command_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn worldedit_mode_parses_case_insensitively() {
        assert_eq!("Auto".parse::<WorldEditMode>().unwrap(), WorldEditMode::Auto);
        assert_eq!("FORCE".parse::<WorldEditMode>().unwrap(), WorldEditMode::Force);
        assert!("bogus".parse::<WorldEditMode>().is_err());
    }

    #[test]
    fn build_box_contains_is_inclusive() {
        let b = BuildBox { min_x: 0, min_y: 0, min_z: 0, max_x: 10, max_y: 10, max_z: 10 };
        assert!(b.contains(0, 0, 0));
        assert!(b.contains(10, 10, 10));
        assert!(!b.contains(11, 0, 0));
        assert!(!b.contains(-1, 0, 0));
    }
}

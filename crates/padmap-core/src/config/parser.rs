// Padmap Config Parser - TOML with Serde
// Parses startup, coalescing and profile configuration from TOML files

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::coalesce::DEFAULT_MAX_PENDING;
use crate::dispatch::{DispatchConfig, DEFAULT_TICK};
use crate::keycode::KeyCode;
use crate::mapping::{Command, Mapper, Profile, Target};

/// Configuration parser errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid binding target: {0}")]
    InvalidTarget(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid pad: {0}")]
    InvalidPad(String),

    #[error("No [[profile]] defined")]
    NoProfiles,
}

/// Root TOML table
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    #[serde(default)]
    startup: Option<StartupToml>,

    #[serde(default)]
    coalesce: Option<CoalesceToml>,

    #[serde(default, rename = "profile")]
    profiles: Vec<ProfileToml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct StartupToml {
    enabled: Option<bool>,
    pad_count: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CoalesceToml {
    // Validated by parse_flush_interval
    flush_interval_ms: Option<toml::Value>,
    tick_ms: Option<u64>,
    max_pending: Option<usize>,
    drain_on_stop: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ProfileToml {
    name: Option<String>,

    #[serde(default)]
    commands: HashMap<String, String>,

    /// Pad number (1-based, "1" or "pad1") -> key name -> target name
    #[serde(default)]
    pads: BTreeMap<String, HashMap<String, String>>,
}

/// Loaded configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether mapping starts enabled
    pub start_enabled: bool,
    /// Number of virtual pads
    pub pad_count: usize,
    /// Coalescing and scheduler settings
    pub dispatch: DispatchConfig,
    /// Profiles, in file order; index 0 is active at startup
    pub profiles: Vec<Profile>,
    /// Path to the config file (for reload)
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path)?;
        let mut config = Self::from_toml(&content)?;
        config.source_path = Some(path.as_ref().to_path_buf());
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;

        let startup = raw.startup.unwrap_or_default();
        let pad_count = startup.pad_count.unwrap_or(1);
        if pad_count == 0 {
            return Err(ConfigError::InvalidPad("pad_count must be at least 1".to_string()));
        }

        let dispatch = parse_dispatch(raw.coalesce.unwrap_or_default());

        if raw.profiles.is_empty() {
            return Err(ConfigError::NoProfiles);
        }
        let profiles = raw
            .profiles
            .into_iter()
            .enumerate()
            .map(|(index, profile)| parse_profile(index, profile, pad_count))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!(
            "config: {} pad(s), {} profile(s), flush interval {:?}",
            pad_count,
            profiles.len(),
            dispatch.flush_interval
        );

        Ok(Self {
            start_enabled: startup.enabled.unwrap_or(true),
            pad_count,
            dispatch,
            profiles,
            source_path: None,
        })
    }

    /// Default config path (~/.config/padmap/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("padmap").join("config.toml"))
    }

    /// Load from the default location, falling back to the built-in config
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Self::from_toml(default_config_content())
    }

    /// Re-read the file this config was loaded from
    pub fn reload(&mut self) -> Result<(), ConfigError> {
        match self.source_path.clone() {
            Some(path) => {
                *self = Self::from_file(path)?;
                Ok(())
            }
            None => Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no source path set",
            ))),
        }
    }

    /// Build the transition mapper for these profiles
    pub fn mapper(&self) -> Mapper {
        Mapper::new(self.profiles.clone())
    }
}

fn parse_dispatch(raw: CoalesceToml) -> DispatchConfig {
    let tick = match raw.tick_ms {
        Some(0) => {
            log::warn!("coalesce.tick_ms = 0 would spin, using 1ms");
            Duration::from_millis(1)
        }
        Some(ms) => Duration::from_millis(ms),
        None => DEFAULT_TICK,
    };

    DispatchConfig {
        flush_interval: parse_flush_interval(raw.flush_interval_ms.as_ref()),
        tick,
        max_pending: raw.max_pending.unwrap_or(DEFAULT_MAX_PENDING),
        drain_on_stop: raw.drain_on_stop.unwrap_or(true),
    }
}

/// Parse `flush_interval_ms`, falling back to immediate mode on bad input.
///
/// Accepts a non-negative integer or a string holding one.
pub fn parse_flush_interval(value: Option<&toml::Value>) -> Duration {
    let millis = match value {
        None => return Duration::ZERO,
        Some(toml::Value::Integer(ms)) if *ms >= 0 => Some(*ms as u64),
        Some(toml::Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };

    match millis {
        Some(ms) => Duration::from_millis(ms),
        None => {
            log::warn!(
                "invalid coalesce.flush_interval_ms {:?}, falling back to immediate mode",
                value
            );
            Duration::ZERO
        }
    }
}

fn parse_pad_number(raw: &str, pad_count: usize) -> Result<usize, ConfigError> {
    let digits = raw.strip_prefix("pad").unwrap_or(raw);
    let number: usize = digits
        .parse()
        .map_err(|_| ConfigError::InvalidPad(raw.to_string()))?;
    if number == 0 || number > pad_count {
        return Err(ConfigError::InvalidPad(format!(
            "{} (configured pads: 1..={})",
            raw, pad_count
        )));
    }
    Ok(number - 1)
}

fn parse_key(name: &str) -> Result<KeyCode, ConfigError> {
    KeyCode::from_name(name).ok_or_else(|| ConfigError::InvalidKey(name.to_string()))
}

fn parse_profile(index: usize, raw: ProfileToml, pad_count: usize) -> Result<Profile, ConfigError> {
    let name = raw.name.unwrap_or_else(|| format!("profile{}", index));
    let mut profile = Profile::new(name, pad_count);

    for (pad_name, bindings) in &raw.pads {
        let pad = parse_pad_number(pad_name, pad_count)?;
        for (key_name, target_name) in bindings {
            let key = parse_key(key_name)?;
            let target = Target::from_name(target_name)
                .ok_or_else(|| ConfigError::InvalidTarget(target_name.clone()))?;
            profile.bind(pad, key, target);
        }
    }

    for (key_name, command_name) in &raw.commands {
        let key = parse_key(key_name)?;
        let command = command_name
            .parse::<Command>()
            .map_err(ConfigError::InvalidCommand)?;
        profile.bind_command(key, command);
    }

    Ok(profile)
}

/// Create default config content for a new installation
pub fn default_config_content() -> &'static str {
    r#"# Padmap Configuration
# Place this file at: ~/.config/padmap/config.toml

[startup]
# Start with mapping enabled
enabled = true
# Number of virtual pads
pad_count = 1

[coalesce]
# Minimum time between two state changes of one control (0 = immediate mode)
flush_interval_ms = 10
# How often buffered events are checked
tick_ms = 2
# Oldest events are dropped beyond this many (0 = unbounded)
max_pending = 1024
# Apply (true) or discard (false) buffered events on shutdown
drain_on_stop = true

[[profile]]
name = "default"

[profile.commands]
F12 = "enableToggle"
PAUSE = "exit"
F1 = "config0"
F2 = "config1"

[profile.pads.1]
UP = "UP"
DOWN = "DOWN"
LEFT = "LEFT"
RIGHT = "RIGHT"
W = "LUP"
S = "LDOWN"
A = "LLEFT"
D = "LRIGHT"
SPACE = "A"
LEFT_CTRL = "B"
LEFT_SHIFT = "X"
LEFT_ALT = "Y"
ENTER = "START"
BACKSPACE = "BACK"
Q = "LB"
E = "RB"
Z = "LT"
C = "RT"

[[profile]]
name = "arrows-as-stick"

[profile.commands]
F12 = "enableToggle"
PAUSE = "exit"
F1 = "config0"
F2 = "config1"

[profile.pads.1]
UP = "LUP"
DOWN = "LDOWN"
LEFT = "LLEFT"
RIGHT = "LRIGHT"
SPACE = "A"
ENTER = "START"
"#
}

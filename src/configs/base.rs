use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{common::types::AnyResult, configs::*};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
  #[serde(default)]
  pub logging: Option<LoggingConfig>,
  #[serde(default)]
  pub http: HttpConfig,
  #[serde(default)]
  pub youtube: YouTubeConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

impl Config {
  /// Loads `path` if given, else `config.toml`, else `config.default.toml`.
  /// With no file at all the built-in defaults are used.
  pub fn load(path: Option<&str>) -> AnyResult<Self> {
    let config_path = match path {
      Some(p) if Path::new(p).exists() => p,
      Some(p) => return Err(format!("{} not found", p).into()),
      None if Path::new("config.toml").exists() => "config.toml",
      None if Path::new("config.default.toml").exists() => "config.default.toml",
      None => return Ok(Self::default()),
    };

    let config_str = std::fs::read_to_string(config_path)?;
    Self::parse(&config_str).map_err(|e| format!("{}: {}", config_path, e).into())
  }

  pub fn parse(config_str: &str) -> AnyResult<Self> {
    let config: Config = toml::from_str(config_str)?;
    if config.cache.trim_to >= config.cache.capacity {
      return Err("cache.trim_to must be smaller than cache.capacity".into());
    }
    Ok(config)
  }
}

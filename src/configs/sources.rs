use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YouTubeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// The iOS player request is slow and rarely adds anything, so it is opt-in.
    #[serde(default)]
    pub fetch_ios: bool,
    #[serde(default = "default_hl")]
    pub hl: String,
    #[serde(default = "default_gl")]
    pub gl: String,
    /// Hours a downloaded player script stays valid before it is fetched again.
    #[serde(default = "default_script_ttl_hours")]
    pub script_ttl_hours: u64,
}

fn default_true() -> bool {
    true
}

fn default_hl() -> String {
    "en".to_string()
}

fn default_gl() -> String {
    "US".to_string()
}

fn default_script_ttl_hours() -> u64 {
    24
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fetch_ios: false,
            hl: default_hl(),
            gl: default_gl(),
            script_ttl_hours: default_script_ttl_hours(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_trim_to")]
    pub trim_to: usize,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Per-service TTL overrides, keyed by service name.
    #[serde(default)]
    pub service_ttl_secs: HashMap<String, u64>,
}

fn default_capacity() -> usize {
    60
}

fn default_trim_to() -> usize {
    30
}

fn default_ttl_secs() -> u64 {
    60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            trim_to: default_trim_to(),
            ttl_secs: default_ttl_secs(),
            service_ttl_secs: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

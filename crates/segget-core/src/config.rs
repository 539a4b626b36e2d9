use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::segmenter::RangePolicy;

/// Global configuration loaded from `~/.config/segget/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeggetConfig {
    /// Segment count used when the CLI does not pass `-s`.
    pub segments: u32,
    /// How the bytes left over by `total / segments` are planned.
    #[serde(default)]
    pub range_policy: RangePolicy,
    /// Connect timeout for probe and segment requests, in seconds.
    pub connect_timeout_secs: u64,
    /// Abort a segment whose throughput stays below this many bytes/s ...
    pub low_speed_limit_bytes: u32,
    /// ... for this many seconds.
    pub low_speed_time_secs: u64,
    /// Optional override for the state record path (default: XDG state dir).
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

impl Default for SeggetConfig {
    fn default() -> Self {
        Self {
            segments: 4,
            range_policy: RangePolicy::default(),
            connect_timeout_secs: 30,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
            state_file: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("segget")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SeggetConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SeggetConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: SeggetConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = SeggetConfig::default();
        assert_eq!(cfg.segments, 4);
        assert_eq!(cfg.range_policy, RangePolicy::Truncate);
        assert_eq!(cfg.connect_timeout_secs, 30);
        assert!(cfg.state_file.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = SeggetConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: SeggetConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.segments, cfg.segments);
        assert_eq!(parsed.range_policy, cfg.range_policy);
        assert_eq!(parsed.low_speed_limit_bytes, cfg.low_speed_limit_bytes);
        assert_eq!(parsed.low_speed_time_secs, cfg.low_speed_time_secs);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            segments = 8
            range_policy = "extend_last"
            connect_timeout_secs = 5
            low_speed_limit_bytes = 4096
            low_speed_time_secs = 20
            state_file = "/tmp/segget-state.json"
        "#;
        let cfg: SeggetConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.segments, 8);
        assert_eq!(cfg.range_policy, RangePolicy::ExtendLast);
        assert_eq!(cfg.connect_timeout_secs, 5);
        assert_eq!(cfg.low_speed_limit_bytes, 4096);
        assert_eq!(
            cfg.state_file.as_deref(),
            Some(std::path::Path::new("/tmp/segget-state.json"))
        );
    }

    #[test]
    fn config_toml_policy_defaults_to_truncate() {
        let toml = r#"
            segments = 2
            connect_timeout_secs = 10
            low_speed_limit_bytes = 1
            low_speed_time_secs = 1
        "#;
        let cfg: SeggetConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.range_policy, RangePolicy::Truncate);
        assert!(cfg.state_file.is_none());
    }
}

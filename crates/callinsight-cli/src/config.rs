//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use callinsight_core::OVERLAY_ITEM_LIMIT;

/// Application configuration.
///
/// The `*_permitted` flags stand in for the platform permissions a real host
/// would query; they are read on every check, never cached by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Number of history lines shown on the overlay.
    pub history_limit: usize,
    /// Whether drawing over other apps is allowed.
    pub overlay_permitted: bool,
    /// Whether the call log may be read.
    pub call_log_permitted: bool,
    /// Whether text messages may be read.
    pub sms_permitted: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_limit: OVERLAY_ITEM_LIMIT,
            overlay_permitted: true,
            call_log_permitted: true,
            sms_permitted: true,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (CALLINSIGHT_*)
        figment = figment.merge(Env::prefixed("CALLINSIGHT_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for callinsight.
///
/// On Linux: `~/.config/callinsight`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("callinsight"))
}

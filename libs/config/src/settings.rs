//! Engine Settings
//!
//! Loads [`AmmSettings`] from a TOML file with optional environment-specific
//! overrides and `LPOOL_` environment variables layered on top.

use crate::defaults;
use amm::{Address, GlobalConfig, MintMetadata};
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Complete settings for one engine deployment
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AmmSettings {
    pub engine: EngineSettings,
    pub lp_token: LpTokenSettings,
    pub logging: LoggingSettings,
}

/// Fee policy and address namespace
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub program_id: Address,
    /// Signer recorded as the global config's creator; required
    pub authority: Option<Address>,
    pub default_fee_bps: u16,
    pub max_fee_bps: u16,
}

/// Metadata attached to every pool's LP share mint
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LpTokenSettings {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive, e.g. `info` or `lpool_amm=debug`
    pub level: String,
    pub json: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            // The default is a compile-time constant known to parse
            program_id: defaults::engine::PROGRAM_ID.parse().unwrap_or_default(),
            authority: None,
            default_fee_bps: defaults::engine::DEFAULT_FEE_BPS,
            max_fee_bps: defaults::engine::MAX_FEE_BPS,
        }
    }
}

impl Default for LpTokenSettings {
    fn default() -> Self {
        Self {
            name: defaults::lp_token::NAME.to_string(),
            symbol: defaults::lp_token::SYMBOL.to_string(),
            decimals: defaults::lp_token::DECIMALS,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::logging::LEVEL.to_string(),
            json: false,
        }
    }
}

impl From<&LpTokenSettings> for MintMetadata {
    fn from(settings: &LpTokenSettings) -> Self {
        MintMetadata {
            name: settings.name.clone(),
            symbol: settings.symbol.clone(),
            decimals: settings.decimals,
        }
    }
}

impl AmmSettings {
    /// Load from the default locations
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        Self::load_with_prefix(base_path, environment, defaults::sources::ENV_PREFIX)
    }

    /// Load with a custom environment variable prefix
    pub fn load_with_prefix(
        base_path: Option<&Path>,
        environment: Option<&str>,
        env_prefix: &str,
    ) -> Result<Self> {
        let base = base_path.unwrap_or(Path::new(defaults::sources::BASE_FILE));

        let mut builder = Config::builder().add_source(File::from(base).required(false));
        if !base.exists() {
            warn!("Settings file not found, using defaults: {:?}", base);
        }

        // Add environment-specific overrides if specified
        if let Some(env) = environment {
            let env_dir = base
                .parent()
                .map(|dir| dir.join("environments"))
                .unwrap_or_else(|| PathBuf::from(defaults::sources::ENVIRONMENTS_DIR));
            let env_file = env_dir.join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment settings: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment settings not found: {:?}", env_file);
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: AmmSettings = builder
            .build()
            .context("Failed to build settings")?
            .try_deserialize()
            .context("Failed to deserialize settings")?;

        settings.validate()?;
        debug!(?settings, "Settings loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.max_fee_bps > amm::BPS_DENOMINATOR {
            bail!(
                "engine.max_fee_bps {} exceeds {}",
                self.engine.max_fee_bps,
                amm::BPS_DENOMINATOR
            );
        }
        if self.engine.default_fee_bps > self.engine.max_fee_bps {
            bail!(
                "engine.default_fee_bps {} exceeds engine.max_fee_bps {}",
                self.engine.default_fee_bps,
                self.engine.max_fee_bps
            );
        }
        if self.engine.program_id.is_zero() {
            bail!("engine.program_id must not be zero");
        }
        if self.lp_token.symbol.is_empty() {
            bail!("lp_token.symbol must not be empty");
        }
        Ok(())
    }

    /// Build the engine's global config from these settings
    pub fn global_config(&self) -> Result<GlobalConfig> {
        let authority = self
            .engine
            .authority
            .context("engine.authority must be set")?;
        if authority.is_zero() {
            bail!("engine.authority must not be zero");
        }

        let config = GlobalConfig::new(
            self.engine.program_id,
            authority,
            self.engine.default_fee_bps,
        )?
        .with_max_fee_bps(self.engine.max_fee_bps)?
        .with_lp_metadata(MintMetadata::from(&self.lp_token));
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const AUTHORITY: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    #[test]
    fn test_load_base_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lpool.toml");

        let content = format!(
            r#"
[engine]
authority = "{}"
default_fee_bps = 30

[lp_token]
symbol = "CLP"

[logging]
level = "debug"
"#,
            AUTHORITY
        );
        fs::write(&path, content).unwrap();

        let settings = AmmSettings::load_with_prefix(Some(&path), None, "LPOOL_TEST_BASE").unwrap();
        assert_eq!(settings.engine.default_fee_bps, 30);
        assert_eq!(settings.engine.max_fee_bps, 10_000);
        assert_eq!(settings.lp_token.symbol, "CLP");
        assert_eq!(settings.lp_token.name, "Liquidity Tokens");
        assert_eq!(settings.logging.level, "debug");

        let config = settings.global_config().unwrap();
        assert_eq!(config.default_fee_bps, 30);
        assert_eq!(config.authority, AUTHORITY.parse::<Address>().unwrap());
        assert_eq!(config.lp_metadata.symbol, "CLP");
    }

    #[test]
    fn test_environment_file_overrides_base() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lpool.toml");
        fs::write(&path, "[engine]\ndefault_fee_bps = 30\n").unwrap();
        fs::create_dir(dir.path().join("environments")).unwrap();
        fs::write(
            dir.path().join("environments").join("staging.toml"),
            "[engine]\ndefault_fee_bps = 50\n",
        )
        .unwrap();

        let settings =
            AmmSettings::load_with_prefix(Some(&path), Some("staging"), "LPOOL_TEST_STAGING")
                .unwrap();
        assert_eq!(settings.engine.default_fee_bps, 50);
    }

    #[test]
    fn test_env_var_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lpool.toml");
        fs::write(&path, "[engine]\ndefault_fee_bps = 30\n").unwrap();

        std::env::set_var("LPOOL_TEST_ENV_ENGINE__MAX_FEE_BPS", "500");
        let settings =
            AmmSettings::load_with_prefix(Some(&path), None, "LPOOL_TEST_ENV").unwrap();
        std::env::remove_var("LPOOL_TEST_ENV_ENGINE__MAX_FEE_BPS");

        assert_eq!(settings.engine.max_fee_bps, 500);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let settings = AmmSettings::load_with_prefix(
            Some(&dir.path().join("absent.toml")),
            None,
            "LPOOL_TEST_DEFAULTS",
        )
        .unwrap();
        assert_eq!(settings, AmmSettings::default());
        assert_eq!(settings.engine.default_fee_bps, 300);
        // No authority configured
        assert!(settings.global_config().is_err());
    }

    #[test]
    fn test_invalid_fee_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lpool.toml");
        fs::write(&path, "[engine]\ndefault_fee_bps = 600\nmax_fee_bps = 500\n").unwrap();
        assert!(AmmSettings::load_with_prefix(Some(&path), None, "LPOOL_TEST_INVALID").is_err());
    }
}

//! Global Registry
//!
//! Holds the process-wide [`GlobalConfig`]. It is created exactly once through
//! [`GlobalRegistry::initialize`] and then passed explicitly to every engine
//! operation; there is no ambient global.

use crate::address::{config_address, Address};
use crate::error::{AmmError, AmmResult};
use crate::token::MintMetadata;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 100% expressed in basis points
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Fee policy and authority shared by every pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub program_id: Address,
    /// Address of the config record itself
    pub address: Address,
    /// Signer that created the config
    pub authority: Address,
    pub default_fee_bps: u16,
    pub max_fee_bps: u16,
    pub lp_metadata: MintMetadata,
}

impl GlobalConfig {
    pub fn new(program_id: Address, authority: Address, default_fee_bps: u16) -> AmmResult<Self> {
        let config = Self {
            program_id,
            address: config_address(&program_id),
            authority,
            default_fee_bps,
            max_fee_bps: BPS_DENOMINATOR,
            lp_metadata: MintMetadata::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Fee given as a whole percentage, e.g. `3` for 3%
    pub fn from_percent(program_id: Address, authority: Address, fee_percent: u8) -> AmmResult<Self> {
        Self::new(program_id, authority, u16::from(fee_percent) * 100)
    }

    pub fn with_max_fee_bps(mut self, max_fee_bps: u16) -> AmmResult<Self> {
        self.max_fee_bps = max_fee_bps;
        self.validate()?;
        Ok(self)
    }

    pub fn with_lp_metadata(mut self, metadata: MintMetadata) -> Self {
        self.lp_metadata = metadata;
        self
    }

    fn validate(&self) -> AmmResult<()> {
        if self.max_fee_bps > BPS_DENOMINATOR {
            return Err(AmmError::InvalidFee {
                fee_bps: self.max_fee_bps,
                max_bps: BPS_DENOMINATOR,
            });
        }
        self.check_fee(self.default_fee_bps)
    }

    pub fn check_fee(&self, fee_bps: u16) -> AmmResult<()> {
        if fee_bps > self.max_fee_bps {
            return Err(AmmError::InvalidFee {
                fee_bps,
                max_bps: self.max_fee_bps,
            });
        }
        Ok(())
    }

    /// Fee for a new pool: the override if given, otherwise the default
    pub fn resolve_fee(&self, requested: Option<u16>) -> AmmResult<u16> {
        let fee_bps = requested.unwrap_or(self.default_fee_bps);
        self.check_fee(fee_bps)?;
        Ok(fee_bps)
    }
}

/// One-time initialization guard around [`GlobalConfig`]
#[derive(Debug, Default)]
pub struct GlobalRegistry {
    config: OnceCell<GlobalConfig>,
}

impl GlobalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(
        &self,
        program_id: Address,
        authority: Address,
        default_fee_bps: u16,
    ) -> AmmResult<&GlobalConfig> {
        self.install(GlobalConfig::new(program_id, authority, default_fee_bps)?)
    }

    /// Install a fully built config; fails if one is already present
    pub fn install(&self, config: GlobalConfig) -> AmmResult<&GlobalConfig> {
        match self.config.try_insert(config) {
            Ok(installed) => {
                info!(
                    config = %installed.address,
                    authority = %installed.authority,
                    default_fee_bps = installed.default_fee_bps,
                    "Global config initialized"
                );
                Ok(installed)
            }
            Err((existing, _rejected)) => {
                warn!(config = %existing.address, "Global config already initialized");
                Err(AmmError::AlreadyInitialized)
            }
        }
    }

    pub fn get(&self) -> AmmResult<&GlobalConfig> {
        self.config.get().ok_or(AmmError::NotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.config.get().is_some()
    }
}

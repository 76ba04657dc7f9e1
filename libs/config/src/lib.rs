//! # Lpool Configuration
//!
//! Settings for embedding the liquidity engine: program namespace, fee policy,
//! config authority, LP token metadata and logging.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lpool_config::{init_logging, AmmSettings};
//! use amm::GlobalRegistry;
//!
//! let settings = AmmSettings::load(None, Some("production"))?;
//! init_logging(&settings.logging)?;
//!
//! let registry = GlobalRegistry::new();
//! registry.install(settings.global_config()?)?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Values come from `config/lpool.toml`, then `config/environments/<env>.toml`,
//! then `LPOOL_`-prefixed environment variables (`LPOOL_ENGINE__DEFAULT_FEE_BPS=25`).

pub mod defaults;
pub mod logging;
pub mod settings;

pub use logging::init_logging;
pub use settings::{AmmSettings, EngineSettings, LoggingSettings, LpTokenSettings};

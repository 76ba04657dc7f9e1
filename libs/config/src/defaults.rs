//! Default configuration values
//!
//! Used when a setting is absent from every configuration source.

/// Engine defaults
pub mod engine {
    /// Namespace for derived addresses, hex encoded
    pub const PROGRAM_ID: &str =
        "0x68ebc5e31b3d2a1a0c8bd5b6c3e2a8f55d4e0e9b7c2f6a1d3e5b7a9c0d2e4f61";

    /// Trading fee applied to new pools (3%)
    pub const DEFAULT_FEE_BPS: u16 = 300;

    /// Upper bound for any pool fee (100%)
    pub const MAX_FEE_BPS: u16 = 10_000;
}

/// LP share mint metadata
pub mod lp_token {
    pub const NAME: &str = "Liquidity Tokens";
    pub const SYMBOL: &str = "LP";
    pub const DECIMALS: u8 = 9;
}

/// Configuration sources
pub mod sources {
    /// Base settings file
    pub const BASE_FILE: &str = "config/lpool.toml";

    /// Directory holding `<environment>.toml` overrides
    pub const ENVIRONMENTS_DIR: &str = "config/environments";

    /// Prefix for environment variable overrides
    pub const ENV_PREFIX: &str = "LPOOL";
}

/// Logging defaults
pub mod logging {
    pub const LEVEL: &str = "info";
}

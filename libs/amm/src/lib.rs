//! # Lpool AMM - Constant-Product Liquidity Pool Engine
//!
//! ## Purpose
//!
//! Pool lifecycle and liquidity accounting for a constant-product automated market
//! maker. Any two token holders can create the single canonical pool for a token
//! pair, deposit into it, and receive LP shares proportional to their contribution.
//! All arithmetic is checked unsigned integer math that rounds in the pool's favor.
//!
//! ## Integration Points
//!
//! - **Input Sources**: `CreatePoolRequest` / `AddLiquidityRequest` from callers
//! - **Token Movements**: Debits, credits and LP mints via the [`TokenLedger`] trait
//! - **Configuration**: An explicitly passed [`GlobalConfig`], initialized once
//!   through [`GlobalRegistry`]
//! - **Addressing**: Pure, stateless derivation of pool, LP mint and vault addresses
//!
//! ## Architecture Role
//!
//! ```text
//! Caller Request → [Canonicalize Pair] → [Address Deriver] → [Reserve Ledger]
//!       ↓                  ↓                    ↓                   ↓
//! mint_x, mint_y     mint_a < mint_b      pool / lp_mint      per-pool lock
//! amounts            amounts swapped      vault_a / vault_b   atomic commit
//!                                                                   ↓
//!                          [Liquidity Engine] ← plan_deposit ← reserves, supply
//!                                 ↓
//!                   TokenLedger: owner → vaults, mint LP shares
//! ```
//!
//! ## Concurrency
//!
//! Pools live in a sharded map, each behind its own lock. Deposits into one pool
//! are totally ordered; deposits into different pools run in parallel. Exactly one
//! of several racing `create_pool` calls for a pair succeeds; the others observe
//! `AlreadyExists` and may retry as `add_liquidity`.

pub mod address;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod math;
pub mod registry;
pub mod token;

pub use address::{Address, MintPair, PoolAddresses, Side};
pub use engine::{AddLiquidityRequest, CreatePoolRequest, LiquidityAdded, LiquidityEngine, PoolCreated};
pub use error::{AmmError, AmmResult, ErrorKind};
pub use ledger::{LedgerStats, PoolSnapshot, ReserveLedger};
pub use registry::{GlobalConfig, GlobalRegistry, BPS_DENOMINATOR};
pub use token::{InMemoryTokenLedger, MintMetadata, TokenLedger};

/// Common types for price reporting
pub use rust_decimal::Decimal;

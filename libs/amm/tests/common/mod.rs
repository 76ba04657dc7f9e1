//! Common Test Utilities for the liquidity engine
//!
//! Fixtures for addresses, funded owners and pre-seeded pools.

#![allow(dead_code)]

use lpool_amm::{
    Address, AddLiquidityRequest, CreatePoolRequest, GlobalConfig, GlobalRegistry,
    InMemoryTokenLedger, LiquidityEngine, PoolCreated, TokenLedger,
};
use std::sync::Arc;

pub const PROGRAM_ID: Address = Address::new([0xee; 32]);
pub const AUTHORITY: Address = Address::new([0xaa; 32]);

/// Mint ids with a known order: `MINT_LOW < MINT_HIGH`
pub const MINT_LOW: Address = Address::new([0x11; 32]);
pub const MINT_HIGH: Address = Address::new([0x22; 32]);

pub fn addr(byte: u8) -> Address {
    Address::new([byte; 32])
}

/// Install tracing output for a test run; repeated calls are ignored
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("lpool_amm=debug")
        .with_test_writer()
        .try_init();
}

pub struct Harness {
    pub registry: GlobalRegistry,
    pub engine: LiquidityEngine<InMemoryTokenLedger>,
}

impl Harness {
    /// Fresh engine with a 3% default fee, matching the bootstrap deployment
    pub fn new() -> Self {
        init_tracing();
        let registry = GlobalRegistry::new();
        registry
            .install(GlobalConfig::from_percent(PROGRAM_ID, AUTHORITY, 3).unwrap())
            .unwrap();
        let engine = LiquidityEngine::new(
            registry.get().unwrap(),
            Arc::new(InMemoryTokenLedger::new()),
        );
        Self { registry, engine }
    }

    pub fn config(&self) -> &GlobalConfig {
        self.registry.get().unwrap()
    }

    pub fn tokens(&self) -> &InMemoryTokenLedger {
        self.engine.tokens()
    }

    pub fn fund(&self, owner: &Address, mint: &Address, amount: u64) {
        self.tokens().fund(owner, mint, amount).unwrap();
    }

    pub fn balance(&self, owner: &Address, mint: &Address) -> u64 {
        self.tokens().balance(owner, mint)
    }

    /// LP shares of the LOW/HIGH pool in `owner`'s LP account
    pub fn lp_balance(&self, owner: &Address) -> u64 {
        self.engine.lp_balance(owner, MINT_LOW, MINT_HIGH).unwrap()
    }

    pub fn create(
        &self,
        owner: Address,
        mint_x: Address,
        mint_y: Address,
        amount_x: u64,
        amount_y: u64,
    ) -> lpool_amm::AmmResult<PoolCreated> {
        self.engine.create_pool(
            self.config(),
            &CreatePoolRequest {
                owner,
                mint_x,
                mint_y,
                amount_x,
                amount_y,
                fee_bps: None,
            },
        )
    }

    pub fn add(
        &self,
        owner: Address,
        mint_x: Address,
        mint_y: Address,
        desired_x: u64,
        desired_y: u64,
    ) -> lpool_amm::AmmResult<lpool_amm::LiquidityAdded> {
        self.engine.add_liquidity(
            self.config(),
            &AddLiquidityRequest {
                owner,
                mint_x,
                mint_y,
                desired_x,
                desired_y,
            },
        )
    }

    /// Fund `owner` and create the LOW/HIGH pool with the given reserves
    pub fn seeded_pool(&self, owner: Address, reserve_low: u64, reserve_high: u64) -> PoolCreated {
        self.fund(&owner, &MINT_LOW, reserve_low);
        self.fund(&owner, &MINT_HIGH, reserve_high);
        self.create(owner, MINT_LOW, MINT_HIGH, reserve_low, reserve_high)
            .unwrap()
    }
}

//! Liquidity Engine
//!
//! Caller-facing pool operations. Every entry point canonicalizes the mint
//! pair itself, so callers may pass mints in either order. Each operation runs
//! under the target pool's write lock and is all-or-nothing: token movements
//! are journaled and reversed if a later step fails, and the pool record is
//! only overwritten once every fallible step has succeeded.

use crate::address::{associated_account, Address, MintPair, PoolAddresses};
use crate::error::{AmmError, AmmResult};
use crate::ledger::{PoolRecord, PoolSnapshot, ReserveLedger};
use crate::math;
use crate::registry::GlobalConfig;
use crate::token::TokenLedger;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePoolRequest {
    pub owner: Address,
    pub mint_x: Address,
    pub mint_y: Address,
    pub amount_x: u64,
    pub amount_y: u64,
    /// Overrides the config's default fee
    pub fee_bps: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLiquidityRequest {
    pub owner: Address,
    pub mint_x: Address,
    pub mint_y: Address,
    /// Most the caller will deposit of `mint_x`
    pub desired_x: u64,
    /// Most the caller will deposit of `mint_y`
    pub desired_y: u64,
}

/// Result of a first deposit; amounts are in canonical (A, B) order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCreated {
    pub pair: MintPair,
    pub addresses: PoolAddresses,
    pub amount_a: u64,
    pub amount_b: u64,
    pub lp_minted: u64,
    pub fee_bps: u16,
    /// The request listed `mint_b` first
    pub swapped: bool,
}

/// Result of a proportional deposit; amounts are in canonical (A, B) order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityAdded {
    pub pair: MintPair,
    pub pool: Address,
    pub amount_a: u64,
    pub amount_b: u64,
    pub lp_minted: u64,
    pub lp_supply_after: u64,
    pub swapped: bool,
}

impl LiquidityAdded {
    /// Deposited amounts in the order the request named the mints
    pub fn request_amounts(&self) -> (u64, u64) {
        if self.swapped {
            (self.amount_b, self.amount_a)
        } else {
            (self.amount_a, self.amount_b)
        }
    }
}

/// Token transfers applied so far in one operation, newest last
struct TransferJournal<'a, T: TokenLedger + ?Sized> {
    tokens: &'a T,
    applied: Vec<(Address, Address, Address, u64)>,
}

impl<'a, T: TokenLedger + ?Sized> TransferJournal<'a, T> {
    fn new(tokens: &'a T) -> Self {
        Self {
            tokens,
            applied: Vec::with_capacity(2),
        }
    }

    fn transfer(&mut self, from: Address, to: Address, token: Address, amount: u64) -> AmmResult<()> {
        self.tokens.transfer(&from, &to, &token, amount)?;
        self.applied.push((from, to, token, amount));
        Ok(())
    }

    fn rollback(self) {
        for (from, to, token, amount) in self.applied.into_iter().rev() {
            if let Err(e) = self.tokens.transfer(&to, &from, &token, amount) {
                error!(
                    from = %to,
                    to = %from,
                    token = %token,
                    amount,
                    error = %e,
                    "Failed to reverse transfer during rollback"
                );
            }
        }
    }
}

/// Pool creation and liquidity provision over a [`ReserveLedger`]
pub struct LiquidityEngine<T: TokenLedger> {
    ledger: ReserveLedger,
    tokens: Arc<T>,
}

impl<T: TokenLedger> LiquidityEngine<T> {
    pub fn new(config: &GlobalConfig, tokens: Arc<T>) -> Self {
        Self {
            ledger: ReserveLedger::new(config.program_id),
            tokens,
        }
    }

    pub fn ledger(&self) -> &ReserveLedger {
        &self.ledger
    }

    pub fn tokens(&self) -> &Arc<T> {
        &self.tokens
    }

    /// Canonical addresses for a pair, whether or not the pool exists
    pub fn addresses(&self, mint_x: Address, mint_y: Address) -> AmmResult<PoolAddresses> {
        PoolAddresses::for_mints(self.ledger.program_id(), mint_x, mint_y)
    }

    pub fn pool(&self, mint_x: Address, mint_y: Address) -> AmmResult<PoolSnapshot> {
        self.ledger.snapshot(&MintPair::new(mint_x, mint_y)?)
    }

    /// LP shares of the pool for `(mint_x, mint_y)` held in `owner`'s LP account
    pub fn lp_balance(&self, owner: &Address, mint_x: Address, mint_y: Address) -> AmmResult<u64> {
        let addresses = self.addresses(mint_x, mint_y)?;
        let account = associated_account(owner, &addresses.lp_mint);
        Ok(self.tokens.balance(&account, &addresses.lp_mint))
    }

    /// Token account where `owner` receives the pool's LP shares
    pub fn lp_account(&self, owner: &Address, mint_x: Address, mint_y: Address) -> AmmResult<Address> {
        let addresses = self.addresses(mint_x, mint_y)?;
        Ok(associated_account(owner, &addresses.lp_mint))
    }

    fn check_config(&self, config: &GlobalConfig) -> AmmResult<()> {
        if config.program_id != *self.ledger.program_id() {
            return Err(AmmError::Unauthorized {
                signer: config.address,
                target: *self.ledger.program_id(),
            });
        }
        Ok(())
    }

    fn require_balance(&self, owner: &Address, token: &Address, required: u64) -> AmmResult<()> {
        let available = self.tokens.balance(owner, token);
        if available < required {
            return Err(AmmError::InsufficientBalance {
                token: *token,
                required,
                available,
            });
        }
        Ok(())
    }

    /// First deposit into a new pool; mints `isqrt(amount_a * amount_b)` shares
    pub fn create_pool(
        &self,
        config: &GlobalConfig,
        request: &CreatePoolRequest,
    ) -> AmmResult<PoolCreated> {
        self.check_config(config)?;
        let canonical = MintPair::canonicalize(
            request.mint_x,
            request.mint_y,
            request.amount_x,
            request.amount_y,
        )?;
        let (pair, amount_a, amount_b) = (canonical.pair, canonical.a, canonical.b);
        if amount_a == 0 || amount_b == 0 {
            return Err(AmmError::ZeroAmount);
        }
        let fee_bps = config.resolve_fee(request.fee_bps)?;
        let lp_minted = math::initial_shares(amount_a, amount_b)?;
        self.require_balance(&request.owner, &pair.mint_a(), amount_a)?;
        self.require_balance(&request.owner, &pair.mint_b(), amount_b)?;

        let mut guard = self.ledger.create(pair, fee_bps)?;
        let addresses = *guard.addresses();

        let mut next = (*guard).clone();
        let funded = next
            .apply_deposit(amount_a, amount_b, lp_minted)
            .and_then(|()| {
                let mut journal = TransferJournal::new(self.tokens.as_ref());
                match self.move_deposit(
                    &mut journal,
                    config,
                    &request.owner,
                    &next,
                    amount_a,
                    amount_b,
                    lp_minted,
                    true,
                ) {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        journal.rollback();
                        Err(e)
                    }
                }
            });

        if let Err(e) = funded {
            warn!(pool = %addresses.pool, pair = %pair, error = %e, "Pool creation rolled back");
            self.ledger.discard(guard);
            return Err(e);
        }

        *guard = next;
        drop(guard);

        info!(
            pool = %addresses.pool,
            pair = %pair,
            amount_a,
            amount_b,
            lp_minted,
            fee_bps,
            "Pool created"
        );

        Ok(PoolCreated {
            pair,
            addresses,
            amount_a,
            amount_b,
            lp_minted,
            fee_bps,
            swapped: canonical.swapped,
        })
    }

    /// Proportional deposit into a live pool.
    ///
    /// One side is taken in full and the other trimmed to the current ratio,
    /// never exceeding what the caller offered for it.
    pub fn add_liquidity(
        &self,
        config: &GlobalConfig,
        request: &AddLiquidityRequest,
    ) -> AmmResult<LiquidityAdded> {
        self.check_config(config)?;
        let canonical = MintPair::canonicalize(
            request.mint_x,
            request.mint_y,
            request.desired_x,
            request.desired_y,
        )?;
        let pair = canonical.pair;
        if canonical.a == 0 || canonical.b == 0 {
            return Err(AmmError::ZeroAmount);
        }

        let handle = self.ledger.load(&pair)?;
        let mut record = handle.write();
        if !record.is_live() {
            return Err(AmmError::NotFound(record.addresses().pool));
        }

        let (reserve_a, reserve_b) = record.reserves();
        let plan = math::plan_deposit(
            reserve_a,
            reserve_b,
            record.lp_supply(),
            canonical.a,
            canonical.b,
        )
        .inspect_err(|e| {
            debug!(pair = %pair, error = %e, "Deposit rejected");
        })?;
        self.require_balance(&request.owner, &pair.mint_a(), plan.amount_a)?;
        self.require_balance(&request.owner, &pair.mint_b(), plan.amount_b)?;

        let mut next = record.clone();
        next.apply_deposit(plan.amount_a, plan.amount_b, plan.shares)?;

        let mut journal = TransferJournal::new(self.tokens.as_ref());
        if let Err(e) = self.move_deposit(
            &mut journal,
            config,
            &request.owner,
            &next,
            plan.amount_a,
            plan.amount_b,
            plan.shares,
            false,
        ) {
            journal.rollback();
            warn!(pool = %next.addresses().pool, error = %e, "Deposit rolled back");
            return Err(e);
        }

        *record = next;
        let pool = record.addresses().pool;
        let lp_supply_after = record.lp_supply();
        drop(record);
        self.ledger.note_deposit();

        info!(
            pool = %pool,
            amount_a = plan.amount_a,
            amount_b = plan.amount_b,
            lp_minted = plan.shares,
            lp_supply_after,
            "Liquidity added"
        );

        Ok(LiquidityAdded {
            pair,
            pool,
            amount_a: plan.amount_a,
            amount_b: plan.amount_b,
            lp_minted: plan.shares,
            lp_supply_after,
            swapped: canonical.swapped,
        })
    }

    /// Amount of `mint_y` matching `amount_x` of `mint_x` at the current price
    pub fn quote(&self, mint_x: Address, mint_y: Address, amount_x: u64) -> AmmResult<u64> {
        let canonical = MintPair::canonicalize(mint_x, mint_y, (), ())?;
        let snapshot = self.ledger.snapshot(&canonical.pair)?;
        let (reserve_in, reserve_out) = canonical.restore(snapshot.reserve_a, snapshot.reserve_b);
        let amount_out = math::quote(amount_x, reserve_in, reserve_out)?;
        debug!(
            pool = %snapshot.addresses.pool,
            amount_in = amount_x,
            amount_out,
            "Quoted deposit counterpart"
        );
        Ok(amount_out)
    }

    /// Check that vault balances equal reserves and LP mint supply equals
    /// `lp_supply`. Holds the pool lock so no deposit lands mid-check.
    pub fn verify_pool(&self, mint_x: Address, mint_y: Address) -> AmmResult<PoolSnapshot> {
        let pair = MintPair::new(mint_x, mint_y)?;
        let handle = self.ledger.load(&pair)?;
        let record = handle.read();
        let addresses = record.addresses();
        let (reserve_a, reserve_b) = record.reserves();

        let vault_a = self.tokens.balance(&addresses.vault_a, &pair.mint_a());
        let vault_b = self.tokens.balance(&addresses.vault_b, &pair.mint_b());
        let lp_mint_supply = self.tokens.supply(&addresses.lp_mint);

        if vault_a != reserve_a || vault_b != reserve_b || lp_mint_supply != record.lp_supply() {
            let reason = format!(
                "vaults {}/{} vs reserves {}/{}, lp mint supply {} vs {}",
                vault_a,
                vault_b,
                reserve_a,
                reserve_b,
                lp_mint_supply,
                record.lp_supply()
            );
            error!(pool = %addresses.pool, %reason, "Pool accounting mismatch");
            return Err(AmmError::InvariantViolation { reason });
        }
        Ok(record.snapshot())
    }

    /// Debit the owner into both vaults, then mint shares to the owner's LP account
    #[allow(clippy::too_many_arguments)]
    fn move_deposit(
        &self,
        journal: &mut TransferJournal<'_, T>,
        config: &GlobalConfig,
        owner: &Address,
        record: &PoolRecord,
        amount_a: u64,
        amount_b: u64,
        shares: u64,
        register_mint: bool,
    ) -> AmmResult<()> {
        let pair = record.pair();
        let addresses = record.addresses();

        journal.transfer(*owner, addresses.vault_a, pair.mint_a(), amount_a)?;
        journal.transfer(*owner, addresses.vault_b, pair.mint_b(), amount_b)?;

        if register_mint {
            self.tokens.register_mint(
                addresses.lp_mint,
                addresses.pool,
                config.lp_metadata.clone(),
            )?;
        }
        // The pool record is the mint authority; minting is the last fallible step
        let lp_account = associated_account(owner, &addresses.lp_mint);
        self.tokens
            .mint_to(&addresses.lp_mint, &addresses.pool, &lp_account, shares)
    }
}

//! Token ledger boundary
//!
//! The engine never owns user balances; it moves tokens through a
//! [`TokenLedger`] supplied by the embedder. [`InMemoryTokenLedger`] is a
//! complete implementation over sharded maps, used by tests and by callers
//! that keep balances in-process.

use crate::address::Address;
use crate::error::{AmmError, AmmResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Descriptive data attached to an LP share mint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for MintMetadata {
    fn default() -> Self {
        Self {
            name: "Liquidity Tokens".to_string(),
            symbol: "LP".to_string(),
            decimals: 9,
        }
    }
}

/// Balance-keeping service the engine debits, credits and mints through
pub trait TokenLedger: Send + Sync {
    fn balance(&self, owner: &Address, token: &Address) -> u64;

    /// Outstanding supply of a mint registered with [`TokenLedger::register_mint`]
    fn supply(&self, mint: &Address) -> u64;

    /// Remove `amount` from `owner`; fails without side effects if short
    fn debit(&self, owner: &Address, token: &Address, amount: u64) -> AmmResult<()>;

    fn credit(&self, account: &Address, token: &Address, amount: u64) -> AmmResult<()>;

    /// Create `mint` controlled by `authority`. Re-registering with the same
    /// authority is a no-op so an interrupted creation can be retried.
    fn register_mint(
        &self,
        mint: Address,
        authority: Address,
        metadata: MintMetadata,
    ) -> AmmResult<()>;

    /// Issue new units of `mint`; only its registered authority may do so
    fn mint_to(
        &self,
        mint: &Address,
        authority: &Address,
        recipient: &Address,
        amount: u64,
    ) -> AmmResult<()>;

    /// Move `amount` between two accounts, leaving both untouched on failure
    fn transfer(&self, from: &Address, to: &Address, token: &Address, amount: u64) -> AmmResult<()> {
        self.debit(from, token, amount)?;
        if let Err(e) = self.credit(to, token, amount) {
            // Undo the debit; the amount was just removed so it fits again
            self.credit(from, token, amount)?;
            return Err(e);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MintInfo {
    authority: Address,
    supply: u64,
    metadata: MintMetadata,
}

/// In-process [`TokenLedger`] keyed by `(account, token)`
#[derive(Debug, Default)]
pub struct InMemoryTokenLedger {
    balances: DashMap<(Address, Address), u64>,
    mints: DashMap<Address, MintInfo>,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account with tokens from outside the system
    pub fn fund(&self, owner: &Address, token: &Address, amount: u64) -> AmmResult<()> {
        self.credit(owner, token, amount)
    }

    pub fn metadata(&self, mint: &Address) -> Option<MintMetadata> {
        self.mints.get(mint).map(|info| info.metadata.clone())
    }

    pub fn mint_authority(&self, mint: &Address) -> Option<Address> {
        self.mints.get(mint).map(|info| info.authority)
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn balance(&self, owner: &Address, token: &Address) -> u64 {
        self.balances
            .get(&(*owner, *token))
            .map(|balance| *balance)
            .unwrap_or(0)
    }

    fn supply(&self, mint: &Address) -> u64 {
        self.mints.get(mint).map(|info| info.supply).unwrap_or(0)
    }

    fn debit(&self, owner: &Address, token: &Address, amount: u64) -> AmmResult<()> {
        let insufficient = |available| AmmError::InsufficientBalance {
            token: *token,
            required: amount,
            available,
        };

        match self.balances.get_mut(&(*owner, *token)) {
            Some(mut balance) => {
                let available = *balance;
                *balance = available
                    .checked_sub(amount)
                    .ok_or_else(|| insufficient(available))?;
                Ok(())
            }
            None if amount == 0 => Ok(()),
            None => Err(insufficient(0)),
        }
    }

    fn credit(&self, account: &Address, token: &Address, amount: u64) -> AmmResult<()> {
        let mut balance = self.balances.entry((*account, *token)).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| AmmError::overflow("token credit"))?;
        Ok(())
    }

    fn register_mint(
        &self,
        mint: Address,
        authority: Address,
        metadata: MintMetadata,
    ) -> AmmResult<()> {
        match self.mints.entry(mint) {
            Entry::Occupied(existing) => {
                if existing.get().authority != authority {
                    warn!(mint = %mint, "Rejected mint re-registration by foreign authority");
                    return Err(AmmError::Unauthorized {
                        signer: authority,
                        target: mint,
                    });
                }
                Ok(())
            }
            Entry::Vacant(slot) => {
                debug!(mint = %mint, symbol = %metadata.symbol, "Registered mint");
                slot.insert(MintInfo {
                    authority,
                    supply: 0,
                    metadata,
                });
                Ok(())
            }
        }
    }

    fn mint_to(
        &self,
        mint: &Address,
        authority: &Address,
        recipient: &Address,
        amount: u64,
    ) -> AmmResult<()> {
        let mut info = self.mints.get_mut(mint).ok_or(AmmError::Unauthorized {
            signer: *authority,
            target: *mint,
        })?;
        if info.authority != *authority {
            return Err(AmmError::Unauthorized {
                signer: *authority,
                target: *mint,
            });
        }

        let new_supply = info
            .supply
            .checked_add(amount)
            .ok_or_else(|| AmmError::overflow("mint supply"))?;
        // Credit before committing supply so a failed credit leaves both unchanged
        self.credit(recipient, mint, amount)?;
        info.supply = new_supply;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 32])
    }

    #[test]
    fn test_debit_requires_balance() {
        let ledger = InMemoryTokenLedger::new();
        let (alice, token) = (addr(1), addr(2));
        ledger.fund(&alice, &token, 50).unwrap();

        let err = ledger.debit(&alice, &token, 51).unwrap_err();
        assert_eq!(
            err,
            AmmError::InsufficientBalance {
                token,
                required: 51,
                available: 50
            }
        );
        assert_eq!(ledger.balance(&alice, &token), 50);

        ledger.debit(&alice, &token, 50).unwrap();
        assert_eq!(ledger.balance(&alice, &token), 0);
    }

    #[test]
    fn test_transfer_moves_balance() {
        let ledger = InMemoryTokenLedger::new();
        let (alice, bob, token) = (addr(1), addr(3), addr(2));
        ledger.fund(&alice, &token, 10).unwrap();
        ledger.transfer(&alice, &bob, &token, 4).unwrap();
        assert_eq!(ledger.balance(&alice, &token), 6);
        assert_eq!(ledger.balance(&bob, &token), 4);
    }

    #[test]
    fn test_transfer_rolls_back_on_credit_overflow() {
        let ledger = InMemoryTokenLedger::new();
        let (alice, bob, token) = (addr(1), addr(3), addr(2));
        ledger.fund(&alice, &token, 10).unwrap();
        ledger.fund(&bob, &token, u64::MAX).unwrap();

        assert!(ledger.transfer(&alice, &bob, &token, 1).is_err());
        assert_eq!(ledger.balance(&alice, &token), 10);
        assert_eq!(ledger.balance(&bob, &token), u64::MAX);
    }

    #[test]
    fn test_only_authority_mints() {
        let ledger = InMemoryTokenLedger::new();
        let (mint, pool, mallory, alice) = (addr(10), addr(11), addr(12), addr(1));
        ledger
            .register_mint(mint, pool, MintMetadata::default())
            .unwrap();

        assert!(matches!(
            ledger.mint_to(&mint, &mallory, &alice, 5),
            Err(AmmError::Unauthorized { .. })
        ));
        ledger.mint_to(&mint, &pool, &alice, 5).unwrap();
        assert_eq!(ledger.supply(&mint), 5);
        assert_eq!(ledger.balance(&alice, &mint), 5);

        // Same authority may re-register; a different one may not
        ledger
            .register_mint(mint, pool, MintMetadata::default())
            .unwrap();
        assert!(ledger
            .register_mint(mint, mallory, MintMetadata::default())
            .is_err());
        assert_eq!(ledger.metadata(&mint).unwrap().symbol, "LP");
    }
}

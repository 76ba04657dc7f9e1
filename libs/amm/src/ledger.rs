//! Reserve Ledger
//!
//! Durable per-pool records keyed by canonical [`MintPair`]. Each record sits
//! behind its own lock inside a sharded map, so deposits into one pool are
//! serialized while unrelated pools proceed in parallel. The map's shard lock
//! is never held while waiting on a record lock.

use crate::address::{Address, MintPair, PoolAddresses};
use crate::error::{AmmError, AmmResult};
use crate::math;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::lock_api::ArcRwLockWriteGuard;
use parking_lot::{RawRwLock, RwLock};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared handle to one pool record
pub type PoolHandle = Arc<RwLock<PoolRecord>>;

/// Exclusive lock on a record, owned independently of the ledger borrow
pub type PoolWriteGuard = ArcRwLockWriteGuard<RawRwLock, PoolRecord>;

/// State of a single pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolRecord {
    pair: MintPair,
    addresses: PoolAddresses,
    fee_bps: u16,
    reserve_a: u64,
    reserve_b: u64,
    lp_supply: u64,
}

impl PoolRecord {
    fn new(pair: MintPair, addresses: PoolAddresses, fee_bps: u16) -> Self {
        Self {
            pair,
            addresses,
            fee_bps,
            reserve_a: 0,
            reserve_b: 0,
            lp_supply: 0,
        }
    }

    pub fn pair(&self) -> &MintPair {
        &self.pair
    }

    pub fn addresses(&self) -> &PoolAddresses {
        &self.addresses
    }

    pub fn fee_bps(&self) -> u16 {
        self.fee_bps
    }

    pub fn reserves(&self) -> (u64, u64) {
        (self.reserve_a, self.reserve_b)
    }

    pub fn lp_supply(&self) -> u64 {
        self.lp_supply
    }

    /// Holds liquidity and outstanding shares
    pub fn is_live(&self) -> bool {
        self.lp_supply > 0
    }

    /// Add a deposit to reserves and supply. Nothing is written unless all
    /// three sums fit and the result keeps the liquidity invariant.
    pub fn apply_deposit(&mut self, amount_a: u64, amount_b: u64, minted_shares: u64) -> AmmResult<()> {
        let reserve_a = self
            .reserve_a
            .checked_add(amount_a)
            .ok_or_else(|| AmmError::overflow("reserve_a"))?;
        let reserve_b = self
            .reserve_b
            .checked_add(amount_b)
            .ok_or_else(|| AmmError::overflow("reserve_b"))?;
        let lp_supply = self
            .lp_supply
            .checked_add(minted_shares)
            .ok_or_else(|| AmmError::overflow("lp_supply"))?;

        check_liquidity_invariant(reserve_a, reserve_b, lp_supply)?;

        self.reserve_a = reserve_a;
        self.reserve_b = reserve_b;
        self.lp_supply = lp_supply;
        Ok(())
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            pair: self.pair,
            addresses: self.addresses,
            fee_bps: self.fee_bps,
            reserve_a: self.reserve_a,
            reserve_b: self.reserve_b,
            lp_supply: self.lp_supply,
        }
    }
}

/// `reserve_a > 0 && reserve_b > 0` exactly when `lp_supply > 0`
fn check_liquidity_invariant(reserve_a: u64, reserve_b: u64, lp_supply: u64) -> AmmResult<()> {
    let funded = reserve_a > 0 && reserve_b > 0;
    let empty = reserve_a == 0 && reserve_b == 0;
    if (lp_supply > 0 && funded) || (lp_supply == 0 && empty) {
        return Ok(());
    }
    Err(AmmError::InvariantViolation {
        reason: format!(
            "reserves {}/{} with lp supply {}",
            reserve_a, reserve_b, lp_supply
        ),
    })
}

/// Point-in-time copy of a pool record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub pair: MintPair,
    pub addresses: PoolAddresses,
    pub fee_bps: u16,
    pub reserve_a: u64,
    pub reserve_b: u64,
    pub lp_supply: u64,
}

impl PoolSnapshot {
    /// Token B per token A
    pub fn spot_price(&self) -> Option<Decimal> {
        math::spot_price(self.reserve_a, self.reserve_b)
    }

    /// `reserve_a * reserve_b`
    pub fn k(&self) -> u128 {
        self.reserve_a as u128 * self.reserve_b as u128
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    pub pools_created: u64,
    pub creations_rolled_back: u64,
    pub deposits: u64,
}

/// Arena of pool records indexed by canonical pair
pub struct ReserveLedger {
    program_id: Address,
    pools: DashMap<MintPair, PoolHandle>,
    stats: RwLock<LedgerStats>,
}

impl ReserveLedger {
    pub fn new(program_id: Address) -> Self {
        Self {
            program_id,
            pools: DashMap::new(),
            stats: RwLock::new(LedgerStats::default()),
        }
    }

    pub fn program_id(&self) -> &Address {
        &self.program_id
    }

    pub fn addresses(&self, pair: &MintPair) -> PoolAddresses {
        PoolAddresses::derive(&self.program_id, pair)
    }

    /// Allocate a zeroed record and return it already write-locked.
    ///
    /// The lock is taken before the record becomes visible, so concurrent
    /// loaders block until the creator has funded it or discarded it.
    pub fn create(&self, pair: MintPair, fee_bps: u16) -> AmmResult<PoolWriteGuard> {
        let addresses = self.addresses(&pair);
        let record = Arc::new(RwLock::new(PoolRecord::new(pair, addresses, fee_bps)));
        let guard = record.write_arc();

        match self.pools.entry(pair) {
            Entry::Occupied(_) => {
                debug!(pool = %addresses.pool, pair = %pair, "Pool already exists");
                Err(AmmError::AlreadyExists(addresses.pool))
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                self.stats.write().pools_created += 1;
                info!(pool = %addresses.pool, pair = %pair, fee_bps, "Allocated pool record");
                Ok(guard)
            }
        }
    }

    /// Remove a record whose creation failed, then release its lock
    pub fn discard(&self, guard: PoolWriteGuard) {
        let pair = guard.pair;
        let handle = ArcRwLockWriteGuard::rwlock(&guard).clone();
        let removed = self
            .pools
            .remove_if(&pair, |_, existing| Arc::ptr_eq(existing, &handle))
            .is_some();
        drop(guard);

        if removed {
            let mut stats = self.stats.write();
            stats.pools_created = stats.pools_created.saturating_sub(1);
            stats.creations_rolled_back += 1;
            warn!(pair = %pair, "Discarded unfunded pool record");
        }
    }

    pub fn load(&self, pair: &MintPair) -> AmmResult<PoolHandle> {
        // Clone the handle so the shard lock is released before locking the record
        self.pools
            .get(pair)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AmmError::NotFound(self.addresses(pair).pool))
    }

    /// Copy of a live pool's state
    pub fn snapshot(&self, pair: &MintPair) -> AmmResult<PoolSnapshot> {
        let handle = self.load(pair)?;
        let record = handle.read();
        if !record.is_live() {
            return Err(AmmError::NotFound(record.addresses.pool));
        }
        Ok(record.snapshot())
    }

    pub fn contains(&self, pair: &MintPair) -> bool {
        self.pools.contains_key(pair)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Snapshots of every live pool, in no particular order
    pub fn pools(&self) -> Vec<PoolSnapshot> {
        let handles: Vec<PoolHandle> = self.pools.iter().map(|e| e.value().clone()).collect();
        handles
            .iter()
            .map(|handle| handle.read().snapshot())
            .filter(|snapshot| snapshot.lp_supply > 0)
            .collect()
    }

    pub(crate) fn note_deposit(&self) {
        self.stats.write().deposits += 1;
    }

    pub fn stats(&self) -> LedgerStats {
        self.stats.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(x: u8, y: u8) -> MintPair {
        MintPair::new(Address::new([x; 32]), Address::new([y; 32])).unwrap()
    }

    #[test]
    fn test_create_then_load() {
        let ledger = ReserveLedger::new(Address::new([9; 32]));
        let p = pair(1, 2);
        let mut guard = ledger.create(p, 30).unwrap();
        guard.apply_deposit(100, 400, 200).unwrap();
        drop(guard);

        let snapshot = ledger.snapshot(&p).unwrap();
        assert_eq!((snapshot.reserve_a, snapshot.reserve_b), (100, 400));
        assert_eq!(snapshot.lp_supply, 200);
        assert_eq!(snapshot.fee_bps, 30);
        assert_eq!(snapshot.k(), 40_000);
        assert_eq!(ledger.stats().pools_created, 1);
    }

    #[test]
    fn test_second_create_fails() {
        let ledger = ReserveLedger::new(Address::new([9; 32]));
        let p = pair(1, 2);
        drop(ledger.create(p, 30).unwrap());
        let err = ledger.create(p, 30).unwrap_err();
        assert_eq!(err, AmmError::AlreadyExists(ledger.addresses(&p).pool));
    }

    #[test]
    fn test_load_missing_pool() {
        let ledger = ReserveLedger::new(Address::new([9; 32]));
        assert!(matches!(ledger.load(&pair(1, 2)), Err(AmmError::NotFound(_))));
    }

    #[test]
    fn test_unfunded_record_is_not_visible_as_live() {
        let ledger = ReserveLedger::new(Address::new([9; 32]));
        let p = pair(1, 2);
        drop(ledger.create(p, 30).unwrap());
        assert!(ledger.contains(&p));
        assert!(matches!(ledger.snapshot(&p), Err(AmmError::NotFound(_))));
        assert!(ledger.pools().is_empty());
    }

    #[test]
    fn test_discard_allows_recreation() {
        let ledger = ReserveLedger::new(Address::new([9; 32]));
        let p = pair(1, 2);
        let guard = ledger.create(p, 30).unwrap();
        ledger.discard(guard);
        assert!(!ledger.contains(&p));
        assert_eq!(ledger.stats().creations_rolled_back, 1);
        assert!(ledger.create(p, 30).is_ok());
    }

    #[test]
    fn test_apply_deposit_is_all_or_nothing() {
        let ledger = ReserveLedger::new(Address::new([9; 32]));
        let mut guard = ledger.create(pair(1, 2), 30).unwrap();
        guard.apply_deposit(10, 10, 10).unwrap();

        // lp_supply overflows after both reserves would have fit
        let err = guard.apply_deposit(1, 1, u64::MAX).unwrap_err();
        assert!(matches!(err, AmmError::ArithmeticOverflow { .. }));
        assert_eq!(guard.reserves(), (10, 10));
        assert_eq!(guard.lp_supply(), 10);

        // Shares without reserves would break the liquidity invariant
        let mut empty = ledger.create(pair(3, 4), 30).unwrap();
        assert!(matches!(
            empty.apply_deposit(0, 5, 5),
            Err(AmmError::InvariantViolation { .. })
        ));
        assert!(!empty.is_live());
    }
}

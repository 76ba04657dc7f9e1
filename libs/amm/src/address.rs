//! Canonical address derivation for pools, LP mints and vaults
//!
//! Addresses are Keccak-256 digests over a namespace, length-prefixed seeds and
//! a fixed marker, so they are pure functions of their inputs. A pool is keyed
//! by its [`MintPair`], which always stores the two mints in byte-lexicographic
//! order: deriving from `(X, Y)` or `(Y, X)` yields the same addresses.

use crate::error::{AmmError, AmmResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// Seed for the pool record address
pub const POOL_SEED: &[u8] = b"pool";
/// Seed for the pool's LP share mint
pub const LP_MINT_SEED: &[u8] = b"lp_mint";
/// Seed for the global configuration record
pub const CONFIG_SEED: &[u8] = b"AMM";

const DERIVED_ADDRESS_MARKER: &[u8] = b"ProgramDerivedAddress";
const ASSOCIATED_ACCOUNT_DOMAIN: &[u8] = b"lpool.associated-account.v1";

/// 32-byte identifier for tokens, accounts, pools and mints
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short form used in log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{}..)", self.short())
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Hash `namespace || (len, seed)* || marker` into an address
pub fn derive_address(namespace: &[u8], seeds: &[&[u8]]) -> Address {
    let mut hasher = Keccak256::new();
    hasher.update(namespace);
    for seed in seeds {
        hasher.update((seed.len() as u16).to_le_bytes());
        hasher.update(seed);
    }
    hasher.update(DERIVED_ADDRESS_MARKER);

    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Address(out)
}

/// Side of a pool a mint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// Unordered token pair stored in canonical order (`mint_a < mint_b`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "OrderedMints")]
pub struct MintPair {
    mint_a: Address,
    mint_b: Address,
}

/// Wire form of [`MintPair`], checked before it becomes one
#[derive(Deserialize)]
struct OrderedMints {
    mint_a: Address,
    mint_b: Address,
}

impl TryFrom<OrderedMints> for MintPair {
    type Error = AmmError;

    fn try_from(raw: OrderedMints) -> AmmResult<Self> {
        MintPair::from_ordered(raw.mint_a, raw.mint_b)
    }
}

/// Per-side values reordered together with their mints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canonical<T> {
    pub pair: MintPair,
    pub a: T,
    pub b: T,
    /// True when the caller's first mint became `mint_b`
    pub swapped: bool,
}

impl<T> Canonical<T> {
    /// Put a canonical-order result back into the caller's order
    pub fn restore<U>(&self, a: U, b: U) -> (U, U) {
        if self.swapped {
            (b, a)
        } else {
            (a, b)
        }
    }
}

impl MintPair {
    /// Build the canonical pair from two mints in any order
    pub fn new(x: Address, y: Address) -> AmmResult<Self> {
        Ok(Self::canonicalize(x, y, (), ())?.pair)
    }

    /// Accept a pair the caller claims is already ordered
    pub fn from_ordered(mint_a: Address, mint_b: Address) -> AmmResult<Self> {
        if mint_a == mint_b {
            return Err(AmmError::IdenticalMints(mint_a));
        }
        if mint_a > mint_b {
            return Err(AmmError::InvalidMintOrder { mint_a, mint_b });
        }
        Ok(Self { mint_a, mint_b })
    }

    /// Order two mints and swap the paired values along with them.
    ///
    /// User accounts and amounts must travel with their mint; swapping the
    /// mints alone would silently pair a vault with the wrong balance.
    pub fn canonicalize<T>(x: Address, y: Address, vx: T, vy: T) -> AmmResult<Canonical<T>> {
        if x == y {
            return Err(AmmError::IdenticalMints(x));
        }
        if x < y {
            Ok(Canonical {
                pair: Self {
                    mint_a: x,
                    mint_b: y,
                },
                a: vx,
                b: vy,
                swapped: false,
            })
        } else {
            Ok(Canonical {
                pair: Self {
                    mint_a: y,
                    mint_b: x,
                },
                a: vy,
                b: vx,
                swapped: true,
            })
        }
    }

    pub fn mint_a(&self) -> Address {
        self.mint_a
    }

    pub fn mint_b(&self) -> Address {
        self.mint_b
    }

    pub fn side_of(&self, mint: &Address) -> Option<Side> {
        if *mint == self.mint_a {
            Some(Side::A)
        } else if *mint == self.mint_b {
            Some(Side::B)
        } else {
            None
        }
    }

    pub fn contains(&self, mint: &Address) -> bool {
        self.side_of(mint).is_some()
    }
}

impl fmt::Display for MintPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.mint_a.short(), self.mint_b.short())
    }
}

pub fn pool_address(program_id: &Address, pair: &MintPair) -> Address {
    derive_address(
        program_id.as_bytes(),
        &[POOL_SEED, pair.mint_a.as_bytes(), pair.mint_b.as_bytes()],
    )
}

pub fn lp_mint_address(program_id: &Address, pair: &MintPair) -> Address {
    derive_address(
        program_id.as_bytes(),
        &[LP_MINT_SEED, pair.mint_a.as_bytes(), pair.mint_b.as_bytes()],
    )
}

pub fn config_address(program_id: &Address) -> Address {
    derive_address(program_id.as_bytes(), &[CONFIG_SEED])
}

/// Token account of `mint` owned by `owner`
pub fn associated_account(owner: &Address, mint: &Address) -> Address {
    derive_address(
        ASSOCIATED_ACCOUNT_DOMAIN,
        &[owner.as_bytes(), mint.as_bytes()],
    )
}

/// Vault holding one side of a pool's reserves; owned by the pool, not a user
pub fn vault_address(pool: &Address, mint: &Address) -> Address {
    associated_account(pool, mint)
}

/// All addresses belonging to one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAddresses {
    pub pool: Address,
    pub lp_mint: Address,
    pub vault_a: Address,
    pub vault_b: Address,
}

impl PoolAddresses {
    pub fn derive(program_id: &Address, pair: &MintPair) -> Self {
        let pool = pool_address(program_id, pair);
        Self {
            pool,
            lp_mint: lp_mint_address(program_id, pair),
            vault_a: vault_address(&pool, &pair.mint_a),
            vault_b: vault_address(&pool, &pair.mint_b),
        }
    }

    /// Derive from two mints in any order
    pub fn for_mints(program_id: &Address, x: Address, y: Address) -> AmmResult<Self> {
        let pair = MintPair::new(x, y)?;
        Ok(Self::derive(program_id, &pair))
    }

    pub fn vault(&self, side: Side) -> Address {
        match side {
            Side::A => self.vault_a,
            Side::B => self.vault_b,
        }
    }
}

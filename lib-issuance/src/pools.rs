//! Pool allocation ledger
//!
//! Tracks cumulative issuance per pool against fixed per-pool caps derived
//! from the global supply cap. All cap arithmetic lives here; both the direct
//! sale path and reserved-pool minting must go through [`PoolLedger::reserve`],
//! which is what prevents two code paths from each believing they have
//! headroom.
//!
//! # Invariants (Non-Negotiable)
//!
//! 1. **Pool Invariant**: `minted[p] ≤ cap[p]` for every pool
//! 2. **Global Invariant**: `Σ minted[p] ≤ global_cap` at every observation point
//! 3. **Monotonicity**: `minted[p]` never decreases
//! 4. **One-Time Reallocation**: the unsold sale remainder moves into the
//!    adoption pool at most once, after which `cap[Sale]` is frozen at
//!    `minted[Sale]`

use std::fmt;

use lib_types::Amount;
use serde::{Deserialize, Serialize};

use crate::errors::{IssuanceError, IssuanceResult};

/// Percentage of the global cap assigned to each pool, in pool order
///
/// The sale pool is listed explicitly (34%) but its cap is computed as the
/// remainder of the global cap so integer truncation dust lands there.
pub const CANONICAL_POOL_PERCENTAGES: [u8; PoolId::COUNT] = [34, 27, 10, 20, 3, 3, 3];

/// The seven fixed-fraction pools of the global issuance cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PoolId {
    /// Public sale pool (implicit 34% remainder of the global cap)
    Sale = 0,
    /// Strategic investors (27%)
    Strategic = 1,
    /// Company reserve (10%)
    Reserve = 2,
    /// User adoption pool (20%); absorbs the unsold sale remainder
    Adoption = 3,
    /// Team pool (3%)
    Team = 4,
    /// Advisors pool (3%)
    Advisors = 5,
    /// Promotion pool (3%)
    Promo = 6,
}

impl PoolId {
    /// All pools in stable order
    pub const ALL: &'static [PoolId] = &[
        PoolId::Sale,
        PoolId::Strategic,
        PoolId::Reserve,
        PoolId::Adoption,
        PoolId::Team,
        PoolId::Advisors,
        PoolId::Promo,
    ];

    /// Count of pools
    pub const COUNT: usize = 7;

    /// The six reserved (non-sale) pools, in wire-index order
    pub const RESERVED: &'static [PoolId] = &[
        PoolId::Strategic,
        PoolId::Reserve,
        PoolId::Adoption,
        PoolId::Team,
        PoolId::Advisors,
        PoolId::Promo,
    ];

    /// Map an external pool index (0..=5) onto the six reserved pools
    ///
    /// The sale pool is not addressable by index; its capacity is only
    /// reachable through `contribute`, or through the adoption pool after the
    /// one-time remainder merge.
    pub fn from_reserved_index(index: u8) -> IssuanceResult<PoolId> {
        match index {
            0 => Ok(PoolId::Strategic),
            1 => Ok(PoolId::Reserve),
            2 => Ok(PoolId::Adoption),
            3 => Ok(PoolId::Team),
            4 => Ok(PoolId::Advisors),
            5 => Ok(PoolId::Promo),
            other => Err(IssuanceError::InvalidPool(other)),
        }
    }

    /// Canonical percentage of the global cap for this pool
    pub const fn percentage(self) -> u8 {
        CANONICAL_POOL_PERCENTAGES[self as usize]
    }

    /// Get human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            PoolId::Sale => "Public Sale",
            PoolId::Strategic => "Strategic Investors",
            PoolId::Reserve => "Company Reserve",
            PoolId::Adoption => "User Adoption Pool",
            PoolId::Team => "Team Pool",
            PoolId::Advisors => "Advisors Pool",
            PoolId::Promo => "Promotion Pool",
        }
    }

    /// Stable array index for this pool
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Cap-enforcing issuance ledger over the seven pools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLedger {
    /// Global issuance cap; pool caps always sum to exactly this
    global_cap: Amount,
    /// Per-pool caps, indexed by `PoolId::index`
    caps: [Amount; PoolId::COUNT],
    /// Cumulative issuance per pool, monotonically non-decreasing
    minted: [Amount; PoolId::COUNT],
    /// Whether the one-time sale remainder merge has happened
    reconciled: bool,
}

impl PoolLedger {
    /// Build a ledger with the canonical percentage split
    pub fn new(global_cap: Amount) -> IssuanceResult<Self> {
        Self::with_percentages(global_cap, &CANONICAL_POOL_PERCENTAGES)
    }

    /// Build a ledger with a custom percentage split
    ///
    /// Percentages must sum to exactly 100. Reserved pool caps are floored;
    /// the sale pool takes the remainder so the caps sum to `global_cap`.
    pub fn with_percentages(
        global_cap: Amount,
        percentages: &[u8; PoolId::COUNT],
    ) -> IssuanceResult<Self> {
        if global_cap == 0 {
            return Err(IssuanceError::InvalidConfig(
                "global cap must be positive".to_string(),
            ));
        }
        let sum: u32 = percentages.iter().map(|p| *p as u32).sum();
        if sum != 100 {
            return Err(IssuanceError::InvalidConfig(format!(
                "pool percentages sum to {}, expected 100",
                sum
            )));
        }

        let mut caps = [0u128; PoolId::COUNT];
        let mut reserved_total: Amount = 0;
        for pool in PoolId::RESERVED {
            let cap = global_cap / 100 * percentages[pool.index()] as Amount
                + global_cap % 100 * percentages[pool.index()] as Amount / 100;
            caps[pool.index()] = cap;
            reserved_total = reserved_total.saturating_add(cap);
        }
        // Sale absorbs truncation dust so the caps sum to the global cap.
        caps[PoolId::Sale.index()] = global_cap
            .checked_sub(reserved_total)
            .ok_or(IssuanceError::Underflow)?;

        Ok(Self {
            global_cap,
            caps,
            minted: [0; PoolId::COUNT],
            reconciled: false,
        })
    }

    /// Global issuance cap
    pub const fn global_cap(&self) -> Amount {
        self.global_cap
    }

    /// Cap for a pool
    pub const fn cap(&self, pool: PoolId) -> Amount {
        self.caps[pool.index()]
    }

    /// Cumulative issuance for a pool
    pub const fn minted(&self, pool: PoolId) -> Amount {
        self.minted[pool.index()]
    }

    /// Remaining capacity for a pool
    pub fn remaining(&self, pool: PoolId) -> Amount {
        self.caps[pool.index()].saturating_sub(self.minted[pool.index()])
    }

    /// Total issuance across all pools
    pub fn total_minted(&self) -> Amount {
        self.minted.iter().copied().sum()
    }

    /// Whether the sale remainder merge has happened
    pub const fn is_reconciled(&self) -> bool {
        self.reconciled
    }

    /// Reserve issuance capacity from a pool
    ///
    /// Succeeds iff `minted[pool] + amount ≤ cap[pool]` and
    /// `Σ minted + amount ≤ global_cap`, then increments `minted[pool]`.
    /// The global check dominates when both would fail. No partial fill: a
    /// rejected reservation leaves the ledger untouched.
    pub fn reserve(&mut self, pool: PoolId, amount: Amount) -> IssuanceResult<()> {
        if amount == 0 {
            return Err(IssuanceError::ZeroAmount);
        }

        let would_total = self
            .total_minted()
            .checked_add(amount)
            .ok_or(IssuanceError::Overflow)?;
        if would_total > self.global_cap {
            return Err(IssuanceError::GlobalCapExceeded {
                cap: self.global_cap,
                would_have: would_total,
            });
        }

        let would_pool = self.minted[pool.index()]
            .checked_add(amount)
            .ok_or(IssuanceError::Overflow)?;
        if would_pool > self.caps[pool.index()] {
            return Err(IssuanceError::PoolCapExceeded {
                cap: self.caps[pool.index()],
                would_have: would_pool,
            });
        }

        self.minted[pool.index()] = would_pool;
        Ok(())
    }

    /// One-time merge of the unsold sale remainder into the adoption pool
    ///
    /// Moves `cap[Sale] − minted[Sale]` into `cap[Adoption]` and freezes
    /// `cap[Sale]` at `minted[Sale]`. Returns the moved amount. Repeat calls
    /// fail with `AlreadyReconciled`. The caller is responsible for gating
    /// this on the sale window having closed.
    pub fn transfer_sale_remainder_to_adoption(&mut self) -> IssuanceResult<Amount> {
        if self.reconciled {
            return Err(IssuanceError::AlreadyReconciled);
        }

        let sale = PoolId::Sale.index();
        let adoption = PoolId::Adoption.index();
        let remainder = self.caps[sale]
            .checked_sub(self.minted[sale])
            .ok_or(IssuanceError::Underflow)?;

        self.caps[adoption] = self.caps[adoption]
            .checked_add(remainder)
            .ok_or(IssuanceError::Overflow)?;
        self.caps[sale] = self.minted[sale];
        self.reconciled = true;
        Ok(remainder)
    }
}

impl fmt::Display for PoolLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PoolLedger [{}/{} minted{}]",
            self.total_minted(),
            self.global_cap,
            if self.reconciled { ", reconciled" } else { "" },
        )
    }
}

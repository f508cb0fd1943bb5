//! Vesting schedule engine
//!
//! Funds hold a fixed, pre-minted allocation for one beneficiary and release
//! it in quarter-proportional slices. Creation debits the source pool and
//! mints the full amount into the fund's own holding address, so a release
//! never asks the asset ledger for new supply; it only moves already-issued
//! balance.
//!
//! The vesting clock is anchored to sale finalization, not fund creation: a
//! fund created mid-sale vests nothing until the sale machine calls
//! [`VestingEngine::anchor`] at finalize.

use lib_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::errors::{IssuanceError, IssuanceResult};
use crate::pools::{PoolId, PoolLedger};
use crate::token::IssuedAsset;

/// Release interval: 90 days
pub const QUARTER_DURATION_SECS: u64 = 90 * 24 * 3600;

/// Handle for a vesting fund
pub type FundId = u64;

/// One time-locked allocation
///
/// `released` is monotonically non-decreasing and never exceeds the vested
/// amount; `total_amount` is immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingFund {
    /// Who the allocation ultimately belongs to
    pub beneficiary: Address,
    /// The fund's own holding account on the asset ledger
    pub holding: Address,
    /// Fixed allocation, pre-minted into `holding` at creation
    pub total_amount: Amount,
    /// Number of quarters over which the allocation vests
    pub quarter_count: u32,
    /// Pool the allocation was debited from
    pub source_pool: PoolId,
    /// Cumulative amount already released to the beneficiary
    pub released: Amount,
}

/// The set of vesting funds plus the shared vesting clock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VestingEngine {
    funds: Vec<VestingFund>,
    /// Set exactly once, at sale finalization
    vesting_start: Option<Timestamp>,
    quarter_duration_secs: u64,
}

impl VestingEngine {
    /// Create an engine with the given release interval
    pub fn new(quarter_duration_secs: u64) -> Self {
        Self {
            funds: Vec::new(),
            vesting_start: None,
            quarter_duration_secs,
        }
    }

    /// Anchor the vesting clock; called by the sale machine at finalize
    pub fn anchor(&mut self, start: Timestamp) {
        if self.vesting_start.is_none() {
            self.vesting_start = Some(start);
        }
    }

    /// When vesting began, if finalize has happened
    pub const fn vesting_start(&self) -> Option<Timestamp> {
        self.vesting_start
    }

    /// Number of funds ever created
    pub fn fund_count(&self) -> usize {
        self.funds.len()
    }

    /// Look up a fund
    pub fn fund(&self, id: FundId) -> IssuanceResult<&VestingFund> {
        self.funds
            .get(id as usize)
            .ok_or(IssuanceError::UnknownFund(id))
    }

    /// Create a fund: debit the source pool, pre-mint into the fund holding
    ///
    /// Fails with whatever `PoolLedger::reserve` reports when the pool lacks
    /// capacity. All preconditions are checked before any state is touched,
    /// so a failure leaves pool ledger and asset untouched.
    pub fn create(
        &mut self,
        pools: &mut PoolLedger,
        asset: &mut IssuedAsset,
        beneficiary: Address,
        total_amount: Amount,
        quarter_count: u32,
        source_pool: PoolId,
    ) -> IssuanceResult<FundId> {
        if beneficiary.is_zero() {
            return Err(IssuanceError::ZeroAddress);
        }
        if total_amount == 0 || quarter_count == 0 {
            return Err(IssuanceError::ZeroAmount);
        }

        if asset.minting_finished() {
            return Err(IssuanceError::MintingClosed);
        }

        let id = self.funds.len() as FundId;
        let holding = holding_address(id);

        // The reservation is the authoritative cap check; the mint into the
        // fresh holding cannot fail once it has passed.
        pools.reserve(source_pool, total_amount)?;
        asset.mint(holding, total_amount)?;

        self.funds.push(VestingFund {
            beneficiary,
            holding,
            total_amount,
            quarter_count,
            source_pool,
            released: 0,
        });
        Ok(id)
    }

    /// Amount vested for a fund at `now`
    ///
    /// Zero until the vesting clock is anchored and reached; then
    /// `total × min(elapsed_quarters, quarter_count) / quarter_count` with
    /// floor division, which leaves residual dust to the final quarter.
    pub fn vested_amount(&self, id: FundId, now: Timestamp) -> IssuanceResult<Amount> {
        let fund = self.fund(id)?;
        Ok(self.vested_for(fund, now))
    }

    /// Amount releasable for a fund at `now`
    pub fn releasable_amount(&self, id: FundId, now: Timestamp) -> IssuanceResult<Amount> {
        let fund = self.fund(id)?;
        Ok(self.vested_for(fund, now).saturating_sub(fund.released))
    }

    /// Release everything currently releasable to the beneficiary
    ///
    /// Moves balance from the fund holding to the beneficiary through the
    /// asset ledger, which requires the asset to be unpaused (finalize must
    /// already have happened). Nothing releasable is `Ok(0)`, not an error,
    /// so the call is idempotent within the same instant.
    pub fn release(
        &mut self,
        asset: &mut IssuedAsset,
        id: FundId,
        now: Timestamp,
    ) -> IssuanceResult<Amount> {
        let vested = self.vested_amount(id, now)?;
        let fund = &mut self.funds[id as usize];

        let releasable = vested.saturating_sub(fund.released);
        if releasable == 0 {
            return Ok(0);
        }

        asset.transfer(fund.holding, fund.beneficiary, releasable)?;
        fund.released = fund
            .released
            .checked_add(releasable)
            .ok_or(IssuanceError::Overflow)?;
        Ok(releasable)
    }

    fn vested_for(&self, fund: &VestingFund, now: Timestamp) -> Amount {
        let start = match self.vesting_start {
            Some(start) if now >= start => start,
            _ => return 0,
        };

        let elapsed_quarters =
            ((now - start) / self.quarter_duration_secs).min(fund.quarter_count as u64);
        fund.total_amount
            .saturating_mul(elapsed_quarters as Amount)
            / fund.quarter_count as Amount
    }
}

/// Deterministic holding address for a fund
///
/// Tagged so it can never collide with the zero address or look like a
/// participant identity.
fn holding_address(id: FundId) -> Address {
    let mut bytes = [0u8; 32];
    bytes[0] = 0xfd;
    bytes[24..].copy_from_slice(&id.to_be_bytes());
    Address::new(bytes)
}

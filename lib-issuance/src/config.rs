//! Sale configuration
//!
//! Construction-time parameters for the sale machine. Validation fails
//! closed: a machine is never built from a config that could violate the cap
//! or window invariants later.

use lib_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::errors::{IssuanceError, IssuanceResult};
use crate::pools::{PoolId, CANONICAL_POOL_PERCENTAGES};
use crate::vesting::QUARTER_DURATION_SECS;

/// One whole token in base units (18 decimals)
pub const UNIT: Amount = 1_000_000_000_000_000_000;

/// Canonical deployment supply cap: 600 million tokens
pub const CANONICAL_GLOBAL_CAP: Amount = 600_000_000 * UNIT;

/// Canonical deployment rate: asset base units issued per payment base unit
pub const CANONICAL_RATE: Amount = 5687;

/// Construction-time sale parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleConfig {
    /// Sale window opens at this time (inclusive)
    pub start_time: Timestamp,
    /// Sale window closes at this time (exclusive)
    pub end_time: Timestamp,
    /// Payment-unit to asset-unit multiplier
    pub rate: Amount,
    /// Global issuance cap across all pools
    pub global_cap: Amount,
    /// Percentage split of the global cap across the seven pools
    pub pool_percentages: [u8; PoolId::COUNT],
    /// Destination for held proceeds at finalize
    pub wallet: Address,
    /// The authorized operator
    pub operator: Address,
    /// Vesting release interval
    pub quarter_duration_secs: u64,
}

impl SaleConfig {
    /// Canonical deployment parameters with caller-supplied window and keys
    pub fn canonical(
        start_time: Timestamp,
        end_time: Timestamp,
        wallet: Address,
        operator: Address,
    ) -> Self {
        Self {
            start_time,
            end_time,
            rate: CANONICAL_RATE,
            global_cap: CANONICAL_GLOBAL_CAP,
            pool_percentages: CANONICAL_POOL_PERCENTAGES,
            wallet,
            operator,
            quarter_duration_secs: QUARTER_DURATION_SECS,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> IssuanceResult<()> {
        if self.start_time >= self.end_time {
            return Err(IssuanceError::InvalidConfig(
                "sale window must end after it starts".to_string(),
            ));
        }
        if self.rate == 0 {
            return Err(IssuanceError::InvalidConfig(
                "rate must be positive".to_string(),
            ));
        }
        if self.global_cap == 0 {
            return Err(IssuanceError::InvalidConfig(
                "global cap must be positive".to_string(),
            ));
        }
        if self.quarter_duration_secs == 0 {
            return Err(IssuanceError::InvalidConfig(
                "quarter duration must be positive".to_string(),
            ));
        }
        if self.wallet.is_zero() {
            return Err(IssuanceError::InvalidConfig(
                "settlement wallet must not be the zero address".to_string(),
            ));
        }
        if self.operator.is_zero() {
            return Err(IssuanceError::InvalidConfig(
                "operator must not be the zero address".to_string(),
            ));
        }
        let sum: u32 = self.pool_percentages.iter().map(|p| *p as u32).sum();
        if sum != 100 {
            return Err(IssuanceError::InvalidConfig(format!(
                "pool percentages sum to {}, expected 100",
                sum
            )));
        }
        Ok(())
    }
}

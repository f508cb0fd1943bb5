//! Sale state machine
//!
//! The orchestrator. Owns the clock state and every other component; all
//! mutation of whitelist, pools, asset and vesting flows through the
//! operations here. Each operation re-derives the sale state from `(now,
//! finalized)` at entry, checks its preconditions against that snapshot, and
//! either applies all of its effects or none of them.

use std::collections::HashMap;

use lib_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SaleConfig;
use crate::errors::{IssuanceError, IssuanceResult};
use crate::events::{EventSink, SaleEvent};
use crate::pools::{PoolId, PoolLedger};
use crate::token::IssuedAsset;
use crate::vesting::{FundId, VestingEngine};
use crate::whitelist::WhitelistGate;

/// Derived sale state
///
/// Computed from `(now, finalized)` on every operation; never stored, so
/// there is no transition to miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleState {
    /// Before the window opens
    Pending,
    /// Window open, contributions accepted
    Active,
    /// Window closed, awaiting finalize
    Ended,
    /// Finalized: minting closed, transfers unlocked, proceeds forwarded
    Finalized,
}

/// Settlement seam: the external primitive that moves held payment value
///
/// Invoked exactly once, at finalize, after the internal state transition has
/// committed. The core's correctness does not depend on the outcome beyond
/// "it was attempted exactly once".
pub trait SettlementGateway {
    /// Forward `amount` of held payment value to `destination`
    fn forward(&mut self, amount: Amount, destination: &Address) -> IssuanceResult<()>;
}

/// The primary-issuance engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleStateMachine {
    config: SaleConfig,
    whitelist: WhitelistGate,
    pools: PoolLedger,
    asset: IssuedAsset,
    vesting: VestingEngine,
    /// Cumulative payment per participant, for the whitelist bound check
    contributions: HashMap<Address, Amount>,
    /// Payments held until finalize forwards them
    held_funds: Amount,
    /// Optional extra time gate on finalize; re-settable until finalize
    reconciliation_date: Option<Timestamp>,
    /// The only stored piece of state machine state
    finalized: bool,
}

impl SaleStateMachine {
    /// Build a machine from a validated config
    pub fn new(config: SaleConfig) -> IssuanceResult<Self> {
        config.validate()?;
        let pools = PoolLedger::with_percentages(config.global_cap, &config.pool_percentages)?;
        let asset = IssuedAsset::new(config.global_cap);
        let vesting = VestingEngine::new(config.quarter_duration_secs);

        Ok(Self {
            config,
            whitelist: WhitelistGate::new(),
            pools,
            asset,
            vesting,
            contributions: HashMap::new(),
            held_funds: 0,
            reconciliation_date: None,
            finalized: false,
        })
    }

    /// Sale state as derived from `now` and the finalized flag
    pub fn state(&self, now: Timestamp) -> SaleState {
        if self.finalized {
            SaleState::Finalized
        } else if now < self.config.start_time {
            SaleState::Pending
        } else if now < self.config.end_time {
            SaleState::Active
        } else {
            SaleState::Ended
        }
    }

    /// Add or overwrite a whitelist entry (operator-only)
    pub fn add_to_whitelist(
        &mut self,
        caller: Address,
        participant: Address,
        min: Amount,
        max: Amount,
        sink: &mut dyn EventSink,
    ) -> IssuanceResult<()> {
        self.require_operator(&caller)?;
        if participant.is_zero() {
            return Err(IssuanceError::ZeroAddress);
        }
        self.whitelist.add(participant, min, max)?;

        debug!("whitelisted {:?} with bounds [{}, {}]", participant, min, max);
        sink.emit(SaleEvent::WhitelistUpdated { participant, min, max });
        Ok(())
    }

    /// Accept a payment and issue tokens at the configured rate
    ///
    /// Requires the window to be open, the participant to be whitelisted,
    /// and the cumulative contribution to stay within the participant's
    /// bounds. The payment is held (not forwarded) until finalize.
    pub fn contribute(
        &mut self,
        participant: Address,
        payment: Amount,
        now: Timestamp,
        sink: &mut dyn EventSink,
    ) -> IssuanceResult<Amount> {
        if self.state(now) != SaleState::Active {
            return Err(IssuanceError::WrongState);
        }
        let bounds = self.whitelist.bounds(&participant)?;
        if payment == 0 {
            return Err(IssuanceError::ZeroAmount);
        }

        let cumulative = self
            .contributions
            .get(&participant)
            .copied()
            .unwrap_or(0)
            .checked_add(payment)
            .ok_or(IssuanceError::Overflow)?;
        if cumulative < bounds.min {
            return Err(IssuanceError::BelowMinCap {
                cumulative,
                min: bounds.min,
            });
        }
        if cumulative > bounds.max {
            return Err(IssuanceError::AboveMaxCap {
                cumulative,
                max: bounds.max,
            });
        }

        let token_amount = payment
            .checked_mul(self.config.rate)
            .ok_or(IssuanceError::Overflow)?;
        let new_held = self
            .held_funds
            .checked_add(payment)
            .ok_or(IssuanceError::Overflow)?;

        // The reservation is the authoritative cap check; the mint cannot
        // fail once it has passed, so both commit together.
        self.pools
            .reserve(PoolId::Sale, token_amount)
            .map_err(|err| match err {
                IssuanceError::PoolCapExceeded { .. }
                | IssuanceError::GlobalCapExceeded { .. } => IssuanceError::SaleCapReached,
                other => other,
            })?;
        self.asset.mint(participant, token_amount)?;
        self.contributions.insert(participant, cumulative);
        self.held_funds = new_held;

        info!(
            "contribution accepted: {:?} paid {} for {} tokens",
            participant, payment, token_amount
        );
        sink.emit(SaleEvent::ContributionAccepted {
            participant,
            payment,
            token_amount,
        });
        Ok(token_amount)
    }

    /// Mint tokens from a reserved pool for an investor (operator-only)
    ///
    /// Allowed in any state except finalized.
    pub fn mint_tokens_for(
        &mut self,
        caller: Address,
        investor: Address,
        amount: Amount,
        pool_index: u8,
        now: Timestamp,
        sink: &mut dyn EventSink,
    ) -> IssuanceResult<()> {
        self.require_operator(&caller)?;
        if self.finalized {
            return Err(IssuanceError::AlreadyFinalized);
        }
        if investor.is_zero() {
            return Err(IssuanceError::ZeroAddress);
        }
        if amount == 0 {
            return Err(IssuanceError::ZeroAmount);
        }
        let pool = PoolId::from_reserved_index(pool_index)?;

        self.pools.reserve(pool, amount)?;
        self.asset.mint(investor, amount)?;

        info!(
            "minted {} from {} for {:?} at {}",
            amount, pool, investor, now
        );
        sink.emit(SaleEvent::TokensMinted {
            investor,
            amount,
            pool,
        });
        Ok(())
    }

    /// Create a vesting fund backed by a reserved pool (operator-only)
    ///
    /// Allowed in any state except finalized. The fund's tokens are
    /// pre-minted into its own holding; vesting starts at finalize.
    pub fn create_vest_fund_for(
        &mut self,
        caller: Address,
        beneficiary: Address,
        amount: Amount,
        quarters: u32,
        pool_index: u8,
        now: Timestamp,
        sink: &mut dyn EventSink,
    ) -> IssuanceResult<FundId> {
        self.require_operator(&caller)?;
        if self.finalized {
            return Err(IssuanceError::AlreadyFinalized);
        }
        let pool = PoolId::from_reserved_index(pool_index)?;

        let fund_id = self.vesting.create(
            &mut self.pools,
            &mut self.asset,
            beneficiary,
            amount,
            quarters,
            pool,
        )?;

        info!(
            "vesting fund {} created for {:?}: {} over {} quarters from {} at {}",
            fund_id, beneficiary, amount, quarters, pool, now
        );
        sink.emit(SaleEvent::FundCreated {
            fund_id,
            beneficiary,
            amount,
            quarter_count: quarters,
            pool,
        });
        Ok(fund_id)
    }

    /// Release whatever a fund has vested so far to its beneficiary
    ///
    /// Open to any caller. Transfers go through the asset ledger, so this
    /// only succeeds once finalize has unpaused it.
    pub fn release_vested(&mut self, fund_id: FundId, now: Timestamp) -> IssuanceResult<Amount> {
        let released = self.vesting.release(&mut self.asset, fund_id, now)?;
        if released > 0 {
            debug!("fund {} released {} at {}", fund_id, released, now);
        }
        Ok(released)
    }

    /// Set or move the reconciliation date (operator-only, until finalize)
    pub fn set_reconciliation_date(
        &mut self,
        caller: Address,
        date: Timestamp,
    ) -> IssuanceResult<()> {
        self.require_operator(&caller)?;
        if self.finalized {
            return Err(IssuanceError::AlreadyFinalized);
        }
        self.reconciliation_date = Some(date);
        Ok(())
    }

    /// One-time merge of the unsold sale remainder into the adoption pool
    ///
    /// Operator-only; requires the sale window to have closed.
    pub fn transfer_sale_remainder_to_adoption(
        &mut self,
        caller: Address,
        now: Timestamp,
    ) -> IssuanceResult<Amount> {
        self.require_operator(&caller)?;
        if now < self.config.end_time {
            return Err(IssuanceError::WrongState);
        }
        let moved = self.pools.transfer_sale_remainder_to_adoption()?;
        info!("sale remainder of {} merged into the adoption pool", moved);
        Ok(moved)
    }

    /// Finalize the sale
    ///
    /// Single-effect and no-op-safe: the first successful call closes
    /// minting, unpauses transfers, anchors the vesting clock and forwards
    /// the full held balance exactly once; any repeat fails with
    /// `AlreadyFinalized`. The operator may finalize once the window has
    /// closed (and any reconciliation date has passed); any other caller is
    /// authorized only once a set reconciliation date has passed.
    pub fn finalize(
        &mut self,
        caller: Address,
        now: Timestamp,
        settlement: &mut dyn SettlementGateway,
        sink: &mut dyn EventSink,
    ) -> IssuanceResult<()> {
        if self.finalized {
            return Err(IssuanceError::AlreadyFinalized);
        }
        if now < self.config.end_time {
            return Err(IssuanceError::WrongState);
        }
        match self.reconciliation_date {
            Some(date) if now < date => {
                return Err(IssuanceError::ReconciliationPending { date, now });
            }
            Some(_) => {} // gate passed: any caller may finalize
            None => {
                if caller != self.config.operator {
                    return Err(IssuanceError::Unauthorized);
                }
            }
        }

        // Commit the state transition before the external call.
        self.finalized = true;
        self.asset.finish_minting();
        self.asset.unpause();
        self.vesting.anchor(now);

        let forwarded = self.held_funds;
        self.held_funds = 0;

        let settled = match settlement.forward(forwarded, &self.config.wallet) {
            Ok(()) => true,
            Err(err) => {
                // The transition stays committed; the host reconciles the
                // settlement out of band.
                warn!("settlement forward of {} failed: {}", forwarded, err);
                false
            }
        };

        info!(
            "sale finalized at {}: {} forwarded to {:?}",
            now, forwarded, self.config.wallet
        );
        sink.emit(SaleEvent::Finalized {
            at: now,
            forwarded,
            settled,
        });
        Ok(())
    }

    /// Holder-initiated asset transfer (blocked until finalize unpauses)
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> IssuanceResult<()> {
        self.asset.transfer(from, to, amount)
    }

    // ------------------------------------------------------------------
    // Read surface
    // ------------------------------------------------------------------

    /// Construction config
    pub fn config(&self) -> &SaleConfig {
        &self.config
    }

    /// Whitelist gate
    pub fn whitelist(&self) -> &WhitelistGate {
        &self.whitelist
    }

    /// Pool ledger
    pub fn pools(&self) -> &PoolLedger {
        &self.pools
    }

    /// Asset ledger
    pub fn asset(&self) -> &IssuedAsset {
        &self.asset
    }

    /// Vesting engine
    pub fn vesting(&self) -> &VestingEngine {
        &self.vesting
    }

    /// Payments held pending finalize
    pub const fn held_funds(&self) -> Amount {
        self.held_funds
    }

    /// Cumulative contribution of a participant
    pub fn contribution_of(&self, participant: &Address) -> Amount {
        self.contributions.get(participant).copied().unwrap_or(0)
    }

    /// Currently set reconciliation date, if any
    pub const fn reconciliation_date(&self) -> Option<Timestamp> {
        self.reconciliation_date
    }

    fn require_operator(&self, caller: &Address) -> IssuanceResult<()> {
        if *caller != self.config.operator {
            return Err(IssuanceError::Unauthorized);
        }
        Ok(())
    }
}

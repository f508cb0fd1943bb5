//! Sale event emission
//!
//! Informational records the core hands to a host-provided sink. Delivery is
//! fire-and-forget: the sink's behavior is not part of the core's
//! correctness, and operations never fail because of it.

use lib_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::pools::PoolId;
use crate::vesting::FundId;

/// Sale-level events the host can subscribe to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleEvent {
    /// A participant entry was added or overwritten on the whitelist
    WhitelistUpdated {
        participant: Address,
        min: Amount,
        max: Amount,
    },

    /// A contribution passed all gates and tokens were issued
    ContributionAccepted {
        participant: Address,
        payment: Amount,
        token_amount: Amount,
    },

    /// Tokens were minted from a reserved pool
    TokensMinted {
        investor: Address,
        amount: Amount,
        pool: PoolId,
    },

    /// A vesting fund was created and pre-funded
    FundCreated {
        fund_id: FundId,
        beneficiary: Address,
        amount: Amount,
        quarter_count: u32,
        pool: PoolId,
    },

    /// The sale was finalized; `settled` is false if the settlement gateway
    /// reported a failure on the one forwarding attempt
    Finalized {
        at: Timestamp,
        forwarded: Amount,
        settled: bool,
    },
}

impl std::fmt::Display for SaleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaleEvent::WhitelistUpdated { participant, .. } => {
                write!(f, "WhitelistUpdated({:?})", participant)
            }
            SaleEvent::ContributionAccepted {
                participant,
                token_amount,
                ..
            } => write!(
                f,
                "ContributionAccepted({:?}, tokens={})",
                participant, token_amount
            ),
            SaleEvent::TokensMinted { amount, pool, .. } => {
                write!(f, "TokensMinted({}, pool={})", amount, pool)
            }
            SaleEvent::FundCreated { fund_id, amount, .. } => {
                write!(f, "FundCreated(fund={}, amount={})", fund_id, amount)
            }
            SaleEvent::Finalized { forwarded, settled, .. } => {
                write!(f, "Finalized(forwarded={}, settled={})", forwarded, settled)
            }
        }
    }
}

/// Fire-and-forget event sink
pub trait EventSink {
    /// Deliver one event; must not fail
    fn emit(&mut self, event: SaleEvent);
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&mut self, _event: SaleEvent) {}
}

/// Sink that appends events to a vector, mainly for tests and tooling
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub events: Vec<SaleEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: SaleEvent) {
        self.events.push(event);
    }
}

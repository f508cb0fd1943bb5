//! Timed, access-gated primary-issuance engine
//!
//! Sells a fixed-supply asset to whitelisted participants during a bounded
//! window, enforces a global issuance cap split across a public-sale pool and
//! six reserved pools, and supports quarter-proportional vesting of any
//! pool-sourced allocation.
//!
//! The host substrate provides serialization: every operation executes as an
//! indivisible step against a consistent snapshot, takes `now` from the host,
//! and either applies all of its effects or none of them.
//!
//! # Key Types
//!
//! - [`SaleStateMachine`]: the orchestrator every operation enters through
//! - [`PoolLedger`]: cap-enforcing issuance accounting over the seven pools
//! - [`IssuedAsset`]: the fungible balance ledger being sold
//! - [`VestingEngine`]: quarter-proportional time locks
//! - [`WhitelistGate`]: per-participant contribution bounds

pub mod config;
pub mod errors;
pub mod events;
pub mod pools;
pub mod sale;
pub mod token;
pub mod vesting;
pub mod whitelist;

pub use config::{SaleConfig, CANONICAL_GLOBAL_CAP, CANONICAL_RATE, UNIT};
pub use errors::{IssuanceError, IssuanceResult};
pub use events::{EventSink, NoopSink, RecordingSink, SaleEvent};
pub use pools::{PoolId, PoolLedger, CANONICAL_POOL_PERCENTAGES};
pub use sale::{SaleState, SaleStateMachine, SettlementGateway};
pub use token::IssuedAsset;
pub use vesting::{FundId, VestingEngine, VestingFund, QUARTER_DURATION_SECS};
pub use whitelist::{ContributionBounds, WhitelistGate};
